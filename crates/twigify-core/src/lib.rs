//! Templo to Twig template translation engine.
//!
//! This crate rewrites Templo templates (`::if x::`, `::foreach i list::`,
//! `$$macro(args)`, ...) into equivalent Twig templates while leaving the
//! surrounding markup untouched.
//!
//! # Architecture
//!
//! Ordinary documents go through a fixed pipeline:
//!
//! 1. Placeholder pre-processing rewrites attribute-position directives and
//!    macro calls into legal markup, recording the originals in side tables.
//! 2. A lenient markup parser builds a tree with raw text and attributes.
//! 3. The tree converter classifies and renders every directive, resolving
//!    generic `::end::` directives against a block stack.
//! 4. The finalizer inserts the macro import, completes `::use::`
//!    inheritance, serializes the tree and checks for leftovers.
//!
//! Macro libraries skip the tree and are converted span by span.
//!
//! All state lives in a context created per document, so one [`Converter`]
//! can convert many documents, in parallel if needed.
//!
//! # Example
//!
//! ```
//! use twigify_core::{DocumentKind, convert};
//!
//! let twig = convert("<p>::if a::Hi ::name::::end::</p>", DocumentKind::Document).unwrap();
//! assert_eq!(twig, "<p>{% if a %}Hi {{name}}{% endif %}</p>");
//! ```

mod blocks;
mod context;
mod converter;
mod error;
mod finalize;
mod grammar;
mod macros;
mod options;
mod parser;
mod placeholder;
mod scanner;
mod serializer;
mod tree;

pub use blocks::BlockKind;
pub use error::{ConvertError, NestingError};
pub use grammar::{AttributeDirective, DirectiveKind, DirectiveToken, rewrite_logical};
pub use options::ConvertOptions;
pub use placeholder::Family;

use context::ConversionContext;
use parser::MarkupParser;

/// Kind of source template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Template rooted at an ordinary markup tag.
    Document,
    /// `<macros>` container holding macro definitions.
    MacroLibrary,
}

impl DocumentKind {
    /// Detect the kind from the leading tag of the source.
    #[must_use]
    pub fn detect(source: &str) -> Self {
        let is_library = source
            .trim_start()
            .strip_prefix('<')
            .and_then(|rest| rest.strip_prefix(macros::LIBRARY_TAG))
            .is_some_and(|rest| rest.starts_with(|c: char| c == '>' || c.is_whitespace()));
        if is_library {
            Self::MacroLibrary
        } else {
            Self::Document
        }
    }
}

/// Template converter.
///
/// Holds the options only; every call to [`Converter::convert`] starts from
/// fresh per-document state.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    /// Create a converter with the given options.
    #[must_use]
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Conversion options.
    #[must_use]
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert one source template.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup cannot be parsed, block directives do not
    /// nest, a placeholder cannot be resolved or a macro definition has no name.
    pub fn convert(&self, source: &str, kind: DocumentKind) -> Result<String, ConvertError> {
        convert_with_options(source, kind, &self.options)
    }
}

/// Convert one source template with default options.
///
/// # Errors
///
/// See [`Converter::convert`].
pub fn convert(source: &str, kind: DocumentKind) -> Result<String, ConvertError> {
    Converter::default().convert(source, kind)
}

/// Convert one source template with the given options.
///
/// # Errors
///
/// See [`Converter::convert`].
pub fn convert_with_options(
    source: &str,
    kind: DocumentKind,
    options: &ConvertOptions,
) -> Result<String, ConvertError> {
    match kind {
        DocumentKind::Document => {
            let mut ctx = ConversionContext::new(options);
            let prepared = placeholder::prepare(source, &mut ctx);
            let mut root = MarkupParser::new().parse(&prepared)?;
            converter::convert_tree(&mut root, &mut ctx)?;
            finalize::finalize(root, &ctx)
        }
        DocumentKind::MacroLibrary => {
            let mut ctx = ConversionContext::for_library(options);
            macros::convert_library(source, &mut ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(DocumentKind::detect("<macros>\n"), DocumentKind::MacroLibrary);
        assert_eq!(DocumentKind::detect("  <macros >"), DocumentKind::MacroLibrary);
        assert_eq!(DocumentKind::detect("<macro name=\"a\">"), DocumentKind::Document);
        assert_eq!(DocumentKind::detect("<html>"), DocumentKind::Document);
        assert_eq!(DocumentKind::detect("::use 'a.mtt'::"), DocumentKind::Document);
    }

    #[test]
    fn test_converter_state_does_not_leak() {
        let converter = Converter::default();
        let first = converter
            .convert("<body>$$a()</body>", DocumentKind::Document)
            .unwrap();
        let second = converter.convert("<body>x</body>", DocumentKind::Document).unwrap();

        assert!(first.contains("{% import 'macros.html' as macros %}"));
        assert_eq!(second, "<body>x</body>");
    }
}
