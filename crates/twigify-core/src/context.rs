//! Per-document conversion state and text-level directive dispatch.
//!
//! A [`ConversionContext`] is created for every document and dropped when its
//! conversion ends, so block stacks, placeholder tables and the macro import
//! flag never leak between documents.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::blocks::{BlockKind, BlockStack};
use crate::error::{ConvertError, NestingError};
use crate::grammar::{DirectiveToken, rewrite_logical, split_partitions};
use crate::macros::MacroRegistry;
use crate::options::ConvertOptions;
use crate::placeholder::{Family, PlaceholderTables};
use crate::scanner::{Segment, directive_spans};

/// Inline macro token left in text by pre-processing.
pub(crate) static MACRO_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[TWIG_MACRO_(\d+)\]\]").expect("invalid macro token regex"));

/// Open `::switch::` and the number of cases it has seen.
#[derive(Debug)]
struct SwitchFrame {
    subject: String,
    cases: usize,
    /// Block stack depth right after the switch opened its `if`.
    depth: usize,
}

/// State scoped to the conversion of one document.
#[derive(Debug)]
pub(crate) struct ConversionContext<'o> {
    pub(crate) options: &'o ConvertOptions,
    pub(crate) blocks: BlockStack,
    switches: Vec<SwitchFrame>,
    pub(crate) placeholders: PlaceholderTables,
    pub(crate) macros: MacroRegistry,
    /// Parent template named by `::use::`, already quoted.
    pub(crate) inheritance: Option<String>,
}

impl<'o> ConversionContext<'o> {
    /// Context for an ordinary document.
    pub(crate) fn new(options: &'o ConvertOptions) -> Self {
        Self::with_macros(options, MacroRegistry::imported_as_namespace())
    }

    /// Context for a macro library, where calls target the library itself.
    pub(crate) fn for_library(options: &'o ConvertOptions) -> Self {
        Self::with_macros(options, MacroRegistry::self_referencing())
    }

    fn with_macros(options: &'o ConvertOptions, macros: MacroRegistry) -> Self {
        Self {
            options,
            blocks: BlockStack::new(),
            switches: Vec::new(),
            placeholders: PlaceholderTables::default(),
            macros,
            inheritance: None,
        }
    }

    /// Recorded entry for a placeholder token.
    pub(crate) fn resolve(&self, family: Family, index: usize) -> Result<&str, ConvertError> {
        let table = match family {
            Family::Macro => &self.macros.calls,
            Family::Cond => &self.placeholders.cond,
            Family::Class => &self.placeholders.class,
            Family::Checked => &self.placeholders.checked,
            Family::Selected => &self.placeholders.selected,
        };
        table
            .get(index)
            .ok_or(ConvertError::UnresolvedPlaceholder { family, index })
    }

    /// Convert every directive in a text run.
    ///
    /// The text is partitioned before each block-opening keyword and each
    /// partition is converted in order.
    pub(crate) fn convert_text(&mut self, text: &str) -> Result<String, ConvertError> {
        let mut out = String::with_capacity(text.len());
        for partition in split_partitions(text) {
            for segment in directive_spans(partition) {
                match segment {
                    Segment::Directive(span) => out.push_str(&self.render_directive(span)?),
                    other => out.push_str(&self.fill_macro_tokens(other.source())?),
                }
            }
        }
        Ok(out)
    }

    /// Target rendering of one text-position directive span.
    pub(crate) fn render_directive(&mut self, span: &str) -> Result<String, ConvertError> {
        let token = DirectiveToken::classify(span);
        tracing::debug!(kind = ?token.kind(), span, "Converting directive");

        let rendered = match token {
            DirectiveToken::Switch(subject) => {
                self.blocks.push(BlockKind::If);
                self.switches.push(SwitchFrame {
                    subject: subject.to_owned(),
                    cases: 0,
                    depth: self.blocks.depth(),
                });
                String::new()
            }
            DirectiveToken::Case => {
                let frame = self
                    .switches
                    .last_mut()
                    .ok_or(NestingError::CaseOutsideSwitch)?;
                let keyword = if frame.cases == 0 { "if" } else { "elseif" };
                let rendered = format!("{{% {keyword} {}.index == {} %}}", frame.subject, frame.cases);
                frame.cases += 1;
                rendered
            }
            DirectiveToken::If(cond) => {
                self.blocks.push(BlockKind::If);
                format!("{{% if {} %}}", rewrite_logical(cond))
            }
            DirectiveToken::ElseIf(cond) => format!("{{% elseif {} %}}", rewrite_logical(cond)),
            DirectiveToken::Else => "{% else %}".to_owned(),
            DirectiveToken::End => {
                let kind = self.blocks.pop()?;
                let depth = self.blocks.depth();
                while self.switches.last().is_some_and(|frame| frame.depth > depth) {
                    self.switches.pop();
                }
                format!("{{% end{kind} %}}")
            }
            DirectiveToken::Foreach { item, collection } => {
                self.blocks.push(BlockKind::For);
                format!("{{% for {item} in {collection} %}}")
            }
            DirectiveToken::RawBlock => "{% block __content__ %}{% endblock %}".to_owned(),
            DirectiveToken::Raw(expr) => format!("{{{{ {expr}|raw }}}}"),
            // Both open a block closed by `::end::`, whatever the expression.
            DirectiveToken::Fill(expr) | DirectiveToken::Set(expr) => {
                self.blocks.push(BlockKind::Set);
                format!("{{% set {expr} %}}")
            }
            DirectiveToken::Use(_) => {
                tracing::warn!(span, "Only the first `::use::` of a document is honoured");
                span.to_owned()
            }
            DirectiveToken::Print(expr) => format!("{{{{{expr}}}}}"),
        };
        Ok(rendered)
    }

    /// Replace inline macro tokens with the recorded calls.
    fn fill_macro_tokens(&mut self, text: &str) -> Result<String, ConvertError> {
        if !text.contains("[[TWIG_MACRO_") {
            return Ok(text.to_owned());
        }

        let mut failure = None;
        let filled = MACRO_TOKEN.replace_all(text, |caps: &Captures| {
            let resolved = caps[1]
                .parse()
                .map_err(|_| ConvertError::UnresolvedPlaceholder {
                    family: Family::Macro,
                    index: usize::MAX,
                })
                .and_then(|index| self.resolve(Family::Macro, index));
            match resolved {
                Ok(call) => call.to_owned(),
                Err(err) => {
                    failure.get_or_insert(err);
                    String::new()
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        let filled = filled.into_owned();
        self.macros.mark_used();
        Ok(filled)
    }
}
