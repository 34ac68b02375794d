//! Macro calls and macro library conversion.
//!
//! Documents call macros through a namespace imported once per document.
//! Libraries are converted without building a tree: the container tag is
//! dropped, each `<macro name="...">` becomes a `{% macro %}` block and the
//! bodies go through the same directive conversion as document text.

use crate::context::ConversionContext;
use crate::error::ConvertError;
use crate::grammar::{AttributeDirective, convert_print_spans};
use crate::placeholder::PlaceholderTable;
use crate::scanner::{MacroCall, Segment, StartTag, TagPiece, segments};
use crate::tree::{Element, Node};

/// Container tag of a macro library.
pub(crate) const LIBRARY_TAG: &str = "macros";
/// Tag of a single macro definition.
const DEFINITION_TAG: &str = "macro";
/// Namespace the library is imported as.
const NAMESPACE: &str = "macros";

/// Macro calls recorded for one document.
#[derive(Debug)]
pub(crate) struct MacroRegistry {
    namespace: &'static str,
    pub(crate) calls: PlaceholderTable,
    imported: bool,
}

impl MacroRegistry {
    /// Calls go through the imported `macros` namespace.
    pub(crate) fn imported_as_namespace() -> Self {
        Self::with_namespace(NAMESPACE)
    }

    /// Calls made from inside a library target the library itself.
    pub(crate) fn self_referencing() -> Self {
        Self::with_namespace("_self")
    }

    fn with_namespace(namespace: &'static str) -> Self {
        Self {
            namespace,
            calls: PlaceholderTable::default(),
            imported: false,
        }
    }

    /// Record a call and return its placeholder index.
    pub(crate) fn record(&mut self, call: &MacroCall<'_>) -> usize {
        let rendered = self.render(call);
        tracing::debug!(name = call.name, "Recorded macro call");
        self.calls.record(rendered)
    }

    /// `{{ <namespace>.name(args) }}` with directive delimiters stripped from the arguments.
    pub(crate) fn render(&self, call: &MacroCall<'_>) -> String {
        format!(
            "{{{{ {}.{}({}) }}}}",
            self.namespace,
            call.name,
            call.args.replace("::", "")
        )
    }

    /// Note that the document calls a macro and needs the import.
    pub(crate) fn mark_used(&mut self) {
        if !self.imported {
            tracing::debug!("Document calls macros, importing library");
            self.imported = true;
        }
    }

    pub(crate) fn is_used(&self) -> bool {
        self.imported
    }
}

/// Insert the library import into a converted document, at most once.
///
/// The statement becomes the first child of `body`, else of the first
/// top-level element, else of the document itself.
pub(crate) fn insert_import(root: &mut Element, ctx: &ConversionContext<'_>) {
    if !ctx.macros.is_used() {
        return;
    }
    let statement = Node::text(format!(
        "\n{{% import '{}' as {NAMESPACE} %}}",
        ctx.options.macro_library
    ));

    if let Some(body) = root.find_mut("body") {
        body.children.insert(0, statement);
    } else if let Some(first) = root.first_element_mut() {
        first.children.insert(0, statement);
    } else {
        root.children.insert(0, statement);
    }
}

/// Convert a macro library.
pub(crate) fn convert_library(
    source: &str,
    ctx: &mut ConversionContext<'_>,
) -> Result<String, ConvertError> {
    let mut out = String::with_capacity(source.len());
    let mut offset = 0;

    for segment in segments(source) {
        match &segment {
            Segment::StartTag(tag) if tag.name == LIBRARY_TAG => {}
            Segment::Markup(markup) if is_end_tag(markup, LIBRARY_TAG) => {}
            Segment::StartTag(tag) if tag.name == DEFINITION_TAG => {
                let name = definition_name(tag).ok_or_else(|| ConvertError::MissingMacroName {
                    line: line_at(source, offset),
                })?;
                tracing::debug!(%name, "Converting macro definition");
                out.push_str("{% macro ");
                out.push_str(&name);
                out.push_str(" %}");
            }
            Segment::Markup(markup) if is_end_tag(markup, DEFINITION_TAG) => {
                ctx.blocks.ensure_closed()?;
                out.push_str("{% endmacro %}");
            }
            Segment::StartTag(tag) => render_tag(tag, ctx, &mut out)?,
            Segment::Directive(span) => out.push_str(&ctx.render_directive(span)?),
            Segment::Macro(call) => out.push_str(&ctx.macros.render(call)),
            Segment::Text(text) | Segment::Markup(text) => out.push_str(text),
        }
        offset += segment.source().len();
    }

    ctx.blocks.ensure_closed()?;
    Ok(out)
}

fn definition_name(tag: &StartTag<'_>) -> Option<String> {
    tag.attributes()
        .into_iter()
        .find(|attr| attr.name == "name")
        .and_then(|attr| attr.value.as_str().map(str::to_owned))
        .filter(|name| !name.trim().is_empty())
}

/// Start tag inside a macro body, with its directives converted in place.
fn render_tag(
    tag: &StartTag<'_>,
    ctx: &mut ConversionContext<'_>,
    out: &mut String,
) -> Result<(), ConvertError> {
    for piece in &tag.pieces {
        match piece {
            TagPiece::Raw(raw) => out.push_str(&convert_print_spans(raw)),
            TagPiece::Macro(call) => out.push_str(&ctx.macros.render(call)),
            TagPiece::Directive(span) => match AttributeDirective::classify(span) {
                Some(directive @ AttributeDirective::Cond(_)) => {
                    tracing::warn!(kind = ?directive.kind(), "Conditional attribute left unconverted in macro library");
                    out.push_str(span);
                }
                Some(directive) => {
                    let holder = match directive {
                        AttributeDirective::Class { .. } => "class",
                        AttributeDirective::Checked(_) => "checked",
                        _ => "selected",
                    };
                    out.push_str(holder);
                    out.push('=');
                    out.push_str(&directive.value_expression().unwrap_or_default());
                }
                None => out.push_str(&ctx.render_directive(span)?),
            },
        }
    }
    Ok(())
}

fn is_end_tag(markup: &str, name: &str) -> bool {
    markup
        .strip_prefix("</")
        .and_then(|rest| rest.strip_suffix('>'))
        .is_some_and(|inner| inner.trim() == name)
}

/// 1-based line number of a byte offset.
fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}
