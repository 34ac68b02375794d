//! Placeholder pre-processing.
//!
//! Rewrites syntax a markup parser cannot tolerate into legal placeholder
//! markup before parsing. Each attribute-position directive becomes a holder
//! attribute whose value is a `<FAMILY>_<index>` token; the converted
//! directive is recorded at that index in the family's table and resolved
//! again by the tree converter.
//!
//! Passes run in a fixed order: macro calls, `cond` attributes, the `use`
//! directive, then `class`/`checked`/`selected` attributes. A final pass
//! swaps literal `<` and `&` characters that are not markup for private-use
//! stand-ins, which the parser restores when it reads text back.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::context::ConversionContext;
use crate::grammar::{AttributeDirective, DirectiveToken, swap_extension};
use crate::scanner::{Segment, StartTag, TagPiece, segments};

/// Element wrapping the content governed by a `::use::` directive.
pub(crate) const USE_ELEMENT: &str = "twig-use";
const USE_OPEN_TAG: &str = "<twig-use>";
const USE_CLOSE_TAG: &str = "</twig-use>";

const AMP_STAND_IN: char = '\u{E000}';
const LT_STAND_IN: char = '\u{E001}';
const GT_STAND_IN: char = '\u{E002}';

/// `&` with an optional entity body after it.
static AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:#?[A-Za-z0-9]+;)?").expect("invalid ampersand regex"));

/// Directive family that uses placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// `$$name(args)` macro calls.
    Macro,
    /// `::cond <expr>::` attributes.
    Cond,
    /// `::attr class if(<cond>) <value>::` attributes.
    Class,
    /// `::attr checked (<cond>)::` attributes.
    Checked,
    /// `::attr selected (<cond>)::` attributes.
    Selected,
}

impl Family {
    pub(crate) const ALL: [Self; 5] = [
        Self::Macro,
        Self::Cond,
        Self::Class,
        Self::Checked,
        Self::Selected,
    ];

    /// Token prefix, without the index.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Macro => "TWIG_MACRO",
            Self::Cond => "TWIG_COND",
            Self::Class => "TWIG_CLASS",
            Self::Checked => "TWIG_CHECKED",
            Self::Selected => "TWIG_SELECTED",
        }
    }

    /// Attribute that carries this family's placeholder token.
    pub(crate) const fn holder(self) -> &'static str {
        match self {
            Self::Macro => "data-twig-macro",
            Self::Cond => "data-twig-cond",
            Self::Class => "class",
            Self::Checked => "checked",
            Self::Selected => "selected",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.name() == name)
    }

    pub(crate) fn token(self, index: usize) -> String {
        format!("{self}_{index}")
    }

    /// Index of a placeholder token of this family.
    pub(crate) fn parse_token(self, value: &str) -> Option<usize> {
        value
            .strip_prefix(self.name())?
            .strip_prefix('_')?
            .parse()
            .ok()
    }

    fn holder_attribute(self, index: usize) -> String {
        format!(r#"{}="{}""#, self.holder(), self.token(index))
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Append-only table of recorded directives. Index is insertion order.
#[derive(Debug, Default)]
pub(crate) struct PlaceholderTable {
    entries: Vec<String>,
}

impl PlaceholderTable {
    pub(crate) fn record(&mut self, entry: String) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub(crate) fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Tables for the attribute directive families.
#[derive(Debug, Default)]
pub(crate) struct PlaceholderTables {
    pub(crate) cond: PlaceholderTable,
    pub(crate) class: PlaceholderTable,
    pub(crate) checked: PlaceholderTable,
    pub(crate) selected: PlaceholderTable,
}

/// Run every pre-processing pass over a document's source.
pub(crate) fn prepare(source: &str, ctx: &mut ConversionContext<'_>) -> String {
    let text = substitute_macros(source, ctx);
    let text = substitute_cond(&text, ctx);
    let text = substitute_use(&text, ctx);
    let text = substitute_attributes(&text, ctx);
    protect_literals(&text)
}

/// Macro calls: attribute position gets a holder attribute, text position
/// an inline `[[TWIG_MACRO_<i>]]` token.
fn substitute_macros(source: &str, ctx: &mut ConversionContext<'_>) -> String {
    let mut out = String::with_capacity(source.len());
    for segment in segments(source) {
        match segment {
            Segment::Macro(call) => {
                let index = ctx.macros.record(&call);
                out.push_str("[[");
                out.push_str(&Family::Macro.token(index));
                out.push_str("]]");
            }
            Segment::StartTag(tag) => rewrite_tag(&tag, &mut out, |piece| match piece {
                TagPiece::Macro(call) => {
                    let index = ctx.macros.record(call);
                    Some(Family::Macro.holder_attribute(index))
                }
                _ => None,
            }),
            other => out.push_str(other.source()),
        }
    }
    out
}

fn substitute_cond(source: &str, ctx: &mut ConversionContext<'_>) -> String {
    rewrite_tags(source, |piece| {
        let TagPiece::Directive(span) = piece else {
            return None;
        };
        let Some(AttributeDirective::Cond(expr)) = AttributeDirective::classify(span) else {
            return None;
        };
        let index = ctx.placeholders.cond.record(expr.to_owned());
        tracing::debug!(index, expr, "Recorded cond attribute");
        Some(Family::Cond.holder_attribute(index))
    })
}

/// Wrap the content governed by the first `::use::` in a `twig-use` element
/// closed at the last `::end::` of the document.
fn substitute_use(source: &str, ctx: &mut ConversionContext<'_>) -> String {
    let segments = segments(source);
    let token_at = |i: usize| match &segments[i] {
        Segment::Directive(span) => Some(DirectiveToken::classify(*span)),
        _ => None,
    };

    let Some((use_at, parent)) = (0..segments.len()).find_map(|i| match token_at(i) {
        Some(DirectiveToken::Use(parent)) => Some((i, parent)),
        _ => None,
    }) else {
        return source.to_owned();
    };
    let end_at = (use_at + 1..segments.len())
        .rev()
        .find(|&i| token_at(i) == Some(DirectiveToken::End));

    let options = ctx.options;
    let parent = swap_extension(parent, &options.source_extension, &options.target_extension);
    tracing::debug!(%parent, "Document extends parent template");
    ctx.inheritance = Some(parent);

    let mut out = String::with_capacity(source.len());
    for (i, segment) in segments.iter().enumerate() {
        if i == use_at {
            out.push_str(USE_OPEN_TAG);
        } else if Some(i) == end_at {
            out.push_str(USE_CLOSE_TAG);
        } else {
            out.push_str(segment.source());
        }
    }
    if end_at.is_none() {
        tracing::warn!("`::use::` has no closing `::end::`");
        out.push_str(USE_CLOSE_TAG);
    }
    out
}

/// `class`, `checked` and `selected` attribute directives.
fn substitute_attributes(source: &str, ctx: &mut ConversionContext<'_>) -> String {
    rewrite_tags(source, |piece| {
        let TagPiece::Directive(span) = piece else {
            return None;
        };
        let directive = AttributeDirective::classify(span)?;
        let family = match directive {
            AttributeDirective::Cond(_) => return None,
            AttributeDirective::Class { .. } => Family::Class,
            AttributeDirective::Checked(_) => Family::Checked,
            AttributeDirective::Selected(_) => Family::Selected,
        };
        let value = directive.value_expression()?;
        let table = match family {
            Family::Class => &mut ctx.placeholders.class,
            Family::Checked => &mut ctx.placeholders.checked,
            _ => &mut ctx.placeholders.selected,
        };
        let index = table.record(value);
        tracing::debug!(%family, index, "Recorded attribute directive");
        Some(family.holder_attribute(index))
    })
}

fn protect_literals(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for segment in segments(source) {
        match segment {
            Segment::Text(text) => {
                let text = AMPERSAND.replace_all(text, |caps: &regex::Captures| {
                    if caps[0].len() == 1 {
                        AMP_STAND_IN.to_string()
                    } else {
                        caps[0].to_owned()
                    }
                });
                out.extend(text.chars().map(|c| if c == '<' { LT_STAND_IN } else { c }));
            }
            Segment::Directive(span) => out.extend(span.chars().map(protect_char)),
            Segment::StartTag(tag) => rewrite_tag(&tag, &mut out, |piece| match piece {
                TagPiece::Directive(span) => {
                    tracing::warn!(directive = %span, "Unrecognised attribute directive printed as-is");
                    let printed = format!("{{{{{}}}}}", &span[2..span.len() - 2]);
                    Some(
                        printed
                            .chars()
                            .map(|c| if c == '>' { GT_STAND_IN } else { protect_char(c) })
                            .collect(),
                    )
                }
                _ => None,
            }),
            other => out.push_str(other.source()),
        }
    }
    out
}

fn protect_char(c: char) -> char {
    match c {
        '&' => AMP_STAND_IN,
        '<' => LT_STAND_IN,
        c => c,
    }
}

/// Undo literal protection on text read back from the parser.
pub(crate) fn restore_literals(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            AMP_STAND_IN => '&',
            LT_STAND_IN => '<',
            GT_STAND_IN => '>',
            c => c,
        })
        .collect()
}

/// Rewrite start tag pieces, copying everything else through.
fn rewrite_tags<'a>(
    source: &'a str,
    mut rewrite: impl FnMut(&TagPiece<'a>) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(source.len());
    for segment in segments(source) {
        match segment {
            Segment::StartTag(tag) => rewrite_tag(&tag, &mut out, &mut rewrite),
            other => out.push_str(other.source()),
        }
    }
    out
}

fn rewrite_tag<'a>(
    tag: &StartTag<'a>,
    out: &mut String,
    mut rewrite: impl FnMut(&TagPiece<'a>) -> Option<String>,
) {
    for piece in &tag.pieces {
        match rewrite(piece) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(piece.source()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConvertOptions;
    use pretty_assertions::assert_eq;

    fn prepared(source: &str) -> (String, ConversionContext<'static>) {
        static OPTIONS: LazyLock<ConvertOptions> = LazyLock::new(ConvertOptions::default);
        let mut ctx = ConversionContext::new(&OPTIONS);
        let out = prepare(source, &mut ctx);
        (out, ctx)
    }

    #[test]
    fn test_family_tokens() {
        assert_eq!(Family::Cond.token(3), "TWIG_COND_3");
        assert_eq!(Family::Cond.parse_token("TWIG_COND_3"), Some(3));
        assert_eq!(Family::Cond.parse_token("TWIG_CLASS_3"), None);
        assert_eq!(Family::Class.parse_token("big"), None);
        assert_eq!(Family::from_name("TWIG_SELECTED"), Some(Family::Selected));
    }

    #[test]
    fn test_table_indices_follow_insertion_order() {
        let mut table = PlaceholderTable::default();
        assert_eq!(table.record("a".to_owned()), 0);
        assert_eq!(table.record("b".to_owned()), 1);
        assert_eq!(table.get(1), Some("b"));
        assert_eq!(table.get(2), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_cond_attribute_becomes_holder() {
        let (out, ctx) = prepared("<div ::cond a > b::>x</div>");
        assert_eq!(out, r#"<div data-twig-cond="TWIG_COND_0">x</div>"#);
        assert_eq!(ctx.placeholders.cond.get(0), Some("a > b"));
    }

    #[test]
    fn test_attribute_directives_become_holders() {
        let (out, ctx) = prepared(
            "<li ::attr class if(i == 0) first::><input ::attr checked (on)::/><option ::attr selected (s)::>",
        );
        assert_eq!(
            out,
            r#"<li class="TWIG_CLASS_0"><input checked="TWIG_CHECKED_0"/><option selected="TWIG_SELECTED_0">"#
        );
        assert_eq!(
            ctx.placeholders.class.get(0),
            Some(r#"{{ i == 0 ? "first" : "" }}"#)
        );
        assert_eq!(ctx.placeholders.checked.get(0), Some("{{ on }}"));
    }

    #[test]
    fn test_macro_calls() {
        let (out, ctx) = prepared("<a $$link(::url::)>$$card(u)</a>");
        assert_eq!(
            out,
            r#"<a data-twig-macro="TWIG_MACRO_0">[[TWIG_MACRO_1]]</a>"#
        );
        assert_eq!(ctx.macros.calls.get(0), Some("{{ macros.link(url) }}"));
        assert_eq!(ctx.macros.calls.get(1), Some("{{ macros.card(u) }}"));
    }

    #[test]
    fn test_use_wraps_until_last_end() {
        let (out, ctx) = prepared("::use layout.mtt::<p>::if a::x::end::</p>::end::");
        assert_eq!(out, "<twig-use><p>::if a::x::end::</p></twig-use>");
        assert_eq!(ctx.inheritance.as_deref(), Some(r#""layout.twig""#));
    }

    #[test]
    fn test_protects_literals() {
        let (out, _) = prepared("<p>a < b &amp; c & d ::if x && y < z::</p>");
        assert_eq!(
            out,
            "<p>a \u{E001} b &amp; c \u{E000} d ::if x \u{E000}\u{E000} y \u{E001} z::</p>"
        );
        assert_eq!(restore_literals(&out), "<p>a < b &amp; c & d ::if x && y < z::</p>");
    }

    #[test]
    fn test_unknown_attribute_directive_is_printed() {
        let (out, _) = prepared("<p ::x > 1::>");
        assert_eq!(out, "<p {{x \u{E002} 1}}>");
    }
}
