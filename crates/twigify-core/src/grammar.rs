//! Directive grammar: classification of source directives and their target renderings.
//!
//! A directive span is classified exactly once into a [`DirectiveToken`];
//! callers dispatch on the token instead of re-testing raw text against a
//! chain of patterns. Captured expressions are opaque substrings.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::scanner::balanced_parens;

/// `!` with any whitespace after it. Whether it negates depends on what follows.
static NOT_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\s*").expect("invalid not-operator regex"));

static AND_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*&&\s*").expect("invalid and-operator regex"));

static OR_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\|\s*").expect("invalid or-operator regex"));

/// Directives that open a block and start a new text partition.
static PARTITION_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"::(?:foreach|if|set)\b").expect("invalid partition boundary regex")
});

/// Kind of a recognised directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    If,
    ElseIf,
    Else,
    End,
    Foreach,
    Raw,
    RawBlock,
    Fill,
    Set,
    Use,
    Switch,
    Case,
    Print,
    CondAttr,
    ClassAttr,
    CheckedAttr,
    SelectedAttr,
}

/// Text-position directive with its captured expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveToken<'a> {
    /// `::switch <expr>::`
    Switch(&'a str),
    /// `::case::`
    Case,
    /// `::if <expr>::`
    If(&'a str),
    /// `::elseif <expr>::`
    ElseIf(&'a str),
    /// `::else::`
    Else,
    /// `::end::`
    End,
    /// `::foreach <item> <collection>::`
    Foreach {
        /// Loop variable.
        item: &'a str,
        /// Iterated expression.
        collection: &'a str,
    },
    /// `::raw __content__::`
    RawBlock,
    /// `::raw <expr>::`
    Raw(&'a str),
    /// `::fill <expr>::`
    Fill(&'a str),
    /// `::set <expr>::`
    Set(&'a str),
    /// `::use <name>::`
    Use(&'a str),
    /// `::<expr>::` matching nothing else.
    Print(&'a str),
}

impl<'a> DirectiveToken<'a> {
    /// Classify a directive span, delimiters included.
    ///
    /// Keywords are tested in priority order; anything unrecognised prints.
    #[must_use]
    pub fn classify(span: &'a str) -> Self {
        let body = span
            .strip_prefix("::")
            .and_then(|s| s.strip_suffix("::"))
            .unwrap_or(span);
        let (keyword, rest) = body
            .split_once(char::is_whitespace)
            .map_or((body, ""), |(keyword, rest)| (keyword, rest.trim()));

        match keyword {
            "switch" if !rest.is_empty() => Self::Switch(rest),
            "case" if rest.is_empty() => Self::Case,
            "if" if !rest.is_empty() => Self::If(rest),
            "elseif" if !rest.is_empty() => Self::ElseIf(rest),
            "else" if rest.is_empty() => Self::Else,
            "end" if rest.is_empty() => Self::End,
            "foreach" => match rest.split_once(char::is_whitespace) {
                Some((item, collection)) if !collection.trim().is_empty() => Self::Foreach {
                    item,
                    collection: collection.trim(),
                },
                _ => Self::Print(body),
            },
            "raw" if rest == "__content__" => Self::RawBlock,
            "raw" if !rest.is_empty() => Self::Raw(rest),
            "fill" if !rest.is_empty() => Self::Fill(rest),
            "set" if !rest.is_empty() => Self::Set(rest),
            "use" if !rest.is_empty() => Self::Use(rest),
            _ => Self::Print(body),
        }
    }

    #[must_use]
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Self::Switch(_) => DirectiveKind::Switch,
            Self::Case => DirectiveKind::Case,
            Self::If(_) => DirectiveKind::If,
            Self::ElseIf(_) => DirectiveKind::ElseIf,
            Self::Else => DirectiveKind::Else,
            Self::End => DirectiveKind::End,
            Self::Foreach { .. } => DirectiveKind::Foreach,
            Self::RawBlock => DirectiveKind::RawBlock,
            Self::Raw(_) => DirectiveKind::Raw,
            Self::Fill(_) => DirectiveKind::Fill,
            Self::Set(_) => DirectiveKind::Set,
            Self::Use(_) => DirectiveKind::Use,
            Self::Print(_) => DirectiveKind::Print,
        }
    }
}

/// Attribute-position directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeDirective<'a> {
    /// `::cond <expr>::`
    Cond(&'a str),
    /// `::attr class if(<cond>) <value>::`
    Class {
        /// Condition inside `if(...)`.
        cond: &'a str,
        /// Class applied when the condition holds.
        value: &'a str,
    },
    /// `::attr checked (<cond>)::`
    Checked(&'a str),
    /// `::attr selected (<cond>)::`
    Selected(&'a str),
}

impl<'a> AttributeDirective<'a> {
    /// Classify an attribute-position directive span, delimiters included.
    #[must_use]
    pub fn classify(span: &'a str) -> Option<Self> {
        let body = span.strip_prefix("::")?.strip_suffix("::")?.trim();

        if let Some(expr) = keyword_rest(body, "cond") {
            return (!expr.is_empty()).then_some(Self::Cond(expr));
        }

        let attr = keyword_rest(body, "attr")?;
        if let Some(rest) = attr.strip_prefix("class") {
            let rest = rest.trim_start().strip_prefix("if")?.trim_start();
            let (cond, consumed) = balanced_parens(rest)?;
            let value = unquote(rest[consumed..].trim());
            return Some(Self::Class {
                cond: cond.trim(),
                value,
            });
        }
        if let Some(rest) = attr.strip_prefix("checked") {
            return condition(rest).map(Self::Checked);
        }
        if let Some(rest) = attr.strip_prefix("selected") {
            return condition(rest).map(Self::Selected);
        }
        None
    }

    #[must_use]
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Self::Cond(_) => DirectiveKind::CondAttr,
            Self::Class { .. } => DirectiveKind::ClassAttr,
            Self::Checked(_) => DirectiveKind::CheckedAttr,
            Self::Selected(_) => DirectiveKind::SelectedAttr,
        }
    }

    /// Target value expression for `class`/`checked`/`selected`.
    ///
    /// Returns `None` for `cond`, which wraps the element instead.
    #[must_use]
    pub fn value_expression(&self) -> Option<String> {
        match self {
            Self::Cond(_) => None,
            Self::Class { cond, value } => Some(format!(r#"{{{{ {cond} ? "{value}" : "" }}}}"#)),
            Self::Checked(cond) | Self::Selected(cond) => Some(format!("{{{{ {cond} }}}}")),
        }
    }
}

/// Text after `keyword` when it is followed by whitespace.
fn keyword_rest<'a>(body: &'a str, keyword: &str) -> Option<&'a str> {
    body.strip_prefix(keyword)
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map(str::trim)
}

/// `(<cond>)` or a bare condition.
fn condition(rest: &str) -> Option<&str> {
    let rest = rest.trim();
    let cond = balanced_parens(rest).map_or(rest, |(inner, _)| inner).trim();
    (!cond.is_empty()).then_some(cond)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Rewrite logical operators of a condition into target syntax.
///
/// `!` not followed by `=` becomes `not `, `&&` becomes `and`, `||` becomes `or`.
#[must_use]
pub fn rewrite_logical(cond: &str) -> String {
    let cond = NOT_OPERATOR.replace_all(cond, |caps: &Captures| {
        let bang = &caps[0];
        let rest = caps.get(0).map_or("", |m| &cond[m.end()..]);
        // `!=` and a trailing `!` are not negations.
        if rest.is_empty() || rest.starts_with('=') {
            bang.to_owned()
        } else {
            "not ".to_owned()
        }
    });
    let cond = AND_OPERATOR.replace_all(&cond, " and ");
    OR_OPERATOR.replace_all(&cond, " or ").into_owned()
}

/// Split text before every `::foreach`, `::if` and `::set` occurrence.
///
/// Text before the first boundary stays in the first partition; the
/// partitions concatenate back to `text`.
pub(crate) fn split_partitions(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for boundary in PARTITION_BOUNDARY.find_iter(text) {
        if boundary.start() > start {
            parts.push(&text[start..boundary.start()]);
            start = boundary.start();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Replace every `::expr::` span with `{{expr}}`.
pub(crate) fn convert_print_spans(text: &str) -> String {
    use crate::scanner::{Segment, directive_spans};

    let mut out = String::with_capacity(text.len());
    for segment in directive_spans(text) {
        match segment {
            Segment::Directive(span) => {
                let body = &span[2..span.len() - 2];
                out.push_str("{{");
                out.push_str(body);
                out.push_str("}}");
            }
            other => out.push_str(other.source()),
        }
    }
    out
}

/// Swap a template path's source extension for the target one.
///
/// Quoted names keep their quotes; bare names are wrapped in double quotes.
#[must_use]
pub fn swap_extension(name: &str, from: &str, to: &str) -> String {
    let name = name.trim();
    let (quote, bare) = ['"', '\'']
        .into_iter()
        .find_map(|q| {
            name.strip_prefix(q)
                .and_then(|n| n.strip_suffix(q))
                .map(|inner| (q, inner))
        })
        .unwrap_or(('"', name));

    let swapped = bare
        .strip_suffix(from)
        .and_then(|stem| stem.strip_suffix('.'))
        .map_or_else(|| bare.to_owned(), |stem| format!("{stem}.{to}"));
    format!("{quote}{swapped}{quote}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_block_directives() {
        assert_eq!(DirectiveToken::classify("::if a > 1::"), DirectiveToken::If("a > 1"));
        assert_eq!(DirectiveToken::classify("::elseif b::"), DirectiveToken::ElseIf("b"));
        assert_eq!(DirectiveToken::classify("::else::"), DirectiveToken::Else);
        assert_eq!(DirectiveToken::classify("::end::"), DirectiveToken::End);
        assert_eq!(
            DirectiveToken::classify("::foreach user users.list()::"),
            DirectiveToken::Foreach {
                item: "user",
                collection: "users.list()",
            }
        );
    }

    #[test]
    fn test_classify_foreach_collection_with_spaces() {
        assert_eq!(
            DirectiveToken::classify("::foreach i [1, 2, 3]::"),
            DirectiveToken::Foreach {
                item: "i",
                collection: "[1, 2, 3]",
            }
        );
    }

    #[test]
    fn test_classify_raw_variants() {
        assert_eq!(DirectiveToken::classify("::raw __content__::"), DirectiveToken::RawBlock);
        assert_eq!(DirectiveToken::classify("::raw body::"), DirectiveToken::Raw("body"));
    }

    #[test]
    fn test_classify_switch_case() {
        assert_eq!(DirectiveToken::classify("::switch s::"), DirectiveToken::Switch("s"));
        assert_eq!(DirectiveToken::classify("::case::"), DirectiveToken::Case);
    }

    #[test]
    fn test_classify_print_fallback() {
        assert_eq!(DirectiveToken::classify("::user.name::"), DirectiveToken::Print("user.name"));
        // Keywords without their required expression fall back to print.
        assert_eq!(DirectiveToken::classify("::if::"), DirectiveToken::Print("if"));
        assert_eq!(DirectiveToken::classify("::endless::"), DirectiveToken::Print("endless"));
        assert_eq!(DirectiveToken::classify(":: x ::"), DirectiveToken::Print(" x "));
    }

    #[test]
    fn test_kind() {
        assert_eq!(DirectiveToken::classify("::fill x::").kind(), DirectiveKind::Fill);
        assert_eq!(DirectiveToken::classify("::set x = 1::").kind(), DirectiveKind::Set);
        assert_eq!(DirectiveToken::classify("::use 'a.mtt'::").kind(), DirectiveKind::Use);
    }

    #[test]
    fn test_classify_attribute_directives() {
        assert_eq!(
            AttributeDirective::classify("::cond user.active::"),
            Some(AttributeDirective::Cond("user.active"))
        );
        assert_eq!(
            AttributeDirective::classify("::attr class if(i == 0) first::"),
            Some(AttributeDirective::Class {
                cond: "i == 0",
                value: "first",
            })
        );
        assert_eq!(
            AttributeDirective::classify("::attr checked (opt.on)::"),
            Some(AttributeDirective::Checked("opt.on"))
        );
        assert_eq!(
            AttributeDirective::classify("::attr selected (a == f(b))::"),
            Some(AttributeDirective::Selected("a == f(b)"))
        );
        assert_eq!(AttributeDirective::classify("::name::"), None);
        assert_eq!(AttributeDirective::classify("::condition::"), None);
        assert_eq!(AttributeDirective::classify("::attr href x::"), None);
    }

    #[test]
    fn test_attribute_value_expression() {
        let class = AttributeDirective::Class {
            cond: "active",
            value: "on",
        };
        assert_eq!(
            class.value_expression().unwrap(),
            r#"{{ active ? "on" : "" }}"#
        );
        assert_eq!(
            AttributeDirective::Checked("x").value_expression().unwrap(),
            "{{ x }}"
        );
        assert_eq!(AttributeDirective::Cond("x").value_expression(), None);
    }

    #[test]
    fn test_class_value_quotes_stripped() {
        assert_eq!(
            AttributeDirective::classify("::attr class if(a) 'big red'::"),
            Some(AttributeDirective::Class {
                cond: "a",
                value: "big red",
            })
        );
    }

    #[test]
    fn test_rewrite_logical() {
        assert_eq!(rewrite_logical("!a && b"), "not a and b");
        assert_eq!(rewrite_logical("a||b"), "a or b");
        assert_eq!(rewrite_logical("a != b"), "a != b");
        assert_eq!(rewrite_logical("!a && !b || c != d"), "not a and not b or c != d");
        assert_eq!(rewrite_logical("! done"), "not done");
        assert_eq!(rewrite_logical("!!a"), "not not a");
        assert_eq!(rewrite_logical("!(a || !b)"), "not (a or not b)");
    }

    #[test]
    fn test_split_partitions() {
        assert_eq!(
            split_partitions("a ::if x::b::foreach i c::d::end::::set y::"),
            vec!["a ", "::if x::b", "::foreach i c::d::end::", "::set y::"]
        );
        assert_eq!(split_partitions("::if a::"), vec!["::if a::"]);
        assert_eq!(split_partitions("::elseif b::"), vec!["::elseif b::"]);
        assert_eq!(split_partitions(""), vec![""]);
    }

    #[test]
    fn test_convert_print_spans() {
        assert_eq!(convert_print_spans("/user/::id::/edit"), "/user/{{id}}/edit");
        assert_eq!(convert_print_spans("plain"), "plain");
    }

    #[test]
    fn test_swap_extension() {
        assert_eq!(swap_extension("layout.mtt", "mtt", "twig"), r#""layout.twig""#);
        assert_eq!(swap_extension("'base.mtt'", "mtt", "twig"), "'base.twig'");
        assert_eq!(swap_extension("\"x.html\"", "mtt", "twig"), r#""x.html""#);
    }
}
