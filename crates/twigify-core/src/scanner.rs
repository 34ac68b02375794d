//! Structural tokenizer for raw template source.
//!
//! Splits source into text, directive spans, macro calls and markup without
//! building a tree. Tokens borrow from the input and concatenate back to it
//! exactly, so a pass can rewrite the tokens it cares about and copy the rest
//! through verbatim. Start tags are tokenized attribute by attribute, which
//! keeps a directive confined to the tag it was written in.

use crate::tree::{AttrValue, Attribute};

/// Top-level token of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// Literal text.
    Text(&'a str),
    /// `::...::` span in text position, delimiters included.
    Directive(&'a str),
    /// `$$name(args)` in text position.
    Macro(MacroCall<'a>),
    /// Start tag, tokenized.
    StartTag(StartTag<'a>),
    /// End tag, comment, doctype or processing instruction.
    Markup(&'a str),
}

impl<'a> Segment<'a> {
    /// Source text covered by this segment.
    pub(crate) fn source(&self) -> &'a str {
        match self {
            Self::Text(s) | Self::Directive(s) | Self::Markup(s) => *s,
            Self::Macro(call) => call.source,
            Self::StartTag(tag) => tag.source,
        }
    }
}

/// `$$name(args)` macro call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MacroCall<'a> {
    /// Macro name.
    pub(crate) name: &'a str,
    /// Text between the outer parentheses.
    pub(crate) args: &'a str,
    /// Whole call as written.
    pub(crate) source: &'a str,
}

/// Tokenized start tag. The pieces concatenate to `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTag<'a> {
    pub(crate) name: &'a str,
    pub(crate) source: &'a str,
    pub(crate) pieces: Vec<TagPiece<'a>>,
}

impl StartTag<'_> {
    /// Parsed attributes of this tag.
    pub(crate) fn attributes(&self) -> Vec<Attribute> {
        attributes(&self.source[1 + self.name.len()..])
    }
}

/// Piece of a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TagPiece<'a> {
    /// Tag name, plain attributes, whitespace and the closing `>`.
    Raw(&'a str),
    /// `::...::` span in attribute position.
    Directive(&'a str),
    /// `$$name(args)` in attribute position.
    Macro(MacroCall<'a>),
}

impl<'a> TagPiece<'a> {
    pub(crate) fn source(&self) -> &'a str {
        match self {
            Self::Raw(s) | Self::Directive(s) => *s,
            Self::Macro(call) => call.source,
        }
    }
}

/// Tokenize template source, recognising markup, macro calls and directives.
pub(crate) fn segments(input: &str) -> Vec<Segment<'_>> {
    tokenize(input, true)
}

/// Tokenize text into literal runs and directive spans only.
///
/// Used on parser text nodes, where `<` and `$` carry no markup meaning.
pub(crate) fn directive_spans(input: &str) -> Vec<Segment<'_>> {
    tokenize(input, false)
}

fn tokenize(input: &str, with_markup: bool) -> Vec<Segment<'_>> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let found = match bytes[pos] {
            b'<' if with_markup => markup_at(input, pos),
            b'$' if with_markup => macro_call_at(input, pos).map(Segment::Macro),
            b':' => directive_at(input, pos).map(Segment::Directive),
            _ => None,
        };
        let Some(segment) = found else {
            pos += 1;
            continue;
        };

        if text_start < pos {
            out.push(Segment::Text(&input[text_start..pos]));
        }
        pos += segment.source().len();
        text_start = pos;
        out.push(segment);
    }

    if text_start < bytes.len() {
        out.push(Segment::Text(&input[text_start..]));
    }
    out
}

/// Directive span starting at `pos`. Spans never cross a line break.
fn directive_at(input: &str, pos: usize) -> Option<&str> {
    let rest = input[pos..].strip_prefix("::")?;
    let line = rest.find('\n').map_or(rest, |end| &rest[..end]);
    let close = line.find("::")?;
    if line[..close].trim().is_empty() {
        return None;
    }
    Some(&input[pos..pos + close + 4])
}

fn macro_call_at(input: &str, pos: usize) -> Option<MacroCall<'_>> {
    let rest = input[pos..].strip_prefix("$$")?;
    let name_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if name_len == 0 {
        return None;
    }
    let (args, consumed) = balanced_parens(&rest[name_len..])?;
    Some(MacroCall {
        name: &rest[..name_len],
        args,
        source: &input[pos..pos + 2 + name_len + consumed],
    })
}

/// Parenthesized group at the start of `s`.
///
/// Returns the inner text and the number of bytes consumed, both parentheses
/// included. Parentheses inside quoted strings do not count.
pub(crate) fn balanced_parens(s: &str) -> Option<(&str, usize)> {
    if !s.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote = None;
    for (i, b) in s.bytes().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'(') => depth += 1,
            (None, b')') => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[1..i], i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn markup_at(input: &str, pos: usize) -> Option<Segment<'_>> {
    let rest = &input[pos..];
    let bytes = rest.as_bytes();
    let next = *bytes.get(1)?;

    if rest.starts_with("<!--") {
        let end = rest[4..].find("-->").map_or(rest.len(), |i| i + 7);
        return Some(Segment::Markup(&rest[..end]));
    }

    match next {
        b'/' if !bytes.get(2).is_some_and(u8::is_ascii_alphabetic) => None,
        b'/' | b'!' | b'?' => {
            let end = rest.find('>')? + 1;
            Some(Segment::Markup(&rest[..end]))
        }
        b if b.is_ascii_alphabetic() => start_tag_at(rest).map(Segment::StartTag),
        _ => None,
    }
}

fn start_tag_at(rest: &str) -> Option<StartTag<'_>> {
    let bytes = rest.as_bytes();
    let name_end = 1 + rest[1..].bytes().take_while(|&b| is_name_byte(b)).count();
    let mut pieces = Vec::new();
    let mut raw_start = 0;
    let mut pos = name_end;

    while pos < bytes.len() {
        match bytes[pos] {
            b'>' => {
                pieces.push(TagPiece::Raw(&rest[raw_start..=pos]));
                return Some(StartTag {
                    name: &rest[1..name_end],
                    source: &rest[..=pos],
                    pieces,
                });
            }
            q @ (b'"' | b'\'') => {
                let close = rest[pos + 1..].find(char::from(q))?;
                pos += close + 2;
            }
            b':' | b'$' => {
                let piece = if bytes[pos] == b':' {
                    directive_at(rest, pos).map(TagPiece::Directive)
                } else {
                    macro_call_at(rest, pos).map(TagPiece::Macro)
                };
                let Some(piece) = piece else {
                    pos += 1;
                    continue;
                };
                if raw_start < pos {
                    pieces.push(TagPiece::Raw(&rest[raw_start..pos]));
                }
                pos += piece.source().len();
                raw_start = pos;
                pieces.push(piece);
            }
            // A new tag opens before this one closed.
            b'<' => return None,
            _ => pos += 1,
        }
    }
    None
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

/// Parse the attribute region of a start tag (everything after the tag name).
pub(crate) fn attributes(raw: &str) -> Vec<Attribute> {
    let bytes = raw.as_bytes();
    let mut attrs = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_whitespace() || b == b'/' {
            pos += 1;
            continue;
        }
        if b == b'>' {
            break;
        }

        let name_len = raw[pos..]
            .bytes()
            .take_while(|&c| !c.is_ascii_whitespace() && !matches!(c, b'=' | b'>' | b'/'))
            .count();
        if name_len == 0 {
            pos += 1;
            continue;
        }
        let name = &raw[pos..pos + name_len];
        pos += name_len;

        let after_name = skip_whitespace(raw, pos);
        let value = if bytes.get(after_name) == Some(&b'=') {
            pos = skip_whitespace(raw, after_name + 1);
            match bytes.get(pos) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let start = pos + 1;
                    let end = raw[start..]
                        .find(char::from(q))
                        .map_or(raw.len(), |i| start + i);
                    pos = (end + 1).min(raw.len());
                    AttrValue::Quoted {
                        value: raw[start..end].to_owned(),
                        quote: char::from(q),
                    }
                }
                _ => {
                    let len = raw[pos..]
                        .bytes()
                        .take_while(|&c| !c.is_ascii_whitespace() && c != b'>')
                        .count();
                    let value = raw[pos..pos + len].to_owned();
                    pos += len;
                    AttrValue::Unquoted(value)
                }
            }
        } else {
            AttrValue::Bare
        };

        attrs.push(Attribute {
            name: name.to_owned(),
            value,
        });
    }
    attrs
}

fn skip_whitespace(s: &str, pos: usize) -> usize {
    pos + s
        .get(pos..)
        .map_or(0, |rest| rest.bytes().take_while(u8::is_ascii_whitespace).count())
}
