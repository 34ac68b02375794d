//! Error types for template conversion.

use crate::blocks::BlockKind;
use crate::placeholder::Family;

/// Error that aborts the conversion of a single document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// The placeholder-substituted markup could not be parsed.
    #[error("markup parse error")]
    XmlParse(#[from] quick_xml::Error),

    /// Encoding error while decoding parser events.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Block directives do not nest properly.
    #[error("malformed nesting: {0}")]
    MalformedNesting(#[from] NestingError),

    /// A placeholder refers to a table entry that was never recorded.
    #[error("unresolved placeholder {family}_{index}")]
    UnresolvedPlaceholder {
        /// Placeholder family.
        family: Family,
        /// Index that had no entry.
        index: usize,
    },

    /// A `<macro>` definition without a `name` attribute.
    #[error("macro definition on line {line} has no name attribute")]
    MissingMacroName {
        /// Line of the offending `<macro>` tag (1-indexed).
        line: usize,
    },
}

/// Structural error in block directive nesting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NestingError {
    /// `::end::` encountered while no block was open.
    #[error("`::end::` #{ordinal} closes no open block")]
    UnexpectedEnd {
        /// 1-based position of the offending `::end::` among all ends in the document.
        ordinal: usize,
    },

    /// Document ended with blocks still open.
    #[error("{depth} block(s) left open, innermost `{innermost}`")]
    Unclosed {
        /// Number of blocks still open.
        depth: usize,
        /// Most recently opened block.
        innermost: BlockKind,
    },

    /// `::case::` with no enclosing `::switch::`.
    #[error("`::case::` outside of `::switch::`")]
    CaseOutsideSwitch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_error_messages() {
        let err = ConvertError::from(NestingError::UnexpectedEnd { ordinal: 3 });
        assert_eq!(
            err.to_string(),
            "malformed nesting: `::end::` #3 closes no open block"
        );

        let err = NestingError::Unclosed {
            depth: 2,
            innermost: BlockKind::For,
        };
        assert_eq!(err.to_string(), "2 block(s) left open, innermost `for`");
    }

    #[test]
    fn test_unresolved_placeholder_message() {
        let err = ConvertError::UnresolvedPlaceholder {
            family: Family::Cond,
            index: 4,
        };
        assert_eq!(err.to_string(), "unresolved placeholder TWIG_COND_4");
    }
}
