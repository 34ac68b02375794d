//! Block stack used to resolve generic `::end::` directives.

use std::fmt;

use crate::error::NestingError;

/// Kind of block opened by a directive that needs a terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Opened by `if` and `switch`.
    If,
    /// Opened by `foreach`.
    For,
    /// Opened by `fill` and capture-form `set`.
    Set,
}

impl BlockKind {
    /// Target keyword, as used in `{% end<keyword> %}`.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::For => "for",
            Self::Set => "set",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// LIFO record of open blocks for one conversion.
#[derive(Debug, Default)]
pub(crate) struct BlockStack {
    open: Vec<BlockKind>,
    ends_seen: usize,
}

impl BlockStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, kind: BlockKind) {
        self.open.push(kind);
    }

    /// Close the innermost open block.
    pub(crate) fn pop(&mut self) -> Result<BlockKind, NestingError> {
        self.ends_seen += 1;
        self.open.pop().ok_or(NestingError::UnexpectedEnd {
            ordinal: self.ends_seen,
        })
    }

    pub(crate) fn depth(&self) -> usize {
        self.open.len()
    }

    /// Check that every opened block has been closed.
    pub(crate) fn ensure_closed(&self) -> Result<(), NestingError> {
        match self.open.last() {
            None => Ok(()),
            Some(&innermost) => Err(NestingError::Unclosed {
                depth: self.open.len(),
                innermost,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_is_lifo() {
        let mut stack = BlockStack::new();
        stack.push(BlockKind::If);
        stack.push(BlockKind::For);
        stack.push(BlockKind::Set);

        assert_eq!(stack.pop(), Ok(BlockKind::Set));
        assert_eq!(stack.pop(), Ok(BlockKind::For));
        assert_eq!(stack.pop(), Ok(BlockKind::If));
        assert_eq!(stack.depth(), 0);
        assert!(stack.ensure_closed().is_ok());
    }

    #[test]
    fn test_pop_empty_reports_ordinal() {
        let mut stack = BlockStack::new();
        stack.push(BlockKind::If);
        stack.pop().unwrap();

        assert_eq!(stack.pop(), Err(NestingError::UnexpectedEnd { ordinal: 2 }));
    }

    #[test]
    fn test_ensure_closed_reports_innermost() {
        let mut stack = BlockStack::new();
        stack.push(BlockKind::If);
        stack.push(BlockKind::For);

        assert_eq!(
            stack.ensure_closed(),
            Err(NestingError::Unclosed {
                depth: 2,
                innermost: BlockKind::For,
            })
        );
    }

    #[test]
    fn test_keyword() {
        assert_eq!(BlockKind::If.to_string(), "if");
        assert_eq!(BlockKind::For.keyword(), "for");
        assert_eq!(BlockKind::Set.keyword(), "set");
    }
}
