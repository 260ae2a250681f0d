use thiserror::Error;

/// Errors raised by tile and grid operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("tile ({row}, {column}) is outside a {rows}x{columns} grid")]
    OutOfRange {
        row: i64,
        column: i64,
        rows: u32,
        columns: u32,
    },
    #[error("user flag {0} is outside 1-16")]
    InvalidUserFlag(u8),
    #[error("expected 16 user flag labels, got {0}")]
    InvalidFlagLabels(usize),
    #[error("grid and chunk dimensions must be non-zero")]
    InvalidDimensions,
}
