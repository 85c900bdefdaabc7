use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("Line {line} is out of bounds (document has {line_count} lines)")]
    LineOutOfBounds { line: usize, line_count: usize },

    #[error("Offset {offset} is out of bounds (document length {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("Range {start}..{end} is out of bounds (document length {len})")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
}
