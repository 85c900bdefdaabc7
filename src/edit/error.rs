use thiserror::Error;

use crate::document::DocumentError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositorError {
    #[error("Edit {first_start}..{first_end} overlaps edit {second_start}..{second_end}")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    #[error("Edit {start}..{end} is out of bounds (document length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("Edit range {start}..{end} ends before it starts")]
    InvertedRange { start: usize, end: usize },

    #[error("Document changed in a way the proposal cannot follow")]
    StaleSnapshot,

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}
