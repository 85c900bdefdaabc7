//! Document trait definition

use tower_lsp::lsp_types::{Position, Url};

use crate::document::error::DocumentError;

/// A text replacement that was applied to a document, in character offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChange {
    pub offset: usize,
    pub removed: usize,
    pub inserted: usize,
}

/// Read/write access to a host document.
///
/// Offsets are character offsets. Lines are zero-based. Implementations
/// guard their own state, so every method takes `&self`.
pub trait Document: Send + Sync {
    /// URI used to address the document on the wire
    fn uri(&self) -> Option<Url>;

    /// Full text of the document
    fn text(&self) -> String;

    /// Length of the document in characters
    fn len_chars(&self) -> usize;

    /// Number of lines (a trailing line break opens an empty last line)
    fn line_count(&self) -> usize;

    /// Offset of the first character of `line`
    fn line_offset(&self, line: usize) -> Result<usize, DocumentError>;

    /// Offset just past `line`, including its line delimiter
    fn line_end_offset(&self, line: usize) -> Result<usize, DocumentError>;

    /// Line containing `offset`
    fn offset_to_line(&self, offset: usize) -> Result<usize, DocumentError>;

    /// Convert an LSP (UTF-16) position to an offset.
    ///
    /// A character past the end of its line resolves to the end of that line.
    fn position_to_offset(&self, position: Position) -> Result<usize, DocumentError>;

    /// Convert an offset to an LSP (UTF-16) position
    fn offset_to_position(&self, offset: usize) -> Result<Position, DocumentError>;

    /// Text between two offsets
    fn slice(&self, start: usize, end: usize) -> Result<String, DocumentError>;

    /// Monotonic counter bumped by every modification
    fn modification_stamp(&self) -> u64;

    /// Replace `len` characters at `offset` with `text`
    fn replace(&self, offset: usize, len: usize, text: &str) -> Result<TextChange, DocumentError>;
}
