//! In-memory document backed by a rope

use parking_lot::RwLock;
use ropey::{Rope, RopeSlice};
use tower_lsp::lsp_types::{Position, Url};

use crate::document::error::DocumentError;
use crate::document::traits::{Document, TextChange};

#[derive(Debug)]
struct Inner {
    rope: Rope,
    stamp: u64,
}

/// Rope-backed [`Document`] with interior mutability
#[derive(Debug)]
pub struct TextDocument {
    uri: Option<Url>,
    inner: RwLock<Inner>,
}

impl TextDocument {
    pub fn new(text: &str) -> Self {
        Self {
            uri: None,
            inner: RwLock::new(Inner {
                rope: Rope::from_str(text),
                stamp: 0,
            }),
        }
    }

    pub fn with_uri(uri: Url, text: &str) -> Self {
        Self {
            uri: Some(uri),
            ..Self::new(text)
        }
    }

    /// Document over an existing rope, e.g. a snapshot of another document
    pub fn from_rope(uri: Option<Url>, rope: Rope) -> Self {
        Self {
            uri,
            inner: RwLock::new(Inner { rope, stamp: 0 }),
        }
    }

    /// Clone of the current rope, cheap thanks to structural sharing
    pub fn snapshot(&self) -> Rope {
        self.inner.read().rope.clone()
    }
}

/// Number of characters on `line` excluding its line delimiter
fn content_len(line: RopeSlice<'_>) -> usize {
    let mut len = line.len_chars();
    if len > 0 && line.char(len - 1) == '\n' {
        len -= 1;
    }
    if len > 0 && line.char(len - 1) == '\r' {
        len -= 1;
    }
    len
}

fn check_line(rope: &Rope, line: usize) -> Result<(), DocumentError> {
    if line >= rope.len_lines() {
        return Err(DocumentError::LineOutOfBounds {
            line,
            line_count: rope.len_lines(),
        });
    }
    Ok(())
}

fn check_offset(rope: &Rope, offset: usize) -> Result<(), DocumentError> {
    if offset > rope.len_chars() {
        return Err(DocumentError::OffsetOutOfBounds {
            offset,
            len: rope.len_chars(),
        });
    }
    Ok(())
}

fn check_range(rope: &Rope, start: usize, end: usize) -> Result<(), DocumentError> {
    if start > end || end > rope.len_chars() {
        return Err(DocumentError::RangeOutOfBounds {
            start,
            end,
            len: rope.len_chars(),
        });
    }
    Ok(())
}

impl Document for TextDocument {
    fn uri(&self) -> Option<Url> {
        self.uri.clone()
    }

    fn text(&self) -> String {
        self.inner.read().rope.to_string()
    }

    fn len_chars(&self) -> usize {
        self.inner.read().rope.len_chars()
    }

    fn line_count(&self) -> usize {
        self.inner.read().rope.len_lines()
    }

    fn line_offset(&self, line: usize) -> Result<usize, DocumentError> {
        let inner = self.inner.read();
        check_line(&inner.rope, line)?;
        Ok(inner.rope.line_to_char(line))
    }

    fn line_end_offset(&self, line: usize) -> Result<usize, DocumentError> {
        let inner = self.inner.read();
        check_line(&inner.rope, line)?;
        if line + 1 < inner.rope.len_lines() {
            Ok(inner.rope.line_to_char(line + 1))
        } else {
            Ok(inner.rope.len_chars())
        }
    }

    fn offset_to_line(&self, offset: usize) -> Result<usize, DocumentError> {
        let inner = self.inner.read();
        check_offset(&inner.rope, offset)?;
        Ok(inner.rope.char_to_line(offset))
    }

    fn position_to_offset(&self, position: Position) -> Result<usize, DocumentError> {
        let inner = self.inner.read();
        let rope = &inner.rope;
        let line = position.line as usize;
        check_line(rope, line)?;

        let line_start = rope.line_to_char(line);
        let content = rope.line(line).slice(..content_len(rope.line(line)));
        let line_utf16 = content.len_utf16_cu();
        let character = (position.character as usize).min(line_utf16);

        let start_utf16 = rope.char_to_utf16_cu(line_start);
        Ok(rope.utf16_cu_to_char(start_utf16 + character))
    }

    fn offset_to_position(&self, offset: usize) -> Result<Position, DocumentError> {
        let inner = self.inner.read();
        let rope = &inner.rope;
        check_offset(rope, offset)?;

        let line = rope.char_to_line(offset);
        let line_start = rope.line_to_char(line);
        let character = rope.char_to_utf16_cu(offset) - rope.char_to_utf16_cu(line_start);
        Ok(Position::new(line as u32, character as u32))
    }

    fn slice(&self, start: usize, end: usize) -> Result<String, DocumentError> {
        let inner = self.inner.read();
        check_range(&inner.rope, start, end)?;
        Ok(inner.rope.slice(start..end).to_string())
    }

    fn modification_stamp(&self) -> u64 {
        self.inner.read().stamp
    }

    fn replace(&self, offset: usize, len: usize, text: &str) -> Result<TextChange, DocumentError> {
        let mut inner = self.inner.write();
        let end = offset.saturating_add(len);
        check_range(&inner.rope, offset, end)?;

        inner.rope.remove(offset..end);
        inner.rope.insert(offset, text);
        inner.stamp += 1;

        Ok(TextChange {
            offset,
            removed: len,
            inserted: text.chars().count(),
        })
    }
}
