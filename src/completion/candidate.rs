//! Completion candidates

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemTag, CompletionTextEdit, InsertTextFormat, Range,
};

use crate::document::Document;
use crate::edit::CompositorError;
use crate::server::ServerId;

/// A completion item as reported by one server
#[derive(Debug, Clone)]
pub struct Candidate {
    pub item: CompletionItem,
    pub server: ServerId,
    /// `(server order, item index)` in the responses
    pub position: (usize, usize),
}

impl Candidate {
    pub fn new(item: CompletionItem, server: ServerId, position: (usize, usize)) -> Self {
        Self {
            item,
            server,
            position,
        }
    }

    pub fn label(&self) -> &str {
        &self.item.label
    }

    /// Text matched against the typed prefix
    pub fn filter_text(&self) -> &str {
        self.item.filter_text.as_deref().unwrap_or(&self.item.label)
    }

    pub fn sort_text(&self) -> &str {
        self.item.sort_text.as_deref().unwrap_or(&self.item.label)
    }

    pub fn has_sort_text(&self) -> bool {
        self.item.sort_text.is_some()
    }

    pub fn is_deprecated(&self) -> bool {
        self.item.deprecated == Some(true)
            || self
                .item
                .tags
                .as_ref()
                .is_some_and(|tags| tags.contains(&CompletionItemTag::DEPRECATED))
    }

    pub fn is_snippet(&self) -> bool {
        self.item.insert_text_format == Some(InsertTextFormat::SNIPPET)
    }

    /// Text inserted by the primary edit, before snippet resolution
    pub fn insert_text(&self) -> &str {
        match &self.item.text_edit {
            Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
            Some(CompletionTextEdit::InsertAndReplace(edit)) => &edit.new_text,
            None => self
                .item
                .insert_text
                .as_deref()
                .unwrap_or(&self.item.label),
        }
    }

    /// Offsets replaced by the primary edit.
    ///
    /// Items with a text edit use its range (the insert range of an
    /// insert/replace edit). Other items replace the identifier before
    /// `invocation`.
    pub fn replace_range(
        &self,
        document: &dyn Document,
        invocation: usize,
    ) -> Result<(usize, usize), CompositorError> {
        let range = match &self.item.text_edit {
            Some(CompletionTextEdit::Edit(edit)) => edit.range,
            Some(CompletionTextEdit::InsertAndReplace(edit)) => edit.insert,
            None => {
                let start = identifier_start(document, invocation)?;
                return Ok((start, invocation));
            }
        };
        range_offsets(document, range)
    }
}

pub(crate) fn range_offsets(
    document: &dyn Document,
    range: Range,
) -> Result<(usize, usize), CompositorError> {
    let start = document.position_to_offset(range.start)?;
    let end = document.position_to_offset(range.end)?;
    if start > end {
        return Err(CompositorError::InvertedRange { start, end });
    }
    Ok((start, end))
}

/// Start of the run of identifier characters ending at `offset`
pub(crate) fn identifier_start(
    document: &dyn Document,
    offset: usize,
) -> Result<usize, CompositorError> {
    let line_start = document.line_offset(document.offset_to_line(offset)?)?;
    let before = document.slice(line_start, offset)?;
    let run = before
        .chars()
        .rev()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .count();
    Ok(offset - run)
}
