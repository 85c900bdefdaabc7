//! Apply-ready completion proposals
//!
//! A [`CompletionProposal`] is bound to the snapshot and offset it was
//! computed against. Applying it later translates its edits across
//! whatever the user typed at the invocation offset in the meantime.

use std::sync::{Arc, OnceLock};

use tower_lsp::lsp_types::CompletionItem;
use tracing::debug;

use crate::completion::candidate::{Candidate, range_offsets};
use crate::completion::info::additional_info;
use crate::completion::label::StyledLabel;
use crate::completion::ranker::{MatchClass, Ranked, find_chars};
use crate::config::CONTINUE_TYPING_LABEL;
use crate::document::{Document, TextDocument};
use crate::edit::{CompositorError, Drift, EditPlan, TextEditSpec, resolve_snippet};
use crate::server::ServerId;

#[derive(Debug)]
pub struct CompletionProposal {
    candidate: Candidate,
    class: MatchClass,
    snapshot: Arc<TextDocument>,
    invocation: usize,
    replace: (usize, usize),
    info: OnceLock<String>,
}

impl CompletionProposal {
    pub fn new(ranked: Ranked, snapshot: Arc<TextDocument>, invocation: usize) -> Self {
        Self {
            candidate: ranked.candidate,
            class: ranked.class,
            snapshot,
            invocation,
            replace: ranked.replace,
            info: OnceLock::new(),
        }
    }

    /// Same proposal carrying `item`, e.g. after `completionItem/resolve`
    pub fn with_item(&self, item: CompletionItem) -> Self {
        Self {
            candidate: Candidate::new(item, self.candidate.server.clone(), self.candidate.position),
            class: self.class,
            snapshot: Arc::clone(&self.snapshot),
            invocation: self.invocation,
            replace: self.replace,
            info: OnceLock::new(),
        }
    }

    pub fn label(&self) -> &str {
        self.candidate.label()
    }

    pub fn server(&self) -> &ServerId {
        &self.candidate.server
    }

    pub fn item(&self) -> &CompletionItem {
        &self.candidate.item
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn match_class(&self) -> MatchClass {
        self.class
    }

    pub fn invocation(&self) -> usize {
        self.invocation
    }

    pub fn is_deprecated(&self) -> bool {
        self.candidate.is_deprecated()
    }

    pub fn styled_label(&self) -> StyledLabel {
        StyledLabel::new(self.label(), self.is_deprecated())
    }

    /// Styled label with the characters matching the text typed between the
    /// replace start and `offset` in bold
    pub fn styled_label_highlighted(&self, document: &dyn Document, offset: usize) -> StyledLabel {
        let label = self.styled_label();
        if offset <= self.replace.0 {
            return label;
        }
        let Ok(prefix) = document.slice(self.replace.0, offset) else {
            return label;
        };

        let text: Vec<char> = label.text.chars().collect();
        let prefix: Vec<char> = prefix.chars().collect();
        match find_chars(&text, &prefix, false) {
            Some(start) => label.with_bold(start, prefix.len()),
            None => label,
        }
    }

    /// Detail and documentation as HTML, computed on first use
    pub fn additional_info(&self) -> &str {
        self.info
            .get_or_init(|| additional_info(&self.candidate.item))
    }

    /// Edits in snapshot offsets
    pub fn edit_plan(&self) -> Result<EditPlan, CompositorError> {
        let (text, cursor) = if self.candidate.is_snippet() {
            let resolved = resolve_snippet(self.candidate.insert_text());
            (resolved.text, resolved.cursor)
        } else {
            (self.candidate.insert_text().to_string(), None)
        };

        let additional = self
            .candidate
            .item
            .additional_text_edits
            .iter()
            .flatten()
            .map(|edit| {
                let (start, end) = range_offsets(&*self.snapshot, edit.range)?;
                Ok(TextEditSpec::new(start, end, edit.new_text.clone()))
            })
            .collect::<Result<Vec<_>, CompositorError>>()?;

        Ok(EditPlan {
            primary: TextEditSpec::new(self.replace.0, self.replace.1, text),
            additional,
            cursor,
        })
    }

    /// Applies the proposal and returns the new cursor offset.
    ///
    /// Text inserted at the invocation offset since the snapshot is
    /// replaced by the proposal. Any other change is a stale snapshot.
    pub fn apply(&self, document: &dyn Document) -> Result<usize, CompositorError> {
        let typed =
            usize::try_from(self.growth(document)).map_err(|_| CompositorError::StaleSnapshot)?;
        let drift = self.typed_drift(document, typed)?;
        self.edit_plan()?.with_drift(&drift)?.apply(document)
    }

    /// Applies the proposal after the user typed up to `current_offset`.
    ///
    /// The document must be the snapshot with exactly the text between the
    /// invocation and `current_offset` inserted. `trigger` is appended when
    /// it is one of the item's commit characters.
    pub fn apply_with_typing(
        &self,
        document: &dyn Document,
        trigger: Option<char>,
        current_offset: usize,
    ) -> Result<usize, CompositorError> {
        let typed = current_offset
            .checked_sub(self.invocation)
            .ok_or(CompositorError::StaleSnapshot)?;
        let drift = self.typed_drift(document, typed)?;

        let mut plan = self.edit_plan()?;
        if let Some(c) = trigger.filter(|c| self.is_commit_character(*c)) {
            plan.primary.text.push(c);
        }
        plan.with_drift(&drift)?.apply(document)
    }

    fn is_commit_character(&self, c: char) -> bool {
        self.candidate
            .item
            .commit_characters
            .as_ref()
            .is_some_and(|chars| chars.iter().any(|commit| commit.chars().eq([c])))
    }

    fn growth(&self, document: &dyn Document) -> isize {
        document.len_chars() as isize - self.snapshot.len_chars() as isize
    }

    /// End of the invocation line's content in the snapshot
    fn invocation_line_end(&self) -> Result<usize, CompositorError> {
        let snapshot = &*self.snapshot;
        let line = snapshot.offset_to_line(self.invocation)?;
        let start = snapshot.line_offset(line)?;
        let end = snapshot.line_end_offset(line)?;
        let content = snapshot.slice(start, end)?;
        Ok(start + content.trim_end_matches(['\n', '\r']).chars().count())
    }

    /// Drift for `typed` characters inserted at the invocation offset.
    ///
    /// Fails unless `document` is the snapshot plus exactly that insertion.
    fn typed_drift(&self, document: &dyn Document, typed: usize) -> Result<Drift, CompositorError> {
        let growth = self.growth(document);
        if growth != typed as isize {
            return Err(CompositorError::StaleSnapshot);
        }

        let snapshot = &*self.snapshot;
        let unchanged_before =
            document.slice(0, self.invocation)? == snapshot.slice(0, self.invocation)?;
        let unchanged_after = document.slice(self.invocation + typed, document.len_chars())?
            == snapshot.slice(self.invocation, snapshot.len_chars())?;
        if !(unchanged_before && unchanged_after) {
            return Err(CompositorError::StaleSnapshot);
        }

        if typed > 0 {
            debug!(
                "{} characters typed since completion at {}",
                typed, self.invocation
            );
        }
        Ok(Drift {
            invocation: self.invocation,
            line_end: self.invocation_line_end()?,
            typed,
            growth,
        })
    }
}

/// One entry of a completion result
#[derive(Debug)]
pub enum Proposal {
    Completion(CompletionProposal),
    /// Appended when a server reported an incomplete list
    ContinueTyping,
    /// A server failed to answer
    ServerError { server: ServerId, message: String },
}

impl Proposal {
    pub fn display_string(&self) -> String {
        match self {
            Proposal::Completion(proposal) => proposal.label().to_string(),
            Proposal::ContinueTyping => CONTINUE_TYPING_LABEL.to_string(),
            Proposal::ServerError { server, message } => format!("{}: {}", server, message),
        }
    }

    pub fn styled_label(&self) -> StyledLabel {
        match self {
            Proposal::Completion(proposal) => proposal.styled_label(),
            _ => StyledLabel::plain(self.display_string()),
        }
    }

    pub fn additional_info(&self) -> &str {
        match self {
            Proposal::Completion(proposal) => proposal.additional_info(),
            _ => "",
        }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, Proposal::Completion(_))
    }

    pub fn as_completion(&self) -> Option<&CompletionProposal> {
        match self {
            Proposal::Completion(proposal) => Some(proposal),
            _ => None,
        }
    }

    /// Applies the proposal; sentinels leave the document alone and return `None`
    pub fn apply(&self, document: &dyn Document) -> Result<Option<usize>, CompositorError> {
        match self {
            Proposal::Completion(proposal) => proposal.apply(document).map(Some),
            _ => Ok(None),
        }
    }

    pub fn apply_with_typing(
        &self,
        document: &dyn Document,
        trigger: Option<char>,
        current_offset: usize,
    ) -> Result<Option<usize>, CompositorError> {
        match self {
            Proposal::Completion(proposal) => proposal
                .apply_with_typing(document, trigger, current_offset)
                .map(Some),
            _ => Ok(None),
        }
    }
}
