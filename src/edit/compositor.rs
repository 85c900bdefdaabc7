//! Applies a primary edit plus additional edits as one batch
//!
//! Edits are expressed in the offset space of the snapshot the proposal was
//! computed against. [`EditPlan::with_drift`] moves them across text the
//! user typed since, and [`EditPlan::apply`] validates everything before
//! mutating the document right to left.

use std::iter;

use tracing::debug;

use crate::document::Document;
use crate::edit::error::CompositorError;

/// A replacement of `start..end` (character offsets) by `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditSpec {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextEditSpec {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(offset, offset, text)
    }

    fn inserted_len(&self) -> usize {
        self.text.chars().count()
    }

    fn delta(&self) -> isize {
        self.inserted_len() as isize - (self.end - self.start) as isize
    }
}

/// Text typed at the invocation offset after a proposal was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drift {
    /// Offset the proposal was computed at
    pub invocation: usize,
    /// End of the invocation line's content in the snapshot
    pub line_end: usize,
    /// Characters between the invocation offset and the current offset
    pub typed: usize,
    /// Length change of the whole document since the snapshot
    pub growth: isize,
}

impl Drift {
    /// Snapshot offset at or after the invocation mapped to the current document.
    ///
    /// Offsets on the invocation line move past the typed text. Offsets on
    /// later lines move by however much the document actually grew.
    fn map(&self, offset: usize) -> Result<usize, CompositorError> {
        if offset < self.invocation {
            Ok(offset)
        } else if offset <= self.line_end {
            Ok(offset + self.typed)
        } else {
            offset
                .checked_add_signed(self.growth)
                .ok_or(CompositorError::StaleSnapshot)
        }
    }
}

/// The edits one accepted proposal performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    pub primary: TextEditSpec,
    pub additional: Vec<TextEditSpec>,
    /// Cursor as a character offset into `primary.text`; end of the text when absent
    pub cursor: Option<usize>,
}

impl EditPlan {
    pub fn new(primary: TextEditSpec) -> Self {
        Self {
            primary,
            additional: Vec::new(),
            cursor: None,
        }
    }

    /// Moves the plan across typing that happened at the invocation offset.
    ///
    /// The primary edit keeps its start and stretches over the typed text.
    /// Additional edits before the invocation stay; those at or after it
    /// move. An additional edit spanning the invocation offset cannot be
    /// moved once something was typed there.
    pub fn with_drift(&self, drift: &Drift) -> Result<EditPlan, CompositorError> {
        if drift.typed == 0 && drift.growth == 0 {
            return Ok(self.clone());
        }

        let primary = TextEditSpec {
            start: if self.primary.start <= drift.invocation {
                self.primary.start
            } else {
                drift.map(self.primary.start)?
            },
            end: if self.primary.end >= drift.invocation {
                drift.map(self.primary.end)?
            } else {
                self.primary.end
            },
            text: self.primary.text.clone(),
        };

        let additional = self
            .additional
            .iter()
            .map(|edit| {
                if edit.start >= drift.invocation {
                    Ok(TextEditSpec::new(
                        drift.map(edit.start)?,
                        drift.map(edit.end)?,
                        edit.text.clone(),
                    ))
                } else if edit.end <= drift.invocation {
                    Ok(edit.clone())
                } else if drift.typed > 0 {
                    Err(CompositorError::Overlap {
                        first_start: edit.start,
                        first_end: edit.end,
                        second_start: drift.invocation,
                        second_end: drift.invocation + drift.typed,
                    })
                } else {
                    Ok(TextEditSpec::new(
                        edit.start,
                        drift.map(edit.end)?,
                        edit.text.clone(),
                    ))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EditPlan {
            primary,
            additional,
            cursor: self.cursor,
        })
    }

    /// Applies every edit to `document` and returns the resulting cursor offset.
    ///
    /// Nothing is modified when any edit is out of bounds or two edits overlap.
    pub fn apply(&self, document: &dyn Document) -> Result<usize, CompositorError> {
        let len = document.len_chars();
        let mut edits: Vec<(&TextEditSpec, bool)> = iter::once((&self.primary, true))
            .chain(self.additional.iter().map(|edit| (edit, false)))
            .collect();

        for (edit, _) in &edits {
            if edit.start > edit.end {
                return Err(CompositorError::InvertedRange {
                    start: edit.start,
                    end: edit.end,
                });
            }
            if edit.end > len {
                return Err(CompositorError::OutOfBounds {
                    start: edit.start,
                    end: edit.end,
                    len,
                });
            }
        }

        // the primary edit goes first among edits starting at the same offset
        edits.sort_by_key(|(edit, primary)| (edit.start, !primary));
        for pair in edits.windows(2) {
            let (first, _) = pair[0];
            let (second, _) = pair[1];
            if first.end > second.start {
                return Err(CompositorError::Overlap {
                    first_start: first.start,
                    first_end: first.end,
                    second_start: second.start,
                    second_end: second.end,
                });
            }
        }

        let shift_before_primary: isize = edits
            .iter()
            .filter(|(edit, primary)| !primary && edit.start < self.primary.start)
            .map(|(edit, _)| edit.delta())
            .sum();
        let inserted = self.primary.inserted_len();
        let cursor_in_primary = self.cursor.map_or(inserted, |cursor| cursor.min(inserted));

        for (edit, _) in edits.iter().rev() {
            document.replace(edit.start, edit.end - edit.start, &edit.text)?;
        }

        let cursor = self
            .primary
            .start
            .saturating_add_signed(shift_before_primary)
            + cursor_in_primary;
        debug!(
            "Applied {} edits, cursor at {}",
            self.additional.len() + 1,
            cursor
        );
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;

    const LINE: &str = "this <> is <> the main <> content of the file";

    #[test]
    fn applies_additional_edits_before_primary_on_same_line() {
        let doc = TextDocument::new(LINE);
        let plan = EditPlan {
            primary: TextEditSpec::insert(24, "MainInsertText"),
            additional: vec![
                TextEditSpec::insert(6, "addOnText1"),
                TextEditSpec::insert(12, "addOnText2"),
            ],
            cursor: None,
        };

        let cursor = plan.apply(&doc).unwrap();

        assert_eq!(
            doc.text(),
            "this <addOnText1> is <addOnText2> the main <MainInsertText> content of the file"
        );
        assert_eq!(cursor, 58);
    }

    #[test]
    fn overlapping_additional_edits_are_rejected_without_changes() {
        let doc = TextDocument::new(LINE);
        let plan = EditPlan {
            primary: TextEditSpec::insert(24, "x"),
            additional: vec![
                TextEditSpec::new(4, 10, "a"),
                TextEditSpec::new(8, 12, "b"),
            ],
            cursor: None,
        };

        let result = plan.apply(&doc);

        assert_eq!(
            result,
            Err(CompositorError::Overlap {
                first_start: 4,
                first_end: 10,
                second_start: 8,
                second_end: 12
            })
        );
        assert_eq!(doc.text(), LINE);
    }

    #[test]
    fn edit_past_document_end_is_rejected() {
        let doc = TextDocument::new("short");
        let plan = EditPlan::new(TextEditSpec::new(2, 9, "x"));

        assert_eq!(
            plan.apply(&doc),
            Err(CompositorError::OutOfBounds {
                start: 2,
                end: 9,
                len: 5
            })
        );
    }

    #[test]
    fn explicit_cursor_wins_over_end_of_text() {
        let doc = TextDocument::new("ab");
        let plan = EditPlan {
            primary: TextEditSpec::insert(1, "fn name() {\n\t\n}"),
            additional: vec![TextEditSpec::insert(0, "use x;\n")],
            cursor: Some(13),
        };

        let cursor = plan.apply(&doc).unwrap();

        assert_eq!(doc.text(), "use x;\nafn name() {\n\t\n}b");
        assert_eq!(cursor, 7 + 1 + 13);
    }

    #[test]
    fn drift_shifts_edits_on_invocation_line_only() {
        // "Main" is the text typed after invoking at offset 12
        let content = "this <> is <Main> the main <> content of the file\nthis is <> the second line";
        let doc = TextDocument::new(content);
        let plan = EditPlan {
            primary: TextEditSpec::insert(12, "MainInsertText"),
            additional: vec![
                TextEditSpec::insert(6, "addOnText1"),
                TextEditSpec::insert(24, "addOnText2"),
                TextEditSpec::insert(59, "addOnText3"),
            ],
            cursor: None,
        };
        let drift = Drift {
            invocation: 12,
            line_end: 49,
            typed: 4,
            growth: 0,
        };

        plan.with_drift(&drift).unwrap().apply(&doc).unwrap();

        assert_eq!(
            doc.text(),
            "this <addOnText1> is <MainInsertText> the main <addOnText2> content of the file\nthis is <addOnText3> the second line"
        );
    }

    #[test]
    fn drift_from_real_typing_replaces_typed_text() {
        let doc = TextDocument::new("str");
        let plan = EditPlan::new(TextEditSpec::new(0, 3, "strncasecmp()"));
        doc.replace(3, 0, "nc").unwrap();
        let drift = Drift {
            invocation: 3,
            line_end: 3,
            typed: 2,
            growth: 2,
        };

        let cursor = plan.with_drift(&drift).unwrap().apply(&doc).unwrap();

        assert_eq!(doc.text(), "strncasecmp()");
        assert_eq!(cursor, 13);
    }

    #[test]
    fn drift_moves_later_lines_by_actual_growth() {
        let doc = TextDocument::new("ab\ncd");
        let plan = EditPlan {
            primary: TextEditSpec::new(0, 2, "abc"),
            additional: vec![TextEditSpec::insert(5, "!")],
            cursor: None,
        };
        doc.replace(2, 0, "x").unwrap();
        let drift = Drift {
            invocation: 2,
            line_end: 2,
            typed: 1,
            growth: 1,
        };

        plan.with_drift(&drift).unwrap().apply(&doc).unwrap();

        assert_eq!(doc.text(), "abc\ncd!");
    }

    #[test]
    fn additional_edit_across_typed_text_is_an_overlap() {
        let plan = EditPlan {
            primary: TextEditSpec::insert(5, "x"),
            additional: vec![TextEditSpec::new(3, 7, "y")],
            cursor: None,
        };
        let drift = Drift {
            invocation: 5,
            line_end: 10,
            typed: 2,
            growth: 2,
        };

        assert!(matches!(
            plan.with_drift(&drift),
            Err(CompositorError::Overlap { .. })
        ));
    }
}
