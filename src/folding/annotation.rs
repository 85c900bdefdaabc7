//! Annotation model types

#[cfg(test)]
use mockall::automock;

use crate::document::{Document, DocumentError};

/// A tracked character range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// The content the span covered has been deleted
    pub fn is_decayed(&self) -> bool {
        self.length == 0
    }

    /// First and last line of `document` the span covers.
    ///
    /// A span ending with a line delimiter does not cover the line after it.
    pub fn lines(&self, document: &dyn Document) -> Result<(usize, usize), DocumentError> {
        let start = document.offset_to_line(self.offset)?;
        let end = document.offset_to_line(self.end().saturating_sub(1).max(self.offset))?;
        Ok((start, end))
    }
}

/// Identity of an annotation inside its model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(pub u64);

/// A collapsible region created from a folding range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldingAnnotation {
    collapsed: bool,
    visible: bool,
}

impl FoldingAnnotation {
    /// New annotations stay invisible until the first visibility update
    pub fn new(collapsed: bool) -> Self {
        Self {
            collapsed,
            visible: false,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Collapses the annotation. Has no effect while it is not visible.
    pub fn mark_collapsed(&mut self) {
        if self.visible {
            self.collapsed = true;
        }
    }

    pub fn mark_expanded(&mut self) {
        self.collapsed = false;
    }

    /// Pre-paint computation: an expanded annotation spanning at most one
    /// rendered line is hidden.
    pub fn update_visibility(&mut self, pixel_height: u32, line_height: u32) {
        if self.collapsed {
            self.visible = true;
            return;
        }
        let lines = pixel_height.checked_div(line_height).unwrap_or(0);
        self.visible = lines > 1;
    }
}

/// An entry of the annotation model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Folding(FoldingAnnotation),
    /// Annotations owned by other subsystems sharing the model
    Other { kind: String },
}

impl Annotation {
    pub fn as_folding(&self) -> Option<&FoldingAnnotation> {
        match self {
            Annotation::Folding(folding) => Some(folding),
            Annotation::Other { .. } => None,
        }
    }
}

/// Changes applied to an annotation model in one step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationBatch {
    pub deletions: Vec<AnnotationId>,
    pub additions: Vec<(FoldingAnnotation, Span)>,
    pub updates: Vec<(AnnotationId, Span)>,
}

impl AnnotationBatch {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.additions.is_empty() && self.updates.is_empty()
    }
}

/// Host-owned store of position-tracked annotations
#[cfg_attr(test, automock)]
pub trait AnnotationModel: Send + Sync {
    /// Live annotations in enumeration order
    fn annotations(&self) -> Vec<(AnnotationId, Annotation)>;

    /// Current tracked position of `id`
    fn position(&self, id: AnnotationId) -> Option<Span>;

    /// Applies `batch` atomically
    fn modify_annotations(&self, batch: AnnotationBatch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;
    use rstest::rstest;

    #[rstest]
    #[case::whole_lines(Span::new(0, 17), (0, 2))]
    #[case::second_fold(Span::new(17, 17), (3, 5))]
    #[case::without_trailing_delimiter(Span::new(17, 16), (3, 5))]
    #[case::decayed(Span::new(9, 0), (1, 1))]
    fn lines_excludes_line_after_trailing_delimiter(
        #[case] span: Span,
        #[case] expected: (usize, usize),
    ) {
        let document = TextDocument::new("fn a() {\n    1\n}\nfn b() {\n    2\n}\n");

        assert_eq!(span.lines(&document).unwrap(), expected);
    }

    #[test]
    fn mark_collapsed_is_ignored_while_invisible() {
        let mut annotation = FoldingAnnotation::new(false);

        annotation.mark_collapsed();
        assert!(!annotation.is_collapsed());

        annotation.update_visibility(60, 15);
        annotation.mark_collapsed();
        assert!(annotation.is_collapsed());
    }

    #[rstest]
    #[case::single_line(15, 15, false)]
    #[case::partial_second_line(29, 15, false)]
    #[case::two_lines(30, 15, true)]
    #[case::zero_line_height(30, 0, false)]
    fn update_visibility_hides_single_line_folds(
        #[case] pixel_height: u32,
        #[case] line_height: u32,
        #[case] expected: bool,
    ) {
        let mut annotation = FoldingAnnotation::new(false);

        annotation.update_visibility(pixel_height, line_height);

        assert_eq!(annotation.is_visible(), expected);
    }

    #[test]
    fn collapsed_annotation_stays_visible() {
        let mut annotation = FoldingAnnotation::new(true);

        annotation.update_visibility(10, 15);

        assert!(annotation.is_visible());
        assert!(annotation.is_collapsed());
    }

    #[test]
    fn span_decays_at_zero_length() {
        assert!(Span::new(10, 0).is_decayed());
        assert!(!Span::new(10, 1).is_decayed());
        assert_eq!(Span::new(10, 5).end(), 15);
    }
}
