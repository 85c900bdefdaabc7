//! In-memory annotation model
//!
//! Keeps annotations in insertion order and moves their spans along with
//! document edits the way a default position updater does: text inserted
//! inside a span grows it, text deleted over a span shrinks it, and a span
//! whose whole content is deleted decays to zero length.

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::document::TextChange;
use crate::folding::annotation::{
    Annotation, AnnotationBatch, AnnotationId, AnnotationModel, FoldingAnnotation, Span,
};

#[derive(Debug, Clone)]
struct Entry {
    annotation: Annotation,
    span: Span,
}

#[derive(Debug, Default)]
struct Inner {
    entries: IndexMap<AnnotationId, Entry>,
    next_id: u64,
    batches: usize,
    last_batch: Option<AnnotationBatch>,
}

impl Inner {
    fn insert(&mut self, annotation: Annotation, span: Span) -> AnnotationId {
        self.next_id += 1;
        let id = AnnotationId(self.next_id);
        self.entries.insert(id, Entry { annotation, span });
        id
    }
}

#[derive(Debug, Default)]
pub struct ProjectionModel {
    inner: RwLock<Inner>,
}

impl ProjectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an annotation owned by another subsystem
    pub fn add_other(&self, kind: impl Into<String>, span: Span) -> AnnotationId {
        self.inner
            .write()
            .insert(Annotation::Other { kind: kind.into() }, span)
    }

    pub fn get(&self, id: AnnotationId) -> Option<Annotation> {
        self.inner
            .read()
            .entries
            .get(&id)
            .map(|entry| entry.annotation.clone())
    }

    /// Folding annotations with their spans, ordered by offset
    pub fn folding_spans(&self) -> Vec<(AnnotationId, Span, FoldingAnnotation)> {
        let inner = self.inner.read();
        let mut spans: Vec<_> = inner
            .entries
            .iter()
            .filter_map(|(id, entry)| {
                entry
                    .annotation
                    .as_folding()
                    .map(|folding| (*id, entry.span, *folding))
            })
            .collect();
        spans.sort_by_key(|(_, span, _)| (span.offset, span.length));
        spans
    }

    /// Number of batches applied so far
    pub fn batch_count(&self) -> usize {
        self.inner.read().batches
    }

    pub fn last_batch(&self) -> Option<AnnotationBatch> {
        self.inner.read().last_batch.clone()
    }

    /// Moves every tracked span across a document edit
    pub fn document_changed(&self, change: TextChange) {
        let mut inner = self.inner.write();
        for entry in inner.entries.values_mut() {
            let removed = adapt_to_remove(entry.span, change.offset, change.removed);
            entry.span = adapt_to_insert(removed, change.offset, change.inserted);
        }
    }

    /// Collapses a folding annotation; returns whether it is now collapsed
    pub fn collapse(&self, id: AnnotationId) -> bool {
        self.with_folding(id, |folding| {
            folding.mark_collapsed();
            folding.is_collapsed()
        })
    }

    /// Expands a folding annotation; returns whether it was a folding annotation
    pub fn expand(&self, id: AnnotationId) -> bool {
        self.with_folding(id, |folding| {
            folding.mark_expanded();
            true
        })
    }

    /// Runs the pre-paint visibility computation for `id`
    pub fn update_visibility(&self, id: AnnotationId, pixel_height: u32, line_height: u32) {
        self.with_folding(id, |folding| {
            folding.update_visibility(pixel_height, line_height);
            folding.is_visible()
        });
    }

    fn with_folding(&self, id: AnnotationId, f: impl FnOnce(&mut FoldingAnnotation) -> bool) -> bool {
        let mut inner = self.inner.write();
        match inner.entries.get_mut(&id).map(|entry| &mut entry.annotation) {
            Some(Annotation::Folding(folding)) => f(folding),
            _ => false,
        }
    }
}

impl AnnotationModel for ProjectionModel {
    fn annotations(&self) -> Vec<(AnnotationId, Annotation)> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|(id, entry)| (*id, entry.annotation.clone()))
            .collect()
    }

    fn position(&self, id: AnnotationId) -> Option<Span> {
        self.inner.read().entries.get(&id).map(|entry| entry.span)
    }

    fn modify_annotations(&self, batch: AnnotationBatch) {
        let mut inner = self.inner.write();

        for id in &batch.deletions {
            inner.entries.shift_remove(id);
        }
        for (id, span) in &batch.updates {
            if let Some(entry) = inner.entries.get_mut(id) {
                entry.span = *span;
            }
        }
        for (folding, span) in &batch.additions {
            inner.insert(Annotation::Folding(*folding), *span);
        }

        inner.batches += 1;
        debug!(
            "Applied annotation batch: {} deleted, {} added, {} updated",
            batch.deletions.len(),
            batch.additions.len(),
            batch.updates.len()
        );
        inner.last_batch = Some(batch);
    }
}

fn adapt_to_remove(span: Span, offset: usize, length: usize) -> Span {
    if length == 0 {
        return span;
    }
    let my_start = span.offset;
    let my_end = span.end().saturating_sub(1).max(my_start);
    let yours_start = offset;
    let yours_end = offset + length - 1;

    if my_end < yours_start {
        return span;
    }

    if my_start <= yours_start {
        let removed = if yours_end <= my_end {
            length
        } else {
            my_end - yours_start + 1
        };
        Span::new(my_start, span.length.saturating_sub(removed))
    } else if yours_end < my_start {
        Span::new(my_start - length, span.length)
    } else {
        let overlap = yours_end - my_start + 1;
        Span::new(yours_start, span.length.saturating_sub(overlap))
    }
}

fn adapt_to_insert(span: Span, offset: usize, length: usize) -> Span {
    if length == 0 {
        return span;
    }
    let my_start = span.offset;
    let my_end = span.end().saturating_sub(1).max(my_start);

    if my_end < offset {
        span
    } else if my_start < offset {
        Span::new(my_start, span.length + length)
    } else {
        Span::new(my_start + length, span.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn change(offset: usize, removed: usize, inserted: usize) -> TextChange {
        TextChange {
            offset,
            removed,
            inserted,
        }
    }

    fn model_with_span(span: Span) -> (ProjectionModel, AnnotationId) {
        let model = ProjectionModel::new();
        model.modify_annotations(AnnotationBatch {
            additions: vec![(FoldingAnnotation::new(false), span)],
            ..Default::default()
        });
        let id = model.annotations()[0].0;
        (model, id)
    }

    #[rstest]
    #[case::insert_before(change(2, 0, 3), Span::new(13, 10))]
    #[case::insert_at_start_shifts(change(10, 0, 3), Span::new(13, 10))]
    #[case::insert_inside_grows(change(15, 0, 3), Span::new(10, 13))]
    #[case::insert_at_end_is_outside(change(20, 0, 3), Span::new(10, 10))]
    #[case::delete_before(change(2, 4, 0), Span::new(6, 10))]
    #[case::delete_inside(change(12, 4, 0), Span::new(10, 6))]
    #[case::delete_tail_overlap(change(15, 10, 0), Span::new(10, 5))]
    #[case::delete_head_overlap(change(5, 10, 0), Span::new(5, 5))]
    #[case::delete_everything(change(5, 20, 0), Span::new(5, 0))]
    #[case::replace_inside(change(12, 2, 5), Span::new(10, 13))]
    fn document_changed_moves_spans(#[case] change: TextChange, #[case] expected: Span) {
        let (model, id) = model_with_span(Span::new(10, 10));

        model.document_changed(change);

        assert_eq!(model.position(id), Some(expected));
    }

    #[test]
    fn modify_annotations_applies_batch_and_counts_it() {
        let (model, first) = model_with_span(Span::new(0, 5));
        let other = model.add_other("bookmark", Span::new(1, 1));

        model.modify_annotations(AnnotationBatch {
            deletions: vec![first],
            additions: vec![(FoldingAnnotation::new(true), Span::new(6, 4))],
            updates: vec![(other, Span::new(2, 1))],
        });

        assert_eq!(model.batch_count(), 2);
        assert_eq!(model.position(first), None);
        assert_eq!(model.position(other), Some(Span::new(2, 1)));
        let spans = model.folding_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].1, Span::new(6, 4));
        assert!(spans[0].2.is_collapsed());
    }

    #[test]
    fn collapse_requires_visibility_and_ignores_other_annotations() {
        let (model, id) = model_with_span(Span::new(0, 40));
        let other = model.add_other("marker", Span::new(0, 1));

        assert!(!model.collapse(id));
        model.update_visibility(id, 45, 15);
        assert!(model.collapse(id));
        assert!(model.expand(id));
        assert!(!model.collapse(other));
        assert!(!model.expand(other));
    }
}
