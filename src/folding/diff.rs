//! Diff of server folding ranges against live folding annotations

use tower_lsp::lsp_types::{FoldingRange, FoldingRangeKind};
use tracing::{debug, warn};

use crate::document::{Document, DocumentError};
use crate::folding::annotation::{
    AnnotationBatch, AnnotationId, AnnotationModel, FoldingAnnotation, Span,
};

/// Computes the batch turning the model's folding annotations into `ranges`.
///
/// Decayed annotations are always deleted. The remaining ones are paired
/// with the ranges by position: ranges sorted by end line take the
/// annotations in order of their tracked end. A paired annotation gets a
/// position update only when its span changed, or is deleted when the new
/// span is empty. Unpaired ranges become new annotations and unpaired
/// annotations are deleted.
pub fn folding_batch(
    model: &dyn AnnotationModel,
    document: &dyn Document,
    ranges: &[FoldingRange],
    collapse_imports: bool,
) -> AnnotationBatch {
    let mut batch = AnnotationBatch::default();

    let mut existing: Vec<(AnnotationId, Span)> = Vec::new();
    for (id, annotation) in model.annotations() {
        if annotation.as_folding().is_none() {
            continue;
        }
        match model.position(id) {
            Some(span) if !span.is_decayed() => existing.push((id, span)),
            _ => batch.deletions.push(id),
        }
    }
    // popped from the back, so the lowest end pairs first
    existing.sort_by(|(_, a), (_, b)| b.end().cmp(&a.end()));

    let line_count = document.line_count();
    let mut valid: Vec<&FoldingRange> = ranges
        .iter()
        .filter(|range| {
            let in_bounds = range.start_line <= range.end_line
                && (range.end_line as usize) < line_count;
            if !in_bounds {
                warn!(
                    "Dropping folding range {}..{} (document has {} lines)",
                    range.start_line, range.end_line, line_count
                );
            }
            in_bounds
        })
        .collect();
    valid.sort_by_key(|range| range.end_line);

    for range in valid {
        let span = match range_span(document, range) {
            Ok(span) => span,
            Err(e) => {
                warn!("Failed to locate folding range: {}", e);
                continue;
            }
        };

        match existing.pop() {
            Some((id, current)) => {
                if span.is_decayed() {
                    batch.deletions.push(id);
                } else if span != current {
                    batch.updates.push((id, span));
                }
            }
            None if span.is_decayed() => {
                debug!("Skipping empty folding range at line {}", range.start_line);
            }
            None => {
                let collapsed =
                    collapse_imports && range.kind == Some(FoldingRangeKind::Imports);
                batch
                    .additions
                    .push((FoldingAnnotation::new(collapsed), span));
            }
        }
    }

    batch.deletions.extend(existing.into_iter().map(|(id, _)| id));
    batch
}

/// Span from the start of `start_line` through the delimiter of `end_line`
fn range_span(document: &dyn Document, range: &FoldingRange) -> Result<Span, DocumentError> {
    let start = document.line_offset(range.start_line as usize)?;
    let end = document.line_end_offset(range.end_line as usize)?;
    Ok(Span::new(start, end - start))
}
