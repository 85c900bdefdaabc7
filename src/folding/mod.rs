//! Folding range reconciliation
//!
//! Folding ranges reported by every attached server are merged and diffed
//! against the live folding annotations, producing one atomic batch of
//! additions, position updates and deletions per response.
//!
//! # Modules
//!
//! - [`annotation`]: Annotation types and the `AnnotationModel` trait
//! - [`projection`]: In-memory annotation model with position tracking
//! - [`diff`]: Computes the batch for a set of folding ranges
//! - [`reconciler`]: Drives requests and applies their results

pub mod annotation;
pub mod diff;
pub mod projection;
pub mod reconciler;

pub use annotation::{
    Annotation, AnnotationBatch, AnnotationId, AnnotationModel, FoldingAnnotation, Span,
};
pub use diff::folding_batch;
pub use projection::ProjectionModel;
pub use reconciler::{FoldingReconciler, ReconcileTrigger, ReconcilerState};
