//! Edit composition for accepted completion proposals
//!
//! # Modules
//!
//! - [`snippet`]: Resolves snippet syntax to plain text and a cursor
//! - [`compositor`]: Applies a primary edit plus additional edits in one batch
//! - [`error`]: Compositor errors

pub mod compositor;
pub mod error;
pub mod snippet;

pub use compositor::{Drift, EditPlan, TextEditSpec};
pub use error::CompositorError;
pub use snippet::{ResolvedSnippet, resolve_snippet};
