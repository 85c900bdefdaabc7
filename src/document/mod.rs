//! Document collaborator
//!
//! The engine never owns document text. It reads and mutates it through the
//! [`Document`] trait, which hosts implement over their own buffers.
//!
//! # Modules
//!
//! - [`traits`]: The `Document` trait
//! - [`text`]: Rope-backed in-memory implementation
//! - [`error`]: Location errors

pub mod error;
pub mod text;
pub mod traits;

pub use error::DocumentError;
pub use text::TextDocument;
pub use traits::{Document, TextChange};
