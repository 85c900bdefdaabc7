//! Client-side aggregation of language server results
//!
//! Fans completion and folding requests out to every language server
//! attached to a document, merges their answers and turns them into
//! annotation batches and document edits.
//!
//! # Modules
//!
//! - [`server`]: Peers, capability predicates and request fan-out
//! - [`folding`]: Folding range reconciliation against an annotation model
//! - [`completion`]: Completion ranking and proposals
//! - [`edit`]: Snippet resolution and edit composition
//! - [`document`]: The document collaborator
//! - [`config`]: Configuration
//! - [`logging`]: Tracing setup

pub mod completion;
pub mod config;
pub mod document;
pub mod edit;
pub mod folding;
pub mod logging;
pub mod server;
