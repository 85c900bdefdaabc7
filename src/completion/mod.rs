//! Multi-server code completion
//!
//! # Modules
//!
//! - [`candidate`]: Raw completion items tagged with their origin
//! - [`ranker`]: Prefix matching, filtering and ordering
//! - [`label`]: Styled display labels
//! - [`markdown`]: Markdown rendering for additional information
//! - [`info`]: Additional information (detail and documentation)
//! - [`proposal`]: Apply-ready proposals and sentinels
//! - [`processor`]: Gathers and ranks items from every server

pub mod candidate;
pub mod info;
pub mod label;
pub mod markdown;
pub mod processor;
pub mod proposal;
pub mod ranker;

pub use candidate::Candidate;
pub use label::{StyleRange, StyledLabel};
pub use processor::CompletionProcessor;
pub use proposal::{CompletionProposal, Proposal};
pub use ranker::{MatchClass, Ranked, rank};
