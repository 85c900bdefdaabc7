//! Language server peers and multi-server request fan-out
//!
//! # Modules
//!
//! - [`peer`]: Peer and peer-provider traits, server and request identifiers
//! - [`capability`]: Capability predicates over `ServerCapabilities`
//! - [`aggregator`]: Fan-out dispatch and cancellable pending requests
//! - [`replay`]: Peers answering from recorded responses
//! - [`error`]: Peer errors

pub mod aggregator;
pub mod capability;
pub mod error;
pub mod peer;
pub mod replay;

pub use aggregator::{PendingRequest, RequestAggregator, RequestOutcome, cancel_all};
pub use capability::Capability;
pub use error::PeerError;
pub use peer::{LanguageServerPeer, PeerProvider, RequestId, ServerId};
pub use replay::{RecordedResponse, RecordedServer, ReplayPeer, StaticPeers};
