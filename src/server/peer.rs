//! Peer traits and identifiers

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tower_lsp::lsp_types::{ServerCapabilities, Url};

use crate::server::error::PeerError;

/// Identity of one language server connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide unique JSON-RPC request id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One attached language server session
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait LanguageServerPeer: Send + Sync {
    /// Returns the identity of this connection
    fn id(&self) -> ServerId;

    /// Returns the capabilities the server declared on initialization
    fn capabilities(&self) -> ServerCapabilities;

    /// Sends a request and waits for its response
    ///
    /// # Returns
    /// * `Ok(Value)` - The raw `result` member of the response
    /// * `Err(PeerError)` - Error response, or the connection went away
    async fn request(&self, id: RequestId, method: &str, params: Value)
    -> Result<Value, PeerError>;

    /// Sends `$/cancelRequest` for `id`. The server may still answer.
    async fn cancel(&self, id: RequestId);
}

/// Source of the peers attached to a document
#[cfg_attr(test, automock)]
pub trait PeerProvider: Send + Sync {
    /// Snapshot of the peers attached to `uri` at call time
    fn peers_for(&self, uri: &Url) -> Vec<Arc<dyn LanguageServerPeer>>;
}
