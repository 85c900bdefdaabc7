//! Peers answering from recorded responses
//!
//! Used by the CLI to run the engine against captured server output, and by
//! the integration tests to script slow, failing or vanishing servers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::{self, ErrorCode};
use tower_lsp::lsp_types::{ServerCapabilities, Url};
use tracing::debug;

use crate::server::error::PeerError;
use crate::server::peer::{LanguageServerPeer, PeerProvider, RequestId, ServerId};

/// A recorded server: its capabilities and one response per method
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedServer {
    pub name: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    #[serde(default)]
    pub responses: IndexMap<String, RecordedResponse>,
}

/// How a recorded server answers one method
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordedResponse {
    /// `result` member of the response
    pub result: Value,
    /// Error response sent instead of `result`
    pub error: Option<jsonrpc::Error>,
    /// Time to wait before answering
    pub delay_ms: u64,
    /// Drop the connection instead of answering
    pub disconnect: bool,
    /// Answer normally even after `$/cancelRequest`
    pub ignore_cancel: bool,
}

/// A [`LanguageServerPeer`] backed by a [`RecordedServer`]
#[derive(Debug)]
pub struct ReplayPeer {
    recorded: RecordedServer,
    in_flight: Mutex<HashMap<RequestId, CancellationToken>>,
    requests: Mutex<Vec<(RequestId, String, Value)>>,
    cancelled: Mutex<Vec<RequestId>>,
}

impl ReplayPeer {
    pub fn new(recorded: RecordedServer) -> Self {
        Self {
            recorded,
            in_flight: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in arrival order
    pub fn received(&self) -> Vec<(RequestId, String, Value)> {
        self.requests.lock().clone()
    }

    /// Number of requests received for `method`
    pub fn request_count(&self, method: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(_, m, _)| m == method)
            .count()
    }

    /// Ids passed to `cancel`, in call order
    pub fn cancelled(&self) -> Vec<RequestId> {
        self.cancelled.lock().clone()
    }
}

#[async_trait::async_trait]
impl LanguageServerPeer for ReplayPeer {
    fn id(&self) -> ServerId {
        ServerId::new(self.recorded.name.clone())
    }

    fn capabilities(&self) -> ServerCapabilities {
        self.recorded.capabilities.clone()
    }

    async fn request(
        &self,
        id: RequestId,
        method: &str,
        params: Value,
    ) -> Result<Value, PeerError> {
        self.requests.lock().push((id, method.to_string(), params));

        let Some(response) = self.recorded.responses.get(method) else {
            debug!("{} has no recorded response for {}", self.recorded.name, method);
            return Err(PeerError::Rpc(jsonrpc::Error::method_not_found()));
        };

        let token = CancellationToken::new();
        self.in_flight.lock().insert(id, token.clone());

        let delay = tokio::time::sleep(Duration::from_millis(response.delay_ms));
        let cancelled = if response.ignore_cancel {
            delay.await;
            false
        } else {
            tokio::select! {
                _ = delay => false,
                _ = token.cancelled() => true,
            }
        };
        self.in_flight.lock().remove(&id);

        if cancelled {
            return Err(PeerError::Rpc(jsonrpc::Error::new(
                ErrorCode::RequestCancelled,
            )));
        }
        if response.disconnect {
            return Err(PeerError::Disconnected(self.recorded.name.clone()));
        }
        if let Some(error) = &response.error {
            return Err(PeerError::Rpc(error.clone()));
        }
        Ok(response.result.clone())
    }

    async fn cancel(&self, id: RequestId) {
        self.cancelled.lock().push(id);
        if let Some(token) = self.in_flight.lock().get(&id) {
            token.cancel();
        }
    }
}

/// A [`PeerProvider`] attaching the same peers to every document
#[derive(Default)]
pub struct StaticPeers {
    peers: RwLock<Vec<Arc<dyn LanguageServerPeer>>>,
}

impl StaticPeers {
    pub fn new(peers: Vec<Arc<dyn LanguageServerPeer>>) -> Self {
        Self {
            peers: RwLock::new(peers),
        }
    }

    /// Builds replay peers from a JSON list of recorded servers
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let recorded: Vec<RecordedServer> = serde_json::from_str(json)?;
        Ok(Self::new(
            recorded
                .into_iter()
                .map(|server| Arc::new(ReplayPeer::new(server)) as Arc<dyn LanguageServerPeer>)
                .collect(),
        ))
    }

    pub fn attach(&self, peer: Arc<dyn LanguageServerPeer>) {
        self.peers.write().push(peer);
    }

    /// Removes the peer with `id`, returning whether one was attached
    pub fn detach(&self, id: &ServerId) -> bool {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|peer| &peer.id() != id);
        peers.len() != before
    }
}

impl PeerProvider for StaticPeers {
    fn peers_for(&self, _uri: &Url) -> Vec<Arc<dyn LanguageServerPeer>> {
        self.peers.read().clone()
    }
}
