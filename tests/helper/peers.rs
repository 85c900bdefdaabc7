//! Peer and document builders

use std::sync::Arc;
use std::time::Duration;

use lsp_assist::document::TextDocument;
use lsp_assist::server::{
    LanguageServerPeer, PeerError, RecordedServer, ReplayPeer, RequestId, ServerId, StaticPeers,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tower_lsp::lsp_types::{ServerCapabilities, Url};

pub const DOCUMENT_URI: &str = "file:///project/src/main.rs";

/// Document addressed by [`DOCUMENT_URI`]
pub fn document(text: &str) -> Arc<TextDocument> {
    Arc::new(TextDocument::with_uri(Url::parse(DOCUMENT_URI).unwrap(), text))
}

/// Replay peer answering `textDocument/completion` with `result`
pub fn completion_server(name: &str, result: Value) -> Arc<ReplayPeer> {
    completion_server_with(name, json!({ "result": result }))
}

/// Replay peer answering `textDocument/completion` with a full recorded response
pub fn completion_server_with(name: &str, response: Value) -> Arc<ReplayPeer> {
    replay_server(
        name,
        json!({ "completionProvider": {} }),
        json!({ "textDocument/completion": response }),
    )
}

/// Replay peer answering `textDocument/foldingRange` with `ranges`
pub fn folding_server(name: &str, ranges: Value) -> Arc<ReplayPeer> {
    folding_server_with(name, json!({ "result": ranges }))
}

/// Replay peer answering `textDocument/foldingRange` with a full recorded response
pub fn folding_server_with(name: &str, response: Value) -> Arc<ReplayPeer> {
    replay_server(
        name,
        json!({ "foldingRangeProvider": true }),
        json!({ "textDocument/foldingRange": response }),
    )
}

fn replay_server(name: &str, capabilities: Value, responses: Value) -> Arc<ReplayPeer> {
    let recorded: RecordedServer = serde_json::from_value(json!({
        "name": name,
        "capabilities": capabilities,
        "responses": responses
    }))
    .unwrap();
    Arc::new(ReplayPeer::new(recorded))
}

/// Provider attaching `servers` to every document
pub fn provider(servers: &[Arc<ReplayPeer>]) -> Arc<StaticPeers> {
    Arc::new(StaticPeers::new(
        servers
            .iter()
            .map(|server| Arc::clone(server) as Arc<dyn LanguageServerPeer>)
            .collect(),
    ))
}

/// Peer whose responses the test releases one request at a time.
///
/// It ignores cancellation, like a server that answers anyway.
pub struct ScriptedPeer {
    name: String,
    capabilities: ServerCapabilities,
    waiting: Mutex<Vec<Option<oneshot::Sender<Value>>>>,
}

impl ScriptedPeer {
    pub fn folding(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            capabilities: serde_json::from_value(json!({ "foldingRangeProvider": true }))
                .unwrap(),
            waiting: Mutex::new(Vec::new()),
        })
    }

    /// Waits until `count` requests have arrived
    pub async fn wait_for_requests(&self, count: usize) {
        timeout(Duration::from_secs(5), async {
            while self.waiting.lock().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("requests did not arrive");
    }

    /// Answers the `index`-th request received
    pub fn respond(&self, index: usize, result: Value) {
        let sender = self.waiting.lock()[index]
            .take()
            .expect("request already answered");
        sender.send(result).unwrap();
    }
}

#[async_trait::async_trait]
impl LanguageServerPeer for ScriptedPeer {
    fn id(&self) -> ServerId {
        ServerId::new(self.name.clone())
    }

    fn capabilities(&self) -> ServerCapabilities {
        self.capabilities.clone()
    }

    async fn request(
        &self,
        _id: RequestId,
        _method: &str,
        _params: Value,
    ) -> Result<Value, PeerError> {
        let (sender, receiver) = oneshot::channel();
        self.waiting.lock().push(Some(sender));
        receiver
            .await
            .map_err(|_| PeerError::Disconnected(self.name.clone()))
    }

    async fn cancel(&self, _id: RequestId) {}
}
