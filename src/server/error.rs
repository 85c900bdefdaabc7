use thiserror::Error;
use tower_lsp::jsonrpc::{self, ErrorCode};

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Server {0} disconnected")]
    Disconnected(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("JSON-RPC error: {0}")]
    Rpc(#[from] jsonrpc::Error),

    #[error("Failed to encode params: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl PeerError {
    /// Whether the error means "no answer" rather than "failed".
    ///
    /// A vanished peer and the LSP cancellation codes fall in this group.
    pub fn is_cancellation(&self) -> bool {
        match self {
            PeerError::Disconnected(_) | PeerError::Cancelled => true,
            PeerError::Rpc(e) => matches!(
                e.code,
                ErrorCode::RequestCancelled | ErrorCode::ContentModified
            ),
            PeerError::Encode(_) | PeerError::Decode(_) => false,
        }
    }
}
