//! Fan-out of one request to every qualifying peer
//!
//! Each peer gets its own tokio task, so a slow or failing server never
//! holds back the others. Callers receive the pending requests immediately
//! and consume every outcome on its own.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::ServerCapabilities;
use tower_lsp::lsp_types::request::Request;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_CANCEL_GRACE_MS;
use crate::server::error::PeerError;
use crate::server::peer::{LanguageServerPeer, RequestId, ServerId};

/// How a pending request ended
#[derive(Debug)]
pub enum RequestOutcome<T> {
    Resolved(T),
    /// Cancelled, or the peer went away before answering
    Cancelled,
    Failed(PeerError),
}

impl<T> RequestOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            RequestOutcome::Resolved(value) => Some(value),
            RequestOutcome::Cancelled | RequestOutcome::Failed(_) => None,
        }
    }

    fn from_response(response: Result<serde_json::Value, PeerError>) -> Self
    where
        T: DeserializeOwned,
    {
        match response {
            Ok(value) => match serde_json::from_value(value) {
                Ok(result) => RequestOutcome::Resolved(result),
                Err(e) => RequestOutcome::Failed(PeerError::Decode(e)),
            },
            Err(e) if e.is_cancellation() => RequestOutcome::Cancelled,
            Err(e) => RequestOutcome::Failed(e),
        }
    }
}

/// One outstanding request bound to exactly one peer
#[derive(Debug)]
pub struct PendingRequest<T> {
    server: ServerId,
    request_id: RequestId,
    token: CancellationToken,
    handle: JoinHandle<RequestOutcome<T>>,
}

impl<T: Send + 'static> PendingRequest<T> {
    pub fn server(&self) -> &ServerId {
        &self.server
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Signals cancellation. The response is still delivered if the server
    /// answers within the aggregator's cancel grace.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that cancels this request, usable after the request is consumed
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the request to end
    pub async fn outcome(self) -> RequestOutcome<T> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Request {} to {} did not complete: {}",
                    self.request_id, self.server, e
                );
                RequestOutcome::Cancelled
            }
        }
    }

    /// Chains `f` onto the outcome, keeping the same cancellation token.
    ///
    /// The returned request resolves with whatever `f` returns once it has run.
    pub fn then<U, F>(self, f: F) -> PendingRequest<U>
    where
        U: Send + 'static,
        F: FnOnce(RequestOutcome<T>) -> U + Send + 'static,
    {
        let server = self.server.clone();
        let request_id = self.request_id;
        let token = self.token.clone();
        let handle = tokio::spawn(async move { RequestOutcome::Resolved(f(self.outcome().await)) });

        PendingRequest {
            server,
            request_id,
            token,
            handle,
        }
    }
}

/// Signals cancellation to every request in `requests`
pub fn cancel_all<T: Send + 'static>(requests: &[PendingRequest<T>]) {
    for request in requests {
        request.cancel();
    }
}

/// Issues one request per qualifying peer
#[derive(Debug, Clone, Copy)]
pub struct RequestAggregator {
    cancel_grace: Duration,
}

impl Default for RequestAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestAggregator {
    pub fn new() -> Self {
        Self::with_cancel_grace(Duration::from_millis(DEFAULT_CANCEL_GRACE_MS))
    }

    /// Aggregator giving cancelled requests `cancel_grace` to answer before
    /// they end as [`RequestOutcome::Cancelled`]
    pub fn with_cancel_grace(cancel_grace: Duration) -> Self {
        Self { cancel_grace }
    }

    /// Dispatches `R` to every peer in `peers` accepted by `qualifies`.
    ///
    /// `params` builds the request parameters for each qualifying peer.
    /// Returns without waiting for any response; must be called from within
    /// a tokio runtime.
    pub fn dispatch<R, P, F>(
        &self,
        peers: &[Arc<dyn LanguageServerPeer>],
        qualifies: P,
        params: F,
    ) -> Vec<PendingRequest<R::Result>>
    where
        R: Request,
        R::Params: Send + 'static,
        R::Result: Send + 'static,
        P: Fn(&ServerCapabilities) -> bool,
        F: Fn(&dyn LanguageServerPeer) -> R::Params,
    {
        let pending: Vec<_> = peers
            .iter()
            .filter(|peer| qualifies(&peer.capabilities()))
            .map(|peer| {
                let params = params(peer.as_ref());
                spawn_request::<R>(Arc::clone(peer), params, self.cancel_grace)
            })
            .collect();

        info!(
            "Dispatched {} to {} of {} servers",
            R::METHOD,
            pending.len(),
            peers.len()
        );
        pending
    }
}

fn spawn_request<R>(
    peer: Arc<dyn LanguageServerPeer>,
    params: R::Params,
    cancel_grace: Duration,
) -> PendingRequest<R::Result>
where
    R: Request,
    R::Params: Send + 'static,
    R::Result: Send + 'static,
{
    let server = peer.id();
    let request_id = RequestId::next();
    let token = CancellationToken::new();

    let task_token = token.clone();
    let task_server = server.clone();
    let handle = tokio::spawn(async move {
        let params = match serde_json::to_value(params) {
            Ok(params) => params,
            Err(e) => {
                error!("Failed to encode {} params for {}: {}", R::METHOD, task_server, e);
                return RequestOutcome::Failed(PeerError::Encode(e));
            }
        };

        let request = peer.request(request_id, R::METHOD, params);
        tokio::pin!(request);

        let response = tokio::select! {
            response = &mut request => response,
            _ = task_token.cancelled() => {
                debug!("Cancelling {} {} on {}", R::METHOD, request_id, task_server);
                peer.cancel(request_id).await;
                match tokio::time::timeout(cancel_grace, request).await {
                    Ok(response) => response,
                    Err(_) => {
                        warn!(
                            "{} {} on {} still unanswered {:?} after cancel, giving up",
                            R::METHOD, request_id, task_server, cancel_grace
                        );
                        Err(PeerError::Cancelled)
                    }
                }
            }
        };

        let outcome = RequestOutcome::from_response(response);
        match &outcome {
            RequestOutcome::Resolved(_) => {
                debug!("{} {} resolved by {}", R::METHOD, request_id, task_server)
            }
            RequestOutcome::Cancelled => {
                debug!("{} {} cancelled on {}", R::METHOD, request_id, task_server)
            }
            RequestOutcome::Failed(e) => {
                warn!("{} {} failed on {}: {}", R::METHOD, request_id, task_server, e)
            }
        }
        outcome
    });

    PendingRequest {
        server,
        request_id,
        token,
        handle,
    }
}
