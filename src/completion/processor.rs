//! Gathers completion items from every server and turns them into proposals

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use ropey::Rope;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::request::{Completion, ResolveCompletionItem};
use tower_lsp::lsp_types::{
    CompletionContext, CompletionParams, CompletionResponse, CompletionTriggerKind,
    PartialResultParams, Position, TextDocumentIdentifier, TextDocumentPositionParams, Url,
    WorkDoneProgressParams,
};
use tracing::{debug, error, info, warn};

use crate::completion::candidate::Candidate;
use crate::completion::proposal::{CompletionProposal, Proposal};
use crate::completion::ranker::rank;
use crate::config::CompletionConfig;
use crate::document::{Document, TextDocument};
use crate::server::{Capability, PeerProvider, RequestAggregator, RequestOutcome, ServerId};

/// What came back from the servers of one completion request
#[derive(Default)]
struct Gathered {
    candidates: Vec<Candidate>,
    errors: Vec<(ServerId, String)>,
    incomplete: bool,
}

impl Gathered {
    fn record(
        &mut self,
        order: usize,
        server: ServerId,
        outcome: RequestOutcome<Option<CompletionResponse>>,
    ) {
        let items = match outcome {
            RequestOutcome::Resolved(Some(CompletionResponse::Array(items))) => items,
            RequestOutcome::Resolved(Some(CompletionResponse::List(list))) => {
                self.incomplete |= list.is_incomplete;
                list.items
            }
            RequestOutcome::Resolved(None) => Vec::new(),
            RequestOutcome::Cancelled => {
                debug!("Completion request to {} cancelled", server);
                return;
            }
            RequestOutcome::Failed(e) => {
                warn!("Failed to get completions from {}: {}", server, e);
                self.errors.push((server, e.to_string()));
                return;
            }
        };

        debug!("{} returned {} completion items", server, items.len());
        self.candidates.extend(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| Candidate::new(item, server.clone(), (order, index))),
        );
    }
}

pub struct CompletionProcessor {
    peers: Arc<dyn PeerProvider>,
    config: CompletionConfig,
    aggregator: RequestAggregator,
}

impl CompletionProcessor {
    pub fn new(peers: Arc<dyn PeerProvider>, config: CompletionConfig) -> Self {
        let aggregator =
            RequestAggregator::with_cancel_grace(Duration::from_millis(config.cancel_grace_ms));
        Self {
            peers,
            config,
            aggregator,
        }
    }

    /// Asks every server with completion support for items at `offset` and
    /// returns the ranked proposals.
    ///
    /// Servers that have not answered once the configured timeout elapses
    /// are cancelled and contribute nothing.
    pub async fn compute_completion_proposals(
        &self,
        document: &dyn Document,
        offset: usize,
    ) -> Vec<Proposal> {
        let Some(uri) = document.uri() else {
            debug!("Document has no URI, skipping completion");
            return Vec::new();
        };
        let Ok(position) = document
            .offset_to_position(offset)
            .inspect_err(|e| error!("Failed to compute completion position: {}", e))
        else {
            return Vec::new();
        };

        let snapshot = Arc::new(TextDocument::from_rope(
            Some(uri.clone()),
            Rope::from_str(&document.text()),
        ));
        let peers = self.peers.peers_for(&uri);
        let pending = self.aggregator.dispatch::<Completion, _, _>(
            &peers,
            Capability::Completion.predicate(),
            |_| completion_params(&uri, position),
        );

        let expected = pending.len();
        let tokens: Vec<CancellationToken> = pending
            .iter()
            .map(|request| request.cancellation_token())
            .collect();
        let mut responses: FuturesUnordered<_> = pending
            .into_iter()
            .enumerate()
            .map(|(order, request)| async move {
                let server = request.server().clone();
                (order, server, request.outcome().await)
            })
            .collect();

        let deadline = tokio::time::sleep(Duration::from_millis(self.config.timeout_ms));
        tokio::pin!(deadline);

        let mut answered = Vec::with_capacity(expected);
        loop {
            tokio::select! {
                next = responses.next() => match next {
                    Some(response) => answered.push(response),
                    None => break,
                },
                _ = &mut deadline => {
                    warn!(
                        "Completion timed out after {}ms, {} of {} servers answered",
                        self.config.timeout_ms,
                        answered.len(),
                        expected
                    );
                    tokens.iter().for_each(CancellationToken::cancel);
                    break;
                }
            }
        }

        answered.sort_by_key(|(order, _, _)| *order);
        let mut gathered = Gathered::default();
        for (order, server, outcome) in answered {
            gathered.record(order, server, outcome);
        }

        let ranked = rank(
            gathered.candidates,
            &*snapshot,
            offset,
            self.config.case_sensitive,
        );
        let mut proposals: Vec<Proposal> = ranked
            .into_iter()
            .map(|ranked| {
                Proposal::Completion(CompletionProposal::new(
                    ranked,
                    Arc::clone(&snapshot),
                    offset,
                ))
            })
            .collect();

        if self.config.errors_as_proposals {
            proposals.extend(
                gathered
                    .errors
                    .into_iter()
                    .map(|(server, message)| Proposal::ServerError { server, message }),
            );
        }
        if gathered.incomplete && self.config.incomplete_as_proposal {
            proposals.push(Proposal::ContinueTyping);
        }

        info!(
            "Computed {} completion proposals from {} servers",
            proposals.len(),
            expected
        );
        proposals
    }

    /// Resolves additional details of `proposal` with the server that
    /// produced it. Returns `None` when the server cannot resolve items or
    /// the request fails.
    pub async fn resolve(
        &self,
        document: &dyn Document,
        proposal: &CompletionProposal,
    ) -> Option<CompletionProposal> {
        let uri = document.uri()?;
        let peers: Vec<_> = self
            .peers
            .peers_for(&uri)
            .into_iter()
            .filter(|peer| &peer.id() == proposal.server())
            .collect();

        let item = proposal.item().clone();
        let pending = self.aggregator.dispatch::<ResolveCompletionItem, _, _>(
            &peers,
            Capability::CompletionResolve.predicate(),
            |_| item.clone(),
        );
        let request = pending.into_iter().next()?;

        match request.outcome().await {
            RequestOutcome::Resolved(item) => Some(proposal.with_item(item)),
            RequestOutcome::Cancelled => None,
            RequestOutcome::Failed(e) => {
                warn!(
                    "Failed to resolve completion item {:?} with {}: {}",
                    proposal.label(),
                    proposal.server(),
                    e
                );
                None
            }
        }
    }
}

fn completion_params(uri: &Url, position: Position) -> CompletionParams {
    CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: Some(CompletionContext {
            trigger_kind: CompletionTriggerKind::INVOKED,
            trigger_character: None,
        }),
    }
}
