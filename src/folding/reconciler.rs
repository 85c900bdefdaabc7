//! Folding reconciler
//!
//! Each reconcile cycle cancels the previous cycle's requests, asks every
//! server with folding support for the document's ranges, and applies the
//! merged ranges after each successful response. Responses of a superseded
//! cycle that still arrive are applied as well.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tower_lsp::lsp_types::request::FoldingRangeRequest;
use tower_lsp::lsp_types::{
    FoldingRange, FoldingRangeParams, PartialResultParams, TextDocumentIdentifier, Url,
    WorkDoneProgressParams,
};
use tracing::{debug, info, warn};

use crate::config::FoldingConfig;
use crate::document::Document;
use crate::folding::annotation::AnnotationModel;
use crate::folding::diff::folding_batch;
use crate::server::{
    Capability, PeerProvider, PendingRequest, RequestAggregator, RequestOutcome, ServerId,
    cancel_all,
};

/// What caused a reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileTrigger {
    /// First reconcile after a document is bound; never skipped
    Initial,
    /// Part of the document changed
    DirtyRegion,
    /// Requested by the host
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    RequestsInFlight,
    Uninstalled,
}

#[derive(Default)]
struct CycleProgress {
    ranges: Vec<FoldingRange>,
    seen: HashSet<(u32, u32)>,
    succeeded: usize,
}

/// Ranges gathered from the servers of one cycle
struct Cycle {
    number: u64,
    expected: usize,
    progress: Mutex<CycleProgress>,
}

impl Cycle {
    /// Records an outcome and returns the ranges to apply, if any
    fn record(
        &self,
        server: &ServerId,
        outcome: RequestOutcome<Option<Vec<FoldingRange>>>,
    ) -> Option<Vec<FoldingRange>> {
        let mut progress = self.progress.lock();
        match outcome {
            RequestOutcome::Resolved(ranges) => {
                progress.succeeded += 1;
                for range in ranges.unwrap_or_default() {
                    if progress.seen.insert((range.start_line, range.end_line)) {
                        progress.ranges.push(range);
                    }
                }
            }
            RequestOutcome::Cancelled => {
                debug!("Folding request to {} cancelled", server);
                return None;
            }
            RequestOutcome::Failed(e) => {
                warn!("Folding request to {} failed: {}", server, e);
                return None;
            }
        }

        // an empty result only clears once every server has answered
        if progress.ranges.is_empty() && progress.succeeded < self.expected {
            debug!(
                "Cycle {}: no ranges yet, {} of {} servers answered",
                self.number, progress.succeeded, self.expected
            );
            return None;
        }
        Some(progress.ranges.clone())
    }
}

#[derive(Default)]
struct Shared {
    document: Option<Arc<dyn Document>>,
    model: Option<Arc<dyn AnnotationModel>>,
    installed: Option<Arc<dyn AnnotationModel>>,
    requests: Vec<PendingRequest<()>>,
    superseded: Vec<PendingRequest<()>>,
    last_stamp: Option<u64>,
    uninstalled: bool,
    cycles: u64,
}

pub struct FoldingReconciler {
    provider: Arc<dyn PeerProvider>,
    aggregator: RequestAggregator,
    collapse_imports: bool,
    shared: Arc<Mutex<Shared>>,
}

impl FoldingReconciler {
    pub fn new(provider: Arc<dyn PeerProvider>, config: &FoldingConfig) -> Self {
        Self {
            provider,
            aggregator: RequestAggregator::with_cancel_grace(Duration::from_millis(
                config.cancel_grace_ms,
            )),
            collapse_imports: config.collapse_imports,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    pub fn set_document(&self, document: Option<Arc<dyn Document>>) {
        self.shared.lock().document = document;
    }

    /// Attaches the annotation model of a viewer
    pub fn install(&self, model: Arc<dyn AnnotationModel>) {
        let mut shared = self.shared.lock();
        shared.installed = Some(Arc::clone(&model));
        shared.model = Some(model);
        shared.uninstalled = false;
    }

    pub fn projection_enabled(&self) {
        let mut shared = self.shared.lock();
        shared.model = shared.installed.clone();
    }

    pub fn projection_disabled(&self) {
        self.shared.lock().model = None;
    }

    /// Detaches from the document and model; later reconciles do nothing
    pub fn uninstall(&self) {
        let mut shared = self.shared.lock();
        shared.document = None;
        shared.installed = None;
        shared.model = None;
        shared.uninstalled = true;
        cancel_all(&shared.requests);
        info!("Folding reconciler uninstalled");
    }

    pub fn state(&self) -> ReconcilerState {
        let shared = self.shared.lock();
        if shared.uninstalled {
            ReconcilerState::Uninstalled
        } else if shared.requests.iter().any(|request| !request.is_finished()) {
            ReconcilerState::RequestsInFlight
        } else {
            ReconcilerState::Idle
        }
    }

    /// Starts a reconcile cycle. Must be called within a tokio runtime.
    ///
    /// Triggers other than [`ReconcileTrigger::Initial`] are skipped while
    /// the document's modification stamp is unchanged since the last cycle.
    pub fn reconcile(&self, trigger: ReconcileTrigger) {
        let mut shared = self.shared.lock();
        if shared.uninstalled {
            debug!("Ignoring {:?} reconcile: uninstalled", trigger);
            return;
        }
        let (Some(document), true) = (shared.document.clone(), shared.model.is_some()) else {
            return;
        };
        let Some(uri) = document.uri() else {
            debug!("Ignoring {:?} reconcile: document has no URI", trigger);
            return;
        };

        let stamp = document.modification_stamp();
        if trigger != ReconcileTrigger::Initial && shared.last_stamp == Some(stamp) {
            debug!("Document unchanged since stamp {}, skipping reconcile", stamp);
            return;
        }

        cancel_all(&shared.requests);
        let previous = std::mem::take(&mut shared.requests);
        shared.superseded.retain(|request| !request.is_finished());
        shared.superseded.extend(previous);

        let peers = self.provider.peers_for(&uri);
        let pending = self.aggregator.dispatch::<FoldingRangeRequest, _, _>(
            &peers,
            Capability::FoldingRange.predicate(),
            |_| folding_params(&uri),
        );

        shared.cycles += 1;
        let cycle = Arc::new(Cycle {
            number: shared.cycles,
            expected: pending.len(),
            progress: Mutex::new(CycleProgress::default()),
        });
        info!(
            "Reconcile cycle {} ({:?}) sent to {} servers",
            cycle.number,
            trigger,
            pending.len()
        );

        shared.requests = pending
            .into_iter()
            .map(|request| {
                let shared = Arc::clone(&self.shared);
                let cycle = Arc::clone(&cycle);
                let document = Arc::clone(&document);
                let server = request.server().clone();
                let collapse_imports = self.collapse_imports;
                request.then(move |outcome| {
                    if let Some(ranges) = cycle.record(&server, outcome) {
                        apply_ranges(&shared, &document, &ranges, collapse_imports);
                    }
                })
            })
            .collect();
        shared.last_stamp = Some(stamp);
    }

    /// Waits until every continuation of the current and superseded cycles ran
    pub async fn settle(&self) {
        loop {
            let requests: Vec<_> = {
                let mut shared = self.shared.lock();
                let mut requests = std::mem::take(&mut shared.requests);
                requests.append(&mut shared.superseded);
                requests
            };
            if requests.is_empty() {
                return;
            }
            for request in requests {
                request.outcome().await;
            }
        }
    }
}

fn folding_params(uri: &Url) -> FoldingRangeParams {
    FoldingRangeParams {
        text_document: TextDocumentIdentifier::new(uri.clone()),
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    }
}

fn apply_ranges(
    shared: &Mutex<Shared>,
    document: &Arc<dyn Document>,
    ranges: &[FoldingRange],
    collapse_imports: bool,
) {
    let shared = shared.lock();
    let still_bound = shared
        .document
        .as_ref()
        .is_some_and(|current| Arc::ptr_eq(current, document));
    if !still_bound {
        debug!("Document closed while folding requests were in flight");
        return;
    }
    let Some(model) = shared.model.as_ref() else {
        debug!("Projection disabled, dropping folding ranges");
        return;
    };

    let batch = folding_batch(model.as_ref(), document.as_ref(), ranges, collapse_imports);
    if batch.is_empty() {
        debug!("Folding annotations already up to date");
        return;
    }
    debug!(
        "Applying {} folding ranges: {} deleted, {} added, {} updated",
        ranges.len(),
        batch.deletions.len(),
        batch.additions.len(),
        batch.updates.len()
    );
    model.modify_annotations(batch);
}
