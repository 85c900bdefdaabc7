//! Capability predicates used to select peers for a request

use tower_lsp::lsp_types::{FoldingRangeProviderCapability, ServerCapabilities};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    FoldingRange,
    Completion,
    CompletionResolve,
}

impl Capability {
    pub fn is_supported_by(self, capabilities: &ServerCapabilities) -> bool {
        match self {
            Capability::FoldingRange => match &capabilities.folding_range_provider {
                Some(FoldingRangeProviderCapability::Simple(enabled)) => *enabled,
                Some(_) => true,
                None => false,
            },
            Capability::Completion => capabilities.completion_provider.is_some(),
            Capability::CompletionResolve => capabilities
                .completion_provider
                .as_ref()
                .and_then(|options| options.resolve_provider)
                .unwrap_or(false),
        }
    }

    /// Predicate form accepted by [`crate::server::RequestAggregator::dispatch`]
    pub fn predicate(self) -> impl Fn(&ServerCapabilities) -> bool + Send + Sync + 'static {
        move |capabilities| self.is_supported_by(capabilities)
    }
}
