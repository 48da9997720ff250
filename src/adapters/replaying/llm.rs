//! Replaying adapter for the `LlmClient` port.

use super::{next_result, SharedReplayer};
use crate::ports::{CompletionFuture, CompletionRequest, LlmClient};

/// Serves recorded completions in order.
pub struct ReplayingLlmClient {
    replayer: SharedReplayer,
}

impl ReplayingLlmClient {
    /// Creates a client backed by `replayer`.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl LlmClient for ReplayingLlmClient {
    fn complete(&self, _request: &CompletionRequest) -> CompletionFuture<'_> {
        let result = next_result(&self.replayer, "llm", "complete");
        Box::pin(async move { result })
    }
}
