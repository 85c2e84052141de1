//! Shared context interface for the channel adapter.
//!
//! `MessageContext` is what the pipeline needs from its host (the gateway's
//! `AppState`); `Outbound` is how it talks back to the requester. Both are
//! defined here so the pipeline stays channel-agnostic.

use async_trait::async_trait;

use relay_core::config::RelayConfig;
use relay_memory::HistoryStore;
use relay_users::IdentityResolver;

use crate::provider::LlmProvider;

/// Minimal context interface required by the message pipeline.
pub trait MessageContext: Send + Sync {
    fn config(&self) -> &RelayConfig;
    fn provider(&self) -> &dyn LlmProvider;
    fn store(&self) -> &HistoryStore;
    fn identities(&self) -> &IdentityResolver;
}

/// Sends plain text back to wherever the inbound message came from.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Deliver one message. Returns `Err` with a human-readable explanation on failure.
    async fn say(&self, text: &str) -> Result<(), String>;
}
