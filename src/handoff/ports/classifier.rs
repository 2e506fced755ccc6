//! Sender classification supplied by the host application.

use crate::handoff::domain::{Address, InboundMessage};
use async_trait::async_trait;

/// Decides whether the sender of a chat message is an agent.
///
/// Anyone who is not an agent is treated as a customer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SenderClassifier: Send + Sync {
    /// Returns `true` if `sender` is an agent.
    async fn is_agent(&self, sender: &Address, message: &InboundMessage) -> bool;
}
