//! Outward collaborators: the chat transport and the bot dialog engine.

use crate::handoff::domain::{InboundMessage, OutboundMessage};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Fire-and-forget delivery of router output to a participant.
///
/// A failed delivery never rolls back the state change that produced it.
#[async_trait]
pub trait MessageDelivery: Send + Sync {
    /// Hands the message to the transport for its recipient.
    async fn deliver(&self, message: OutboundMessage) -> DeliveryResult<()>;
}

/// Hand-off point to the bot dialog engine for customer messages the bot
/// should answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BotPipeline: Send + Sync {
    /// Passes the customer message to the bot.
    async fn forward(&self, message: InboundMessage) -> DeliveryResult<()>;
}

/// Errors returned by delivery adapters.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The transport is no longer accepting messages.
    #[error("delivery channel closed")]
    Closed,

    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl DeliveryError {
    /// Wraps a transport error.
    #[must_use]
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
