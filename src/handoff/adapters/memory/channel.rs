//! Channel-backed delivery adapters.
//!
//! Router output is pushed onto unbounded `tokio` channels; the host drains
//! the receivers and performs the actual transport sends. Pushing never
//! waits on the transport.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::handoff::{
    domain::{InboundMessage, OutboundMessage},
    ports::{BotPipeline, DeliveryError, DeliveryResult, MessageDelivery},
};

/// [`MessageDelivery`] adapter that queues outbound messages on a channel.
#[derive(Debug, Clone)]
pub struct ChannelDelivery {
    sender: UnboundedSender<OutboundMessage>,
}

impl ChannelDelivery {
    /// Creates the adapter and the receiver the host drains.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MessageDelivery for ChannelDelivery {
    async fn deliver(&self, message: OutboundMessage) -> DeliveryResult<()> {
        self.sender.send(message).map_err(|_| DeliveryError::Closed)
    }
}

/// [`BotPipeline`] adapter that queues customer messages for the bot.
#[derive(Debug, Clone)]
pub struct ChannelBotPipeline {
    sender: UnboundedSender<InboundMessage>,
}

impl ChannelBotPipeline {
    /// Creates the adapter and the receiver the bot engine drains.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<InboundMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl BotPipeline for ChannelBotPipeline {
    async fn forward(&self, message: InboundMessage) -> DeliveryResult<()> {
        self.sender.send(message).map_err(|_| DeliveryError::Closed)
    }
}

/// Collects everything currently queued on a receiver without waiting.
pub fn drain_pending<T>(receiver: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = receiver.try_recv() {
        items.push(item);
    }
    items
}
