//! Adapters for the handoff ports.
//!
//! # Available Adapters
//!
//! - [`memory::InMemoryConversationStore`]: per-customer-locked store for
//!   the reference router
//! - [`memory::ChannelDelivery`] and [`memory::ChannelBotPipeline`]:
//!   channel-backed transport and bot hand-off points
//! - [`memory::NamePrefixClassifier`]: agent detection by user-name prefix
//!
//! Durable stores implement
//! [`ConversationStore`](crate::handoff::ports::ConversationStore) and must
//! keep the same per-customer atomicity contract.

pub mod memory;
