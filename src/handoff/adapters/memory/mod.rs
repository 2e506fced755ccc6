//! In-memory adapter implementations.
//!
//! These adapters provide simple, thread-safe implementations suitable for
//! the reference router and for tests without external infrastructure.

mod channel;
mod classifier;
mod store;

pub use channel::{ChannelBotPipeline, ChannelDelivery, drain_pending};
pub use classifier::NamePrefixClassifier;
pub use store::InMemoryConversationStore;
