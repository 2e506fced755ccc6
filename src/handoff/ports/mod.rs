//! Port trait definitions for the handoff subsystem.
//!
//! Ports define the abstract interfaces the router requires from
//! infrastructure. Adapters implement these ports to connect the router to
//! storage backends, chat transports, and the bot dialog engine.

pub mod classifier;
pub mod delivery;
pub mod store;

pub use classifier::SenderClassifier;
pub use delivery::{BotPipeline, DeliveryError, DeliveryResult, MessageDelivery};
pub use store::{ConversationStore, ConversationStoreError, ConversationStoreResult};
