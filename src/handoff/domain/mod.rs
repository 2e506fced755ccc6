//! Domain types for the handoff subsystem.
//!
//! This module contains pure domain types with no infrastructure
//! dependencies. Single-conversation state transitions live on
//! [`Conversation`]; everything here is serialisable via serde.

mod address;
mod command;
mod conversation;
mod error;
mod ids;

pub use address::Address;
pub use command::{
    CommandKind, ErrorEvent, HandoffCommand, InboundActivity, InboundMessage,
    MESSAGE_ACTIVITY_TYPE, OutboundMessage, RawActivity,
};
pub use conversation::{
    Conversation, ConversationState, DisconnectPolicy, TranscriptLine, TranscriptSource,
    WatchPolicy,
};
pub use error::{HandoffError, HandoffErrorKind, MissingAddress, ParseCommandKindError};
pub use ids::CommandId;
