//! Participant addresses as handed to the router by the chat transport.
//!
//! An [`Address`] identifies one participant (customer, agent, or bot) on one
//! channel conversation. The router never mutates addresses; it only compares
//! them, hashes them, and hands them back to the transport for delivery.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque transport identity for a participant in a channel conversation.
///
/// # Examples
///
/// ```
/// use switchboard::handoff::domain::Address;
///
/// let customer = Address::new("webchat", "conv-1", "alice");
/// assert_eq!(customer.user(), "alice");
/// assert_eq!(customer.to_string(), "webchat/conv-1/alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    channel_id: String,
    conversation_id: String,
    user: String,
}

impl Address {
    /// Creates an address from its transport components.
    #[must_use]
    pub fn new(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            user: user.into(),
        }
    }

    /// Returns the channel the participant is reachable on.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Returns the channel conversation identifier.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Returns the participant's user name on the channel.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.channel_id, self.conversation_id, self.user)
    }
}
