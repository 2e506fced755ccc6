//! Business rule violations raised by handoff operations.
//!
//! Every variant is recoverable: the router reports it back to the
//! participant that triggered the operation and carries on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Address, CommandKind};

/// A handoff operation was rejected because it would break a conversation
/// invariant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandoffError {
    /// The agent already owns a different customer conversation.
    #[error("agent {agent} is already connected to customer {customer}")]
    AgentAlreadyConnectedElsewhere {
        /// The agent attempting to connect.
        agent: Address,
        /// The customer the agent currently owns.
        customer: Address,
    },

    /// The customer is owned by a different agent.
    #[error("customer {customer} is connected to a different agent {connected}")]
    CustomerAlreadyConnectedToAnotherAgent {
        /// The customer whose conversation was targeted.
        customer: Address,
        /// The agent currently owning the conversation.
        connected: Address,
    },

    /// A disconnect was requested but no agent owns the conversation.
    #[error("customer {0} is not connected to an agent")]
    CustomerNotConnectedToAgent(Address),

    /// A queue request is already outstanding.
    #[error("customer {0} is already queued")]
    CustomerAlreadyQueued(Address),

    /// The customer is talking to an agent and cannot be queued.
    #[error("customer {0} cannot be queued while connected to an agent")]
    CustomerCannotQueue(Address),

    /// A dequeue was requested without an outstanding queue request.
    #[error("customer {0} is not queued")]
    CustomerNotQueued(Address),

    /// The agent is not in the conversation's watcher set.
    #[error("agent {agent} is not watching customer {customer}")]
    AgentNotWatching {
        /// The agent attempting to unwatch.
        agent: Address,
        /// The customer whose conversation was targeted.
        customer: Address,
    },

    /// The connected agent tried to stop watching the conversation it owns.
    #[error("agent {agent} owns customer {customer} and must disconnect instead of unwatching")]
    ConnectedAgentCannotUnwatch {
        /// The owning agent.
        agent: Address,
        /// The customer whose conversation was targeted.
        customer: Address,
    },

    /// The bot tried to speak while an agent owns the conversation.
    #[error("bot attempted to record a message for customer {0}, which is connected to an agent")]
    BotSpokeWhileAgentConnected(Address),

    /// An agent-originated message could not be mapped to a customer.
    #[error("no customer conversation found for agent {0}")]
    AgentNotFoundForCustomer(Address),

    /// The operation would not change the conversation.
    #[error("conversation for customer {customer} is already {state}")]
    ConversationStateUnchanged {
        /// The customer whose conversation was targeted.
        customer: Address,
        /// Description of the state that would have been re-entered.
        state: String,
    },

    /// A command is missing an address its kind requires.
    #[error("{kind} command is missing the {missing} address")]
    MalformedCommand {
        /// The kind of the malformed command.
        kind: CommandKind,
        /// Which address is missing.
        missing: MissingAddress,
    },
}

impl HandoffError {
    /// Returns the machine-readable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> HandoffErrorKind {
        match self {
            Self::AgentAlreadyConnectedElsewhere { .. } => {
                HandoffErrorKind::AgentAlreadyConnectedElsewhere
            }
            Self::CustomerAlreadyConnectedToAnotherAgent { .. } => {
                HandoffErrorKind::CustomerAlreadyConnectedToAnotherAgent
            }
            Self::CustomerNotConnectedToAgent(_) => HandoffErrorKind::CustomerNotConnectedToAgent,
            Self::CustomerAlreadyQueued(_) => HandoffErrorKind::CustomerAlreadyQueued,
            Self::CustomerCannotQueue(_) => HandoffErrorKind::CustomerCannotQueue,
            Self::CustomerNotQueued(_) => HandoffErrorKind::CustomerNotQueued,
            Self::AgentNotWatching { .. } => HandoffErrorKind::AgentNotWatching,
            Self::ConnectedAgentCannotUnwatch { .. } => {
                HandoffErrorKind::ConnectedAgentCannotUnwatch
            }
            Self::BotSpokeWhileAgentConnected(_) => HandoffErrorKind::BotSpokeWhileAgentConnected,
            Self::AgentNotFoundForCustomer(_) => HandoffErrorKind::AgentNotFoundForCustomer,
            Self::ConversationStateUnchanged { .. } => HandoffErrorKind::ConversationStateUnchanged,
            Self::MalformedCommand { .. } => HandoffErrorKind::MalformedCommand,
        }
    }
}

/// The address a malformed command failed to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAddress {
    /// The customer address.
    Customer,
    /// The agent address.
    Agent,
}

impl std::fmt::Display for MissingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => f.write_str("customer"),
            Self::Agent => f.write_str("agent"),
        }
    }
}

/// Machine-readable error kind carried on outward error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffErrorKind {
    /// See [`HandoffError::AgentAlreadyConnectedElsewhere`].
    AgentAlreadyConnectedElsewhere,
    /// See [`HandoffError::CustomerAlreadyConnectedToAnotherAgent`].
    CustomerAlreadyConnectedToAnotherAgent,
    /// See [`HandoffError::CustomerNotConnectedToAgent`].
    CustomerNotConnectedToAgent,
    /// See [`HandoffError::CustomerAlreadyQueued`].
    CustomerAlreadyQueued,
    /// See [`HandoffError::CustomerCannotQueue`].
    CustomerCannotQueue,
    /// See [`HandoffError::CustomerNotQueued`].
    CustomerNotQueued,
    /// See [`HandoffError::AgentNotWatching`].
    AgentNotWatching,
    /// See [`HandoffError::ConnectedAgentCannotUnwatch`].
    ConnectedAgentCannotUnwatch,
    /// See [`HandoffError::BotSpokeWhileAgentConnected`].
    BotSpokeWhileAgentConnected,
    /// See [`HandoffError::AgentNotFoundForCustomer`].
    AgentNotFoundForCustomer,
    /// See [`HandoffError::ConversationStateUnchanged`].
    ConversationStateUnchanged,
    /// See [`HandoffError::MalformedCommand`].
    MalformedCommand,
    /// The conversation store failed for a reason unrelated to business rules.
    StoreUnavailable,
}

impl HandoffErrorKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgentAlreadyConnectedElsewhere => "agent_already_connected_elsewhere",
            Self::CustomerAlreadyConnectedToAnotherAgent => {
                "customer_already_connected_to_another_agent"
            }
            Self::CustomerNotConnectedToAgent => "customer_not_connected_to_agent",
            Self::CustomerAlreadyQueued => "customer_already_queued",
            Self::CustomerCannotQueue => "customer_cannot_queue",
            Self::CustomerNotQueued => "customer_not_queued",
            Self::AgentNotWatching => "agent_not_watching",
            Self::ConnectedAgentCannotUnwatch => "connected_agent_cannot_unwatch",
            Self::BotSpokeWhileAgentConnected => "bot_spoke_while_agent_connected",
            Self::AgentNotFoundForCustomer => "agent_not_found_for_customer",
            Self::ConversationStateUnchanged => "conversation_state_unchanged",
            Self::MalformedCommand => "malformed_command",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl std::fmt::Display for HandoffErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while parsing command kinds from wire activity types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown handoff command type: {0}")]
pub struct ParseCommandKindError(pub String);
