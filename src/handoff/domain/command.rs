//! Handoff commands and the inbound/outbound units the router exchanges with
//! the transport.

use serde::{Deserialize, Serialize};

use super::{Address, CommandId, HandoffError, HandoffErrorKind, MissingAddress, ParseCommandKindError};

/// Activity type the transport uses for ordinary chat messages.
pub const MESSAGE_ACTIVITY_TYPE: &str = "message";

/// The kind of a handoff command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Hand the customer to an agent.
    Connect,
    /// Return the customer to the bot.
    Disconnect,
    /// Put the customer in line for an agent.
    Queue,
    /// Take the customer out of line.
    Dequeue,
    /// Start observing the customer conversation.
    Watch,
    /// Stop observing the customer conversation.
    Unwatch,
}

impl CommandKind {
    /// Every command kind, in dispatch-table order.
    pub const ALL: [Self; 6] = [
        Self::Connect,
        Self::Disconnect,
        Self::Queue,
        Self::Dequeue,
        Self::Watch,
        Self::Unwatch,
    ];

    /// Returns the activity type the transport uses for this command.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Connect => "__connect__",
            Self::Disconnect => "__disconnect__",
            Self::Queue => "__queue__",
            Self::Dequeue => "__dequeue__",
            Self::Watch => "__watch__",
            Self::Unwatch => "__unwatch__",
        }
    }

    /// Returns `true` when the command must name an agent.
    #[must_use]
    pub const fn requires_agent(self) -> bool {
        matches!(
            self,
            Self::Connect | Self::Disconnect | Self::Watch | Self::Unwatch
        )
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Queue => "queue",
            Self::Dequeue => "dequeue",
            Self::Watch => "watch",
            Self::Unwatch => "unwatch",
        };
        f.write_str(name)
    }
}

impl TryFrom<&str> for CommandKind {
    type Error = ParseCommandKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == value)
            .ok_or_else(|| ParseCommandKindError(value.to_owned()))
    }
}

/// An inbound request to change a conversation's handoff state.
///
/// Commands built from wire activities may lack addresses; handlers reject
/// those with [`HandoffError::MalformedCommand`].
///
/// # Examples
///
/// ```
/// use switchboard::handoff::domain::{Address, CommandKind, HandoffCommand};
///
/// let customer = Address::new("webchat", "c-1", "alice");
/// let agent = Address::new("webchat", "a-1", "Agent Smith");
///
/// let command = HandoffCommand::connect(customer.clone(), agent.clone());
/// assert_eq!(command.kind(), CommandKind::Connect);
/// assert_eq!(command.reply_address(), Some(&agent));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffCommand {
    id: CommandId,
    kind: CommandKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    originator: Option<Address>,
}

impl HandoffCommand {
    /// Creates a command with no addresses attached.
    #[must_use]
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: CommandId::new(),
            kind,
            customer_address: None,
            agent_address: None,
            originator: None,
        }
    }

    /// Creates a connect command sent by the agent.
    #[must_use]
    pub fn connect(customer: Address, agent: Address) -> Self {
        Self::agent_command(CommandKind::Connect, customer, agent)
    }

    /// Creates a disconnect command sent by the agent.
    #[must_use]
    pub fn disconnect(customer: Address, agent: Address) -> Self {
        Self::agent_command(CommandKind::Disconnect, customer, agent)
    }

    /// Creates a queue command sent by the customer.
    #[must_use]
    pub fn queue(customer: Address) -> Self {
        Self::customer_command(CommandKind::Queue, customer)
    }

    /// Creates a dequeue command sent by the customer.
    #[must_use]
    pub fn dequeue(customer: Address) -> Self {
        Self::customer_command(CommandKind::Dequeue, customer)
    }

    /// Creates a watch command sent by the agent.
    #[must_use]
    pub fn watch(customer: Address, agent: Address) -> Self {
        Self::agent_command(CommandKind::Watch, customer, agent)
    }

    /// Creates an unwatch command sent by the agent.
    #[must_use]
    pub fn unwatch(customer: Address, agent: Address) -> Self {
        Self::agent_command(CommandKind::Unwatch, customer, agent)
    }

    fn agent_command(kind: CommandKind, customer: Address, agent: Address) -> Self {
        Self::new(kind)
            .with_customer(customer)
            .with_originator(agent.clone())
            .with_agent(agent)
    }

    fn customer_command(kind: CommandKind, customer: Address) -> Self {
        Self::new(kind)
            .with_originator(customer.clone())
            .with_customer(customer)
    }

    /// Sets the customer address.
    #[must_use]
    pub fn with_customer(mut self, customer: Address) -> Self {
        self.customer_address = Some(customer);
        self
    }

    /// Sets the agent address.
    #[must_use]
    pub fn with_agent(mut self, agent: Address) -> Self {
        self.agent_address = Some(agent);
        self
    }

    /// Sets the address that sent the command.
    #[must_use]
    pub fn with_originator(mut self, originator: Address) -> Self {
        self.originator = Some(originator);
        self
    }

    /// Returns the command identifier.
    #[must_use]
    pub const fn id(&self) -> CommandId {
        self.id
    }

    /// Returns the command kind.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Returns the customer address, if present.
    #[must_use]
    pub const fn customer_address(&self) -> Option<&Address> {
        self.customer_address.as_ref()
    }

    /// Returns the agent address, if present.
    #[must_use]
    pub const fn agent_address(&self) -> Option<&Address> {
        self.agent_address.as_ref()
    }

    /// Returns the customer address required by every command kind.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::MalformedCommand`] when it is missing.
    pub fn require_customer(&self) -> Result<&Address, HandoffError> {
        self.customer_address
            .as_ref()
            .ok_or(HandoffError::MalformedCommand {
                kind: self.kind,
                missing: MissingAddress::Customer,
            })
    }

    /// Returns the agent address.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::MalformedCommand`] when it is missing.
    pub fn require_agent(&self) -> Result<&Address, HandoffError> {
        self.agent_address
            .as_ref()
            .ok_or(HandoffError::MalformedCommand {
                kind: self.kind,
                missing: MissingAddress::Agent,
            })
    }

    /// Returns the address failures should be reported to.
    ///
    /// The explicit originator wins; otherwise agent-side kinds reply to the
    /// agent and customer-side kinds to the customer.
    #[must_use]
    pub fn reply_address(&self) -> Option<&Address> {
        if let Some(originator) = self.originator.as_ref() {
            return Some(originator);
        }
        if self.kind.requires_agent() {
            self.agent_address
                .as_ref()
                .or(self.customer_address.as_ref())
        } else {
            self.customer_address
                .as_ref()
                .or(self.agent_address.as_ref())
        }
    }
}

/// An ordinary chat message received from a customer or agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    sender: Address,
    text: String,
}

impl InboundMessage {
    /// Creates an inbound message.
    #[must_use]
    pub fn new(sender: Address, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }

    /// Returns the sender address.
    #[must_use]
    pub const fn sender(&self) -> &Address {
        &self.sender
    }

    /// Returns the message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A unit received from the transport, classified for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundActivity {
    /// A chat message.
    Message(InboundMessage),
    /// A handoff command.
    Command(HandoffCommand),
    /// Any other activity; the router passes it through untouched.
    Other {
        /// The transport's activity type.
        activity_type: String,
        /// Who sent the activity.
        sender: Address,
    },
}

/// Raw fields of a transport activity before classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawActivity {
    /// The transport's activity type.
    pub activity_type: String,
    /// The message text, for chat messages.
    pub text: Option<String>,
    /// Customer address carried on handoff commands.
    pub customer_address: Option<Address>,
    /// Agent address carried on handoff commands.
    pub agent_address: Option<Address>,
}

impl InboundActivity {
    /// Classifies a raw transport activity sent by `sender`.
    ///
    /// `message` activities become chat messages, recognised command wire
    /// names become commands originated by `sender`, and everything else is
    /// left for pass-through.
    #[must_use]
    pub fn classify(sender: Address, raw: RawActivity) -> Self {
        if raw.activity_type == MESSAGE_ACTIVITY_TYPE {
            return Self::Message(InboundMessage::new(sender, raw.text.unwrap_or_default()));
        }

        match CommandKind::try_from(raw.activity_type.as_str()) {
            Ok(kind) => {
                let mut command = HandoffCommand::new(kind).with_originator(sender);
                if let Some(customer) = raw.customer_address {
                    command = command.with_customer(customer);
                }
                if let Some(agent) = raw.agent_address {
                    command = command.with_agent(agent);
                }
                Self::Command(command)
            }
            Err(_) => Self::Other {
                activity_type: raw.activity_type,
                sender,
            },
        }
    }
}

/// A structured failure report addressed to whoever triggered the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// The command that failed; absent when a chat message failed to route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<HandoffCommand>,
    /// Machine-readable failure kind.
    pub kind: HandoffErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Who the event is delivered to.
    pub recipient: Address,
}

/// A unit the router hands to the transport for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// A text message.
    Text {
        /// Recipient address.
        to: Address,
        /// The participant the text is mirrored from, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<Address>,
        /// Message text.
        text: String,
    },
    /// A handoff error event.
    Error(ErrorEvent),
}

impl OutboundMessage {
    /// Creates a text message originated by the router itself.
    #[must_use]
    pub fn notice(to: Address, text: impl Into<String>) -> Self {
        Self::Text {
            to,
            from: None,
            text: text.into(),
        }
    }

    /// Creates a text message mirrored from another participant.
    #[must_use]
    pub fn mirror(to: Address, from: Address, text: impl Into<String>) -> Self {
        Self::Text {
            to,
            from: Some(from),
            text: text.into(),
        }
    }

    /// Returns the recipient address.
    #[must_use]
    pub const fn recipient(&self) -> &Address {
        match self {
            Self::Text { to, .. } => to,
            Self::Error(event) => &event.recipient,
        }
    }

    /// Returns the text, for text messages.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::Error(_) => None,
        }
    }
}
