//! Conversation aggregate root and its routing state machine.
//!
//! A [`Conversation`] is keyed by the customer's [`Address`] and records who
//! is responsible for answering the customer (the bot, a connected agent, or
//! a queue) alongside the agents passively watching it. All single-key state
//! transitions are implemented here; cross-conversation rules (an agent may
//! own at most one customer) are enforced by the store.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use mockable::Clock;
use serde::{Deserialize, Serialize};

use super::{Address, HandoffError};

/// Routing state of a customer conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// The bot answers the customer.
    Bot,
    /// The customer is queued for an agent; the bot is held back.
    Wait,
    /// A connected agent owns the conversation.
    Agent,
    /// At least one agent is watching; the bot still answers.
    Watch,
    /// Queued for an agent while at least one agent is watching.
    WatchAndWait,
}

impl ConversationState {
    /// Returns the state name as serialised.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Wait => "wait",
            Self::Agent => "agent",
            Self::Watch => "watch",
            Self::WatchAndWait => "watch_and_wait",
        }
    }

    /// Returns `true` when the customer has an outstanding queue request.
    #[must_use]
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Wait | Self::WatchAndWait)
    }

    /// Returns `true` for the watch-only states.
    #[must_use]
    pub const fn is_watched(self) -> bool {
        matches!(self, Self::Watch | Self::WatchAndWait)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a repeated watch by an agent already in the watcher set is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchPolicy {
    /// A repeated watch succeeds without changing the watcher set.
    #[default]
    Idempotent,
    /// A repeated watch fails with [`HandoffError::ConversationStateUnchanged`].
    RejectRepeated,
}

/// Whether a disconnect must come from the agent that owns the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Any disconnect request releases the connected agent.
    #[default]
    AnyAgent,
    /// A disconnect naming a different agent than the owner is rejected.
    OwnerOnly,
}

/// Who a transcript line came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "address", rename_all = "snake_case")]
pub enum TranscriptSource {
    /// The customer, at the given address.
    Customer(Address),
    /// An agent, at the given address.
    Agent(Address),
    /// The bot dialog engine.
    Bot,
}

impl TranscriptSource {
    /// Returns `true` if the line was produced by the bot.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        matches!(self, Self::Bot)
    }

    /// Returns the participant address, if the source is not the bot.
    #[must_use]
    pub const fn address(&self) -> Option<&Address> {
        match self {
            Self::Customer(address) | Self::Agent(address) => Some(address),
            Self::Bot => None,
        }
    }
}

/// A single append-only entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    timestamp: DateTime<Utc>,
    from: TranscriptSource,
    text: String,
}

impl TranscriptLine {
    /// Creates a line stamped with the current clock time.
    #[must_use]
    pub fn new(from: TranscriptSource, text: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            timestamp: clock.utc(),
            from,
            text: text.into(),
        }
    }

    /// Returns when the line was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns who produced the line.
    #[must_use]
    pub const fn from(&self) -> &TranscriptSource {
        &self.from
    }

    /// Returns the line text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Customer conversation aggregate root.
///
/// # Examples
///
/// ```
/// use switchboard::handoff::domain::{Address, Conversation, ConversationState};
///
/// let customer = Address::new("webchat", "c-1", "alice");
/// let agent = Address::new("webchat", "a-1", "Agent Smith");
///
/// let mut conversation = Conversation::new(customer);
/// conversation.connect(&agent).expect("fresh conversation accepts an agent");
/// assert_eq!(conversation.state(), ConversationState::Agent);
/// assert_eq!(conversation.connected_agent(), Some(&agent));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    customer_address: Address,
    state: ConversationState,
    connected_agent: Option<Address>,
    watching_agents: IndexSet<Address>,
    transcript: Vec<TranscriptLine>,
}

impl Conversation {
    /// Creates a bot-owned conversation with no watchers and no transcript.
    #[must_use]
    pub fn new(customer_address: Address) -> Self {
        Self {
            customer_address,
            state: ConversationState::Bot,
            connected_agent: None,
            watching_agents: IndexSet::new(),
            transcript: Vec::new(),
        }
    }

    /// Returns the customer this conversation belongs to.
    #[must_use]
    pub const fn customer_address(&self) -> &Address {
        &self.customer_address
    }

    /// Returns the current routing state.
    #[must_use]
    pub const fn state(&self) -> ConversationState {
        self.state
    }

    /// Returns the agent owning the conversation, if any.
    #[must_use]
    pub const fn connected_agent(&self) -> Option<&Address> {
        self.connected_agent.as_ref()
    }

    /// Returns the watching agents in the order they started watching.
    #[must_use]
    pub const fn watching_agents(&self) -> &IndexSet<Address> {
        &self.watching_agents
    }

    /// Returns `true` if the agent is in the watcher set.
    #[must_use]
    pub fn is_watched_by(&self, agent: &Address) -> bool {
        self.watching_agents.contains(agent)
    }

    /// Returns the transcript in recording order.
    #[must_use]
    pub fn transcript(&self) -> &[TranscriptLine] {
        &self.transcript
    }

    /// Appends a transcript line.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::BotSpokeWhileAgentConnected`] when a bot line
    /// is recorded while an agent owns the conversation.
    pub fn record(&mut self, line: TranscriptLine) -> Result<(), HandoffError> {
        if line.from().is_bot() && self.state == ConversationState::Agent {
            return Err(HandoffError::BotSpokeWhileAgentConnected(
                self.customer_address.clone(),
            ));
        }
        self.transcript.push(line);
        Ok(())
    }

    /// Appends a transcript line without consulting the routing state.
    pub fn record_ignoring_state(&mut self, line: TranscriptLine) {
        self.transcript.push(line);
    }

    /// Hands the conversation to `agent`.
    ///
    /// Any outstanding queue request is consumed and the agent joins the
    /// watcher set. Connecting the agent that already owns the conversation
    /// leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::CustomerAlreadyConnectedToAnotherAgent`] when
    /// a different agent owns the conversation.
    pub fn connect(&mut self, agent: &Address) -> Result<(), HandoffError> {
        if let Some(connected) = self.connected_agent.as_ref()
            && connected != agent
        {
            return Err(HandoffError::CustomerAlreadyConnectedToAnotherAgent {
                customer: self.customer_address.clone(),
                connected: connected.clone(),
            });
        }

        self.state = ConversationState::Agent;
        self.connected_agent = Some(agent.clone());
        self.watching_agents.insert(agent.clone());
        Ok(())
    }

    /// Releases the connected agent and returns the conversation to the bot.
    ///
    /// The released agent leaves the watcher set; other watchers stay.
    /// Returns the released agent.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::CustomerNotConnectedToAgent`] when no agent
    /// owns the conversation, or
    /// [`HandoffError::CustomerAlreadyConnectedToAnotherAgent`] when the
    /// policy is [`DisconnectPolicy::OwnerOnly`] and `requested_by` is not
    /// the owner.
    pub fn disconnect(
        &mut self,
        requested_by: Option<&Address>,
        policy: DisconnectPolicy,
    ) -> Result<Address, HandoffError> {
        let connected = match (self.state, self.connected_agent.as_ref()) {
            (ConversationState::Agent, Some(connected)) => connected.clone(),
            _ => {
                return Err(HandoffError::CustomerNotConnectedToAgent(
                    self.customer_address.clone(),
                ));
            }
        };

        if policy == DisconnectPolicy::OwnerOnly
            && let Some(requester) = requested_by
            && *requester != connected
        {
            return Err(HandoffError::CustomerAlreadyConnectedToAnotherAgent {
                customer: self.customer_address.clone(),
                connected,
            });
        }

        self.watching_agents.shift_remove(&connected);
        self.connected_agent = None;
        self.state = ConversationState::Bot;
        Ok(connected)
    }

    /// Records a customer request to talk to an agent.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::CustomerCannotQueue`] while an agent owns the
    /// conversation, or [`HandoffError::CustomerAlreadyQueued`] when a
    /// request is already outstanding.
    pub fn queue(&mut self) -> Result<(), HandoffError> {
        self.state = match self.state {
            ConversationState::Agent => {
                return Err(HandoffError::CustomerCannotQueue(
                    self.customer_address.clone(),
                ));
            }
            ConversationState::Wait | ConversationState::WatchAndWait => {
                return Err(HandoffError::CustomerAlreadyQueued(
                    self.customer_address.clone(),
                ));
            }
            ConversationState::Watch => ConversationState::WatchAndWait,
            ConversationState::Bot => ConversationState::Wait,
        };
        Ok(())
    }

    /// Withdraws an outstanding queue request.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::CustomerNotQueued`] when no request is
    /// outstanding.
    pub fn dequeue(&mut self) -> Result<(), HandoffError> {
        self.state = match self.state {
            ConversationState::WatchAndWait => ConversationState::Watch,
            ConversationState::Wait => ConversationState::Bot,
            ConversationState::Bot | ConversationState::Agent | ConversationState::Watch => {
                return Err(HandoffError::CustomerNotQueued(
                    self.customer_address.clone(),
                ));
            }
        };
        Ok(())
    }

    /// Adds `agent` to the watcher set.
    ///
    /// `Bot` becomes `Watch` and `Wait` becomes `WatchAndWait`; other states
    /// only gain the watcher.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::ConversationStateUnchanged`] when the policy
    /// is [`WatchPolicy::RejectRepeated`] and the agent is already watching.
    pub fn watch(&mut self, agent: &Address, policy: WatchPolicy) -> Result<(), HandoffError> {
        if policy == WatchPolicy::RejectRepeated && self.is_watched_by(agent) {
            return Err(HandoffError::ConversationStateUnchanged {
                customer: self.customer_address.clone(),
                state: format!("{} and watched by {agent}", self.state),
            });
        }

        self.watching_agents.insert(agent.clone());
        self.state = match self.state {
            ConversationState::Bot => ConversationState::Watch,
            ConversationState::Wait => ConversationState::WatchAndWait,
            other => other,
        };
        Ok(())
    }

    /// Removes `agent` from the watcher set.
    ///
    /// Once the last watcher leaves, `WatchAndWait` drops to `Wait` and
    /// `Watch` drops to `Bot`.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::AgentNotWatching`] when the agent is not
    /// watching, or [`HandoffError::ConnectedAgentCannotUnwatch`] when the
    /// agent owns the conversation.
    pub fn unwatch(&mut self, agent: &Address) -> Result<(), HandoffError> {
        if !self.is_watched_by(agent) {
            return Err(HandoffError::AgentNotWatching {
                agent: agent.clone(),
                customer: self.customer_address.clone(),
            });
        }
        if self.connected_agent.as_ref() == Some(agent) {
            return Err(HandoffError::ConnectedAgentCannotUnwatch {
                agent: agent.clone(),
                customer: self.customer_address.clone(),
            });
        }

        self.watching_agents.shift_remove(agent);
        if self.watching_agents.is_empty() {
            self.state = match self.state {
                ConversationState::WatchAndWait => ConversationState::Wait,
                ConversationState::Watch => ConversationState::Bot,
                other => other,
            };
        }
        Ok(())
    }
}
