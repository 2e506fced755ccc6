//! Command handlers and transcript recording.
//!
//! Each handler validates the addresses its command kind needs, performs
//! exactly one store operation, and optionally renders a courtesy notice
//! for the customer.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use crate::handoff::{
    config::{CourtesyMessages, Notice},
    domain::{
        Address, CommandKind, Conversation, HandoffCommand, HandoffError, InboundMessage,
        OutboundMessage, TranscriptLine, TranscriptSource,
    },
    ports::ConversationStore,
};

use super::error::HandoffServiceResult;

/// Result of a successfully handled command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// Snapshot of the conversation after the transition.
    pub conversation: Conversation,
    /// Notice for the customer, when the command kind has one.
    pub courtesy: Option<OutboundMessage>,
}

impl HandlerOutcome {
    const fn silent(conversation: Conversation) -> Self {
        Self {
            conversation,
            courtesy: None,
        }
    }
}

/// Applies handoff commands and transcript lines to a [`ConversationStore`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use mockable::DefaultClock;
/// use switchboard::handoff::{
///     adapters::memory::InMemoryConversationStore,
///     config::CourtesyMessages,
///     domain::{Address, ConversationState, HandoffCommand},
///     services::HandoffCommandHandler,
/// };
///
/// # tokio_test_block_on(async {
/// let handler = HandoffCommandHandler::new(
///     Arc::new(InMemoryConversationStore::new()),
///     Arc::new(DefaultClock),
///     CourtesyMessages::default(),
/// );
/// let customer = Address::new("webchat", "c-1", "alice");
///
/// let outcome = handler
///     .handle(&HandoffCommand::queue(customer))
///     .await
///     .expect("a fresh customer can queue");
/// assert_eq!(outcome.conversation.state(), ConversationState::Wait);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(future: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread()
/// #         .build()
/// #         .expect("runtime")
/// #         .block_on(future)
/// # }
/// ```
#[derive(Clone)]
pub struct HandoffCommandHandler<S, K>
where
    S: ConversationStore,
    K: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<K>,
    courtesy: CourtesyMessages,
}

impl<S, K> HandoffCommandHandler<S, K>
where
    S: ConversationStore,
    K: Clock + Send + Sync,
{
    /// Creates a handler over the given store.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<K>, courtesy: CourtesyMessages) -> Self {
        Self {
            store,
            clock,
            courtesy,
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Dispatches the command to the handler for its kind.
    ///
    /// # Errors
    ///
    /// Returns the rejection raised by the store, a malformed-command error
    /// when a required address is missing, or a store failure.
    pub async fn handle(&self, command: &HandoffCommand) -> HandoffServiceResult<HandlerOutcome> {
        match command.kind() {
            CommandKind::Connect => self.connect(command).await,
            CommandKind::Disconnect => self.disconnect(command).await,
            CommandKind::Queue => self.queue(command).await,
            CommandKind::Dequeue => self.dequeue(command).await,
            CommandKind::Watch => self.watch(command).await,
            CommandKind::Unwatch => self.unwatch(command).await,
        }
    }

    /// Connects the command's agent to its customer.
    ///
    /// # Errors
    ///
    /// See [`ConversationStore::connect`].
    pub async fn connect(&self, command: &HandoffCommand) -> HandoffServiceResult<HandlerOutcome> {
        let customer = command.require_customer()?;
        let agent = command.require_agent()?;
        let conversation = self.store.connect(customer, agent).await?;
        info!(customer = %customer, agent = %agent, "agent connected");
        Ok(self.with_notice(conversation, Notice::Connected, Some(agent)))
    }

    /// Returns the command's customer to the bot.
    ///
    /// # Errors
    ///
    /// See [`ConversationStore::disconnect`].
    pub async fn disconnect(
        &self,
        command: &HandoffCommand,
    ) -> HandoffServiceResult<HandlerOutcome> {
        let customer = command.require_customer()?;
        let agent = command.require_agent()?;
        let conversation = self.store.disconnect(customer, Some(agent)).await?;
        info!(customer = %customer, agent = %agent, "agent disconnected");
        Ok(self.with_notice(conversation, Notice::Disconnected, Some(agent)))
    }

    /// Queues the command's customer for an agent.
    ///
    /// # Errors
    ///
    /// See [`ConversationStore::queue`].
    pub async fn queue(&self, command: &HandoffCommand) -> HandoffServiceResult<HandlerOutcome> {
        let customer = command.require_customer()?;
        let conversation = self.store.queue(customer).await?;
        Ok(self.with_notice(conversation, Notice::Queued, None))
    }

    /// Withdraws the command's customer from the queue.
    ///
    /// # Errors
    ///
    /// See [`ConversationStore::dequeue`].
    pub async fn dequeue(&self, command: &HandoffCommand) -> HandoffServiceResult<HandlerOutcome> {
        let customer = command.require_customer()?;
        let conversation = self.store.dequeue(customer).await?;
        Ok(self.with_notice(conversation, Notice::Dequeued, None))
    }

    /// Adds the command's agent to the customer's watchers.
    ///
    /// # Errors
    ///
    /// See [`ConversationStore::watch`].
    pub async fn watch(&self, command: &HandoffCommand) -> HandoffServiceResult<HandlerOutcome> {
        let customer = command.require_customer()?;
        let agent = command.require_agent()?;
        let conversation = self.store.watch(customer, agent).await?;
        Ok(HandlerOutcome::silent(conversation))
    }

    /// Removes the command's agent from the customer's watchers.
    ///
    /// # Errors
    ///
    /// See [`ConversationStore::unwatch`].
    pub async fn unwatch(&self, command: &HandoffCommand) -> HandoffServiceResult<HandlerOutcome> {
        let customer = command.require_customer()?;
        let agent = command.require_agent()?;
        let conversation = self.store.unwatch(customer, agent).await?;
        Ok(HandlerOutcome::silent(conversation))
    }

    /// Records a message sent by a customer.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn record_customer_message(
        &self,
        message: &InboundMessage,
    ) -> HandoffServiceResult<Conversation> {
        let customer = message.sender();
        let line = TranscriptLine::new(
            TranscriptSource::Customer(customer.clone()),
            message.text(),
            &*self.clock,
        );
        Ok(self.store.append_transcript(customer, line).await?)
    }

    /// Records a message sent by an agent on the conversation it is
    /// connected to or watching.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::AgentNotFoundForCustomer`] when the agent is
    /// not attached to any conversation.
    pub async fn record_agent_message(
        &self,
        message: &InboundMessage,
    ) -> HandoffServiceResult<Conversation> {
        let agent = message.sender();
        let Some(conversation) = self.store.find_by_agent(agent).await? else {
            return Err(HandoffError::AgentNotFoundForCustomer(agent.clone()).into());
        };
        let line = TranscriptLine::new(
            TranscriptSource::Agent(agent.clone()),
            message.text(),
            &*self.clock,
        );
        Ok(self
            .store
            .append_transcript(conversation.customer_address(), line)
            .await?)
    }

    /// Records a bot reply to the customer.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::BotSpokeWhileAgentConnected`] while an agent
    /// owns the conversation.
    pub async fn record_bot_message(
        &self,
        customer: &Address,
        text: &str,
    ) -> HandoffServiceResult<Conversation> {
        let line = TranscriptLine::new(TranscriptSource::Bot, text, &*self.clock);
        Ok(self.store.append_transcript(customer, line).await?)
    }

    /// Records a bot reply even while an agent owns the conversation.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn record_bot_message_ignoring_state(
        &self,
        customer: &Address,
        text: &str,
    ) -> HandoffServiceResult<Conversation> {
        let line = TranscriptLine::new(TranscriptSource::Bot, text, &*self.clock);
        Ok(self
            .store
            .append_transcript_ignoring_state(customer, line)
            .await?)
    }

    /// Renders a courtesy notice addressed to the customer.
    ///
    /// Render failures are logged and yield `None`.
    #[must_use]
    pub fn notice(
        &self,
        notice: Notice,
        customer: &Address,
        agent: Option<&Address>,
    ) -> Option<OutboundMessage> {
        match self.courtesy.render(notice, customer, agent) {
            Ok(text) => Some(OutboundMessage::notice(customer.clone(), text)),
            Err(error) => {
                warn!(customer = %customer, error = %error, "courtesy notice skipped");
                None
            }
        }
    }

    fn with_notice(
        &self,
        conversation: Conversation,
        notice: Notice,
        agent: Option<&Address>,
    ) -> HandlerOutcome {
        let courtesy = self.notice(notice, conversation.customer_address(), agent);
        HandlerOutcome {
            conversation,
            courtesy,
        }
    }
}
