//! Event router: dispatches handoff commands and routes chat messages
//! between customers, agents, and the bot.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, warn};

use crate::handoff::{
    config::{HandoffConfig, Notice},
    domain::{
        Address, CommandKind, Conversation, ConversationState, ErrorEvent, HandoffCommand,
        InboundActivity, InboundMessage, OutboundMessage,
    },
    ports::{BotPipeline, ConversationStore, MessageDelivery, SenderClassifier},
};

use super::{
    error::{HandoffServiceError, HandoffServiceResult},
    handlers::HandoffCommandHandler,
    notifier::{OutcomeNotifier, SuccessHandlers},
};

/// Collaborators the router is built from.
#[derive(Debug)]
pub struct RouterPorts<S, D, B, C, K> {
    /// Conversation store.
    pub store: Arc<S>,
    /// Transport for outbound messages and error events.
    pub delivery: Arc<D>,
    /// Bot dialog engine.
    pub bot: Arc<B>,
    /// Agent/customer sender classification.
    pub classifier: Arc<C>,
    /// Clock stamping transcript lines.
    pub clock: Arc<K>,
}

/// What the router did with an inbound activity.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// A command changed its conversation and callbacks ran.
    Applied {
        /// The command kind applied.
        kind: CommandKind,
        /// Conversation snapshot after the transition.
        conversation: Conversation,
    },
    /// The activity failed and an error event went to its sender.
    Rejected(ErrorEvent),
    /// The activity failed and could not be reported to anyone.
    Dropped(HandoffServiceError),
    /// A customer message went to the bot.
    ForwardedToBot(Conversation),
    /// A connected agent's message was mirrored to the customer.
    MirroredToCustomer(Conversation),
    /// A watching agent's message was transcribed but not delivered.
    Observed(Conversation),
    /// A customer message was mirrored to the connected agent.
    MirroredToAgent(Conversation),
    /// A queued customer was asked to hold.
    Held(Conversation),
    /// A bot reply was transcribed and delivered.
    BotReplyDelivered(Conversation),
    /// The activity is not ours; nothing happened.
    PassedThrough,
}

impl RouteOutcome {
    /// Returns the conversation snapshot, for outcomes that touched one.
    #[must_use]
    pub const fn conversation(&self) -> Option<&Conversation> {
        match self {
            Self::Applied { conversation, .. }
            | Self::ForwardedToBot(conversation)
            | Self::MirroredToCustomer(conversation)
            | Self::Observed(conversation)
            | Self::MirroredToAgent(conversation)
            | Self::Held(conversation)
            | Self::BotReplyDelivered(conversation) => Some(conversation),
            Self::Rejected(_) | Self::Dropped(_) | Self::PassedThrough => None,
        }
    }
}

/// Routes inbound activities through the handoff state machine.
///
/// Commands are applied by [`HandoffCommandHandler`] and reported by
/// [`OutcomeNotifier`]. Chat messages are transcribed and then routed by
/// sender role and conversation state. Policy switches in the
/// [`HandoffConfig`] are enforced by the store; build the store from the
/// same configuration.
pub struct EventRouter<S, D, B, C, K>
where
    S: ConversationStore,
    D: MessageDelivery,
    B: BotPipeline,
    C: SenderClassifier,
    K: Clock + Send + Sync,
{
    handler: HandoffCommandHandler<S, K>,
    notifier: OutcomeNotifier<D>,
    bot: Arc<B>,
    classifier: Arc<C>,
}

impl<S, D, B, C, K> EventRouter<S, D, B, C, K>
where
    S: ConversationStore,
    D: MessageDelivery,
    B: BotPipeline,
    C: SenderClassifier,
    K: Clock + Send + Sync,
{
    /// Creates a router with the given success callbacks.
    #[must_use]
    pub fn new(
        ports: RouterPorts<S, D, B, C, K>,
        config: HandoffConfig,
        handlers: SuccessHandlers,
    ) -> Self {
        let RouterPorts {
            store,
            delivery,
            bot,
            classifier,
            clock,
        } = ports;
        Self {
            handler: HandoffCommandHandler::new(store, clock, config.courtesy),
            notifier: OutcomeNotifier::new(delivery, handlers),
            bot,
            classifier,
        }
    }

    /// Returns the command handler.
    #[must_use]
    pub const fn handler(&self) -> &HandoffCommandHandler<S, K> {
        &self.handler
    }

    /// Routes one inbound activity.
    pub async fn route(&self, activity: InboundActivity) -> RouteOutcome {
        match activity {
            InboundActivity::Command(command) => self.dispatch_command(&command).await,
            InboundActivity::Message(message) => self.route_message(message).await,
            InboundActivity::Other {
                activity_type,
                sender,
            } => {
                debug!(activity_type = %activity_type, sender = %sender, "passing activity through");
                RouteOutcome::PassedThrough
            }
        }
    }

    /// Applies a command, then runs its success callback or reports the
    /// failure to its sender.
    pub async fn dispatch_command(&self, command: &HandoffCommand) -> RouteOutcome {
        match self.handler.handle(command).await {
            Ok(outcome) => {
                let conversation = outcome.conversation.clone();
                self.notifier.succeeded(command, outcome).await;
                RouteOutcome::Applied {
                    kind: command.kind(),
                    conversation,
                }
            }
            Err(failure) => match self.notifier.command_failed(command, &failure).await {
                Some(event) => RouteOutcome::Rejected(event),
                None => RouteOutcome::Dropped(failure),
            },
        }
    }

    /// Transcribes a chat message and routes it by sender role.
    ///
    /// Agent messages reach the customer only from the connected agent;
    /// a watching agent's message stays in the transcript.
    pub async fn route_message(&self, message: InboundMessage) -> RouteOutcome {
        if self.classifier.is_agent(message.sender(), &message).await {
            self.route_agent_message(&message).await
        } else {
            self.route_customer_message(message).await
        }
    }

    async fn route_agent_message(&self, message: &InboundMessage) -> RouteOutcome {
        let conversation = match self.handler.record_agent_message(message).await {
            Ok(conversation) => conversation,
            Err(failure) => {
                return RouteOutcome::Rejected(self.notifier.message_failed(message, &failure).await);
            }
        };

        if conversation.connected_agent() != Some(message.sender()) {
            debug!(
                agent = %message.sender(),
                customer = %conversation.customer_address(),
                "watching agent message transcribed only"
            );
            return RouteOutcome::Observed(conversation);
        }

        let customer = conversation.customer_address().clone();
        self.notifier
            .deliver(OutboundMessage::mirror(
                customer,
                message.sender().clone(),
                message.text(),
            ))
            .await;
        RouteOutcome::MirroredToCustomer(conversation)
    }

    async fn route_customer_message(&self, message: InboundMessage) -> RouteOutcome {
        let conversation = match self.handler.record_customer_message(&message).await {
            Ok(conversation) => conversation,
            Err(failure) => {
                return RouteOutcome::Rejected(self.notifier.message_failed(&message, &failure).await);
            }
        };

        match (conversation.state(), conversation.connected_agent()) {
            (ConversationState::Agent, Some(agent)) => {
                self.notifier
                    .deliver(OutboundMessage::mirror(
                        agent.clone(),
                        message.sender().clone(),
                        message.text(),
                    ))
                    .await;
                RouteOutcome::MirroredToAgent(conversation)
            }
            (ConversationState::Wait, _) => {
                if let Some(hold) = self.handler.notice(Notice::Hold, message.sender(), None) {
                    self.notifier.deliver(hold).await;
                }
                RouteOutcome::Held(conversation)
            }
            _ => {
                if let Err(failure) = self.bot.forward(message).await {
                    warn!(
                        customer = %conversation.customer_address(),
                        error = %failure,
                        "bot pipeline unavailable"
                    );
                }
                RouteOutcome::ForwardedToBot(conversation)
            }
        }
    }

    /// Transcribes a bot reply and delivers it to the customer.
    ///
    /// The reply is suppressed, and [`RouteOutcome::Dropped`] returned,
    /// while an agent owns the conversation.
    pub async fn send_bot_reply(&self, customer: &Address, text: &str) -> RouteOutcome {
        match self.handler.record_bot_message(customer, text).await {
            Ok(conversation) => {
                self.notifier
                    .deliver(OutboundMessage::notice(customer.clone(), text))
                    .await;
                RouteOutcome::BotReplyDelivered(conversation)
            }
            Err(failure) => {
                warn!(customer = %customer, error = %failure, "bot reply suppressed");
                RouteOutcome::Dropped(failure)
            }
        }
    }

    /// Returns snapshots of every conversation.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn list_all(&self) -> HandoffServiceResult<Vec<Conversation>> {
        Ok(self.handler.store().list_all().await?)
    }

    /// Returns the customer's conversation, if one exists.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn find_by_customer(
        &self,
        customer: &Address,
    ) -> HandoffServiceResult<Option<Conversation>> {
        Ok(self.handler.store().find_by_customer(customer).await?)
    }

    /// Returns the conversation the agent is connected to or watching.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub async fn find_by_agent(
        &self,
        agent: &Address,
    ) -> HandoffServiceResult<Option<Conversation>> {
        Ok(self.handler.store().find_by_agent(agent).await?)
    }
}
