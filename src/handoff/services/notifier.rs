//! Success callbacks and error reporting for routed commands.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use crate::handoff::{
    domain::{
        Address, CommandKind, Conversation, ErrorEvent, HandoffCommand, InboundMessage,
        OutboundMessage,
    },
    ports::MessageDelivery,
};

use super::{error::HandoffServiceError, handlers::HandlerOutcome};

/// View of the router handed to success callbacks.
///
/// Messages queued with [`RouterHandle::send`] are delivered once the
/// callback returns, after any courtesy notice for the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterHandle {
    conversation: Conversation,
    outbox: Vec<OutboundMessage>,
}

impl RouterHandle {
    /// Creates a handle for the conversation a command just changed.
    #[must_use]
    pub const fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            outbox: Vec::new(),
        }
    }

    /// Returns the conversation snapshot after the transition.
    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Queues a message for delivery.
    pub fn send(&mut self, message: OutboundMessage) {
        self.outbox.push(message);
    }

    /// Queues a router-originated text message for delivery.
    pub fn send_text(&mut self, to: Address, text: impl Into<String>) {
        self.send(OutboundMessage::notice(to, text));
    }

    /// Returns the messages queued so far.
    #[must_use]
    pub fn pending(&self) -> &[OutboundMessage] {
        &self.outbox
    }

    fn into_outbox(self) -> Vec<OutboundMessage> {
        self.outbox
    }
}

/// Callback invoked once after a command of its kind succeeds.
pub type SuccessHandler = Arc<dyn Fn(&mut RouterHandle, &HandoffCommand) + Send + Sync>;

/// Dispatch table of success callbacks keyed by command kind.
///
/// # Examples
///
/// ```
/// use switchboard::handoff::domain::CommandKind;
/// use switchboard::handoff::services::SuccessHandlers;
///
/// let handlers = SuccessHandlers::new().on(CommandKind::Connect, |handle, _command| {
///     let customer = handle.conversation().customer_address().clone();
///     handle.send_text(customer, "an agent has joined");
/// });
/// assert!(handlers.is_registered(CommandKind::Connect));
/// assert!(!handlers.is_registered(CommandKind::Queue));
/// ```
#[derive(Clone, Default)]
pub struct SuccessHandlers {
    handlers: HashMap<CommandKind, SuccessHandler>,
}

impl SuccessHandlers {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the callback for `kind`, replacing any earlier one.
    #[must_use]
    pub fn on<F>(mut self, kind: CommandKind, handler: F) -> Self
    where
        F: Fn(&mut RouterHandle, &HandoffCommand) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Returns the callback for `kind`, if registered.
    #[must_use]
    pub fn get(&self, kind: CommandKind) -> Option<&SuccessHandler> {
        self.handlers.get(&kind)
    }

    /// Returns `true` if a callback is registered for `kind`.
    #[must_use]
    pub fn is_registered(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl fmt::Debug for SuccessHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<CommandKind> = CommandKind::ALL
            .into_iter()
            .filter(|kind| self.is_registered(*kind))
            .collect();
        f.debug_struct("SuccessHandlers")
            .field("registered", &registered)
            .finish()
    }
}

/// Runs success callbacks and turns failures into delivered error events.
///
/// Nothing here returns an error: delivery failures are logged.
pub struct OutcomeNotifier<D>
where
    D: MessageDelivery,
{
    delivery: Arc<D>,
    handlers: SuccessHandlers,
}

impl<D> OutcomeNotifier<D>
where
    D: MessageDelivery,
{
    /// Creates a notifier delivering through `delivery`.
    #[must_use]
    pub const fn new(delivery: Arc<D>, handlers: SuccessHandlers) -> Self {
        Self { delivery, handlers }
    }

    /// Delivers the courtesy notice, then runs the callback registered for
    /// the command kind and delivers whatever it queued.
    pub async fn succeeded(&self, command: &HandoffCommand, outcome: HandlerOutcome) {
        let mut handle = RouterHandle::new(outcome.conversation);
        if let Some(courtesy) = outcome.courtesy {
            handle.send(courtesy);
        }
        if let Some(handler) = self.handlers.get(command.kind()) {
            handler(&mut handle, command);
        }
        for message in handle.into_outbox() {
            self.deliver(message).await;
        }
    }

    /// Reports a failed command to whoever sent it.
    ///
    /// Malformed commands are logged and dropped; `None` is returned for
    /// them.
    pub async fn command_failed(
        &self,
        command: &HandoffCommand,
        failure: &HandoffServiceError,
    ) -> Option<ErrorEvent> {
        if failure.is_malformed() {
            error!(command = %command.id(), kind = %command.kind(), error = %failure, "dropping malformed command");
            return None;
        }
        let Some(recipient) = command.reply_address().cloned() else {
            error!(command = %command.id(), kind = %command.kind(), error = %failure, "dropping failure with no reply address");
            return None;
        };

        warn!(
            command = %command.id(),
            kind = %command.kind(),
            error_kind = %failure.kind(),
            recipient = %recipient,
            "handoff command rejected"
        );
        let event = ErrorEvent {
            command: Some(command.clone()),
            kind: failure.kind(),
            message: failure.to_string(),
            recipient,
        };
        self.deliver(OutboundMessage::Error(event.clone())).await;
        Some(event)
    }

    /// Reports a chat message that could not be routed to its sender.
    pub async fn message_failed(
        &self,
        message: &InboundMessage,
        failure: &HandoffServiceError,
    ) -> ErrorEvent {
        warn!(
            sender = %message.sender(),
            error_kind = %failure.kind(),
            "chat message rejected"
        );
        let event = ErrorEvent {
            command: None,
            kind: failure.kind(),
            message: failure.to_string(),
            recipient: message.sender().clone(),
        };
        self.deliver(OutboundMessage::Error(event.clone())).await;
        event
    }

    /// Hands a message to the transport, logging failures.
    pub async fn deliver(&self, message: OutboundMessage) {
        let recipient = message.recipient().clone();
        if let Err(failure) = self.delivery.deliver(message).await {
            warn!(recipient = %recipient, error = %failure, "delivery failed");
        }
    }
}

impl<D> fmt::Debug for OutcomeNotifier<D>
where
    D: MessageDelivery,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeNotifier")
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
