//! World state for conversation handoff BDD scenarios.

use std::sync::{Arc, Mutex};

use mockable::DefaultClock;
use rstest::fixture;
use switchboard::handoff::{
    adapters::memory::{
        ChannelBotPipeline, ChannelDelivery, InMemoryConversationStore, NamePrefixClassifier,
    },
    config::HandoffConfig,
    domain::{Address, CommandKind, Conversation, InboundMessage, OutboundMessage},
    services::{EventRouter, RouteOutcome, RouterPorts, SuccessHandlers},
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Router type used by the BDD world.
pub type TestRouter = EventRouter<
    InMemoryConversationStore,
    ChannelDelivery,
    ChannelBotPipeline,
    NamePrefixClassifier,
    DefaultClock,
>;

/// Customer and agent pairs seen by the connect callback.
pub type ConnectLog = Arc<Mutex<Vec<(Address, Address)>>>;

const AGENT_PREFIX: &str = "agent-";

/// World state for handoff BDD tests.
pub struct HandoffWorld {
    pub router: TestRouter,
    pub outbox: UnboundedReceiver<OutboundMessage>,
    pub bot_inbox: UnboundedReceiver<InboundMessage>,
    pub connects: ConnectLog,
    pub last_outcome: Option<RouteOutcome>,
}

impl Default for HandoffWorld {
    fn default() -> Self {
        let connects: ConnectLog = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&connects);
        let handlers = SuccessHandlers::new().on(CommandKind::Connect, move |handle, command| {
            if let (Some(agent_address), Ok(mut entries)) = (command.agent_address(), log.lock()) {
                entries.push((
                    handle.conversation().customer_address().clone(),
                    agent_address.clone(),
                ));
            }
        });

        let (delivery, outbox) = ChannelDelivery::new();
        let (bot, bot_inbox) = ChannelBotPipeline::new();
        let router = EventRouter::new(
            RouterPorts {
                store: Arc::new(InMemoryConversationStore::new()),
                delivery: Arc::new(delivery),
                bot: Arc::new(bot),
                classifier: Arc::new(NamePrefixClassifier::new(AGENT_PREFIX)),
                clock: Arc::new(DefaultClock),
            },
            HandoffConfig::default(),
            handlers,
        );

        Self {
            router,
            outbox,
            bot_inbox,
            connects,
            last_outcome: None,
        }
    }
}

impl HandoffWorld {
    /// Looks up the customer's conversation.
    pub fn conversation(&self, name: &str) -> Result<Conversation, eyre::Report> {
        run_async(self.router.find_by_customer(&customer(name)))?
            .ok_or_else(|| eyre::eyre!("no conversation for customer {name}"))
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> HandoffWorld {
    HandoffWorld::default()
}

/// Builds the address of the named customer.
pub fn customer(name: &str) -> Address {
    Address::new("webchat", format!("conv-{name}"), name)
}

/// Builds the address of the named agent.
pub fn agent(name: &str) -> Address {
    Address::new("webchat", format!("conv-{name}"), format!("{AGENT_PREFIX}{name}"))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
