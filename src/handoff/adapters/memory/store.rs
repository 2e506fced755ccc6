//! In-memory conversation store with per-customer locking.
//!
//! Each conversation sits behind its own mutex, so operations on different
//! customers never contend beyond the brief map lookup. The agent index has
//! a separate mutex that is only ever taken while a customer lock is held,
//! never the other way round.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use indexmap::IndexSet;
use tracing::debug;

use crate::handoff::{
    config::HandoffConfig,
    domain::{
        Address, Conversation, DisconnectPolicy, HandoffError, TranscriptLine, WatchPolicy,
    },
    ports::{ConversationStore, ConversationStoreError, ConversationStoreResult},
};

type ConversationSlot = Arc<Mutex<Conversation>>;

/// Thread-safe in-memory implementation of [`ConversationStore`].
///
/// Cloning the store shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    conversations: Arc<RwLock<HashMap<Address, ConversationSlot>>>,
    agents: Arc<Mutex<AgentIndex>>,
    watch_policy: WatchPolicy,
    disconnect_policy: DisconnectPolicy,
}

/// Reverse lookup from agents to the customers they own or watch.
#[derive(Debug, Default)]
struct AgentIndex {
    connected: HashMap<Address, Address>,
    watching: HashMap<Address, IndexSet<Address>>,
}

impl AgentIndex {
    fn customer_for(&self, agent: &Address) -> Option<Address> {
        self.connected.get(agent).cloned().or_else(|| {
            self.watching
                .get(agent)
                .and_then(|customers| customers.first())
                .cloned()
        })
    }

    fn add_watch(&mut self, agent: &Address, customer: &Address) {
        self.watching
            .entry(agent.clone())
            .or_default()
            .insert(customer.clone());
    }

    fn remove_watch(&mut self, agent: &Address, customer: &Address) {
        if let Some(customers) = self.watching.get_mut(agent) {
            customers.shift_remove(customer);
            if customers.is_empty() {
                self.watching.remove(agent);
            }
        }
    }
}

fn lock_error(err: impl std::fmt::Display) -> ConversationStoreError {
    ConversationStoreError::persistence(std::io::Error::other(err.to_string()))
}

impl InMemoryConversationStore {
    /// Creates an empty store with idempotent watches and unrestricted
    /// disconnects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given policies.
    #[must_use]
    pub fn with_policies(watch_policy: WatchPolicy, disconnect_policy: DisconnectPolicy) -> Self {
        Self {
            watch_policy,
            disconnect_policy,
            ..Self::default()
        }
    }

    /// Creates an empty store with the policies named in `config`.
    #[must_use]
    pub fn from_config(config: &HandoffConfig) -> Self {
        Self::with_policies(config.watch_policy, config.disconnect_policy)
    }

    /// Returns the number of stored conversations.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the conversation map lock is
    /// poisoned.
    pub fn len(&self) -> ConversationStoreResult<usize> {
        let guard = self.conversations.read().map_err(lock_error)?;
        Ok(guard.len())
    }

    /// Returns `true` if no conversations are stored.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the conversation map lock is
    /// poisoned.
    pub fn is_empty(&self) -> ConversationStoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn existing_slot(&self, customer: &Address) -> ConversationStoreResult<Option<ConversationSlot>> {
        let guard = self.conversations.read().map_err(lock_error)?;
        Ok(guard.get(customer).cloned())
    }

    fn slot(&self, customer: &Address) -> ConversationStoreResult<ConversationSlot> {
        if let Some(slot) = self.existing_slot(customer)? {
            return Ok(slot);
        }

        let mut guard = self.conversations.write().map_err(lock_error)?;
        let slot = guard.entry(customer.clone()).or_insert_with(|| {
            debug!(customer = %customer, "creating conversation");
            Arc::new(Mutex::new(Conversation::new(customer.clone())))
        });
        Ok(Arc::clone(slot))
    }

    fn lock_agents(&self) -> ConversationStoreResult<MutexGuard<'_, AgentIndex>> {
        self.agents.lock().map_err(lock_error)
    }

    /// Runs `operation` under the customer's lock and returns a snapshot of
    /// the result.
    ///
    /// The operation must leave the conversation untouched when it fails.
    fn mutate<F>(&self, customer: &Address, operation: F) -> ConversationStoreResult<Conversation>
    where
        F: FnOnce(&mut Conversation) -> ConversationStoreResult<()>,
    {
        let slot = self.slot(customer)?;
        let mut conversation = slot.lock().map_err(lock_error)?;
        operation(&mut *conversation)?;
        debug!(
            customer = %customer,
            state = %conversation.state(),
            watchers = conversation.watching_agents().len(),
            "conversation updated"
        );
        Ok(conversation.clone())
    }

    fn snapshot(slot: &ConversationSlot) -> ConversationStoreResult<Conversation> {
        let conversation = slot.lock().map_err(lock_error)?;
        Ok(conversation.clone())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_or_create(&self, customer: &Address) -> ConversationStoreResult<Conversation> {
        let slot = self.slot(customer)?;
        Self::snapshot(&slot)
    }

    async fn find_by_customer(
        &self,
        customer: &Address,
    ) -> ConversationStoreResult<Option<Conversation>> {
        self.existing_slot(customer)?
            .map(|slot| Self::snapshot(&slot))
            .transpose()
    }

    async fn find_by_agent(
        &self,
        agent: &Address,
    ) -> ConversationStoreResult<Option<Conversation>> {
        // Released before any customer lock is taken.
        let customer = self.lock_agents()?.customer_for(agent);
        let Some(customer_address) = customer else {
            return Ok(None);
        };
        self.existing_slot(&customer_address)?
            .map(|slot| Self::snapshot(&slot))
            .transpose()
    }

    async fn list_all(&self) -> ConversationStoreResult<Vec<Conversation>> {
        let slots: Vec<ConversationSlot> = {
            let guard = self.conversations.read().map_err(lock_error)?;
            guard.values().cloned().collect()
        };
        slots.iter().map(Self::snapshot).collect()
    }

    async fn append_transcript(
        &self,
        customer: &Address,
        line: TranscriptLine,
    ) -> ConversationStoreResult<Conversation> {
        self.mutate(customer, |conversation| Ok(conversation.record(line)?))
    }

    async fn append_transcript_ignoring_state(
        &self,
        customer: &Address,
        line: TranscriptLine,
    ) -> ConversationStoreResult<Conversation> {
        self.mutate(customer, |conversation| {
            conversation.record_ignoring_state(line);
            Ok(())
        })
    }

    async fn connect(
        &self,
        customer: &Address,
        agent: &Address,
    ) -> ConversationStoreResult<Conversation> {
        self.mutate(customer, |conversation| {
            let mut agents = self.lock_agents()?;
            if let Some(owned) = agents.connected.get(agent)
                && owned != customer
            {
                return Err(HandoffError::AgentAlreadyConnectedElsewhere {
                    agent: agent.clone(),
                    customer: owned.clone(),
                }
                .into());
            }

            conversation.connect(agent)?;
            agents.connected.insert(agent.clone(), customer.clone());
            agents.add_watch(agent, customer);
            Ok(())
        })
    }

    async fn disconnect(
        &self,
        customer: &Address,
        requested_by: Option<&Address>,
    ) -> ConversationStoreResult<Conversation> {
        self.mutate(customer, |conversation| {
            let mut agents = self.lock_agents()?;
            let released = conversation.disconnect(requested_by, self.disconnect_policy)?;
            agents.connected.remove(&released);
            agents.remove_watch(&released, customer);
            Ok(())
        })
    }

    async fn queue(&self, customer: &Address) -> ConversationStoreResult<Conversation> {
        self.mutate(customer, |conversation| Ok(conversation.queue()?))
    }

    async fn dequeue(&self, customer: &Address) -> ConversationStoreResult<Conversation> {
        self.mutate(customer, |conversation| Ok(conversation.dequeue()?))
    }

    async fn watch(
        &self,
        customer: &Address,
        agent: &Address,
    ) -> ConversationStoreResult<Conversation> {
        self.mutate(customer, |conversation| {
            let mut agents = self.lock_agents()?;
            conversation.watch(agent, self.watch_policy)?;
            agents.add_watch(agent, customer);
            Ok(())
        })
    }

    async fn unwatch(
        &self,
        customer: &Address,
        agent: &Address,
    ) -> ConversationStoreResult<Conversation> {
        self.mutate(customer, |conversation| {
            let mut agents = self.lock_agents()?;
            conversation.unwatch(agent)?;
            agents.remove_watch(agent, customer);
            Ok(())
        })
    }
}
