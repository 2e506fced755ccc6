//! Store port owning every customer conversation.
//!
//! Implementations must make each operation atomic per customer address:
//! the read, validate, and write steps of two operations on the same
//! customer never interleave, while operations on different customers may
//! run in parallel. Operations that also touch the agent index take the
//! customer lock first and the agent index second.

use crate::handoff::domain::{Address, Conversation, HandoffError, TranscriptLine};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for conversation store operations.
pub type ConversationStoreResult<T> = Result<T, ConversationStoreError>;

/// Conversation persistence and transition contract.
///
/// Every operation returns a snapshot; no caller ever holds a reference
/// into store-owned state.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns the customer's conversation, creating a bot-owned one if the
    /// customer is unseen.
    async fn get_or_create(&self, customer: &Address) -> ConversationStoreResult<Conversation>;

    /// Returns the customer's conversation without creating one.
    async fn find_by_customer(
        &self,
        customer: &Address,
    ) -> ConversationStoreResult<Option<Conversation>>;

    /// Returns the conversation the agent is connected to, or else the
    /// earliest one it is watching.
    async fn find_by_agent(&self, agent: &Address)
    -> ConversationStoreResult<Option<Conversation>>;

    /// Returns snapshots of every conversation.
    async fn list_all(&self) -> ConversationStoreResult<Vec<Conversation>>;

    /// Appends a transcript line, creating the conversation if needed.
    ///
    /// # Errors
    ///
    /// Rejects bot lines while an agent owns the conversation with
    /// [`HandoffError::BotSpokeWhileAgentConnected`].
    async fn append_transcript(
        &self,
        customer: &Address,
        line: TranscriptLine,
    ) -> ConversationStoreResult<Conversation>;

    /// Appends a transcript line regardless of routing state.
    async fn append_transcript_ignoring_state(
        &self,
        customer: &Address,
        line: TranscriptLine,
    ) -> ConversationStoreResult<Conversation>;

    /// Connects the agent to the customer.
    ///
    /// # Errors
    ///
    /// Rejects with [`HandoffError::AgentAlreadyConnectedElsewhere`] or
    /// [`HandoffError::CustomerAlreadyConnectedToAnotherAgent`].
    async fn connect(
        &self,
        customer: &Address,
        agent: &Address,
    ) -> ConversationStoreResult<Conversation>;

    /// Releases the customer's connected agent.
    ///
    /// `requested_by` is checked against the owner only when the store is
    /// configured to require it.
    ///
    /// # Errors
    ///
    /// Rejects with [`HandoffError::CustomerNotConnectedToAgent`].
    async fn disconnect(
        &self,
        customer: &Address,
        requested_by: Option<&Address>,
    ) -> ConversationStoreResult<Conversation>;

    /// Queues the customer for an agent.
    ///
    /// # Errors
    ///
    /// Rejects with [`HandoffError::CustomerCannotQueue`] or
    /// [`HandoffError::CustomerAlreadyQueued`].
    async fn queue(&self, customer: &Address) -> ConversationStoreResult<Conversation>;

    /// Withdraws the customer's queue request.
    ///
    /// # Errors
    ///
    /// Rejects with [`HandoffError::CustomerNotQueued`].
    async fn dequeue(&self, customer: &Address) -> ConversationStoreResult<Conversation>;

    /// Adds the agent to the customer's watchers.
    async fn watch(
        &self,
        customer: &Address,
        agent: &Address,
    ) -> ConversationStoreResult<Conversation>;

    /// Removes the agent from the customer's watchers.
    ///
    /// # Errors
    ///
    /// Rejects with [`HandoffError::AgentNotWatching`].
    async fn unwatch(
        &self,
        customer: &Address,
        agent: &Address,
    ) -> ConversationStoreResult<Conversation>;
}

/// Errors returned by conversation store implementations.
#[derive(Debug, Clone, Error)]
pub enum ConversationStoreError {
    /// The operation would break a conversation invariant.
    #[error(transparent)]
    Rejected(#[from] HandoffError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ConversationStoreError {
    /// Wraps a persistence error.
    #[must_use]
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns the business rule violation, if this is one.
    #[must_use]
    pub const fn as_rejection(&self) -> Option<&HandoffError> {
        match self {
            Self::Rejected(error) => Some(error),
            Self::Persistence(_) => None,
        }
    }
}
