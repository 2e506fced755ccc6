//! Service-level errors for handoff command handling.

use thiserror::Error;

use crate::handoff::{
    domain::{HandoffError, HandoffErrorKind},
    ports::ConversationStoreError,
};

/// Errors returned by the handoff services.
#[derive(Debug, Clone, Error)]
pub enum HandoffServiceError {
    /// The command or message broke a business rule.
    #[error(transparent)]
    Rejected(#[from] HandoffError),

    /// The store failed for a reason unrelated to business rules.
    #[error(transparent)]
    Store(ConversationStoreError),
}

impl HandoffServiceError {
    /// Returns the machine-readable kind for error events.
    #[must_use]
    pub const fn kind(&self) -> HandoffErrorKind {
        match self {
            Self::Rejected(error) => error.kind(),
            Self::Store(_) => HandoffErrorKind::StoreUnavailable,
        }
    }

    /// Returns `true` for commands that cannot be attributed to a
    /// conversation.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Rejected(HandoffError::MalformedCommand { .. }))
    }
}

impl From<ConversationStoreError> for HandoffServiceError {
    fn from(error: ConversationStoreError) -> Self {
        match error {
            ConversationStoreError::Rejected(rejection) => Self::Rejected(rejection),
            persistence @ ConversationStoreError::Persistence(_) => Self::Store(persistence),
        }
    }
}

/// Result type for handoff service operations.
pub type HandoffServiceResult<T> = Result<T, HandoffServiceError>;
