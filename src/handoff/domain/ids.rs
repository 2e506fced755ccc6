//! Identifier newtypes for handoff commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an inbound handoff command.
///
/// Error events echo the identifier so the originator can correlate the
/// failure with the command it sent.
///
/// # Examples
///
/// ```
/// use switchboard::handoff::domain::CommandId;
///
/// let id = CommandId::new();
/// assert!(!id.as_ref().is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Creates a new random command identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a command identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Note: `Default` generates a fresh random identifier on each call.
impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for CommandId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
