//! Sender classifier keyed on user-name prefixes.

use async_trait::async_trait;

use crate::handoff::{
    domain::{Address, InboundMessage},
    ports::SenderClassifier,
};

/// Treats every sender whose user name starts with a prefix as an agent.
///
/// # Examples
///
/// ```
/// use switchboard::handoff::adapters::memory::NamePrefixClassifier;
///
/// let classifier = NamePrefixClassifier::new("Agent");
/// assert_eq!(classifier.prefix(), "Agent");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePrefixClassifier {
    prefix: String,
}

impl NamePrefixClassifier {
    /// Creates a classifier for the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the agent prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[async_trait]
impl SenderClassifier for NamePrefixClassifier {
    async fn is_agent(&self, sender: &Address, _message: &InboundMessage) -> bool {
        sender.user().starts_with(&self.prefix)
    }
}
