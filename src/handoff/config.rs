//! Router configuration: courtesy notices and policy switches.

use minijinja::{Environment, context};
use serde::Deserialize;
use thiserror::Error;

use crate::handoff::domain::{Address, DisconnectPolicy, WatchPolicy};

/// Errors raised while loading configuration or rendering notices.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandoffConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid handoff configuration: {0}")]
    Parse(String),

    /// A courtesy template failed to render.
    #[error("failed to render {notice} notice: {reason}")]
    TemplateRender {
        /// Which notice failed.
        notice: &'static str,
        /// Renderer diagnostic.
        reason: String,
    },
}

/// `minijinja` templates for the notices sent to customers on transitions.
///
/// Templates may reference `customer` and `agent`, the user names of the
/// participants involved (`agent` is empty for customer-side commands).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CourtesyMessages {
    /// Sent to the customer after an agent connects.
    pub connected: String,
    /// Sent to the customer after the agent disconnects.
    pub disconnected: String,
    /// Sent to the customer after queueing.
    pub queued: String,
    /// Sent to the customer after dequeueing.
    pub dequeued: String,
    /// Sent to a queued customer instead of forwarding to the bot.
    pub hold: String,
}

impl Default for CourtesyMessages {
    fn default() -> Self {
        Self {
            connected: "you're now connected to an agent".to_owned(),
            disconnected: "you're no longer connected to the agent".to_owned(),
            queued: "you're all set to talk to an agent. One will be with you as soon as they become available".to_owned(),
            dequeued: "you're no longer in line for an agent".to_owned(),
            hold: "please hold on while we connect you to an agent".to_owned(),
        }
    }
}

/// Which courtesy notice to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// See [`CourtesyMessages::connected`].
    Connected,
    /// See [`CourtesyMessages::disconnected`].
    Disconnected,
    /// See [`CourtesyMessages::queued`].
    Queued,
    /// See [`CourtesyMessages::dequeued`].
    Dequeued,
    /// See [`CourtesyMessages::hold`].
    Hold,
}

impl Notice {
    const fn name(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Queued => "queued",
            Self::Dequeued => "dequeued",
            Self::Hold => "hold",
        }
    }
}

impl CourtesyMessages {
    /// Renders a notice for the given participants.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffConfigError::TemplateRender`] when the template is
    /// invalid.
    pub fn render(
        &self,
        notice: Notice,
        customer: &Address,
        agent: Option<&Address>,
    ) -> Result<String, HandoffConfigError> {
        let template = match notice {
            Notice::Connected => &self.connected,
            Notice::Disconnected => &self.disconnected,
            Notice::Queued => &self.queued,
            Notice::Dequeued => &self.dequeued,
            Notice::Hold => &self.hold,
        };
        let environment = Environment::new();
        environment
            .render_str(
                template,
                context! {
                    customer => customer.user(),
                    agent => agent.map(Address::user).unwrap_or_default(),
                },
            )
            .map_err(|error| HandoffConfigError::TemplateRender {
                notice: notice.name(),
                reason: error.to_string(),
            })
    }
}

/// Configuration for the handoff router.
///
/// # Examples
///
/// ```
/// use switchboard::handoff::config::HandoffConfig;
/// use switchboard::handoff::domain::WatchPolicy;
///
/// let config = HandoffConfig::default();
/// assert_eq!(config.watch_policy, WatchPolicy::Idempotent);
///
/// let loaded = HandoffConfig::from_json_str(r#"{ "watch_policy": "reject_repeated" }"#)
///     .expect("valid configuration");
/// assert_eq!(loaded.watch_policy, WatchPolicy::RejectRepeated);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    /// Treatment of a repeated watch by the same agent.
    pub watch_policy: WatchPolicy,
    /// Whether disconnects must come from the owning agent.
    pub disconnect_policy: DisconnectPolicy,
    /// Courtesy notice templates.
    pub courtesy: CourtesyMessages,
}

impl HandoffConfig {
    /// Creates a configuration that rejects repeated watches and disconnects
    /// from agents other than the owner.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            watch_policy: WatchPolicy::RejectRepeated,
            disconnect_policy: DisconnectPolicy::OwnerOnly,
            ..Self::default()
        }
    }

    /// Parses a JSON configuration document; omitted fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffConfigError::Parse`] for malformed documents.
    pub fn from_json_str(document: &str) -> Result<Self, HandoffConfigError> {
        serde_json::from_str(document).map_err(|error| HandoffConfigError::Parse(error.to_string()))
    }
}
