//! Application services for conversation handoff.
//!
//! Services sit between the inbound transport and the store: handlers apply
//! commands, the notifier reports their outcomes, and the router decides
//! where chat messages go.

mod error;
mod handlers;
mod notifier;
mod router;

pub use error::{HandoffServiceError, HandoffServiceResult};
pub use handlers::{HandlerOutcome, HandoffCommandHandler};
pub use notifier::{OutcomeNotifier, RouterHandle, SuccessHandler, SuccessHandlers};
pub use router::{EventRouter, RouteOutcome, RouterPorts};
