//! Switchboard: bot-to-human conversation handoff.
//!
//! This crate routes customer conversations between a bot and human agents.
//! Agents can watch a conversation, connect to take it over, and disconnect
//! to hand it back; customers can queue for an agent and withdraw.
//!
//! # Architecture
//!
//! Switchboard follows hexagonal architecture principles:
//!
//! - **Domain**: Conversation state and transition rules with no
//!   infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the store and the transport
//! - **Adapters**: Concrete implementations of ports (in-memory, channels)
//! - **Services**: Command handling, outcome notification, and routing
//!
//! # Modules
//!
//! - [`handoff`]: Conversation store, command handlers, and event router

pub mod handoff;
