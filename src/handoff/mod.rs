//! Conversation handoff between a bot and human agents.
//!
//! This module follows hexagonal architecture:
//!
//! - `domain`: conversations, addresses, commands, and state transitions
//! - `ports`: store, delivery, bot pipeline, and classifier contracts
//! - `adapters`: in-memory implementations of the ports
//! - `services`: command handlers, outcome notifier, and event router
//! - `config`: courtesy notices and policy switches

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;
