//! # Mise Runtime
//!
//! Command layer for the Mise ledger.
//!
//! This crate sits between the console and [`mise_core`]: each command
//! consults the guards, waits for the upstream system that owns the fact
//! (order API, payment gateway) to accept it, re-validates, and only then
//! appends the event.
//!
//! ## Core Components
//!
//! - **Ledger**: [`environment::Ledger`], the log plus injected clock and ids
//! - **Order commands**: [`commands::OrderCommands`]
//! - **Entity commands**: [`entity::EntityCommands`] for transfers, counts
//!   and count sheets
//! - **Upstream traits**: [`backend::OrderBackend`], [`backend::PaymentGateway`]
//! - **Ambient**: [`config`], [`telemetry`], [`metrics`]
//!
//! ## Example
//!
//! ```ignore
//! use mise_runtime::{LedgerConfig, Ledger, OrderCommands};
//!
//! let config = LedgerConfig::from_env()?;
//! mise_runtime::telemetry::init_tracing(&config)?;
//!
//! let commands = OrderCommands::new(Ledger::system(), order_api, gateway, &config);
//! commands.confirm(&ticket).await?;
//! ```

/// Upstream collaborator traits
pub mod backend;

/// Order and payment command handlers
pub mod commands;

/// Configuration loaded from the environment
pub mod config;

/// Commands for gated entities
pub mod entity;

/// The ledger environment and id generation
pub mod environment;

/// Error types for the command layer
pub mod error;

/// Command and append counters
pub mod metrics;

/// Tracing subscriber setup
pub mod telemetry;

// Re-export commonly used items
pub use backend::{OrderBackend, PaymentGateway, PaymentRequest};
pub use commands::{OrderCommands, PaymentVerdict};
pub use config::{ConfigError, LedgerConfig};
pub use entity::EntityCommands;
pub use environment::{Ledger, UuidGenerator};
pub use error::{CommandError, UpstreamError};
