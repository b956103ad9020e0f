//! # discord-manage
//!
//! An operation gateway exposing the Discord client surface as a single
//! coarse-grained automation tool, `discord_manage`.
//!
//! The gateway is made of four tightly coupled parts:
//!
//! - a capability catalog enumerating every addressable symbol of the
//!   client surface, each tagged with a behavior class
//!   (read/write/admin/dangerous/unknown)
//! - an operation registry mapping a closed vocabulary of operation keys
//!   onto the `read` and `write` methods
//! - an invocation & policy engine that resolves call targets, enforces the
//!   write guard, and runs calls as dry-run preflights or live, singly or in
//!   batches
//! - an identity worker pool serializing every call of one identity on that
//!   identity's own connection session
//!
//! Everything is constructed explicitly and shared by `Arc`; see
//! [`tool::DiscordManageTool`] for the entry point.

pub mod audit;
pub mod batch;
pub mod capabilities;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod identity;
pub mod invocation;
pub mod operations;
pub mod server;
pub mod tool;

pub use capabilities::{CapabilityCatalog, CatalogService};
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use invocation::InvocationEngine;
pub use operations::{Method, Operation};
pub use tool::{DiscordManageTool, ToolRequest, ToolResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
