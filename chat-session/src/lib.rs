//! Session layer of the catalog assistant.
//!
//! - [`SessionContext`] / [`SessionRegistry`]: explicit per-session state
//! - [`Bootstrapper`]: idempotent session initialization
//! - [`AppConfig`]: environment-driven configuration
//! - [`telemetry`]: one-time logger installation

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod registry;
pub mod session;
pub mod telemetry;

pub use bootstrap::{BootstrapSummary, Bootstrapper};
pub use config::{AppConfig, LogConfig};
pub use errors::SessionError;
pub use registry::SessionRegistry;
pub use session::{ChatMessage, Role, SessionContext};
