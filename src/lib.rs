//! # RunCodeLocally
//!
//! Receive source code over a local HTTP endpoint, show it in a panel and
//! run it with the matching local toolchain (node, python3, ruby, go, php,
//! dart, npx ts-node, rustc).
//!
//! ## Layout
//!
//! - [`runner`]: registry, execution units, process launcher, reporter, dispatcher
//! - [`panel`]: UI-side state and message handling
//! - [`server`]: HTTP ingress and panel routes
//! - [`context`]: explicit owner of the panel and server lifecycles
//! - [`config`]: layered configuration

pub mod config;
pub mod context;
pub mod error;
pub mod panel;
pub mod runner;
pub mod server;

pub use config::Config;
pub use context::AppContext;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
