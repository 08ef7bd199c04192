//! AniLike binary-side plumbing.
//!
//! Exposes the config, auth and run-wiring modules for integration
//! testing; the engine itself lives in the workspace crates.

pub mod auth;
pub mod config;
pub mod runner;

pub use auth::{CookieAuth, CookieSession};
pub use config::{Config, ConfigSource};
pub use runner::{execute, RunOptions};
