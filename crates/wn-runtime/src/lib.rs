//! # websocket-notify Runtime
//!
//! Process wiring for the `websocket-notify` binary.
//!
//! - `cli` - command-line flags and their environment variables
//! - `settings` - defaults, YAML file and overrides merged into one config
//! - `telemetry` - tracing subscriber installation

pub mod cli;
pub mod settings;
pub mod telemetry;

pub use cli::Args;
pub use settings::{Settings, SettingsError};
