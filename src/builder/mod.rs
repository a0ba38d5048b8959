//! Builder API and configuration for state machines.
//!
//! [`StateMachineBuilder`] collects the initial state and settings, and
//! [`MachineConfig`] carries the settings in a serde-friendly form so host
//! applications can keep them alongside their own configuration.

pub mod config;
pub mod machine;

pub use config::{MachineConfig, DEFAULT_MACHINE_NAME};
pub use machine::StateMachineBuilder;
