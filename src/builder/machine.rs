//! Builder for constructing state machines.

use crate::builder::config::MachineConfig;
use crate::core::{GuardPolicy, StateRef};
use crate::machine::{MachineError, StateMachine};

/// Builder for constructing state machines with a fluent API.
#[derive(Default)]
pub struct StateMachineBuilder {
    initial: Option<StateRef>,
    config: MachineConfig,
}

impl StateMachineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: StateRef) -> Self {
        self.initial = Some(state);
        self
    }

    /// Name the machine for log records.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Choose whether the destination is asked after the source refuses.
    pub fn guard_policy(mut self, policy: GuardPolicy) -> Self {
        self.config.guard_policy = policy;
        self
    }

    /// Replace all settings with a loaded configuration.
    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the state machine.
    ///
    /// Fails with [`MachineError::NilInitialState`] if no initial state was
    /// given, or [`MachineError::UnusableInitialState`] if it refuses to
    /// enter itself. On success the initial state's `enter` hook has run.
    pub fn build(self) -> Result<StateMachine, MachineError> {
        StateMachine::construct(self.initial, self.config)
    }
}
