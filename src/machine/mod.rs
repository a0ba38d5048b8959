//! The state machine and its errors.
//!
//! A [`StateMachine`] owns a reference to one active state and serializes all
//! transitions through a single lock. It delegates every decision to the
//! states involved via the [`State`](crate::core::State) capability.

mod error;
mod state_machine;

pub use error::MachineError;
pub use state_machine::StateMachine;
