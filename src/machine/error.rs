//! Errors returned by state machine construction and transitions.

use crate::core::Veto;
use thiserror::Error;

/// Errors that can occur when building or driving a state machine.
///
/// None of these are fatal. A failed construction produces no machine, and a
/// denied transition leaves the machine in its prior state with no hooks run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("An initial state must be given")]
    NilInitialState,

    #[error("The initial state '{state}' did not allow an Enter transition")]
    UnusableInitialState { state: String },

    #[error("Transition from '{from}' to '{to}' was denied by {veto}")]
    TransitionDenied { from: String, to: String, veto: Veto },
}
