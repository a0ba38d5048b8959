//! Core state types and transition predicates.
//!
//! This module contains the capability the machine consumes:
//! - The `State` trait with its enter/exit predicates and hooks
//! - Guard evaluation deciding whether a transition may proceed
//! - The `unit_state!` macro for declaring trivial states
//!
//! Nothing in this module holds locks or mutable machine state.

mod guard;
mod macros;
mod state;

pub use guard::{check_transition, GuardPolicy, Veto};
pub use state::{EmptyState, State, StateRef};
