//! Lockstep: a minimal thread-safe state machine
//!
//! A [`StateMachine`] holds exactly one active state and moves between states
//! through synchronous transitions that either side may veto. There is no
//! transition table: each state decides at call time whether it may be
//! entered from, or exited to, another state.
//!
//! # Core Concepts
//!
//! - **State**: Enter/exit predicates and hooks via the `State` trait
//! - **Transition**: Exit the active state, enter the destination, then swap
//! - **Guards**: Pure predicates evaluated under a configurable policy
//!
//! Timers, schedulers and concrete states belong to the surrounding
//! application, which calls [`StateMachine::transition`] whenever it decides
//! a change is due.
//!
//! # Example
//!
//! ```rust
//! use lockstep::core::State;
//! use lockstep::{MachineError, StateMachine};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Idle;
//!
//! impl State for Idle {}
//!
//! #[derive(Default)]
//! struct Running {
//!     ready: AtomicBool,
//! }
//!
//! impl State for Running {
//!     fn enter_allowed(&self, _source: &dyn State) -> bool {
//!         self.ready.load(Ordering::SeqCst)
//!     }
//! }
//!
//! let idle = Arc::new(Idle);
//! let running = Arc::new(Running::default());
//! let machine = StateMachine::new(idle.clone()).unwrap();
//!
//! let denied = machine.transition(running.clone());
//! assert!(matches!(denied, Err(MachineError::TransitionDenied { .. })));
//! assert!(machine.is_active(&idle));
//!
//! running.ready.store(true, Ordering::SeqCst);
//! machine.transition(running.clone()).unwrap();
//! assert!(machine.is_active(&running));
//! ```

pub mod builder;
pub mod core;
pub mod machine;

// Re-export commonly used types
pub use builder::{MachineConfig, StateMachineBuilder};
pub use crate::core::{EmptyState, GuardPolicy, State, StateRef, Veto};
pub use machine::{MachineError, StateMachine};
