//! The State capability consumed by the state machine.
//!
//! A state is any value that can veto transitions into and out of itself and
//! be notified when it becomes active or inactive. The machine never owns
//! states beyond holding a shared reference to the active one.

use std::sync::Arc;

/// Shared handle to a state, as held by the machine and its callers.
pub type StateRef = Arc<dyn State>;

/// Trait for state machine states.
///
/// Every method has a default: both predicates allow, both hooks do nothing.
/// A custom state overrides only the callbacks it cares about.
///
/// Predicates must be pure. They may be evaluated without the transition
/// being committed. Hooks are called synchronously while the machine's
/// transition lock is held, so they must return promptly and must not call
/// [`StateMachine::transition`](crate::StateMachine::transition) on the same
/// machine.
///
/// Hooks take `&self`. States that record data on entry (a timestamp, a
/// counter) keep it behind interior mutability.
///
/// # Example
///
/// ```rust
/// use lockstep::core::State;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Door {
///     locked: AtomicBool,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         "Door"
///     }
///
///     fn exit_allowed(&self, _destination: &dyn State) -> bool {
///         !self.locked.load(Ordering::SeqCst)
///     }
/// }
///
/// let door = Door::default();
/// assert!(door.enter_allowed(&door));
/// door.locked.store(true, Ordering::SeqCst);
/// assert!(!door.exit_allowed(&door));
/// ```
pub trait State: Send + Sync {
    /// Name used in log records and error messages.
    ///
    /// Defaults to the implementing type's name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Return true if the machine may transition into this state.
    ///
    /// `source` is the currently active state. When a machine is constructed,
    /// the initial state is asked about entering itself.
    fn enter_allowed(&self, _source: &dyn State) -> bool {
        true
    }

    /// Return true if the machine may transition away from this state to
    /// `destination`.
    fn exit_allowed(&self, _destination: &dyn State) -> bool {
        true
    }

    /// Called once when this state becomes active.
    fn enter(&self) {}

    /// Called once when this state stops being active.
    fn exit(&self) {}
}

/// A state that allows every transition and does nothing on enter or exit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmptyState;

impl State for EmptyState {
    fn name(&self) -> &str {
        "EmptyState"
    }
}
