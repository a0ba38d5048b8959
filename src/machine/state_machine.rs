//! Thread-safe state machine with vetoable transitions.

use crate::builder::{MachineConfig, StateMachineBuilder};
use crate::core::{check_transition, GuardPolicy, State, StateRef};
use crate::machine::error::MachineError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use uuid::Uuid;

/// The active state together with the moment its `enter` hook completed.
struct Active {
    state: StateRef,
    since: DateTime<Utc>,
    /// Set when the state's `exit` returned but the following `enter` unwound.
    exited: bool,
}

/// Records how far an in-flight transition got if a predicate or hook unwinds.
struct HookProgress<'a> {
    machine: &'a StateMachine,
    source_exited: bool,
    settled: bool,
}

impl Drop for HookProgress<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.machine.poisoned.store(true, Ordering::SeqCst);
        if self.source_exited {
            self.machine.write_active().exited = true;
        }
    }
}

/// State machine holding exactly one fully-entered active state.
///
/// Transitions are serialized by a single lock held across both predicates
/// and both hooks. The active reference is swapped only after the outgoing
/// state's `exit` and the incoming state's `enter` have returned, so callers
/// never observe a half-transitioned machine.
///
/// Share it across threads with `Arc<StateMachine>`.
///
/// # Hook panics
///
/// Hooks are infallible; a failing hook panics. The panic unwinds out of
/// [`transition`](Self::transition), the transition lock is released and the
/// active reference stays at the source, because reassignment happens only
/// after both hooks return. [`is_poisoned`](Self::is_poisoned) turns true as
/// soon as the panic unwinds.
///
/// If the source's `exit` had already returned when the destination's `enter`
/// panicked, the machine remembers it. The next successful transition away
/// from the source skips its `exit`, so each hook still completes at most
/// once per activation. An `exit` that itself panicked did not complete and
/// is called again on the next transition.
///
/// # Example
///
/// ```rust
/// use lockstep::{unit_state, StateMachine};
/// use std::sync::Arc;
///
/// unit_state! {
///     struct Idle;
///     struct Running;
/// }
///
/// let idle = Arc::new(Idle);
/// let running = Arc::new(Running);
///
/// let machine = StateMachine::new(idle.clone()).unwrap();
/// machine.transition(running.clone()).unwrap();
///
/// assert!(machine.is_active(&running));
/// assert_eq!(machine.active_state().name(), "Running");
/// ```
pub struct StateMachine {
    id: Uuid,
    name: String,
    guard_policy: GuardPolicy,
    active: RwLock<Active>,
    transition_lock: Mutex<()>,
    poisoned: AtomicBool,
}

impl StateMachine {
    /// Construct a machine in `initial` with the default configuration.
    ///
    /// The initial state must allow entering itself. Its `enter` hook is
    /// called before the machine is returned.
    pub fn new(initial: StateRef) -> Result<Self, MachineError> {
        StateMachineBuilder::new().initial(initial).build()
    }

    /// Create a builder for configuring a machine.
    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::new()
    }

    pub(crate) fn construct(
        initial: Option<StateRef>,
        config: MachineConfig,
    ) -> Result<Self, MachineError> {
        let initial = initial.ok_or(MachineError::NilInitialState)?;

        if !initial.enter_allowed(initial.as_ref()) {
            return Err(MachineError::UnusableInitialState {
                state: initial.name().to_string(),
            });
        }
        initial.enter();

        let machine = Self {
            id: Uuid::new_v4(),
            name: config.name,
            guard_policy: config.guard_policy,
            active: RwLock::new(Active {
                state: initial,
                since: Utc::now(),
                exited: false,
            }),
            transition_lock: Mutex::new(()),
            poisoned: AtomicBool::new(false),
        };

        tracing::debug!(
            machine = %machine.name,
            id = %machine.id,
            state = machine.read_active().state.name(),
            "state machine constructed"
        );

        Ok(machine)
    }

    /// Unique identifier of this machine instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Configured name, used in log records.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Order in which the exit and enter predicates are consulted.
    pub fn guard_policy(&self) -> GuardPolicy {
        self.guard_policy
    }

    /// Get the active state.
    ///
    /// Never blocks on an in-flight transition's hooks, so it is safe to call
    /// from inside a hook or predicate. A caller racing a transition sees
    /// either the old or the new state.
    pub fn active_state(&self) -> StateRef {
        Arc::clone(&self.read_active().state)
    }

    /// When the active state's `enter` hook completed.
    pub fn active_since(&self) -> DateTime<Utc> {
        self.read_active().since
    }

    /// Check whether `state` is the active state, by identity.
    pub fn is_active<T: State + ?Sized>(&self, state: &Arc<T>) -> bool {
        let active = self.active_state();
        Arc::as_ptr(&active).cast::<()>() == Arc::as_ptr(state).cast::<()>()
    }

    /// True once a predicate or hook has panicked during any transition.
    ///
    /// Set while the panic unwinds out of [`transition`](Self::transition)
    /// and never cleared.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// Attempt to transition to `destination`.
    ///
    /// The active state is asked whether it may exit, and `destination`
    /// whether it may be entered. If either refuses, returns
    /// [`MachineError::TransitionDenied`] and no hook is called. Otherwise
    /// the active state's `exit` runs to completion, then `destination`'s
    /// `enter`, and only then does `destination` become active.
    ///
    /// Transitioning to the already-active state is allowed when both
    /// predicates agree; it exits and re-enters the same state.
    ///
    /// If the active state already exited during a transition whose `enter`
    /// panicked, its `exit` is not called again.
    ///
    /// Blocks while another transition on this machine is in flight. Calling
    /// this from a hook of the same machine deadlocks.
    pub fn transition(&self, destination: StateRef) -> Result<(), MachineError> {
        let _guard = self.lock_transitions();
        let (current, already_exited) = {
            let active = self.read_active();
            (Arc::clone(&active.state), active.exited)
        };
        let mut progress = HookProgress {
            machine: self,
            source_exited: already_exited,
            settled: false,
        };

        if let Err(veto) =
            check_transition(self.guard_policy, current.as_ref(), destination.as_ref())
        {
            tracing::trace!(
                machine = %self.name,
                id = %self.id,
                from = current.name(),
                to = destination.name(),
                %veto,
                "transition denied"
            );
            progress.settled = true;
            return Err(MachineError::TransitionDenied {
                from: current.name().to_string(),
                to: destination.name().to_string(),
                veto,
            });
        }

        if !already_exited {
            current.exit();
            progress.source_exited = true;
        }
        destination.enter();

        tracing::debug!(
            machine = %self.name,
            id = %self.id,
            from = current.name(),
            to = destination.name(),
            "transition committed"
        );

        *self.write_active() = Active {
            state: destination,
            since: Utc::now(),
            exited: false,
        };
        progress.settled = true;
        Ok(())
    }

    fn read_active(&self) -> RwLockReadGuard<'_, Active> {
        self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_active(&self) -> RwLockWriteGuard<'_, Active> {
        self.active.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transition_lock.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(
                machine = %self.name,
                id = %self.id,
                "a previous transition panicked; active state was left unchanged"
            );
            self.transition_lock.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.read_active();
        f.debug_struct("StateMachine")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("guard_policy", &self.guard_policy)
            .field("active_state", &active.state.name())
            .field("active_since", &active.since)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EmptyState, Veto};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;

    type Log = Arc<Mutex<Vec<String>>>;

    /// State with fixed predicate answers that logs and counts its hooks.
    struct Recorder {
        label: &'static str,
        allow_enter: bool,
        allow_exit: bool,
        log: Log,
        entered: AtomicUsize,
        exited: AtomicUsize,
    }

    impl Recorder {
        fn new(label: &'static str, allow_enter: bool, allow_exit: bool, log: &Log) -> Arc<Self> {
            Arc::new(Self {
                label,
                allow_enter,
                allow_exit,
                log: Arc::clone(log),
                entered: AtomicUsize::new(0),
                exited: AtomicUsize::new(0),
            })
        }

        fn entered(&self) -> usize {
            self.entered.load(Ordering::SeqCst)
        }

        fn exited(&self) -> usize {
            self.exited.load(Ordering::SeqCst)
        }
    }

    impl State for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn enter_allowed(&self, _source: &dyn State) -> bool {
            self.allow_enter
        }

        fn exit_allowed(&self, _destination: &dyn State) -> bool {
            self.allow_exit
        }

        fn enter(&self) {
            self.entered.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("enter {}", self.label));
        }

        fn exit(&self) {
            self.exited.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("exit {}", self.label));
        }
    }

    struct PanicsOnExit;

    impl State for PanicsOnExit {
        fn exit(&self) {
            panic!("exit hook failed");
        }
    }

    struct PanicsOnEnter;

    impl State for PanicsOnEnter {
        fn enter(&self) {
            panic!("enter hook failed");
        }
    }

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn new_with_unusable_state_fails_without_entering() {
        let log = new_log();
        let locked = Recorder::new("Locked", false, true, &log);

        let result = StateMachine::new(locked.clone());

        assert!(matches!(
            result,
            Err(MachineError::UnusableInitialState { ref state }) if state == "Locked"
        ));
        assert_eq!(locked.entered(), 0);
    }

    #[test]
    fn new_enters_initial_state_once() {
        let log = new_log();
        let idle = Recorder::new("Idle", true, true, &log);

        let machine = StateMachine::new(idle.clone()).unwrap();

        assert!(machine.is_active(&idle));
        assert_eq!(idle.entered(), 1);
        assert_eq!(idle.exited(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["enter Idle"]);
    }

    #[test]
    fn exit_refusal_denies_transition() {
        let log = new_log();
        let source = Recorder::new("Source", true, false, &log);
        let destination = Recorder::new("Destination", true, true, &log);
        let machine = StateMachine::new(source.clone()).unwrap();

        let result = machine.transition(destination.clone());

        assert_eq!(
            result,
            Err(MachineError::TransitionDenied {
                from: "Source".to_string(),
                to: "Destination".to_string(),
                veto: Veto::Source,
            })
        );
        assert!(machine.is_active(&source));
        assert_eq!(destination.entered(), 0);
        assert_eq!(source.exited(), 0);
    }

    #[test]
    fn enter_refusal_denies_transition() {
        let log = new_log();
        let source = Recorder::new("Source", true, true, &log);
        let destination = Recorder::new("Destination", false, true, &log);
        let machine = StateMachine::new(source.clone()).unwrap();

        let result = machine.transition(destination.clone());

        assert!(matches!(
            result,
            Err(MachineError::TransitionDenied {
                veto: Veto::Destination,
                ..
            })
        ));
        assert!(machine.is_active(&source));
        assert_eq!(source.exited(), 0);
        assert_eq!(destination.entered(), 0);
    }

    #[test]
    fn allowed_transition_exits_then_enters() {
        let log = new_log();
        let source = Recorder::new("Source", true, true, &log);
        let destination = Recorder::new("Destination", true, true, &log);
        let machine = StateMachine::new(source.clone()).unwrap();

        machine.transition(destination.clone()).unwrap();

        assert!(machine.is_active(&destination));
        assert!(!machine.is_active(&source));
        assert_eq!(source.exited(), 1);
        assert_eq!(destination.entered(), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter Source", "exit Source", "enter Destination"]
        );
    }

    #[test]
    fn self_transition_exits_and_reenters() {
        let log = new_log();
        let state = Recorder::new("Loop", true, true, &log);
        let machine = StateMachine::new(state.clone()).unwrap();

        machine.transition(state.clone()).unwrap();

        assert!(machine.is_active(&state));
        assert_eq!(state.entered(), 2);
        assert_eq!(state.exited(), 1);
    }

    #[test]
    fn active_since_advances_on_transition() {
        let machine = StateMachine::new(Arc::new(EmptyState)).unwrap();
        let first = machine.active_since();

        std::thread::sleep(std::time::Duration::from_millis(5));
        machine.transition(Arc::new(EmptyState)).unwrap();

        assert!(machine.active_since() > first);
    }

    #[test]
    fn denied_transition_keeps_active_since() {
        let log = new_log();
        let machine = StateMachine::new(Arc::new(EmptyState)).unwrap();
        let since = machine.active_since();

        let refusing = Recorder::new("Refusing", false, true, &log);
        assert!(machine.transition(refusing).is_err());

        assert_eq!(machine.active_since(), since);
    }

    #[test]
    fn is_active_distinguishes_equal_unit_states() {
        let a = Arc::new(EmptyState);
        let b = Arc::new(EmptyState);
        let machine = StateMachine::new(a.clone()).unwrap();

        assert!(machine.is_active(&a));
        assert!(!machine.is_active(&b));
    }

    #[test]
    fn panicking_exit_leaves_source_active() {
        let source = Arc::new(PanicsOnExit);
        let log = new_log();
        let destination = Recorder::new("Destination", true, true, &log);
        let machine = StateMachine::new(source.clone()).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            machine.transition(destination.clone())
        }));

        assert!(result.is_err());
        assert!(machine.is_active(&source));
        assert_eq!(destination.entered(), 0);
    }

    #[test]
    fn panicking_enter_leaves_source_active_and_machine_usable() {
        let log = new_log();
        let source = Recorder::new("Source", true, true, &log);
        let machine = StateMachine::new(source.clone()).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            machine.transition(Arc::new(PanicsOnEnter))
        }));

        assert!(result.is_err());
        assert!(machine.is_active(&source));
        assert_eq!(source.exited(), 1);
        assert!(machine.is_poisoned());

        let next = Recorder::new("Next", true, true, &log);
        machine.transition(next.clone()).unwrap();

        assert!(machine.is_poisoned());
        assert!(machine.is_active(&next));
        assert_eq!(next.entered(), 1);
    }

    #[test]
    fn source_exits_once_when_enter_panics() {
        let log = new_log();
        let source = Recorder::new("Source", true, true, &log);
        let machine = StateMachine::new(source.clone()).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            machine.transition(Arc::new(PanicsOnEnter))
        }));
        assert!(result.is_err());

        let next = Recorder::new("Next", true, true, &log);
        machine.transition(next.clone()).unwrap();

        assert_eq!(source.entered(), 1);
        assert_eq!(source.exited(), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter Source", "exit Source", "enter Next"]
        );

        // The next activation is tracked afresh.
        machine.transition(source.clone()).unwrap();
        machine.transition(next.clone()).unwrap();
        assert_eq!(source.exited(), 2);
        assert_eq!(next.exited(), 1);
    }

    #[test]
    fn is_poisoned_is_set_as_soon_as_a_hook_panics() {
        let machine = StateMachine::new(Arc::new(PanicsOnExit)).unwrap();
        assert!(!machine.is_poisoned());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            machine.transition(Arc::new(EmptyState))
        }));

        assert!(result.is_err());
        assert!(machine.is_poisoned());
    }

    #[test]
    fn denied_transition_does_not_poison() {
        let log = new_log();
        let machine = StateMachine::new(Arc::new(EmptyState)).unwrap();

        let refusing = Recorder::new("Refusing", false, true, &log);
        assert!(machine.transition(refusing).is_err());

        assert!(!machine.is_poisoned());
    }

    #[test]
    fn debug_shows_active_state_name() {
        let machine = StateMachine::new(Arc::new(EmptyState)).unwrap();
        let debug = format!("{machine:?}");
        assert!(debug.contains("EmptyState"));
        assert!(debug.contains("state_machine"));
    }
}
