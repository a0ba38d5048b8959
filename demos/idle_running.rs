//! Idle / Running State Machine
//!
//! This example shows a state that schedules its own exit.
//!
//! Key concepts:
//! - States veto transitions from their own predicates
//! - Timers live in the application, not in the machine
//! - A background task calls `transition` when the run is over
//!
//! Run with: cargo run --example idle_running

use lockstep::core::{State, StateRef};
use lockstep::StateMachine;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

const RUNNING_STATE_TIME: Duration = Duration::from_secs(2);

struct IdleState;

impl State for IdleState {
    fn name(&self) -> &str {
        "Idle"
    }

    fn enter(&self) {
        tracing::info!("Entered idle");
    }

    fn exit(&self) {
        tracing::info!("Exited idle");
    }
}

struct RunningState {
    entered: Mutex<Option<Instant>>,
    machine: OnceLock<Weak<StateMachine>>,
    idle: StateRef,
    runtime: Handle,
}

impl RunningState {
    fn run_completed(&self) -> bool {
        match *self.entered.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(at) => at.elapsed() >= RUNNING_STATE_TIME,
            None => true,
        }
    }
}

impl State for RunningState {
    fn name(&self) -> &str {
        "Running"
    }

    fn enter_allowed(&self, _source: &dyn State) -> bool {
        self.run_completed()
    }

    fn exit_allowed(&self, _destination: &dyn State) -> bool {
        self.run_completed()
    }

    fn enter(&self) {
        *self.entered.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        // The hook holds the machine's lock, so the return to idle has to
        // happen from a separate task.
        let machine = self.machine.get().cloned();
        let idle = Arc::clone(&self.idle);
        self.runtime.spawn(async move {
            tokio::time::sleep(RUNNING_STATE_TIME).await;
            let Some(machine) = machine.and_then(|m| m.upgrade()) else {
                return;
            };
            // `transition` waits on a std mutex and runs hooks synchronously.
            let returned =
                tokio::task::spawn_blocking(move || machine.transition(idle)).await;
            match returned {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(%err, "Couldn't return to idle"),
                Err(err) => tracing::error!(%err, "Return to idle panicked"),
            }
        });

        tracing::info!("Started running");
    }

    fn exit(&self) {
        tracing::info!("Done running");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lockstep=debug")),
        )
        .init();

    println!("=== Idle / Running State Machine ===\n");

    let idle: StateRef = Arc::new(IdleState);
    let running = Arc::new(RunningState {
        entered: Mutex::new(None),
        machine: OnceLock::new(),
        idle: Arc::clone(&idle),
        runtime: Handle::current(),
    });

    let machine = match StateMachine::builder().initial(idle).name("demo").build() {
        Ok(machine) => Arc::new(machine),
        Err(err) => {
            tracing::error!(%err, "Couldn't set up state machine");
            return;
        }
    };
    let _ = running.machine.set(Arc::downgrade(&machine));

    if let Err(err) = machine.transition(running.clone()) {
        tracing::warn!(%err, "Couldn't transition to running");
    }

    // A second request while the run is in progress is vetoed.
    if let Err(err) = machine.transition(running.clone()) {
        tracing::info!(%err, "Running refused to restart early");
    }

    tokio::time::sleep(RUNNING_STATE_TIME + Duration::from_millis(250)).await;
    println!("\nActive state: {}", machine.active_state().name());

    println!("\n=== Example Complete ===");
}
