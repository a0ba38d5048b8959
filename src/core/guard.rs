//! Transition predicate evaluation.
//!
//! A transition proceeds only when the active state allows leaving and the
//! destination allows entering. Evaluation is a pure function of the two
//! states and the configured [`GuardPolicy`].

use super::state::State;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order in which the exit and enter predicates are consulted.
///
/// Both policies reach the same verdict when predicates are pure. They differ
/// only in whether the destination is asked after the source has refused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Skip `enter_allowed` once `exit_allowed` has refused.
    #[default]
    ShortCircuit,

    /// Always ask both states, even after a refusal.
    EvaluateBoth,
}

/// Which side refused a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Veto {
    /// The active state refused to exit.
    Source,
    /// The destination refused to be entered.
    Destination,
    /// Both refused. Only reported under [`GuardPolicy::EvaluateBoth`].
    Both,
}

impl fmt::Display for Veto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Source => "source",
            Self::Destination => "destination",
            Self::Both => "source and destination",
        };
        f.write_str(s)
    }
}

/// Evaluate whether `current` may hand over to `destination`.
///
/// Returns `Ok(())` when both predicates allow the transition, otherwise the
/// side(s) that refused.
///
/// # Example
///
/// ```rust
/// use lockstep::core::{check_transition, EmptyState, GuardPolicy, State, Veto};
///
/// struct Sealed;
///
/// impl State for Sealed {
///     fn exit_allowed(&self, _destination: &dyn State) -> bool {
///         false
///     }
/// }
///
/// let policy = GuardPolicy::ShortCircuit;
/// assert_eq!(check_transition(policy, &EmptyState, &Sealed), Ok(()));
/// assert_eq!(check_transition(policy, &Sealed, &EmptyState), Err(Veto::Source));
/// ```
pub fn check_transition(
    policy: GuardPolicy,
    current: &dyn State,
    destination: &dyn State,
) -> Result<(), Veto> {
    let exit_ok = current.exit_allowed(destination);
    let enter_ok = match policy {
        GuardPolicy::ShortCircuit if !exit_ok => return Err(Veto::Source),
        _ => destination.enter_allowed(current),
    };

    match (exit_ok, enter_ok) {
        (true, true) => Ok(()),
        (false, true) => Err(Veto::Source),
        (true, false) => Err(Veto::Destination),
        (false, false) => Err(Veto::Both),
    }
}
