//! Serializable machine configuration.

use crate::core::GuardPolicy;
use serde::{Deserialize, Serialize};

/// Name given to machines that are not explicitly named.
pub const DEFAULT_MACHINE_NAME: &str = "state_machine";

/// Settings a host application may load from its own config file.
///
/// Missing fields take their defaults, so an empty object is valid.
///
/// # Example
///
/// ```rust
/// use lockstep::builder::MachineConfig;
/// use lockstep::core::GuardPolicy;
///
/// let config: MachineConfig =
///     serde_json::from_str(r#"{ "name": "pump", "guard_policy": "evaluate_both" }"#).unwrap();
///
/// assert_eq!(config.name, "pump");
/// assert_eq!(config.guard_policy, GuardPolicy::EvaluateBoth);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Name recorded in every log line the machine emits
    pub name: String,
    /// Whether to consult the destination after the source has refused
    pub guard_policy: GuardPolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MACHINE_NAME.to_string(),
            guard_policy: GuardPolicy::default(),
        }
    }
}
