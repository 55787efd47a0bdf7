use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Starting,
    Running,
    Stopping,
    #[default]
    Stopped,
    Crashed,
}

impl InstanceStatus {
    /// Whether a new child process may be launched from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, InstanceStatus::Stopped | InstanceStatus::Crashed)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstanceStatus::Running)
    }
}
