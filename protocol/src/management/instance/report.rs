use crate::management::instance::performance::TelemetrySample;
use crate::management::instance::status::InstanceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the single supervised server process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInstance {
    pub status: InstanceStatus,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub command_line: Vec<String>,
}

/// Answer to a status query: the instance, its latest sample and who is online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub instance: ServerInstance,
    pub performance: Option<TelemetrySample>,
    /// sorted by name
    pub players: Vec<String>,
    pub max_players: u32,
}

impl ServerInstance {
    pub fn uptime_seconds(&self, now: DateTime<Utc>) -> u64 {
        match (self.status.is_running(), self.started_at) {
            (true, Some(started_at)) => (now - started_at).num_seconds().max(0) as u64,
            _ => 0,
        }
    }
}
