use serde::{Deserialize, Serialize};

/// Where [`TelemetrySample::estimated_tps`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TpsSource {
    /// averaged from TPS figures the server printed to its console
    Measured,
    /// derived from host load and player count
    #[default]
    Estimated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub cpu_percent: f64,
    pub process_cpu_percent: f64,
    pub process_memory_mb: f64,
    pub system_memory_percent: f64,
    pub estimated_tps: f64,
    pub tps_source: TpsSource,
    pub player_count: usize,
    pub uptime_seconds: u64,
    pub running: bool,
}
