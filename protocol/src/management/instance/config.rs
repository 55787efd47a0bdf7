use serde::{Deserialize, Serialize};

/// Launch settings of the managed server, as persisted and edited remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub server_jar_path: String,
    pub java_path: String,
    pub min_memory: String,
    pub max_memory: String,
    pub port: u16,
    /// player slots, echoed in status reports
    pub max_players: u32,
    pub additional_args: String,
    pub use_optimized_flags: bool,
    pub auto_start: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            server_jar_path: String::new(),
            java_path: "java".to_string(),
            min_memory: "1G".to_string(),
            max_memory: "2G".to_string(),
            port: 25565,
            max_players: 20,
            additional_args: String::new(),
            use_optimized_flags: false,
            auto_start: false,
        }
    }
}
