pub mod comm;
pub mod config;
pub mod history;
pub mod parser;
pub mod state;
pub mod supervisor;
pub mod telemetry;

pub use config::LaunchConfig;
pub use history::{load_history, HistoryPersister};
pub use supervisor::{ProcessSupervisor, SupervisorError, SupervisorOptions};
pub use telemetry::TelemetrySampler;
