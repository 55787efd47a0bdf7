mod config;
mod performance;
mod report;
mod status;

pub use config::*;
pub use performance::*;
pub use report::*;
pub use status::*;
