mod accounts;
mod config;
mod gate;
mod jwt;
mod password;

pub use accounts::AccountPaths;
pub use config::AuthConfig;
pub use gate::*;
