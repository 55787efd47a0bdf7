mod actions;
pub mod retcode;
pub mod status;

pub use actions::*;
