pub use broadcaster::*;

mod broadcaster;
pub mod status;
