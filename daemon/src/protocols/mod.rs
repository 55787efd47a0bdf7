mod protocol;
pub mod v1;

pub use protocol::Protocol;
