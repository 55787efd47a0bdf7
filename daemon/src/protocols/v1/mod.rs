mod protocol;

pub use protocol::ProtocolV1;
