pub mod management;
pub mod user;
#[cfg(feature = "v1")]
pub mod v1;
