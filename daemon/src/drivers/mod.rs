mod driver;
mod graceful_shutdown;
pub mod websocket;

pub use driver::Driver;
pub use graceful_shutdown::GracefulShutdown;
