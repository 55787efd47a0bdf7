pub mod console;
pub mod instance;
