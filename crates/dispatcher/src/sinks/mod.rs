//! Sink implementations
//!
//! Contains LogSink, ConsoleSink, FileSink, and NetworkSink.

mod console;
mod file;
mod log;
mod network;

pub use self::console::ConsoleSink;
pub use self::file::{FileFormat, FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};
