//! Built-in handlers

pub mod file;
pub mod null;
pub mod queue;
pub mod rotating_file;
pub mod stream;

pub use file::{FileHandler, FileMode};
pub use null::NullHandler;
pub use queue::{QueueHandler, DEFAULT_SHUTDOWN_TIMEOUT};
pub use rotating_file::{RotatingFileHandler, RotationPolicy};
pub use stream::{StreamHandler, StreamTarget};
