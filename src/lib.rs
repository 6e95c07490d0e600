pub mod level;
pub mod normalize;
pub mod logger;

pub mod clock;
pub mod sink;
pub mod stdout_sink;
pub mod memory_sink;

pub use level::Level;
pub use logger::{Logger, LoggerConfig};
