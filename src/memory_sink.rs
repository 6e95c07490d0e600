use crate::sink::LineSink;
use std::error::Error;
use std::sync::Mutex;

/// Sink that captures every line in memory.
///
/// Useful for asserting on emitted records in tests, and for demos that
/// want to inspect output without parsing stdout.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines written so far, in write order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("memory sink lock poisoned").clone()
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.lines
            .lock()
            .expect("memory sink lock poisoned")
            .push(line.to_string());
        Ok(())
    }
}
