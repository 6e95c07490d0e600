use crate::sink::LineSink;
use std::error::Error;
use std::io::Write;

/// Sink that appends each line to standard output.
///
/// The stdout handle is locked for the duration of one line, so lines
/// written by concurrent loggers sharing this sink never interleave
/// mid-line.
#[derive(Clone, Copy, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut out = std::io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    }
}
