use std::error::Error;

/// Destination for serialized log lines produced by the logger.
///
/// Implementations append one already-serialized JSON line per call to a
/// concrete destination (stdout, a file, an in-memory buffer, etc). The
/// logger calls `write_line` synchronously on the caller's thread and does
/// not retry or buffer on failure.
///
/// Implementations must preserve call order, and when shared between
/// threads must not interleave two lines within one another. The logger
/// itself holds no locks; serializing concurrent writes is entirely the
/// sink's job.
pub trait LineSink: Send + Sync {
    /// Append `line` plus the sink's line terminator to the destination.
    ///
    /// **Returns**
    /// - `Ok(())` if the full line was written.
    /// - `Err(..)` if the destination failed; the error is surfaced to the
    ///   logging call site as a [`SinkWriteError`].
    fn write_line(&self, line: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Failure reported by the output sink for a single line.
#[derive(thiserror::Error, Debug)]
#[error("failed to write log line to sink: {0}")]
pub struct SinkWriteError(#[source] pub Box<dyn Error + Send + Sync>);
