use crate::clock::{Clock, SystemClock};
use crate::level::Level;
use crate::normalize::{normalize, KeyFormatError};
use crate::sink::{LineSink, SinkWriteError};
use crate::stdout_sink::StdoutSink;
use chrono::SecondsFormat;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// Invalid logger configuration; logger construction fails and the caller
/// must fix the configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("configuration must have a non-empty service name")]
    BlankService,
}

/// Malformed log event passed to a leveled call. Raised before anything is
/// serialized, so no partial line is ever written.
#[derive(thiserror::Error, Debug)]
pub enum InvalidEventError {
    #[error("log event must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("log event must have a 'message' property")]
    MissingMessage,

    #[error("the 'message' property of a log event must be a string")]
    MessageNotAString,

    #[error("the 'message' property of a log event must not be blank")]
    BlankMessage,
}

/// Everything that can fail during one logging call. All variants surface
/// synchronously at the call site; nothing is swallowed or queued.
#[derive(thiserror::Error, Debug)]
pub enum EmitError {
    #[error(transparent)]
    InvalidEvent(#[from] InvalidEventError),

    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Sink(#[from] SinkWriteError),
}

/// Detail capability consumed by [`Logger::error_with`].
///
/// Concrete error types expose a description and a stack trace through this
/// interface instead of being inspected structurally at the call site.
pub trait ErrorDetails {
    /// Human-readable description, emitted as `error_name`.
    fn description(&self) -> String;

    /// Stack-trace lines, emitted as `backtrace`. Empty by default.
    fn stack_trace(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Adapter exposing any [`std::error::Error`] as [`ErrorDetails`], using
/// `to_string` for the description and the `source` chain as the trace.
pub struct CapturedError {
    description: String,
    chain: Vec<String>,
}

impl CapturedError {
    pub fn from_std(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut cause = err.source();
        while let Some(current) = cause {
            chain.push(current.to_string());
            cause = current.source();
        }
        CapturedError {
            description: err.to_string(),
            chain,
        }
    }
}

impl ErrorDetails for CapturedError {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn stack_trace(&self) -> Vec<String> {
        self.chain.clone()
    }
}

/// Configuration consumed by [`Logger::new`].
///
/// Only the service name is required. The clock defaults to wall-clock UTC
/// and the output to standard output.
pub struct LoggerConfig {
    /// Logical service name, emitted as `service.name` in every record.
    pub service: String,
    /// Clock used for `@timestamp`.
    pub clock: Option<Arc<dyn Clock>>,
    /// Line sink the serialized records are written to.
    pub output: Option<Arc<dyn LineSink>>,
}

impl LoggerConfig {
    pub fn new(service: impl Into<String>) -> Self {
        LoggerConfig {
            service: service.into(),
            clock: None,
            output: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_output(mut self, output: Arc<dyn LineSink>) -> Self {
        self.output = Some(output);
        self
    }
}

/// Structured logger emitting one common-schema JSON record per line.
///
/// Each leveled call assembles a record from three layers, in ascending
/// precedence: the fixed header (`service.name`, `@timestamp`, `log.level`),
/// the scoped properties bound via [`Logger::with`], and the call-site
/// event. Dotted and nested field names are folded into one nested tree by
/// [`normalize`] before serialization.
///
/// The logger holds no mutable state after construction, so it can be
/// cloned and shared freely; concurrent writes are serialized by the sink.
#[derive(Clone)]
pub struct Logger {
    service: String,
    clock: Arc<dyn Clock>,
    output: Arc<dyn LineSink>,
    scoped: Map<String, Value>,
}

impl Logger {
    /// Build a logger from `config`.
    ///
    /// **Errors**
    /// - [`ConfigurationError::BlankService`] if the service name trims to
    ///   empty.
    pub fn new(config: LoggerConfig) -> Result<Self, ConfigurationError> {
        if config.service.trim().is_empty() {
            return Err(ConfigurationError::BlankService);
        }
        Ok(Logger {
            service: config.service,
            clock: config.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            output: config.output.unwrap_or_else(|| Arc::new(StdoutSink)),
            scoped: Map::new(),
        })
    }

    /// Derive a logger whose every event includes the fields of `scope`.
    ///
    /// The receiver is untouched. The new instance shares the service name,
    /// clock and output; `scope` replaces any prior scope rather than
    /// extending it.
    ///
    /// **Errors**
    /// - [`InvalidEventError::NotAnObject`] if `scope` is not a JSON object.
    pub fn with(&self, scope: Value) -> Result<Self, InvalidEventError> {
        Ok(Logger {
            service: self.service.clone(),
            clock: Arc::clone(&self.clock),
            output: Arc::clone(&self.output),
            scoped: into_object(scope)?,
        })
    }

    pub fn debug(&self, event: Value) -> Result<(), EmitError> {
        self.log(Level::Debug, event)
    }

    pub fn info(&self, event: Value) -> Result<(), EmitError> {
        self.log(Level::Info, event)
    }

    pub fn warning(&self, event: Value) -> Result<(), EmitError> {
        self.log(Level::Warning, event)
    }

    pub fn error(&self, event: Value) -> Result<(), EmitError> {
        self.log(Level::Error, event)
    }

    pub fn critical(&self, event: Value) -> Result<(), EmitError> {
        self.log(Level::Critical, event)
    }

    /// Error-level event extended with details from `cause`.
    ///
    /// `error_name` and `backtrace` are written into the event before
    /// normalization, so caller-supplied fields of those names are
    /// overwritten.
    pub fn error_with(&self, event: Value, cause: &dyn ErrorDetails) -> Result<(), EmitError> {
        let mut event = into_object(event)?;
        event.insert("error_name".to_string(), Value::String(cause.description()));
        event.insert("backtrace".to_string(), json!(cause.stack_trace()));
        self.emit(Level::Error, event)
    }

    fn log(&self, level: Level, event: Value) -> Result<(), EmitError> {
        self.emit(level, into_object(event)?)
    }

    fn emit(&self, level: Level, event: Map<String, Value>) -> Result<(), EmitError> {
        validate_message(&event)?;

        let header = self.header_fields(level);
        let record = normalize([&header, &self.scoped, &event])?;
        let line = serde_json::to_string(&Value::Object(record))?;
        self.output.write_line(&line).map_err(SinkWriteError)?;
        Ok(())
    }

    fn header_fields(&self, level: Level) -> Map<String, Value> {
        let timestamp = self
            .clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut header = Map::new();
        header.insert("service".to_string(), json!({ "name": self.service }));
        header.insert("@timestamp".to_string(), Value::String(timestamp));
        header.insert("log".to_string(), json!({ "level": level }));
        header
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("service", &self.service)
            .field("scoped", &self.scoped)
            .finish_non_exhaustive()
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, InvalidEventError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(InvalidEventError::NotAnObject(json_type_name(&other))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn validate_message(event: &Map<String, Value>) -> Result<(), InvalidEventError> {
    match event.get("message") {
        None => Err(InvalidEventError::MissingMessage),
        Some(Value::String(text)) if text.trim().is_empty() => {
            Err(InvalidEventError::BlankMessage)
        }
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(InvalidEventError::MessageNotAString),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory_sink::MemorySink;
    use chrono::{TimeZone, Utc};

    fn test_logger() -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let logger = Logger::new(
            LoggerConfig::new("petshop")
                .with_clock(Arc::new(clock))
                .with_output(sink.clone()),
        )
        .unwrap();
        (logger, sink)
    }

    fn parse(line: &str) -> Value {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn blank_service_is_rejected() {
        assert!(matches!(
            Logger::new(LoggerConfig::new("")),
            Err(ConfigurationError::BlankService)
        ));
        assert!(matches!(
            Logger::new(LoggerConfig::new("   ")),
            Err(ConfigurationError::BlankService)
        ));
    }

    #[test]
    fn event_must_be_an_object() {
        let (logger, sink) = test_logger();

        let err = logger.info(json!("not a mapping")).unwrap_err();
        assert!(matches!(
            err,
            EmitError::InvalidEvent(InvalidEventError::NotAnObject("a string"))
        ));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn event_must_have_a_message() {
        let (logger, sink) = test_logger();

        assert!(matches!(
            logger.info(json!({})).unwrap_err(),
            EmitError::InvalidEvent(InvalidEventError::MissingMessage)
        ));
        assert!(matches!(
            logger.info(json!({ "message": "  " })).unwrap_err(),
            EmitError::InvalidEvent(InvalidEventError::BlankMessage)
        ));
        assert!(matches!(
            logger.info(json!({ "message": 7 })).unwrap_err(),
            EmitError::InvalidEvent(InvalidEventError::MessageNotAString)
        ));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn header_fields_are_present() {
        let (logger, sink) = test_logger();

        logger.warning(json!({ "message": "low disk" })).unwrap();

        let record = parse(&sink.lines()[0]);
        assert_eq!(record["service"]["name"], "petshop");
        assert_eq!(record["@timestamp"], "2024-01-01T00:00:00.000Z");
        assert_eq!(record["log"]["level"], "warning");
        assert_eq!(record["message"], "low disk");
    }

    #[test]
    fn scoped_properties_reach_every_event_of_the_child_only() {
        let (parent, sink) = test_logger();
        let child = parent.with(json!({ "trace.id": "abc123" })).unwrap();

        parent.info(json!({ "message": "from parent" })).unwrap();
        child.info(json!({ "message": "from child" })).unwrap();

        let lines = sink.lines();
        let parent_record = parse(&lines[0]);
        let child_record = parse(&lines[1]);
        assert!(parent_record.get("trace").is_none());
        assert_eq!(child_record["trace"]["id"], "abc123");
    }

    #[test]
    fn with_replaces_rather_than_extends_scope() {
        let (parent, sink) = test_logger();
        let first = parent.with(json!({ "x": 1 })).unwrap();
        let second = first.with(json!({ "y": 2 })).unwrap();

        second.info(json!({ "message": "m" })).unwrap();

        let record = parse(&sink.lines()[0]);
        assert!(record.get("x").is_none());
        assert_eq!(record["y"], 2);
    }

    #[test]
    fn with_rejects_non_object_scope() {
        let (logger, _sink) = test_logger();
        assert!(matches!(
            logger.with(json!([1, 2])).unwrap_err(),
            InvalidEventError::NotAnObject("an array")
        ));
    }

    #[test]
    fn event_beats_scope_beats_header() {
        let (parent, sink) = test_logger();
        let child = parent.with(json!({ "log.level": "debug" })).unwrap();

        child.info(json!({ "message": "m" })).unwrap();
        child
            .info(json!({ "message": "m", "log.level": "error" }))
            .unwrap();

        let lines = sink.lines();
        assert_eq!(parse(&lines[0])["log"]["level"], "debug");
        assert_eq!(parse(&lines[1])["log"]["level"], "error");
    }

    #[test]
    fn error_with_overwrites_caller_supplied_details() {
        let (logger, sink) = test_logger();

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let cause = CapturedError::from_std(&io_err);
        logger
            .error_with(
                json!({ "message": "DB connection failed.", "error_name": "bogus" }),
                &cause,
            )
            .unwrap();

        let record = parse(&sink.lines()[0]);
        assert_eq!(record["log"]["level"], "error");
        assert_eq!(record["error_name"], "connection reset");
        assert_eq!(record["backtrace"], json!([]));
    }

    #[test]
    fn each_call_writes_exactly_one_line() {
        let (logger, sink) = test_logger();

        logger.debug(json!({ "message": "one" })).unwrap();
        logger.info(json!({ "message": "two" })).unwrap();
        logger.critical(json!({ "message": "three" })).unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            parse(line);
        }
        assert_eq!(parse(&lines[2])["log"]["level"], "critical");
    }

    #[test]
    fn malformed_dotted_key_fails_without_writing() {
        let (logger, sink) = test_logger();

        let err = logger
            .info(json!({ "message": "m", "a..b": 1 }))
            .unwrap_err();
        assert!(matches!(err, EmitError::KeyFormat(_)));
        assert!(sink.lines().is_empty());
    }
}
