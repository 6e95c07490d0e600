use ecs_logger::{Logger, LoggerConfig};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = 8080;

    let log = Logger::new(LoggerConfig::new("my-super-service"))?;

    // Start our new super service.
    log.info(json!({
        "event.action": "startup",
        "message": format!("Ready to go, listening on port {port}"),
        "server.port": port,
    }))?;

    // We get a request.
    let request_log = log.with(json!({
        "event.action": "HTTP request",
        "trace.id": "126bb6fa-28a2-470f-b013-eefbf9182b2d",
    }))?;

    // Simulated failure condition, injected explicitly.
    let db_err = true;
    if db_err {
        request_log.error(json!({ "message": "DB connection failed." }))?;
    }

    // We return an error to the requester.
    request_log.info(json!({
        "message": "Responding with internal server error.",
        "http": {
            "request": { "method": "GET" },
            "response": { "status_code": 500 },
        },
    }))?;

    Ok(())
}
