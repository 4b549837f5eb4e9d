//! Structured request logging middleware for the tool HTTP server.
//!
//! Generalized from the teacher's JSON-RPC request logger
//! (`method`/`params`) to the tool envelope's `operation`/`params` shape;
//! each request gets a [`crate::session::SessionId`] that is logged but
//! never read by `ToolHandler`.

use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use http_body_util::BodyExt;
use serde_json::Value;
use tracing::info;

use crate::session::SessionId;

/// Maximum length for parameter values before truncation
const MAX_PARAM_LENGTH: usize = 30;

/// Truncation suffix for long parameters
const TRUNCATION_SUFFIX: &str = "...";

/// Tool request logging middleware.
///
/// Logs requests as `[sessionId] [operation] [34 ms] param1="value", ...`
/// via `tracing`, truncating and redacting parameter values the same way
/// the teacher's JSON-RPC logger did.
pub async fn tool_request_logging_middleware(request: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let session_id = SessionId::new();
    let start_time = std::time::Instant::now();
    let path = request.uri().path().to_string();

    if !path.starts_with("/mcp") {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            let new_request = Request::from_parts(parts, Body::empty());
            let response = next.run(new_request).await;
            info!(session = %session_id, operation = "unknown", elapsed_ms = start_time.elapsed().as_millis() as u64, "body read error");
            return Ok(response);
        }
    };

    let (operation, params_summary) = match serde_json::from_slice::<Value>(&body_bytes) {
        Ok(json) => {
            let operation = json.get("operation").and_then(|v| v.as_str()).unwrap_or("unknown");
            let params = json.get("params").unwrap_or(&Value::Null);
            (operation.to_string(), format_params_summary(params))
        }
        Err(_) => ("invalid_json".to_string(), String::new()),
    };

    let new_request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(new_request).await;
    let elapsed_ms = start_time.elapsed().as_millis() as u64;

    if params_summary.is_empty() {
        info!(session = %session_id, %operation, elapsed_ms, "tool request");
    } else {
        info!(session = %session_id, %operation, elapsed_ms, params = %params_summary, "tool request");
    }

    Ok(response)
}

/// Format parameters into a summary string with truncation
fn format_params_summary(params: &Value) -> String {
    match params {
        Value::Object(map) => {
            let formatted_params: Vec<String> = map
                .iter()  
                .filter_map(|(key, value)| {
                    // Skip sensitive parameters
                    if is_sensitive_parameter(key) {
                        return Some(format!("{}=\"[REDACTED]\"", key));
                    }
                    
                    let formatted_value = format_parameter_value(value);
                    if formatted_value.is_empty() {
                        None
                    } else {
                        Some(format!("{}=\"{}\"", key, formatted_value))
                    }
                })
                .collect();
            
            formatted_params.join(", ")
        }
        Value::Array(arr) => {
            format!("[{} items]", arr.len())
        }
        _ => format_parameter_value(params),
    }
}

/// Format a single parameter value with truncation
fn format_parameter_value(value: &Value) -> String {
    let value_str = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{...{} fields}}", obj.len()),
        Value::Null => "null".to_string(),
    };
    
    truncate_string(&value_str, MAX_PARAM_LENGTH)
}

/// Truncate string to max length with suffix
fn truncate_string(input: &str, max_length: usize) -> String {
    if input.len() <= max_length {
        input.to_string()
    } else {
        let truncated_length = max_length.saturating_sub(TRUNCATION_SUFFIX.len());
        format!("{}{}", &input[..truncated_length], TRUNCATION_SUFFIX)
    }
}

/// Check if parameter should be redacted for security
fn is_sensitive_parameter(key: &str) -> bool {
    let sensitive_keys = [
        "password", "token", "secret", "key", "auth", "authorization",
        "credential", "api_key", "access_token", "refresh_token"
    ];
    
    let key_lower = key.to_lowercase();
    sensitive_keys.iter().any(|&sensitive| key_lower.contains(sensitive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("this is a very long string", 10), "this is...");
        assert_eq!(truncate_string("exactly10c", 10), "exactly10c");
    }

    #[test]
    fn test_format_parameter_value() {
        assert_eq!(format_parameter_value(&json!("test")), "test");
        assert_eq!(format_parameter_value(&json!(42)), "42");
        assert_eq!(format_parameter_value(&json!(true)), "true");
        assert_eq!(format_parameter_value(&json!(null)), "null");
        assert_eq!(format_parameter_value(&json!(["a", "b", "c"])), "[3 items]");
    }

    #[test]
    fn test_format_params_summary() {
        let params = json!({
            "code": "TASK-001",
            "name": "This is a very long task name that should be truncated",
            "count": 42,
            "enabled": true
        });
        
        let summary = format_params_summary(&params);
        assert!(summary.contains("code=\"TASK-001\""));
        assert!(summary.contains("name=\"This is a very long task na...\""));
        assert!(summary.contains("count=\"42\""));
        assert!(summary.contains("enabled=\"true\""));
    }

    #[test]
    fn test_sensitive_parameter_redaction() {
        let params = json!({
            "username": "user123",
            "password": "secret123",
            "api_key": "sensitive_key",
            "normal_field": "normal_value"
        });
        
        let summary = format_params_summary(&params);
        assert!(summary.contains("username=\"user123\""));
        assert!(summary.contains("password=\"[REDACTED]\""));
        assert!(summary.contains("api_key=\"[REDACTED]\""));
        assert!(summary.contains("normal_field=\"normal_value\""));
    }

    #[test]
    fn test_is_sensitive_parameter() {
        assert!(is_sensitive_parameter("password"));
        assert!(is_sensitive_parameter("api_key"));
        assert!(is_sensitive_parameter("access_token"));
        assert!(is_sensitive_parameter("AUTH_TOKEN"));
        assert!(!is_sensitive_parameter("username"));
        assert!(!is_sensitive_parameter("name"));
        assert!(!is_sensitive_parameter("description"));
    }
}