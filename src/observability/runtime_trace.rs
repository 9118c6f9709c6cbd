//! Structured runtime trace events.
//!
//! Each event is emitted as one `tracing` event on the `runtime_trace` target,
//! carrying a JSON rendering of [`RuntimeTraceEvent`]. Filter them with
//! `RUST_LOG=runtime_trace=info`.

use serde::Serialize;

pub const TRACE_TARGET: &str = "runtime_trace";

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeTraceEvent {
    pub id: String,
    pub timestamp: String,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub payload: serde_json::Value,
}

pub fn build_event(
    event_type: &str,
    intent: Option<&str>,
    success: Option<bool>,
    message: Option<&str>,
    payload: serde_json::Value,
) -> RuntimeTraceEvent {
    RuntimeTraceEvent {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        event_type: event_type.to_string(),
        intent: intent.map(str::to_string),
        success,
        message: message.map(str::to_string),
        payload,
    }
}

/// Record one runtime event (retry, classification, dispatch, summary).
pub fn record_event(
    event_type: &str,
    intent: Option<&str>,
    success: Option<bool>,
    message: Option<&str>,
    payload: serde_json::Value,
) {
    if !tracing::enabled!(target: TRACE_TARGET, tracing::Level::INFO) {
        return;
    }

    let event = build_event(event_type, intent, success, message, payload);
    match serde_json::to_string(&event) {
        Ok(json) => tracing::info!(
            target: TRACE_TARGET,
            event_type = %event.event_type,
            trace = %json,
            "runtime trace event"
        ),
        Err(error) => tracing::warn!(target: TRACE_TARGET, %error, "Failed to encode runtime trace event"),
    }
}
