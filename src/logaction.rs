//! Request log classification.
//!
//! Completed requests are classified into severity buckets by status code
//! and written to the console through an explicit [`LogSink`], so the
//! backends never touch a global logger directly.

/// Console severity for a classified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One completed (or otherwise notable) request, as reported by a backend.
#[derive(Debug, Clone)]
pub struct RequestLogEvent {
    pub protocol: String,
    pub action: String,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub time_taken: f64,
    pub client: String,
}

/// Classify a status code into a severity and an outcome tag.
///
/// Pure function; first match wins. 2xx is checked first since it is the
/// common case.
pub fn classify(status: i32) -> (Severity, &'static str) {
    match status {
        200..=299 => (Severity::Info, "success"),
        100..=199 => (Severity::Info, "informational"),
        304 => (Severity::Info, "not-modified"),
        300..=399 => (Severity::Info, "redirect"),
        404 => (Severity::Warning, "not-found"),
        400..=499 => (Severity::Warning, "bad-request"),
        // Any 5xx, negative, or out-of-range status
        _ => (Severity::Error, "server-error"),
    }
}

/// Render the single console line for a request event.
pub fn format_event(event: &RequestLogEvent) -> String {
    format!(
        "HTTP {} {} {} [{:.2}, {}]",
        event.method, event.path, event.status, event.time_taken, event.client
    )
}

/// Whether an event belongs to this classifier at all.
///
/// Only completed requests on the active protocol are classified;
/// connection open/close events belong to other collaborators.
pub fn is_classifiable(event: &RequestLogEvent, active_protocol: &str) -> bool {
    event.protocol == active_protocol && event.action == "complete"
}

/// Destination for classified request lines.
///
/// Passed into the backends at construction; scoped to one process run.
pub trait LogSink: Send + Sync {
    fn log_action(&self, event: &RequestLogEvent);
}

/// Default sink: forwards to `tracing` at the classified level.
///
/// Only events matching the active protocol with action `"complete"` are
/// emitted; connection open/close events belong to other collaborators.
pub struct TracingSink {
    protocol: String,
}

impl TracingSink {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
        }
    }
}

impl LogSink for TracingSink {
    fn log_action(&self, event: &RequestLogEvent) {
        if !is_classifiable(event, &self.protocol) {
            return;
        }

        let (severity, outcome) = classify(event.status);
        let line = format_event(event);
        match severity {
            Severity::Info => tracing::info!(outcome, "{line}"),
            Severity::Warning => tracing::warn!(outcome, "{line}"),
            Severity::Error => tracing::error!(outcome, "{line}"),
        }
    }
}
