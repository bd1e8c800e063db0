use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Main Error Type
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    // Convenience constructors
    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkUnreachable, detail)
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let detail = if body.trim().is_empty() {
            format!("status {}", status)
        } else {
            format!("status {}: {}", status, body)
        };
        Self::new(ErrorKind::HttpError, detail)
    }

    pub fn empty_body(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyBody, detail)
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedRecord, detail)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "stream cancelled by caller")
    }

    pub fn already_active() -> Self {
        Self::new(
            ErrorKind::AlreadyActive,
            "a generation request is already in flight on this consumer",
        )
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.detail)
    }
}

impl std::error::Error for ClientError {}

// ============================================================================
// Error Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request could not be sent, or the connection dropped mid-stream.
    NetworkUnreachable,
    /// Response arrived with a non-success status.
    HttpError,
    /// Success status but the body could not be read before any data arrived.
    EmptyBody,
    /// One NDJSON line failed to parse. Recovered locally by skipping the
    /// line, never surfaced; exists for logging only.
    MalformedRecord,
    /// Stream aborted by the caller before reaching a terminal state.
    Cancelled,
    /// start() while a prior request has not reached a terminal state.
    AlreadyActive,
}

impl ErrorKind {
    /// Kinds that terminate a stream and are surfaced through the sink
    /// (or, for AlreadyActive, returned from start()).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::MalformedRecord)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NetworkUnreachable => "NETWORK_UNREACHABLE",
            Self::HttpError => "HTTP_ERROR",
            Self::EmptyBody => "EMPTY_BODY",
            Self::MalformedRecord => "MALFORMED_RECORD",
            Self::Cancelled => "CANCELLED",
            Self::AlreadyActive => "ALREADY_ACTIVE",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

pub type Result<T> = std::result::Result<T, ClientError>;

// ============================================================================
// Helpers
// ============================================================================

pub fn log_error(error: &ClientError) {
    if error.kind.is_terminal() {
        log::error!("{}", error);
    } else {
        log::debug!("{}", error);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ClientError::network("connection refused");
        assert_eq!(err.kind, ErrorKind::NetworkUnreachable);
        assert!(err.detail.contains("refused"));
    }

    #[test]
    fn test_http_detail_includes_status() {
        let err = ClientError::http(503, "upstream busy");
        assert_eq!(err.kind, ErrorKind::HttpError);
        assert!(err.detail.contains("503"));
        assert!(err.detail.contains("upstream busy"));
    }

    #[test]
    fn test_http_detail_without_body() {
        let err = ClientError::http(404, "  ");
        assert_eq!(err.detail, "status 404");
    }

    #[test]
    fn test_terminal_classification() {
        assert!(ErrorKind::NetworkUnreachable.is_terminal());
        assert!(ErrorKind::Cancelled.is_terminal());
        assert!(!ErrorKind::MalformedRecord.is_terminal());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::cancelled();
        let display = format!("{}", err);
        assert!(display.contains("CANCELLED"));
        assert!(display.contains("cancelled"));
    }

    #[test]
    fn test_json_serialization() {
        let err = ClientError::already_active();
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("AlreadyActive"));
    }
}
