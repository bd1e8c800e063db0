use crate::error::{ClientError, log_error};

// ============================================================================
// NDJSON Record Parsing
// ============================================================================

/// One parsed line of a generation response body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationRecord {
    /// Incremental text, present when the line carries a string `response`.
    pub response: Option<String>,
    /// Set on the terminal record of a stream.
    pub done: bool,
}

/// Parse one complete line. Blank lines yield nothing; malformed lines are
/// logged and absorbed so one corrupt record cannot abort the stream.
pub fn parse_record(line: &str) -> Option<GenerationRecord> {
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => Some(GenerationRecord {
            response: value
                .get("response")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            done: value.get("done").and_then(|v| v.as_bool()).unwrap_or(false),
        }),
        Err(err) => {
            log_error(&ClientError::malformed(format!(
                "skipping record: {}",
                err
            )));
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
