// ============================================================================
// Line Splitting
// ============================================================================

/// Accumulates decoded text and yields complete newline-terminated lines.
/// The final segment of the buffer, complete or not, stays pending until a
/// newline arrives or the stream ends.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    /// Next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let idx = self.pending.find('\n')?;
        let rest = self.pending.split_off(idx + 1);
        let mut line = std::mem::replace(&mut self.pending, rest);
        line.pop();
        Some(line)
    }

    /// Drain whatever is left, for the final unterminated line at EOF.
    pub fn take_pending(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yields_complete_lines_in_order() {
        let mut buf = LineBuffer::new();
        buf.push("one\ntwo\nthr");
        assert_eq!(buf.next_line().as_deref(), Some("one"));
        assert_eq!(buf.next_line().as_deref(), Some("two"));
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.take_pending(), "thr");
    }

    #[test]
    fn test_line_split_across_pushes() {
        let mut buf = LineBuffer::new();
        buf.push("{\"a\":");
        assert_eq!(buf.next_line(), None);
        buf.push("1}\n");
        assert_eq!(buf.next_line().as_deref(), Some("{\"a\":1}"));
        assert_eq!(buf.take_pending(), "");
    }

    #[test]
    fn test_blank_lines_are_preserved() {
        let mut buf = LineBuffer::new();
        buf.push("\n\nx\n");
        assert_eq!(buf.next_line().as_deref(), Some(""));
        assert_eq!(buf.next_line().as_deref(), Some(""));
        assert_eq!(buf.next_line().as_deref(), Some("x"));
        assert_eq!(buf.next_line(), None);
    }

    #[test]
    fn test_take_pending_resets_buffer() {
        let mut buf = LineBuffer::new();
        buf.push("tail");
        assert_eq!(buf.take_pending(), "tail");
        assert_eq!(buf.take_pending(), "");
    }
}
