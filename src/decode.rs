// ============================================================================
// Chunked UTF-8 Decoding
// ============================================================================

/// Stateful bytes-to-text decoder for a chunked transport.
///
/// Network chunk boundaries are not aligned with character boundaries, so a
/// multi-byte sequence can arrive split across two chunks. The decoder keeps
/// the incomplete trailing sequence of each chunk and replays it in front of
/// the next one, so concatenating the emitted text always equals decoding the
/// whole byte stream in one piece.
///
/// Invalid (non-truncated) sequences decode to U+FFFD and decoding continues.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, emitting all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        if chunk.is_empty() {
            return String::new();
        }
        let carried;
        let mut rest: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            carried = joined;
            &carried
        };

        let mut out = String::new();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end of input: hold it
                            // for the next chunk. At most 3 bytes.
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush a sequence still incomplete at end-of-stream as U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let leftover = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&leftover).into_owned()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(b"hello"), "hello");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_two_byte_char_split() {
        let mut decoder = Utf8ChunkDecoder::new();
        let bytes = "é".as_bytes(); // 0xC3 0xA9
        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&bytes[1..]), "é");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_four_byte_char_every_split() {
        let bytes = "🦀".as_bytes();
        assert_eq!(bytes.len(), 4);
        for split in 1..4 {
            let mut decoder = Utf8ChunkDecoder::new();
            let mut out = decoder.decode(&bytes[..split]);
            out.push_str(&decoder.decode(&bytes[split..]));
            assert_eq!(out, "🦀", "split at byte {}", split);
        }
    }

    #[test]
    fn test_invalid_byte_becomes_replacement() {
        let mut decoder = Utf8ChunkDecoder::new();
        let out = decoder.decode(b"a\xFFb");
        assert_eq!(out, "a\u{FFFD}b");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_finish_flushes_truncated_sequence() {
        let mut decoder = Utf8ChunkDecoder::new();
        let bytes = "🦀".as_bytes();
        assert_eq!(decoder.decode(&bytes[..2]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut decoder = Utf8ChunkDecoder::new();
        let bytes = "ö".as_bytes();
        decoder.decode(&bytes[..1]);
        assert_eq!(decoder.decode(b""), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&bytes[1..]), "ö");
    }

    #[test]
    fn test_replay_invariance_at_every_split() {
        let reference = "héllo 🦀 wörld\n";
        let bytes = reference.as_bytes();
        for split in 0..=bytes.len() {
            let mut decoder = Utf8ChunkDecoder::new();
            let mut out = decoder.decode(&bytes[..split]);
            out.push_str(&decoder.decode(&bytes[split..]));
            out.push_str(&decoder.finish());
            assert_eq!(out, reference, "split at byte {}", split);
        }
    }
}
