//! Streaming line codec
//!
//! Serial reads deliver arbitrary fragments; the codec buffers bytes and
//! yields complete newline-terminated lines. A trailing `\r` before the
//! terminator is stripped so both `\n` and `\r\n` instruments work.

use tracing::warn;

/// Line terminator appended to every outgoing command
pub const LINE_TERMINATOR: u8 = b'\n';

/// Longest line accepted before the buffer is considered desynchronized
const MAX_LINE_LEN: usize = 256;

/// Streaming codec for newline-terminated ASCII exchanges
#[derive(Debug, Default)]
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    /// Create an empty codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Push raw bytes into the codec buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // A buffer past MAX_LINE_LEN with no terminator means we lost sync
        // with the instrument; drop it rather than grow without bound.
        if self.buffer.len() > MAX_LINE_LEN && !self.buffer.contains(&LINE_TERMINATOR) {
            warn!(
                "discarding {} unterminated bytes from line buffer",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    /// Try to extract the next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == LINE_TERMINATOR)?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Clear any buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_assembled_from_fragments() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"12.");
        assert_eq!(codec.next_line(), None);
        codec.push_bytes(b"345\n");
        assert_eq!(codec.next_line().as_deref(), Some("12.345"));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"1\r\n");
        assert_eq!(codec.next_line().as_deref(), Some("1"));
    }

    #[test]
    fn test_multiple_lines_in_one_push() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"first\nsecond\n");
        assert_eq!(codec.next_line().as_deref(), Some("first"));
        assert_eq!(codec.next_line().as_deref(), Some("second"));
        assert_eq!(codec.next_line(), None);
    }

    #[test]
    fn test_unterminated_overflow_discarded() {
        let mut codec = LineCodec::new();
        codec.push_bytes(&[b'x'; MAX_LINE_LEN + 1]);
        // Buffer was dropped; a subsequent well-formed line still parses
        codec.push_bytes(b"ok\n");
        assert_eq!(codec.next_line().as_deref(), Some("ok"));
    }

    #[test]
    fn test_clear_drops_partial_line() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"partial");
        codec.clear();
        codec.push_bytes(b"whole\n");
        assert_eq!(codec.next_line().as_deref(), Some("whole"));
    }
}
