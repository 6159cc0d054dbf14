//! Incremental decoder for the event stream.
//!
//! Bytes arrive in arbitrary chunks, so a record (or even a UTF-8 sequence)
//! may be split across chunk boundaries. The decoder buffers until a newline
//! and only then interprets the line. `data:` lines carry one JSON
//! [`StreamEvent`]; blank lines, comments (keep-alives) and other fields are
//! ignored; malformed payloads are logged and skipped.

use shared_types::StreamEvent;

const DATA_FIELD: &str = "data:";

#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: Vec<u8>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every event completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            if let Some(event) = decode_line(&self.buffer[start..end]) {
                events.push(event);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        events
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Interpret one complete line (without its trailing `\n`).
pub fn decode_line(line: &[u8]) -> Option<StreamEvent> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = match std::str::from_utf8(line) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping stream record with invalid UTF-8");
            return None;
        }
    };

    let payload = line.strip_prefix(DATA_FIELD)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, record = %payload, "Skipping malformed stream record");
            None
        }
    }
}
