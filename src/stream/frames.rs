use tracing::debug;

/// Marker that prefixes every record taking part in the generation protocol
pub const FRAME_PREFIX: &str = "data: ";

/// Splits an incrementally delivered body into complete `data: ` payloads.
///
/// Bytes are held until their line delimiter arrives, so both a record and a multi-byte
/// character split across chunks come out whole.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        complete
            .split(|&b| b == b'\n')
            .filter_map(Self::frame_payload)
            .collect()
    }

    /// Bytes of an unterminated record still waiting for a delimiter
    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// End of input: whatever never saw its delimiter is discarded. Returns the byte count dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buffer.len();
        if dropped > 0 {
            debug!(bytes = dropped, "discarding unterminated trailing frame");
        }
        self.buffer.clear();
        dropped
    }

    fn frame_payload(line: &[u8]) -> Option<String> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let payload = line.strip_prefix(FRAME_PREFIX.as_bytes())?;
        Some(String::from_utf8_lossy(payload).into_owned())
    }
}
