//! Incremental frame decoder for the analysis event stream
//!
//! The transport delivers text in arbitrarily sized chunks; frame boundaries
//! (a blank line) can land anywhere, including mid-payload. The decoder
//! buffers undecoded trailing text between calls and only ever emits payloads
//! whose terminating delimiter has been seen, so the same frame sequence comes
//! out no matter how the input was chunked.

/// Marker prefixing the payload line inside a frame
const DATA_PREFIX: &str = "data: ";

/// Delimiter between successive frames
const FRAME_DELIMITER: &str = "\n\n";

/// Reassembles delimited frames from a chunked text stream
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    /// Create a new decoder with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of text, returning the payloads of all frames completed
    /// by it, in order. The payload line's `data: ` marker is stripped.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find(FRAME_DELIMITER) {
            let frame: String = self.buffer.drain(..pos + FRAME_DELIMITER.len()).collect();
            if let Some(payload) = extract_payload(&frame) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Consume the decoder at end-of-stream, flushing a trailing frame that
    /// never received its delimiter.
    pub fn finish(self) -> Option<String> {
        if self.buffer.trim().is_empty() {
            return None;
        }
        let payload = extract_payload(&self.buffer);
        if payload.is_none() {
            tracing::debug!("Discarding trailing frame without payload line");
        }
        payload
    }
}

/// Pull the payload line out of one complete frame
fn extract_payload(frame: &str) -> Option<String> {
    frame
        .lines()
        .find_map(|line| line.trim().strip_prefix(DATA_PREFIX))
        .map(str::to_string)
}
