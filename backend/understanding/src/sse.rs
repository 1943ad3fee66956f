//! Incremental decoder for `text/event-stream` bodies.
//!
//! Network chunks can split a line anywhere, including inside a multi-byte
//! character, so bytes are buffered until a full line is available.

/// One decoded `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Data(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(frame) = parse_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing line that had no newline.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buf);
        parse_line(&rest)
    }
}

fn parse_line(raw: &[u8]) -> Option<SseFrame> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix("data:")?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.trim() == "[DONE]" {
        return Some(SseFrame::Done);
    }
    Some(SseFrame::Data(payload.to_string()))
}

/// Text carried by a data payload: the `response` field of a JSON object, a
/// JSON string, or the raw payload when it is not JSON.
pub fn extract_text(payload: &str) -> Option<String> {
    let text = match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(serde_json::Value::Object(map)) => map.get("response")?.as_str()?.to_string(),
        Ok(serde_json::Value::String(s)) => s,
        Ok(_) => return None,
        Err(_) => payload.to_string(),
    };
    (!text.is_empty()).then_some(text)
}
