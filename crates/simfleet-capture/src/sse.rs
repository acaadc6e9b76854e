//! Incremental server-sent-events decoder.
//!
//! Bytes arrive in arbitrary chunks, possibly splitting a UTF-8 sequence or
//! an event in half. The decoder buffers raw bytes and only decodes a
//! complete event once its blank-line terminator has been seen.

use serde_json::Value;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the JSON payloads of every event it
    /// completed, in order. Events without `data:` lines or whose data is
    /// not valid JSON are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));
        let mut events = Vec::new();
        while let Some(end) = find_delimiter(&self.buf) {
            let raw: Vec<u8> = self.buf.drain(..end + 2).collect();
            if let Some(value) = parse_event(&raw[..end]) {
                events.push(value);
            }
        }
        events
    }

    /// Bytes held back waiting for an event terminator.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_event(raw: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(raw);
    let data: Vec<&str> = text
        .split('\n')
        .filter(|line| !line.is_empty() && !line.starts_with(':'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .collect();
    if data.is_empty() {
        return None;
    }
    serde_json::from_str(&data.join("\n")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"tick\":1,\"entities\":{}}\n\n");
        assert_eq!(events, vec![json!({"tick": 1, "entities": {}})]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"tick\":").is_empty());
        assert!(decoder.push(b"2}\n").is_empty());
        assert_eq!(decoder.push(b"\ndata: {\"tick\":3}\n\n"), vec![json!({"tick": 2}), json!({"tick": 3})]);
    }

    #[test]
    fn utf8_split_across_chunks() {
        let payload = "data: {\"name\":\"caf\u{e9}\"}\n\n".as_bytes();
        let split = payload.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&payload[..split]).is_empty());
        assert_eq!(decoder.push(&payload[split..]), vec![json!({"name": "caf\u{e9}"})]);
    }

    #[test]
    fn comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keepalive\n\nevent: frame\ndata: {\"a\":\ndata: 1}\n\n");
        assert_eq!(events, vec![json!({"a": 1})]);
    }

    #[test]
    fn crlf_and_garbage() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: not json\r\n\r\ndata: {\"ok\":true}\r\n\r\n");
        assert_eq!(events, vec![json!({"ok": true})]);
    }
}
