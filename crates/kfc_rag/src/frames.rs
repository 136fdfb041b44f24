//! Incremental decoders for the two streaming wire formats.
//!
//! Both buffer raw bytes until a full line is available, so a multi-byte
//! character split across network chunks decodes intact.

use kfc_core::SourceCitation;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::message::StreamMessage;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct SseFrame {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    sources: Option<Vec<SseSource>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseSource {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: Option<SseSourceMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct SseSourceMetadata {
    #[serde(default)]
    article_id: Option<Value>,
    #[serde(default)]
    relevance: Option<f64>,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl SseSource {
    fn into_citation(self, index: usize) -> SourceCitation {
        let metadata = self.metadata.unwrap_or_default();
        let id = metadata
            .article_id
            .as_ref()
            .and_then(id_string)
            .or_else(|| self.id.as_ref().and_then(id_string))
            .unwrap_or_else(|| format!("source-{}", index + 1));
        SourceCitation {
            id,
            title: self.title,
            content: self.content,
            relevance: metadata.relevance.unwrap_or_default(),
        }
    }
}

/// Removes every complete line from `carry`, without the line terminator.
fn drain_lines(carry: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(idx) = carry.iter().position(|b| *b == b'\n') {
        let mut line: Vec<u8> = carry.drain(..=idx).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        lines.push(String::from_utf8_lossy(&line).into_owned());
    }
    lines
}

fn drain_rest(carry: &mut Vec<u8>) -> Option<String> {
    if carry.is_empty() {
        return None;
    }
    let rest = std::mem::take(carry);
    Some(String::from_utf8_lossy(&rest).into_owned())
}

/// Decoder for `data: {"text", "finished", "sources", "error"}` event
/// streams.
///
/// A `text` field is the full answer so far. A frame with
/// `finished: true` yields `Sources` followed by `End`; an `error` field
/// yields `Error`. Nothing is emitted after either.
#[derive(Debug, Default)]
pub struct SseDecoder {
    carry: Vec<u8>,
    event: String,
    answer: String,
    ended: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.ended
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamMessage> {
        self.carry.extend_from_slice(chunk);
        let mut out = Vec::new();
        for line in drain_lines(&mut self.carry) {
            self.line(&line, &mut out);
        }
        out
    }

    /// Flushes whatever the stream left unterminated.
    pub fn finish(&mut self) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        if let Some(rest) = drain_rest(&mut self.carry) {
            self.line(&rest, &mut out);
        }
        self.flush(&mut out);
        out
    }

    fn line(&mut self, line: &str, out: &mut Vec<StreamMessage>) {
        let line = line.trim();
        if line.is_empty() {
            self.flush(out);
            return;
        }

        let Some(payload) = line.strip_prefix("data:") else {
            debug!("Skipping non-data line: {}", line);
            return;
        };
        let payload = payload.trim();

        if payload == DONE_MARKER {
            self.flush(out);
            if !self.ended {
                self.ended = true;
                out.push(StreamMessage::End);
            }
            return;
        }

        if !self.event.is_empty() {
            self.event.push('\n');
        }
        self.event.push_str(payload);

        // Frames on a single line go out without waiting for the blank line.
        if let Ok(frame) = serde_json::from_str::<SseFrame>(&self.event) {
            self.event.clear();
            self.dispatch(frame, out);
        }
    }

    fn flush(&mut self, out: &mut Vec<StreamMessage>) {
        let payload = std::mem::take(&mut self.event);
        if payload.trim().is_empty() {
            return;
        }
        match serde_json::from_str::<SseFrame>(&payload) {
            Ok(frame) => self.dispatch(frame, out),
            Err(e) => warn!("⚠️ Dropping malformed stream frame: {}", e),
        }
    }

    fn dispatch(&mut self, frame: SseFrame, out: &mut Vec<StreamMessage>) {
        if self.ended {
            debug!("Ignoring frame after end of stream");
            return;
        }

        if let Some(error) = frame.error.filter(|e| !e.trim().is_empty()) {
            self.ended = true;
            out.push(StreamMessage::error(error));
            return;
        }

        if let Some(text) = frame.text.filter(|t| !t.is_empty()) {
            self.answer = text;
            out.push(StreamMessage::token(self.answer.clone()));
        }

        if frame.finished {
            let sources = frame
                .sources
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(i, s)| s.into_citation(i))
                .collect();
            let content = (!self.answer.is_empty()).then(|| self.answer.clone());
            out.push(StreamMessage::Sources { sources, content });
            out.push(StreamMessage::End);
            self.ended = true;
        }
    }
}

/// Decoder for newline-delimited [`StreamMessage`] JSON, where each token
/// is a delta. Deltas are accumulated so emitted tokens carry the full
/// answer, like every other stream.
#[derive(Debug, Default)]
pub struct JsonLineDecoder {
    carry: Vec<u8>,
    answer: String,
    ended: bool,
}

impl JsonLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.ended
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamMessage> {
        self.carry.extend_from_slice(chunk);
        let mut out = Vec::new();
        for line in drain_lines(&mut self.carry) {
            self.line(&line, &mut out);
        }
        out
    }

    /// End of body. Emits `End` unless the stream already terminated.
    pub fn finish(&mut self) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        if let Some(rest) = drain_rest(&mut self.carry) {
            self.line(&rest, &mut out);
        }
        if !self.ended {
            self.ended = true;
            out.push(StreamMessage::End);
        }
        out
    }

    fn line(&mut self, line: &str, out: &mut Vec<StreamMessage>) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<StreamMessage>(line) {
            Ok(message) => self.accept(message, out),
            Err(e) => warn!("⚠️ Failed to parse stream message: {}", e),
        }
    }

    fn accept(&mut self, message: StreamMessage, out: &mut Vec<StreamMessage>) {
        if self.ended {
            return;
        }
        match message {
            StreamMessage::Token { content } => {
                if content.is_empty() {
                    return;
                }
                self.answer.push_str(&content);
                out.push(StreamMessage::token(self.answer.clone()));
            }
            StreamMessage::Sources { sources, content } => {
                let content = content.or_else(|| (!self.answer.is_empty()).then(|| self.answer.clone()));
                out.push(StreamMessage::Sources { sources, content });
            }
            terminal => {
                self.ended = true;
                out.push(terminal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_sse(chunks: &[&[u8]]) -> Vec<StreamMessage> {
        let mut decoder = SseDecoder::new();
        let mut out: Vec<StreamMessage> = chunks.iter().flat_map(|c| decoder.push(c)).collect();
        out.extend(decoder.finish());
        out
    }

    #[test]
    fn test_text_replaces_previous_answer() {
        let body = concat!(
            "data: {\"text\": \"深度\", \"finished\": false, \"sources\": null}\n\n",
            "data: {\"text\": \"深度学习\", \"finished\": false, \"sources\": null}\n\n",
            "data: {\"text\": \"深度学习是\", \"finished\": true, \"sources\": [",
            "{\"title\": \"T\", \"content\": \"C\", \"metadata\": {\"article_id\": 3, \"relevance\": 0.8}}]}\n\n",
        );
        let out = collect_sse(&[body.as_bytes()]);
        assert_eq!(out[0], StreamMessage::token("深度"));
        assert_eq!(out[1], StreamMessage::token("深度学习"));
        assert_eq!(out[2], StreamMessage::token("深度学习是"));
        match &out[3] {
            StreamMessage::Sources { sources, content } => {
                assert_eq!(sources[0].id, "3");
                assert_eq!(sources[0].relevance, 0.8);
                assert_eq!(content.as_deref(), Some("深度学习是"));
            }
            other => panic!("expected sources, got {:?}", other),
        }
        assert_eq!(out[4], StreamMessage::End);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_split_chunks_and_crlf() {
        let body = "data: {\"text\": \"量子\"}\r\n\r\ndata: [DONE]\r\n".as_bytes();
        // Split inside the first multi-byte character.
        let out = collect_sse(&[&body[..20], &body[20..]]);
        assert_eq!(out, vec![StreamMessage::token("量子"), StreamMessage::End]);
    }

    #[test]
    fn test_error_frame_stops_stream() {
        let body = "data: {\"error\": \"Dataset not ready\"}\n\ndata: {\"text\": \"late\"}\n\n";
        let out = collect_sse(&[body.as_bytes()]);
        assert_eq!(out, vec![StreamMessage::error("Dataset not ready")]);
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let body = "data: {not json\n\ndata: {\"text\": \"ok\", \"finished\": true}\n\n";
        let out = collect_sse(&[body.as_bytes()]);
        assert_eq!(out[0], StreamMessage::token("ok"));
        assert_eq!(out.last(), Some(&StreamMessage::End));
    }

    #[test]
    fn test_json_lines_accumulate_deltas() {
        let mut decoder = JsonLineDecoder::new();
        let mut out = decoder.push(b"{\"type\":\"token\",\"content\":\"Hello\"}\n{\"type\":\"tok");
        out.extend(decoder.push(b"en\",\"content\":\", world\"}\ngarbage\n"));
        out.extend(decoder.finish());
        assert_eq!(
            out,
            vec![
                StreamMessage::token("Hello"),
                StreamMessage::token("Hello, world"),
                StreamMessage::End,
            ]
        );
        assert!(decoder.is_finished());
    }
}
