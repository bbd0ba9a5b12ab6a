//! Incremental decoder for SSE-framed chat-completion streams
//!
//! Turns raw byte chunks into decoded text fragments. The decoder is
//! stateful across calls: bytes are buffered until a complete line is
//! available, so a chunk boundary may fall inside a line or even inside a
//! multi-byte UTF-8 sequence without corrupting the output (splitting the
//! buffer on `\n` at the byte level is safe because UTF-8 continuation
//! bytes can never equal `0x0A`).
//!
//! Frame handling follows the wire protocol: blank lines and lines without
//! the `data: ` prefix are ignored, the literal `[DONE]` payload ends the
//! stream, and malformed JSON frames are skipped rather than aborting.

use serde::Deserialize;
use tracing::debug;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Stateful SSE stream decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` terminator has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one raw chunk, returning the text fragments completed by it
    ///
    /// Fragments are returned in arrival order. After the terminator frame
    /// any further input is discarded.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        if self.done {
            return fragments;
        }
        self.buf.extend_from_slice(chunk);

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(data) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            if data == DONE_MARKER {
                self.done = true;
                break;
            }
            match serde_json::from_str::<StreamFrame>(data) {
                Ok(frame) => {
                    if let Some(content) = frame.choices.first().and_then(|c| c.delta.content.as_deref())
                        && !content.is_empty()
                    {
                        fragments.push(content.to_string());
                    }
                }
                Err(e) => {
                    // protocol lenience: malformed frames must not abort the stream
                    debug!(error = %e, "feed: skipping malformed SSE frame");
                }
            }
        }

        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{content}\"}}}}]}}\n")
    }

    #[test]
    fn test_single_chunk_single_fragment() {
        let mut decoder = SseDecoder::new();
        let fragments = decoder.feed(frame("ab").as_bytes());
        assert_eq!(fragments, vec!["ab".to_string()]);
        assert!(!decoder.is_done());
    }

    #[test]
    fn test_chunk_boundary_inside_line() {
        let line = frame("ab");
        let bytes = line.as_bytes();

        // every possible split point yields the identical single fragment
        for split in 0..=bytes.len() {
            let mut decoder = SseDecoder::new();
            let mut fragments = decoder.feed(&bytes[..split]);
            fragments.extend(decoder.feed(&bytes[split..]));
            assert_eq!(fragments, vec!["ab".to_string()], "split at {split}");
        }
    }

    #[test]
    fn test_chunk_boundary_inside_multibyte_char() {
        let line = frame("你好");
        let bytes = line.as_bytes();

        // "你" is three bytes; split in the middle of it
        let split = line.find('你').unwrap() + 1;
        let mut decoder = SseDecoder::new();
        let mut fragments = decoder.feed(&bytes[..split]);
        fragments.extend(decoder.feed(&bytes[split..]));
        assert_eq!(fragments, vec!["你好".to_string()]);
    }

    #[test]
    fn test_done_marker_terminates_without_fragment() {
        let mut decoder = SseDecoder::new();
        let fragments = decoder.feed(b"data: [DONE]\n");
        assert!(fragments.is_empty());
        assert!(decoder.is_done());

        // anything after the terminator is discarded
        let fragments = decoder.feed(frame("late").as_bytes());
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let mut decoder = SseDecoder::new();
        let input = format!("data: {{not json\n{}", frame("ok"));
        let fragments = decoder.feed(input.as_bytes());
        assert_eq!(fragments, vec!["ok".to_string()]);
    }

    #[test]
    fn test_blank_and_non_data_lines_ignored() {
        let mut decoder = SseDecoder::new();
        let input = format!("\n: keep-alive\nevent: ping\n{}\n", frame("x"));
        let fragments = decoder.feed(input.as_bytes());
        assert_eq!(fragments, vec!["x".to_string()]);
    }

    #[test]
    fn test_empty_delta_yields_no_fragment() {
        let mut decoder = SseDecoder::new();
        let fragments = decoder.feed(b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n");
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_multiple_frames_one_chunk() {
        let mut decoder = SseDecoder::new();
        let input = format!("{}{}data: [DONE]\n", frame("Hello"), frame(" world"));
        let fragments = decoder.feed(input.as_bytes());
        assert_eq!(fragments, vec!["Hello".to_string(), " world".to_string()]);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_incomplete_line_retained_across_calls() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: ").is_empty());
        assert!(decoder.feed(b"{\"choices\":[{\"delta\":").is_empty());
        let fragments = decoder.feed(b"{\"content\":\"tail\"}}]}\n");
        assert_eq!(fragments, vec!["tail".to_string()]);
    }
}
