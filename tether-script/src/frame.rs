//! JSON-line framing for child interpreters.
//!
//! Each message travels as one JSON string literal on its own line, so
//! messages containing newlines survive the trip over stdio.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One message as a single line, without the trailing newline.
pub fn encode_frame(message: &str) -> Result<String, FrameError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode_frame(line: &str) -> Result<String, FrameError> {
    Ok(serde_json::from_str(line.trim_end_matches(['\r', '\n']))?)
}
