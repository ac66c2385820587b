//! Transport encoding for the watchlist document.
//!
//! The remote store holds documents as base64-wrapped UTF-8 JSON. Encoding
//! goes through `String` rather than raw bytes so multi-byte content (accented
//! names, non-Latin symbols) survives the round trip; byte-truncating
//! shortcuts are a correctness bug here.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

use crate::domain::WatchlistDocument;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("transport payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("transport payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("document JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes the document to canonical two-space-indented JSON, then wraps
/// it for transport.
pub fn encode_document(document: &WatchlistDocument) -> Result<String, CodecError> {
    let json = serde_json::to_string_pretty(document)?;
    Ok(to_transport(&json))
}

/// Inverse of [`encode_document`].
pub fn decode_document(payload: &str) -> Result<WatchlistDocument, CodecError> {
    let json = from_transport(payload)?;
    Ok(serde_json::from_str(&json)?)
}

/// Base64-wraps UTF-8 text for the remote store's write path.
pub fn to_transport(text: &str) -> String {
    BASE64.encode(text.as_bytes())
}

/// Unwraps a transport payload back to UTF-8 text. The remote store returns
/// base64 broken across lines, so whitespace is stripped before decoding.
pub fn from_transport(payload: &str) -> Result<String, CodecError> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64.decode(compact.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}
