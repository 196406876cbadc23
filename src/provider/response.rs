//! Response body handling shared by every provider request: gzip decoding,
//! best-effort text decoding, and classification of non-2xx statuses into
//! the crate's error kinds.

use chrono::{DateTime, TimeZone, Utc};
use flate2::read::GzDecoder;
use reqwest::header::{HeaderMap, CONTENT_ENCODING};
use serde::Deserialize;
use std::io::Read;

use crate::error::{Error, Result};

/// Undo `Content-Encoding: gzip` when the server applied it.
pub fn decode_body(headers: &HeaderMap, raw: &[u8]) -> Result<Vec<u8>> {
    let gzipped = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);
    if !gzipped {
        return Ok(raw.to_vec());
    }

    let mut decoded = Vec::new();
    GzDecoder::new(raw)
        .read_to_end(&mut decoded)
        .map_err(|e| Error::protocol(format!("error decoding gzip response: {}", e)))?;
    Ok(decoded)
}

/// UTF-8 when valid, otherwise ISO-8859-1 (every byte maps to one char).
pub fn decode_text(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => body.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Map a non-2xx status and its decoded body to an error.
pub fn classify(status: u16, body: &[u8]) -> Error {
    let text = decode_text(body);
    tracing::error!(status, body = %text, "HTTP error");

    match status {
        403 => Error::Forbidden,
        429 => Error::RateLimited {
            resets_at: parse_resets_at(&text),
        },
        _ => Error::RequestFailed { status, body: text },
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Extract the reset instant from a 429 body.
///
/// The service embeds a JSON document as a string in `error.message`, so
/// this is two parses: the envelope, then the message text, which carries
/// `resetsAt` in Unix seconds.
pub fn parse_resets_at(body: &str) -> Option<DateTime<Utc>> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    let inner: serde_json::Value = serde_json::from_str(&envelope.error.message).ok()?;
    let resets_at = inner.get("resetsAt")?;
    let secs = resets_at
        .as_i64()
        .or_else(|| resets_at.as_f64().map(|f| f as i64))?;
    Utc.timestamp_opt(secs, 0).single()
}
