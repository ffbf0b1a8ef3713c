//! Request body decoding for `/api/put` batches.

use crate::core::{DataPoint, ExporterError, Result};
use flate2::read::GzDecoder;
use std::io::{self, Read};

/// Media type scollector declares for its batches.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Returns true if the declared content type is JSON. Parameters such as
/// `charset` are ignored.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Returns true if the body is gzip-compressed.
pub fn is_gzip_encoding(content_encoding: Option<&str>) -> bool {
    content_encoding
        .map(|value| value.trim().eq_ignore_ascii_case("gzip"))
        .unwrap_or(false)
}

/// Decode a batch body, decompressing it first when `gzip` is set.
///
/// Decompressed output larger than `max_decoded_bytes` is rejected.
pub fn decode_batch(body: &[u8], gzip: bool, max_decoded_bytes: usize) -> Result<Vec<DataPoint>> {
    if !gzip {
        return serde_json::from_slice(body).map_err(ExporterError::Decode);
    }

    let limit = u64::try_from(max_decoded_bytes).unwrap_or(u64::MAX);
    let mut decoded = Vec::with_capacity(body.len().saturating_mul(4).min(max_decoded_bytes));
    GzDecoder::new(body)
        .take(limit.saturating_add(1))
        .read_to_end(&mut decoded)
        .map_err(ExporterError::Decompress)?;

    if decoded.len() > max_decoded_bytes {
        return Err(ExporterError::Decompress(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed body exceeds {} bytes", max_decoded_bytes),
        )));
    }

    serde_json::from_slice(&decoded).map_err(ExporterError::Decode)
}
