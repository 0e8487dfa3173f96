//! Percent-encoding for query string values.
//!
//! Values are treated as raw bytes. Only RFC 3986 unreserved characters
//! survive unchanged; every other byte, including each byte of a multi-byte
//! UTF-8 sequence or of an argument that is not UTF-8 at all, becomes an
//! uppercase `%XX` escape.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};

/// Bytes escaped inside a query value: everything except `[A-Za-z0-9._~-]`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Worst-case growth factor of an encoded value relative to its input.
pub(crate) const CAPACITY_FACTOR: usize = 4;

/// Encodes query values into output bounded by a fixed capacity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueryEncoder {
    capacity: usize,
}

impl QueryEncoder {
    pub(crate) const fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Sizes the encoder so that `raw` always fits.
    pub(crate) const fn for_input(raw: &[u8]) -> Self {
        Self::with_capacity(raw.len().saturating_mul(CAPACITY_FACTOR))
    }

    /// Encodes `raw`, stopping before the output would exceed the capacity.
    ///
    /// Escapes are never split: when a `%XX` sequence does not fit, encoding
    /// ends before it.
    pub(crate) fn encode(&self, raw: &[u8]) -> String {
        let mut encoded = String::with_capacity(self.capacity.min(raw.len() * 3));
        for chunk in percent_encode(raw, QUERY_VALUE) {
            let remaining = self.capacity - encoded.len();
            if chunk.starts_with('%') {
                if chunk.len() > remaining {
                    break;
                }
                encoded.push_str(chunk);
                continue;
            }
            // Unescaped runs are plain ASCII, so any prefix is a valid slice.
            let take = chunk.len().min(remaining);
            encoded.push_str(chunk.get(..take).unwrap_or_default());
            if take < chunk.len() {
                break;
            }
        }
        encoded
    }
}

/// Encodes a user-supplied value with a capacity that never truncates.
pub(crate) fn encode_query_value(raw: &[u8]) -> String {
    QueryEncoder::for_input(raw).encode(raw)
}
