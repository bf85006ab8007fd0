//! C2: String Decoder — OSTA CS0 "dchars"/"dstring" to UTF-8.
//!
//! See UDF 2.60 2.1.3 ("dstring") and the OSTA CS0 UncompressUnicode
//! algorithm. An unrecognized compression id is a hard `InvalidString`
//! rather than a silently-empty string, and decoding never scans past
//! the caller-supplied slice for a terminator (the caller already bounds
//! it, either via the dstring length byte or an explicit FID name
//! length).

use crate::error::{Result, UdfError};

/// Decode a raw OSTA-compressed-Unicode byte run: a compression-id byte
/// (8 or 16) followed by the character data. Empty input yields an empty
/// string, never fails.
pub fn decode_dchars(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Ok(String::new());
    }
    let compression_id = bytes[0];
    let data = &bytes[1..];
    match compression_id {
        8 => Ok(data.iter().map(|&b| b as char).collect()),
        16 => {
            let mut s = String::with_capacity(data.len() / 2);
            for pair in data.chunks(2) {
                let unit = if pair.len() == 2 {
                    ((pair[0] as u16) << 8) | pair[1] as u16
                } else {
                    (pair[0] as u16) << 8
                };
                if let Some(c) = char::from_u32(unit as u32) {
                    s.push(c);
                }
            }
            Ok(s)
        }
        _ => Err(UdfError::InvalidString),
    }
}

/// Decode a fixed-size "dstring" field of declared size `field.len()`:
/// the used length is stored (clamped to `S-1`) in the last byte, and
/// only that many leading bytes are decoded as dchars.
pub fn decode_dstring(field: &[u8]) -> Result<String> {
    if field.is_empty() {
        return Ok(String::new());
    }
    let s = field.len();
    let used = (field[s - 1] as usize).min(s - 1);
    decode_dchars(&field[..used])
}

#[cfg(test)]
pub(crate) fn test_encode_dchars(s: &str) -> Vec<u8> {
    let needs_16bit = s.chars().any(|c| c as u32 > 0xFF);
    let mut out = Vec::new();
    if needs_16bit {
        out.push(16);
        for c in s.chars() {
            let u = c as u16;
            out.push((u >> 8) as u8);
            out.push((u & 0xFF) as u8);
        }
    } else {
        out.push(8);
        for c in s.chars() {
            out.push(c as u8);
        }
    }
    out
}
