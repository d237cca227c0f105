//! Lowercase hex encoding as used by the audit log and the CLI.

use crate::error::{Error, Result};

/// Encode bytes as lowercase hex with no separators.
pub fn encode(data: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";

    let mut out = String::with_capacity(data.len() * 2);
    for &b in data {
        out.push(char::from(DIGITS[usize::from(b >> 4)]));
        out.push(char::from(DIGITS[usize::from(b & 0x0F)]));
    }
    out
}

/// Decode a hex string (either case, no separators) into bytes.
///
/// Surrounding whitespace is ignored.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return Err(Error::InvalidHex(format!(
            "odd number of digits ({})",
            text.len()
        )));
    }

    text.as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let hi = nibble(pair[0]);
            let lo = nibble(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
                _ => Err(Error::InvalidHex(format!(
                    "invalid digit near position {}",
                    i * 2
                ))),
            }
        })
        .collect()
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
