//! PostgreSQL `bytea` text encoding and decoding
//!
//! The server renders `bytea` values in one of two text formats, selected by
//! the `bytea_output` setting:
//!
//! - hex (default since 9.0): `\x` followed by two hex digits per byte
//! - escape: printable bytes as-is, a backslash as `\\`, and every other byte
//!   as a backslash followed by three octal digits
//!
//! Decoding accepts both. Encoding always produces the hex format.

use bytes::Bytes;

use crate::error::{Error, Result};

/// Decode the text form of a `bytea` value into raw bytes
pub fn unescape_bytea(text: &str) -> Result<Bytes> {
    match text.strip_prefix("\\x") {
        Some(digits) => hex::decode(digits)
            .map(Bytes::from)
            .map_err(|e| Error::DataConversion(format!("invalid hex bytea: {}", e))),
        None => unescape_escape_format(text.as_bytes()),
    }
}

/// Decode the legacy escape format
fn unescape_escape_format(data: &[u8]) -> Result<Bytes> {
    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;

    while pos < data.len() {
        let byte = data[pos];
        if byte != b'\\' {
            out.push(byte);
            pos += 1;
            continue;
        }

        match data.get(pos + 1) {
            Some(b'\\') => {
                out.push(b'\\');
                pos += 2;
            }
            Some(_) if is_octal_triplet(&data[pos + 1..]) => {
                let value = (data[pos + 1] - b'0') as u16 * 64
                    + (data[pos + 2] - b'0') as u16 * 8
                    + (data[pos + 3] - b'0') as u16;
                out.push(value as u8);
                pos += 4;
            }
            _ => {
                return Err(Error::DataConversion(format!(
                    "invalid escape sequence in bytea at offset {}",
                    pos
                )));
            }
        }
    }

    Ok(Bytes::from(out))
}

/// Check for three octal digits forming a value no greater than 0o377
fn is_octal_triplet(data: &[u8]) -> bool {
    data.len() >= 3
        && (b'0'..=b'3').contains(&data[0])
        && (b'0'..=b'7').contains(&data[1])
        && (b'0'..=b'7').contains(&data[2])
}

/// Encode raw bytes in the hex text format (`\x...`)
pub fn escape_bytea(data: &[u8]) -> String {
    let mut text = String::with_capacity(2 + data.len() * 2);
    text.push_str("\\x");
    text.push_str(&hex::encode(data));
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_hex_format() {
        let bytes = unescape_bytea("\\x48656c6c6f00ff").unwrap();
        assert_eq!(&bytes[..], b"Hello\x00\xff");
    }

    #[test]
    fn test_unescape_hex_uppercase_and_empty() {
        assert_eq!(&unescape_bytea("\\xDEADBEEF").unwrap()[..], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(unescape_bytea("\\x").unwrap().is_empty());
    }

    #[test]
    fn test_unescape_escape_format() {
        let bytes = unescape_bytea("ab\\\\c\\000\\377\\012").unwrap();
        assert_eq!(&bytes[..], b"ab\\c\x00\xff\n");
    }

    #[test]
    fn test_unescape_plain_text() {
        assert_eq!(&unescape_bytea("plain").unwrap()[..], b"plain");
    }

    #[test]
    fn test_unescape_rejects_malformed() {
        assert!(unescape_bytea("\\xabc").is_err()); // odd digit count
        assert!(unescape_bytea("\\xzz").is_err());
        assert!(unescape_bytea("trailing\\").is_err());
        assert!(unescape_bytea("\\400").is_err()); // out of byte range
        assert!(unescape_bytea("\\09").is_err());
    }

    #[test]
    fn test_escape_roundtrip() {
        let original: Vec<u8> = (0u8..=255).collect();
        let text = escape_bytea(&original);
        assert!(text.starts_with("\\x"));
        assert_eq!(&unescape_bytea(&text).unwrap()[..], &original[..]);
    }
}
