//! Unpadded base64 shared by Position IDs and Match IDs.
//!
//! Groups of 3 bytes become 4 characters, most significant bits first.
//! A trailing single byte becomes 2 characters and a trailing pair becomes 3.

use arrayvec::ArrayString;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Characters needed to encode `bytes` bytes.
pub(crate) const fn encoded_len(bytes: usize) -> usize {
    (bytes * 8 + 5) / 6
}

/// Map a character of the alphabet to its 6 bit value.
pub(crate) const fn value(ch: u8) -> Option<u8> {
    match ch {
        b'A'..=b'Z' => Some(ch - b'A'),
        b'a'..=b'z' => Some(ch - b'a' + 26),
        b'0'..=b'9' => Some(ch - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[inline(always)]
fn symbol(sextet: u8) -> char {
    ALPHABET[usize::from(sextet & 0x3f)] as char
}

/// Encode bytes into a fixed capacity string. CAP must be at least `encoded_len(bytes.len())`.
pub(crate) fn encode<const CAP: usize>(bytes: &[u8]) -> ArrayString<CAP> {
    debug_assert!(CAP >= encoded_len(bytes.len()));
    let mut encoded = ArrayString::new();

    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied().unwrap_or(0);
        let b2 = chunk.get(2).copied().unwrap_or(0);

        encoded.push(symbol(b0 >> 2));
        encoded.push(symbol((b0 & 0x03) << 4 | b1 >> 4));
        if chunk.len() > 1 {
            encoded.push(symbol((b1 & 0x0f) << 2 | b2 >> 6));
        }
        if chunk.len() > 2 {
            encoded.push(symbol(b2));
        }
    }

    encoded
}

/// Decode text into `out`, which must be exactly as long as the bytes text encodes.
/// Returns None on a length mismatch or a character outside the alphabet.
/// Unused low bits of the last character are ignored.
pub(crate) fn decode(text: &str, out: &mut [u8]) -> Option<()> {
    if text.len() != encoded_len(out.len()) {
        return None;
    }

    let mut sextets = [0u8; 4];
    for (chunk, bytes) in text.as_bytes().chunks(4).zip(out.chunks_mut(3)) {
        for (sextet, &ch) in sextets.iter_mut().zip(chunk) {
            *sextet = value(ch)?;
        }

        bytes[0] = sextets[0] << 2 | sextets[1] >> 4;
        if bytes.len() > 1 {
            bytes[1] = sextets[1] << 4 | sextets[2] >> 2;
        }
        if bytes.len() > 2 {
            bytes[2] = sextets[2] << 6 | sextets[3];
        }
    }

    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_values() {
        for (index, &ch) in ALPHABET.iter().enumerate() {
            assert_eq!(value(ch), Some(index as u8));
        }
        assert_eq!(value(b'='), None);
        assert_eq!(value(b' '), None);
    }

    #[test]
    fn encode_known_bytes() {
        let encoded: ArrayString<4> = encode(b"Man");
        assert_eq!(encoded.as_str(), "TWFu");
        let encoded: ArrayString<3> = encode(b"Ma");
        assert_eq!(encoded.as_str(), "TWE");
        let encoded: ArrayString<2> = encode(b"M");
        assert_eq!(encoded.as_str(), "TQ");
    }

    #[test]
    fn decode_known_text() {
        let mut out = [0u8; 3];
        assert_eq!(decode("TWFu", &mut out), Some(()));
        assert_eq!(&out, b"Man");

        let mut out = [0u8; 1];
        // Low bits of the last character are ignored.
        assert_eq!(decode("TR", &mut out), Some(()));
        assert_eq!(&out, b"M");

        assert_eq!(decode("TWF", &mut [0u8; 3]), None);
        assert_eq!(decode("TW=u", &mut [0u8; 3]), None);
    }
}
