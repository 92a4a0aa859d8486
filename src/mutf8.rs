//! The JVM's "modified UTF-8" string encoding.
//!
//! JVMTI hands out names and signatures in this form, and `DataOutputStream`
//! writes it. It differs from standard UTF-8 in two ways: NUL is encoded as
//! the two bytes `C0 80`, and characters outside the BMP are written as a
//! surrogate pair of three-byte sequences.

/// Encodes `s` as modified UTF-8.
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

/// Byte length of `encode(s)` without allocating.
pub fn encoded_len(s: &str) -> usize {
    s.encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007f => 1,
            0x0000..=0x07ff => 2,
            _ => 3,
        })
        .sum()
}

/// Decodes modified UTF-8. Malformed sequences become U+FFFD.
pub fn decode(bytes: &[u8]) -> String {
    if bytes.is_ascii() {
        // ASCII needs no decoding; this covers nearly every class and method name.
        return bytes.iter().map(|&b| b as char).collect();
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        let (unit, width) = match b0 >> 4 {
            0x0..=0x7 => (Some(b0 as u16), 1),
            0xc | 0xd => match bytes.get(i + 1) {
                Some(&b1) if b1 & 0xc0 == 0x80 => {
                    (Some(((b0 as u16 & 0x1f) << 6) | (b1 as u16 & 0x3f)), 2)
                }
                _ => (None, 1),
            },
            0xe => match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&b1), Some(&b2)) if b1 & 0xc0 == 0x80 && b2 & 0xc0 == 0x80 => (
                    Some(((b0 as u16 & 0x0f) << 12) | ((b1 as u16 & 0x3f) << 6) | (b2 as u16 & 0x3f)),
                    3,
                ),
                _ => (None, 1),
            },
            _ => (None, 1),
        };
        units.push(unit.unwrap_or(0xfffd));
        i += width;
    }
    String::from_utf16_lossy(&units)
}
