use crate::jvm::{Error, Version};

/// Encode a string into the modified UTF-8 format used in class files
///
/// The differences from regular UTF-8 are:
///
///   - `\u{0000}` is encoded as the two bytes `C0 80` (so no encoded string contains a zero byte)
///   - supplementary characters are encoded as a surrogate pair, each surrogate in 3 bytes
///
/// Class files older than version 48 predate the surrogate pair rule, so for those supplementary
/// characters keep their regular 4-byte UTF-8 encoding.
///
/// Fails if the encoding is too long to have its length stored in a `u2`.
pub fn encode_modified_utf8(string: &str, version: Version) -> Result<Vec<u8>, Error> {
    let buffer = encode_modified_utf8_unbounded(string, version);
    if buffer.len() > u16::MAX as usize {
        return Err(Error::Utf8TooLong(buffer.len()));
    }
    Ok(buffer)
}

/// Encode a string into modified UTF-8, without any limit on the length
///
/// This is only for `SourceDebugExtension`, which isn't length-prefixed by a `u2`.
pub fn encode_modified_utf8_unbounded(string: &str, version: Version) -> Vec<u8> {
    let surrogate_pairs = version >= Version::JAVA1_4;
    let mut buffer: Vec<u8> = Vec::with_capacity(string.len());
    for c in string.chars() {
        // Handle the exception for how `\u{0000}` is represented
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }

            // Supplementary characters: main divergence from unicode
            _ if surrogate_pairs => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x0F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            _ => {
                let mut utf8 = [0; 4];
                buffer.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buffer
}
