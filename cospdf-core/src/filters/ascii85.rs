use super::StreamFilter;
use crate::error::{PdfError, Result};
use crate::objects::Dictionary;

const NAME: &str = "ASCII85Decode";

/// Base-85 text encoding terminated by `~>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascii85Filter;

impl StreamFilter for Ascii85Filter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut data = input;
        if let Some(rest) = skip_whitespace(data).strip_prefix(b"<~") {
            data = rest;
        }

        let mut result = Vec::with_capacity(data.len() * 4 / 5);
        let mut group = [0u8; 5];
        let mut filled = 0;
        let mut chars = data.iter().filter(|b| !b.is_ascii_whitespace());

        while let Some(&c) = chars.next() {
            match c {
                b'~' => {
                    if chars.next() != Some(&b'>') {
                        return Err(PdfError::filter(NAME, "invalid end marker"));
                    }
                    break;
                }
                b'z' if filled == 0 => result.extend_from_slice(&[0, 0, 0, 0]),
                b'!'..=b'u' => {
                    group[filled] = c;
                    filled += 1;
                    if filled == 5 {
                        result.extend_from_slice(&group_value(&group)?.to_be_bytes());
                        filled = 0;
                    }
                }
                _ => {
                    return Err(PdfError::filter(
                        NAME,
                        format!("invalid character: {}", c as char),
                    ))
                }
            }
        }

        if filled == 1 {
            return Err(PdfError::filter(NAME, "final group has a single character"));
        }
        if filled > 1 {
            group[filled..].fill(b'u');
            let bytes = group_value(&group)?.to_be_bytes();
            result.extend_from_slice(&bytes[..filled - 1]);
        }

        Ok(result)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut encoded = Vec::with_capacity(input.len() * 5 / 4 + 2);

        for chunk in input.chunks(4) {
            if chunk == [0, 0, 0, 0] {
                encoded.push(b'z');
                continue;
            }
            let mut padded = [0u8; 4];
            padded[..chunk.len()].copy_from_slice(chunk);
            let mut value = u32::from_be_bytes(padded);

            let mut digits = [0u8; 5];
            for digit in digits.iter_mut().rev() {
                *digit = (value % 85) as u8 + b'!';
                value /= 85;
            }
            encoded.extend_from_slice(&digits[..chunk.len() + 1]);
        }

        encoded.extend_from_slice(b"~>");
        Ok(encoded)
    }
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[start..]
}

fn group_value(group: &[u8; 5]) -> Result<u32> {
    let value = group
        .iter()
        .fold(0u64, |acc, &ch| acc * 85 + u64::from(ch - b'!'));
    u32::try_from(value).map_err(|_| PdfError::filter(NAME, "group value out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_value() {
        assert_eq!(Ascii85Filter.decode(b"87cURD]i,\"Ebo80~>", None).unwrap(), b"Hello World");
    }

    #[test]
    fn test_decode_with_prefix_and_whitespace() {
        assert_eq!(
            Ascii85Filter.decode(b"  <~87cUR\nD]i,\"Ebo80~>", None).unwrap(),
            b"Hello World"
        );
    }

    #[test]
    fn test_z_shortcut() {
        assert_eq!(Ascii85Filter.decode(b"z~>", None).unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(Ascii85Filter.encode(&[0, 0, 0, 0], None).unwrap(), b"z~>");
    }

    #[test]
    fn test_partial_group_roundtrip() {
        for len in 0..9 {
            let data: Vec<u8> = (0..len).map(|i| (i * 37 + 5) as u8).collect();
            let encoded = Ascii85Filter.encode(&data, None).unwrap();
            assert_eq!(Ascii85Filter.decode(&encoded, None).unwrap(), data);
        }
    }

    #[test]
    fn test_invalid_character() {
        assert!(Ascii85Filter.decode(b"87cU{~>", None).is_err());
    }

    #[test]
    fn test_overflowing_group() {
        assert!(Ascii85Filter.decode(b"uuuuu~>", None).is_err());
    }

    #[test]
    fn test_bad_end_marker() {
        assert!(Ascii85Filter.decode(b"87cUR~x", None).is_err());
    }
}
