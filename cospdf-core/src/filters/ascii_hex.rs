use super::StreamFilter;
use crate::error::{PdfError, Result};
use crate::objects::Dictionary;

const NAME: &str = "ASCIIHexDecode";

/// Hexadecimal text encoding terminated by `>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiHexFilter;

impl StreamFilter for AsciiHexFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut result = Vec::with_capacity(input.len() / 2);
        let mut digits = input.iter().filter(|b| !b.is_ascii_whitespace());

        loop {
            let high = match digits.next() {
                Some(&b'>') | None => break,
                Some(&ch) => ch,
            };
            // odd digit count: the missing low digit is zero
            let (low, done) = match digits.next() {
                Some(&b'>') | None => (b'0', true),
                Some(&ch) => (ch, false),
            };

            result.push((hex_value(high)? << 4) | hex_value(low)?);
            if done {
                break;
            }
        }

        Ok(result)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut encoded = hex::encode_upper(input).into_bytes();
        encoded.push(b'>');
        Ok(encoded)
    }
}

fn hex_value(ch: u8) -> Result<u8> {
    match ch {
        b'0'..=b'9' => Ok(ch - b'0'),
        b'A'..=b'F' => Ok(ch - b'A' + 10),
        b'a'..=b'f' => Ok(ch - b'a' + 10),
        _ => Err(PdfError::filter(
            NAME,
            format!("invalid hex digit: {}", ch as char),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        assert_eq!(AsciiHexFilter.decode(b"48656C6C6F>", None).unwrap(), b"Hello");
        assert_eq!(
            AsciiHexFilter.decode(b"48 65\n6c 6C\r\n6f>", None).unwrap(),
            b"Hello"
        );
    }

    #[test]
    fn test_decode_odd_digit_count() {
        assert_eq!(AsciiHexFilter.decode(b"414>", None).unwrap(), vec![0x41, 0x40]);
    }

    #[test]
    fn test_decode_without_terminator() {
        assert_eq!(AsciiHexFilter.decode(b"4142", None).unwrap(), b"AB");
    }

    #[test]
    fn test_decode_stops_at_terminator() {
        assert_eq!(AsciiHexFilter.decode(b"41>zz", None).unwrap(), b"A");
        assert_eq!(AsciiHexFilter.decode(b"414>zz", None).unwrap(), vec![0x41, 0x40]);
    }

    #[test]
    fn test_decode_invalid_digit() {
        assert!(AsciiHexFilter.decode(b"4G>", None).is_err());
    }

    #[test]
    fn test_encode_uppercase() {
        assert_eq!(
            AsciiHexFilter.encode(&[0xde, 0xad, 0x01], None).unwrap(),
            b"DEAD01>"
        );
        assert_eq!(AsciiHexFilter.encode(b"", None).unwrap(), b">");
    }
}
