use super::StreamFilter;
use crate::error::{PdfError, Result};
use crate::objects::Dictionary;

const NAME: &str = "RunLengthDecode";
const EOD: u8 = 128;
const MAX_RUN: usize = 128;

/// Byte-oriented run-length encoding.
///
/// A length byte `0..=127` copies the next `n + 1` bytes, `129..=255` repeats the next
/// byte `257 - n` times and `128` ends the data.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLengthFilter;

impl StreamFilter for RunLengthFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() * 2);
        let mut i = 0;

        while i < input.len() {
            let length = input[i];
            i += 1;

            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    let literal = input.get(i..i + count).ok_or_else(|| {
                        PdfError::filter(
                            NAME,
                            format!(
                                "literal run needs {count} bytes, {} left",
                                input.len() - i
                            ),
                        )
                    })?;
                    output.extend_from_slice(literal);
                    i += count;
                }
                EOD => break,
                129..=255 => {
                    let byte = *input
                        .get(i)
                        .ok_or_else(|| PdfError::filter(NAME, "missing byte for repeat run"))?;
                    i += 1;
                    output.resize(output.len() + 257 - length as usize, byte);
                }
            }
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() + input.len() / MAX_RUN + 2);
        let mut literal_start = 0;
        let mut i = 0;

        while i < input.len() {
            let byte = input[i];
            let run = input[i..]
                .iter()
                .take(MAX_RUN)
                .take_while(|&&b| b == byte)
                .count();

            if run >= 2 {
                flush_literal(&mut output, &input[literal_start..i]);
                output.push((257 - run) as u8);
                output.push(byte);
                i += run;
                literal_start = i;
            } else {
                i += 1;
            }
        }
        flush_literal(&mut output, &input[literal_start..]);
        output.push(EOD);

        Ok(output)
    }
}

fn flush_literal(output: &mut Vec<u8>, literal: &[u8]) {
    for chunk in literal.chunks(MAX_RUN) {
        output.push((chunk.len() - 1) as u8);
        output.extend_from_slice(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_literal() {
        let input = [4, b'H', b'e', b'l', b'l', b'o', EOD];
        assert_eq!(RunLengthFilter.decode(&input, None).unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_repeat() {
        let input = [253, b'A', EOD];
        assert_eq!(RunLengthFilter.decode(&input, None).unwrap(), b"AAAA");
    }

    #[test]
    fn test_decode_ignores_bytes_after_eod() {
        let input = [0, b'x', EOD, 5, 5, 5];
        assert_eq!(RunLengthFilter.decode(&input, None).unwrap(), b"x");
    }

    #[test]
    fn test_decode_truncated_literal() {
        assert!(RunLengthFilter.decode(&[4, b'H', b'i'], None).is_err());
        assert!(RunLengthFilter.decode(&[200], None).is_err());
    }

    #[test]
    fn test_encode_mixed_runs() {
        let encoded = RunLengthFilter.encode(b"abcccccd", None).unwrap();
        assert_eq!(encoded, vec![1, b'a', b'b', 252, b'c', 0, b'd', EOD]);
    }

    #[test]
    fn test_encode_long_runs_split() {
        let data = vec![9u8; 300];
        let encoded = RunLengthFilter.encode(&data, None).unwrap();
        assert_eq!(RunLengthFilter.decode(&encoded, None).unwrap(), data);
        assert_eq!(encoded.len(), 2 + 2 + 2 + 1);
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(RunLengthFilter.encode(b"", None).unwrap(), vec![EOD]);
    }
}
