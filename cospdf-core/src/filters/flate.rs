use super::predictor::{decode_predictor, DecodeParams};
use super::StreamFilter;
use crate::error::{PdfError, Result};
use crate::objects::Dictionary;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

const NAME: &str = "FlateDecode";

/// zlib/deflate compression.
///
/// Decoding requires a complete zlib stream: input that ends before the end-of-stream
/// marker is an error, so the retry logic can tell a truncated payload from a good one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlateFilter;

impl StreamFilter for FlateFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let params = DecodeParams::from_dictionary(params)?;
        let inflated = inflate(input)?;
        decode_predictor(inflated, &params)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(input)
            .map_err(|e| PdfError::filter(NAME, e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| PdfError::filter(NAME, e.to_string()))
    }

    fn effective_parameters(&self, params: Option<&Dictionary>) -> Option<Dictionary> {
        let params = params?;
        DecodeParams::from_dictionary(Some(params))
            .ok()
            .map(|p| p.to_dictionary())
    }
}

fn inflate(input: &[u8]) -> Result<Vec<u8>> {
    let mut decompress = Decompress::new(true);
    let mut output = Vec::with_capacity(input.len().saturating_mul(3).max(64));

    loop {
        if output.capacity() - output.len() < 1024 {
            output.reserve(output.capacity().max(1024));
        }
        let consumed = decompress.total_in() as usize;
        let produced = decompress.total_out();

        let status = decompress
            .decompress_vec(&input[consumed..], &mut output, FlushDecompress::None)
            .map_err(|e| PdfError::filter(NAME, e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(output),
            Status::Ok | Status::BufError => {
                let stalled = decompress.total_in() as usize == consumed
                    && decompress.total_out() == produced;
                if stalled {
                    return Err(PdfError::filter(
                        NAME,
                        format!(
                            "unexpected end of compressed data after {} bytes",
                            input.len()
                        ),
                    ));
                }
            }
        }
    }
}
