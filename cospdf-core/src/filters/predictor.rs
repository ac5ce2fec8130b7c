//! Predictor post-processing for FlateDecode and LZWDecode (ISO 32000-1 Table 8)

use crate::error::{PdfError, Result};
use crate::objects::Dictionary;

/// Predictor settings read from a `/DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeParams {
    /// 1 = none, 2 = TIFF, 10-15 = PNG
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl DecodeParams {
    pub fn from_dictionary(params: Option<&Dictionary>) -> Result<Self> {
        let mut decoded = Self::default();
        let Some(params) = params else {
            return Ok(decoded);
        };

        if let Some(predictor) = params.get_integer("Predictor") {
            decoded.predictor = predictor;
        }
        decoded.colors = positive(params, "Colors", decoded.colors)?;
        decoded.bits_per_component =
            positive(params, "BitsPerComponent", decoded.bits_per_component)?;
        decoded.columns = positive(params, "Columns", decoded.columns)?;
        Ok(decoded)
    }

    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Predictor", self.predictor);
        dict.set("Colors", self.colors);
        dict.set("BitsPerComponent", self.bits_per_component);
        dict.set("Columns", self.columns);
        dict
    }

    pub fn has_predictor(&self) -> bool {
        self.predictor > 1
    }

    fn bits_per_pixel(&self) -> Result<usize> {
        self.colors
            .checked_mul(self.bits_per_component)
            .ok_or_else(|| unsupported("Colors", self.colors))
    }

    fn bytes_per_pixel(&self) -> Result<usize> {
        Ok(self.bits_per_pixel()?.div_ceil(8))
    }

    /// Row size in bytes. A row longer than the whole decoded payload cannot come from a
    /// real image and is rejected before anything is allocated for it.
    fn bytes_per_row(&self, data_len: usize) -> Result<usize> {
        let row_len = self
            .bits_per_pixel()?
            .checked_mul(self.columns)
            .ok_or_else(|| unsupported("Columns", self.columns))?
            .div_ceil(8);
        if row_len > data_len.max(1) {
            return Err(unsupported("Columns", self.columns));
        }
        Ok(row_len)
    }
}

fn unsupported(key: &str, value: impl ToString) -> PdfError {
    PdfError::UnsupportedFilterParameter {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn positive(params: &Dictionary, key: &str, default: usize) -> Result<usize> {
    match params.get_integer(key) {
        None => Ok(default),
        Some(value) => usize::try_from(value)
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| unsupported(key, value)),
    }
}

/// Undo the predictor applied before compression.
pub fn decode_predictor(data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data),
        2 => decode_tiff(data, params),
        10..=15 => decode_png(&data, params),
        other => Err(PdfError::UnsupportedFilterParameter {
            key: "Predictor".to_string(),
            value: other.to_string(),
        }),
    }
}

fn decode_tiff(mut data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(PdfError::UnsupportedFilterParameter {
            key: "BitsPerComponent".to_string(),
            value: params.bits_per_component.to_string(),
        });
    }
    let row_len = params.bytes_per_row(data.len())?;
    let colors = params.colors;
    for row in data.chunks_mut(row_len) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    Ok(data)
}

fn decode_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row_len = params.bytes_per_row(data.len())?;
    let bpp = params.bytes_per_pixel()?.max(1);
    let mut output = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];

    // a trailing partial row is decoded as far as it goes
    for chunk in data.chunks(row_len + 1) {
        let Some((&tag, encoded)) = chunk.split_first() else {
            continue;
        };
        let mut row = encoded.to_vec();

        match tag {
            0 => {}
            1 => {
                for i in bpp..row.len() {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            2 => {
                for (i, byte) in row.iter_mut().enumerate() {
                    *byte = byte.wrapping_add(previous[i]);
                }
            }
            3 => {
                for i in 0..row.len() {
                    let left = if i >= bpp { row[i - bpp] as u16 } else { 0 };
                    let up = previous[i] as u16;
                    row[i] = row[i].wrapping_add(((left + up) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row.len() {
                    let left = if i >= bpp { row[i - bpp] as i16 } else { 0 };
                    let up = previous[i] as i16;
                    let up_left = if i >= bpp { previous[i - bpp] as i16 } else { 0 };
                    row[i] = row[i].wrapping_add(paeth(left, up, up_left) as u8);
                }
            }
            other => {
                return Err(PdfError::filter(
                    "Predictor",
                    format!("invalid PNG predictor tag {other}"),
                ))
            }
        }

        output.extend_from_slice(&row);
        previous[..row.len()].copy_from_slice(&row);
    }

    Ok(output)
}

fn paeth(a: i16, b: i16, c: i16) -> i16 {
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
