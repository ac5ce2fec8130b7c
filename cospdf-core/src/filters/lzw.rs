use super::predictor::{decode_predictor, DecodeParams};
use super::StreamFilter;
use crate::error::{PdfError, Result};
use crate::objects::Dictionary;
use weezl::{decode::Decoder, encode::Encoder, BitOrder};

const NAME: &str = "LZWDecode";

/// LZW compression: MSB-first codes starting at 9 bits.
///
/// `/EarlyChange 1` (the default) switches code width one code early, which is what
/// weezl calls the TIFF size switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LzwFilter;

fn early_change(params: Option<&Dictionary>) -> Result<bool> {
    match params.and_then(|p| p.get_integer("EarlyChange")) {
        None | Some(1) => Ok(true),
        Some(0) => Ok(false),
        Some(other) => Err(PdfError::UnsupportedFilterParameter {
            key: "EarlyChange".to_string(),
            value: other.to_string(),
        }),
    }
}

impl StreamFilter for LzwFilter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut decoder = if early_change(params)? {
            Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            Decoder::new(BitOrder::Msb, 8)
        };
        let decoded = decoder
            .decode(input)
            .map_err(|e| PdfError::filter(NAME, format!("{e:?}")))?;
        decode_predictor(decoded, &DecodeParams::from_dictionary(params)?)
    }

    fn encode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut encoder = if early_change(params)? {
            Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            Encoder::new(BitOrder::Msb, 8)
        };
        encoder
            .encode(input)
            .map_err(|e| PdfError::filter(NAME, format!("{e:?}")))
    }

    fn effective_parameters(&self, params: Option<&Dictionary>) -> Option<Dictionary> {
        let params = params?;
        let mut effective = DecodeParams::from_dictionary(Some(params)).ok()?.to_dictionary();
        effective.set("EarlyChange", i64::from(early_change(Some(params)).ok()?));
        Some(effective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"TOBEORNOTTOBEORTOBEORNOT#TOBEORNOTTOBEORTOBEORNOT";
        let encoded = LzwFilter.encode(data, None).unwrap();
        assert_eq!(LzwFilter.decode(&encoded, None).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_without_early_change() {
        let mut params = Dictionary::new();
        params.set("EarlyChange", 0);
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 251) as u8).collect();
        let encoded = LzwFilter.encode(&data, Some(&params)).unwrap();
        assert_eq!(LzwFilter.decode(&encoded, Some(&params)).unwrap(), data);
    }

    #[test]
    fn test_long_input_crosses_code_widths() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
        let encoded = LzwFilter.encode(&data, None).unwrap();
        assert_eq!(LzwFilter.decode(&encoded, None).unwrap(), data);
    }

    #[test]
    fn test_invalid_early_change() {
        let mut params = Dictionary::new();
        params.set("EarlyChange", 5);
        assert!(LzwFilter.decode(&[0x80], Some(&params)).is_err());
    }
}
