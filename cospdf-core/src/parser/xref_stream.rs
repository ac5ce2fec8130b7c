//! Cross-Reference Stream Parser
//!
//! Decodes the binary records of a cross-reference stream according to ISO 32000-1
//! Section 7.5.8. Records are fixed width, with the field widths given by `/W`.

use super::xref::{XrefEntry, XrefVisitor};
use super::{ParseError, ParseResult};
use crate::error::Result;
use crate::objects::{Dictionary, Object, Stream};
use tracing::debug;

/// Field widths from `/W`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWidths {
    pub entry_type: usize,
    pub field2: usize,
    pub field3: usize,
}

impl FieldWidths {
    pub fn from_dictionary(dict: &Dictionary) -> ParseResult<Self> {
        let widths = dict
            .get("W")
            .and_then(Object::as_array)
            .ok_or_else(|| ParseError::MissingKey("W".to_string()))?;

        if widths.len() != 3 {
            return Err(ParseError::InvalidXRef(format!(
                "/W must have 3 entries, found {}",
                widths.len()
            )));
        }

        let mut parsed = [0usize; 3];
        for (slot, width) in parsed.iter_mut().zip(widths) {
            *slot = width
                .as_integer()
                .and_then(|w| usize::try_from(w).ok())
                .filter(|&w| w <= 8)
                .ok_or_else(|| ParseError::InvalidXRef(format!("invalid /W entry {width:?}")))?;
        }

        Ok(Self {
            entry_type: parsed[0],
            field2: parsed[1],
            field3: parsed[2],
        })
    }

    pub fn record_size(&self) -> usize {
        self.entry_type + self.field2 + self.field3
    }
}

/// `/Index` as (first object number, count) pairs, defaulting to `[0 /Size]`.
pub fn subsections(dict: &Dictionary) -> ParseResult<Vec<(u32, u32)>> {
    let as_u32 = |obj: &Object| obj.as_integer().and_then(|i| u32::try_from(i).ok());

    match dict.get("Index").and_then(Object::as_array) {
        Some(index) => {
            if index.len() % 2 != 0 {
                return Err(ParseError::InvalidXRef(
                    "/Index must contain pairs".to_string(),
                ));
            }
            index
                .chunks(2)
                .map(|pair| match (as_u32(&pair[0]), as_u32(&pair[1])) {
                    (Some(first), Some(count)) => Ok((first, count)),
                    _ => Err(ParseError::InvalidXRef(format!(
                        "invalid /Index pair {pair:?}"
                    ))),
                })
                .collect()
        }
        None => {
            let size = dict
                .get("Size")
                .and_then(as_u32)
                .ok_or_else(|| ParseError::MissingKey("Size".to_string()))?;
            Ok(vec![(0, size)])
        }
    }
}

/// Parse decoded xref stream `data` described by `dict`, reporting through `visitor`.
///
/// Returns the number of records reported, which is the sum of all subsection counts.
pub fn parse_xref_stream_data(
    dict: &Dictionary,
    data: &[u8],
    visitor: &mut dyn XrefVisitor,
) -> ParseResult<usize> {
    let widths = FieldWidths::from_dictionary(dict)?;
    let sections = subsections(dict)?;
    let record_size = widths.record_size();
    if record_size == 0 {
        return Err(ParseError::InvalidXRef("/W describes empty records".to_string()));
    }

    let total: usize = sections.iter().map(|&(_, count)| count as usize).sum();
    let needed = total
        .checked_mul(record_size)
        .ok_or_else(|| ParseError::InvalidXRef("/Index is too large".to_string()))?;
    if data.len() < needed {
        return Err(ParseError::InvalidXRef(format!(
            "xref stream holds {} bytes, {} records need {}",
            data.len(),
            total,
            needed
        )));
    }

    visitor.on_trailer_found(dict);

    let mut records = data.chunks_exact(record_size);
    for (first, count) in sections {
        for i in 0..count {
            let record = records
                .next()
                .ok_or_else(|| ParseError::InvalidXRef("truncated xref stream".to_string()))?;
            let number = first.saturating_add(i);
            let entry = decode_record(record, &widths)?;
            if entry.is_in_use() {
                visitor.on_entry_found(number, entry);
            } else {
                visitor.on_free_entry(number, entry);
            }
        }
    }

    debug!("Parsed xref stream with {} records", total);
    Ok(total)
}

/// Decode the stream payload and parse its records.
pub fn parse_xref_stream(stream: &mut Stream, visitor: &mut dyn XrefVisitor) -> Result<usize> {
    let data = stream.unfiltered_bytes()?.to_vec();
    Ok(parse_xref_stream_data(stream.dictionary(), &data, visitor)?)
}

fn decode_record(record: &[u8], widths: &FieldWidths) -> ParseResult<XrefEntry> {
    let (type_field, rest) = record.split_at(widths.entry_type);
    let (field2, field3) = rest.split_at(widths.field2);

    // a zero-width type field means every record is in use
    let entry_type = if widths.entry_type == 0 {
        1
    } else {
        read_field(type_field)
    };
    let field2 = read_field(field2);
    let field3 = read_field(field3);

    match entry_type {
        0 => Ok(XrefEntry::Free {
            next_free: field2 as u32,
            generation: field3 as u16,
        }),
        1 => Ok(XrefEntry::Normal {
            offset: field2,
            generation: field3 as u16,
        }),
        2 => Ok(XrefEntry::Compressed {
            container: field2 as u32,
            index: field3 as u32,
        }),
        other => Err(ParseError::InvalidXRefEntryType(other)),
    }
}

/// Big-endian unsigned integer of at most 8 bytes.
fn read_field(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |value, &byte| (value << 8) | u64::from(byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xref::XrefSection;

    fn widths_dict(w: [i64; 3]) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XRef"));
        dict.set(
            "W",
            Object::Array(w.iter().map(|&i| Object::Integer(i)).collect()),
        );
        dict
    }

    #[test]
    fn test_read_field_is_big_endian() {
        assert_eq!(read_field(&[]), 0);
        assert_eq!(read_field(&[0x01, 0x02]), 0x0102);
        assert_eq!(read_field(&[0xFF, 0, 0, 1]), 0xFF00_0001);
    }

    #[test]
    fn test_zero_width_type_defaults_to_in_use() {
        let mut dict = widths_dict([0, 2, 1]);
        dict.set("Size", 2);
        let data = [0x00, 0x10, 0x00, 0x00, 0x20, 0x03];
        let mut section = XrefSection::default();
        assert_eq!(parse_xref_stream_data(&dict, &data, &mut section).unwrap(), 2);
        assert_eq!(
            section.entries,
            vec![
                (
                    0,
                    XrefEntry::Normal {
                        offset: 16,
                        generation: 0
                    }
                ),
                (
                    1,
                    XrefEntry::Normal {
                        offset: 32,
                        generation: 3
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_multiple_index_ranges() {
        let mut dict = widths_dict([1, 1, 1]);
        dict.set("Size", 12);
        dict.set(
            "Index",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(10),
                Object::Integer(2),
            ]),
        );
        let data = [0, 0, 255, 1, 9, 0, 2, 5, 3];
        let mut section = XrefSection::default();
        parse_xref_stream_data(&dict, &data, &mut section).unwrap();
        let numbers: Vec<u32> = section.entries.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![0, 10, 11]);
        assert_eq!(
            section.entries[2].1,
            XrefEntry::Compressed {
                container: 5,
                index: 3
            }
        );
    }

    #[test]
    fn test_missing_w_and_size() {
        let mut section = XrefSection::default();
        assert!(matches!(
            parse_xref_stream_data(&Dictionary::new(), &[], &mut section),
            Err(ParseError::MissingKey(_))
        ));
        assert!(matches!(
            parse_xref_stream_data(&widths_dict([1, 1, 1]), &[], &mut section),
            Err(ParseError::MissingKey(_))
        ));
    }

    #[test]
    fn test_truncated_data_is_rejected_before_callbacks() {
        let mut dict = widths_dict([1, 2, 1]);
        dict.set("Size", 3);
        let mut section = XrefSection::default();
        assert!(parse_xref_stream_data(&dict, &[1, 0, 10, 0], &mut section).is_err());
        assert!(section.trailer.is_none());
        assert!(section.entries.is_empty());
    }

    #[test]
    fn test_odd_index_is_rejected() {
        let mut dict = widths_dict([1, 1, 1]);
        dict.set("Index", Object::Array(vec![Object::Integer(0)]));
        assert!(subsections(&dict).is_err());
    }
}
