//! Cross-reference section writer
//!
//! Writes the xref section and trailer of a new revision, either as a classic table
//! (ISO 32000-1 Section 7.5.4) or as a cross-reference stream (Section 7.5.8).

use super::CosWriter;
use crate::error::Result;
use crate::objects::{Dictionary, Name, Object, ObjectId, Stream};
use crate::parser::XrefEntry;
use std::collections::BTreeMap;
use std::io::Write;

/// Entries of one new cross-reference section, ordered by object number.
#[derive(Debug, Clone, Default)]
pub struct XrefWriter {
    entries: BTreeMap<u32, XrefEntry>,
}

impl XrefWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_in_use_entry(&mut self, id: ObjectId, offset: u64) {
        self.entries.insert(
            id.number(),
            XrefEntry::Normal {
                offset,
                generation: id.generation(),
            },
        );
    }

    pub fn add_free_entry(&mut self, number: u32, next_free: u32, generation: u16) {
        self.entries.insert(
            number,
            XrefEntry::Free {
                next_free,
                generation,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs of consecutive object numbers as (first number, entries).
    pub fn subsections(&self) -> Vec<(u32, Vec<XrefEntry>)> {
        let mut subsections: Vec<(u32, Vec<XrefEntry>)> = Vec::new();
        for (&number, &entry) in &self.entries {
            match subsections.last_mut() {
                Some((first, run)) if *first as u64 + run.len() as u64 == number as u64 => {
                    run.push(entry)
                }
                _ => subsections.push((number, vec![entry])),
            }
        }
        subsections
    }

    /// Write `xref`, the subsections, `trailer` and the trailer dictionary, followed by
    /// `startxref`. Returns the offset of the `xref` keyword.
    pub fn write_table<W: Write>(
        &self,
        out: &mut CosWriter<W>,
        trailer: &mut Dictionary,
    ) -> Result<u64> {
        let xref_offset = out.position();
        out.write_bytes(b"xref")?;
        out.write_eol()?;

        for (first, run) in self.subsections() {
            out.write_bytes(format!("{} {}", first, run.len()).as_bytes())?;
            out.write_eol()?;
            for entry in run {
                // each record is exactly 20 bytes
                let record = match entry {
                    XrefEntry::Normal { offset, generation } => {
                        format!("{offset:010} {generation:05} n\r\n")
                    }
                    XrefEntry::Free {
                        next_free,
                        generation,
                    } => format!("{next_free:010} {generation:05} f\r\n"),
                    XrefEntry::Compressed { .. } => continue,
                };
                out.write_bytes(record.as_bytes())?;
            }
        }

        out.write_bytes(b"trailer")?;
        out.write_eol()?;
        out.write_dictionary(trailer)?;
        write_startxref(out, xref_offset)?;
        Ok(xref_offset)
    }

    /// Write the section as cross-reference stream object `stream_id`, whose dictionary
    /// carries the trailer entries. The stream's own entry is added here.
    pub fn write_stream<W: Write>(
        mut self,
        out: &mut CosWriter<W>,
        stream_id: ObjectId,
        trailer: Dictionary,
    ) -> Result<u64> {
        let xref_offset = out.position();
        self.add_in_use_entry(stream_id, xref_offset);

        let widths = self.field_widths();
        let mut index = Vec::new();
        let mut data = Vec::new();
        for (first, run) in self.subsections() {
            index.push(Object::from(first as i64));
            index.push(Object::from(run.len()));
            for entry in run {
                let (kind, field2, field3) = match entry {
                    XrefEntry::Free {
                        next_free,
                        generation,
                    } => (0, u64::from(next_free), u64::from(generation)),
                    XrefEntry::Normal { offset, generation } => {
                        (1, offset, u64::from(generation))
                    }
                    XrefEntry::Compressed { container, index } => {
                        (2, u64::from(container), u64::from(index))
                    }
                };
                write_field(&mut data, kind, widths[0]);
                write_field(&mut data, field2, widths[1]);
                write_field(&mut data, field3, widths[2]);
            }
        }

        let mut dict = trailer;
        dict.set("Type", Object::name("XRef"));
        dict.set(
            "W",
            Object::Array(widths.iter().map(|&w| Object::from(w)).collect()),
        );
        dict.set("Index", Object::Array(index));
        dict.set("Filter", Object::Name(Name::from("FlateDecode")));

        let mut object = Object::Stream(Stream::from_unfiltered(dict, data));
        out.write_indirect_object(stream_id, &mut object)?;
        write_startxref(out, xref_offset)?;
        Ok(xref_offset)
    }

    fn field_widths(&self) -> [usize; 3] {
        let mut widths = [1, 1, 1];
        for entry in self.entries.values() {
            let (field2, field3) = match *entry {
                XrefEntry::Free {
                    next_free,
                    generation,
                } => (u64::from(next_free), u64::from(generation)),
                XrefEntry::Normal { offset, generation } => (offset, u64::from(generation)),
                XrefEntry::Compressed { container, index } => {
                    (u64::from(container), u64::from(index))
                }
            };
            widths[1] = widths[1].max(bytes_needed(field2));
            widths[2] = widths[2].max(bytes_needed(field3));
        }
        widths
    }
}

fn write_startxref<W: Write>(out: &mut CosWriter<W>, xref_offset: u64) -> Result<()> {
    out.write_bytes(b"startxref")?;
    out.write_eol()?;
    out.write_bytes(xref_offset.to_string().as_bytes())?;
    out.write_eol()?;
    out.write_bytes(b"%%EOF")?;
    out.write_eol()
}

/// Calculate minimum bytes needed to represent a value
fn bytes_needed(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        ((value.ilog2() / 8) + 1) as usize
    }
}

/// Write a big-endian field with the specified width
fn write_field(data: &mut Vec<u8>, value: u64, width: usize) {
    for i in (0..width).rev() {
        data.push(((value >> (i * 8)) & 0xFF) as u8);
    }
}
