//! PDF Cross-Reference Table Parser
//!
//! Parses classic xref tables according to ISO 32000-1 Section 7.5.4 and holds the merged
//! index that cross-reference streams (Section 7.5.8) feed into as well.

use super::lexer::{Lexer, Token};
use super::objects::ObjectParser;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Dictionary, Object};
use std::collections::HashMap;
use tracing::debug;

/// `startxref` must appear within this many bytes of the end of the file.
const STARTXREF_SEARCH_WINDOW: usize = 1024;

/// Location of one object in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free { next_free: u32, generation: u16 },
    Normal { offset: u64, generation: u16 },
    /// Stored inside the object stream `container` at position `index`
    Compressed { container: u32, index: u32 },
}

impl XrefEntry {
    pub fn is_in_use(&self) -> bool {
        !matches!(self, XrefEntry::Free { .. })
    }

    /// Objects in object streams always have generation 0.
    pub fn generation(&self) -> u16 {
        match self {
            XrefEntry::Free { generation, .. } | XrefEntry::Normal { generation, .. } => {
                *generation
            }
            XrefEntry::Compressed { .. } => 0,
        }
    }
}

/// Callbacks driven by the xref table and xref stream parsers.
///
/// The trailer is reported once, before any entry. Every record of every subsection is
/// reported exactly once, in-use records through `on_entry_found` and free records through
/// `on_free_entry`.
pub trait XrefVisitor {
    fn on_trailer_found(&mut self, trailer: &Dictionary);

    fn on_entry_found(&mut self, number: u32, entry: XrefEntry);

    fn on_free_entry(&mut self, _number: u32, _entry: XrefEntry) {}
}

/// Entries and trailer of a single cross-reference section, in parse order.
#[derive(Debug, Clone, Default)]
pub struct XrefSection {
    pub trailer: Option<Dictionary>,
    pub entries: Vec<(u32, XrefEntry)>,
}

impl XrefVisitor for XrefSection {
    fn on_trailer_found(&mut self, trailer: &Dictionary) {
        self.trailer = Some(trailer.clone());
    }

    fn on_entry_found(&mut self, number: u32, entry: XrefEntry) {
        self.entries.push((number, entry));
    }

    fn on_free_entry(&mut self, number: u32, entry: XrefEntry) {
        self.entries.push((number, entry));
    }
}

/// Cross-reference index: object number to location, last writer wins.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    entries: HashMap<u32, XrefEntry>,
    highest_key: Option<u32>,
}

impl XrefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or override the entry for `number`.
    pub fn insert(&mut self, number: u32, entry: XrefEntry) {
        self.entries.insert(number, entry);
        self.highest_key = Some(self.highest_key.map_or(number, |h| h.max(number)));
    }

    /// Apply a section on top of what is already indexed.
    pub fn apply(&mut self, section: &XrefSection) {
        for &(number, entry) in &section.entries {
            self.insert(number, entry);
        }
    }

    pub fn get(&self, number: u32) -> Option<&XrefEntry> {
        self.entries.get(&number)
    }

    /// Highest object number seen in any section.
    pub fn highest_key(&self) -> u32 {
        self.highest_key.unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by object number.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XrefEntry)> {
        let mut numbers: Vec<_> = self.entries.keys().copied().collect();
        numbers.sort_unstable();
        numbers
            .into_iter()
            .filter_map(move |n| self.entries.get(&n).map(|e| (n, e)))
    }
}

/// Find the offset recorded after the last `startxref` keyword.
pub fn find_startxref(data: &[u8]) -> ParseResult<u64> {
    let window_start = data.len().saturating_sub(STARTXREF_SEARCH_WINDOW);
    let tail = &data[window_start..];
    let keyword = b"startxref";

    let found = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| ParseError::InvalidXRef("startxref not found".to_string()))?;

    let mut lexer = Lexer::at(data, window_start + found + keyword.len());
    match lexer.next_significant_token()? {
        Token::Integer(offset) if offset >= 0 => Ok(offset as u64),
        other => Err(ParseError::InvalidXRef(format!(
            "startxref is followed by {other:?}"
        ))),
    }
}

/// Parse a classic `xref` table and its trailer starting at `offset`.
///
/// Returns the offset just past the trailer dictionary.
pub fn parse_xref_table(
    data: &[u8],
    offset: usize,
    options: &ParseOptions,
    visitor: &mut dyn XrefVisitor,
) -> ParseResult<usize> {
    let mut lexer = Lexer::at(data, offset);
    lexer.expect(Token::XRef)?;

    let mut records = Vec::new();
    loop {
        match lexer.next_significant_token()? {
            Token::Trailer => break,
            Token::Integer(first) => {
                let count = match lexer.next_significant_token()? {
                    Token::Integer(count) => count,
                    other => {
                        return Err(ParseError::InvalidXRef(format!(
                            "subsection count expected, found {other:?}"
                        )))
                    }
                };
                let (first, count) = match (u32::try_from(first), u32::try_from(count)) {
                    (Ok(first), Ok(count)) => (first, count),
                    _ => {
                        return Err(ParseError::InvalidXRef(format!(
                            "invalid subsection {first} {count}"
                        )))
                    }
                };
                for i in 0..count {
                    let entry = parse_xref_record(&mut lexer)?;
                    records.push((first.saturating_add(i), entry));
                }
            }
            other => {
                return Err(ParseError::InvalidXRef(format!(
                    "unexpected {other:?} in xref table"
                )))
            }
        }
    }

    let mut parser = ObjectParser::new(data, lexer.position(), options);
    let trailer = match parser.parse_object()? {
        Object::Dictionary(dict) => dict,
        _ => return Err(ParseError::InvalidTrailer),
    };

    debug!(
        "Parsed xref table at {} with {} records",
        offset,
        records.len()
    );

    visitor.on_trailer_found(&trailer);
    for (number, entry) in records {
        if entry.is_in_use() {
            visitor.on_entry_found(number, entry);
        } else {
            visitor.on_free_entry(number, entry);
        }
    }

    Ok(parser.position())
}

/// One `oooooooooo ggggg n` record. Whitespace between fields is not checked strictly.
fn parse_xref_record(lexer: &mut Lexer<'_>) -> ParseResult<XrefEntry> {
    let first = parse_decimal(next_field(lexer, "offset")?)?;
    let generation = parse_decimal(next_field(lexer, "generation")?)?;
    let generation = u16::try_from(generation)
        .map_err(|_| ParseError::InvalidXRef(format!("generation {generation} out of range")))?;

    match next_field(lexer, "type")? {
        b"n" => Ok(XrefEntry::Normal {
            offset: first,
            generation,
        }),
        b"f" => Ok(XrefEntry::Free {
            next_free: u32::try_from(first).unwrap_or(0),
            generation,
        }),
        other => Err(ParseError::InvalidXRef(format!(
            "invalid record type '{}'",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn next_field<'a>(lexer: &mut Lexer<'a>, what: &str) -> ParseResult<&'a [u8]> {
    lexer.skip_whitespace();
    let word = lexer.read_word();
    if word.is_empty() {
        Err(ParseError::InvalidXRef(format!(
            "missing {what} in xref record"
        )))
    } else {
        Ok(word)
    }
}

fn parse_decimal(word: &[u8]) -> ParseResult<u64> {
    std::str::from_utf8(word)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            ParseError::InvalidXRef(format!(
                "invalid number '{}'",
                String::from_utf8_lossy(word)
            ))
        })
}
