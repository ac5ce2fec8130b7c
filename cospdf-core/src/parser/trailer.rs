//! PDF Trailer
//!
//! The trailer dictionary of a revision according to ISO 32000-1 Section 7.5.5. For files
//! using cross-reference streams the stream dictionary doubles as the trailer.

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};

/// Keys that only make sense on a cross-reference stream dictionary.
pub const XREF_STREAM_KEYS: &[&str] = &[
    "Type",
    "W",
    "Index",
    "Length",
    "Filter",
    "DecodeParms",
    "DP",
];

/// PDF Trailer information
#[derive(Debug, Clone, PartialEq)]
pub struct FileTrailer {
    dict: Dictionary,
    /// Byte offset of the xref section this trailer belongs to
    xref_offset: u64,
}

impl FileTrailer {
    pub fn new(dict: Dictionary, xref_offset: u64) -> Self {
        Self { dict, xref_offset }
    }

    /// Get the size (number of entries in xref table)
    pub fn size(&self) -> ParseResult<u32> {
        self.dict
            .get_integer("Size")
            .and_then(|i| u32::try_from(i).ok())
            .ok_or_else(|| ParseError::MissingKey("Size".to_string()))
    }

    /// Byte offset of previous xref section (if any)
    pub fn prev(&self) -> Option<u64> {
        self.dict
            .get_integer("Prev")
            .and_then(|i| u64::try_from(i).ok())
    }

    /// Hybrid-reference files point at an additional xref stream
    pub fn xref_stm(&self) -> Option<u64> {
        self.dict
            .get_integer("XRefStm")
            .and_then(|i| u64::try_from(i).ok())
    }

    /// Get the root object reference (document catalog)
    pub fn root(&self) -> ParseResult<ObjectId> {
        self.dict
            .get_reference("Root")
            .ok_or_else(|| ParseError::MissingKey("Root".to_string()))
    }

    pub fn info(&self) -> Option<ObjectId> {
        self.dict.get_reference("Info")
    }

    /// The `/ID` entry, direct array or reference
    pub fn id(&self) -> Option<&Object> {
        self.dict.get("ID")
    }

    pub fn is_encrypted(&self) -> bool {
        self.dict.contains_key("Encrypt")
    }

    pub fn xref_offset(&self) -> u64 {
        self.xref_offset
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    pub fn dict_mut(&mut self) -> &mut Dictionary {
        &mut self.dict
    }

    pub fn into_dict(self) -> Dictionary {
        self.dict
    }

    /// Fold an older revision's trailer underneath this one: keys missing here are taken
    /// from `older`.
    pub fn inherit_from(&mut self, older: &Dictionary) {
        for (key, value) in older.iter() {
            self.dict.set_if_absent(key.clone(), value.clone());
        }
    }

    /// Trailer keys to carry into a new revision: everything except chain links and
    /// xref stream keys.
    pub fn carried_entries(&self) -> Dictionary {
        self.dict
            .iter()
            .filter(|(key, _)| {
                let key = key.as_bytes();
                key != b"Prev"
                    && key != b"XRefStm"
                    && !XREF_STREAM_KEYS.iter().any(|k| k.as_bytes() == key)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
