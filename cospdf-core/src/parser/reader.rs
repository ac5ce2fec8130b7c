//! High-level PDF Reader API
//!
//! Holds the whole file in memory, indexes it through the cross-reference chain and
//! materializes indirect objects on demand into an arena keyed by [`ObjectId`].

use super::header::PdfHeader;
use super::object_stream::ObjectStream;
use super::objects::ObjectParser;
use super::trailer::FileTrailer;
use super::xref::{find_startxref, parse_xref_table, XrefEntry, XrefSection, XrefTable};
use super::xref_stream::parse_xref_stream;
use super::lexer::{Lexer, Token};
use super::{ParseError, ParseOptions};
use crate::error::{PdfError, Result};
use crate::objects::{Object, ObjectId};
use crate::version::PdfVersion;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Maximum chain of references followed by [`PdfReader::resolve`].
const MAX_RESOLVE_DEPTH: usize = 32;

/// Random-access reader over the bytes of an existing PDF file.
#[derive(Debug)]
pub struct PdfReader {
    data: Vec<u8>,
    options: ParseOptions,
    header: PdfHeader,
    xref: XrefTable,
    trailer: FileTrailer,
    uses_xref_stream: bool,
    /// Loaded indirect objects
    objects: HashMap<ObjectId, Object>,
    object_streams: HashMap<u32, ObjectStream>,
    /// Objects currently being loaded, for cycle detection
    loading: HashSet<ObjectId>,
    open: bool,
}

impl PdfReader {
    /// Open a PDF file from a path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes_with_options(data, options)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    pub fn from_bytes_with_options(data: Vec<u8>, options: ParseOptions) -> Result<Self> {
        let header = PdfHeader::parse(&data)?;
        let startxref = find_startxref(&data)?;

        let mut reader = Self {
            data,
            options,
            header,
            xref: XrefTable::new(),
            trailer: FileTrailer::new(Default::default(), startxref),
            uses_xref_stream: false,
            objects: HashMap::new(),
            object_streams: HashMap::new(),
            loading: HashSet::new(),
            open: true,
        };
        reader.load_xref_chain(startxref)?;
        Ok(reader)
    }

    /// Walk `/Prev` from the newest section, then apply sections oldest first.
    fn load_xref_chain(&mut self, startxref: u64) -> Result<()> {
        let mut sections: Vec<XrefSection> = Vec::new();
        let mut trailers = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(startxref);

        while let Some(offset) = next {
            if !visited.insert(offset) {
                warn!("xref chain loops back to offset {}", offset);
                break;
            }
            if visited.len() > self.options.max_prev_chain {
                return Err(ParseError::InvalidXRef(format!(
                    "more than {} chained xref sections",
                    self.options.max_prev_chain
                ))
                .into());
            }

            let (section, is_stream) = self.parse_section(offset)?;
            if trailers.is_empty() {
                self.uses_xref_stream = is_stream;
            }
            let trailer = section
                .trailer
                .clone()
                .ok_or(ParseError::InvalidTrailer)?;
            let trailer = FileTrailer::new(trailer, offset);

            // hybrid file: the xref stream overrides its table, so it is applied later
            if let Some(stm_offset) = trailer.xref_stm() {
                if visited.insert(stm_offset) {
                    let (stm_section, _) = self.parse_section(stm_offset)?;
                    sections.push(stm_section);
                }
            }
            sections.push(section);

            next = trailer.prev();
            trailers.push(trailer);
        }

        debug!("Loaded {} xref sections", sections.len());

        // sections are newest first
        for section in sections.iter().rev() {
            self.xref.apply(section);
        }

        let mut trailers = trailers.into_iter();
        let mut newest = trailers.next().ok_or(ParseError::InvalidTrailer)?;
        for older in trailers {
            newest.inherit_from(older.dict());
        }
        self.trailer = newest;
        Ok(())
    }

    /// Parse the table or stream at `offset`.
    fn parse_section(&self, offset: u64) -> Result<(XrefSection, bool)> {
        let position = usize::try_from(offset)
            .ok()
            .filter(|&p| p < self.data.len())
            .ok_or_else(|| ParseError::InvalidXRef(format!("xref offset {offset} is out of range")))?;

        let mut section = XrefSection::default();
        let mut lexer = Lexer::at(&self.data, position);
        match lexer.peek_token()? {
            Token::XRef => {
                parse_xref_table(&self.data, position, &self.options, &mut section)?;
                Ok((section, false))
            }
            Token::Integer(_) => {
                let mut parser = ObjectParser::new(&self.data, position, &self.options);
                let (id, object) = parser.parse_indirect_object()?;
                let mut stream = match object {
                    Object::Stream(stream) if stream.dictionary().get_type() == Some("XRef") => {
                        stream
                    }
                    _ => {
                        return Err(ParseError::InvalidXRef(format!(
                            "object {id} at offset {offset} is not an xref stream"
                        ))
                        .into())
                    }
                };
                parse_xref_stream(&mut stream, &mut section)?;
                Ok((section, true))
            }
            other => Err(ParseError::InvalidXRef(format!(
                "unexpected {other:?} at xref offset {offset}"
            ))
            .into()),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(PdfError::DocumentClosed)
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Version from the file header
    pub fn header_version(&self) -> PdfVersion {
        self.header.version
    }

    pub fn header(&self) -> &PdfHeader {
        &self.header
    }

    /// The merged trailer of the newest revision
    pub fn trailer(&self) -> &FileTrailer {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut FileTrailer {
        &mut self.trailer
    }

    pub fn xref(&self) -> &XrefTable {
        &self.xref
    }

    /// Highest object number in the cross-reference index
    pub fn highest_key(&self) -> u32 {
        self.xref.highest_key()
    }

    /// Offset of the newest xref section, as recorded after `startxref`
    pub fn last_xref_offset(&self) -> u64 {
        self.trailer.xref_offset()
    }

    /// Whether the newest revision uses a cross-reference stream
    pub fn uses_xref_stream(&self) -> bool {
        self.uses_xref_stream
    }

    /// The original file bytes
    pub fn bytes(&self) -> Result<&[u8]> {
        self.ensure_open()?;
        Ok(&self.data)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Release the file buffer and every loaded object, closing their streams.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        for object in self.objects.values_mut() {
            if let Object::Stream(stream) = object {
                stream.close();
            }
        }
        self.objects.clear();
        self.object_streams.clear();
        self.data = Vec::new();
        self.open = false;
    }

    /// Get an indirect object, loading it on first access.
    ///
    /// Free, missing and generation-mismatched entries resolve to `null`.
    pub fn get_object(&mut self, id: ObjectId) -> Result<&Object> {
        self.ensure_loaded(id)?;
        self.objects
            .get(&id)
            .ok_or(PdfError::InvalidObjectReference(id.number(), id.generation()))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.ensure_loaded(id)?;
        self.objects
            .get_mut(&id)
            .ok_or(PdfError::InvalidObjectReference(id.number(), id.generation()))
    }

    /// An already loaded object, without touching the file
    pub fn cached_object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Put `object` into the arena under `id`, replacing whatever was loaded there.
    pub fn insert_object(&mut self, id: ObjectId, object: Object) -> Result<()> {
        self.ensure_open()?;
        self.objects.insert(id, object);
        Ok(())
    }

    /// Follow references until a direct object is reached.
    pub fn resolve(&mut self, object: &Object) -> Result<Object> {
        let mut current = object.clone();
        for _ in 0..MAX_RESOLVE_DEPTH {
            match current {
                Object::Reference(id) => current = self.get_object(id)?.clone(),
                direct => return Ok(direct),
            }
        }
        Err(ParseError::CircularReference.into())
    }

    fn ensure_loaded(&mut self, id: ObjectId) -> Result<()> {
        self.ensure_open()?;
        if self.objects.contains_key(&id) {
            return Ok(());
        }
        if !self.loading.insert(id) {
            return Err(ParseError::CircularReference.into());
        }
        let loaded = self.load_object(id);
        self.loading.remove(&id);

        let object = loaded?;
        self.objects.insert(id, object);
        Ok(())
    }

    fn load_object(&mut self, id: ObjectId) -> Result<Object> {
        match self.xref.get(id.number()).copied() {
            None | Some(XrefEntry::Free { .. }) => {
                debug!("Object {} is not in use, resolving to null", id);
                Ok(Object::Null)
            }
            Some(XrefEntry::Normal { generation, .. }) if generation != id.generation() => {
                debug!("Object {} has generation {} in the xref", id, generation);
                Ok(Object::Null)
            }
            Some(XrefEntry::Normal { offset, .. }) => self.load_from_offset(id, offset),
            Some(XrefEntry::Compressed { container, index }) => {
                if id.generation() != 0 {
                    return Ok(Object::Null);
                }
                self.load_compressed(id, container, index)
            }
        }
    }

    fn load_from_offset(&mut self, id: ObjectId, offset: u64) -> Result<Object> {
        let position = usize::try_from(offset)
            .ok()
            .filter(|&p| p < self.data.len())
            .ok_or(ParseError::InvalidReference(id.number(), id.generation()))?;

        let mut parser = ObjectParser::new(&self.data, position, &self.options);
        let (found, mut object) = parser.parse_indirect_object()?;
        if found != id {
            return Err(ParseError::InvalidReference(id.number(), id.generation()).into());
        }

        // indirect /Length is replaced by its value once it can be resolved
        let length_ref = object
            .as_stream()
            .and_then(|s| s.dictionary().get_reference("Length"));
        if let Some(length_id) = length_ref {
            let length = self.get_object(length_id)?.as_integer();
            if let (Some(length), Some(dict)) = (length, object.as_dict_mut()) {
                dict.set("Length", length);
            }
        }

        Ok(object)
    }

    fn load_compressed(&mut self, id: ObjectId, container: u32, index: u32) -> Result<Object> {
        if !self.object_streams.contains_key(&container) {
            let container_id = ObjectId::new(container, 0);
            let mut stream = match self.get_object(container_id)? {
                Object::Stream(stream) => stream.clone(),
                _ => {
                    return Err(PdfError::InvalidStructure(format!(
                        "object {container_id} is not an object stream"
                    )))
                }
            };
            let parsed = ObjectStream::parse(&mut stream, &self.options)?;
            self.object_streams.insert(container, parsed);
        }

        let object = self
            .object_streams
            .get(&container)
            .and_then(|objstm| objstm.get(index as usize, id.number()))
            .cloned()
            .unwrap_or(Object::Null);
        Ok(object)
    }
}
