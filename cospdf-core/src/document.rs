//! An opened PDF document
//!
//! Wraps a [`PdfReader`] with the document-level state an update needs: the effective
//! spec version and whether the document is still open.

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, PdfString};
use crate::parser::{FileTrailer, ParseOptions, PdfReader};
use crate::version::PdfVersion;
use crate::writer::serialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug)]
pub struct PdfDocument {
    reader: PdfReader,
    /// Effective version: header version, raised by the catalog `/Version` or by updates
    version: PdfVersion,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(PdfReader::open(path)?)
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        Self::from_reader(PdfReader::open_with_options(path, options)?)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_reader(PdfReader::from_bytes(data)?)
    }

    pub fn from_reader(mut reader: PdfReader) -> Result<Self> {
        let header_version = reader.header_version();
        let root = reader.trailer().root().ok();
        let catalog_version = match root {
            Some(root) => reader
                .get_object(root)?
                .as_dict()
                .and_then(|catalog| catalog.get_name("Version"))
                .and_then(|name| name.as_str())
                .and_then(|v| v.parse::<PdfVersion>().ok()),
            None => None,
        };

        let version = match catalog_version {
            Some(catalog) if catalog > header_version => catalog,
            _ => header_version,
        };
        debug!(
            "Opened document, header version {}, effective version {}",
            header_version, version
        );

        Ok(Self { reader, version })
    }

    pub fn reader(&self) -> &PdfReader {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut PdfReader {
        &mut self.reader
    }

    /// Effective spec version: the later of the header and catalog versions.
    pub fn version(&self) -> PdfVersion {
        self.version
    }

    /// Change the version kept in memory without touching any object.
    pub fn set_in_memory_version(&mut self, version: PdfVersion) {
        self.version = version;
    }

    pub fn trailer(&self) -> &FileTrailer {
        self.reader.trailer()
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        self.reader.trailer_mut().dict_mut()
    }

    pub fn catalog_id(&self) -> Result<ObjectId> {
        Ok(self.reader.trailer().root()?)
    }

    pub fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        let id = self.catalog_id()?;
        self.reader
            .object_mut(id)?
            .as_dict_mut()
            .ok_or_else(|| PdfError::InvalidStructure(format!("catalog {id} is not a dictionary")))
    }

    /// Identity of the info dictionary, when it is an indirect object
    pub fn info_id(&self) -> Option<ObjectId> {
        self.reader.trailer().info()
    }

    /// The info dictionary, direct in the trailer or indirect.
    pub fn info(&mut self) -> Result<Option<&Dictionary>> {
        match self.info_id() {
            Some(id) => Ok(self.reader.get_object(id)?.as_dict()),
            None => Ok(self.reader.trailer().dict().get_dict("Info")),
        }
    }

    pub fn info_mut(&mut self) -> Result<Option<&mut Dictionary>> {
        match self.info_id() {
            Some(id) => Ok(self.reader.object_mut(id)?.as_dict_mut()),
            None => Ok(self
                .reader
                .trailer_mut()
                .dict_mut()
                .get_mut("Info")
                .and_then(Object::as_dict_mut)),
        }
    }

    pub fn object(&mut self, id: ObjectId) -> Result<&Object> {
        self.reader.get_object(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.reader.object_mut(id)
    }

    pub fn resolve(&mut self, object: &Object) -> Result<Object> {
        self.reader.resolve(object)
    }

    /// A file identifier derived from `seed` and the document state: MD5 over the seed,
    /// the trailer `/Size`, the serialized info dictionary and its modification date.
    pub fn generate_file_identifier(&mut self, seed: &[u8]) -> Result<PdfString> {
        let mut data = seed.to_vec();
        if let Some(size) = self.reader.trailer().dict().get_integer("Size") {
            data.extend_from_slice(size.to_string().as_bytes());
        }
        if let Some(info) = self.info()?.cloned() {
            if let Some(date) = info.get("ModDate").and_then(Object::as_string) {
                data.extend_from_slice(date.as_bytes());
            }
            data.extend_from_slice(&serialize(&mut Object::Dictionary(info))?);
        }
        Ok(PdfString::hex(md5::compute(&data).to_vec()))
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_open()
    }

    /// Release the file buffer and all loaded objects. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.reader.is_open() {
            debug!("Closing document");
            self.reader.close();
        }
    }
}
