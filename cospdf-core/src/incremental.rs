//! Incremental updates
//!
//! An [`IncrementalUpdate`] is the write session of one new revision. Objects registered
//! through [`replace`](IncrementalUpdate::replace) or [`add`](IncrementalUpdate::add) are
//! appended after the untouched original bytes, followed by a cross-reference section that
//! covers exactly those objects and a trailer chaining back through `/Prev`.
//!
//! ```no_run
//! use cospdf::{IncrementalUpdate, Object, PdfDocument, PdfVersion};
//!
//! # fn main() -> cospdf::Result<()> {
//! let document = PdfDocument::open("input.pdf")?;
//! let mut update = IncrementalUpdate::new(document);
//! let note = update.add(Object::from("appended"));
//! update.set_version(PdfVersion::V1_7)?;
//! update.write_to_path("output.pdf")?;
//! # let _ = note;
//! # Ok(())
//! # }
//! ```

use crate::document::PdfDocument;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Name, Object, ObjectId};
use crate::parser::FileTrailer;
use crate::version::PdfVersion;
use crate::writer::{format_pdf_date, CosWriter, WriterConfig, XrefWriter};
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// The write session for one new revision of a document.
///
/// The session owns the document and closes it when it is dropped, which includes the
/// end of [`write_to`](IncrementalUpdate::write_to) whether it succeeds or fails.
#[derive(Debug)]
pub struct IncrementalUpdate {
    document: PdfDocument,
    /// Objects to write; their current value lives in the document's arena
    replaced: BTreeSet<ObjectId>,
    highest_added: Option<u32>,
    config: WriterConfig,
}

impl IncrementalUpdate {
    pub fn new(document: PdfDocument) -> Self {
        Self::with_config(document, WriterConfig::default())
    }

    pub fn with_config(document: PdfDocument, config: WriterConfig) -> Self {
        Self {
            document,
            replaced: BTreeSet::new(),
            highest_added: None,
            config,
        }
    }

    pub fn document(&self) -> &PdfDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut PdfDocument {
        &mut self.document
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn trailer(&self) -> &FileTrailer {
        self.document.trailer()
    }

    fn require_open(&self) -> Result<()> {
        if self.document.is_open() {
            Ok(())
        } else {
            Err(PdfError::DocumentClosed)
        }
    }

    /// Highest object number of the original cross-reference index. New objects are
    /// always numbered above it.
    pub fn highest_existing_reference(&self) -> u32 {
        self.document.reader().highest_key()
    }

    /// One past every number in use: file keys, replaced ids and numbers handed out here.
    fn next_free_number(&self) -> u32 {
        self.replaced
            .iter()
            .map(ObjectId::number)
            .chain(self.highest_added)
            .fold(self.highest_existing_reference(), u32::max)
            .saturating_add(1)
    }

    /// Register `object` as the new value of `id`. `None` writes an explicit `null`.
    pub fn replace(&mut self, id: ObjectId, object: Option<Object>) -> Result<()> {
        self.require_open()?;
        let object = object.unwrap_or(Object::Null);
        self.document.reader_mut().insert_object(id, object)?;
        self.replaced.insert(id);
        Ok(())
    }

    /// Mark the document's current value of `id` for writing.
    pub fn mark_replaced(&mut self, id: ObjectId) -> Result<()> {
        self.require_open()?;
        self.document.object(id)?;
        self.replaced.insert(id);
        Ok(())
    }

    pub fn is_replaced(&self, id: ObjectId) -> bool {
        self.replaced.contains(&id)
    }

    /// Store a new indirect object under the next unused object number.
    pub fn add(&mut self, object: Object) -> Result<ObjectId> {
        self.require_open()?;
        let number = self.next_free_number();
        let id = ObjectId::new(number, 0);
        self.highest_added = Some(number);
        self.replace(id, Some(object))?;
        Ok(id)
    }

    /// Everything that will be written, ordered by id.
    pub fn replacements(&self) -> Vec<(ObjectId, &Object)> {
        self.replaced
            .iter()
            .filter_map(|&id| {
                self.document
                    .reader()
                    .cached_object(id)
                    .map(|object| (id, object))
            })
            .collect()
    }

    /// Set `/Producer` and `/ModDate` on the info dictionary. An indirect info dictionary
    /// is marked replaced; a document without one gets a new indirect dictionary.
    pub fn update_document_information(&mut self) -> Result<()> {
        self.require_open()?;
        let producer = Object::from(self.config.producer.as_str());
        let mod_date = Object::from(format_pdf_date(Utc::now()));

        match self.document.info_id() {
            Some(id) => {
                let info = self.document.object_mut(id)?;
                if info.as_dict().is_none() {
                    warn!("Info {} is not a dictionary, replacing it", id);
                    *info = Object::Dictionary(Dictionary::new());
                }
                if let Some(dict) = info.as_dict_mut() {
                    dict.set("Producer", producer);
                    dict.set("ModDate", mod_date);
                }
                self.replaced.insert(id);
            }
            None => match self.document.info_mut()? {
                // direct info dictionaries travel with the trailer
                Some(dict) => {
                    dict.set("Producer", producer);
                    dict.set("ModDate", mod_date);
                }
                None => {
                    let mut dict = Dictionary::new();
                    dict.set("Producer", producer);
                    dict.set("ModDate", mod_date);
                    let id = self.add(Object::Dictionary(dict))?;
                    self.document.trailer_mut().set("Info", id);
                }
            },
        }
        Ok(())
    }

    /// Regenerate the second file identifier from `seed`. An existing two element `/ID`
    /// keeps its first element; anything else is replaced by `[id id]`.
    pub fn update_id(&mut self, seed: &[u8]) -> Result<()> {
        self.require_open()?;
        let new_id = Object::String(self.document.generate_file_identifier(seed)?);

        match self.document.trailer().dict().get("ID").cloned() {
            Some(Object::Reference(array_id)) => {
                let updated = match self.document.object_mut(array_id)?.as_array_mut() {
                    Some(array) if array.len() == 2 => {
                        array[1] = new_id.clone();
                        true
                    }
                    _ => false,
                };
                if updated {
                    self.replaced.insert(array_id);
                    return Ok(());
                }
            }
            Some(Object::Array(array)) if array.len() == 2 => {
                if let Some(array) = self
                    .document
                    .trailer_mut()
                    .get_mut("ID")
                    .and_then(Object::as_array_mut)
                {
                    array[1] = new_id;
                }
                return Ok(());
            }
            _ => {}
        }

        debug!("Installing a new file identifier");
        self.document
            .trailer_mut()
            .set("ID", Object::Array(vec![new_id.clone(), new_id]));
        Ok(())
    }

    /// Raise the version to `version` when the document is below it.
    pub fn require_min_version(&mut self, version: PdfVersion) -> Result<()> {
        if self.document.version() < version {
            debug!("Minimum spec version required is {}", version);
            self.set_version(version)?;
        }
        Ok(())
    }

    /// Upgrade the document version. Downgrades are ignored. From 1.4 on the version is
    /// recorded in the catalog, below that only in memory.
    pub fn set_version(&mut self, version: PdfVersion) -> Result<()> {
        self.require_open()?;
        let current = self.document.version();
        match version.cmp(&current) {
            Ordering::Less => {
                info!(
                    "Spec version downgrade from {} to {} not allowed",
                    current, version
                );
            }
            Ordering::Equal => {}
            Ordering::Greater if version.is_catalog_version() => {
                self.set_catalog_version(version)?;
            }
            Ordering::Greater => self.document.set_in_memory_version(version),
        }
        Ok(())
    }

    /// Write `/Version` into the catalog and mark the catalog replaced. Versions below
    /// 1.4 cannot live in the catalog and are ignored.
    pub fn set_catalog_version(&mut self, version: PdfVersion) -> Result<()> {
        self.require_open()?;
        if !version.is_catalog_version() {
            warn!(
                "Spec version must be at least 1.4 to be set as catalog entry, ignoring {}",
                version
            );
            return Ok(());
        }

        let catalog_id = self.document.catalog_id()?;
        self.document
            .catalog_mut()?
            .set("Version", Object::Name(Name::from(version.to_string())));
        self.replaced.insert(catalog_id);
        self.document.set_in_memory_version(version);
        Ok(())
    }

    /// Write the updated document to `path`.
    pub fn write_to_path<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let seed = path.as_ref().to_string_lossy().into_owned();
        let file = File::create(path.as_ref())?;
        self.write_revision(BufWriter::new(file), seed.as_bytes())
    }

    /// Write the original bytes followed by the new revision to `out`.
    pub fn write_to<W: Write>(self, out: W) -> Result<()> {
        let seed = Utc::now().to_rfc3339();
        self.write_revision(out, seed.as_bytes())
    }

    fn write_revision<W: Write>(mut self, out: W, seed: &[u8]) -> Result<()> {
        self.require_open()?;
        if self.document.trailer().is_encrypted() {
            return Err(PdfError::InvalidStructure(
                "encrypted documents cannot be updated".to_string(),
            ));
        }
        self.update_document_information()?;
        self.update_id(seed)?;

        let use_xref_stream = self
            .config
            .xref_stream
            .unwrap_or_else(|| self.document.reader().uses_xref_stream());
        let xref_stream_id = if use_xref_stream {
            let number = self.next_free_number();
            self.highest_added = Some(number);
            Some(ObjectId::new(number, 0))
        } else {
            None
        };

        let mut writer = CosWriter::new(out);
        let original = self.document.reader().bytes()?;
        writer.write_bytes(original)?;
        if !matches!(original.last(), Some(b'\n') | Some(b'\r')) {
            writer.write_eol()?;
        }

        let mut xref = XrefWriter::new();
        for &id in &self.replaced {
            let mut object = self
                .document
                .reader()
                .cached_object(id)
                .cloned()
                .unwrap_or(Object::Null);
            if self.config.compress_streams {
                if let Object::Stream(stream) = &mut object {
                    if stream.filters()?.is_empty() {
                        stream.set_filters(Some(Object::name("FlateDecode")))?;
                    }
                }
            }
            let offset = writer.write_indirect_object(id, &mut object)?;
            xref.add_in_use_entry(id, offset);
        }

        let mut trailer = self.document.trailer().carried_entries();
        let size = self
            .document
            .trailer()
            .size()
            .unwrap_or(0)
            .max(self.next_free_number());
        trailer.set("Size", i64::from(size));
        trailer.set("Prev", self.document.reader().last_xref_offset() as i64);

        let written = self.replaced.len();
        let xref_offset = match xref_stream_id {
            Some(stream_id) => xref.write_stream(&mut writer, stream_id, trailer)?,
            None => xref.write_table(&mut writer, &mut trailer)?,
        };
        writer.flush()?;

        debug!(
            "Wrote incremental update with {} objects, xref at {}",
            written, xref_offset
        );
        Ok(())
    }
}

impl Drop for IncrementalUpdate {
    fn drop(&mut self) {
        self.document.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_helpers::*;
    use crate::parser::PdfReader;

    fn session(data: Vec<u8>) -> IncrementalUpdate {
        IncrementalUpdate::new(PdfDocument::from_bytes(data).unwrap())
    }

    #[test]
    fn test_add_numbers_above_highest_existing() {
        let mut update = session(create_minimal_pdf());
        assert_eq!(update.highest_existing_reference(), 2);
        assert_eq!(update.add(Object::Integer(1)).unwrap(), ObjectId::new(3, 0));
        assert_eq!(update.add(Object::Integer(2)).unwrap(), ObjectId::new(4, 0));
        assert_eq!(update.replacements().len(), 2);
    }

    #[test]
    fn test_add_skips_replaced_ids() {
        let mut update = session(create_minimal_pdf());
        let replaced = ObjectId::new(3, 0);
        update.replace(replaced, Some(Object::from("kept"))).unwrap();
        assert_eq!(update.add(Object::Integer(1)).unwrap(), ObjectId::new(4, 0));
        assert_eq!(update.replacements().len(), 2);
        assert_eq!(update.replacements()[0], (replaced, &Object::from("kept")));
    }

    #[test]
    fn test_xref_stream_number_skips_replaced_ids() {
        let document = PdfDocument::from_bytes(create_minimal_pdf()).unwrap();
        let mut update =
            IncrementalUpdate::with_config(document, WriterConfig::default().with_xref_stream(true));
        let replaced = ObjectId::new(3, 0);
        update.replace(replaced, Some(Object::from("kept"))).unwrap();

        let mut out = Vec::new();
        update.write_to(&mut out).unwrap();

        let mut reader = PdfReader::from_bytes(out).unwrap();
        assert_eq!(reader.get_object(replaced).unwrap(), &Object::from("kept"));
        // info dictionary takes 4, the xref stream 5
        assert!(reader.get_object(ObjectId::new(4, 0)).unwrap().as_dict().is_some());
        assert_eq!(reader.trailer().size().unwrap(), 6);
    }

    #[test]
    fn test_replace_with_none_is_a_null_tombstone() {
        let mut update = session(create_minimal_pdf());
        let id = ObjectId::new(2, 0);
        update.replace(id, None).unwrap();
        update.replace(id, None).unwrap();
        assert_eq!(update.replacements(), vec![(id, &Object::Null)]);
    }

    #[test]
    fn test_update_document_information_marks_indirect_info() {
        let mut update = session(create_pdf_with_info());
        update.update_document_information().unwrap();
        let info_id = ObjectId::new(3, 0);
        assert!(update.is_replaced(info_id));
        let info = update.replacements()[0].1.as_dict().unwrap().clone();
        assert!(info.get("Producer").is_some());
        let date = info.get("ModDate").and_then(Object::as_string).unwrap();
        assert!(date.to_string_lossy().starts_with("D:"));
        // existing entries survive
        assert!(info.get("Title").is_some());
    }

    #[test]
    fn test_update_document_information_creates_missing_info() {
        let mut update = session(create_minimal_pdf());
        update.update_document_information().unwrap();
        let info_id = update.trailer().info().unwrap();
        assert_eq!(info_id, ObjectId::new(3, 0));
        assert!(update.is_replaced(info_id));
    }

    #[test]
    fn test_update_id_keeps_first_element() {
        let mut update = session(create_pdf_with_info());
        let before = update.trailer().id().cloned().unwrap();
        update.update_id(b"seed").unwrap();
        let after = update.trailer().id().and_then(Object::as_array).unwrap().clone();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0], before.as_array().unwrap()[0]);
        assert_ne!(after[1], before.as_array().unwrap()[1]);
    }

    #[test]
    fn test_update_id_installs_pair_when_missing() {
        let mut update = session(create_minimal_pdf());
        update.update_id(b"seed").unwrap();
        let id = update.trailer().id().and_then(Object::as_array).unwrap().clone();
        assert_eq!(id.len(), 2);
        assert_eq!(id[0], id[1]);
    }

    #[test]
    fn test_version_policy() {
        let data = build_pdf("1.5", &[b"<< /Type /Catalog >>"], "");
        let mut update = session(data);
        update.set_version(PdfVersion::new(1, 3)).unwrap();
        assert_eq!(update.document().version(), PdfVersion::V1_5);
        assert!(update.replacements().is_empty());

        let data = build_pdf("1.3", &[b"<< /Type /Catalog >>"], "");
        let mut update = session(data);
        update.set_version(PdfVersion::new(1, 6)).unwrap();
        let catalog_id = ObjectId::new(1, 0);
        assert!(update.is_replaced(catalog_id));
        let catalog = update.replacements()[0].1.as_dict().unwrap().clone();
        assert_eq!(
            catalog.get_name("Version").and_then(|n| n.as_str()),
            Some("1.6")
        );

        let data = build_pdf("1.0", &[b"<< /Type /Catalog >>"], "");
        let mut update = session(data);
        update.set_version(PdfVersion::new(1, 3)).unwrap();
        assert_eq!(update.document().version(), PdfVersion::new(1, 3));
        assert!(update.replacements().is_empty());
    }

    #[test]
    fn test_set_catalog_version_rejects_old_versions() {
        let mut update = session(create_minimal_pdf());
        update.set_catalog_version(PdfVersion::new(1, 2)).unwrap();
        assert!(update.replacements().is_empty());
    }

    #[test]
    fn test_require_min_version() {
        let mut update = session(create_minimal_pdf());
        update.require_min_version(PdfVersion::new(1, 2)).unwrap();
        assert!(update.replacements().is_empty());
        update.require_min_version(PdfVersion::V1_7).unwrap();
        assert_eq!(update.document().version(), PdfVersion::V1_7);
    }

    #[test]
    fn test_write_appends_revision() {
        let original = create_minimal_pdf();
        let mut update = session(original.clone());
        let added = update.add(Object::from("hello")).unwrap();
        assert_eq!(added, ObjectId::new(3, 0));

        let mut out = Vec::new();
        update.write_to(&mut out).unwrap();

        assert!(out.starts_with(&original));
        let appended = String::from_utf8_lossy(&out[original.len()..]).into_owned();
        assert!(appended.contains("3 0 obj\r\n(hello)\r\nendobj\r\n"));
        assert!(appended.contains("/Prev "));
        assert!(appended.trim_end().ends_with("%%EOF"));

        let mut reader = PdfReader::from_bytes(out).unwrap();
        assert_eq!(
            reader
                .get_object(added)
                .unwrap()
                .as_string()
                .map(|s| s.to_string_lossy()),
            Some("hello".to_string())
        );
        assert_eq!(reader.trailer().size().unwrap(), 5);
        assert!(reader.trailer().info().is_some());
    }

    #[test]
    fn test_write_follows_xref_stream_revision() {
        let original = create_pdf_with_xref_stream();
        let update = session(original.clone());

        let mut out = Vec::new();
        update.write_to(&mut out).unwrap();

        let appended = String::from_utf8_lossy(&out[original.len()..]).into_owned();
        assert!(appended.contains("/Type /XRef"));
        assert!(!appended.contains("trailer"));

        let mut reader = PdfReader::from_bytes(out).unwrap();
        assert!(reader.uses_xref_stream());
        let info = reader.get_object(ObjectId::new(4, 0)).unwrap().as_dict().unwrap();
        assert!(info.get("Producer").is_some());
        assert!(info.get("Title").is_some());
    }

    #[test]
    fn test_forced_table_on_xref_stream_revision() {
        let original = create_pdf_with_xref_stream();
        let document = PdfDocument::from_bytes(original.clone()).unwrap();
        let update =
            IncrementalUpdate::with_config(document, WriterConfig::default().with_xref_stream(false));

        let mut out = Vec::new();
        update.write_to(&mut out).unwrap();
        let appended = String::from_utf8_lossy(&out[original.len()..]).into_owned();
        assert!(appended.contains("xref\r\n"));
        assert!(appended.contains("/Prev "));
    }

    #[test]
    fn test_encrypted_documents_are_rejected() {
        let data = build_pdf(
            "1.4",
            &[b"<< /Type /Catalog >>", b"<< /Filter /Standard >>"],
            " /Encrypt 2 0 R",
        );
        let update = session(data);
        assert!(matches!(
            update.write_to(Vec::new()),
            Err(PdfError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_write_on_closed_document_fails() {
        let mut update = session(create_minimal_pdf());
        update.document_mut().close();
        assert!(matches!(
            update.write_to(Vec::new()),
            Err(PdfError::DocumentClosed)
        ));
    }
}
