//! # cospdf
//!
//! A pure Rust implementation of the PDF COS layer: the object model, stream filters, a
//! byte-exact serializer, and incremental updates that append a new revision to an existing
//! file without rewriting it.
//!
//! ## Features
//!
//! - **Object model**: booleans, numbers, strings, names, arrays, insertion-ordered
//!   dictionaries, streams and indirect references
//! - **Stream filters**: Flate, LZW, ASCIIHex, ASCII85 and RunLength with PNG/TIFF
//!   predictors, behind an extensible registry
//! - **Parsing**: classic cross-reference tables, cross-reference streams, object streams
//!   and `/Prev` chains
//! - **Serialization**: deterministic COS output with CRLF line endings
//! - **Incremental updates**: replaced and added objects, a new xref section, `/Prev`
//!   chaining, `/ID` and info dictionary maintenance, version upgrades
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cospdf::{IncrementalUpdate, Object, PdfDocument, PdfVersion, Result};
//!
//! # fn main() -> Result<()> {
//! let document = PdfDocument::open("document.pdf")?;
//! println!("Version: {}", document.version());
//!
//! let catalog = document.catalog_id()?;
//! let mut update = IncrementalUpdate::new(document);
//! update.document_mut().catalog_mut()?.set("Lang", Object::from("en-US"));
//! update.mark_replaced(catalog)?;
//! update.require_min_version(PdfVersion::V1_5)?;
//! update.write_to_path("updated.pdf")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Encoding stream data
//!
//! ```rust
//! use cospdf::{Dictionary, Object, Stream};
//!
//! # fn main() -> cospdf::Result<()> {
//! let mut stream = Stream::from_unfiltered(Dictionary::new(), b"BT /F1 12 Tf ET".to_vec());
//! stream.set_filters(Some(Object::name("FlateDecode")))?;
//! let encoded = stream.filtered_bytes()?.to_vec();
//! assert_ne!(encoded, b"BT /F1 12 Tf ET");
//! assert_eq!(stream.unfiltered_bytes()?, b"BT /F1 12 Tf ET");
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod filters;
pub mod incremental;
pub mod objects;
pub mod parser;
pub mod version;
pub mod writer;

pub use document::PdfDocument;
pub use error::{PdfError, Result};
pub use filters::{FilterRegistry, StreamFilter};
pub use incremental::IncrementalUpdate;
pub use objects::{Dictionary, Name, Object, ObjectId, PdfString, Stream};
pub use parser::{ParseOptions, PdfReader};
pub use version::PdfVersion;
pub use writer::WriterConfig;

/// Current version of cospdf
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
