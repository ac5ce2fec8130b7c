//! PDF writing functionality
//!
//! Byte-exact COS serialization plus the cross-reference and trailer sections appended by
//! an incremental update.

mod cos_writer;
mod xref_writer;

pub use cos_writer::{serialize, CosWriter};
pub use xref_writer::XrefWriter;

use chrono::{DateTime, Utc};

/// Output settings for an incremental update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// `Some(true)` forces a cross-reference stream, `Some(false)` a classic table,
    /// `None` follows the revision being updated.
    pub xref_stream: Option<bool>,
    /// Flate-compress written streams that carry no filter.
    pub compress_streams: bool,
    /// Value written to the info dictionary's `/Producer`.
    pub producer: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            xref_stream: None,
            compress_streams: false,
            producer: format!("cospdf {}", crate::VERSION),
        }
    }
}

impl WriterConfig {
    pub fn with_xref_stream(mut self, xref_stream: bool) -> Self {
        self.xref_stream = Some(xref_stream);
        self
    }

    pub fn with_compressed_streams(mut self, compress: bool) -> Self {
        self.compress_streams = compress;
        self
    }

    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = producer.into();
        self
    }
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSSOHH'mm)
pub fn format_pdf_date(date: DateTime<Utc>) -> String {
    // For UTC, the offset is always +00'00
    format!("{}+00'00", date.format("D:%Y%m%d%H%M%S"))
}
