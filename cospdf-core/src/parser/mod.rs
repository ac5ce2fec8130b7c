//! PDF Parser Module
//!
//! Reads the file structure of an existing PDF: header, cross-reference sections
//! (tables and streams, following `/Prev`), trailers, and indirect objects on demand.

pub mod header;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod reader;
#[cfg(test)]
pub(crate) mod test_helpers;
pub mod trailer;
pub mod xref;
pub mod xref_stream;

pub use self::reader::PdfReader;
pub use self::trailer::FileTrailer;
pub use self::xref::{XrefEntry, XrefTable, XrefVisitor};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Invalid xref: {0}")]
    InvalidXRef(String),

    #[error("Invalid xref entry type: {0}")]
    InvalidXRefEntryType(u64),

    #[error("Invalid trailer")]
    InvalidTrailer,

    #[error("Circular reference detected")]
    CircularReference,
}

/// Parser tolerance settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Recover stream payloads whose `/Length` is wrong or indirect by scanning for
    /// `endstream`.
    pub lenient_streams: bool,
    /// Maximum number of cross-reference sections followed through `/Prev`.
    pub max_prev_chain: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            lenient_streams: true,
            max_prev_chain: 256,
        }
    }
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            lenient_streams: false,
            ..Self::default()
        }
    }

    pub fn lenient() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let error = ParseError::SyntaxError {
            position: 12,
            message: "bad".to_string(),
        };
        assert_eq!(error.to_string(), "Syntax error at position 12: bad");
        assert_eq!(
            ParseError::InvalidXRefEntryType(3).to_string(),
            "Invalid xref entry type: 3"
        );
    }

    #[test]
    fn test_parse_options() {
        assert!(ParseOptions::default().lenient_streams);
        assert!(!ParseOptions::strict().lenient_streams);
        assert_eq!(ParseOptions::strict().max_prev_chain, 256);
    }
}
