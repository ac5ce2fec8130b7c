use crate::parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid object reference: {0} {1} R")]
    InvalidObjectReference(u32, u16),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("{filter} failed: {message}")]
    Filter { filter: String, message: String },

    #[error("{filter} stream was not read after {attempts} attempts: {message}")]
    DecodeFailed {
        filter: String,
        attempts: usize,
        message: String,
    },

    #[error("Unsupported value for {key} in decode parameters: {value}")]
    UnsupportedFilterParameter { key: String, value: String },

    #[error("Stream has already been closed")]
    StreamClosed,

    #[error("The document is closed")]
    DocumentClosed,

    #[error("Invalid version: {0}")]
    InvalidVersion(String),
}

impl PdfError {
    pub(crate) fn filter(filter: &str, message: impl Into<String>) -> Self {
        PdfError::Filter {
            filter: filter.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_pdf_error_display() {
        let error = PdfError::InvalidStructure("test message".to_string());
        assert_eq!(error.to_string(), "Invalid PDF structure: test message");
    }

    #[test]
    fn test_decode_failed_display_carries_attempts() {
        let error = PdfError::DecodeFailed {
            filter: "FlateDecode".to_string(),
            attempts: 9,
            message: "corrupt deflate stream".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "FlateDecode stream was not read after 9 attempts: corrupt deflate stream"
        );
    }

    #[test]
    fn test_pdf_error_from_io_error() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let pdf_error = PdfError::from(io_error);

        match pdf_error {
            PdfError::Io(ref err) => {
                assert_eq!(err.kind(), ErrorKind::NotFound);
            }
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_pdf_error_from_parse_error() {
        let error = PdfError::from(ParseError::InvalidHeader);
        assert!(matches!(error, PdfError::Parse(ParseError::InvalidHeader)));
        assert_eq!(error.to_string(), "Parse error: Invalid PDF header");
    }

    #[test]
    fn test_resource_state_errors_are_distinct() {
        assert_eq!(
            PdfError::StreamClosed.to_string(),
            "Stream has already been closed"
        );
        assert_eq!(PdfError::DocumentClosed.to_string(), "The document is closed");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfError>();
    }
}
