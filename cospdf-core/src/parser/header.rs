//! PDF Header Parser
//!
//! Parses the `%PDF-x.y` line according to ISO 32000-1 Section 7.5.2

use super::{ParseError, ParseResult};
use crate::version::PdfVersion;

/// Leading junk tolerated before the header line.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF Header information
#[derive(Debug, Clone, PartialEq)]
pub struct PdfHeader {
    pub version: PdfVersion,
    /// Offset of the `%` that starts the header line
    pub offset: usize,
    pub has_binary_marker: bool,
}

impl PdfHeader {
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
        let offset = window
            .windows(5)
            .position(|w| w == b"%PDF-")
            .ok_or(ParseError::InvalidHeader)?;

        let rest = &data[offset + 5..];
        let line_end = rest
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(rest.len());
        let line = std::str::from_utf8(&rest[..line_end]).map_err(|_| ParseError::InvalidHeader)?;

        // some writers put more on the header line, e.g. "%PDF-1.4 %âãÏÓ"
        let version_text = line.split_whitespace().next().ok_or(ParseError::InvalidHeader)?;
        let version: PdfVersion = version_text
            .parse()
            .map_err(|_| ParseError::InvalidHeader)?;

        if !version.is_supported() {
            return Err(ParseError::UnsupportedVersion(version.to_string()));
        }

        let has_binary_marker = Self::check_binary_marker(&rest[line_end..]);

        Ok(Self {
            version,
            offset,
            has_binary_marker,
        })
    }

    /// A comment line with at least four bytes >= 128 right after the header
    fn check_binary_marker(after_header: &[u8]) -> bool {
        let line = after_header
            .iter()
            .position(|&b| b != b'\n' && b != b'\r')
            .map(|start| &after_header[start..])
            .unwrap_or(&[]);
        match line.split_first() {
            Some((&b'%', comment)) => {
                comment
                    .iter()
                    .take_while(|&&b| b != b'\n' && b != b'\r')
                    .filter(|&&b| b >= 128)
                    .count()
                    >= 4
            }
            _ => false,
        }
    }
}
