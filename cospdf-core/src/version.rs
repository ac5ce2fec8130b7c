//! PDF specification versions
//!
//! A version appears in the file header (`%PDF-1.7`) and, from PDF 1.4 on, may be
//! overridden by the catalog's `/Version` name.

use crate::error::{PdfError, Result};
use std::fmt;
use std::str::FromStr;

/// A PDF specification version such as `1.4` or `2.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub const V1_0: PdfVersion = PdfVersion::new(1, 0);
    pub const V1_4: PdfVersion = PdfVersion::new(1, 4);
    pub const V1_5: PdfVersion = PdfVersion::new(1, 5);
    pub const V1_7: PdfVersion = PdfVersion::new(1, 7);
    pub const V2_0: PdfVersion = PdfVersion::new(2, 0);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Check if this version is supported
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }

    /// Whether the version can be recorded in the catalog `/Version` entry.
    pub fn is_catalog_version(&self) -> bool {
        *self >= Self::V1_4
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PdfVersion {
    type Err = PdfError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("%PDF-").unwrap_or(trimmed);
        let invalid = || PdfError::InvalidVersion(s.to_string());

        let (major, minor) = trimmed.split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u8>().map_err(|_| invalid())?;
        let minor = minor.parse::<u8>().map_err(|_| invalid())?;
        Ok(PdfVersion::new(major, minor))
    }
}
