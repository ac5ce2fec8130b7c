//! Stream filters
//!
//! A stream's `/Filter` entry names a chain of reversible byte transforms
//! (ISO 32000-1 Section 7.4). Decoding applies the chain in array order, encoding in
//! reverse. Filters are looked up by name in a [`FilterRegistry`]; the standard one
//! knows every filter defined by the format.

mod ascii85;
mod ascii_hex;
mod flate;
mod lzw;
mod passthrough;
mod pipeline;
mod predictor;
mod run_length;

pub use ascii85::Ascii85Filter;
pub use ascii_hex::AsciiHexFilter;
pub use flate::FlateFilter;
pub use lzw::LzwFilter;
pub use passthrough::PassthroughFilter;
pub use pipeline::{decode, encode, MAX_DECODE_ATTEMPTS};
pub use predictor::DecodeParams;
pub use run_length::RunLengthFilter;

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;

/// A named, reversible transform over stream bytes.
pub trait StreamFilter: Send + Sync {
    /// Canonical filter name, e.g. `FlateDecode`
    fn name(&self) -> &'static str;

    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>>;

    fn encode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>>;

    /// Decode parameters the filter applied, with defaults made explicit.
    fn effective_parameters(&self, _params: Option<&Dictionary>) -> Option<Dictionary> {
        None
    }
}

/// Metadata recorded by a decode: the parameters the last filter stage actually used.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodeResult {
    pub parameters: Option<Dictionary>,
}

/// Name to filter lookup.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn StreamFilter>>,
}

impl FilterRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every filter defined by ISO 32000-1, including the abbreviated inline-image names.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_aliased(FlateFilter, &["Fl"]);
        registry.register_aliased(AsciiHexFilter, &["AHx"]);
        registry.register_aliased(Ascii85Filter, &["A85"]);
        registry.register_aliased(LzwFilter, &["LZW"]);
        registry.register_aliased(RunLengthFilter, &["RL"]);
        registry.register_aliased(PassthroughFilter::new("DCTDecode"), &["DCT"]);
        registry.register_aliased(PassthroughFilter::new("CCITTFaxDecode"), &["CCF"]);
        registry.register_aliased(PassthroughFilter::new("JPXDecode"), &[]);
        registry.register_aliased(PassthroughFilter::new("JBIG2Decode"), &[]);
        registry
    }

    /// Register a filter under its own name, replacing any previous entry.
    pub fn register(&mut self, filter: impl StreamFilter + 'static) {
        self.register_aliased(filter, &[]);
    }

    pub fn register_aliased(&mut self, filter: impl StreamFilter + 'static, aliases: &[&str]) {
        let filter: Arc<dyn StreamFilter> = Arc::new(filter);
        for alias in aliases {
            self.filters.insert(alias.to_string(), Arc::clone(&filter));
        }
        self.filters.insert(filter.name().to_string(), filter);
    }

    pub fn get(&self, name: &str) -> Result<&dyn StreamFilter> {
        self.filters
            .get(name)
            .map(|filter| &**filter)
            .ok_or_else(|| PdfError::UnknownFilter(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

lazy_static! {
    static ref STANDARD_FILTERS: FilterRegistry = FilterRegistry::standard();
}

/// The shared registry with the standard filters.
pub fn standard_registry() -> &'static FilterRegistry {
    &STANDARD_FILTERS
}

/// Ordered filter names taken from a stream dictionary's `/Filter` entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterChain {
    names: Vec<String>,
}

impl FilterChain {
    /// Absent `/Filter` gives an empty chain, a name a single stage, an array of names
    /// an ordered chain. Anything else is malformed.
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self> {
        let names = match dict.get("Filter") {
            None | Some(Object::Null) => Vec::new(),
            Some(Object::Name(name)) => vec![String::from_utf8_lossy(name.as_bytes()).into_owned()],
            Some(Object::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Object::Name(name) => Ok(String::from_utf8_lossy(name.as_bytes()).into_owned()),
                    other => Err(PdfError::InvalidStructure(format!(
                        "Invalid filter in array: {other:?}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(PdfError::InvalidStructure(format!(
                    "Unknown filter type: {other:?}"
                )))
            }
        };
        Ok(FilterChain { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// `/DecodeParms` for chain stage `index`: a dictionary applies to the first stage,
/// an array is parallel to the filter array.
pub(crate) fn stage_parameters(dict: &Dictionary, index: usize) -> Option<&Dictionary> {
    match dict.get("DecodeParms").or_else(|| dict.get("DP"))? {
        Object::Dictionary(params) if index == 0 => Some(params),
        Object::Array(items) => items.get(index).and_then(Object::as_dict),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_absent_filter() {
        let chain = FilterChain::from_dictionary(&Dictionary::new()).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_chain_single_name() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("FlateDecode"));
        let chain = FilterChain::from_dictionary(&dict).unwrap();
        assert_eq!(chain.names(), ["FlateDecode"]);
    }

    #[test]
    fn test_chain_array_keeps_order() {
        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            vec![Object::name("ASCII85Decode"), Object::name("FlateDecode")],
        );
        let chain = FilterChain::from_dictionary(&dict).unwrap();
        assert_eq!(chain.names(), ["ASCII85Decode", "FlateDecode"]);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_chain_rejects_non_name_entries() {
        let mut dict = Dictionary::new();
        dict.set("Filter", vec![Object::name("FlateDecode"), Object::Integer(3)]);
        assert!(FilterChain::from_dictionary(&dict).is_err());

        dict.set("Filter", 7);
        assert!(FilterChain::from_dictionary(&dict).is_err());
    }

    #[test]
    fn test_standard_registry_names_and_aliases() {
        let registry = standard_registry();
        for name in [
            "FlateDecode",
            "ASCIIHexDecode",
            "ASCII85Decode",
            "LZWDecode",
            "RunLengthDecode",
            "DCTDecode",
            "CCITTFaxDecode",
            "JPXDecode",
            "JBIG2Decode",
            "Fl",
            "AHx",
            "A85",
            "LZW",
            "RL",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.get("Fl").unwrap().name(), "FlateDecode");
        assert!(matches!(
            registry.get("Bogus"),
            Err(PdfError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_stage_parameters() {
        let mut params = Dictionary::new();
        params.set("Predictor", 12);

        let mut dict = Dictionary::new();
        dict.set("DecodeParms", params.clone());
        assert_eq!(stage_parameters(&dict, 0), Some(&params));
        assert_eq!(stage_parameters(&dict, 1), None);

        dict.set("DecodeParms", vec![Object::Null, Object::Dictionary(params.clone())]);
        assert_eq!(stage_parameters(&dict, 0), None);
        assert_eq!(stage_parameters(&dict, 1), Some(&params));
    }

    #[test]
    fn test_registry_debug_lists_names() {
        let mut registry = FilterRegistry::empty();
        registry.register(AsciiHexFilter);
        let debug = format!("{registry:?}");
        assert!(debug.contains("ASCIIHexDecode"));
        assert!(!debug.contains("FlateDecode"));
    }
}
