use crate::error::{PdfError, Result};
use crate::filters::{self, DecodeResult, FilterChain, FilterRegistry};
use crate::objects::{Dictionary, Object};
use tracing::trace;

/// Which payload buffers are currently resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadState {
    Empty,
    HasFiltered,
    HasUnfiltered,
    HasBoth,
}

#[derive(Debug, Clone, PartialEq, Default)]
enum Payload {
    #[default]
    Empty,
    Filtered(Vec<u8>),
    Unfiltered(Vec<u8>),
    Both {
        filtered: Vec<u8>,
        unfiltered: Vec<u8>,
    },
}

/// A stream object: dictionary plus a lazily converted payload.
///
/// The filtered buffer holds the bytes as they appear in the file, the unfiltered
/// buffer the decoded content. Whichever one is missing is produced on demand through
/// the filter chain named by `/Filter` and cached until one of
/// [`create_filtered_stream`](Stream::create_filtered_stream),
/// [`create_unfiltered_stream`](Stream::create_unfiltered_stream) or
/// [`set_filters`](Stream::set_filters) invalidates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dictionary: Dictionary,
    payload: Payload,
    decode_result: Option<DecodeResult>,
    closed: bool,
}

impl Stream {
    pub fn new(dictionary: Dictionary) -> Self {
        Self {
            dictionary,
            payload: Payload::Empty,
            decode_result: None,
            closed: false,
        }
    }

    /// A stream whose payload is the physical (encoded) bytes, as read from a file.
    /// The dictionary is kept untouched, including a possibly wrong `/Length`.
    pub fn from_filtered(dictionary: Dictionary, filtered: Vec<u8>) -> Self {
        Self {
            dictionary,
            payload: Payload::Filtered(filtered),
            decode_result: None,
            closed: false,
        }
    }

    /// A stream whose payload is decoded content, encoded on demand through `/Filter`.
    pub fn from_unfiltered(dictionary: Dictionary, unfiltered: Vec<u8>) -> Self {
        Self {
            dictionary,
            payload: Payload::Unfiltered(unfiltered),
            decode_result: None,
            closed: false,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Mutable access to the dictionary. Changing `/Filter` here does not convert the
    /// payload; use [`set_filters`](Stream::set_filters) for that.
    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    pub fn state(&self) -> PayloadState {
        match self.payload {
            Payload::Empty => PayloadState::Empty,
            Payload::Filtered(_) => PayloadState::HasFiltered,
            Payload::Unfiltered(_) => PayloadState::HasUnfiltered,
            Payload::Both { .. } => PayloadState::HasBoth,
        }
    }

    pub fn filters(&self) -> Result<FilterChain> {
        FilterChain::from_dictionary(&self.dictionary)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release both buffers. Any later read fails with [`PdfError::StreamClosed`].
    pub fn close(&mut self) {
        self.payload = Payload::Empty;
        self.decode_result = None;
        self.closed = true;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(PdfError::StreamClosed)
        } else {
            Ok(())
        }
    }

    pub fn filtered_bytes(&mut self) -> Result<&[u8]> {
        self.filtered_bytes_with(filters::standard_registry())
    }

    pub fn filtered_bytes_with(&mut self, registry: &FilterRegistry) -> Result<&[u8]> {
        self.ensure_open()?;
        self.encode_if_needed(registry)?;
        Ok(match &self.payload {
            Payload::Filtered(filtered) | Payload::Both { filtered, .. } => filtered,
            _ => &[],
        })
    }

    pub fn unfiltered_bytes(&mut self) -> Result<&[u8]> {
        self.unfiltered_bytes_with(filters::standard_registry())
    }

    pub fn unfiltered_bytes_with(&mut self, registry: &FilterRegistry) -> Result<&[u8]> {
        self.ensure_open()?;
        self.decode_if_needed(registry)?;
        Ok(match &self.payload {
            Payload::Unfiltered(unfiltered) | Payload::Both { unfiltered, .. } => unfiltered,
            _ => &[],
        })
    }

    /// Metadata recorded by the last decode, decoding first if necessary.
    pub fn decode_result(&mut self) -> Result<Option<&DecodeResult>> {
        self.ensure_open()?;
        self.decode_if_needed(filters::standard_registry())?;
        Ok(self.decode_result.as_ref())
    }

    pub fn filtered_length(&mut self) -> Result<usize> {
        Ok(self.filtered_bytes()?.len())
    }

    /// Filtered bytes ready to be written, with `/Length` rewritten to their exact size.
    pub fn prepare_for_output(&mut self) -> Result<&[u8]> {
        self.prepare_for_output_with(filters::standard_registry())
    }

    pub fn prepare_for_output_with(&mut self, registry: &FilterRegistry) -> Result<&[u8]> {
        let length = self.filtered_bytes_with(registry)?.len();
        self.dictionary.set("Length", length);
        self.filtered_bytes_with(registry)
    }

    /// Replace the physical bytes. Both cached buffers and the decode metadata are dropped.
    pub fn create_filtered_stream(&mut self, filtered: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        self.dictionary.set("Length", filtered.len());
        self.payload = Payload::Filtered(filtered);
        self.decode_result = None;
        Ok(())
    }

    /// Replace the decoded content. The cached physical bytes are dropped.
    pub fn create_unfiltered_stream(&mut self, unfiltered: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        self.payload = Payload::Unfiltered(unfiltered);
        Ok(())
    }

    /// Change the filter chain. The payload is decoded with the old chain first so no
    /// content is lost, then only the physical bytes are dropped. `/DecodeParms` of the
    /// old chain no longer applies and is removed.
    pub fn set_filters(&mut self, filters: Option<Object>) -> Result<()> {
        self.set_filters_with(filters, filters::standard_registry())
    }

    pub fn set_filters_with(
        &mut self,
        filters: Option<Object>,
        registry: &FilterRegistry,
    ) -> Result<()> {
        self.ensure_open()?;
        self.decode_if_needed(registry)?;

        match filters {
            Some(filters) if !filters.is_null() => self.dictionary.set("Filter", filters),
            _ => {
                self.dictionary.remove("Filter");
            }
        }
        self.dictionary.remove("DecodeParms");

        self.payload = match std::mem::take(&mut self.payload) {
            Payload::Both { unfiltered, .. } | Payload::Unfiltered(unfiltered) => {
                Payload::Unfiltered(unfiltered)
            }
            other => other,
        };
        Ok(())
    }

    fn decode_if_needed(&mut self, registry: &FilterRegistry) -> Result<()> {
        if let Payload::Filtered(filtered) = &self.payload {
            trace!(length = filtered.len(), "decoding stream payload");
            let (unfiltered, result) = filters::decode(&self.dictionary, filtered, registry)?;
            if let Payload::Filtered(filtered) = std::mem::take(&mut self.payload) {
                self.payload = Payload::Both {
                    filtered,
                    unfiltered,
                };
            }
            self.decode_result = Some(result);
        }
        Ok(())
    }

    fn encode_if_needed(&mut self, registry: &FilterRegistry) -> Result<()> {
        if let Payload::Unfiltered(unfiltered) = &self.payload {
            trace!(length = unfiltered.len(), "encoding stream payload");
            let filtered = filters::encode(&self.dictionary, unfiltered, registry)?;
            if let Payload::Unfiltered(unfiltered) = std::mem::take(&mut self.payload) {
                self.payload = Payload::Both {
                    filtered,
                    unfiltered,
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Name;

    fn hex_dict() -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("ASCIIHexDecode"));
        dict
    }

    #[test]
    fn test_empty_stream_reads_as_empty() {
        let mut stream = Stream::new(Dictionary::new());
        assert_eq!(stream.state(), PayloadState::Empty);
        assert!(stream.unfiltered_bytes().unwrap().is_empty());
        assert!(stream.filtered_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_lazy_decode_caches_both_buffers() {
        let mut stream = Stream::from_filtered(hex_dict(), b"414243>".to_vec());
        assert_eq!(stream.state(), PayloadState::HasFiltered);

        assert_eq!(stream.unfiltered_bytes().unwrap(), b"ABC");
        assert_eq!(stream.state(), PayloadState::HasBoth);
        assert_eq!(stream.filtered_bytes().unwrap(), b"414243>");
    }

    #[test]
    fn test_lazy_encode_caches_both_buffers() {
        let mut stream = Stream::from_unfiltered(hex_dict(), b"ABC".to_vec());
        assert_eq!(stream.state(), PayloadState::HasUnfiltered);

        assert_eq!(stream.filtered_bytes().unwrap(), b"414243>");
        assert_eq!(stream.state(), PayloadState::HasBoth);
    }

    #[test]
    fn test_create_filtered_stream_drops_both_buffers() {
        let mut stream = Stream::from_filtered(hex_dict(), b"414243>".to_vec());
        stream.unfiltered_bytes().unwrap();
        assert!(stream.decode_result().unwrap().is_some());

        stream.create_filtered_stream(b"44>".to_vec()).unwrap();
        assert_eq!(stream.state(), PayloadState::HasFiltered);
        assert_eq!(stream.dictionary().get_integer("Length"), Some(3));
        assert_eq!(stream.unfiltered_bytes().unwrap(), b"D");
    }

    #[test]
    fn test_create_unfiltered_stream_drops_filtered_buffer() {
        let mut stream = Stream::from_filtered(hex_dict(), b"414243>".to_vec());
        stream.unfiltered_bytes().unwrap();

        stream.create_unfiltered_stream(b"xyz".to_vec()).unwrap();
        assert_eq!(stream.state(), PayloadState::HasUnfiltered);
        assert_eq!(stream.filtered_bytes().unwrap(), b"78797A>");
    }

    #[test]
    fn test_set_filters_decodes_first_and_drops_filtered() {
        let mut stream = Stream::from_filtered(hex_dict(), b"48656C6C6F>".to_vec());
        stream.set_filters(None).unwrap();

        assert_eq!(stream.state(), PayloadState::HasUnfiltered);
        assert!(!stream.dictionary().contains_key("Filter"));
        assert_eq!(stream.filtered_bytes().unwrap(), b"Hello");
    }

    #[test]
    fn test_set_filters_to_new_chain() {
        let mut stream = Stream::from_unfiltered(Dictionary::new(), b"Hi".to_vec());
        stream
            .set_filters(Some(Object::name("ASCIIHexDecode")))
            .unwrap();
        assert_eq!(
            stream.dictionary().get_name("Filter"),
            Some(&Name::from("ASCIIHexDecode"))
        );
        assert_eq!(stream.filtered_bytes().unwrap(), b"4869>");
    }

    #[test]
    fn test_prepare_for_output_rewrites_length() {
        let mut dict = hex_dict();
        dict.set("Length", 999);
        let mut stream = Stream::from_unfiltered(dict, b"AB".to_vec());

        let bytes = stream.prepare_for_output().unwrap().to_vec();
        assert_eq!(bytes, b"4142>");
        assert_eq!(stream.dictionary().get_integer("Length"), Some(5));
    }

    #[test]
    fn test_closed_stream_fails_reads() {
        let mut stream = Stream::from_unfiltered(Dictionary::new(), b"data".to_vec());
        stream.close();

        assert!(stream.is_closed());
        assert!(matches!(
            stream.unfiltered_bytes(),
            Err(PdfError::StreamClosed)
        ));
        assert!(matches!(stream.filtered_bytes(), Err(PdfError::StreamClosed)));
        assert!(matches!(
            stream.create_filtered_stream(vec![]),
            Err(PdfError::StreamClosed)
        ));
    }

    #[test]
    fn test_failed_decode_leaves_buffers_unset() {
        let mut stream = Stream::from_filtered(hex_dict(), b"not hex at all".to_vec());
        assert!(stream.unfiltered_bytes().is_err());
        assert_eq!(stream.state(), PayloadState::HasFiltered);
        assert!(stream.decode_result.is_none());
    }

    #[test]
    fn test_unknown_filter_is_fatal() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("NoSuchDecode"));
        let mut stream = Stream::from_filtered(dict, b"abc".to_vec());
        assert!(matches!(
            stream.unfiltered_bytes(),
            Err(PdfError::UnknownFilter(name)) if name == "NoSuchDecode"
        ));
    }
}
