//! Object Stream Parser
//!
//! Object streams (ISO 32000-1 Section 7.5.7) pack several non-stream objects into one
//! compressed stream. The decoded data starts with `/N` pairs of integers (object number,
//! relative offset) followed by the objects themselves from byte `/First` on.

use super::lexer::{Lexer, Token};
use super::objects::ObjectParser;
use super::{ParseError, ParseOptions, ParseResult};
use crate::error::Result;
use crate::objects::{Object, Stream};

/// The decoded contents of an object stream
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStream {
    /// (object number, object) in stored order; xref index refers to this position
    objects: Vec<(u32, Object)>,
}

impl ObjectStream {
    /// Decode and parse an object stream.
    pub fn parse(stream: &mut Stream, options: &ParseOptions) -> Result<Self> {
        let dict = stream.dictionary();
        if dict.get_type() != Some("ObjStm") {
            return Err(ParseError::InvalidXRef("container is not an object stream".to_string()).into());
        }
        let count = required_usize(dict.get_integer("N"), "N")?;
        let first = required_usize(dict.get_integer("First"), "First")?;

        let data = stream.unfiltered_bytes()?;
        Ok(Self::parse_data(data, count, first, options)?)
    }

    /// Parse already decoded object stream data.
    pub fn parse_data(
        data: &[u8],
        count: usize,
        first: usize,
        options: &ParseOptions,
    ) -> ParseResult<Self> {
        let mut lexer = Lexer::new(data);
        let mut offsets = Vec::with_capacity(count.min(data.len()));
        for _ in 0..count {
            let number = next_integer(&mut lexer)?;
            let offset = next_integer(&mut lexer)?;
            let number = u32::try_from(number).map_err(|_| invalid_header(number))?;
            let offset = usize::try_from(offset).map_err(|_| invalid_header(offset))?;
            offsets.push((number, offset));
        }

        let mut objects = Vec::with_capacity(offsets.len());
        for (number, offset) in offsets {
            let position = first
                .checked_add(offset)
                .filter(|&p| p < data.len())
                .ok_or_else(|| {
                    ParseError::InvalidXRef(format!(
                        "object {number} lies outside the object stream"
                    ))
                })?;
            let mut parser = ObjectParser::new(data, position, options);
            objects.push((number, parser.parse_object()?));
        }

        Ok(Self { objects })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The object at `index`, checked against the expected object number.
    pub fn get(&self, index: usize, number: u32) -> Option<&Object> {
        match self.objects.get(index) {
            Some((n, object)) if *n == number => Some(object),
            // some writers get the index wrong, fall back to the number
            _ => self
                .objects
                .iter()
                .find(|(n, _)| *n == number)
                .map(|(_, object)| object),
        }
    }
}

fn required_usize(value: Option<i64>, key: &str) -> ParseResult<usize> {
    value
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| ParseError::MissingKey(key.to_string()))
}

fn next_integer(lexer: &mut Lexer<'_>) -> ParseResult<i64> {
    match lexer.next_significant_token()? {
        Token::Integer(value) => Ok(value),
        other => Err(ParseError::UnexpectedToken {
            expected: "integer".to_string(),
            found: format!("{other:?}"),
        }),
    }
}

fn invalid_header(value: i64) -> ParseError {
    ParseError::InvalidXRef(format!("invalid object stream header value {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Dictionary, ObjectId};

    const DATA: &[u8] = b"3 0 4 11 5 19 << /A 1 >> [2 0 R] (text)";

    #[test]
    fn test_parse_object_stream_data() {
        let stream = ObjectStream::parse_data(DATA, 3, 14, &ParseOptions::default()).unwrap();
        assert_eq!(stream.len(), 3);
        assert_eq!(
            stream.get(0, 3).and_then(|o| o.as_dict()).and_then(|d| d.get_integer("A")),
            Some(1)
        );
        assert_eq!(
            stream.get(1, 4),
            Some(&Object::Array(vec![Object::Reference(ObjectId::new(2, 0))]))
        );
        assert_eq!(
            stream.get(2, 5).and_then(|o| o.as_string()).map(|s| s.as_bytes().to_vec()),
            Some(b"text".to_vec())
        );
    }

    #[test]
    fn test_get_falls_back_to_object_number() {
        let stream = ObjectStream::parse_data(DATA, 3, 14, &ParseOptions::default()).unwrap();
        assert!(stream.get(0, 5).is_some());
        assert!(stream.get(0, 42).is_none());
    }

    #[test]
    fn test_parse_from_stream_object() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("ObjStm"));
        dict.set("N", 3);
        dict.set("First", 14);
        let mut stream = Stream::from_filtered(dict, DATA.to_vec());
        let parsed = ObjectStream::parse(&mut stream, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_offset_outside_stream_is_rejected() {
        assert!(ObjectStream::parse_data(b"1 500 null", 1, 6, &ParseOptions::default()).is_err());
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let mut stream = Stream::from_filtered(Dictionary::new(), DATA.to_vec());
        assert!(ObjectStream::parse(&mut stream, &ParseOptions::default()).is_err());
    }
}
