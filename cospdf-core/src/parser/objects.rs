//! PDF Object Parser
//!
//! Builds COS objects from lexer tokens according to ISO 32000-1 Section 7.3,
//! including `n g R` references, indirect object frames and stream payloads.

use super::lexer::{Lexer, Token};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{Dictionary, Name, Object, ObjectId, PdfString, Stream};
use tracing::{debug, warn};

/// Parses objects out of a byte slice, starting at an arbitrary offset.
pub struct ObjectParser<'a, 'o> {
    lexer: Lexer<'a>,
    options: &'o ParseOptions,
}

impl<'a, 'o> ObjectParser<'a, 'o> {
    pub fn new(data: &'a [u8], offset: usize, options: &'o ParseOptions) -> Self {
        Self {
            lexer: Lexer::at(data, offset),
            options,
        }
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Parse one direct object (which may be a reference to an indirect one).
    pub fn parse_object(&mut self) -> ParseResult<Object> {
        let token = self.lexer.next_significant_token()?;
        self.parse_from_token(token)
    }

    /// Parse `n g obj <object> endobj`, returning the id and the object.
    pub fn parse_indirect_object(&mut self) -> ParseResult<(ObjectId, Object)> {
        let number = self.expect_integer("object number")?;
        let generation = self.expect_integer("generation number")?;
        self.lexer.expect(Token::Obj)?;

        let id = object_id(number, generation)?;
        let object = match self.lexer.next_significant_token()? {
            Token::DictStart => {
                let dict = self.parse_dictionary()?;
                self.parse_stream_or_dictionary(dict)?
            }
            token => self.parse_from_token(token)?,
        };

        // A missing endobj is tolerated; the object is complete at this point.
        let saved = self.lexer.position();
        match self.lexer.next_significant_token() {
            Ok(Token::EndObj) => {}
            _ => {
                debug!("Object {} is not followed by endobj", id);
                self.lexer.set_position(saved);
            }
        }

        Ok((id, object))
    }

    fn expect_integer(&mut self, what: &str) -> ParseResult<i64> {
        match self.lexer.next_significant_token()? {
            Token::Integer(value) => Ok(value),
            other => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    fn parse_from_token(&mut self, token: Token) -> ParseResult<Object> {
        match token {
            Token::Null => Ok(Object::Null),
            Token::Boolean(b) => Ok(Object::Boolean(b)),
            Token::Integer(i) => self.parse_integer_or_reference(i),
            Token::Real(r) => Ok(Object::Real(r)),
            Token::String(s) => Ok(Object::String(PdfString::new(s))),
            Token::HexString(s) => Ok(Object::String(PdfString::hex(s))),
            Token::Name(n) => Ok(Object::Name(Name::new(n))),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => Ok(Object::Dictionary(self.parse_dictionary()?)),
            other => Err(ParseError::UnexpectedToken {
                expected: "object".to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    /// `n` alone is an integer; `n g R` is a reference.
    fn parse_integer_or_reference(&mut self, number: i64) -> ParseResult<Object> {
        let saved = self.lexer.position();
        if let Ok(Token::Integer(generation)) = self.lexer.next_significant_token() {
            if let Ok(Token::R) = self.lexer.next_significant_token() {
                return object_id(number, generation).map(Object::Reference);
            }
        }
        self.lexer.set_position(saved);
        Ok(Object::Integer(number))
    }

    fn parse_array(&mut self) -> ParseResult<Object> {
        let mut elements = Vec::new();
        loop {
            match self.lexer.next_significant_token()? {
                Token::ArrayEnd => break,
                Token::Eof => {
                    return Err(self.syntax_error("Unterminated array"));
                }
                token => elements.push(self.parse_from_token(token)?),
            }
        }
        Ok(Object::Array(elements))
    }

    /// Parse dictionary entries after `<<`.
    fn parse_dictionary(&mut self) -> ParseResult<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let key = match self.lexer.next_significant_token()? {
                Token::DictEnd => break,
                Token::Name(name) => Name::new(name),
                Token::Eof => return Err(self.syntax_error("Unterminated dictionary")),
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "dictionary key".to_string(),
                        found: format!("{other:?}"),
                    })
                }
            };
            let value = self.parse_object()?;
            // a null value is equivalent to an absent entry
            if !value.is_null() {
                dict.set(key, value);
            }
        }
        Ok(dict)
    }

    fn parse_stream_or_dictionary(&mut self, dict: Dictionary) -> ParseResult<Object> {
        let saved = self.lexer.position();
        match self.lexer.next_significant_token() {
            Ok(Token::Stream) => {
                let payload = self.parse_stream_data(&dict)?;
                Ok(Object::Stream(Stream::from_filtered(dict, payload)))
            }
            _ => {
                self.lexer.set_position(saved);
                Ok(Object::Dictionary(dict))
            }
        }
    }

    /// Read the payload after the `stream` keyword.
    ///
    /// A direct `/Length` is trusted when `endstream` follows it. Otherwise, in lenient
    /// mode, the payload runs up to the next `endstream` minus its preceding line break.
    fn parse_stream_data(&mut self, dict: &Dictionary) -> ParseResult<Vec<u8>> {
        // stream keyword is followed by CRLF or LF; a lone CR is accepted leniently
        if self.lexer.read_newline().is_err() && !self.options.lenient_streams {
            return Err(self.syntax_error("Expected end of line after 'stream'"));
        }
        let start = self.lexer.position();

        if let Some(length) = dict.get("Length").and_then(Object::as_integer) {
            if let Some(data) = self.read_declared_payload(start, length) {
                return Ok(data);
            }
            if !self.options.lenient_streams {
                return Err(self.syntax_error(format!(
                    "Stream /Length {length} is not followed by endstream"
                )));
            }
            warn!(
                "Stream /Length {} at offset {} is wrong, scanning for endstream",
                length, start
            );
        } else {
            debug!("Stream at offset {} has no direct /Length, scanning", start);
        }

        self.scan_payload(start)
    }

    fn read_declared_payload(&mut self, start: usize, length: i64) -> Option<Vec<u8>> {
        let length = usize::try_from(length).ok()?;
        self.lexer.set_position(start);
        let data = self.lexer.read_bytes(length).ok()?.to_vec();
        match self.lexer.next_significant_token() {
            Ok(Token::EndStream) => Some(data),
            _ => {
                self.lexer.set_position(start);
                None
            }
        }
    }

    fn scan_payload(&mut self, start: usize) -> ParseResult<Vec<u8>> {
        self.lexer.set_position(start);
        let keyword = self
            .lexer
            .find(b"endstream")
            .ok_or_else(|| self.syntax_error("Missing endstream"))?;

        let data = self.lexer.data();
        let mut end = keyword;
        if end > start && data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && data[end - 1] == b'\r' {
            end -= 1;
        }
        let payload = data[start..end].to_vec();

        self.lexer.set_position(keyword + b"endstream".len());
        Ok(payload)
    }

    fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::SyntaxError {
            position: self.lexer.position(),
            message: message.into(),
        }
    }
}

fn object_id(number: i64, generation: i64) -> ParseResult<ObjectId> {
    match (u32::try_from(number), u16::try_from(generation)) {
        (Ok(number), Ok(generation)) => Ok(ObjectId::new(number, generation)),
        _ => Err(ParseError::SyntaxError {
            position: 0,
            message: format!("Invalid object identity {number} {generation}"),
        }),
    }
}

/// Parse a single direct object from a byte slice.
pub fn parse_object(data: &[u8]) -> ParseResult<Object> {
    let options = ParseOptions::default();
    ObjectParser::new(data, 0, &options).parse_object()
}
