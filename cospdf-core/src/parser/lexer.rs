//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer works over
//! an in-memory byte slice so callers can jump to any offset and backtrack freely.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// Literal string `( ... )`
    String(Vec<u8>),

    /// Hexadecimal string `< ... >`
    HexString(Vec<u8>),

    /// Name object, `#XX` escapes already decoded
    Name(Vec<u8>),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    Stream,
    EndStream,
    Obj,
    EndObj,
    /// `R` of an indirect reference
    R,
    XRef,
    Trailer,
    StartXRef,

    /// Null object
    Null,

    /// Comment (usually ignored)
    Comment(Vec<u8>),

    /// End of input
    Eof,
}

/// PDF whitespace, including NUL and form feed.
pub fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

pub fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// PDF Lexer for tokenizing PDF content
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// A lexer positioned at `position`
    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self {
            data,
            position: position.min(data.len()),
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.data.len());
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.data.len()
    }

    fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::SyntaxError {
            position: self.position,
            message: message.into(),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();

        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'%' => Ok(self.read_comment()),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.consume_char();
                if self.peek_char() == Some(b'>') {
                    self.consume_char();
                    Ok(Token::DictEnd)
                } else {
                    Err(self.syntax_error("Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.consume_char();
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.consume_char();
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'0'..=b'9' | b'.' => self.read_number(),
            _ if ch.is_ascii_alphabetic() => self.read_keyword(),
            _ => Err(self.syntax_error(format!("Unexpected character: {}", ch as char))),
        }
    }

    /// Next token that is not a comment
    pub fn next_significant_token(&mut self) -> ParseResult<Token> {
        loop {
            match self.next_token()? {
                Token::Comment(_) => continue,
                token => return Ok(token),
            }
        }
    }

    /// Peek the next significant token without consuming it
    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let saved = self.position;
        let token = self.next_significant_token();
        self.position = saved;
        token
    }

    pub fn peek_char(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn consume_char(&mut self) -> Option<u8> {
        let ch = self.peek_char();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    /// Skip whitespace and return the number of bytes skipped
    pub fn skip_whitespace(&mut self) -> usize {
        let start = self.position;
        while matches!(self.peek_char(), Some(ch) if is_whitespace(ch)) {
            self.position += 1;
        }
        self.position - start
    }

    /// Read a comment (from % to end of line)
    fn read_comment(&mut self) -> Token {
        self.consume_char();
        let start = self.position;
        while !matches!(self.peek_char(), None | Some(b'\n') | Some(b'\r')) {
            self.position += 1;
        }
        Token::Comment(self.data[start..self.position].to_vec())
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> ParseResult<Token> {
        self.consume_char();
        let mut name = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) || is_delimiter(ch) {
                break;
            }
            self.consume_char();

            // /A#20B means /A B
            if ch == b'#' {
                let hex = self
                    .data
                    .get(self.position..self.position + 2)
                    .and_then(|pair| std::str::from_utf8(pair).ok())
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok());
                match hex {
                    Some(value) => {
                        self.position += 2;
                        name.push(value);
                    }
                    // a lone '#' is kept as is
                    None => name.push(ch),
                }
            } else {
                name.push(ch);
            }
        }

        Ok(Token::Name(name))
    }

    /// Read a literal string (parentheses)
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.consume_char();
        let mut string = Vec::new();
        let mut paren_depth = 1;

        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.syntax_error("Unterminated string"))?;

            match ch {
                b'\\' => {
                    let escaped = self
                        .consume_char()
                        .ok_or_else(|| self.syntax_error("Unterminated string"))?;
                    match escaped {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'0'..=b'7' => {
                            let mut value = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match self.peek_char() {
                                    Some(next @ b'0'..=b'7') => {
                                        self.consume_char();
                                        value = value * 8 + u32::from(next - b'0');
                                    }
                                    _ => break,
                                }
                            }
                            string.push(value as u8);
                        }
                        // any other escaped byte, including a raw line break, stands for itself
                        other => string.push(other),
                    }
                }
                b'(' => {
                    paren_depth += 1;
                    string.push(ch);
                }
                b')' => {
                    paren_depth -= 1;
                    if paren_depth == 0 {
                        break;
                    }
                    string.push(ch);
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read angle bracket tokens (hex strings or dict markers)
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        self.consume_char();

        if self.peek_char() == Some(b'<') {
            self.consume_char();
            return Ok(Token::DictStart);
        }

        let mut digits = Vec::new();
        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| self.syntax_error("Unterminated hex string"))?;
            match ch {
                b'>' => break,
                _ if ch.is_ascii_hexdigit() => digits.push(ch),
                _ if is_whitespace(ch) => {}
                _ => return Err(self.syntax_error("Invalid character in hex string")),
            }
        }

        // Pad with 0 if odd number of digits
        if digits.len() % 2 != 0 {
            digits.push(b'0');
        }

        let bytes = hex::decode(&digits).map_err(|_| self.syntax_error("Invalid hex string"))?;
        Ok(Token::HexString(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let mut has_dot = false;

        if matches!(self.peek_char(), Some(b'+') | Some(b'-')) {
            self.consume_char();
        }

        while let Some(ch) = self.peek_char() {
            match ch {
                b'0'..=b'9' => {
                    self.consume_char();
                }
                b'.' if !has_dot => {
                    self.consume_char();
                    has_dot = true;
                }
                _ => break,
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.position])
            .map_err(|_| self.syntax_error("Invalid number"))?;

        if text.chars().all(|c| matches!(c, '+' | '-' | '.')) {
            return Err(self.syntax_error(format!("Invalid number: '{text}'")));
        }

        if has_dot {
            text.parse::<f64>()
                .map(Token::Real)
                .map_err(|_| self.syntax_error(format!("Invalid real number: '{text}'")))
        } else {
            match text.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(value)),
                // out of range integers degrade to reals
                Err(_) => text
                    .parse::<f64>()
                    .map(Token::Real)
                    .map_err(|_| self.syntax_error(format!("Invalid integer: '{text}'"))),
            }
        }
    }

    /// Read a keyword
    fn read_keyword(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let word = self.read_word();
        match word {
            b"true" => Ok(Token::Boolean(true)),
            b"false" => Ok(Token::Boolean(false)),
            b"null" => Ok(Token::Null),
            b"stream" => Ok(Token::Stream),
            b"endstream" => Ok(Token::EndStream),
            b"obj" => Ok(Token::Obj),
            b"endobj" => Ok(Token::EndObj),
            b"R" => Ok(Token::R),
            b"xref" => Ok(Token::XRef),
            b"trailer" => Ok(Token::Trailer),
            b"startxref" => Ok(Token::StartXRef),
            _ => Err(ParseError::SyntaxError {
                position: start,
                message: format!("Unknown keyword: {}", String::from_utf8_lossy(word)),
            }),
        }
    }

    /// Read a word (sequence of non-delimiter characters)
    pub fn read_word(&mut self) -> &'a [u8] {
        let start = self.position;
        while matches!(self.peek_char(), Some(ch) if !is_whitespace(ch) && !is_delimiter(ch)) {
            self.position += 1;
        }
        &self.data[start..self.position]
    }

    /// Read a newline sequence (CR, LF, or CRLF)
    pub fn read_newline(&mut self) -> ParseResult<()> {
        match self.peek_char() {
            Some(b'\r') => {
                self.consume_char();
                if self.peek_char() == Some(b'\n') {
                    self.consume_char();
                }
                Ok(())
            }
            Some(b'\n') => {
                self.consume_char();
                Ok(())
            }
            _ => Err(self.syntax_error("Expected newline")),
        }
    }

    /// Read exactly n bytes
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.syntax_error(format!("Expected {n} more bytes")))?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Offset of the next occurrence of `sequence` at or after the current position
    pub fn find(&self, sequence: &[u8]) -> Option<usize> {
        if sequence.is_empty() {
            return Some(self.position);
        }
        self.data[self.position..]
            .windows(sequence.len())
            .position(|window| window == sequence)
            .map(|offset| self.position + offset)
    }

    /// Expect a specific keyword token
    pub fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let token = self.next_significant_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("{expected:?}"),
                found: format!("{token:?}"),
            })
        }
    }
}
