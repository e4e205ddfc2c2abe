//! JSON text to token stream.
//!
//! A cursor-based state machine in the single-pass, no-backtracking style:
//! one frame per open composite tracks whether a separator must precede the
//! next entry and whether a structural close is currently legal. String
//! decoding is its own small character-class machine validating escapes
//! (including surrogate-pair combination) before the captured bytes become
//! the token's string value. All errors carry line/column positions.

use crate::error::{Error, Result};
use crate::pump::{Source, Step};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    Map,
    Arr,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    has_entry: bool,
    expect_key: bool,
}

/// A [`Source`] that parses one JSON value from text.
///
/// Insignificant whitespace is tolerated anywhere between structural
/// characters. The decoder stops after the value; [`Decoder::finish_trailing`]
/// verifies nothing but whitespace follows.
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    frames: Vec<Frame>,
    done: bool,
}

impl<'a> Decoder<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Decoder {
            input: text.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            frames: Vec::new(),
            done: false,
        }
    }

    /// Errors unless only whitespace remains after the value.
    pub fn finish_trailing(&mut self) -> Result<()> {
        self.skip_ws();
        if self.pos < self.input.len() {
            return Err(self.err_here("trailing characters after the value"));
        }
        Ok(())
    }

    fn err_here(&self, msg: impl Into<String>) -> Error {
        Error::syntax(self.line, self.col, msg)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if byte & 0xc0 != 0x80 {
            // Continuation bytes of a multi-byte character share its column.
            self.col += 1;
        }
        Some(byte)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.advance();
        }
    }

    fn expect_literal(&mut self, literal: &str, token: Token) -> Result<Token> {
        for want in literal.bytes() {
            match self.advance() {
                Some(byte) if byte == want => {}
                _ => return Err(self.err_here(format!("invalid literal, expected {:?}", literal))),
            }
        }
        Ok(token)
    }

    fn parse_hex4(&mut self) -> Result<u16> {
        let mut code: u16 = 0;
        for _ in 0..4 {
            let digit = match self.advance() {
                Some(b @ b'0'..=b'9') => b - b'0',
                Some(b @ b'a'..=b'f') => b - b'a' + 10,
                Some(b @ b'A'..=b'F') => b - b'A' + 10,
                _ => return Err(self.err_here("expected 4 hex digits in \\u escape")),
            };
            code = code << 4 | u16::from(digit);
        }
        Ok(code)
    }

    fn parse_string(&mut self) -> Result<String> {
        self.advance(); // opening quote
        let mut raw = Vec::new();
        loop {
            let byte = match self.advance() {
                Some(b) => b,
                None => return Err(self.err_here("unterminated string")),
            };
            match byte {
                b'"' => break,
                b'\\' => {
                    let escape = self
                        .advance()
                        .ok_or_else(|| self.err_here("unterminated escape sequence"))?;
                    match escape {
                        b'"' => raw.push(b'"'),
                        b'\\' => raw.push(b'\\'),
                        b'/' => raw.push(b'/'),
                        b'b' => raw.push(0x08),
                        b'f' => raw.push(0x0c),
                        b'n' => raw.push(b'\n'),
                        b'r' => raw.push(b'\r'),
                        b't' => raw.push(b'\t'),
                        b'u' => {
                            let hi = self.parse_hex4()?;
                            let ch = match hi {
                                0xd800..=0xdbff => {
                                    if self.advance() != Some(b'\\')
                                        || self.advance() != Some(b'u')
                                    {
                                        return Err(
                                            self.err_here("unpaired high surrogate in \\u escape")
                                        );
                                    }
                                    let lo = self.parse_hex4()?;
                                    if !(0xdc00..=0xdfff).contains(&lo) {
                                        return Err(
                                            self.err_here("invalid low surrogate in \\u escape")
                                        );
                                    }
                                    let combined = 0x10000
                                        + ((u32::from(hi) - 0xd800) << 10)
                                        + (u32::from(lo) - 0xdc00);
                                    char::from_u32(combined)
                                        .ok_or_else(|| self.err_here("invalid surrogate pair"))?
                                }
                                0xdc00..=0xdfff => {
                                    return Err(self.err_here("unpaired low surrogate in \\u escape"))
                                }
                                _ => char::from_u32(u32::from(hi))
                                    .ok_or_else(|| self.err_here("invalid \\u escape"))?,
                            };
                            let mut buf = [0u8; 4];
                            raw.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                        }
                        other => {
                            return Err(self.err_here(format!(
                                "invalid escape character {:?}",
                                other as char
                            )))
                        }
                    }
                }
                b if b < 0x20 => {
                    return Err(self.err_here("raw control character in string"))
                }
                other => raw.push(other),
            }
        }
        String::from_utf8(raw).map_err(|_| self.err_here("string is not valid UTF-8"))
    }

    fn parse_number(&mut self) -> Result<Token> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.advance();
        }
        // Integer part: a lone zero or a nonzero-led digit run.
        match self.peek() {
            Some(b'0') => {
                self.advance();
            }
            Some(b'1'..=b'9') => {
                while matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.advance();
                }
            }
            _ => return Err(self.err_here("expected a digit")),
        }
        let mut fractional = false;
        if self.peek() == Some(b'.') {
            fractional = true;
            self.advance();
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.err_here("expected a digit after the decimal point"));
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            fractional = true;
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.err_here("expected a digit in the exponent"));
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        let span = std::str::from_utf8(&self.input[start..self.pos])
            .expect("number spans are ASCII");
        if fractional {
            let parsed: f64 = span
                .parse()
                .map_err(|_| self.err_here("number out of range"))?;
            return Ok(Token::Float(parsed));
        }
        // Integer: non-negative values take the unsigned token; either kind
        // falls back to a float when it overflows its 64-bit range.
        if negative {
            match span.parse::<i64>() {
                Ok(i) => Ok(Token::Int(i)),
                Err(_) => Ok(Token::Float(
                    span.parse()
                        .map_err(|_| self.err_here("number out of range"))?,
                )),
            }
        } else {
            match span.parse::<u64>() {
                Ok(u) => Ok(Token::Uint(u)),
                Err(_) => Ok(Token::Float(
                    span.parse()
                        .map_err(|_| self.err_here("number out of range"))?,
                )),
            }
        }
    }

    /// Parses the first token of a value. Opens push their frame here.
    fn parse_value(&mut self) -> Result<Token> {
        match self.peek() {
            Some(b'{') => {
                self.advance();
                self.frames.push(Frame {
                    kind: FrameKind::Map,
                    has_entry: false,
                    expect_key: true,
                });
                Ok(Token::MapOpen { len: None })
            }
            Some(b'[') => {
                self.advance();
                self.frames.push(Frame {
                    kind: FrameKind::Arr,
                    has_entry: false,
                    expect_key: false,
                });
                Ok(Token::ArrOpen { len: None })
            }
            Some(b'"') => Ok(Token::String(self.parse_string()?)),
            Some(b't') => self.expect_literal("true", Token::Bool(true)),
            Some(b'f') => self.expect_literal("false", Token::Bool(false)),
            Some(b'n') => self.expect_literal("null", Token::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(other) => Err(self.err_here(format!(
                "unexpected character {:?} at the start of a value",
                other as char
            ))),
            None => Err(self.err_here("unexpected end of input")),
        }
    }

    fn pop_frame(&mut self) -> Token {
        let top = self.frames.pop().expect("caller checked a frame is open");
        if self.frames.is_empty() {
            self.done = true;
        }
        match top.kind {
            FrameKind::Map => Token::MapClose,
            FrameKind::Arr => Token::ArrClose,
        }
    }
}

impl Source for Decoder<'_> {
    fn step(&mut self, slot: &mut Token) -> Result<Step> {
        if self.done {
            return Err(Error::PumpDesync("decoder stepped past completion"));
        }
        self.skip_ws();

        enum Pos {
            Root,
            MapKey,
            MapValue,
            ArrItem,
        }
        let position = match self.frames.last() {
            None => Pos::Root,
            Some(top) if top.kind == FrameKind::Map && top.expect_key => Pos::MapKey,
            Some(top) if top.kind == FrameKind::Map => Pos::MapValue,
            Some(_) => Pos::ArrItem,
        };

        let token = match position {
            Pos::Root => self.parse_value()?,
            Pos::MapKey => {
                if self.peek() == Some(b'}') {
                    self.advance();
                    *slot = self.pop_frame();
                    return Ok(if self.done { Step::Done } else { Step::Pending });
                }
                let top = self.frames.last().expect("map key position");
                if top.has_entry {
                    if self.peek() != Some(b',') {
                        return Err(self.err_here("expected ',' or '}'"));
                    }
                    self.advance();
                    self.skip_ws();
                }
                if self.peek() != Some(b'"') {
                    return Err(self.err_here("expected a string key"));
                }
                let key = self.parse_string()?;
                let top = self.frames.last_mut().expect("map key position");
                top.expect_key = false;
                Token::String(key)
            }
            Pos::MapValue => {
                if self.peek() != Some(b':') {
                    return Err(self.err_here("expected ':' after the key"));
                }
                self.advance();
                self.skip_ws();
                let top = self.frames.last_mut().expect("map value position");
                top.expect_key = true;
                top.has_entry = true;
                self.parse_value()?
            }
            Pos::ArrItem => {
                if self.peek() == Some(b']') {
                    self.advance();
                    *slot = self.pop_frame();
                    return Ok(if self.done { Step::Done } else { Step::Pending });
                }
                if self.frames.last().expect("array item position").has_entry {
                    if self.peek() != Some(b',') {
                        return Err(self.err_here("expected ',' or ']'"));
                    }
                    self.advance();
                    self.skip_ws();
                }
                self.frames
                    .last_mut()
                    .expect("array item position")
                    .has_entry = true;
                self.parse_value()?
            }
        };

        if token.is_scalar() && self.frames.is_empty() {
            self.done = true;
        }
        *slot = token;
        Ok(if self.done { Step::Done } else { Step::Pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::{pump, TokenBuffer};

    fn decode(text: &str) -> Result<Vec<Token>> {
        let mut decoder = Decoder::new(text);
        let mut buffer = TokenBuffer::new();
        pump(&mut decoder, &mut buffer)?;
        decoder.finish_trailing()?;
        Ok(buffer.into_tokens())
    }

    #[test]
    fn whitespace_is_insignificant() {
        let tokens = decode(" {\n  \"a\" : [ 1 , 2 ] \t}\n").unwrap();
        assert_eq!(
            tokens,
            [
                Token::MapOpen { len: None },
                Token::String("a".to_string()),
                Token::ArrOpen { len: None },
                Token::Uint(1),
                Token::Uint(2),
                Token::ArrClose,
                Token::MapClose,
            ]
        );
    }

    #[test]
    fn numbers_classify_by_form() {
        assert_eq!(decode("42").unwrap(), [Token::Uint(42)]);
        assert_eq!(decode("-42").unwrap(), [Token::Int(-42)]);
        assert_eq!(decode("42.0").unwrap(), [Token::Float(42.0)]);
        assert_eq!(decode("1e3").unwrap(), [Token::Float(1000.0)]);
        // Overflowing integers degrade to floats rather than failing.
        assert_eq!(
            decode("100000000000000000000").unwrap(),
            [Token::Float(1e20)]
        );
    }

    #[test]
    fn leading_zeros_rejected() {
        assert!(decode("01").is_err());
        assert!(decode("-01").is_err());
        assert!(decode("1.").is_err());
        assert!(decode(".5").is_err());
    }

    #[test]
    fn escapes_and_surrogates() {
        assert_eq!(
            decode(r#""a\"b\\c\/\nA""#).unwrap(),
            [Token::String("a\"b\\c/\nA".to_string())]
        );
        assert_eq!(
            decode(r#""😀""#).unwrap(),
            [Token::String("\u{1f600}".to_string())]
        );
        assert!(decode(r#""\ud83d""#).is_err());
        assert!(decode(r#""\ude00""#).is_err());
        assert!(decode(r#""\x""#).is_err());
    }

    #[test]
    fn missing_comma_reports_position() {
        let err = decode(r#"{"x":"1""y":"2"}"#).unwrap_err();
        match err {
            Error::Syntax { line, col, msg } => {
                assert_eq!(line, 1);
                assert_eq!(col, 9);
                assert!(msg.contains("','"));
            }
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn trailing_commas_rejected() {
        assert!(decode("[1,]").is_err());
        assert!(decode(r#"{"a":1,}"#).is_err());
    }

    #[test]
    fn line_numbers_advance() {
        let err = decode("{\n\"a\": }").unwrap_err();
        match err {
            Error::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn raw_control_characters_rejected() {
        assert!(decode("\"a\u{0001}b\"").is_err());
    }
}
