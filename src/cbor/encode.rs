//! Token stream to CBOR bytes.

use super::{
    AI_INDEFINITE, BYTE_BREAK, BYTE_F64, BYTE_FALSE, BYTE_NULL, BYTE_TRUE, MAJOR_ARR, MAJOR_BYTES,
    MAJOR_MAP, MAJOR_NINT, MAJOR_TEXT, MAJOR_UINT,
};
use crate::error::{Error, Result};
use crate::pump::{Sink, Step};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    Map,
    Arr,
}

/// One open composite: the announced entry count (if definite) and how far
/// through it we are.
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    announced: Option<usize>,
    seen: usize,
    expect_key: bool,
}

/// A [`Sink`] that renders tokens as canonical CBOR bytes.
///
/// Definite-length opens produce definite-length wire composites;
/// length-unknown opens produce indefinite-length composites terminated by
/// the break byte.
#[derive(Debug, Default)]
pub struct Encoder {
    out: Vec<u8>,
    frames: Vec<Frame>,
    done: bool,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Encoder::default()
    }

    /// The encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// Minimal-length head for a major type and its argument.
    fn write_head(&mut self, major: u8, arg: u64) {
        match arg {
            0..=23 => self.out.push(major | arg as u8),
            24..=0xff => {
                self.out.push(major | 24);
                self.out.push(arg as u8);
            }
            0x100..=0xffff => {
                self.out.push(major | 25);
                self.out.extend_from_slice(&(arg as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.out.push(major | 26);
                self.out.extend_from_slice(&(arg as u32).to_be_bytes());
            }
            _ => {
                self.out.push(major | 27);
                self.out.extend_from_slice(&arg.to_be_bytes());
            }
        }
    }

    /// Phase check before an item may start here. Map keys must be strings.
    fn check_item_legal(&self, token: &Token) -> Result<()> {
        if self.done {
            return Err(Error::PumpDesync("encoder stepped past completion"));
        }
        if let Some(top) = self.frames.last() {
            if top.kind == FrameKind::Map && top.expect_key && !matches!(token, Token::String(_)) {
                return Err(Error::malformed("map key (string)", token.kind()));
            }
            if let Some(announced) = top.announced {
                let limit = match top.kind {
                    FrameKind::Map => announced * 2,
                    FrameKind::Arr => announced,
                };
                if top.seen == limit {
                    return Err(Error::malformed(
                        "close of a composite whose announced length was reached",
                        token.kind(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Bookkeeping once an item has started at the current depth.
    fn item_started(&mut self) {
        match self.frames.last_mut() {
            Some(top) => {
                if top.kind == FrameKind::Map {
                    top.expect_key = !top.expect_key;
                }
                top.seen += 1;
            }
            None => self.done = true,
        }
    }

    fn close_frame(&mut self, want: FrameKind, found: &Token) -> Result<()> {
        let top = match self.frames.last() {
            Some(top) if top.kind == want => self.frames.pop().expect("last() checked above"),
            Some(top) => {
                let expected = match top.kind {
                    FrameKind::Map => "map entries or map-close",
                    FrameKind::Arr => "array elements or array-close",
                };
                return Err(Error::malformed(expected, found.kind()));
            }
            None => return Err(Error::malformed("a value", found.kind())),
        };
        if top.kind == FrameKind::Map && !top.expect_key {
            return Err(Error::malformed("a map value before close", found.kind()));
        }
        match top.announced {
            Some(announced) => {
                let observed = match top.kind {
                    FrameKind::Map => top.seen / 2,
                    FrameKind::Arr => top.seen,
                };
                if observed != announced {
                    return Err(Error::LengthMismatch {
                        announced,
                        observed,
                    });
                }
                // Definite-length composites need no terminator byte.
            }
            None => self.out.push(BYTE_BREAK),
        }
        if self.frames.is_empty() {
            self.done = true;
        }
        Ok(())
    }
}

impl Sink for Encoder {
    fn step(&mut self, slot: &mut Token) -> Result<Step> {
        match slot {
            Token::MapClose => {
                let found = Token::MapClose;
                self.close_frame(FrameKind::Map, &found)?;
            }
            Token::ArrClose => {
                let found = Token::ArrClose;
                self.close_frame(FrameKind::Arr, &found)?;
            }
            token => {
                self.check_item_legal(token)?;
                match token {
                    Token::MapOpen { len } => {
                        let len = *len;
                        match len {
                            Some(n) => self.write_head(MAJOR_MAP, n as u64),
                            None => self.out.push(MAJOR_MAP | AI_INDEFINITE),
                        }
                        self.item_started();
                        self.done = false;
                        self.frames.push(Frame {
                            kind: FrameKind::Map,
                            announced: len,
                            seen: 0,
                            expect_key: true,
                        });
                        return Ok(Step::Pending);
                    }
                    Token::ArrOpen { len } => {
                        let len = *len;
                        match len {
                            Some(n) => self.write_head(MAJOR_ARR, n as u64),
                            None => self.out.push(MAJOR_ARR | AI_INDEFINITE),
                        }
                        self.item_started();
                        self.done = false;
                        self.frames.push(Frame {
                            kind: FrameKind::Arr,
                            announced: len,
                            seen: 0,
                            expect_key: false,
                        });
                        return Ok(Step::Pending);
                    }
                    Token::Null => self.out.push(BYTE_NULL),
                    Token::Bool(b) => self.out.push(if *b { BYTE_TRUE } else { BYTE_FALSE }),
                    Token::Uint(u) => self.write_head(MAJOR_UINT, *u),
                    Token::Int(i) => {
                        // Non-negative signed tokens take the unsigned wire
                        // form; negatives encode as -1-n.
                        if *i >= 0 {
                            self.write_head(MAJOR_UINT, *i as u64);
                        } else {
                            self.write_head(MAJOR_NINT, (-(*i + 1)) as u64);
                        }
                    }
                    Token::Float(f) => {
                        self.out.push(BYTE_F64);
                        self.out.extend_from_slice(&f.to_be_bytes());
                    }
                    Token::String(s) => {
                        self.write_head(MAJOR_TEXT, s.len() as u64);
                        self.out.extend_from_slice(s.as_bytes());
                    }
                    Token::Bytes(b) => {
                        self.write_head(MAJOR_BYTES, b.len() as u64);
                        self.out.extend_from_slice(b);
                    }
                    Token::MapClose | Token::ArrClose => unreachable!("handled above"),
                }
                self.item_started();
            }
        }
        Ok(if self.done { Step::Done } else { Step::Pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::{pump, TokenBuffer};

    fn encode(tokens: Vec<Token>) -> Result<Vec<u8>> {
        let mut replay = TokenBuffer::from_tokens(tokens);
        let mut encoder = Encoder::new();
        pump(&mut replay, &mut encoder)?;
        Ok(encoder.into_bytes())
    }

    #[test]
    fn integer_heads_are_minimal() {
        assert_eq!(encode(vec![Token::Uint(0)]).unwrap(), [0x00]);
        assert_eq!(encode(vec![Token::Uint(23)]).unwrap(), [0x17]);
        assert_eq!(encode(vec![Token::Uint(24)]).unwrap(), [0x18, 24]);
        assert_eq!(encode(vec![Token::Uint(500)]).unwrap(), [0x19, 0x01, 0xf4]);
        assert_eq!(
            encode(vec![Token::Uint(u64::MAX)]).unwrap(),
            [0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn negatives_encode_as_offset() {
        assert_eq!(encode(vec![Token::Int(-1)]).unwrap(), [0x20]);
        assert_eq!(encode(vec![Token::Int(-500)]).unwrap(), [0x39, 0x01, 0xf3]);
        assert_eq!(
            encode(vec![Token::Int(i64::MIN)]).unwrap(),
            [0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
        // Non-negative signed tokens land on the unsigned major type.
        assert_eq!(encode(vec![Token::Int(10)]).unwrap(), [0x0a]);
    }

    #[test]
    fn simple_values_and_floats() {
        assert_eq!(encode(vec![Token::Bool(false)]).unwrap(), [0xf4]);
        assert_eq!(encode(vec![Token::Bool(true)]).unwrap(), [0xf5]);
        assert_eq!(encode(vec![Token::Null]).unwrap(), [0xf6]);
        assert_eq!(
            encode(vec![Token::Float(1.5)]).unwrap(),
            [0xfb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn definite_map_has_no_terminator() {
        let bytes = encode(vec![
            Token::MapOpen { len: Some(1) },
            Token::String("a".to_string()),
            Token::Uint(1),
            Token::MapClose,
        ])
        .unwrap();
        assert_eq!(bytes, [0xa1, 0x61, b'a', 0x01]);
    }

    #[test]
    fn indefinite_array_gets_break() {
        let bytes = encode(vec![
            Token::ArrOpen { len: None },
            Token::Uint(1),
            Token::ArrClose,
        ])
        .unwrap();
        assert_eq!(bytes, [0x9f, 0x01, 0xff]);
    }

    #[test]
    fn non_string_map_key_rejected() {
        let err = encode(vec![
            Token::MapOpen { len: Some(1) },
            Token::Uint(1),
            Token::Uint(2),
            Token::MapClose,
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MalformedStream { .. }));
    }

    #[test]
    fn announced_length_enforced() {
        let err = encode(vec![
            Token::ArrOpen { len: Some(2) },
            Token::Uint(1),
            Token::ArrClose,
        ])
        .unwrap_err();
        assert_eq!(
            err,
            Error::LengthMismatch {
                announced: 2,
                observed: 1
            }
        );
    }
}
