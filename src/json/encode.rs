//! Token stream to canonical JSON text.

use crate::error::{Error, Result};
use crate::pump::{Sink, Step};
use crate::token::Token;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    Map,
    Arr,
}

/// One open composite: whether a separator must precede the next entry, and
/// whether we sit between a key and its value.
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    has_entry: bool,
    expect_key: bool,
}

/// A [`Sink`] that renders tokens as canonical JSON.
#[derive(Debug, Default)]
pub struct Encoder {
    out: String,
    frames: Vec<Frame>,
    done: bool,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Encoder {
            out: String::with_capacity(256),
            frames: Vec::new(),
            done: false,
        }
    }

    /// The encoded text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.out
    }

    fn write_escaped(&mut self, s: &str) {
        self.out.push('"');
        for ch in s.chars() {
            match ch {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\u{0008}' => self.out.push_str("\\b"),
                '\u{000C}' => self.out.push_str("\\f"),
                c if (c as u32) < 0x20 => {
                    let _ = write!(self.out, "\\u{:04x}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    /// Separator discipline before a value item may start at this depth.
    fn begin_item(&mut self) {
        if let Some(top) = self.frames.last_mut() {
            match top.kind {
                FrameKind::Arr => {
                    if top.has_entry {
                        self.out.push(',');
                    }
                    top.has_entry = true;
                }
                FrameKind::Map => {
                    // The comma was written with the key; the value only
                    // flips the frame back to expecting a key.
                    top.expect_key = true;
                    top.has_entry = true;
                }
            }
        } else {
            self.done = true;
        }
    }

    fn write_scalar(&mut self, token: &mut Token) -> Result<()> {
        match token {
            Token::Null => self.out.push_str("null"),
            Token::Bool(true) => self.out.push_str("true"),
            Token::Bool(false) => self.out.push_str("false"),
            Token::Uint(u) => {
                let _ = write!(self.out, "{}", u);
            }
            Token::Int(i) => {
                let _ = write!(self.out, "{}", i);
            }
            Token::Float(f) => {
                if !f.is_finite() {
                    return Err(Error::shape("a finite float (JSON has no other)", "float"));
                }
                if f.trunc() == *f {
                    let _ = write!(self.out, "{:.1}", f);
                } else {
                    let _ = write!(self.out, "{}", f);
                }
            }
            Token::String(s) => {
                let s = std::mem::take(s);
                self.write_escaped(&s);
            }
            Token::Bytes(b) => {
                let encoded = BASE64.encode(std::mem::take(b));
                self.out.push('"');
                self.out.push_str(&encoded);
                self.out.push('"');
            }
            _ => unreachable!("write_scalar sees only scalar tokens"),
        }
        Ok(())
    }

    fn close_frame(&mut self, want: FrameKind, found: &Token) -> Result<()> {
        match self.frames.last() {
            Some(top) if top.kind == want => {
                if top.kind == FrameKind::Map && !top.expect_key {
                    return Err(Error::malformed("a map value before close", found.kind()));
                }
                self.frames.pop();
            }
            Some(top) => {
                let expected = match top.kind {
                    FrameKind::Map => "map entries or map-close",
                    FrameKind::Arr => "array elements or array-close",
                };
                return Err(Error::malformed(expected, found.kind()));
            }
            None => return Err(Error::malformed("a value", found.kind())),
        }
        self.out.push(match want {
            FrameKind::Map => '}',
            FrameKind::Arr => ']',
        });
        if self.frames.is_empty() {
            self.done = true;
        }
        Ok(())
    }
}

impl Sink for Encoder {
    fn step(&mut self, slot: &mut Token) -> Result<Step> {
        if self.done {
            return Err(Error::PumpDesync("encoder stepped past completion"));
        }
        // While a map expects a key, only a string or the close is legal.
        let in_key_position = self
            .frames
            .last()
            .is_some_and(|top| top.kind == FrameKind::Map && top.expect_key);
        match slot {
            Token::MapClose => self.close_frame(FrameKind::Map, &Token::MapClose)?,
            Token::ArrClose => {
                if in_key_position {
                    return Err(Error::malformed("map key (string)", slot.kind()));
                }
                self.close_frame(FrameKind::Arr, &Token::ArrClose)?;
            }
            Token::String(s) if in_key_position => {
                let key = std::mem::take(s);
                let top = self.frames.last_mut().expect("key position implies a frame");
                if top.has_entry {
                    self.out.push(',');
                }
                top.expect_key = false;
                self.write_escaped(&key);
                self.out.push(':');
            }
            token if in_key_position => {
                return Err(Error::malformed("map key (string)", token.kind()));
            }
            Token::MapOpen { .. } => {
                self.begin_item();
                self.done = false;
                self.out.push('{');
                self.frames.push(Frame {
                    kind: FrameKind::Map,
                    has_entry: false,
                    expect_key: true,
                });
            }
            Token::ArrOpen { .. } => {
                self.begin_item();
                self.done = false;
                self.out.push('[');
                self.frames.push(Frame {
                    kind: FrameKind::Arr,
                    has_entry: false,
                    expect_key: false,
                });
            }
            _ => {
                self.begin_item();
                self.write_scalar(slot)?;
            }
        }
        Ok(if self.done { Step::Done } else { Step::Pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::{pump, TokenBuffer};

    fn encode(tokens: Vec<Token>) -> Result<String> {
        let mut replay = TokenBuffer::from_tokens(tokens);
        let mut encoder = Encoder::new();
        pump(&mut replay, &mut encoder)?;
        Ok(encoder.into_string())
    }

    #[test]
    fn no_insignificant_whitespace() {
        let text = encode(vec![
            Token::MapOpen { len: Some(2) },
            Token::String("a".to_string()),
            Token::Uint(1),
            Token::String("b".to_string()),
            Token::ArrOpen { len: Some(2) },
            Token::Bool(true),
            Token::Null,
            Token::ArrClose,
            Token::MapClose,
        ])
        .unwrap();
        assert_eq!(text, r#"{"a":1,"b":[true,null]}"#);
    }

    #[test]
    fn floats_keep_their_point() {
        assert_eq!(encode(vec![Token::Float(1.0)]).unwrap(), "1.0");
        assert_eq!(encode(vec![Token::Float(-0.5)]).unwrap(), "-0.5");
        assert!(encode(vec![Token::Float(f64::NAN)]).is_err());
        assert!(encode(vec![Token::Float(f64::INFINITY)]).is_err());
    }

    #[test]
    fn control_characters_escape() {
        assert_eq!(
            encode(vec![Token::String("a\"b\\c\nd\u{0007}".to_string())]).unwrap(),
            "\"a\\\"b\\\\c\\nd\\u0007\""
        );
    }

    #[test]
    fn bytes_encode_as_base64() {
        assert_eq!(
            encode(vec![Token::Bytes(b"hello".to_vec())]).unwrap(),
            "\"aGVsbG8=\""
        );
    }

    #[test]
    fn empty_composites() {
        assert_eq!(
            encode(vec![Token::MapOpen { len: Some(0) }, Token::MapClose]).unwrap(),
            "{}"
        );
        assert_eq!(
            encode(vec![Token::ArrOpen { len: None }, Token::ArrClose]).unwrap(),
            "[]"
        );
    }

    #[test]
    fn non_string_key_rejected() {
        let err = encode(vec![
            Token::MapOpen { len: Some(1) },
            Token::Uint(1),
            Token::Uint(2),
            Token::MapClose,
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MalformedStream { .. }));
    }
}
