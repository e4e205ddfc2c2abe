//! CBOR bytes to token stream.

use super::{
    AI_INDEFINITE, BYTE_BREAK, BYTE_F16, BYTE_F32, BYTE_F64, BYTE_FALSE, BYTE_NULL, BYTE_TRUE,
    BYTE_UNDEFINED, MAJOR_ARR, MAJOR_BYTES, MAJOR_MAP, MAJOR_NINT, MAJOR_SIMPLE, MAJOR_TAG,
    MAJOR_TEXT, MAJOR_UINT,
};
use crate::error::{Error, Result};
use crate::pump::{Source, Step};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    Map,
    Arr,
}

/// One open composite. `remaining` counts items (a map entry is two items)
/// for definite lengths; `None` means the composite runs to its break byte.
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    remaining: Option<u64>,
    expect_key: bool,
}

/// A [`Source`] that parses one CBOR value from a byte slice.
///
/// Definite- and indefinite-length composites yield the identical token
/// sequence; only the open token's length hint differs. The decoder stops
/// at the end of the value: trailing bytes are left unread and visible via
/// [`Decoder::remainder`].
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    frames: Vec<Frame>,
    done: bool,
}

impl<'a> Decoder<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Decoder {
            buf,
            pos: 0,
            frames: Vec::new(),
            done: false,
        }
    }

    /// Bytes not consumed by the value.
    #[must_use]
    pub fn remainder(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(Error::invalid_byte(
                self.buf.len(),
                "unexpected end of input",
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads the length/value argument following an initial byte. `None`
    /// signals the indefinite-length marker.
    fn read_arg(&mut self, ai: u8, at: usize) -> Result<Option<u64>> {
        Ok(Some(match ai {
            0..=23 => u64::from(ai),
            24 => u64::from(self.take_byte()?),
            25 => {
                let b = self.take(2)?;
                u64::from(u16::from_be_bytes([b[0], b[1]]))
            }
            26 => {
                let b = self.take(4)?;
                u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            27 => {
                let b = self.take(8)?;
                u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
            AI_INDEFINITE => return Ok(None),
            _ => {
                return Err(Error::invalid_byte(
                    at,
                    format!("reserved additional info {}", ai),
                ))
            }
        }))
    }

    fn definite_arg(&mut self, ai: u8, at: usize, what: &str) -> Result<u64> {
        match self.read_arg(ai, at)? {
            Some(arg) => Ok(arg),
            None => Err(Error::unsupported(
                at,
                format!("indefinite-length {}", what),
            )),
        }
    }

    /// Bookkeeping once an item has started at the current depth.
    fn item_started(&mut self) {
        match self.frames.last_mut() {
            Some(top) => {
                if top.kind == FrameKind::Map {
                    top.expect_key = !top.expect_key;
                }
                if let Some(remaining) = top.remaining.as_mut() {
                    *remaining -= 1;
                }
            }
            None => self.done = true,
        }
    }

    /// Pops the finished composite and reports whether the stream is done.
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

    /// Enforces the string-keys-only token invariant while a map expects a
    /// key.
    fn check_key_position(&self, major: u8, at: usize) -> Result<()> {
        if let Some(top) = self.frames.last() {
            if top.kind == FrameKind::Map && top.expect_key && major != MAJOR_TEXT {
                return Err(Error::invalid_byte(
                    at,
                    format!("map key must be a text string, found major type {}", major >> 5),
                ));
            }
        }
        Ok(())
    }
}

/// RFC 7049 half-precision decoding.
fn half_to_f64(half: u16) -> f64 {
    let exp = (half >> 10) & 0x1f;
    let mant = f64::from(half & 0x3ff);
    let magnitude = if exp == 0 {
        mant * (-24f64).exp2()
    } else if exp != 31 {
        (mant + 1024.0) * f64::from(i32::from(exp) - 25).exp2()
    } else if mant == 0.0 {
        f64::INFINITY
    } else {
        f64::NAN
    };
    if half & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

impl Source for Decoder<'_> {
    fn step(&mut self, slot: &mut Token) -> Result<Step> {
        if self.done {
            return Err(Error::PumpDesync("decoder stepped past completion"));
        }

        // A definite-length composite closes itself the instant its count
        // runs out; no byte is consumed for the close token.
        if let Some(top) = self.frames.last() {
            if top.remaining == Some(0) {
                *slot = self.pop_frame();
                return Ok(if self.done { Step::Done } else { Step::Pending });
            }
        }

        let at = self.pos;
        let initial = self.take_byte()?;

        if initial == BYTE_BREAK {
            match self.frames.last() {
                Some(top) if top.remaining.is_none() => {
                    if top.kind == FrameKind::Map && !top.expect_key {
                        return Err(Error::invalid_byte(
                            at,
                            "break interrupts a map entry awaiting its value",
                        ));
                    }
                    *slot = self.pop_frame();
                    return Ok(if self.done { Step::Done } else { Step::Pending });
                }
                Some(_) => {
                    return Err(Error::invalid_byte(
                        at,
                        "break byte inside a definite-length composite",
                    ))
                }
                None => return Err(Error::invalid_byte(at, "break byte outside any composite")),
            }
        }

        let major = initial & 0xe0;
        let ai = initial & 0x1f;
        self.check_key_position(major, at)?;

        let token = match major {
            MAJOR_UINT => Token::Uint(self.definite_arg(ai, at, "unsigned integer")?),
            MAJOR_NINT => {
                let arg = self.definite_arg(ai, at, "negative integer")?;
                let magnitude = i64::try_from(arg).map_err(|_| {
                    Error::unsupported(at, "negative integer beyond i64 range")
                })?;
                Token::Int(-1 - magnitude)
            }
            MAJOR_BYTES => {
                let len = self.definite_arg(ai, at, "byte string")?;
                let len = usize::try_from(len)
                    .map_err(|_| Error::invalid_byte(at, "byte string length overflows usize"))?;
                Token::Bytes(self.take(len)?.to_vec())
            }
            MAJOR_TEXT => {
                let len = self.definite_arg(ai, at, "text string")?;
                let len = usize::try_from(len)
                    .map_err(|_| Error::invalid_byte(at, "text string length overflows usize"))?;
                let raw = self.take(len)?;
                let text = std::str::from_utf8(raw)
                    .map_err(|_| Error::invalid_byte(at, "text string is not valid UTF-8"))?;
                Token::String(text.to_string())
            }
            MAJOR_ARR => {
                let len = self.read_arg(ai, at)?;
                self.item_started();
                self.done = false;
                self.frames.push(Frame {
                    kind: FrameKind::Arr,
                    remaining: len,
                    expect_key: false,
                });
                *slot = Token::ArrOpen {
                    len: match len {
                        Some(n) => Some(usize::try_from(n).map_err(|_| {
                            Error::invalid_byte(at, "array length overflows usize")
                        })?),
                        None => None,
                    },
                };
                return Ok(Step::Pending);
            }
            MAJOR_MAP => {
                let pairs = self.read_arg(ai, at)?;
                let remaining = match pairs {
                    Some(n) => Some(
                        n.checked_mul(2)
                            .ok_or_else(|| Error::invalid_byte(at, "map length overflows"))?,
                    ),
                    None => None,
                };
                self.item_started();
                self.done = false;
                self.frames.push(Frame {
                    kind: FrameKind::Map,
                    remaining,
                    expect_key: true,
                });
                *slot = Token::MapOpen {
                    len: match pairs {
                        Some(n) => Some(usize::try_from(n).map_err(|_| {
                            Error::invalid_byte(at, "map length overflows usize")
                        })?),
                        None => None,
                    },
                };
                return Ok(Step::Pending);
            }
            MAJOR_TAG => {
                return Err(Error::unsupported(
                    at,
                    format!("tag {}", self.definite_arg(ai, at, "tag")?),
                ))
            }
            MAJOR_SIMPLE => match initial {
                BYTE_FALSE => Token::Bool(false),
                BYTE_TRUE => Token::Bool(true),
                BYTE_NULL | BYTE_UNDEFINED => Token::Null,
                BYTE_F16 => {
                    let b = self.take(2)?;
                    Token::Float(half_to_f64(u16::from_be_bytes([b[0], b[1]])))
                }
                BYTE_F32 => {
                    let b = self.take(4)?;
                    Token::Float(f64::from(f32::from_be_bytes([b[0], b[1], b[2], b[3]])))
                }
                BYTE_F64 => {
                    let b = self.take(8)?;
                    Token::Float(f64::from_be_bytes([
                        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                    ]))
                }
                _ => {
                    return Err(Error::unsupported(
                        at,
                        format!("simple value {}", ai),
                    ))
                }
            },
            _ => unreachable!("major type is a 3-bit field"),
        };

        self.item_started();
        *slot = token;
        Ok(if self.done { Step::Done } else { Step::Pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::{pump, TokenBuffer};

    fn decode(bytes: &[u8]) -> Result<Vec<Token>> {
        let mut decoder = Decoder::new(bytes);
        let mut buffer = TokenBuffer::new();
        pump(&mut decoder, &mut buffer)?;
        Ok(buffer.into_tokens())
    }

    #[test]
    fn scalars() {
        assert_eq!(decode(&[0x00]).unwrap(), [Token::Uint(0)]);
        assert_eq!(decode(&[0x18, 24]).unwrap(), [Token::Uint(24)]);
        assert_eq!(decode(&[0x20]).unwrap(), [Token::Int(-1)]);
        assert_eq!(decode(&[0xf5]).unwrap(), [Token::Bool(true)]);
        assert_eq!(decode(&[0xf6]).unwrap(), [Token::Null]);
        assert_eq!(decode(&[0xf7]).unwrap(), [Token::Null]);
        assert_eq!(
            decode(&[0x63, b'f', b'o', b'o']).unwrap(),
            [Token::String("foo".to_string())]
        );
        assert_eq!(
            decode(&[0x42, 0x01, 0x02]).unwrap(),
            [Token::Bytes(vec![1, 2])]
        );
    }

    #[test]
    fn half_precision_floats() {
        assert_eq!(decode(&[0xf9, 0x3c, 0x00]).unwrap(), [Token::Float(1.0)]);
        assert_eq!(decode(&[0xf9, 0x7c, 0x00]).unwrap(), [Token::Float(f64::INFINITY)]);
        assert_eq!(decode(&[0xf9, 0x00, 0x01]).unwrap(), [Token::Float(5.960464477539063e-8)]);
    }

    #[test]
    fn definite_and_indefinite_agree() {
        let definite = decode(&[0x82, 0x01, 0x02]).unwrap();
        let indefinite = decode(&[0x9f, 0x01, 0x02, 0xff]).unwrap();
        assert_eq!(&definite[1..], &indefinite[1..]);
        assert_eq!(definite[0], Token::ArrOpen { len: Some(2) });
        assert_eq!(indefinite[0], Token::ArrOpen { len: None });
    }

    #[test]
    fn nested_definite_closes_cascade() {
        // {"a": [1]}
        let tokens = decode(&[0xa1, 0x61, b'a', 0x81, 0x01]).unwrap();
        assert_eq!(
            tokens,
            [
                Token::MapOpen { len: Some(1) },
                Token::String("a".to_string()),
                Token::ArrOpen { len: Some(1) },
                Token::Uint(1),
                Token::ArrClose,
                Token::MapClose,
            ]
        );
    }

    #[test]
    fn tags_are_unsupported() {
        let err = decode(&[0xc0, 0x00]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedWire { .. }));
    }

    #[test]
    fn chunked_strings_are_unsupported() {
        let err = decode(&[0x5f, 0x41, 0x01, 0xff]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedWire { .. }));
    }

    #[test]
    fn non_string_map_key_rejected() {
        let err = decode(&[0xa1, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, Error::InvalidByte { .. }));
    }

    #[test]
    fn stray_break_rejected() {
        let err = decode(&[0xff]).unwrap_err();
        assert!(matches!(err, Error::InvalidByte { .. }));
        let err = decode(&[0x81, 0xff]).unwrap_err();
        assert!(matches!(err, Error::InvalidByte { .. }));
    }

    #[test]
    fn truncated_input_fails() {
        let err = decode(&[0x19, 0x01]).unwrap_err();
        assert!(matches!(err, Error::InvalidByte { .. }));
        let err = decode(&[0x82, 0x01]).unwrap_err();
        assert!(matches!(err, Error::InvalidByte { .. }));
    }
}
