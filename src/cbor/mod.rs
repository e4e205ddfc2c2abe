//! The binary wire codec: RFC 7049 CBOR.
//!
//! [`Encoder`] is a [`Sink`](crate::Sink) that renders a token stream as
//! CBOR bytes; [`Decoder`] is a [`Source`](crate::Source) that parses CBOR
//! bytes back into tokens. Both are resumable state machines over a
//! per-depth frame stack, the byte-specialized twin of the object machines.
//!
//! ## Wire coverage
//!
//! - Major types 0–5 and the float/simple encodings of major type 7.
//! - Definite-length and indefinite-length maps and arrays decode to the
//!   identical token sequence; the wire choice is invisible above the codec.
//! - Canonical output: minimal-length integer heads, floats always as
//!   64-bit, definite lengths whenever the token stream announces them.
//! - Tags (major type 6), chunked strings, and unassigned simple values are
//!   hard decode errors; they have no token equivalent.
//! - `undefined` (0xf7) decodes as null.

mod decode;
mod encode;

pub use decode::Decoder;
pub use encode::Encoder;

use crate::atlas::Atlas;
use crate::error::{Error, Result};
use crate::marshal::MarshalSource;
use crate::pump::pump;
use crate::unmarshal::UnmarshalSink;
use std::any::Any;
use std::io;

/// Major type tags, pre-shifted into the high bits of the initial byte.
pub(crate) const MAJOR_UINT: u8 = 0 << 5;
pub(crate) const MAJOR_NINT: u8 = 1 << 5;
pub(crate) const MAJOR_BYTES: u8 = 2 << 5;
pub(crate) const MAJOR_TEXT: u8 = 3 << 5;
pub(crate) const MAJOR_ARR: u8 = 4 << 5;
pub(crate) const MAJOR_MAP: u8 = 5 << 5;
pub(crate) const MAJOR_TAG: u8 = 6 << 5;
pub(crate) const MAJOR_SIMPLE: u8 = 7 << 5;

/// Additional-information value announcing an indefinite length.
pub(crate) const AI_INDEFINITE: u8 = 31;

pub(crate) const BYTE_FALSE: u8 = 0xf4;
pub(crate) const BYTE_TRUE: u8 = 0xf5;
pub(crate) const BYTE_NULL: u8 = 0xf6;
pub(crate) const BYTE_UNDEFINED: u8 = 0xf7;
pub(crate) const BYTE_F16: u8 = 0xf9;
pub(crate) const BYTE_F32: u8 = 0xfa;
pub(crate) const BYTE_F64: u8 = 0xfb;
pub(crate) const BYTE_BREAK: u8 = 0xff;

/// Marshals `value` to CBOR bytes under `atlas`.
///
/// # Examples
///
/// ```rust
/// use tokenwire::atlas::Atlas;
/// use tokenwire::{cbor, value};
///
/// let atlas = Atlas::default();
/// let doc = value!([1, 2]);
/// let bytes = cbor::to_vec(&atlas, &doc).unwrap();
/// assert_eq!(bytes, [0x82, 0x01, 0x02]);
/// ```
pub fn to_vec<T: Any>(atlas: &Atlas, value: &T) -> Result<Vec<u8>> {
    let mut source = MarshalSource::new(atlas, value)?;
    let mut encoder = Encoder::new();
    pump(&mut source, &mut encoder)?;
    Ok(encoder.into_bytes())
}

/// Unmarshals one CBOR value from `bytes` into a `T` under `atlas`.
///
/// Trailing bytes after the value are an error.
pub fn from_slice<T: Any>(atlas: &Atlas, bytes: &[u8]) -> Result<T> {
    let mut decoder = Decoder::new(bytes);
    let mut sink = UnmarshalSink::<T>::new(atlas)?;
    pump(&mut decoder, &mut sink)?;
    let rest = decoder.remainder();
    if !rest.is_empty() {
        return Err(Error::invalid_byte(
            bytes.len() - rest.len(),
            format!("{} trailing bytes after the value", rest.len()),
        ));
    }
    sink.finish()
}

/// Marshals `value` as CBOR to a writer.
pub fn to_writer<W, T>(mut writer: W, atlas: &Atlas, value: &T) -> Result<()>
where
    W: io::Write,
    T: Any,
{
    let bytes = to_vec(atlas, value)?;
    writer
        .write_all(&bytes)
        .map_err(|e| Error::io(&e.to_string()))
}

/// Unmarshals one CBOR value from a reader.
pub fn from_reader<R, T>(mut reader: R, atlas: &Atlas) -> Result<T>
where
    R: io::Read,
    T: Any,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_slice(atlas, &bytes)
}
