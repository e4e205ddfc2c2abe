//! The text wire codec: JSON.
//!
//! [`Encoder`] renders a token stream as canonical JSON: no insignificant
//! whitespace, `:` and `,` separators only, control characters escaped.
//! [`Decoder`] parses JSON text back into tokens, tolerating arbitrary
//! insignificant whitespace and reporting errors with line/column positions.
//!
//! JSON has no length prefixes, so every open token decodes with an unknown
//! length hint; byte strings cross this codec as standard base64 text.
//! Non-finite floats have no canonical JSON form and fail to encode.

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

/// Marshals `value` to a canonical JSON string under `atlas`.
///
/// # Examples
///
/// ```rust
/// use tokenwire::atlas::Atlas;
/// use tokenwire::{json, value};
///
/// let atlas = Atlas::default();
/// let doc = value!({"key": "value"});
/// assert_eq!(json::to_string(&atlas, &doc).unwrap(), r#"{"key":"value"}"#);
/// ```
pub fn to_string<T: Any>(atlas: &Atlas, value: &T) -> Result<String> {
    let mut source = MarshalSource::new(atlas, value)?;
    let mut encoder = Encoder::new();
    pump(&mut source, &mut encoder)?;
    Ok(encoder.into_string())
}

/// Marshals `value` to JSON bytes under `atlas`.
pub fn to_vec<T: Any>(atlas: &Atlas, value: &T) -> Result<Vec<u8>> {
    Ok(to_string(atlas, value)?.into_bytes())
}

/// Unmarshals one JSON value from `text` into a `T` under `atlas`.
///
/// Anything but whitespace after the value is an error.
pub fn from_str<T: Any>(atlas: &Atlas, text: &str) -> Result<T> {
    let mut decoder = Decoder::new(text);
    let mut sink = UnmarshalSink::<T>::new(atlas)?;
    pump(&mut decoder, &mut sink)?;
    decoder.finish_trailing()?;
    sink.finish()
}

/// Unmarshals one JSON value from UTF-8 bytes.
pub fn from_slice<T: Any>(atlas: &Atlas, bytes: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::custom(format!("input is not valid UTF-8: {}", e)))?;
    from_str(atlas, text)
}

/// Marshals `value` as JSON to a writer.
pub fn to_writer<W, T>(mut writer: W, atlas: &Atlas, value: &T) -> Result<()>
where
    W: io::Write,
    T: Any,
{
    let text = to_string(atlas, value)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))
}

/// Unmarshals one JSON value from a reader.
pub fn from_reader<R, T>(mut reader: R, atlas: &Atlas) -> Result<T>
where
    R: io::Read,
    T: Any,
{
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_str(atlas, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{value, Value};

    #[test]
    fn roundtrip_nested_doc() {
        let atlas = Atlas::default();
        let doc = value!({
            "id": 12,
            "label": "widget",
            "sizes": [1, 2, 3],
            "deleted": false,
            "note": null
        });
        let text = to_string(&atlas, &doc).unwrap();
        let back: Value = from_str(&atlas, &text).unwrap();
        assert_eq!(back, doc);
        assert_eq!(to_string(&atlas, &back).unwrap(), text);
    }

    #[test]
    fn output_matches_reference_encoder() {
        let atlas = Atlas::default();
        let doc = value!({"a": [1, "two", 3.5, true, null], "b": {"c": -9}});
        let ours = to_string(&atlas, &doc).unwrap();
        let reference = serde_json::to_string(&doc).unwrap();
        assert_eq!(ours, reference);
    }

    #[test]
    fn trailing_garbage_rejected() {
        let atlas = Atlas::default();
        let err = from_str::<Value>(&atlas, "1 2").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
        // Trailing whitespace is fine.
        let v: Value = from_str(&atlas, " 1 \n").unwrap();
        assert_eq!(v, value!(1));
    }
}
