//! # tokenwire
//!
//! A format-agnostic, streaming serialization engine. Values in memory
//! convert to a canonical stream of typed [`Token`]s, and a token stream
//! converts back into memory values, with concrete codecs for one binary
//! wire format (CBOR) and one text wire format (JSON) speaking the same
//! token vocabulary.
//!
//! ## Architecture
//!
//! Everything meets at the single-step pull protocol: a [`Source`] fills one
//! token per step, a [`Sink`] consumes one per step, and [`pump`] advances a
//! bound pair in lockstep. Because the codecs and the object machines all
//! implement the same two traits, any producer composes with any consumer:
//!
//! - object walk → CBOR encoder: marshalling
//! - JSON decoder → object fill: unmarshalling
//! - JSON decoder → CBOR encoder: transcoding, no object layer at all
//!
//! Traversal never recurses on the native call stack. Each driver owns an
//! explicit stack of suspended machines (one per open composite), so a
//! paused operation can resume at token granularity no matter how deeply
//! the data nests.
//!
//! Type-specific behavior comes from the [`atlas`]: an immutable registry
//! mapping value types to declarative traversal instructions: record field
//! layouts, map key ordering, transforms, keyed unions. Types without an
//! entry get inherent behavior: scalars, the dynamic [`Value`], `Vec<Value>`
//! sequences, and [`ValueMap`] maps.
//!
//! ## Quick start
//!
//! ```rust
//! use tokenwire::atlas::{Atlas, FieldSpec, StructAtlas};
//! use tokenwire::{cbor, json};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct User {
//!     name: String,
//!     admin: bool,
//! }
//!
//! let atlas = Atlas::builder()
//!     .structure(StructAtlas::new::<User>(vec![
//!         FieldSpec::new("name", |u: &User| &u.name, |u: &mut User| &mut u.name),
//!         FieldSpec::new("admin", |u: &User| &u.admin, |u: &mut User| &mut u.admin),
//!     ]))
//!     .build()
//!     .unwrap();
//!
//! let user = User { name: "Alice".to_string(), admin: true };
//!
//! let text = json::to_string(&atlas, &user).unwrap();
//! assert_eq!(text, r#"{"name":"Alice","admin":true}"#);
//!
//! let bytes = cbor::to_vec(&atlas, &user).unwrap();
//! let back: User = cbor::from_slice(&atlas, &bytes).unwrap();
//! assert_eq!(back, user);
//! ```
//!
//! ## Dynamic values
//!
//! When the structure isn't known at compile time, marshal and unmarshal
//! [`Value`]; an empty atlas suffices:
//!
//! ```rust
//! use tokenwire::atlas::Atlas;
//! use tokenwire::{json, value, Value};
//!
//! let atlas = Atlas::default();
//! let doc: Value = json::from_str(&atlas, r#"{"k1":"v1","ke":["oh","whee","wow"]}"#).unwrap();
//! assert_eq!(doc, value!({"k1": "v1", "ke": ["oh", "whee", "wow"]}));
//! ```
//!
//! ## Signedness policy
//!
//! The wire formats do not distinguish signed from unsigned representation
//! for non-negative magnitudes, so this crate fixes one canonical policy:
//! non-negative integers always travel as [`Token::Uint`] and always decode
//! that way; [`Token::Int`] carries negatives. The object machines coerce
//! between the two whenever the target type asks for the other flavor.
//!
//! ## Concurrency
//!
//! The engine is single-threaded and synchronous. A driver's `step` is not
//! reentrant; suspension means simply not calling `step`, and cancellation
//! means dropping the driver. Independent operations share nothing but the
//! read-only atlas, so separate threads may each run their own.

pub mod atlas;
pub mod cbor;
pub mod error;
pub mod json;
pub mod macros;
pub mod map;
pub mod marshal;
pub mod pump;
pub mod slab;
pub mod token;
pub mod unmarshal;
pub mod value;

pub use error::{Error, Result};
pub use map::ValueMap;
pub use marshal::MarshalSource;
pub use pump::{pump, Sink, Source, Step, TokenBuffer};
pub use slab::Slab;
pub use token::{Token, TokenKind};
pub use unmarshal::UnmarshalSink;
pub use value::{Number, Value};

/// Transcodes one JSON value into CBOR bytes by pumping the text decoder
/// straight into the binary encoder, with no object layer in between.
///
/// # Examples
///
/// ```rust
/// let bytes = tokenwire::json_to_cbor(r#"[1,2]"#).unwrap();
/// assert_eq!(bytes, [0x9f, 0x01, 0x02, 0xff]);
/// ```
///
/// JSON never announces lengths, so the CBOR side of a transcode uses
/// indefinite-length composites.
pub fn json_to_cbor(text: &str) -> Result<Vec<u8>> {
    let mut decoder = json::Decoder::new(text);
    let mut encoder = cbor::Encoder::new();
    pump(&mut decoder, &mut encoder)?;
    decoder.finish_trailing()?;
    Ok(encoder.into_bytes())
}

/// Transcodes one CBOR value into canonical JSON text.
pub fn cbor_to_json(bytes: &[u8]) -> Result<String> {
    let mut decoder = cbor::Decoder::new(bytes);
    let mut encoder = json::Encoder::new();
    pump(&mut decoder, &mut encoder)?;
    let rest = decoder.remainder();
    if !rest.is_empty() {
        return Err(Error::invalid_byte(
            bytes.len() - rest.len(),
            format!("{} trailing bytes after the value", rest.len()),
        ));
    }
    Ok(encoder.into_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcode_json_to_cbor_and_back() {
        let text = r#"{"a":[1,true],"b":"x"}"#;
        let bytes = json_to_cbor(text).unwrap();
        assert_eq!(cbor_to_json(&bytes).unwrap(), text);
    }

    #[test]
    fn transcode_surfaces_codec_errors() {
        assert!(json_to_cbor("{\"a\" 1}").is_err());
        assert!(cbor_to_json(&[0xc0, 0x00]).is_err());
    }
}
