//! Object unmarshalling: filling a value from a token stream.
//!
//! [`UnmarshalSink`] is a [`Sink`] built on the same driver/machine-stack
//! engine as the marshal side. Each machine owns the node it is building;
//! when a child machine completes, the driver pops it and hands the finished
//! product up to the suspended parent, which installs it (into a record
//! field through its atlas accessor, into a map under the pending key, onto
//! the end of a sequence). Building owned nodes and handing them parent-ward
//! is the safe substitute for holding a stack of aliasing mutable borrows.
//!
//! A machine that cannot consume the current token returns a descend command
//! instead; the driver pushes it, selects the child machine for the target
//! shape, and replays the same token against the child. This is how the
//! first token of a nested value reaches the machine that owns it without
//! any token ever being buffered.

use crate::atlas::{Atlas, Shape, StructAtlas, TransformAtlas, UnionAtlas, Variant};
use crate::error::{Error, Result};
use crate::pump::{Sink, Step};
use crate::slab::Slab;
use crate::token::Token;
use crate::value::{Number, Value};
use crate::ValueMap;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;

/// What one machine step decided.
enum Sip {
    /// Token consumed; more expected.
    More,
    /// Token consumed; this machine's value is complete.
    Done(Box<dyn Any>),
    /// Token not consumed; push this machine and replay the token against a
    /// child built for the descent target.
    Descend(Descent),
}

/// The child a machine wants to descend into.
enum Descent {
    /// Resolve the target type against the atlas.
    Resolve {
        id: TypeId,
        name: &'static str,
    },
    /// Consume and discard one balanced subtree.
    Skip,
}

impl Descent {
    fn value() -> Self {
        Descent::Resolve {
            id: TypeId::of::<Value>(),
            name: "dynamic value",
        }
    }
}

/// Scalar target kinds, for coercion and error messages.
#[derive(Debug, Clone, Copy)]
enum ScalarWant {
    Bool,
    I64,
    U64,
    F64,
    Str,
    Bytes,
    Number,
}

impl ScalarWant {
    fn name(self) -> &'static str {
        match self {
            ScalarWant::Bool => "bool",
            ScalarWant::I64 => "i64",
            ScalarWant::U64 => "u64",
            ScalarWant::F64 => "f64",
            ScalarWant::Str => "string",
            ScalarWant::Bytes => "bytes",
            ScalarWant::Number => "number",
        }
    }
}

/// Builds the dynamic `Value` for one scalar token, scavenging owned
/// payloads out of the slot.
fn scalar_value(slot: &mut Token) -> Option<Value> {
    Some(match slot {
        Token::Null => Value::Null,
        Token::Bool(b) => Value::Bool(*b),
        Token::Int(i) => {
            if *i >= 0 {
                Value::Number(Number::Uint(*i as u64))
            } else {
                Value::Number(Number::Int(*i))
            }
        }
        Token::Uint(u) => Value::Number(Number::Uint(*u)),
        Token::Float(f) => Value::Number(Number::Float(*f)),
        Token::String(s) => Value::String(std::mem::take(s)),
        Token::Bytes(b) => Value::Bytes(std::mem::take(b)),
        _ => return None,
    })
}

enum Machine<'a> {
    Scalar(ScalarWant),
    Dynamic,
    Record(RecordMachine<'a>),
    Map(MapMachine),
    Seq(SeqMachine),
    Union(UnionMachine<'a>),
    Transform(&'a TransformAtlas),
    Skip(usize),
}

impl<'a> Machine<'a> {
    fn step(&mut self, slot: &mut Token) -> Result<Sip> {
        match self {
            Machine::Scalar(want) => scalar_step(*want, slot),
            Machine::Dynamic => dynamic_step(slot),
            Machine::Record(m) => m.step(slot),
            Machine::Map(m) => m.step(slot),
            Machine::Seq(m) => m.step(slot),
            Machine::Union(m) => m.step(slot),
            Machine::Transform(_) => Ok(Sip::Descend(Descent::value())),
            Machine::Skip(depth) => skip_step(depth, slot),
        }
    }

    /// Install a completed child product. Returns `Some` when accepting the
    /// product also completes this machine (a transform finishing the moment
    /// its wire value does).
    fn accept(&mut self, product: Box<dyn Any>) -> Result<Option<Box<dyn Any>>> {
        match self {
            Machine::Dynamic => Ok(Some(Box::new(dynamic_product(product)))),
            Machine::Record(m) => m.accept(product),
            Machine::Map(m) => m.accept(product),
            Machine::Seq(m) => m.accept(product),
            Machine::Union(m) => m.accept(product),
            Machine::Transform(ta) => {
                let wire = *product
                    .downcast::<Value>()
                    .expect("transform wire shape is always a dynamic value");
                Ok(Some(ta.from_wire(wire)?))
            }
            Machine::Scalar(_) | Machine::Skip(_) => {
                unreachable!("leaf machines never own a child")
            }
        }
    }
}

fn scalar_step(want: ScalarWant, slot: &mut Token) -> Result<Sip> {
    let found = slot.kind();
    let mismatch = move || Error::shape(want.name(), found.to_string());
    let product: Box<dyn Any> = match (want, &mut *slot) {
        (ScalarWant::Bool, Token::Bool(b)) => Box::new(*b),
        (ScalarWant::I64, Token::Int(i)) => Box::new(*i),
        (ScalarWant::I64, Token::Uint(u)) => {
            Box::new(i64::try_from(*u).map_err(|_| mismatch())?)
        }
        (ScalarWant::U64, Token::Uint(u)) => Box::new(*u),
        (ScalarWant::U64, Token::Int(i)) => {
            Box::new(u64::try_from(*i).map_err(|_| mismatch())?)
        }
        (ScalarWant::F64, Token::Float(f)) => Box::new(*f),
        (ScalarWant::F64, Token::Int(i)) => Box::new(*i as f64),
        (ScalarWant::F64, Token::Uint(u)) => Box::new(*u as f64),
        (ScalarWant::Str, Token::String(s)) => Box::new(std::mem::take(s)),
        (ScalarWant::Bytes, Token::Bytes(b)) => Box::new(std::mem::take(b)),
        // Text formats carry byte strings as base64 text.
        (ScalarWant::Bytes, Token::String(s)) => Box::new(
            BASE64
                .decode(s.as_bytes())
                .map_err(|_| Error::shape("bytes (base64 text)", "string"))?,
        ),
        (ScalarWant::Number, Token::Int(i)) => Box::new(if *i >= 0 {
            Number::Uint(*i as u64)
        } else {
            Number::Int(*i)
        }),
        (ScalarWant::Number, Token::Uint(u)) => Box::new(Number::Uint(*u)),
        (ScalarWant::Number, Token::Float(f)) => Box::new(Number::Float(*f)),
        (_, _) => return Err(mismatch()),
    };
    Ok(Sip::Done(product))
}

fn dynamic_step(slot: &mut Token) -> Result<Sip> {
    // Demultiplex on the first incoming token: composites delegate, scalars
    // complete immediately.
    match slot {
        Token::MapOpen { .. } => Ok(Sip::Descend(Descent::Resolve {
            id: TypeId::of::<ValueMap>(),
            name: "dynamic map",
        })),
        Token::ArrOpen { .. } => Ok(Sip::Descend(Descent::Resolve {
            id: TypeId::of::<Vec<Value>>(),
            name: "dynamic array",
        })),
        Token::MapClose | Token::ArrClose => {
            Err(Error::malformed("a value", slot.kind()))
        }
        _ => {
            let value = scalar_value(slot).expect("close tokens handled above");
            Ok(Sip::Done(Box::new(value)))
        }
    }
}

fn dynamic_product(product: Box<dyn Any>) -> Value {
    match product.downcast::<ValueMap>() {
        Ok(map) => Value::Map(*map),
        Err(product) => Value::Array(
            *product
                .downcast::<Vec<Value>>()
                .expect("dynamic machines only descend into maps and arrays"),
        ),
    }
}

fn skip_step(depth: &mut usize, slot: &mut Token) -> Result<Sip> {
    if slot.is_open() {
        *depth += 1;
        return Ok(Sip::More);
    }
    if slot.is_close() {
        *depth = depth
            .checked_sub(1)
            .ok_or_else(|| Error::malformed("a value", slot.kind()))?;
    }
    if *depth == 0 {
        Ok(Sip::Done(Box::new(())))
    } else {
        Ok(Sip::More)
    }
}

enum RecordPhase {
    Open,
    Key,
    Value(usize),
    SkipValue,
}

struct RecordMachine<'a> {
    sa: &'a StructAtlas,
    node: Option<Box<dyn Any>>,
    hint: Option<usize>,
    seen: Vec<bool>,
    observed: usize,
    phase: RecordPhase,
}

impl<'a> RecordMachine<'a> {
    fn new(sa: &'a StructAtlas) -> Self {
        RecordMachine {
            sa,
            node: Some(sa.make_node()),
            hint: None,
            seen: vec![false; sa.fields().len()],
            observed: 0,
            phase: RecordPhase::Open,
        }
    }

    fn step(&mut self, slot: &mut Token) -> Result<Sip> {
        match self.phase {
            RecordPhase::Open => match slot {
                Token::MapOpen { len } => {
                    self.hint = *len;
                    self.phase = RecordPhase::Key;
                    Ok(Sip::More)
                }
                found => Err(Error::shape(self.sa.type_name(), found.kind().to_string())),
            },
            RecordPhase::Key => match slot {
                Token::String(key) => {
                    match self.sa.field_named(key) {
                        Some((idx, _)) => {
                            if self.seen[idx] {
                                return Err(Error::DuplicateKey {
                                    key: std::mem::take(key),
                                });
                            }
                            self.seen[idx] = true;
                            self.phase = RecordPhase::Value(idx);
                        }
                        None if self.sa.tolerates_unknown() => {
                            self.phase = RecordPhase::SkipValue;
                        }
                        None => {
                            return Err(Error::NoSuchField {
                                name: std::mem::take(key),
                            })
                        }
                    }
                    Ok(Sip::More)
                }
                Token::MapClose => {
                    if let Some(announced) = self.hint {
                        if announced != self.observed {
                            return Err(Error::LengthMismatch {
                                announced,
                                observed: self.observed,
                            });
                        }
                    }
                    let node = self.node.take().expect("record completes exactly once");
                    Ok(Sip::Done(node))
                }
                found => Err(Error::malformed("map key or map-close", found.kind())),
            },
            RecordPhase::Value(idx) => {
                let field = &self.sa.fields()[idx];
                Ok(Sip::Descend(Descent::Resolve {
                    id: field.target(),
                    name: field.target_name(),
                }))
            }
            RecordPhase::SkipValue => Ok(Sip::Descend(Descent::Skip)),
        }
    }

    fn accept(&mut self, product: Box<dyn Any>) -> Result<Option<Box<dyn Any>>> {
        match self.phase {
            RecordPhase::Value(idx) => {
                let node = self.node.as_mut().expect("record completes exactly once");
                self.sa.fields()[idx].assign(node.as_mut(), product)?;
            }
            RecordPhase::SkipValue => {}
            _ => unreachable!("record accepts only while a field is pending"),
        }
        self.observed += 1;
        self.phase = RecordPhase::Key;
        Ok(None)
    }
}

enum MapPhase {
    Open,
    Key,
    Value,
}

struct MapMachine {
    map: ValueMap,
    hint: Option<usize>,
    pending: Option<String>,
    phase: MapPhase,
}

impl MapMachine {
    fn new() -> Self {
        MapMachine {
            map: ValueMap::new(),
            hint: None,
            pending: None,
            phase: MapPhase::Open,
        }
    }

    fn step(&mut self, slot: &mut Token) -> Result<Sip> {
        match self.phase {
            MapPhase::Open => match slot {
                Token::MapOpen { len } => {
                    self.hint = *len;
                    if let Some(n) = *len {
                        self.map = ValueMap::with_capacity(n);
                    }
                    self.phase = MapPhase::Key;
                    Ok(Sip::More)
                }
                found => Err(Error::shape("map", found.kind().to_string())),
            },
            MapPhase::Key => match slot {
                Token::String(key) => {
                    if self.map.contains_key(key) {
                        return Err(Error::DuplicateKey {
                            key: std::mem::take(key),
                        });
                    }
                    self.pending = Some(std::mem::take(key));
                    self.phase = MapPhase::Value;
                    Ok(Sip::More)
                }
                Token::MapClose => {
                    if let Some(announced) = self.hint {
                        if announced != self.map.len() {
                            return Err(Error::LengthMismatch {
                                announced,
                                observed: self.map.len(),
                            });
                        }
                    }
                    Ok(Sip::Done(Box::new(std::mem::take(&mut self.map))))
                }
                found => Err(Error::malformed("map key or map-close", found.kind())),
            },
            MapPhase::Value => Ok(Sip::Descend(Descent::value())),
        }
    }

    fn accept(&mut self, product: Box<dyn Any>) -> Result<Option<Box<dyn Any>>> {
        let value = *product
            .downcast::<Value>()
            .expect("map entries are dynamic values");
        let key = self.pending.take().expect("map accepts under a pending key");
        self.map.insert(key, value);
        self.phase = MapPhase::Key;
        Ok(None)
    }
}

struct SeqMachine {
    arr: Vec<Value>,
    hint: Option<usize>,
    opened: bool,
}

impl SeqMachine {
    fn new() -> Self {
        SeqMachine {
            arr: Vec::new(),
            hint: None,
            opened: false,
        }
    }

    fn step(&mut self, slot: &mut Token) -> Result<Sip> {
        if !self.opened {
            return match slot {
                Token::ArrOpen { len } => {
                    self.hint = *len;
                    if let Some(n) = *len {
                        self.arr.reserve(n);
                    }
                    self.opened = true;
                    Ok(Sip::More)
                }
                found => Err(Error::shape("array", found.kind().to_string())),
            };
        }
        match slot {
            Token::ArrClose => {
                if let Some(announced) = self.hint {
                    if announced != self.arr.len() {
                        return Err(Error::LengthMismatch {
                            announced,
                            observed: self.arr.len(),
                        });
                    }
                }
                Ok(Sip::Done(Box::new(std::mem::take(&mut self.arr))))
            }
            Token::MapClose => Err(Error::malformed("array element or array-close", slot.kind())),
            _ => Ok(Sip::Descend(Descent::value())),
        }
    }

    fn accept(&mut self, product: Box<dyn Any>) -> Result<Option<Box<dyn Any>>> {
        let value = *product
            .downcast::<Value>()
            .expect("array elements are dynamic values");
        self.arr.push(value);
        Ok(None)
    }
}

enum UnionPhase {
    Open,
    Tag,
    Payload,
    Close,
}

struct UnionMachine<'a> {
    ua: &'a UnionAtlas,
    chosen: Option<&'a Variant>,
    built: Option<Box<dyn Any>>,
    phase: UnionPhase,
}

impl<'a> UnionMachine<'a> {
    fn new(ua: &'a UnionAtlas) -> Self {
        UnionMachine {
            ua,
            chosen: None,
            built: None,
            phase: UnionPhase::Open,
        }
    }

    fn step(&mut self, slot: &mut Token) -> Result<Sip> {
        match self.phase {
            UnionPhase::Open => match slot {
                Token::MapOpen { len } => {
                    if let Some(n) = *len {
                        if n != 1 {
                            return Err(Error::shape(
                                "single-entry union map",
                                format!("map of {} entries", n),
                            ));
                        }
                    }
                    self.phase = UnionPhase::Tag;
                    Ok(Sip::More)
                }
                found => Err(Error::shape(self.ua.type_name(), found.kind().to_string())),
            },
            UnionPhase::Tag => match slot {
                Token::String(tag) => match self.ua.variant_tagged(tag) {
                    Some(variant) => {
                        self.chosen = Some(variant);
                        self.phase = UnionPhase::Payload;
                        Ok(Sip::More)
                    }
                    None => Err(Error::NoSuchField {
                        name: std::mem::take(tag),
                    }),
                },
                found => Err(Error::malformed("union discriminator", found.kind())),
            },
            UnionPhase::Payload => {
                let variant = self.chosen.expect("discriminator precedes payload");
                Ok(Sip::Descend(Descent::Resolve {
                    id: variant.payload(),
                    name: variant.payload_name(),
                }))
            }
            UnionPhase::Close => match slot {
                Token::MapClose => {
                    let built = self.built.take().expect("union completes exactly once");
                    Ok(Sip::Done(built))
                }
                found => Err(Error::malformed("map-close after union payload", found.kind())),
            },
        }
    }

    fn accept(&mut self, product: Box<dyn Any>) -> Result<Option<Box<dyn Any>>> {
        let variant = self.chosen.expect("discriminator precedes payload");
        self.built = Some(variant.wrap(product));
        self.phase = UnionPhase::Close;
        Ok(None)
    }
}

fn machine_for<'a>(shape: Shape<'a>) -> Machine<'a> {
    match shape {
        Shape::Bool => Machine::Scalar(ScalarWant::Bool),
        Shape::I64 => Machine::Scalar(ScalarWant::I64),
        Shape::U64 => Machine::Scalar(ScalarWant::U64),
        Shape::F64 => Machine::Scalar(ScalarWant::F64),
        Shape::Str => Machine::Scalar(ScalarWant::Str),
        Shape::Bytes => Machine::Scalar(ScalarWant::Bytes),
        Shape::Number => Machine::Scalar(ScalarWant::Number),
        Shape::Dynamic => Machine::Dynamic,
        Shape::Array => Machine::Seq(SeqMachine::new()),
        Shape::Map(_) => Machine::Map(MapMachine::new()),
        Shape::Struct(sa) => Machine::Record(RecordMachine::new(sa)),
        Shape::Union(ua) => Machine::Union(UnionMachine::new(ua)),
        Shape::Transform(ta) => Machine::Transform(ta),
    }
}

/// A token [`Sink`] that fills a value of type `T` under an [`Atlas`].
///
/// # Examples
///
/// ```rust
/// use tokenwire::atlas::Atlas;
/// use tokenwire::{pump, Token, TokenBuffer, UnmarshalSink, Value};
///
/// let atlas = Atlas::default();
/// let mut replay = TokenBuffer::from_tokens(vec![
///     Token::ArrOpen { len: Some(2) },
///     Token::Uint(1),
///     Token::Uint(2),
///     Token::ArrClose,
/// ]);
/// let mut sink = UnmarshalSink::<Value>::new(&atlas).unwrap();
/// pump(&mut replay, &mut sink).unwrap();
/// let value: Value = sink.finish().unwrap();
/// assert_eq!(value.as_array().map(Vec::len), Some(2));
/// ```
pub struct UnmarshalSink<'a, T: Any> {
    atlas: &'a Atlas,
    stack: Slab<Machine<'a>>,
    active: Option<Machine<'a>>,
    product: Option<Box<dyn Any>>,
    _target: PhantomData<fn() -> T>,
}

impl<'a, T: Any> UnmarshalSink<'a, T> {
    /// Binds a sink to target type `T`. Fails if `T` has no atlas entry and
    /// no inherent shape.
    pub fn new(atlas: &'a Atlas) -> Result<Self> {
        let shape = atlas.shape_of(TypeId::of::<T>(), type_name::<T>())?;
        Ok(UnmarshalSink {
            atlas,
            stack: Slab::new(),
            active: Some(machine_for(shape)),
            product: None,
            _target: PhantomData,
        })
    }

    /// Rebinds this driver (and its slab) for another fill of the same
    /// target type.
    pub fn reset(&mut self) -> Result<()> {
        let shape = self.atlas.shape_of(TypeId::of::<T>(), type_name::<T>())?;
        self.stack.clear();
        self.active = Some(machine_for(shape));
        self.product = None;
        Ok(())
    }

    /// Takes the finished value. Errors if the token stream has not
    /// completed.
    pub fn finish(mut self) -> Result<T> {
        let product = self
            .product
            .take()
            .ok_or(Error::PumpDesync("sink finished before its final token"))?;
        let product = product
            .downcast::<T>()
            .expect("root product always matches the sink's target type");
        Ok(*product)
    }

    fn child_for(&self, descent: Descent) -> Result<Machine<'a>> {
        match descent {
            Descent::Resolve { id, name } => Ok(machine_for(self.atlas.shape_of(id, name)?)),
            Descent::Skip => Ok(Machine::Skip(0)),
        }
    }
}

impl<T: Any> Sink for UnmarshalSink<'_, T> {
    fn step(&mut self, slot: &mut Token) -> Result<Step> {
        let mut machine = self
            .active
            .take()
            .ok_or(Error::PumpDesync("sink stepped past completion"))?;
        loop {
            match machine.step(slot)? {
                Sip::More => {
                    self.active = Some(machine);
                    return Ok(Step::Pending);
                }
                Sip::Done(mut product) => loop {
                    match self.stack.pop() {
                        None => {
                            self.product = Some(product);
                            return Ok(Step::Done);
                        }
                        Some(mut parent) => match parent.accept(product)? {
                            Some(cascaded) => product = cascaded,
                            None => {
                                self.active = Some(parent);
                                return Ok(Step::Pending);
                            }
                        },
                    }
                },
                Sip::Descend(descent) => {
                    let child = self.child_for(descent)?;
                    self.stack.push(machine);
                    machine = child;
                    // The token is still in the slot; the child sees it next
                    // time around the loop.
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::{pump, TokenBuffer};
    use crate::value;

    fn fill<T: Any>(atlas: &Atlas, tokens: Vec<Token>) -> Result<T> {
        let mut replay = TokenBuffer::from_tokens(tokens);
        let mut sink = UnmarshalSink::<T>::new(atlas)?;
        pump(&mut replay, &mut sink)?;
        sink.finish()
    }

    #[test]
    fn scalar_targets_coerce_across_sign() {
        let atlas = Atlas::default();
        assert_eq!(fill::<i64>(&atlas, vec![Token::Uint(5)]).unwrap(), 5);
        assert_eq!(fill::<u64>(&atlas, vec![Token::Int(5)]).unwrap(), 5);
        assert_eq!(fill::<f64>(&atlas, vec![Token::Uint(2)]).unwrap(), 2.0);
        assert!(fill::<u64>(&atlas, vec![Token::Int(-5)]).is_err());
    }

    #[test]
    fn dynamic_target_demuxes_on_first_token() {
        let atlas = Atlas::default();
        let value = fill::<Value>(
            &atlas,
            vec![
                Token::MapOpen { len: None },
                Token::String("xs".to_string()),
                Token::ArrOpen { len: None },
                Token::Uint(1),
                Token::ArrClose,
                Token::MapClose,
            ],
        )
        .unwrap();
        assert_eq!(value, value!({"xs": [1]}));
    }

    #[test]
    fn duplicate_map_keys_fail() {
        let atlas = Atlas::default();
        let err = fill::<Value>(
            &atlas,
            vec![
                Token::MapOpen { len: Some(2) },
                Token::String("k".to_string()),
                Token::Null,
                Token::String("k".to_string()),
                Token::Null,
                Token::MapClose,
            ],
        )
        .unwrap_err();
        assert_eq!(err, Error::DuplicateKey { key: "k".to_string() });
    }

    #[test]
    fn announced_length_is_checked() {
        let atlas = Atlas::default();
        let err = fill::<Value>(
            &atlas,
            vec![
                Token::ArrOpen { len: Some(2) },
                Token::Uint(1),
                Token::ArrClose,
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::LengthMismatch {
                announced: 2,
                observed: 1
            }
        );
    }

    #[test]
    fn close_in_value_position_is_malformed() {
        let atlas = Atlas::default();
        let err = fill::<Value>(
            &atlas,
            vec![
                Token::MapOpen { len: None },
                Token::String("k".to_string()),
                Token::MapClose,
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedStream { .. }));
    }

    #[test]
    fn map_into_scalar_target_is_shape_mismatch() {
        let atlas = Atlas::default();
        let err = fill::<u64>(&atlas, vec![Token::MapOpen { len: Some(0) }]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn deep_nesting_stays_iterative() {
        let atlas = Atlas::default();
        let mut tokens = Vec::new();
        for _ in 0..10_000 {
            tokens.push(Token::ArrOpen { len: Some(1) });
        }
        tokens.push(Token::Null);
        for _ in 0..10_000 {
            tokens.push(Token::ArrClose);
        }
        let value = fill::<Value>(&atlas, tokens).unwrap();
        let mut depth = 0usize;
        let mut cursor = &value;
        while let Value::Array(items) = cursor {
            depth += 1;
            cursor = &items[0];
        }
        assert_eq!(depth, 10_000);
    }
}
