//! Object marshalling: walking a live value into a token stream.
//!
//! [`MarshalSource`] is a [`Source`] that emits one token per step while
//! traversing an arbitrarily deep value. Traversal is recursion-flattened:
//! each currently-open composite ancestor is one suspended machine on the
//! driver's [`Slab`] stack, and the native call stack never grows with the
//! data's nesting depth. A machine communicates with the driver by returning
//! a flow command from its step (emit a token, emit its final token, or
//! descend into a child value) and the driver interprets the command,
//! pushing and popping machines as composites open and close.
//!
//! One machine variant exists per value shape (§ the atlas's closed set):
//! scalars, records, dynamic maps, dynamic sequences, and keyed unions.
//! Transform entries convert the live value into its wire shape before a
//! normal machine takes over; dynamic `Value`s pick their machine by
//! inspecting the concrete variant they hold.

use crate::atlas::{Atlas, FieldSpec, KeySortMode, Shape};
use crate::error::{Error, Result};
use crate::pump::{Source, Step};
use crate::slab::Slab;
use crate::token::Token;
use crate::value::{Number, Value};
use std::any::{type_name, Any};

/// The value a machine is about to be bound to.
enum Cursor<'a> {
    /// A live value reachable through the atlas (a registered record, a
    /// union, a scalar, ...).
    Live(&'a dyn Any, &'static str),
    /// A borrowed dynamic value.
    Val(&'a Value),
    /// An owned dynamic value, produced by a transform conversion. Owned
    /// composites are drained rather than borrowed.
    Owned(Value),
}

/// What one machine step produced.
enum Emit<'a> {
    /// One token; the machine has more work.
    Tok(Token),
    /// The machine's final token.
    Last(Token),
    /// Push this machine; the next token comes from the child.
    Descend(Cursor<'a>),
}

fn cast<'v, T: Any>(any: &'v dyn Any) -> &'v T {
    any.downcast_ref::<T>()
        .expect("resolved shape disagrees with the live value's type")
}

/// Non-negative integers normalize to the unsigned token, matching what the
/// wire codecs decode.
fn int_token(i: i64) -> Token {
    if i >= 0 {
        Token::Uint(i as u64)
    } else {
        Token::Int(i)
    }
}

fn number_token(n: Number) -> Token {
    match n {
        Number::Int(i) => int_token(i),
        Number::Uint(u) => Token::Uint(u),
        Number::Float(f) => Token::Float(f),
    }
}

enum Machine<'a> {
    Scalar(Token),
    Record(RecordMachine<'a>),
    Map(MapMachine<'a>),
    Seq(SeqMachine<'a>),
    Union(UnionMachine<'a>),
}

impl<'a> Machine<'a> {
    fn step(&mut self) -> Result<Emit<'a>> {
        match self {
            Machine::Scalar(tok) => Ok(Emit::Last(std::mem::take(tok))),
            Machine::Record(m) => m.step(),
            Machine::Map(m) => m.step(),
            Machine::Seq(m) => m.step(),
            Machine::Union(m) => m.step(),
        }
    }
}

enum RecordPhase {
    Open,
    Key,
    Value,
}

struct RecordMachine<'a> {
    host: &'a dyn Any,
    fields: Vec<&'a FieldSpec>,
    idx: usize,
    phase: RecordPhase,
}

impl<'a> RecordMachine<'a> {
    fn step(&mut self) -> Result<Emit<'a>> {
        match self.phase {
            RecordPhase::Open => {
                self.phase = RecordPhase::Key;
                Ok(Emit::Tok(Token::MapOpen {
                    len: Some(self.fields.len()),
                }))
            }
            RecordPhase::Key => {
                if self.idx == self.fields.len() {
                    return Ok(Emit::Last(Token::MapClose));
                }
                self.phase = RecordPhase::Value;
                Ok(Emit::Tok(Token::String(
                    self.fields[self.idx].name().to_string(),
                )))
            }
            RecordPhase::Value => {
                let field = self.fields[self.idx];
                self.idx += 1;
                self.phase = RecordPhase::Key;
                Ok(Emit::Descend(Cursor::Live(
                    field.get(self.host),
                    field.target_name(),
                )))
            }
        }
    }
}

enum MapEntries<'a> {
    Borrowed(Vec<(&'a str, &'a Value)>),
    Owned(Vec<(String, Value)>),
}

impl MapEntries<'_> {
    fn len(&self) -> usize {
        match self {
            MapEntries::Borrowed(v) => v.len(),
            MapEntries::Owned(v) => v.len(),
        }
    }
}

enum MapPhase {
    Open,
    Key,
    Value,
}

struct MapMachine<'a> {
    entries: MapEntries<'a>,
    idx: usize,
    phase: MapPhase,
}

impl<'a> MapMachine<'a> {
    fn borrowed(map: &'a crate::ValueMap, order: KeySortMode) -> Self {
        let mut entries: Vec<(&'a str, &'a Value)> =
            map.iter().map(|(k, v)| (k.as_str(), v)).collect();
        order.order(&mut entries);
        MapMachine {
            entries: MapEntries::Borrowed(entries),
            idx: 0,
            phase: MapPhase::Open,
        }
    }

    fn owned(map: crate::ValueMap, order: KeySortMode) -> Self {
        let mut entries: Vec<(String, Value)> = map.into_iter().collect();
        order.order(&mut entries);
        MapMachine {
            entries: MapEntries::Owned(entries),
            idx: 0,
            phase: MapPhase::Open,
        }
    }

    fn step(&mut self) -> Result<Emit<'a>> {
        match self.phase {
            MapPhase::Open => {
                self.phase = MapPhase::Key;
                Ok(Emit::Tok(Token::MapOpen {
                    len: Some(self.entries.len()),
                }))
            }
            MapPhase::Key => {
                if self.idx == self.entries.len() {
                    return Ok(Emit::Last(Token::MapClose));
                }
                self.phase = MapPhase::Value;
                let key = match &mut self.entries {
                    MapEntries::Borrowed(v) => v[self.idx].0.to_string(),
                    MapEntries::Owned(v) => std::mem::take(&mut v[self.idx].0),
                };
                Ok(Emit::Tok(Token::String(key)))
            }
            MapPhase::Value => {
                self.phase = MapPhase::Key;
                let idx = self.idx;
                self.idx += 1;
                Ok(match &mut self.entries {
                    MapEntries::Borrowed(v) => Emit::Descend(Cursor::Val(v[idx].1)),
                    MapEntries::Owned(v) => {
                        Emit::Descend(Cursor::Owned(std::mem::take(&mut v[idx].1)))
                    }
                })
            }
        }
    }
}

enum SeqItems<'a> {
    Borrowed(std::slice::Iter<'a, Value>),
    Owned(std::vec::IntoIter<Value>),
}

struct SeqMachine<'a> {
    items: SeqItems<'a>,
    len: usize,
    opened: bool,
}

impl<'a> SeqMachine<'a> {
    fn step(&mut self) -> Result<Emit<'a>> {
        if !self.opened {
            self.opened = true;
            return Ok(Emit::Tok(Token::ArrOpen {
                len: Some(self.len),
            }));
        }
        match &mut self.items {
            SeqItems::Borrowed(iter) => match iter.next() {
                Some(v) => Ok(Emit::Descend(Cursor::Val(v))),
                None => Ok(Emit::Last(Token::ArrClose)),
            },
            SeqItems::Owned(iter) => match iter.next() {
                Some(v) => Ok(Emit::Descend(Cursor::Owned(v))),
                None => Ok(Emit::Last(Token::ArrClose)),
            },
        }
    }
}

enum UnionPhase {
    Open,
    Key,
    Value,
    Close,
}

struct UnionMachine<'a> {
    tag: &'a str,
    payload: &'a dyn Any,
    payload_name: &'static str,
    phase: UnionPhase,
}

impl<'a> UnionMachine<'a> {
    fn step(&mut self) -> Result<Emit<'a>> {
        match self.phase {
            UnionPhase::Open => {
                self.phase = UnionPhase::Key;
                Ok(Emit::Tok(Token::MapOpen { len: Some(1) }))
            }
            UnionPhase::Key => {
                self.phase = UnionPhase::Value;
                Ok(Emit::Tok(Token::String(self.tag.to_string())))
            }
            UnionPhase::Value => {
                self.phase = UnionPhase::Close;
                Ok(Emit::Descend(Cursor::Live(self.payload, self.payload_name)))
            }
            UnionPhase::Close => Ok(Emit::Last(Token::MapClose)),
        }
    }
}

/// Select and initialize the machine for a cursor. For transform entries the
/// live value converts to its wire shape here, and the machine binds to the
/// owned conversion result.
fn machine_for<'a>(cursor: Cursor<'a>, atlas: &'a Atlas) -> Result<Machine<'a>> {
    match cursor {
        Cursor::Live(any, name) => {
            match atlas.shape_of(any.type_id(), name)? {
                Shape::Bool => Ok(Machine::Scalar(Token::Bool(*cast::<bool>(any)))),
                Shape::I64 => Ok(Machine::Scalar(int_token(*cast::<i64>(any)))),
                Shape::U64 => Ok(Machine::Scalar(Token::Uint(*cast::<u64>(any)))),
                Shape::F64 => Ok(Machine::Scalar(Token::Float(*cast::<f64>(any)))),
                Shape::Str => Ok(Machine::Scalar(Token::String(cast::<String>(any).clone()))),
                Shape::Bytes => Ok(Machine::Scalar(Token::Bytes(cast::<Vec<u8>>(any).clone()))),
                Shape::Number => Ok(Machine::Scalar(number_token(*cast::<Number>(any)))),
                Shape::Dynamic => machine_for(Cursor::Val(cast::<Value>(any)), atlas),
                Shape::Array => {
                    let arr = cast::<Vec<Value>>(any);
                    Ok(Machine::Seq(SeqMachine {
                        items: SeqItems::Borrowed(arr.iter()),
                        len: arr.len(),
                        opened: false,
                    }))
                }
                Shape::Map(order) => Ok(Machine::Map(MapMachine::borrowed(
                    cast::<crate::ValueMap>(any),
                    order,
                ))),
                Shape::Struct(sa) => {
                    let fields = sa.fields().iter().filter(|f| !f.skips(any)).collect();
                    Ok(Machine::Record(RecordMachine {
                        host: any,
                        fields,
                        idx: 0,
                        phase: RecordPhase::Open,
                    }))
                }
                Shape::Union(ua) => {
                    let (tag, payload) = ua.select(any);
                    let payload_name = ua
                        .variant_tagged(tag)
                        .map(|v| v.payload_name())
                        .unwrap_or("union payload");
                    Ok(Machine::Union(UnionMachine {
                        tag,
                        payload,
                        payload_name,
                        phase: UnionPhase::Open,
                    }))
                }
                Shape::Transform(ta) => {
                    let wire = ta.to_wire(any)?;
                    machine_for(Cursor::Owned(wire), atlas)
                }
            }
        }
        Cursor::Val(v) => Ok(match v {
            Value::Null => Machine::Scalar(Token::Null),
            Value::Bool(b) => Machine::Scalar(Token::Bool(*b)),
            Value::Number(n) => Machine::Scalar(number_token(*n)),
            Value::String(s) => Machine::Scalar(Token::String(s.clone())),
            Value::Bytes(b) => Machine::Scalar(Token::Bytes(b.clone())),
            Value::Array(arr) => Machine::Seq(SeqMachine {
                items: SeqItems::Borrowed(arr.iter()),
                len: arr.len(),
                opened: false,
            }),
            Value::Map(map) => Machine::Map(MapMachine::borrowed(map, atlas.map_order())),
        }),
        Cursor::Owned(v) => Ok(match v {
            Value::Null => Machine::Scalar(Token::Null),
            Value::Bool(b) => Machine::Scalar(Token::Bool(b)),
            Value::Number(n) => Machine::Scalar(number_token(n)),
            Value::String(s) => Machine::Scalar(Token::String(s)),
            Value::Bytes(b) => Machine::Scalar(Token::Bytes(b)),
            Value::Array(arr) => {
                let len = arr.len();
                Machine::Seq(SeqMachine {
                    items: SeqItems::Owned(arr.into_iter()),
                    len,
                    opened: false,
                })
            }
            Value::Map(map) => Machine::Map(MapMachine::owned(map, atlas.map_order())),
        }),
    }
}

/// A token [`Source`] that walks a live value under an [`Atlas`].
///
/// The driver owns the machine stack; independent sources share nothing but
/// the atlas, so one atlas can serve many concurrent operations.
///
/// # Examples
///
/// ```rust
/// use tokenwire::atlas::Atlas;
/// use tokenwire::{pump, value, MarshalSource, TokenBuffer};
///
/// let atlas = Atlas::default();
/// let doc = value!({"greeting": "hello"});
/// let mut source = MarshalSource::new(&atlas, &doc).unwrap();
/// let mut tokens = TokenBuffer::new();
/// pump(&mut source, &mut tokens).unwrap();
/// assert_eq!(tokens.tokens().len(), 4);
/// ```
pub struct MarshalSource<'a> {
    atlas: &'a Atlas,
    stack: Slab<Machine<'a>>,
    active: Option<Machine<'a>>,
}

impl<'a> MarshalSource<'a> {
    /// Binds a source to `value`. Fails if the value's type has no atlas
    /// entry and no inherent shape.
    pub fn new<T: Any>(atlas: &'a Atlas, value: &'a T) -> Result<Self> {
        let root = machine_for(Cursor::Live(value, type_name::<T>()), atlas)?;
        Ok(MarshalSource {
            atlas,
            stack: Slab::new(),
            active: Some(root),
        })
    }

    /// Rebinds this driver (and its slab) to a new root value, reusing the
    /// stack storage grown by earlier operations.
    pub fn reset<T: Any>(&mut self, value: &'a T) -> Result<()> {
        self.stack.clear();
        self.active = Some(machine_for(
            Cursor::Live(value, type_name::<T>()),
            self.atlas,
        )?);
        Ok(())
    }
}

impl Source for MarshalSource<'_> {
    fn step(&mut self, slot: &mut Token) -> Result<Step> {
        let mut machine = self
            .active
            .take()
            .ok_or(Error::PumpDesync("source stepped past completion"))?;
        loop {
            match machine.step()? {
                Emit::Tok(tok) => {
                    *slot = tok;
                    self.active = Some(machine);
                    return Ok(Step::Pending);
                }
                Emit::Last(tok) => {
                    *slot = tok;
                    return match self.stack.pop() {
                        Some(parent) => {
                            self.active = Some(parent);
                            Ok(Step::Pending)
                        }
                        None => Ok(Step::Done),
                    };
                }
                Emit::Descend(cursor) => {
                    let child = machine_for(cursor, self.atlas)?;
                    self.stack.push(machine);
                    machine = child;
                }
            }
        }
    }
}
