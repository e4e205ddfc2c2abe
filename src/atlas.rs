//! The atlas: an immutable registry of per-type traversal instructions.
//!
//! An [`Atlas`] maps value types (by [`TypeId`]) to declarative entries that
//! tell the object machines how to walk or fill them: record entries with
//! named field accessors, a key-sort morphism for dynamic maps, transform
//! entries that convert a live value through the dynamic [`Value`] shape,
//! and keyed unions for polymorphic fields.
//!
//! Field access is resolved once, at registration: each declared field
//! becomes a pair of fixed accessor closures bound to the concrete record
//! type, so no path is re-walked during traversal. Types without an entry
//! fall back to inherent behavior over a closed set of shapes (the scalars,
//! [`Value`], `Vec<Value>`, [`ValueMap`]); anything else is an
//! [`Error::Unresolvable`].
//!
//! A built atlas is read-only. It may be shared freely across independent
//! marshal/unmarshal operations; every accessor it holds is `Send + Sync`.
//!
//! ## Examples
//!
//! ```rust
//! use tokenwire::atlas::{Atlas, FieldSpec, StructAtlas};
//!
//! #[derive(Default)]
//! struct User {
//!     name: String,
//!     age: u64,
//! }
//!
//! let atlas = Atlas::builder()
//!     .structure(StructAtlas::new::<User>(vec![
//!         FieldSpec::new("name", |u: &User| &u.name, |u: &mut User| &mut u.name),
//!         FieldSpec::new("age", |u: &User| &u.age, |u: &mut User| &mut u.age),
//!     ]))
//!     .build()
//!     .unwrap();
//!
//! let user = User { name: "Alice".to_string(), age: 30 };
//! let text = tokenwire::json::to_string(&atlas, &user).unwrap();
//! assert_eq!(text, r#"{"name":"Alice","age":30}"#);
//! ```

use crate::error::{Error, Result};
use crate::value::{Number, Value};
use crate::ValueMap;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

/// The order in which a dynamic map's entries are marshalled.
///
/// Sorting happens at marshal time and never mutates the map itself. All
/// modes are stable and deterministic, which is what makes re-encoding a
/// decoded document reproduce its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySortMode {
    /// Keys are emitted in the map's own (insertion) order.
    #[default]
    Preserve,
    /// Plain bytewise lexicographic order.
    Lexical,
    /// RFC 7049 canonical order: shorter keys first, ties bytewise.
    LengthFirst,
}

impl KeySortMode {
    /// Sorts a view of map entries according to this mode.
    pub(crate) fn order<K: AsRef<str>, T>(self, entries: &mut [(K, T)]) {
        match self {
            KeySortMode::Preserve => {}
            KeySortMode::Lexical => entries.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref())),
            KeySortMode::LengthFirst => {
                entries.sort_by(|a, b| {
                    let (a, b) = (a.0.as_ref(), b.0.as_ref());
                    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
                });
            }
        }
    }
}

type Getter = Box<dyn Fn(&dyn Any) -> (&dyn Any) + Send + Sync>;
type Assigner = Box<dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<()> + Send + Sync>;
type DefaultProbe = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;
type Maker = Box<dyn Fn() -> Box<dyn Any> + Send + Sync>;
type VariantWrap = Box<dyn Fn(Box<dyn Any>) -> Box<dyn Any> + Send + Sync>;
type VariantSelect = Box<dyn Fn(&dyn Any) -> (&str, &dyn Any) + Send + Sync>;
type ToWire = Box<dyn Fn(&dyn Any) -> Result<Value> + Send + Sync>;
type FromWire = Box<dyn Fn(Value) -> Result<Box<dyn Any>> + Send + Sync>;

/// One named, addressable sub-location of a record.
///
/// Built from a pair of plain accessor functions; the accessor may reach
/// through embedded sub-records (`|o: &Outer| &o.inner.leaf`), which is the
/// resolved form of a multi-step traversal route.
pub struct FieldSpec {
    name: String,
    host: TypeId,
    host_name: &'static str,
    target: TypeId,
    target_name: &'static str,
    omit_if_empty: bool,
    get: Getter,
    assign: Assigner,
    is_default: Option<DefaultProbe>,
}

impl FieldSpec {
    /// A field that always marshals.
    pub fn new<S, F>(
        name: impl Into<String>,
        get: fn(&S) -> &F,
        get_mut: fn(&mut S) -> &mut F,
    ) -> Self
    where
        S: Any,
        F: Any,
    {
        FieldSpec {
            name: name.into(),
            host: TypeId::of::<S>(),
            host_name: type_name::<S>(),
            target: TypeId::of::<F>(),
            target_name: type_name::<F>(),
            omit_if_empty: false,
            get: Box::new(move |host: &dyn Any| {
                let host = host
                    .downcast_ref::<S>()
                    .expect("atlas accessor applied to a foreign record type");
                get(host) as &dyn Any
            }),
            assign: Box::new(move |host: &mut dyn Any, product: Box<dyn Any>| {
                let host = host
                    .downcast_mut::<S>()
                    .expect("atlas accessor applied to a foreign record type");
                let product = product
                    .downcast::<F>()
                    .map_err(|_| Error::shape(type_name::<F>(), "foreign unmarshal product"))?;
                *get_mut(host) = *product;
                Ok(())
            }),
            is_default: None,
        }
    }

    /// A field skipped at marshal time while its value equals `F::default()`.
    pub fn omit_when_default<S, F>(
        name: impl Into<String>,
        get: fn(&S) -> &F,
        get_mut: fn(&mut S) -> &mut F,
    ) -> Self
    where
        S: Any,
        F: Any + Default + PartialEq,
    {
        let mut spec = FieldSpec::new(name, get, get_mut);
        spec.omit_if_empty = true;
        spec.is_default = Some(Box::new(move |host: &dyn Any| {
            let host = host
                .downcast_ref::<S>()
                .expect("atlas accessor applied to a foreign record type");
            *get(host) == F::default()
        }));
        spec
    }

    /// The serial name this field marshals under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn target(&self) -> TypeId {
        self.target
    }

    pub(crate) fn target_name(&self) -> &'static str {
        self.target_name
    }

    pub(crate) fn skips(&self, host: &dyn Any) -> bool {
        self.omit_if_empty && self.is_default.as_ref().is_some_and(|probe| probe(host))
    }

    pub(crate) fn get<'v>(&self, host: &'v dyn Any) -> &'v dyn Any {
        (self.get)(host)
    }

    pub(crate) fn assign(&self, host: &mut dyn Any, product: Box<dyn Any>) -> Result<()> {
        (self.assign)(host, product)
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("host", &self.host_name)
            .field("target", &self.target_name)
            .field("omit_if_empty", &self.omit_if_empty)
            .finish()
    }
}

/// A record entry: an ordered sequence of named field accessors.
pub struct StructAtlas {
    type_id: TypeId,
    type_name: &'static str,
    make: Maker,
    fields: Vec<FieldSpec>,
    allow_unknown: bool,
}

impl StructAtlas {
    /// Declares the fields of record type `S`, in marshal order.
    pub fn new<S: Any + Default>(fields: Vec<FieldSpec>) -> Self {
        StructAtlas {
            type_id: TypeId::of::<S>(),
            type_name: type_name::<S>(),
            make: Box::new(|| Box::new(S::default()) as Box<dyn Any>),
            fields,
            allow_unknown: false,
        }
    }

    /// Unknown keys are skipped during unmarshal instead of failing with
    /// `no such field`.
    #[must_use]
    pub fn allow_unknown_keys(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub(crate) fn field_named(&self, name: &str) -> Option<(usize, &FieldSpec)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
    }

    pub(crate) fn tolerates_unknown(&self) -> bool {
        self.allow_unknown
    }

    pub(crate) fn make_node(&self) -> Box<dyn Any> {
        (self.make)()
    }

    fn validate(&self) -> Result<()> {
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(Error::AtlasConstruction(format!(
                    "record {} declares a field with an empty serial name",
                    self.type_name
                )));
            }
            if field.host != self.type_id {
                return Err(Error::AtlasConstruction(format!(
                    "record {} declares field {:?} whose accessor is bound to {}",
                    self.type_name, field.name, field.host_name
                )));
            }
            if self.fields[..i].iter().any(|prior| prior.name == field.name) {
                return Err(Error::AtlasConstruction(format!(
                    "record {} declares serial name {:?} twice",
                    self.type_name, field.name
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for StructAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructAtlas")
            .field("type", &self.type_name)
            .field("fields", &self.fields)
            .field("allow_unknown", &self.allow_unknown)
            .finish()
    }
}

/// A transform entry: the live value converts to and from the dynamic
/// [`Value`] shape, which is what actually crosses the token boundary.
///
/// This is how a record can serialize as, say, a bare string.
pub struct TransformAtlas {
    type_id: TypeId,
    type_name: &'static str,
    to_wire: ToWire,
    from_wire: FromWire,
}

impl TransformAtlas {
    pub fn new<T: Any>(to: fn(&T) -> Value, from: fn(Value) -> Result<T>) -> Self {
        TransformAtlas {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            to_wire: Box::new(move |live: &dyn Any| {
                let live = live
                    .downcast_ref::<T>()
                    .expect("atlas transform applied to a foreign type");
                Ok(to(live))
            }),
            from_wire: Box::new(move |wire: Value| {
                let live = from(wire)?;
                Ok(Box::new(live) as Box<dyn Any>)
            }),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn to_wire(&self, live: &dyn Any) -> Result<Value> {
        (self.to_wire)(live)
    }

    pub(crate) fn from_wire(&self, wire: Value) -> Result<Box<dyn Any>> {
        (self.from_wire)(wire)
    }
}

impl std::fmt::Debug for TransformAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformAtlas")
            .field("type", &self.type_name)
            .finish()
    }
}

/// One arm of a keyed union.
pub struct Variant {
    tag: String,
    host: TypeId,
    host_name: &'static str,
    payload: TypeId,
    payload_name: &'static str,
    wrap: VariantWrap,
}

impl Variant {
    /// Declares that discriminator `tag` carries a payload of type `P`,
    /// rebuilt into the union type `E` through `wrap`.
    pub fn new<E, P>(tag: impl Into<String>, wrap: fn(P) -> E) -> Self
    where
        E: Any,
        P: Any,
    {
        Variant {
            tag: tag.into(),
            host: TypeId::of::<E>(),
            host_name: type_name::<E>(),
            payload: TypeId::of::<P>(),
            payload_name: type_name::<P>(),
            wrap: Box::new(move |payload: Box<dyn Any>| {
                let payload = payload
                    .downcast::<P>()
                    .expect("union variant rebuilt from a foreign payload");
                Box::new(wrap(*payload)) as Box<dyn Any>
            }),
        }
    }

    pub(crate) fn tag(&self) -> &str {
        &self.tag
    }

    pub(crate) fn payload(&self) -> TypeId {
        self.payload
    }

    pub(crate) fn payload_name(&self) -> &'static str {
        self.payload_name
    }

    pub(crate) fn wrap(&self, payload: Box<dyn Any>) -> Box<dyn Any> {
        (self.wrap)(payload)
    }
}

impl std::fmt::Debug for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variant")
            .field("tag", &self.tag)
            .field("payload", &self.payload_name)
            .finish()
    }
}

/// A keyed-union entry: a polymorphic value marshals as a single-entry map
/// whose key is the variant's discriminator string.
pub struct UnionAtlas {
    type_id: TypeId,
    type_name: &'static str,
    variants: Vec<Variant>,
    select: VariantSelect,
}

impl UnionAtlas {
    /// Declares the variants of union type `E`. `select` inspects a live
    /// value and returns its discriminator plus a reference to its payload.
    pub fn new<E: Any>(variants: Vec<Variant>, select: fn(&E) -> (&str, &dyn Any)) -> Self {
        UnionAtlas {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            variants,
            select: Box::new(move |host: &dyn Any| {
                let host = host
                    .downcast_ref::<E>()
                    .expect("atlas union applied to a foreign type");
                select(host)
            }),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn variant_tagged(&self, tag: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.tag == tag)
    }

    pub(crate) fn select<'v>(&self, host: &'v dyn Any) -> (&'v str, &'v dyn Any) {
        (self.select)(host)
    }

    fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(Error::AtlasConstruction(format!(
                "union {} declares no variants",
                self.type_name
            )));
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if variant.host != self.type_id {
                return Err(Error::AtlasConstruction(format!(
                    "union {} declares variant {:?} bound to {}",
                    self.type_name, variant.tag, variant.host_name
                )));
            }
            if self.variants[..i].iter().any(|prior| prior.tag == variant.tag) {
                return Err(Error::AtlasConstruction(format!(
                    "union {} declares discriminator {:?} twice",
                    self.type_name, variant.tag
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for UnionAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionAtlas")
            .field("type", &self.type_name)
            .field("variants", &self.variants)
            .finish()
    }
}

#[derive(Debug)]
enum AtlasEntry {
    Struct(StructAtlas),
    MapOrder(KeySortMode),
    Transform(TransformAtlas),
    Union(UnionAtlas),
}

impl AtlasEntry {
    fn type_id(&self) -> TypeId {
        match self {
            AtlasEntry::Struct(sa) => sa.type_id,
            AtlasEntry::MapOrder(_) => TypeId::of::<ValueMap>(),
            AtlasEntry::Transform(ta) => ta.type_id,
            AtlasEntry::Union(ua) => ua.type_id,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            AtlasEntry::Struct(sa) => sa.type_name,
            AtlasEntry::MapOrder(_) => type_name::<ValueMap>(),
            AtlasEntry::Transform(ta) => ta.type_name,
            AtlasEntry::Union(ua) => ua.type_name,
        }
    }
}

/// The resolved traversal behavior for one value type: either a registered
/// entry or one of the closed set of inherent shapes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Shape<'a> {
    Bool,
    I64,
    U64,
    F64,
    Str,
    Bytes,
    Number,
    /// A fully dynamic `Value` slot.
    Dynamic,
    /// A `Vec<Value>` sequence.
    Array,
    /// A `ValueMap`, with the order its entries marshal in.
    Map(KeySortMode),
    Struct(&'a StructAtlas),
    Union(&'a UnionAtlas),
    Transform(&'a TransformAtlas),
}

/// The immutable, shareable type registry.
///
/// Built once through [`Atlas::builder`]; read-only afterwards. An empty
/// atlas (via [`Default`]) still serves every inherent shape, which is all
/// the dynamic [`Value`] path needs.
#[derive(Debug, Default)]
pub struct Atlas {
    entries: HashMap<TypeId, AtlasEntry>,
}

impl Atlas {
    #[must_use]
    pub fn builder() -> AtlasBuilder {
        AtlasBuilder {
            pending: Vec::new(),
        }
    }

    /// Resolves a type to its traversal shape. `name` is used only for the
    /// `Unresolvable` error message.
    pub(crate) fn shape_of(&self, id: TypeId, name: &str) -> Result<Shape<'_>> {
        if let Some(entry) = self.entries.get(&id) {
            return Ok(match entry {
                AtlasEntry::Struct(sa) => Shape::Struct(sa),
                AtlasEntry::MapOrder(mode) => Shape::Map(*mode),
                AtlasEntry::Transform(ta) => Shape::Transform(ta),
                AtlasEntry::Union(ua) => Shape::Union(ua),
            });
        }
        // Default behavior by kind, over the closed set of inherent shapes.
        Ok(if id == TypeId::of::<bool>() {
            Shape::Bool
        } else if id == TypeId::of::<i64>() {
            Shape::I64
        } else if id == TypeId::of::<u64>() {
            Shape::U64
        } else if id == TypeId::of::<f64>() {
            Shape::F64
        } else if id == TypeId::of::<String>() {
            Shape::Str
        } else if id == TypeId::of::<Vec<u8>>() {
            Shape::Bytes
        } else if id == TypeId::of::<Number>() {
            Shape::Number
        } else if id == TypeId::of::<Value>() {
            Shape::Dynamic
        } else if id == TypeId::of::<Vec<Value>>() {
            Shape::Array
        } else if id == TypeId::of::<ValueMap>() {
            Shape::Map(KeySortMode::default())
        } else {
            return Err(Error::Unresolvable {
                type_name: name.to_string(),
            });
        })
    }

    /// The marshal order for dynamic maps, honoring a registered morphism.
    pub(crate) fn map_order(&self) -> KeySortMode {
        match self.entries.get(&TypeId::of::<ValueMap>()) {
            Some(AtlasEntry::MapOrder(mode)) => *mode,
            _ => KeySortMode::default(),
        }
    }
}

/// Accumulates entries for an [`Atlas`]; validation happens in
/// [`AtlasBuilder::build`], before any marshal/unmarshal operation can see
/// the registry.
#[derive(Debug)]
pub struct AtlasBuilder {
    pending: Vec<AtlasEntry>,
}

impl AtlasBuilder {
    /// Registers a record entry.
    #[must_use]
    pub fn structure(mut self, entry: StructAtlas) -> Self {
        self.pending.push(AtlasEntry::Struct(entry));
        self
    }

    /// Registers the key order for dynamic maps.
    #[must_use]
    pub fn map_order(mut self, mode: KeySortMode) -> Self {
        self.pending.push(AtlasEntry::MapOrder(mode));
        self
    }

    /// Registers a transform entry.
    #[must_use]
    pub fn transform(mut self, entry: TransformAtlas) -> Self {
        self.pending.push(AtlasEntry::Transform(entry));
        self
    }

    /// Registers a keyed-union entry.
    #[must_use]
    pub fn union(mut self, entry: UnionAtlas) -> Self {
        self.pending.push(AtlasEntry::Union(entry));
        self
    }

    /// Validates every entry and freezes the registry.
    ///
    /// # Errors
    ///
    /// Rejects two entries for the same type, duplicate serial names within
    /// one record, duplicate union discriminators, and accessors bound to a
    /// type other than the one they were registered under.
    pub fn build(self) -> Result<Atlas> {
        let mut entries = HashMap::with_capacity(self.pending.len());
        for entry in self.pending {
            match &entry {
                AtlasEntry::Struct(sa) => sa.validate()?,
                AtlasEntry::Union(ua) => ua.validate()?,
                AtlasEntry::MapOrder(_) | AtlasEntry::Transform(_) => {}
            }
            let name = entry.type_name();
            if entries.insert(entry.type_id(), entry).is_some() {
                return Err(Error::AtlasConstruction(format!(
                    "two entries registered for type {}",
                    name
                )));
            }
        }
        Ok(Atlas { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Point {
        x: i64,
        y: i64,
    }

    fn point_fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x),
            FieldSpec::new("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y),
        ]
    }

    #[test]
    fn builds_and_resolves() {
        let atlas = Atlas::builder()
            .structure(StructAtlas::new::<Point>(point_fields()))
            .build()
            .unwrap();
        let shape = atlas.shape_of(TypeId::of::<Point>(), "Point").unwrap();
        assert!(matches!(shape, Shape::Struct(_)));
        assert!(matches!(
            atlas.shape_of(TypeId::of::<u64>(), "u64").unwrap(),
            Shape::U64
        ));
    }

    #[test]
    fn unregistered_type_is_unresolvable() {
        struct Opaque;
        let atlas = Atlas::default();
        let err = atlas
            .shape_of(TypeId::of::<Opaque>(), "Opaque")
            .unwrap_err();
        assert!(matches!(err, Error::Unresolvable { .. }));
    }

    #[test]
    fn duplicate_type_entries_rejected() {
        let err = Atlas::builder()
            .structure(StructAtlas::new::<Point>(point_fields()))
            .structure(StructAtlas::new::<Point>(point_fields()))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::AtlasConstruction(_)));
    }

    #[test]
    fn duplicate_serial_names_rejected() {
        let err = Atlas::builder()
            .structure(StructAtlas::new::<Point>(vec![
                FieldSpec::new("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x),
                FieldSpec::new("x", |p: &Point| &p.y, |p: &mut Point| &mut p.y),
            ]))
            .build()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("twice"), "unexpected message: {msg}");
    }

    #[test]
    fn foreign_accessor_rejected() {
        #[derive(Default)]
        struct Other {
            z: i64,
        }
        let err = Atlas::builder()
            .structure(StructAtlas::new::<Point>(vec![FieldSpec::new(
                "z",
                |o: &Other| &o.z,
                |o: &mut Other| &mut o.z,
            )]))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::AtlasConstruction(_)));
    }

    #[test]
    fn key_sort_modes_order() {
        let mut entries = vec![
            ("bb".to_string(), 0),
            ("a".to_string(), 1),
            ("ab".to_string(), 2),
        ];
        KeySortMode::Lexical.order(&mut entries);
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "ab", "bb"]);

        KeySortMode::LengthFirst.order(&mut entries);
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "ab", "bb"]);

        let mut entries = vec![("ccc".to_string(), 0), ("b".to_string(), 1)];
        KeySortMode::LengthFirst.order(&mut entries);
        assert_eq!(entries[0].0, "b");
    }
}
