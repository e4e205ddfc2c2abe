use tokenwire::atlas::{Atlas, FieldSpec, StructAtlas};
use tokenwire::{cbor, json, Value};

#[derive(Default, Debug, PartialEq, Clone)]
struct User {
    id: u64,
    name: String,
    active: bool,
    tags: Vec<Value>,
}

#[derive(Default, Debug, PartialEq)]
struct Order {
    order_id: u64,
    customer: User,
    total: f64,
    note: String,
}

fn user_entry() -> StructAtlas {
    StructAtlas::new::<User>(vec![
        FieldSpec::new("id", |u: &User| &u.id, |u: &mut User| &mut u.id),
        FieldSpec::new("name", |u: &User| &u.name, |u: &mut User| &mut u.name),
        FieldSpec::new("active", |u: &User| &u.active, |u: &mut User| &mut u.active),
        FieldSpec::new("tags", |u: &User| &u.tags, |u: &mut User| &mut u.tags),
    ])
}

fn order_entry() -> StructAtlas {
    StructAtlas::new::<Order>(vec![
        FieldSpec::new("order_id", |o: &Order| &o.order_id, |o: &mut Order| {
            &mut o.order_id
        }),
        FieldSpec::new("customer", |o: &Order| &o.customer, |o: &mut Order| {
            &mut o.customer
        }),
        FieldSpec::new("total", |o: &Order| &o.total, |o: &mut Order| &mut o.total),
        FieldSpec::omit_when_default("note", |o: &Order| &o.note, |o: &mut Order| &mut o.note),
    ])
}

fn atlas() -> Atlas {
    Atlas::builder()
        .structure(user_entry())
        .structure(order_entry())
        .build()
        .unwrap()
}

fn sample_user() -> User {
    User {
        id: 123,
        name: "Alice".to_string(),
        active: true,
        tags: vec![Value::from("admin"), Value::from("developer")],
    }
}

#[test]
fn simple_struct_both_formats() {
    let atlas = atlas();
    let user = sample_user();

    let text = json::to_string(&atlas, &user).unwrap();
    assert_eq!(
        text,
        r#"{"id":123,"name":"Alice","active":true,"tags":["admin","developer"]}"#
    );
    let back: User = json::from_str(&atlas, &text).unwrap();
    assert_eq!(back, user);

    let bytes = cbor::to_vec(&atlas, &user).unwrap();
    let back: User = cbor::from_slice(&atlas, &bytes).unwrap();
    assert_eq!(back, user);
}

#[test]
fn nested_struct_roundtrip() {
    let atlas = atlas();
    let order = Order {
        order_id: 7,
        customer: sample_user(),
        total: 109.97,
        note: "gift wrap".to_string(),
    };

    let text = json::to_string(&atlas, &order).unwrap();
    let back: Order = json::from_str(&atlas, &text).unwrap();
    assert_eq!(back, order);

    let bytes = cbor::to_vec(&atlas, &order).unwrap();
    let back: Order = cbor::from_slice(&atlas, &bytes).unwrap();
    assert_eq!(back, order);
}

#[test]
fn omitted_field_absent_from_output() {
    let atlas = atlas();
    let order = Order {
        order_id: 7,
        customer: User::default(),
        total: 1.5,
        note: String::new(),
    };
    let text = json::to_string(&atlas, &order).unwrap();
    assert!(!text.contains("note"));

    // The field comes back as its default.
    let back: Order = json::from_str(&atlas, &text).unwrap();
    assert_eq!(back.note, "");
}

#[test]
fn missing_fields_keep_defaults() {
    let atlas = atlas();
    let user: User = json::from_str(&atlas, r#"{"name":"Bo"}"#).unwrap();
    assert_eq!(
        user,
        User {
            name: "Bo".to_string(),
            ..User::default()
        }
    );
}

#[test]
fn unknown_field_is_an_error_by_default() {
    let atlas = atlas();
    let err = json::from_str::<User>(&atlas, r#"{"nickname":"Bo"}"#).unwrap_err();
    assert_eq!(
        err,
        tokenwire::Error::NoSuchField {
            name: "nickname".to_string()
        }
    );
}

#[test]
fn lenient_entry_skips_unknown_subtrees() {
    #[derive(Default, Debug, PartialEq)]
    struct Loose {
        name: String,
    }
    let atlas = Atlas::builder()
        .structure(
            StructAtlas::new::<Loose>(vec![FieldSpec::new(
                "name",
                |l: &Loose| &l.name,
                |l: &mut Loose| &mut l.name,
            )])
            .allow_unknown_keys(),
        )
        .build()
        .unwrap();

    let loose: Loose = json::from_str(
        &atlas,
        r#"{"extra":{"deep":[1,2,{"x":null}]},"name":"Bo","more":7}"#,
    )
    .unwrap();
    assert_eq!(loose.name, "Bo");
}

#[test]
fn duplicate_record_key_is_an_error() {
    let atlas = atlas();
    let err = json::from_str::<User>(&atlas, r#"{"name":"a","name":"b"}"#).unwrap_err();
    assert_eq!(
        err,
        tokenwire::Error::DuplicateKey {
            key: "name".to_string()
        }
    );
}

#[test]
fn embedded_accessors_reach_through_sub_records() {
    // A flattened view: the atlas addresses a leaf two records deep.
    #[derive(Default, Debug, PartialEq)]
    struct Inner {
        city: String,
    }
    #[derive(Default, Debug, PartialEq)]
    struct Outer {
        inner: Inner,
    }
    let atlas = Atlas::builder()
        .structure(StructAtlas::new::<Outer>(vec![FieldSpec::new(
            "city",
            |o: &Outer| &o.inner.city,
            |o: &mut Outer| &mut o.inner.city,
        )]))
        .build()
        .unwrap();

    let outer = Outer {
        inner: Inner {
            city: "Ulm".to_string(),
        },
    };
    let text = json::to_string(&atlas, &outer).unwrap();
    assert_eq!(text, r#"{"city":"Ulm"}"#);
    let back: Outer = json::from_str(&atlas, &text).unwrap();
    assert_eq!(back, outer);
}

#[test]
fn bytes_fields_cross_both_formats() {
    #[derive(Default, Debug, PartialEq)]
    struct Blob {
        data: Vec<u8>,
    }
    let atlas = Atlas::builder()
        .structure(StructAtlas::new::<Blob>(vec![FieldSpec::new(
            "data",
            |b: &Blob| &b.data,
            |b: &mut Blob| &mut b.data,
        )]))
        .build()
        .unwrap();

    let blob = Blob {
        data: b"\x00\x01binary".to_vec(),
    };

    let bytes = cbor::to_vec(&atlas, &blob).unwrap();
    let back: Blob = cbor::from_slice(&atlas, &bytes).unwrap();
    assert_eq!(back, blob);

    // JSON carries bytes as base64 text.
    let text = json::to_string(&atlas, &blob).unwrap();
    assert_eq!(text, r#"{"data":"AAFiaW5hcnk="}"#);
    let back: Blob = json::from_str(&atlas, &text).unwrap();
    assert_eq!(back, blob);
}

#[test]
fn one_atlas_serves_many_threads() {
    let atlas = std::sync::Arc::new(atlas());
    let handles: Vec<_> = (0..4u64)
        .map(|i| {
            let atlas = std::sync::Arc::clone(&atlas);
            std::thread::spawn(move || {
                let user = User {
                    id: i,
                    name: format!("user-{i}"),
                    active: i % 2 == 0,
                    tags: vec![],
                };
                let bytes = cbor::to_vec(&atlas, &user).unwrap();
                let back: User = cbor::from_slice(&atlas, &bytes).unwrap();
                assert_eq!(back, user);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
