//! First steps: register a record and move it through both wire formats.
//!
//! Run with: `cargo run --example simple`

use tokenwire::atlas::{Atlas, FieldSpec, StructAtlas};
use tokenwire::{cbor, json};

#[derive(Default, Debug, PartialEq)]
struct User {
    id: u64,
    name: String,
    active: bool,
}

fn main() -> tokenwire::Result<()> {
    let atlas = Atlas::builder()
        .structure(StructAtlas::new::<User>(vec![
            FieldSpec::new("id", |u: &User| &u.id, |u: &mut User| &mut u.id),
            FieldSpec::new("name", |u: &User| &u.name, |u: &mut User| &mut u.name),
            FieldSpec::new("active", |u: &User| &u.active, |u: &mut User| &mut u.active),
        ]))
        .build()?;

    let user = User {
        id: 123,
        name: "Alice".to_string(),
        active: true,
    };

    let text = json::to_string(&atlas, &user)?;
    println!("JSON: {text}");

    let bytes = cbor::to_vec(&atlas, &user)?;
    println!("CBOR: {} bytes", bytes.len());

    let back: User = cbor::from_slice(&atlas, &bytes)?;
    assert_eq!(back, user);
    println!("round-tripped: {back:?}");
    Ok(())
}
