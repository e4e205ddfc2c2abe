//! Working with dynamic values when the shape isn't known at compile time.
//!
//! Run with: `cargo run --example dynamic_values`

use tokenwire::atlas::{Atlas, KeySortMode};
use tokenwire::{json, value, Value};

fn main() -> tokenwire::Result<()> {
    // Decoding into `Value` accepts any shape the stream carries.
    let atlas = Atlas::default();
    let doc: Value = json::from_str(
        &atlas,
        r#"{"service":"api","ports":[80,443],"healthy":true}"#,
    )?;

    if let Some(ports) = doc.as_map().and_then(|m| m.get("ports")) {
        println!("ports: {ports}");
    }

    // Values also build literally.
    let patch = value!({
        "healthy": false,
        "reason": "maintenance"
    });
    println!("patch: {}", json::to_string(&atlas, &patch)?);

    // A key-sort morphism makes output deterministic regardless of
    // insertion order.
    let sorted_atlas = Atlas::builder().map_order(KeySortMode::Lexical).build()?;
    println!("sorted: {}", json::to_string(&sorted_atlas, &doc)?);
    Ok(())
}
