//! Format-to-format transcoding with no object layer in between: the JSON
//! decoder pumps straight into the CBOR encoder and back.
//!
//! Run with: `cargo run --example transcode`

fn main() -> tokenwire::Result<()> {
    let text = r#"{"telemetry":{"cpu":0.25,"labels":["a","b"],"ok":true}}"#;

    let bytes = tokenwire::json_to_cbor(text)?;
    println!("JSON ({} bytes) -> CBOR ({} bytes)", text.len(), bytes.len());

    let back = tokenwire::cbor_to_json(&bytes)?;
    println!("CBOR -> JSON: {back}");
    assert_eq!(back, text);
    Ok(())
}
