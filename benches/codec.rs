use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokenwire::atlas::Atlas;
use tokenwire::{cbor, json, value, Value};

fn sample_doc() -> Value {
    let mut rows = Vec::with_capacity(64);
    for i in 0..64u64 {
        rows.push(value!({
            "id": i,
            "name": "row",
            "score": 0.5,
            "tags": ["a", "b", "c"],
            "nested": {"deep": [1, 2, 3]}
        }));
    }
    Value::Array(rows)
}

fn bench_cbor(c: &mut Criterion) {
    let atlas = Atlas::default();
    let doc = sample_doc();
    let bytes = cbor::to_vec(&atlas, &doc).unwrap();

    c.bench_function("cbor_encode", |b| {
        b.iter(|| cbor::to_vec(&atlas, black_box(&doc)).unwrap())
    });
    c.bench_function("cbor_decode", |b| {
        b.iter(|| cbor::from_slice::<Value>(&atlas, black_box(&bytes)).unwrap())
    });
}

fn bench_json(c: &mut Criterion) {
    let atlas = Atlas::default();
    let doc = sample_doc();
    let text = json::to_string(&atlas, &doc).unwrap();

    c.bench_function("json_encode", |b| {
        b.iter(|| json::to_string(&atlas, black_box(&doc)).unwrap())
    });
    c.bench_function("json_decode", |b| {
        b.iter(|| json::from_str::<Value>(&atlas, black_box(&text)).unwrap())
    });
}

fn bench_transcode(c: &mut Criterion) {
    let atlas = Atlas::default();
    let doc = sample_doc();
    let text = json::to_string(&atlas, &doc).unwrap();

    c.bench_function("json_to_cbor", |b| {
        b.iter(|| tokenwire::json_to_cbor(black_box(&text)).unwrap())
    });
}

criterion_group!(benches, bench_cbor, bench_json, bench_transcode);
criterion_main!(benches);
