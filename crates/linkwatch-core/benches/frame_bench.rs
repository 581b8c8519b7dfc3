//! Criterion benchmarks for the 64-byte frame codec and secret matching.
//!
//! Run with:
//! ```bash
//! cargo bench --package linkwatch-core --bench frame_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linkwatch_core::{
    decode_message, encode_message, CommandKind, DeviceAddress, DiscoverySecret, Message,
    NetworkKey,
};

fn fixtures() -> Vec<(&'static str, Message)> {
    let secret = DiscoverySecret::default();
    vec![
        ("Discover", Message::discover(&secret)),
        ("Acknowledge", Message::acknowledge(&secret)),
        ("Heartbeat", Message::Heartbeat),
        ("Command", Message::Command(CommandKind::Reboot)),
    ]
}

/// Benchmarks `encode_message` for every message type.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, msg) in fixtures() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &msg, |b, msg| {
            b.iter(|| encode_message(black_box(msg)))
        });
    }
    group.finish();
}

/// Benchmarks `decode_message` for every message type.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, msg) in fixtures() {
        let bytes = encode_message(&msg);
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| decode_message(black_box(bytes)))
        });
    }
    group.finish();
}

/// Secret check and link-key derivation run once per inbound Discover and
/// once per upgrade respectively.
fn bench_auth(c: &mut Criterion) {
    let secret = DiscoverySecret::default();
    let payload = secret.padded();
    c.bench_function("secret_matches", |b| {
        b.iter(|| secret.matches(black_box(&payload)))
    });

    let key = NetworkKey::default();
    let client = DeviceAddress::new([0x24, 0x0A, 0xC4, 0x00, 0x00, 0x01]);
    c.bench_function("derive_link_key", |b| {
        b.iter(|| key.derive_link_key(black_box(client)))
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_auth);
criterion_main!(benches);
