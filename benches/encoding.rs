// Encoding Benchmarks
//
// Measures the client-side cost of preparing a bet:
// - sealed-box encryption of amount and side
// - proof generation bound to the amount ciphertext
// - proof binding checks as an external verifier would run them

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::OsRng;
use rust_decimal::Decimal;
use x25519_dalek::{PublicKey, StaticSecret};

use cipher_bet::core::to_base_units;
use cipher_bet::crypto::{
    DeterministicService, EncryptionContext, EncryptionService, Plaintext, SealedBoxService,
};
use cipher_bet::market::Side;

fn network_context() -> EncryptionContext {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    EncryptionContext::initialize(public.as_bytes()).expect("32-byte key")
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let ctx = network_context();
    let amount = Decimal::new(25, 1);

    let sealed = SealedBoxService::new();
    group.bench_function("sealed_box/amount", |b| {
        b.iter(|| sealed.encode_amount(&ctx, black_box(amount)))
    });
    group.bench_function("sealed_box/side", |b| {
        b.iter(|| sealed.encode_side(&ctx, black_box(Side::SideA)))
    });

    let deterministic = DeterministicService::new(1);
    group.bench_function("deterministic/amount", |b| {
        b.iter(|| deterministic.encode_amount(&ctx, black_box(amount)))
    });

    group.finish();
}

fn bench_prove(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof");
    let ctx = network_context();
    let service = SealedBoxService::new();
    let amount = Decimal::new(25, 1);
    let units = to_base_units(amount).expect("valid amount");
    let value = service.encode_amount(&ctx, amount).expect("sealed");
    let proof = service
        .prove(&ctx, &value, &Plaintext::Amount(units))
        .expect("proved");

    group.bench_function("prove", |b| {
        b.iter(|| service.prove(&ctx, black_box(&value), &Plaintext::Amount(units)))
    });
    group.bench_function("is_bound_to", |b| {
        b.iter(|| proof.is_bound_to(black_box(&value)))
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_prove);
criterion_main!(benches);
