use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use ark_bn254::Fr;
use ark_ff::UniformRand;

use committee_crypto::{hash_elements, hash_two, test_helpers::keygen_mul, PublicKey};

fn field_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("poseidon");
    let rng = &mut XorShiftRng::seed_from_u64(0);
    let (left, right) = (Fr::rand(rng), Fr::rand(rng));
    let elements = (0..8).map(|_| Fr::rand(rng)).collect::<Vec<_>>();

    group.bench_function("two-to-one", |b| b.iter(|| hash_two(&left, &right)));
    group.bench_function("eight elements", |b| b.iter(|| hash_elements(&elements)));
}

fn key_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("bls");
    group.sample_size(10);
    const NUM_VALIDATORS: usize = 512;
    let rng = &mut XorShiftRng::seed_from_u64(1);
    let (_, keys) = keygen_mul(rng, NUM_VALIDATORS);

    group.bench_function("aggregate 512 keys", |b| {
        b.iter(|| PublicKey::aggregate(&keys))
    });
}

criterion_group!(benches, field_hash, key_aggregation);
criterion_main!(benches);
