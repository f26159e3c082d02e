use core::hash::BuildHasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownMap;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Distribution;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;
use trihash::HashMap as TriMap;
use trihash::HashSet as TriSet;
use trihash::hashing::BuildHashing;
use trihash::hashing::IntHashing;
use trihash::hashing::StrHashing;

#[derive(Clone, Copy)]
struct SipBuilder {
    k0: u64,
    k1: u64,
}

impl SipBuilder {
    fn random() -> Self {
        let mut rng = OsRng;
        Self {
            k0: rng.try_next_u64().unwrap(),
            k1: rng.try_next_u64().unwrap(),
        }
    }
}

impl BuildHasher for SipBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(self.k0, self.k1)
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_keys(count: usize, seed: u64) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count).map(|_| rng.random()).collect()
}

fn bench_insert_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_random");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys(size, size as u64);
        let hasher = SipBuilder::random();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("trihash/{size}"), |b| {
            b.iter_batched(
                || TriMap::<u64, u64, _>::with_hasher(hasher),
                |mut map| {
                    for &key in &keys {
                        map.insert(key, key);
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || HashbrownMap::<u64, u64, _>::with_hasher(hasher),
                |mut map| {
                    for &key in &keys {
                        map.insert(key, key);
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys(size, size as u64);
        let misses = random_keys(size, !(size as u64));
        let hasher = SipBuilder::random();

        let mut tri = TriMap::with_hasher(hasher);
        let mut brown = HashbrownMap::with_hasher(hasher);
        for &key in &keys {
            tri.insert(key, key);
            brown.insert(key, key);
        }

        let mut probes = keys.clone();
        probes.shuffle(&mut SmallRng::seed_from_u64(7));

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("trihash_hit/{size}"), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(tri.get(key));
                }
            });
        });
        group.bench_function(format!("hashbrown_hit/{size}"), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(brown.get(key));
                }
            });
        });
        group.bench_function(format!("trihash_miss/{size}"), |b| {
            b.iter(|| {
                for key in &misses {
                    black_box(tri.get(key));
                }
            });
        });
        group.bench_function(format!("hashbrown_miss/{size}"), |b| {
            b.iter(|| {
                for key in &misses {
                    black_box(brown.get(key));
                }
            });
        });
    }

    group.finish();
}

fn bench_zipf_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_zipf");

    for &size in SIZES {
        let keys = random_keys(size, size as u64);
        let hasher = SipBuilder::random();

        let mut tri = TriMap::with_hasher(hasher);
        let mut brown = HashbrownMap::with_hasher(hasher);
        for &key in &keys {
            tri.insert(key, key);
            brown.insert(key, key);
        }

        let zipf = Zipf::new(size as f64, 1.1).unwrap();
        let mut rng = SmallRng::seed_from_u64(11);
        let probes = (0..size)
            .map(|_| keys[zipf.sample(&mut rng) as usize - 1])
            .collect::<Vec<_>>();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("trihash/{size}"), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(tri.get(key));
                }
            });
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(brown.get(key));
                }
            });
        });
    }

    group.finish();
}

// Steady-state insert/remove cycles: the table stays at the same population
// while tombstones accumulate and get compacted away.
fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    for &size in SIZES {
        let keys = random_keys(size * 2, size as u64);
        let (resident, incoming) = keys.split_at(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("trihash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut set = TriSet::with_hashing(IntHashing);
                    set.insert_all(resident.iter().copied());
                    set
                },
                |mut set| {
                    for (old, new) in resident.iter().zip(incoming) {
                        set.remove(old);
                        set.insert(*new);
                    }
                    black_box(set)
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut set = hashbrown::HashSet::new();
                    set.extend(resident.iter().copied());
                    set
                },
                |mut set| {
                    for (old, new) in resident.iter().zip(incoming) {
                        set.remove(old);
                        set.insert(*new);
                    }
                    black_box(set)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_string_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_keys");

    for &size in &SIZES[..3] {
        let keys = random_keys(size, size as u64)
            .into_iter()
            .map(|key| format!("key_{key:016X}"))
            .collect::<Vec<_>>();
        let hasher = SipBuilder::random();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("trihash_x31/{size}"), |b| {
            b.iter_batched(
                || TriMap::<&str, usize, _>::with_hashing(StrHashing),
                |mut map| {
                    for (i, key) in keys.iter().enumerate() {
                        map.insert(key.as_str(), i);
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("trihash_sip/{size}"), |b| {
            b.iter_batched(
                || TriMap::<&str, usize, _>::with_hashing(BuildHashing::new(hasher)),
                |mut map| {
                    for (i, key) in keys.iter().enumerate() {
                        map.insert(key.as_str(), i);
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || HashbrownMap::<&str, usize, _>::with_hasher(hasher),
                |mut map| {
                    for (i, key) in keys.iter().enumerate() {
                        map.insert(key.as_str(), i);
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random,
    bench_lookup,
    bench_zipf_lookup,
    bench_churn,
    bench_string_keys
);
criterion_main!(benches);
