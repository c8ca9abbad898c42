use core::hash::BuildHasher;
use core::hash::Hash;
use core::hint::black_box;

use allocator_api2::alloc::Global;
use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::distr;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use robin_shift::HashMap as RobinMap;
use robin_shift::NodeHashMap as RobinNodeMap;
use robin_shift::growth_policy::Modulo;
use siphasher::sip::SipHasher;

#[derive(Clone, Default)]
struct SipBuildHasher;

impl BuildHasher for SipBuildHasher {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> SipHasher {
        SipHasher::new()
    }
}

trait BenchKey: Clone + Hash + Eq {
    fn new(key: u64) -> Self;
}

impl BenchKey for u64 {
    fn new(key: u64) -> Self {
        black_box(key)
    }
}

impl BenchKey for String {
    fn new(key: u64) -> Self {
        black_box(format!("key_{:016X}", key))
    }
}

/// Payload stored next to each key, large enough that moving it matters.
#[derive(Clone)]
struct Payload([u8; 64]);

impl Payload {
    fn new(key: u64) -> Self {
        let mut bytes = [0u8; 64];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = (key >> ((i % 8) * 8)) as u8;
        }
        Payload(bytes)
    }
}

/// The map operations exercised by every benchmark, implemented once per
/// contender.
trait BenchMap<K>: Sized {
    const NAME: &'static str;

    fn with_capacity(capacity: usize) -> Self;
    fn insert(&mut self, key: K, value: Payload);
    fn get(&self, key: &K) -> Option<&Payload>;
    fn remove(&mut self, key: &K) -> Option<Payload>;
    fn sum_first_bytes(&self) -> u64;
}

impl<K: Hash + Eq> BenchMap<K> for RobinMap<K, Payload, SipBuildHasher> {
    const NAME: &'static str = "robin_shift";

    fn with_capacity(capacity: usize) -> Self {
        RobinMap::with_capacity_and_hasher(capacity, SipBuildHasher)
    }

    fn insert(&mut self, key: K, value: Payload) {
        RobinMap::insert(self, key, value);
    }

    fn get(&self, key: &K) -> Option<&Payload> {
        RobinMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<Payload> {
        RobinMap::remove(self, key)
    }

    fn sum_first_bytes(&self) -> u64 {
        self.values().map(|v| v.0[0] as u64).sum()
    }
}

impl<K: Hash + Eq> BenchMap<K> for RobinNodeMap<K, Payload, SipBuildHasher> {
    const NAME: &'static str = "robin_shift_node";

    fn with_capacity(capacity: usize) -> Self {
        RobinNodeMap::with_capacity_and_hasher_in(capacity, SipBuildHasher, Global)
    }

    fn insert(&mut self, key: K, value: Payload) {
        RobinNodeMap::insert(self, key, value);
    }

    fn get(&self, key: &K) -> Option<&Payload> {
        RobinNodeMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<Payload> {
        RobinNodeMap::remove(self, key)
    }

    fn sum_first_bytes(&self) -> u64 {
        self.values().map(|v| v.0[0] as u64).sum()
    }
}

impl<K: Hash + Eq> BenchMap<K> for RobinMap<K, Payload, SipBuildHasher, Modulo> {
    const NAME: &'static str = "robin_shift_modulo";

    fn with_capacity(capacity: usize) -> Self {
        RobinMap::with_capacity_policy_and_hasher_in(
            capacity,
            SipBuildHasher,
            Modulo,
            Global,
        )
    }

    fn insert(&mut self, key: K, value: Payload) {
        RobinMap::insert(self, key, value);
    }

    fn get(&self, key: &K) -> Option<&Payload> {
        RobinMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<Payload> {
        RobinMap::remove(self, key)
    }

    fn sum_first_bytes(&self) -> u64 {
        self.values().map(|v| v.0[0] as u64).sum()
    }
}

impl<K: Hash + Eq> BenchMap<K> for hashbrown::HashMap<K, Payload, SipBuildHasher> {
    const NAME: &'static str = "hashbrown";

    fn with_capacity(capacity: usize) -> Self {
        hashbrown::HashMap::with_capacity_and_hasher(capacity, SipBuildHasher)
    }

    fn insert(&mut self, key: K, value: Payload) {
        hashbrown::HashMap::insert(self, key, value);
    }

    fn get(&self, key: &K) -> Option<&Payload> {
        hashbrown::HashMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<Payload> {
        hashbrown::HashMap::remove(self, key)
    }

    fn sum_first_bytes(&self) -> u64 {
        self.values().map(|v| v.0[0] as u64).sum()
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_keys<K: BenchKey>(count: usize) -> Vec<(K, u64)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let raw = rng.try_next_u64().unwrap();
            (K::new(raw), raw)
        })
        .collect()
}

fn filled<K: BenchKey, M: BenchMap<K>>(keys: &[(K, u64)], capacity: usize) -> M {
    let mut map = M::with_capacity(capacity);
    for (key, raw) in keys {
        map.insert(key.clone(), Payload::new(*raw));
    }
    map
}

fn bench_insert<K: BenchKey, M: BenchMap<K>>(c: &mut Criterion, preallocate: bool) {
    let mut group = c.benchmark_group(format!(
        "insert{}_{}/{}",
        if preallocate { "_preallocated" } else { "" },
        core::any::type_name::<K>(),
        M::NAME,
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys::<K>(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(size.to_string(), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = M::with_capacity(if preallocate { size } else { 0 });
                    for (key, raw) in keys {
                        map.insert(key, Payload::new(raw));
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_find<K: BenchKey, M: BenchMap<K>>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}/{}",
        core::any::type_name::<K>(),
        M::NAME,
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let present = random_keys::<K>(size);
        let absent = random_keys::<K>(size);
        let map: M = filled(&present, 0);

        let mut probes: Vec<K> = present
            .iter()
            .chain(absent.iter())
            .map(|(key, _)| key.clone())
            .collect();
        probes.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(size.to_string(), |b| {
            b.iter(|| {
                let mut hits = 0usize;
                for key in &probes {
                    if map.get(key).is_some() {
                        hits += 1;
                    }
                }
                black_box(hits)
            })
        });
    }

    group.finish();
}

fn bench_remove<K: BenchKey, M: BenchMap<K>>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "remove_{}/{}",
        core::any::type_name::<K>(),
        M::NAME,
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys::<K>(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(size.to_string(), |b| {
            b.iter_batched(
                || {
                    let map: M = filled(&keys, size);
                    let mut order: Vec<K> = keys.iter().map(|(key, _)| key.clone()).collect();
                    order.shuffle(&mut SmallRng::from_os_rng());
                    (map, order)
                },
                |(mut map, order)| {
                    for key in &order {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration<K: BenchKey, M: BenchMap<K>>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "iteration_{}/{}",
        core::any::type_name::<K>(),
        M::NAME,
    ));

    for &size in SIZES {
        let map: M = filled(&random_keys::<K>(size), 0);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(size.to_string(), |b| {
            b.iter(|| black_box(map.sum_first_bytes()))
        });
    }

    group.finish();
}

/// Inserts, lookups and removals drawn from skewed key distributions, so a
/// few keys are hot and the table churns at a steady size.
fn bench_mixed_zipf<M: BenchMap<u64>>(c: &mut Criterion) {
    const OPERATIONS: usize = 10_000;
    const KEY_SPACE_MULTIPLIER: f32 = 2.0;

    let mut group = c.benchmark_group(format!("mixed_zipf/{}", M::NAME));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let insert_distr = Zipf::new(size as f32 - 1.0, 1.0).unwrap();
        let lookup_distr = Zipf::new(size as f32 * KEY_SPACE_MULTIPLIER - 1.0, 1.0).unwrap();
        let op_distr = distr::Uniform::new(0.0f64, 1.0).unwrap();

        group.throughput(Throughput::Elements(OPERATIONS as u64));
        group.bench_function(size.to_string(), |b| {
            b.iter_batched(
                || {
                    let keys: Vec<(u64, u64)> = (0..size as u64 / 2).map(|k| (k, k)).collect();
                    (filled::<u64, M>(&keys, 0), SmallRng::from_os_rng())
                },
                |(mut map, mut rng)| {
                    for _ in 0..OPERATIONS {
                        let op: f64 = rng.sample(&op_distr);
                        if op < 0.3 {
                            let key = rng.sample(&insert_distr) as u64;
                            map.insert(key, Payload::new(key));
                        } else if op < 0.8 {
                            let key = rng.sample(&lookup_distr) as u64;
                            black_box(map.get(&key));
                        } else {
                            let key = rng.sample(&lookup_distr) as u64;
                            black_box(map.remove(&key));
                        }
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

type Robin<K> = RobinMap<K, Payload, SipBuildHasher>;
type RobinNode<K> = RobinNodeMap<K, Payload, SipBuildHasher>;
type RobinModulo<K> = RobinMap<K, Payload, SipBuildHasher, Modulo>;
type Hashbrown<K> = hashbrown::HashMap<K, Payload, SipBuildHasher>;

fn insert_benches(c: &mut Criterion) {
    for preallocate in [false, true] {
        bench_insert::<u64, Robin<u64>>(c, preallocate);
        bench_insert::<u64, RobinModulo<u64>>(c, preallocate);
        bench_insert::<u64, RobinNode<u64>>(c, preallocate);
        bench_insert::<u64, Hashbrown<u64>>(c, preallocate);
        bench_insert::<String, Robin<String>>(c, preallocate);
        bench_insert::<String, Hashbrown<String>>(c, preallocate);
    }
}

criterion_group!(
    benches,
    insert_benches,
    bench_find::<u64, Robin<u64>>,
    bench_find::<u64, RobinModulo<u64>>,
    bench_find::<u64, RobinNode<u64>>,
    bench_find::<u64, Hashbrown<u64>>,
    bench_find::<String, Robin<String>>,
    bench_find::<String, Hashbrown<String>>,
    bench_remove::<u64, Robin<u64>>,
    bench_remove::<u64, Hashbrown<u64>>,
    bench_remove::<String, Robin<String>>,
    bench_remove::<String, Hashbrown<String>>,
    bench_iteration::<u64, Robin<u64>>,
    bench_iteration::<u64, RobinNode<u64>>,
    bench_iteration::<u64, Hashbrown<u64>>,
    bench_mixed_zipf::<Robin<u64>>,
    bench_mixed_zipf::<RobinModulo<u64>>,
    bench_mixed_zipf::<Hashbrown<u64>>,
);

criterion_main!(benches);
