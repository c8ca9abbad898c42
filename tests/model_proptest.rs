// Model-based property tests.
//
// Every map flavor (inline or node storage, power-of-two or modulo growth) is
// driven by the same random operation sequence as a std HashMap. After each
// step the observable state must agree: lookups, lengths, the returned values
// of mutating calls, and finally the full contents.
//
// A coarse hasher that maps up to four keys to the same hash keeps probe
// windows crowded, so displacement and backward shifting run constantly.
use std::collections::HashMap as ModelMap;
use std::hash::BuildHasher;
use std::hash::Hasher;

use allocator_api2::alloc::Global;
use proptest::prelude::*;
use robin_shift::HashMap;
use robin_shift::HashSet;
use robin_shift::growth_policy::GrowthPolicy;
use robin_shift::growth_policy::Modulo;
use robin_shift::growth_policy::PowerOfTwo;
use robin_shift::node::Boxed;
use robin_shift::node::Inline;
use robin_shift::node::Storage;

#[derive(Clone, Copy, Default)]
struct CoarseHashBuilder;

struct CoarseHasher(u64);

impl Hasher for CoarseHasher {
    fn finish(&self) -> u64 {
        self.0 / 4
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 = self.0.wrapping_shl(8) | byte as u64;
        }
    }

    fn write_u16(&mut self, value: u16) {
        self.0 = value as u64;
    }

    fn write_u32(&mut self, value: u32) {
        self.0 = value as u64;
    }
}

impl BuildHasher for CoarseHashBuilder {
    type Hasher = CoarseHasher;

    fn build_hasher(&self) -> CoarseHasher {
        CoarseHasher(0)
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u32),
    Emplace(u16, u32),
    Remove(u16),
    Get(u16),
    Retain(u16),
    Reserve(u8),
    Shrink,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u16..512, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => (0u16..512, any::<u32>()).prop_map(|(k, v)| Op::Emplace(k, v)),
        4 => (0u16..512).prop_map(Op::Remove),
        3 => (0u16..512).prop_map(Op::Get),
        1 => (2u16..8).prop_map(Op::Retain),
        1 => any::<u8>().prop_map(Op::Reserve),
        1 => Just(Op::Shrink),
        1 => Just(Op::Clear),
    ]
}

fn run_against_model<P, St>(
    policy: P,
    max_load_factor: f32,
    ops: &[Op],
) -> Result<(), TestCaseError>
where
    P: GrowthPolicy,
    St: Storage,
{
    let mut map: HashMap<u16, u32, CoarseHashBuilder, P, Global, St> =
        HashMap::with_capacity_policy_and_hasher_in(0, CoarseHashBuilder, policy, Global);
    map.set_max_load_factor(max_load_factor);
    let mut model: ModelMap<u16, u32> = ModelMap::new();

    for op in ops {
        match *op {
            Op::Insert(k, v) => {
                prop_assert_eq!(map.insert(k, v), model.insert(k, v));
            }
            Op::Emplace(k, v) => {
                let expected_inserted = !model.contains_key(&k);
                let stored = *model.entry(k).or_insert(v);
                let (value, inserted) = map.emplace(k, v);
                prop_assert_eq!(inserted, expected_inserted);
                prop_assert_eq!(*value, stored);
            }
            Op::Remove(k) => {
                prop_assert_eq!(map.remove(&k), model.remove(&k));
            }
            Op::Get(k) => {
                prop_assert_eq!(map.get(&k), model.get(&k));
            }
            Op::Retain(m) => {
                map.retain(|k, _| k % m != 0);
                model.retain(|k, _| k % m != 0);
            }
            Op::Reserve(n) => {
                map.reserve(n as usize);
                let room = map.capacity() as f64 * max_load_factor as f64;
                prop_assert!(room >= (map.len() + n as usize) as f64 - 1.0);
            }
            Op::Shrink => map.shrink_to_fit(),
            Op::Clear => {
                map.clear();
                model.clear();
            }
        }

        prop_assert_eq!(map.len(), model.len());
        prop_assert!(map.len() <= map.capacity());
    }

    let mut actual: Vec<(u16, u32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
    let mut expected: Vec<(u16, u32)> = model.into_iter().collect();
    actual.sort_unstable();
    expected.sort_unstable();
    prop_assert_eq!(actual, expected);

    let len = map.len();
    prop_assert_eq!(map.drain().count(), len);
    prop_assert!(map.is_empty());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn inline_power_of_two_matches_model(ops in proptest::collection::vec(op_strategy(), 1..400)) {
        run_against_model::<_, Inline>(PowerOfTwo, 0.875, &ops)?;
    }

    #[test]
    fn inline_modulo_matches_model(ops in proptest::collection::vec(op_strategy(), 1..400)) {
        run_against_model::<_, Inline>(Modulo, 0.875, &ops)?;
    }

    #[test]
    fn node_power_of_two_matches_model(ops in proptest::collection::vec(op_strategy(), 1..400)) {
        run_against_model::<_, Boxed>(PowerOfTwo, 0.875, &ops)?;
    }

    #[test]
    fn full_load_factor_matches_model(ops in proptest::collection::vec(op_strategy(), 1..400)) {
        run_against_model::<_, Inline>(PowerOfTwo, 1.0, &ops)?;
    }

    #[test]
    fn set_matches_model(values in proptest::collection::vec(0u32..2000, 0..600), removals in proptest::collection::vec(0u32..2000, 0..300)) {
        let mut set: HashSet<u32, CoarseHashBuilder> = HashSet::with_hasher(CoarseHashBuilder);
        let mut model = std::collections::HashSet::new();

        for value in &values {
            prop_assert_eq!(set.insert(*value), model.insert(*value));
        }
        for value in &removals {
            prop_assert_eq!(set.remove(value), model.remove(value));
        }

        prop_assert_eq!(set.len(), model.len());
        for value in 0..2000u32 {
            prop_assert_eq!(set.contains(&value), model.contains(&value));
        }
    }
}
