use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::ops::Index;

use allocator_api2::alloc::Allocator;
use allocator_api2::alloc::Global;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::growth_policy::GrowthPolicy;
use crate::growth_policy::PowerOfTwo;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::node::Boxed;
use crate::node::Inline;
use crate::node::MapNode;
use crate::node::Storage;

/// A hash map backed by the Robin Hood [`HashTable`].
///
/// `HashMap<K, V, S, P, A, St>` stores key-value pairs where keys implement
/// `Hash + Eq`. Besides the hasher builder `S` it is parameterized over the
/// [`GrowthPolicy`] `P`, the [`Allocator`] `A`, and the [`Storage`] `St` that
/// decides whether pairs live inline in the slot array or behind a pointer
/// (see [`NodeHashMap`]).
///
/// # Performance Characteristics
///
/// - **Memory**: 1 metadata byte per slot plus the size of `(K, V)` per slot,
///   with slots kept at most 87.5% full by default.
/// - **Lookup**: one 16-byte metadata comparison, then key comparisons only
///   for slots whose hash fragment and displacement both match.
///
/// # Examples
///
/// ```rust
/// use robin_shift::HashMap;
///
/// let mut map = HashMap::new();
/// map.insert("a", 1);
/// map.insert("b", 2);
/// map.insert("c", 3);
///
/// assert_eq!(map.get("b"), Some(&2));
/// assert_eq!(map.len(), 3);
/// ```
#[derive(Clone)]
pub struct HashMap<
    K,
    V,
    S = DefaultHashBuilder,
    P = PowerOfTwo,
    A: Allocator = Global,
    St: Storage = Inline,
> {
    table: HashTable<MapNode<K, V, St>, S, P, A>,
}

/// A [`HashMap`] whose pairs keep their address for as long as they stay in
/// the map, including across rehashes.
///
/// Each pair is allocated separately through the map's allocator. The
/// shorthand constructors (`new`, `with_hasher`, ...) build the inline
/// flavor; a node map is built through [`Default`], `collect`, or the
/// allocator-aware constructors such as [`HashMap::new_in`].
///
/// # Examples
///
/// ```rust
/// use robin_shift::NodeHashMap;
///
/// let mut map: NodeHashMap<i32, &str> = NodeHashMap::default();
/// map.insert(0, "zero");
/// let before = map.get(&0).unwrap() as *const &str;
///
/// for i in 1..1000 {
///     map.insert(i, "many");
/// }
/// assert_eq!(map.get(&0).unwrap() as *const &str, before);
/// ```
pub type NodeHashMap<K, V, S = DefaultHashBuilder, P = PowerOfTwo, A = Global> =
    HashMap<K, V, S, P, A, Boxed>;

impl<K, V, S, P, A, St> Debug for HashMap<K, V, S, P, A, St>
where
    K: Debug,
    V: Debug,
    A: Allocator,
    St: Storage,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl<K, V> HashMap<K, V> {
    /// Creates an empty map. No memory is allocated until the first insert.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let map: HashMap<i32, String> = HashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates a map whose load threshold admits at least `capacity` pairs.
    ///
    /// Keys that crowd one probe window can still grow the map earlier.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let map: HashMap<i32, String> = HashMap::with_capacity(100);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self
    where
        K: Hash,
    {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates an empty map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::hash::RandomState;
    ///
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::with_hasher(RandomState::new());
    /// map.insert(1, "a");
    /// assert_eq!(map[&1], "a");
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_in(hash_builder, Global)
    }

    /// Creates a map with the given hasher builder whose load threshold
    /// admits at least `capacity` pairs.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self
    where
        K: Hash,
        S: BuildHasher,
    {
        Self::with_capacity_and_hasher_in(capacity, hash_builder, Global)
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl<K, V, A: Allocator, St: Storage> HashMap<K, V, DefaultHashBuilder, PowerOfTwo, A, St> {
    /// Creates an empty map that allocates from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_hasher_in(DefaultHashBuilder::default(), alloc)
    }

    /// Creates a map allocating from `alloc` whose load threshold admits at
    /// least `capacity` pairs.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self
    where
        K: Hash,
    {
        Self::with_capacity_and_hasher_in(capacity, DefaultHashBuilder::default(), alloc)
    }
}

impl<K, V, S, A: Allocator, St: Storage> HashMap<K, V, S, PowerOfTwo, A, St> {
    /// Creates an empty map with the given hasher builder that allocates from
    /// `alloc`.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_policy_and_hasher_in(hash_builder, PowerOfTwo, alloc),
        }
    }

    /// Creates a map with the given hasher builder, allocating from `alloc`,
    /// whose load threshold admits at least `capacity` pairs.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self
    where
        K: Hash,
        S: BuildHasher,
    {
        Self::with_capacity_policy_and_hasher_in(capacity, hash_builder, PowerOfTwo, alloc)
    }
}

impl<K, V, S, P, A, St> HashMap<K, V, S, P, A, St>
where
    A: Allocator,
    St: Storage,
{
    /// Creates a map from every policy object, with a load threshold that
    /// admits at least `capacity` pairs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use allocator_api2::alloc::Global;
    /// use robin_shift::DefaultHashBuilder;
    /// use robin_shift::HashMap;
    /// use robin_shift::growth_policy::Modulo;
    /// use robin_shift::node::Inline;
    ///
    /// let mut map: HashMap<u32, u32, _, _, _, Inline> =
    ///     HashMap::with_capacity_policy_and_hasher_in(
    ///         100,
    ///         DefaultHashBuilder::default(),
    ///         Modulo,
    ///         Global,
    ///     );
    /// map.insert(7, 49);
    /// assert_eq!(map.capacity(), 115);
    /// ```
    pub fn with_capacity_policy_and_hasher_in(
        capacity: usize,
        hash_builder: S,
        policy: P,
        alloc: A,
    ) -> Self
    where
        K: Hash,
        S: BuildHasher,
        P: GrowthPolicy,
    {
        Self {
            table: HashTable::with_capacity_policy_and_hasher_in(
                capacity,
                hash_builder,
                policy,
                alloc,
            ),
        }
    }

    /// Returns the number of pairs in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no pairs.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots. The map grows once it holds more than
    /// `capacity() * max_load_factor()` pairs.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the current ratio of pairs to slots.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Returns the load factor above which the map grows.
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }

    /// Sets the load factor above which the map grows. Takes effect at the
    /// next insertion that needs room; the map is not resized immediately.
    ///
    /// # Panics
    ///
    /// Panics unless `0.0 < max_load_factor <= 1.0`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map: HashMap<u32, u32> = HashMap::with_capacity(16);
    /// let capacity = map.capacity();
    /// map.set_max_load_factor(0.5);
    /// assert_eq!(map.capacity(), capacity);
    /// assert_eq!(map.max_load_factor(), 0.5);
    /// ```
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        self.table.set_max_load_factor(max_load_factor);
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Returns a reference to the map's growth policy.
    pub fn policy(&self) -> &P {
        self.table.policy()
    }

    /// Returns a reference to the map's allocator.
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Removes all pairs from the map, keeping its allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Swaps the contents of two maps.
    pub fn swap(&mut self, other: &mut Self) {
        self.table.swap(&mut other.table);
    }

    /// Keeps only the pairs for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map: HashMap<i32, i32> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.table.retain(|(k, v)| f(k, v));
    }

    /// Returns an iterator over the pairs of the map in an arbitrary order.
    pub fn iter(&self) -> Iter<'_, K, V, St> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the pairs of the map with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, St> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over the keys of the map.
    pub fn keys(&self) -> Keys<'_, K, V, St> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map.
    pub fn values(&self) -> Values<'_, K, V, St> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values of the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::from([("a", 1), ("b", 2)]);
    /// for value in map.values_mut() {
    ///     *value *= 100;
    /// }
    /// assert_eq!(map["b"], 200);
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, St> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Clears the map, returning all pairs as an iterator. The allocation is
    /// kept.
    pub fn drain(&mut self) -> Drain<'_, K, V, S, P, A, St> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<K, V, S, P, A, St> HashMap<K, V, S, P, A, St>
where
    K: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    /// Inserts a key-value pair unless the key is already present.
    ///
    /// Returns the stored value and whether the pair was inserted. An existing
    /// value is never overwritten; the rejected pair is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.emplace(1, "a"), (&mut "a", true));
    /// assert_eq!(map.emplace(1, "b"), (&mut "a", false));
    /// ```
    pub fn emplace(&mut self, key: K, value: V) -> (&mut V, bool) {
        let (item, inserted) = self.table.emplace((key, value));
        (&mut item.1, inserted)
    }

    /// Inserts the value built by `make` unless `key` is already present.
    ///
    /// `make` only runs when the key is absent. If it panics, the map keeps
    /// exactly the pairs it held before.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.try_emplace("key", || 1);
    /// let (value, inserted) = map.try_emplace("key", || unreachable!());
    /// assert_eq!((*value, inserted), (1, false));
    /// ```
    pub fn try_emplace<F>(&mut self, key: K, make: F) -> (&mut V, bool)
    where
        F: FnOnce() -> V,
    {
        match self.table.entry(&key) {
            TableEntry::Occupied(entry) => (&mut entry.into_mut().1, false),
            TableEntry::Vacant(entry) => (&mut entry.insert_unchecked((key, make())).1, true),
        }
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned.
    /// If the map did have this key present, the value is updated, and the old
    /// value is returned. The key itself is not updated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.table.entry(&key) {
            TableEntry::Occupied(mut entry) => {
                Some(core::mem::replace(&mut entry.get_mut().1, value))
            }
            TableEntry::Vacant(entry) => {
                entry.insert_unchecked((key, value));
                None
            }
        }
    }

    /// Inserts every pair whose key is not yet present, keeping existing
    /// values. Returns the number of pairs inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::from([(1, "one")]);
    /// assert_eq!(map.insert_many([(1, "uno"), (2, "dos")]), 1);
    /// assert_eq!(map[&1], "one");
    /// ```
    pub fn insert_many<I>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs = pairs.into_iter();
        self.reserve(pairs.size_hint().0);

        let mut inserted = 0;
        for (key, value) in pairs {
            if self.emplace(key, value).1 {
                inserted += 1;
            }
        }
        inserted
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, as long as
    /// `Hash` and `Eq` on the borrowed form match those of the key type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(String::from("one"), 1);
    /// assert_eq!(map.get("one"), Some(&1));
    /// assert_eq!(map.get("two"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key).map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find_mut(key).map(|(_, v)| v)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.contains(key)
    }

    /// Returns the number of pairs with the given key: 0 or 1.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        usize::from(self.contains_key(key))
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key)
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut letters = HashMap::new();
    /// for ch in "a short treatise on fungi".chars() {
    ///     *letters.entry(ch).or_insert(0) += 1;
    /// }
    /// assert_eq!(letters[&'s'], 2);
    /// assert_eq!(letters[&'t'], 3);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, P, A, St> {
        match self.table.entry(&key) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }

    /// Reserves capacity for at least `additional` more pairs.
    ///
    /// A full probe window can still grow the map before the reserved
    /// count is reached.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows `usize`.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Tries to reserve capacity for at least `additional` more pairs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map: HashMap<u64, u64> = HashMap::new();
    /// map.try_reserve(10).expect("reasonable request");
    /// assert!(map.try_reserve(usize::MAX).is_err());
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(additional)
    }

    /// Reallocates to hold at least `count` slots, or fewer if the map's
    /// pairs fit in fewer. This may shrink the map.
    pub fn rehash(&mut self, count: usize) {
        self.table.rehash(count);
    }

    /// Shrinks the capacity of the map as much as possible.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashMap;
    ///
    /// let mut map = HashMap::with_capacity(100);
    /// map.insert(1, "one");
    /// map.insert(2, "two");
    /// assert!(map.capacity() >= 100);
    ///
    /// map.shrink_to_fit();
    /// assert!(map.capacity() >= 2);
    /// assert!(map.capacity() < 100);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }
}

#[cfg(feature = "stats")]
impl<K, V, S, P, A, St> HashMap<K, V, S, P, A, St>
where
    A: Allocator,
    St: Storage,
{
    /// Returns the number of pairs at each displacement from their desired
    /// slot.
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table.probe_histogram()
    }

    /// Returns memory and occupancy statistics.
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }
}

impl<K, V, S, P, A, St> PartialEq for HashMap<K, V, S, P, A, St>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|other| value == other))
    }
}

impl<K, V, S, P, A, St> Eq for HashMap<K, V, S, P, A, St>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
}

impl<K, Q, V, S, P, A, St> Index<&Q> for HashMap<K, V, S, P, A, St>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in HashMap")
    }
}

impl<K, V, S, P, A, St> Default for HashMap<K, V, S, P, A, St>
where
    S: Default,
    P: Default,
    A: Allocator + Default,
    St: Storage,
{
    fn default() -> Self {
        Self {
            table: HashTable::default(),
        }
    }
}

impl<K, V, S, P, A, St> FromIterator<(K, V)> for HashMap<K, V, S, P, A, St>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    P: GrowthPolicy + Default,
    A: Allocator + Default,
    St: Storage,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl<K, V, const N: usize> From<[(K, V); N]>
    for HashMap<K, V, DefaultHashBuilder, PowerOfTwo, Global, Inline>
where
    K: Hash + Eq,
{
    /// Builds a map from an array of pairs. Later duplicates overwrite
    /// earlier values.
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V, S, P, A, St> Extend<(K, V)> for HashMap<K, V, S, P, A, St>
where
    K: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    /// Inserts every pair, overwriting the values of keys already present.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let additional = if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        };
        self.reserve(additional);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V, S, P, A, St> Extend<(&'a K, &'a V)> for HashMap<K, V, S, P, A, St>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(|(&key, &value)| (key, value)));
    }
}

impl<'a, K, V, S, P, A: Allocator, St: Storage> IntoIterator for &'a HashMap<K, V, S, P, A, St> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, St>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, P, A: Allocator, St: Storage> IntoIterator
    for &'a mut HashMap<K, V, S, P, A, St>
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, St>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S, P, A: Allocator, St: Storage> IntoIterator for HashMap<K, V, S, P, A, St> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, S, P, A, St>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, S, P, A: Allocator, St: Storage> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, S, P, A, St>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, S, P, A, St>),
}

impl<'a, K, V, S, P, A, St> Entry<'a, K, V, S, P, A, St>
where
    K: Hash,
    S: BuildHasher,
    A: Allocator,
    St: Storage,
{
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Entry::or_insert_with), with the key passed to
    /// the closure.
    pub fn or_insert_with_key<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce(&K) -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = default(entry.key());
                entry.insert(value)
            }
        }
    }

    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}

impl<'a, K, V, S, P, A: Allocator, St: Storage> Entry<'a, K, V, S, P, A, St> {
    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

/// A view into a vacant entry in the map.
///
/// The map has already made room for the pair; dropping the entry without
/// inserting leaves the map unchanged apart from that room.
pub struct VacantEntry<'a, K, V, S, P, A: Allocator, St: Storage> {
    entry: hash_table::VacantEntry<'a, MapNode<K, V, St>, S, P, A>,
    key: K,
}

impl<'a, K, V, S, P, A: Allocator, St: Storage> VacantEntry<'a, K, V, S, P, A, St> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<'a, K, V, S, P, A, St> VacantEntry<'a, K, V, S, P, A, St>
where
    K: Hash,
    S: BuildHasher,
    A: Allocator,
    St: Storage,
{
    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert_unchecked((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, S, P, A: Allocator, St: Storage> {
    entry: hash_table::OccupiedEntry<'a, MapNode<K, V, St>, S, P, A>,
}

impl<'a, K, V, S, P, A: Allocator, St: Storage> OccupiedEntry<'a, K, V, S, P, A, St> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K: 'a, V: 'a, St: Storage> {
    inner: hash_table::Iter<'a, MapNode<K, V, St>>,
}

impl<K, V, St: Storage> Clone for Iter<'_, K, V, St> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V, St: Storage> Iterator for Iter<'a, K, V, St> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, St: Storage> ExactSizeIterator for Iter<'_, K, V, St> {}
impl<K, V, St: Storage> FusedIterator for Iter<'_, K, V, St> {}

/// An iterator over the key-value pairs of a `HashMap` with mutable values.
pub struct IterMut<'a, K: 'a, V: 'a, St: Storage> {
    inner: hash_table::IterMut<'a, MapNode<K, V, St>>,
}

impl<'a, K, V, St: Storage> Iterator for IterMut<'a, K, V, St> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, St: Storage> ExactSizeIterator for IterMut<'_, K, V, St> {}
impl<K, V, St: Storage> FusedIterator for IterMut<'_, K, V, St> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K: 'a, V: 'a, St: Storage> {
    inner: Iter<'a, K, V, St>,
}

impl<'a, K, V, St: Storage> Iterator for Keys<'a, K, V, St> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, St: Storage> ExactSizeIterator for Keys<'_, K, V, St> {}
impl<K, V, St: Storage> FusedIterator for Keys<'_, K, V, St> {}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K: 'a, V: 'a, St: Storage> {
    inner: Iter<'a, K, V, St>,
}

impl<'a, K, V, St: Storage> Iterator for Values<'a, K, V, St> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, St: Storage> ExactSizeIterator for Values<'_, K, V, St> {}
impl<K, V, St: Storage> FusedIterator for Values<'_, K, V, St> {}

/// An iterator over mutable references to the values of a `HashMap`.
pub struct ValuesMut<'a, K: 'a, V: 'a, St: Storage> {
    inner: IterMut<'a, K, V, St>,
}

impl<'a, K, V, St: Storage> Iterator for ValuesMut<'a, K, V, St> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, St: Storage> ExactSizeIterator for ValuesMut<'_, K, V, St> {}
impl<K, V, St: Storage> FusedIterator for ValuesMut<'_, K, V, St> {}

/// A draining iterator over the key-value pairs of a `HashMap`.
///
/// Pairs not yielded are dropped along with the iterator.
pub struct Drain<'a, K, V, S, P, A: Allocator, St: Storage> {
    inner: hash_table::Drain<'a, MapNode<K, V, St>, S, P, A>,
}

impl<K, V, S, P, A: Allocator, St: Storage> Iterator for Drain<'_, K, V, S, P, A, St> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, S, P, A: Allocator, St: Storage> ExactSizeIterator for Drain<'_, K, V, S, P, A, St> {}
impl<K, V, S, P, A: Allocator, St: Storage> FusedIterator for Drain<'_, K, V, S, P, A, St> {}

/// An owning iterator over the key-value pairs of a `HashMap`.
pub struct IntoIter<K, V, S, P, A: Allocator, St: Storage> {
    inner: hash_table::IntoIter<MapNode<K, V, St>, S, P, A>,
}

impl<K, V, S, P, A: Allocator, St: Storage> Iterator for IntoIter<K, V, S, P, A, St> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, S, P, A: Allocator, St: Storage> ExactSizeIterator for IntoIter<K, V, S, P, A, St> {}
impl<K, V, S, P, A: Allocator, St: Storage> FusedIterator for IntoIter<K, V, S, P, A, St> {}
