use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::Chain;
use core::iter::FusedIterator;

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
use crate::node::SetNode;
use crate::node::Storage;

/// A hash set backed by the Robin Hood [`HashTable`].
///
/// `HashSet<T, S, P, A, St>` stores values of type `T` where `T` implements
/// `Hash + Eq`. The extra parameters mirror [`HashMap`](crate::HashMap): a
/// [`GrowthPolicy`] `P`, an [`Allocator`] `A`, and a [`Storage`] `St` (see
/// [`NodeHashSet`]).
///
/// # Performance Characteristics
///
/// - **Memory**: 1 metadata byte per slot plus the size of `T` per slot.
///
/// # Examples
///
/// ```rust
/// use robin_shift::HashSet;
///
/// let mut books = HashSet::new();
/// books.insert("A Dance With Dragons");
/// books.insert("To Kill a Mockingbird");
///
/// assert!(books.contains("To Kill a Mockingbird"));
/// assert!(!books.insert("A Dance With Dragons"));
/// assert_eq!(books.len(), 2);
/// ```
#[derive(Clone)]
pub struct HashSet<
    T,
    S = DefaultHashBuilder,
    P = PowerOfTwo,
    A: Allocator = Global,
    St: Storage = Inline,
> {
    table: HashTable<SetNode<T, St>, S, P, A>,
}

/// A [`HashSet`] whose values keep their address for as long as they stay in
/// the set.
///
/// # Examples
///
/// ```rust
/// use robin_shift::NodeHashSet;
///
/// let mut set: NodeHashSet<String> = NodeHashSet::default();
/// set.insert("pinned".to_string());
/// let before = set.get("pinned").unwrap() as *const String;
///
/// set.extend((0..1000).map(|i| i.to_string()));
/// assert_eq!(set.get("pinned").unwrap() as *const String, before);
/// ```
pub type NodeHashSet<T, S = DefaultHashBuilder, P = PowerOfTwo, A = Global> =
    HashSet<T, S, P, A, Boxed>;

impl<T, S, P, A, St> PartialEq for HashSet<T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, P, A, St> Eq for HashSet<T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
}

impl<T: Debug, S, P, A: Allocator, St: Storage> Debug for HashSet<T, S, P, A, St> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl<T> HashSet<T> {
    /// Creates an empty set. No memory is allocated until the first insert.
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates a set whose load threshold admits at least `capacity` values.
    ///
    /// Values that crowd one probe window can still grow the set earlier.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::with_capacity(10);
    /// assert!(set.capacity() >= 10);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self
    where
        T: Hash,
    {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<T, S> HashSet<T, S> {
    /// Creates an empty set with the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_in(hash_builder, Global)
    }

    /// Creates a set with the given hasher builder whose load threshold
    /// admits at least `capacity` values.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self
    where
        T: Hash,
        S: BuildHasher,
    {
        Self::with_capacity_and_hasher_in(capacity, hash_builder, Global)
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl<T, A: Allocator, St: Storage> HashSet<T, DefaultHashBuilder, PowerOfTwo, A, St> {
    /// Creates an empty set that allocates from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_hasher_in(DefaultHashBuilder::default(), alloc)
    }

    /// Creates a set allocating from `alloc` whose load threshold admits at
    /// least `capacity` values.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self
    where
        T: Hash,
    {
        Self::with_capacity_and_hasher_in(capacity, DefaultHashBuilder::default(), alloc)
    }
}

impl<T, S, A: Allocator, St: Storage> HashSet<T, S, PowerOfTwo, A, St> {
    /// Creates an empty set with the given hasher builder that allocates from
    /// `alloc`.
    pub fn with_hasher_in(hash_builder: S, alloc: A) -> Self {
        Self {
            table: HashTable::with_policy_and_hasher_in(hash_builder, PowerOfTwo, alloc),
        }
    }

    /// Creates a set with the given hasher builder, allocating from `alloc`,
    /// whose load threshold admits at least `capacity` values.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, alloc: A) -> Self
    where
        T: Hash,
        S: BuildHasher,
    {
        Self::with_capacity_policy_and_hasher_in(capacity, hash_builder, PowerOfTwo, alloc)
    }
}

impl<T, S, P, A, St> HashSet<T, S, P, A, St>
where
    A: Allocator,
    St: Storage,
{
    /// Creates a set from every policy object, with a load threshold that
    /// admits at least `capacity` values.
    pub fn with_capacity_policy_and_hasher_in(
        capacity: usize,
        hash_builder: S,
        policy: P,
        alloc: A,
    ) -> Self
    where
        T: Hash,
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

    /// Returns the number of values in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no values.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the current ratio of values to slots.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Returns the load factor above which the set grows.
    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor()
    }

    /// Sets the load factor above which the set grows. Takes effect at the
    /// next insertion that needs room.
    ///
    /// # Panics
    ///
    /// Panics unless `0.0 < max_load_factor <= 1.0`.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        self.table.set_max_load_factor(max_load_factor);
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Returns a reference to the set's growth policy.
    pub fn policy(&self) -> &P {
        self.table.policy()
    }

    /// Returns a reference to the set's allocator.
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Removes all values, keeping the allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Swaps the contents of two sets.
    pub fn swap(&mut self, other: &mut Self) {
        self.table.swap(&mut other.table);
    }

    /// Retains only the values specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// ```
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.table.retain(|value| f(value));
    }

    /// Returns an iterator over the values of the set in an arbitrary order.
    pub fn iter(&self) -> Iter<'_, T, St> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all values as an iterator.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let mut set = HashSet::from([1, 2]);
    /// let mut values: Vec<_> = set.drain().collect();
    /// values.sort();
    /// assert_eq!(values, [1, 2]);
    /// assert!(set.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T, S, P, A, St> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<T, S, P, A, St> HashSet<T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal value already in
    /// the set is kept and `value` is dropped.
    pub fn insert(&mut self, value: T) -> bool {
        self.table.emplace(value).1
    }

    /// Adds a value unless an equal one is present, returning the stored
    /// value and whether `value` was inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let mut set = HashSet::new();
    /// assert_eq!(set.emplace(3), (&3, true));
    /// assert_eq!(set.emplace(3), (&3, false));
    /// ```
    pub fn emplace(&mut self, value: T) -> (&T, bool) {
        let (stored, inserted) = self.table.emplace(value);
        (&*stored, inserted)
    }

    /// Inserts every value not yet present. Returns the number inserted.
    pub fn insert_many<I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let values = values.into_iter();
        self.reserve(values.size_hint().0);

        let mut inserted = 0;
        for value in values {
            if self.insert(value) {
                inserted += 1;
            }
        }
        inserted
    }

    /// Inserts `value` if absent and returns a reference to the stored value.
    pub fn get_or_insert(&mut self, value: T) -> &T {
        self.emplace(value).0
    }

    /// Inserts the value built by `make` if no value equal to `key` is
    /// present, and returns a reference to the stored value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let mut set: HashSet<String> = HashSet::new();
    /// let value = set.get_or_insert_with("cat", |s| s.to_string());
    /// assert_eq!(value, "cat");
    /// ```
    pub fn get_or_insert_with<Q, F>(&mut self, key: &Q, make: F) -> &T
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&Q) -> T,
    {
        &*self.table.try_emplace_with(key, || make(key)).0
    }

    /// Adds a value to the set, replacing the existing equal value, if any.
    /// Returns the replaced value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let mut set = HashSet::new();
    /// set.insert(1);
    /// assert_eq!(set.replace(1), Some(1));
    /// assert_eq!(set.replace(2), None);
    /// assert_eq!(set.len(), 2);
    /// ```
    pub fn replace(&mut self, value: T) -> Option<T> {
        match self.table.entry(&value) {
            TableEntry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            TableEntry::Vacant(entry) => {
                entry.insert_unchecked(value);
                None
            }
        }
    }

    /// Returns `true` if the set contains a value equal to `value`.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.contains(value)
    }

    /// Returns the number of values equal to `value`: 0 or 1.
    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        usize::from(self.contains(value))
    }

    /// Returns a reference to the stored value equal to `value`, if any.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(value)
    }

    /// Removes a value from the set. Returns whether it was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(value).is_some()
    }

    /// Removes and returns the stored value equal to `value`, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let mut set = HashSet::from([1]);
    /// assert_eq!(set.take(&1), Some(1));
    /// assert_eq!(set.take(&1), None);
    /// ```
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(value)
    }

    /// Reserves capacity for at least `additional` more values.
    ///
    /// A full probe window can still grow the set before the reserved count
    /// is reached.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Tries to reserve capacity for at least `additional` more values.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(additional)
    }

    /// Reallocates to hold at least `count` slots, or fewer if the set's
    /// values fit in fewer.
    pub fn rehash(&mut self, count: usize) {
        self.table.rehash(count);
    }

    /// Shrinks the capacity of the set as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Returns `true` if `self` has no values in common with `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let a = HashSet::from([1, 2]);
    /// let b = HashSet::from([3, 4]);
    /// assert!(a.is_disjoint(&b));
    /// ```
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if every value of `self` is also in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every value of `other` is also in `self`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Visits the values in `self` or `other`, without duplicates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::HashSet;
    ///
    /// let a = HashSet::from([1, 2]);
    /// let b = HashSet::from([2, 3]);
    /// let mut union: Vec<_> = a.union(&b).copied().collect();
    /// union.sort();
    /// assert_eq!(union, [1, 2, 3]);
    /// ```
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, T, S, P, A, St> {
        Union {
            inner: self.iter().chain(other.difference(self)),
        }
    }

    /// Visits the values in both `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, T, S, P, A, St> {
        let (iter, other) = if self.len() <= other.len() {
            (self.iter(), other)
        } else {
            (other.iter(), self)
        };
        Intersection { iter, other }
    }

    /// Visits the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, T, S, P, A, St> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Visits the values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a Self,
    ) -> SymmetricDifference<'a, T, S, P, A, St> {
        SymmetricDifference {
            inner: self.difference(other).chain(other.difference(self)),
        }
    }
}

#[cfg(feature = "stats")]
impl<T, S, P, A: Allocator, St: Storage> HashSet<T, S, P, A, St> {
    /// Returns the number of values at each displacement from their desired
    /// slot.
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table.probe_histogram()
    }

    /// Returns memory and occupancy statistics.
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }
}

impl<T, S, P, A, St> Default for HashSet<T, S, P, A, St>
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

impl<T, S, P, A, St> FromIterator<T> for HashSet<T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    P: GrowthPolicy + Default,
    A: Allocator + Default,
    St: Storage,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl<T, const N: usize> From<[T; N]> for HashSet<T, DefaultHashBuilder, PowerOfTwo, Global, Inline>
where
    T: Hash + Eq,
{
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, S, P, A, St> Extend<T> for HashSet<T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let additional = if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        };
        self.reserve(additional);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S, P, A, St> Extend<&'a T> for HashSet<T, S, P, A, St>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<'a, T, S, P, A: Allocator, St: Storage> IntoIterator for &'a HashSet<T, S, P, A, St> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, St>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S, P, A: Allocator, St: Storage> IntoIterator for HashSet<T, S, P, A, St> {
    type Item = T;
    type IntoIter = IntoIter<T, S, P, A, St>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T: 'a, St: Storage> {
    inner: hash_table::Iter<'a, SetNode<T, St>>,
}

impl<T, St: Storage> Clone for Iter<'_, T, St> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T, St: Storage> Iterator for Iter<'a, T, St> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, St: Storage> ExactSizeIterator for Iter<'_, T, St> {}
impl<T, St: Storage> FusedIterator for Iter<'_, T, St> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T, S, P, A: Allocator, St: Storage> {
    inner: hash_table::Drain<'a, SetNode<T, St>, S, P, A>,
}

impl<T, S, P, A: Allocator, St: Storage> Iterator for Drain<'_, T, S, P, A, St> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, S, P, A: Allocator, St: Storage> ExactSizeIterator for Drain<'_, T, S, P, A, St> {}
impl<T, S, P, A: Allocator, St: Storage> FusedIterator for Drain<'_, T, S, P, A, St> {}

/// An owning iterator over the values of a `HashSet`.
pub struct IntoIter<T, S, P, A: Allocator, St: Storage> {
    inner: hash_table::IntoIter<SetNode<T, St>, S, P, A>,
}

impl<T, S, P, A: Allocator, St: Storage> Iterator for IntoIter<T, S, P, A, St> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, S, P, A: Allocator, St: Storage> ExactSizeIterator for IntoIter<T, S, P, A, St> {}
impl<T, S, P, A: Allocator, St: Storage> FusedIterator for IntoIter<T, S, P, A, St> {}

/// An iterator over the values in `self` but not in `other`.
pub struct Difference<'a, T, S, P, A: Allocator, St: Storage> {
    iter: Iter<'a, T, St>,
    other: &'a HashSet<T, S, P, A, St>,
}

impl<'a, T, S, P, A, St> Iterator for Difference<'a, T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let other = self.other;
        self.iter.find(|v| !other.contains(*v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.iter.size_hint().1)
    }
}

/// An iterator over the values in both sets.
pub struct Intersection<'a, T, S, P, A: Allocator, St: Storage> {
    iter: Iter<'a, T, St>,
    other: &'a HashSet<T, S, P, A, St>,
}

impl<'a, T, S, P, A, St> Iterator for Intersection<'a, T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let other = self.other;
        self.iter.find(|v| other.contains(*v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.iter.size_hint().1)
    }
}

/// An iterator over the values in either set, without duplicates.
pub struct Union<'a, T, S, P, A: Allocator, St: Storage> {
    inner: Chain<Iter<'a, T, St>, Difference<'a, T, S, P, A, St>>,
}

impl<'a, T, S, P, A, St> Iterator for Union<'a, T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next()
    }
}

/// An iterator over the values in exactly one of two sets.
pub struct SymmetricDifference<'a, T, S, P, A: Allocator, St: Storage> {
    inner: Chain<Difference<'a, T, S, P, A, St>, Difference<'a, T, S, P, A, St>>,
}

impl<'a, T, S, P, A, St> Iterator for SymmetricDifference<'a, T, S, P, A, St>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
    St: Storage,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::hash::BuildHasher;
    use std::panic::AssertUnwindSafe;
    use std::panic::catch_unwind;
    use std::rc::Rc;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::growth_policy::Modulo;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type Set<T> = HashSet<T, SipHashBuilder>;

    fn set_of<T: Hash + Eq>(values: impl IntoIterator<Item = T>) -> Set<T> {
        values.into_iter().collect()
    }

    #[test]
    fn test_new_and_with_hasher() {
        let set: Set<i32> = HashSet::default();
        assert!(set.is_empty());
        assert_eq!(set.capacity(), 0);

        let set: HashSet<i32, _> = HashSet::with_hasher(SipHashBuilder::default());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_with_capacity() {
        let set: HashSet<i32, _> =
            HashSet::with_capacity_and_hasher(100, SipHashBuilder::default());
        assert!(set.capacity() >= 100);
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        assert!(set.insert(1));
        assert!(set.insert(2));
        assert!(!set.insert(1));

        assert!(set.contains(&1));
        assert!(set.contains(&2));
        assert!(!set.contains(&3));
        assert_eq!(set.len(), 2);
        assert_eq!(set.count(&1), 1);
        assert_eq!(set.count(&3), 0);
    }

    #[test]
    fn test_insert_keeps_the_stored_value() {
        // Equal by key only, so the surviving payload is observable.
        #[derive(Debug)]
        struct Tagged(u32, &'static str);
        impl PartialEq for Tagged {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }
        impl Eq for Tagged {}
        impl Hash for Tagged {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        assert!(set.insert(Tagged(1, "first")));
        assert!(!set.insert(Tagged(1, "second")));
        assert_eq!(set.get(&Tagged(1, "")).unwrap().1, "first");

        let (stored, inserted) = set.emplace(Tagged(1, "third"));
        assert!(!inserted);
        assert_eq!(stored.1, "first");

        assert_eq!(set.replace(Tagged(1, "fourth")).unwrap().1, "first");
        assert_eq!(set.get(&Tagged(1, "")).unwrap().1, "fourth");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut set = set_of([1, 2]);

        assert!(set.remove(&1));
        assert!(!set.remove(&1));
        assert_eq!(set.len(), 1);
        assert!(!set.contains(&1));
        assert!(set.contains(&2));
    }

    #[test]
    fn test_take() {
        let mut set = set_of(["hello".to_string()]);
        assert_eq!(set.take("hello"), Some("hello".to_string()));
        assert_eq!(set.take("hello"), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_get_and_get_or_insert() {
        let mut set: Set<String> = HashSet::default();
        assert_eq!(set.get("a"), None);

        assert_eq!(set.get_or_insert("a".to_string()), "a");
        assert_eq!(set.get_or_insert_with("b", |s| s.to_string()), "b");
        assert_eq!(set.get_or_insert_with("b", |_| unreachable!()), "b");
        assert_eq!(set.len(), 2);
        assert!(set.contains("b"));
        set.table.assert_invariants();
    }

    #[test]
    #[should_panic(expected = "not equivalent")]
    fn test_get_or_insert_with_rejects_a_different_value() {
        let mut set: Set<String> = HashSet::default();
        set.get_or_insert_with("b", |s| s.to_uppercase());
    }

    #[test]
    fn test_rejected_value_leaves_set_intact() {
        let mut set: Set<String> = HashSet::default();
        set.insert("a".to_string());

        let result = catch_unwind(AssertUnwindSafe(|| {
            set.get_or_insert_with("b", |s| s.to_uppercase());
        }));
        assert!(result.is_err());

        assert_eq!(set.len(), 1);
        assert!(set.contains("a"));
        assert!(!set.contains("B"));
        set.table.assert_invariants();
    }

    #[test]
    fn test_clear() {
        let mut set = set_of(0..10);
        let capacity = set.capacity();
        set.clear();

        assert!(set.is_empty());
        assert_eq!(set.capacity(), capacity);
        assert!(!set.contains(&1));
    }

    #[test]
    fn test_reserve() {
        let mut set: Set<i32> = HashSet::default();
        set.reserve(100);
        assert!(set.capacity() as f32 * set.max_load_factor() >= 100.0);
        assert!(set.try_reserve(usize::MAX).is_err());
    }

    #[test]
    fn test_iter_and_into_iter() {
        let set = set_of([1, 2, 3]);
        assert_eq!(set.iter().len(), 3);

        let mut borrowed: Vec<i32> = (&set).into_iter().copied().collect();
        borrowed.sort_unstable();
        assert_eq!(borrowed, [1, 2, 3]);

        let mut owned: Vec<i32> = set.into_iter().collect();
        owned.sort_unstable();
        assert_eq!(owned, [1, 2, 3]);
    }

    #[test]
    fn test_drain() {
        let mut set = set_of(0..100);
        let mut drained: Vec<i32> = set.drain().collect();
        drained.sort_unstable();

        assert_eq!(drained, (0..100).collect::<Vec<_>>());
        assert!(set.is_empty());
        set.table.assert_invariants();
    }

    #[test]
    fn test_power_of_two_growth() {
        let mut set: Set<u32> = HashSet::default();
        for i in 0..1000 {
            assert!(set.insert(i));
        }

        assert_eq!(set.len(), 1000);
        assert!(set.capacity().is_power_of_two());
        assert!(set.capacity() as f32 >= 1000.0 / 0.875);
        for i in 0..1000 {
            assert!(set.contains(&i));
        }
        assert!(!set.contains(&1000));
        set.table.assert_invariants();
    }

    #[test]
    fn test_modulo_policy() {
        let mut set: HashSet<u32, SipHashBuilder, Modulo> =
            HashSet::with_capacity_policy_and_hasher_in(
                10,
                SipHashBuilder::default(),
                Modulo,
                Global,
            );
        for i in 0..500 {
            set.insert(i);
        }
        assert_eq!(set.len(), 500);
        assert!(set.load_factor() <= set.max_load_factor());
        set.table.assert_invariants();
    }

    #[test]
    fn test_insert_remove_cycle() {
        let mut set: Set<u32> = HashSet::default();
        for round in 0..10 {
            for i in 0..100 {
                assert!(set.insert(i + round));
            }
            for i in 0..100 {
                assert!(set.remove(&(i + round)));
            }
            assert!(set.is_empty());
        }
        set.table.assert_invariants();
    }

    #[test]
    fn test_retain() {
        let mut set = set_of(0..100);
        set.retain(|v| v % 10 == 0);
        assert_eq!(set.len(), 10);
        assert!(set.contains(&90));
        assert!(!set.contains(&91));
        set.table.assert_invariants();
    }

    #[test]
    fn test_insert_many() {
        let mut set = set_of([1, 2]);
        assert_eq!(set.insert_many([2, 3, 4, 4]), 2);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_extend() {
        let mut set = set_of([1]);
        set.extend([1, 2]);
        set.extend(&[3, 4]);
        assert_eq!(set.len(), 4);
    }

    #[cfg(any(feature = "foldhash", feature = "std"))]
    #[test]
    fn test_from_array() {
        let set = HashSet::from([3, 1, 3, 2]);
        assert_eq!(set.len(), 3);
        assert!(set.contains(&1));

        let node: NodeHashSet<i32> = [1, 2].into_iter().collect();
        assert_eq!(node.len(), 2);
    }

    #[test]
    fn test_equality_and_clone() {
        let a = set_of(0..50);
        let mut b: Set<i32> = HashSet::default();
        b.reserve(1000);
        b.extend((0..50).rev());
        assert_eq!(a, b);

        let c = a.clone();
        b.remove(&7);
        assert_ne!(c, b);
        assert_eq!(c, a);
    }

    #[test]
    fn test_shrink_to_fit() {
        let mut set = set_of(0..1000);
        for i in 10..1000 {
            set.remove(&i);
        }
        set.shrink_to_fit();
        assert!(set.capacity() < 64);
        for i in 0..10 {
            assert!(set.contains(&i));
        }
    }

    #[test]
    fn test_is_disjoint() {
        let a = set_of([1, 2]);
        let b = set_of([3, 4]);
        let c = set_of([2, 3]);
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));
        assert!(a.is_disjoint(&HashSet::default()));
    }

    #[test]
    fn test_is_subset_and_superset() {
        let a = set_of([1, 2]);
        let b = set_of([1, 2, 3]);
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(b.is_superset(&a));
        assert!(a.is_superset(&HashSet::default()));
    }

    #[test]
    fn test_set_operations() {
        let a = set_of([1, 2, 3]);
        let b = set_of([2, 3, 4]);

        fn sorted<'a>(iter: impl Iterator<Item = &'a i32>) -> Vec<i32> {
            let mut values: Vec<i32> = iter.copied().collect();
            values.sort_unstable();
            values
        }

        assert_eq!(sorted(a.union(&b)), [1, 2, 3, 4]);
        assert_eq!(sorted(a.intersection(&b)), [2, 3]);
        assert_eq!(sorted(a.difference(&b)), [1]);
        assert_eq!(sorted(a.symmetric_difference(&b)), [1, 4]);
    }

    #[test]
    fn test_node_set_drops_each_value_once() {
        struct DropCounter(u32, Rc<Cell<usize>>);
        impl PartialEq for DropCounter {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }
        impl Eq for DropCounter {}
        impl Hash for DropCounter {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }
        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.1.set(self.1.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let mut set: NodeHashSet<DropCounter, SipHashBuilder> = HashSet::default();
        for i in 0..200 {
            set.insert(DropCounter(i, drops.clone()));
        }
        set.insert(DropCounter(0, drops.clone()));
        assert_eq!(drops.get(), 1);

        set.retain(|v| v.0 < 100);
        assert_eq!(drops.get(), 101);
        drop(set);
        assert_eq!(drops.get(), 201);
    }

    #[test]
    fn test_debug_format() {
        let set = set_of([7]);
        assert_eq!(format!("{set:?}"), "{7}");
    }
}
