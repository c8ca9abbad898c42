//! The Robin Hood table engine shared by every map and set in this crate.
//!
//! Entries live in one flat slot array with a metadata byte per slot (see
//! [`crate::metadata`]). Lookups compare a single 16-byte metadata group at the
//! key's desired index, insertions displace entries that are closer to home
//! than the incoming one, and removals shift the following run back by one
//! slot instead of leaving tombstones.
//!
//! The table is generic over its [`NodeTraits`], which decide what a slot holds
//! and how keys are extracted, over the hasher `S`, the [`GrowthPolicy`] `P`
//! and the [`Allocator`] `A`. All of them are resolved at compile time.

use core::alloc::Layout;
use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use allocator_api2::alloc::Allocator;
use allocator_api2::alloc::Global;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::growth_policy::GrowthPolicy;
use crate::growth_policy::PowerOfTwo;
use crate::metadata;
use crate::metadata::EMPTY;
use crate::metadata::GROUP_WIDTH;
use crate::metadata::Group;
use crate::metadata::MAX_OFFSET;
use crate::metadata::SENTINEL;
use crate::node::NodeTraits;

/// Load factor used until [`HashTable::set_max_load_factor`] is called.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.875;

/// Spreads hash entropy over all 64 bits.
///
/// Applied to every hash before it reaches the growth policy, so weak hashers
/// (identity hashes of integers, for instance) still spread over the low bits
/// used by [`PowerOfTwo`] and the high bits used for the metadata fragment.
#[inline(always)]
fn mix(hash: u64) -> u64 {
    const MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;
    let full = (hash as u128).wrapping_mul(MULTIPLIER as u128);
    (full as u64) ^ ((full >> 64) as u64)
}

#[inline(always)]
fn max_len_for(capacity: usize, max_load_factor: f32) -> usize {
    ((capacity as f64 * max_load_factor as f64) as usize).min(capacity)
}

/// Smallest slot count whose load threshold admits `len` entries.
fn slots_for_len(len: usize, max_load_factor: f32) -> Option<usize> {
    if len == 0 {
        return Some(0);
    }
    let mut slots = (len as f64 / max_load_factor as f64) as usize;
    while max_len_for(slots, max_load_factor) < len {
        slots = slots.checked_add(1)?;
    }
    Some(slots)
}

/// Layout of the single allocation backing a table: `slot_count` nodes
/// followed by `slot_count + GROUP_WIDTH` metadata bytes.
#[derive(Clone, Copy, Debug)]
struct DataLayout {
    layout: Layout,
    metadata_offset: usize,
}

impl DataLayout {
    fn new<T>(slot_count: usize) -> Option<Self> {
        let nodes = Layout::array::<T>(slot_count).ok()?;
        let metadata = Layout::array::<u8>(slot_count.checked_add(GROUP_WIDTH)?).ok()?;
        let (layout, metadata_offset) = nodes.extend(metadata).ok()?;

        Some(DataLayout {
            layout: layout.pad_to_align(),
            metadata_offset,
        })
    }
}

/// Where a new entry goes inside the window of its desired index.
#[derive(Clone, Copy, Debug)]
struct Vacancy {
    /// Lane the new entry takes.
    steal: usize,
    /// First empty lane; entries in `steal..empty` move forward by one.
    empty: usize,
}

/// The raw slot arrays. Knows nothing about hashing or item ownership; the
/// table drops and frees through it explicitly.
///
/// Desired indices range over `0..capacity`. The arrays carry [`MAX_OFFSET`]
/// extra overflow slots so the window of the last desired index is complete,
/// followed by the sentinel metadata bytes.
struct Slots<T> {
    nodes: NonNull<T>,
    metadata: NonNull<u8>,
    layout: Layout,
    capacity: usize,
    slot_count: usize,
}

impl<T> Slots<T> {
    const fn empty() -> Self {
        Slots {
            nodes: NonNull::dangling(),
            metadata: NonNull::dangling(),
            layout: Layout::new::<()>(),
            capacity: 0,
            slot_count: 0,
        }
    }

    fn allocate<A: Allocator>(capacity: usize, alloc: &A) -> Result<Self, TryReserveError> {
        debug_assert!(capacity > 0);
        let slot_count = capacity
            .checked_add(MAX_OFFSET)
            .ok_or(TryReserveError::CapacityOverflow)?;
        let data = DataLayout::new::<T>(slot_count).ok_or(TryReserveError::CapacityOverflow)?;
        let block = alloc
            .allocate(data.layout)
            .map_err(|_| TryReserveError::AllocError {
                layout: data.layout,
            })?
            .cast::<u8>();

        // SAFETY: The block spans `data.layout`, which holds the node array and
        // `slot_count + GROUP_WIDTH` metadata bytes starting at `metadata_offset`.
        unsafe {
            let metadata = block.add(data.metadata_offset);
            metadata.as_ptr().write_bytes(EMPTY, slot_count);
            metadata
                .as_ptr()
                .add(slot_count)
                .write_bytes(SENTINEL, GROUP_WIDTH);

            Ok(Slots {
                nodes: block.cast(),
                metadata,
                layout: data.layout,
                capacity,
                slot_count,
            })
        }
    }

    /// Releases the allocation without touching any node.
    ///
    /// # Safety
    ///
    /// `alloc` must be the allocator the slots were allocated with, and every
    /// node must already be dropped or moved out.
    unsafe fn free<A: Allocator>(&mut self, alloc: &A) {
        if self.capacity != 0 {
            // SAFETY: The block was allocated by `alloc` with `self.layout`.
            unsafe { alloc.deallocate(self.nodes.cast(), self.layout) };
        }
        *self = Slots::empty();
    }

    /// # Safety
    ///
    /// `index` must be below `slot_count + GROUP_WIDTH`.
    #[inline(always)]
    unsafe fn meta(&self, index: usize) -> u8 {
        // SAFETY: Caller keeps `index` inside the metadata array.
        unsafe { *self.metadata.as_ptr().add(index) }
    }

    /// # Safety
    ///
    /// `index` must be below `slot_count`.
    #[inline(always)]
    unsafe fn set_meta(&mut self, index: usize, meta: u8) {
        debug_assert!(index < self.slot_count);
        // SAFETY: Caller keeps `index` inside the logical metadata array.
        unsafe { *self.metadata.as_ptr().add(index) = meta };
    }

    /// # Safety
    ///
    /// `index` must be below `slot_count`.
    #[inline(always)]
    unsafe fn node(&self, index: usize) -> *mut T {
        debug_assert!(index < self.slot_count);
        // SAFETY: Caller keeps `index` inside the node array.
        unsafe { self.nodes.as_ptr().add(index) }
    }

    #[inline(always)]
    fn is_occupied(&self, index: usize) -> bool {
        debug_assert!(index < self.slot_count);
        // SAFETY: Checked against the slot count above.
        metadata::is_occupied(unsafe { self.meta(index) })
    }

    /// Searches the window of `home` for a node accepted by `eq`.
    ///
    /// # Safety
    ///
    /// `home` must be below `capacity`.
    #[inline]
    unsafe fn search(&self, home: usize, fragment: u8, mut eq: impl FnMut(&T) -> bool) -> Option<usize> {
        // SAFETY: The overflow slots and sentinels guarantee GROUP_WIDTH
        // readable bytes at any index below the capacity.
        let group = unsafe { Group::load(self.metadata.as_ptr().add(home)) };

        // Nothing homed at `home` lies past the first hole.
        let limit = group.match_empty().lowest_set_bit().unwrap_or(GROUP_WIDTH);
        for lane in group.match_probe(fragment).below(limit) {
            // SAFETY: A probe match is occupied and not a sentinel, so the slot
            // is a live node inside the array.
            if eq(unsafe { &*self.node(home + lane) }) {
                return Some(home + lane);
            }
        }

        None
    }

    /// Finds where an entry homed at `home` would go, or `None` when the window
    /// is full or a displaced neighbor would fall out of its own window.
    ///
    /// # Safety
    ///
    /// `home` must be below `capacity`.
    #[inline]
    unsafe fn vacancy(&self, home: usize) -> Option<Vacancy> {
        // SAFETY: See `search`.
        let group = unsafe { Group::load(self.metadata.as_ptr().add(home)) };
        let empty = group.match_empty().lowest_set_bit()?;

        // Every lane before `empty` is a real occupied slot.
        let mut steal = empty;
        for lane in 0..empty {
            // SAFETY: `home + lane` precedes an empty slot inside the array.
            if metadata::offset(unsafe { self.meta(home + lane) }) < lane {
                steal = lane;
                break;
            }
        }

        for lane in steal..empty {
            // SAFETY: As above.
            if metadata::offset(unsafe { self.meta(home + lane) }) == MAX_OFFSET {
                return None;
            }
        }

        Some(Vacancy { steal, empty })
    }

    /// Writes `node` into a vacancy, moving the displaced run forward.
    ///
    /// # Safety
    ///
    /// `vacancy` must come from `vacancy(home)` with no mutation in between.
    #[inline]
    unsafe fn place(&mut self, home: usize, fragment: u8, vacancy: Vacancy, node: T) -> usize {
        let at = home + vacancy.steal;
        let run = vacancy.empty - vacancy.steal;

        // SAFETY: Slots `at..at + run` are occupied and `at + run` is empty,
        // all inside the array per the vacancy contract.
        unsafe {
            if run > 0 {
                core::ptr::copy(self.node(at), self.node(at + 1), run);
                for index in (at..at + run).rev() {
                    let moved = metadata::pushed(self.meta(index));
                    self.set_meta(index + 1, moved);
                }
            }

            self.node(at).write(node);
            self.set_meta(at, metadata::encode(fragment, vacancy.steal));
        }

        at
    }

    /// Moves the node at `index` out and closes the gap with a backward shift.
    ///
    /// # Safety
    ///
    /// `index` must be an occupied slot below `capacity`.
    unsafe fn take(&mut self, index: usize) -> T {
        debug_assert!(self.is_occupied(index));

        // SAFETY: `index` holds a live node. The scan stops at the latest on
        // the first sentinel (offset 0), so every index touched is either a
        // live slot or the first sentinel, which is only read.
        unsafe {
            let node = self.node(index).read();

            let mut end = index + 1;
            loop {
                let meta = self.meta(end);
                if !metadata::is_occupied(meta) || metadata::offset(meta) == 0 {
                    break;
                }
                end += 1;
            }

            let run = end - index - 1;
            if run > 0 {
                core::ptr::copy(self.node(index + 1), self.node(index), run);
                for slot in index..index + run {
                    let moved = metadata::pulled(self.meta(slot + 1));
                    self.set_meta(slot, moved);
                }
            }
            self.set_meta(end - 1, EMPTY);

            node
        }
    }

    /// Raw iteration over the occupied slots.
    fn raw_iter(&self, len: usize) -> RawIter<T> {
        RawIter {
            nodes: self.nodes.as_ptr(),
            metadata: self.metadata.as_ptr(),
            // SAFETY: The first sentinel, still inside the allocation (or the
            // dangling pointer itself for an unallocated table).
            end: unsafe { self.metadata.as_ptr().add(self.slot_count) },
            remaining: len,
        }
    }
}

/// An open-addressing hash table using Robin Hood displacement.
///
/// `HashTable` owns its hasher, growth policy and allocator. The map and set
/// types of this crate are thin layers over it; it can also be used directly
/// with custom [`NodeTraits`].
///
/// ## Memory
///
/// One allocation per table holding the slot array and one metadata byte per
/// slot, plus 16 sentinel bytes. [`Boxed`](crate::node::Boxed) storage adds one
/// allocation per entry in exchange for address stability.
///
/// ## Example
///
/// ```rust
/// use robin_shift::hash_table::HashTable;
/// use robin_shift::node::Inline;
/// use robin_shift::node::SetNode;
///
/// let mut table: HashTable<SetNode<&str, Inline>> = HashTable::new();
/// let (_, inserted) = table.emplace("alpha");
/// assert!(inserted);
/// let (_, inserted) = table.emplace("alpha");
/// assert!(!inserted);
///
/// assert_eq!(table.find("alpha"), Some(&"alpha"));
/// assert_eq!(table.remove("alpha"), Some("alpha"));
/// assert!(table.is_empty());
/// ```
pub struct HashTable<N: NodeTraits, S = DefaultHashBuilder, P = PowerOfTwo, A: Allocator = Global> {
    slots: Slots<N::Node>,
    len: usize,
    max_load_factor: f32,
    rehash_pending: bool,

    hash_builder: S,
    policy: P,
    alloc: A,

    _marker: PhantomData<N::Node>,
}

// SAFETY: The table uniquely owns its nodes (including `Boxed` pointees), so it
// is as thread-safe as the items and policy objects it holds.
unsafe impl<N, S, P, A> Send for HashTable<N, S, P, A>
where
    N: NodeTraits,
    N::Item: Send,
    S: Send,
    P: Send,
    A: Allocator + Send,
{
}

// SAFETY: Shared access only hands out shared references to items.
unsafe impl<N, S, P, A> Sync for HashTable<N, S, P, A>
where
    N: NodeTraits,
    N::Item: Sync,
    S: Sync,
    P: Sync,
    A: Allocator + Sync,
{
}

impl<N: NodeTraits, S, P, A: Allocator> Debug for HashTable<N, S, P, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::ToString;
        use alloc::vec::Vec;

        let groups = (0..self.slots.slot_count)
            .collect::<Vec<_>>()
            .chunks(GROUP_WIDTH)
            .map(|group| {
                group
                    .iter()
                    .map(|&index| {
                        // SAFETY: `index` is below the slot count.
                        let meta = unsafe { self.slots.meta(index) };
                        if metadata::is_occupied(meta) {
                            format!("+{:02}", metadata::offset(meta))
                        } else {
                            "...".to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>();

        f.debug_struct("HashTable")
            .field("len", &self.len)
            .field("capacity", &self.slots.capacity)
            .field("max_load_factor", &self.max_load_factor)
            .field("rehash_pending", &self.rehash_pending)
            .field("metadata", &groups)
            .finish()
    }
}

impl<N, S, P, A> Clone for HashTable<N, S, P, A>
where
    N: NodeTraits,
    N::Item: Clone,
    S: Clone,
    P: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        let mut new_table = Self {
            slots: Slots::empty(),
            len: 0,
            max_load_factor: self.max_load_factor,
            rehash_pending: self.rehash_pending,
            hash_builder: self.hash_builder.clone(),
            policy: self.policy.clone(),
            alloc: self.alloc.clone(),
            _marker: PhantomData,
        };
        if self.slots.capacity == 0 {
            return new_table;
        }

        new_table.slots = Slots::allocate(self.slots.capacity, &new_table.alloc)
            .unwrap_or_else(|err| err.handle());

        // Same capacity and policy, so every entry keeps its slot. Metadata is
        // written only once the node exists so a panicking `clone` leaves a
        // table that drops exactly what was built.
        for index in 0..self.slots.slot_count {
            // SAFETY: `index` is below both slot counts; occupied source slots
            // hold live nodes and the destination slot is empty.
            unsafe {
                let meta = self.slots.meta(index);
                if !metadata::is_occupied(meta) {
                    continue;
                }
                let item = N::item(&*self.slots.node(index)).clone();
                let node = N::create(item, &new_table.alloc);
                new_table.slots.node(index).write(node);
                new_table.slots.set_meta(index, meta);
                new_table.len += 1;
            }
        }

        debug_assert_eq!(new_table.len, self.len);
        new_table
    }
}

impl<N: NodeTraits, S, P, A: Allocator> Drop for HashTable<N, S, P, A> {
    fn drop(&mut self) {
        self.destroy_all();
        // SAFETY: The slots came from `self.alloc` and no live node is left.
        unsafe { self.slots.free(&self.alloc) };
    }
}

impl<N, S, P> HashTable<N, S, P, Global>
where
    N: NodeTraits,
    S: Default,
    P: Default,
{
    /// Creates an empty table. No memory is allocated until the first insert.
    pub fn new() -> Self {
        Self::with_policy_and_hasher_in(S::default(), P::default(), Global)
    }
}

impl<N, S, P> HashTable<N, S, P, Global>
where
    N: NodeTraits,
    N::Key: Hash,
    S: BuildHasher + Default,
    P: GrowthPolicy + Default,
{
    /// Creates a table whose load threshold admits at least `capacity`
    /// entries.
    ///
    /// Growth can still happen earlier when keys crowd a single probe window.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_shift::hash_table::HashTable;
    /// use robin_shift::node::Inline;
    /// use robin_shift::node::SetNode;
    ///
    /// let table: HashTable<SetNode<u64, Inline>> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_policy_and_hasher_in(capacity, S::default(), P::default(), Global)
    }
}

impl<N, S, P, A> Default for HashTable<N, S, P, A>
where
    N: NodeTraits,
    S: Default,
    P: Default,
    A: Allocator + Default,
{
    fn default() -> Self {
        Self::with_policy_and_hasher_in(S::default(), P::default(), A::default())
    }
}

impl<N: NodeTraits, S, P, A: Allocator> HashTable<N, S, P, A> {
    /// Creates an empty table from its policy objects.
    pub fn with_policy_and_hasher_in(hash_builder: S, policy: P, alloc: A) -> Self {
        Self {
            slots: Slots::empty(),
            len: 0,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            rehash_pending: false,
            hash_builder,
            policy,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots.
    ///
    /// The table grows once `len` would exceed
    /// `capacity * max_load_factor`.
    pub fn capacity(&self) -> usize {
        self.slots.capacity
    }

    /// Returns the current ratio of entries to slots.
    pub fn load_factor(&self) -> f32 {
        if self.slots.capacity == 0 {
            0.0
        } else {
            self.len as f32 / self.slots.capacity as f32
        }
    }

    /// Returns the load factor above which the table grows.
    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Sets the load factor above which the table grows.
    ///
    /// The new threshold only applies to future growth decisions; the table is
    /// not resized by this call, even if it is currently above the threshold.
    ///
    /// # Panics
    ///
    /// Panics unless `0.0 < max_load_factor <= 1.0`.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        assert!(
            max_load_factor > 0.0 && max_load_factor <= 1.0,
            "max load factor must be in (0, 1], got {max_load_factor}"
        );
        self.max_load_factor = max_load_factor;
    }

    /// Returns a reference to the table's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns a reference to the table's growth policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Returns a reference to the table's allocator.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Swaps the contents and policy objects of two tables.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Returns an iterator over all items in an unspecified order.
    pub fn iter(&self) -> Iter<'_, N> {
        Iter {
            raw: self.slots.raw_iter(self.len),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over mutable references to all items.
    ///
    /// Mutating the key part of an item such that its hash or equality changes
    /// leaves the table unable to find it.
    pub fn iter_mut(&mut self) -> IterMut<'_, N> {
        IterMut {
            raw: self.slots.raw_iter(self.len),
            _marker: PhantomData,
        }
    }

    /// Removes all items, yielding them by value. The capacity is kept.
    pub fn drain(&mut self) -> Drain<'_, N, S, P, A> {
        Drain {
            table: self,
            index: 0,
        }
    }

    /// Removes all items, keeping the allocation.
    pub fn clear(&mut self) {
        self.destroy_all();
        self.rehash_pending = false;
    }

    /// Keeps only the items for which `keep` returns `true`.
    ///
    /// Removed items are dropped in slot order. The capacity is kept.
    pub fn retain(&mut self, mut keep: impl FnMut(&mut N::Item) -> bool) {
        let mut index = 0;
        while index < self.slots.slot_count {
            if self.slots.is_occupied(index) {
                // SAFETY: The slot is occupied.
                let item = N::item_mut(unsafe { &mut *self.slots.node(index) });
                if !keep(item) {
                    // The backward shift refills `index` with an unvisited
                    // entry, so it is examined again.
                    // SAFETY: The slot is occupied and the node came from
                    // `self.alloc`.
                    unsafe {
                        let node = self.slots.take(index);
                        self.len -= 1;
                        N::destroy(node, &self.alloc);
                    }
                    continue;
                }
            }
            index += 1;
        }
    }

    /// Removes the occupied slot at `index` and returns its item.
    pub(crate) fn remove_at(&mut self, index: usize) -> N::Item {
        assert!(
            index < self.slots.slot_count && self.slots.is_occupied(index),
            "slot {index} is not an occupied slot of this table"
        );
        // SAFETY: Checked above; the node came from `self.alloc`.
        unsafe {
            let node = self.slots.take(index);
            self.len -= 1;
            N::into_item(node, &self.alloc)
        }
    }

    pub(crate) fn item_at(&self, index: usize) -> &N::Item {
        debug_assert!(self.slots.is_occupied(index));
        // SAFETY: Callers only pass indices returned by a successful search
        // with no mutation since.
        N::item(unsafe { &*self.slots.node(index) })
    }

    pub(crate) fn item_at_mut(&mut self, index: usize) -> &mut N::Item {
        debug_assert!(self.slots.is_occupied(index));
        // SAFETY: As in `item_at`.
        N::item_mut(unsafe { &mut *self.slots.node(index) })
    }

    /// Destroys every live node and marks all slots empty, keeping the
    /// allocation.
    fn destroy_all(&mut self) {
        if self.slots.capacity == 0 {
            return;
        }

        if self.len > 0 {
            for index in 0..self.slots.slot_count {
                if self.slots.is_occupied(index) {
                    // SAFETY: Occupied slots hold live nodes from `self.alloc`.
                    // Metadata is cleared first so a panicking destructor
                    // cannot lead to a double drop.
                    unsafe {
                        self.slots.set_meta(index, EMPTY);
                        self.len -= 1;
                        N::destroy(self.slots.node(index).read(), &self.alloc);
                    }
                }
            }
        }

        debug_assert_eq!(self.len, 0);
    }

    #[inline(always)]
    fn max_len(&self) -> usize {
        max_len_for(self.slots.capacity, self.max_load_factor)
    }
}

impl<N, S, P, A> HashTable<N, S, P, A>
where
    N: NodeTraits,
    N::Key: Hash,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
{
    /// Creates a table whose load threshold admits at least `capacity`
    /// entries.
    pub fn with_capacity_policy_and_hasher_in(
        capacity: usize,
        hash_builder: S,
        policy: P,
        alloc: A,
    ) -> Self {
        let mut table = Self::with_policy_and_hasher_in(hash_builder, policy, alloc);
        if capacity > 0 {
            table.reserve(capacity);
        }
        table
    }

    #[inline(always)]
    fn hash_of<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        mix(self.hash_builder.hash_one(key))
    }

    #[inline]
    fn find_index<Q>(&self, hash: u64, key: &Q) -> Option<usize>
    where
        N::Key: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if self.len == 0 {
            return None;
        }

        let home = self.policy.index(hash, self.slots.capacity);
        // SAFETY: The policy maps into `[0, capacity)`.
        unsafe {
            self.slots
                .search(home, metadata::fragment(hash), |node| N::key(node).borrow() == key)
        }
    }

    /// Returns a reference to the item with the given key.
    ///
    /// The key may be any borrowed form of the table's key type (for instance
    /// `&str` for `String` keys), as long as `Hash` and `Eq` on the borrowed
    /// form match those of the key type.
    #[inline]
    pub fn find<Q>(&self, key: &Q) -> Option<&N::Item>
    where
        N::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(self.hash_of(key), key)?;
        Some(self.item_at(index))
    }

    /// Returns a mutable reference to the item with the given key.
    #[inline]
    pub fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut N::Item>
    where
        N::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(self.hash_of(key), key)?;
        Some(self.item_at_mut(index))
    }

    /// Returns `true` if an item with the given key exists.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        N::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_index(self.hash_of(key), key).is_some()
    }

    /// Removes the item with the given key and returns it.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<N::Item>
    where
        N::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(self.hash_of(key), key)?;
        Some(self.remove_at(index))
    }

    /// Gets the entry for the given key.
    ///
    /// A vacant entry has already secured a slot, so the table may grow during
    /// this call even if the entry is never filled.
    pub fn entry<Q>(&mut self, key: &Q) -> Entry<'_, N, S, P, A>
    where
        N::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        match self.find_index(hash, key) {
            Some(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            None => {
                let (home, vacancy) = self.prepare_insert(hash);
                Entry::Vacant(VacantEntry {
                    table: self,
                    hash,
                    home,
                    vacancy,
                })
            }
        }
    }

    /// Inserts `item` unless an item with an equal key exists.
    ///
    /// Returns the stored item and whether `item` was inserted. An existing
    /// item is never overwritten; the rejected candidate is dropped.
    ///
    /// The node for `item` is built before the table is touched, so a failure
    /// while building it (an allocation failure for boxed storage) leaves the
    /// table unchanged.
    pub fn emplace(&mut self, item: N::Item) -> (&mut N::Item, bool)
    where
        N::Key: Hash + Eq,
    {
        let node = N::create(item, &self.alloc);
        let hash = self.hash_of(N::key(&node));

        if let Some(index) = self.find_index(hash, N::key(&node)) {
            // SAFETY: The candidate was created with `self.alloc` just above.
            unsafe { N::destroy(node, &self.alloc) };
            return (self.item_at_mut(index), false);
        }

        let (home, vacancy) = self.prepare_insert(hash);
        // SAFETY: The vacancy was computed for `home` with no mutation since.
        let index = unsafe {
            self.slots
                .place(home, metadata::fragment(hash), vacancy, node)
        };
        self.len += 1;
        (self.item_at_mut(index), true)
    }

    /// Inserts the item built by `make` unless an item with key `key` exists.
    ///
    /// `make` only runs when the key is absent. If it panics the table holds
    /// the same items as before, although it may already have grown to make
    /// room.
    ///
    /// # Panics
    ///
    /// Panics if the key of the built item is not equal to `key`.
    pub fn try_emplace_with<Q>(
        &mut self,
        key: &Q,
        make: impl FnOnce() -> N::Item,
    ) -> (&mut N::Item, bool)
    where
        N::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entry(key) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => {
                let item = make();
                assert!(
                    N::key_of(&item).borrow() == key,
                    "new item is not equivalent to the lookup key"
                );
                (entry.insert_unchecked(item), true)
            }
        }
    }

    /// Raises the load threshold to admit at least `additional` more entries.
    ///
    /// This does not rule out growth: an insert whose 16-slot probe window is
    /// already full grows the table at any load.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows, and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocator fails.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            err.handle();
        }
    }

    /// Tries to raise the load threshold to admit `additional` more entries.
    ///
    /// On error the table is left untouched.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(TryReserveError::CapacityOverflow)?;
        if required <= self.max_len() {
            return Ok(());
        }

        let slots = slots_for_len(required, self.max_load_factor)
            .filter(|&slots| slots <= isize::MAX as usize)
            .ok_or(TryReserveError::CapacityOverflow)?;
        let capacity = self.policy.capacity_for(slots);
        self.resize(capacity, "reserve")
    }

    /// Reallocates to the policy's capacity for `max(count, len / max_load_factor)`
    /// slots. This can shrink the table.
    ///
    /// `rehash(0)` on an empty table releases its allocation.
    pub fn rehash(&mut self, count: usize) {
        let needed = slots_for_len(self.len, self.max_load_factor)
            .unwrap_or(usize::MAX)
            .max(count);

        if needed == 0 {
            // SAFETY: `needed == 0` implies the table is empty.
            unsafe { self.slots.free(&self.alloc) };
            self.rehash_pending = false;
            return;
        }

        let capacity = self.policy.capacity_for(needed);
        if capacity != self.slots.capacity {
            if let Err(err) = self.resize(capacity, "rehash") {
                err.handle();
            }
        }
    }

    /// Shrinks the table to the smallest capacity that holds its entries.
    pub fn shrink_to_fit(&mut self) {
        self.rehash(0);
    }

    /// Secures a slot for a new entry with the given hash, growing as needed.
    fn prepare_insert(&mut self, hash: u64) -> (usize, Vacancy) {
        loop {
            if self.rehash_pending || self.len >= self.max_len() {
                self.grow();
            }

            let home = self.policy.index(hash, self.slots.capacity);
            // SAFETY: The policy maps into `[0, capacity)` and the capacity is
            // non-zero after growth.
            match unsafe { self.slots.vacancy(home) } {
                Some(vacancy) => return (home, vacancy),
                None => {
                    // Acted on by the next pass through the loop, once nothing
                    // depends on the current slot positions.
                    crate::trace_event!(
                        capacity = self.slots.capacity,
                        len = self.len,
                        home,
                        "probe window saturated, rehash pending"
                    );
                    self.rehash_pending = true;
                }
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self) {
        let doubled = self.slots.capacity.checked_mul(2);
        let for_len = self
            .len
            .checked_add(1)
            .and_then(|len| slots_for_len(len, self.max_load_factor));
        let slots = match (doubled, for_len) {
            (Some(doubled), Some(for_len)) => doubled.max(for_len),
            _ => TryReserveError::CapacityOverflow.handle(),
        };

        let reason = if self.rehash_pending {
            "probe window saturated"
        } else {
            "load factor reached"
        };
        let capacity = self.policy.capacity_for(slots);
        if let Err(err) = self.resize(capacity, reason) {
            err.handle();
        }
    }

    /// Moves every entry into a fresh allocation of (at least) `capacity`
    /// slots. The old allocation is only touched once the new one is complete.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn resize(&mut self, capacity: usize, reason: &'static str) -> Result<(), TryReserveError> {
        let old_capacity = self.slots.capacity;
        let new_slots = self.relocate(capacity)?;

        let mut old_slots = core::mem::replace(&mut self.slots, new_slots);
        // SAFETY: Every node was moved bitwise into the new slots; the old
        // block is released without dropping anything.
        unsafe { old_slots.free(&self.alloc) };
        self.rehash_pending = false;

        crate::debug_event!(
            old_capacity,
            new_capacity = self.slots.capacity,
            len = self.len,
            reason,
            "resized hash table"
        );
        Ok(())
    }

    /// Builds a new slot array holding bitwise copies of every node.
    ///
    /// The current slots are left intact; if an entry does not fit, the
    /// attempt is discarded and retried with a larger capacity.
    fn relocate(&self, mut capacity: usize) -> Result<Slots<N::Node>, TryReserveError> {
        'attempt: loop {
            let mut new_slots = Slots::<N::Node>::allocate(capacity, &self.alloc)?;

            for index in 0..self.slots.slot_count {
                if !self.slots.is_occupied(index) {
                    continue;
                }

                // SAFETY: The slot is occupied, so the node is live.
                let node = unsafe { self.slots.node(index) };
                let hash = self.hash_of(N::key(unsafe { &*node }));
                let home = self.policy.index(hash, capacity);

                // SAFETY: `home` is below the new capacity.
                match unsafe { new_slots.vacancy(home) } {
                    Some(vacancy) => {
                        // SAFETY: The vacancy is fresh. The node is copied
                        // bitwise; ownership moves once the old slots are freed.
                        unsafe {
                            new_slots.place(home, metadata::fragment(hash), vacancy, node.read());
                        }
                    }
                    None => {
                        // SAFETY: The new slots only hold copies of nodes still
                        // owned by the old slots.
                        unsafe { new_slots.free(&self.alloc) };
                        let larger = capacity
                            .checked_mul(2)
                            .ok_or(TryReserveError::CapacityOverflow)?;
                        capacity = self.policy.capacity_for(larger);
                        continue 'attempt;
                    }
                }
            }

            return Ok(new_slots);
        }
    }
}

impl<N, S, P, A> HashTable<N, S, P, A>
where
    N: NodeTraits,
    A: Allocator,
{
    /// Returns the number of entries at each displacement from home.
    #[cfg(feature = "stats")]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut counts = [0usize; GROUP_WIDTH];
        for index in 0..self.slots.slot_count {
            // SAFETY: `index` is below the slot count.
            let meta = unsafe { self.slots.meta(index) };
            if metadata::is_occupied(meta) {
                counts[metadata::offset(meta)] += 1;
            }
        }
        ProbeHistogram { counts }
    }

    /// Returns memory and occupancy statistics.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> DebugStats {
        let total_bytes = if self.slots.capacity == 0 {
            0
        } else {
            self.slots.layout.size()
        };
        let item_bytes = if N::STABLE_ADDRESSES {
            self.len * core::mem::size_of::<N::Item>()
        } else {
            0
        };

        DebugStats {
            len: self.len,
            capacity: self.slots.capacity,
            max_len: self.max_len(),
            load_factor: self.load_factor() as f64,
            total_bytes,
            item_bytes,
            rehash_pending: self.rehash_pending,
        }
    }
}

/// Count of entries per displacement from their desired slot.
#[cfg(feature = "stats")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// `counts[d]` entries sit `d` slots past their desired slot.
    pub counts: [usize; GROUP_WIDTH],
}

#[cfg(feature = "stats")]
impl ProbeHistogram {
    /// Total number of entries counted.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Mean displacement over all entries.
    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: usize = self
            .counts
            .iter()
            .enumerate()
            .map(|(offset, count)| offset * count)
            .sum();
        weighted as f64 / total as f64
    }

    /// Pretty-print the histogram.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let total = self.total().max(1);
        println!("=== Displacement Histogram ===");
        for (offset, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let share = count as f64 / total as f64;
            let bar = "#".repeat((share * 50.0).ceil() as usize);
            println!("{offset:>2}: {count:>8} ({:>6.2}%) {bar}", share * 100.0);
        }
        println!("mean displacement: {:.3}", self.mean());
    }
}

/// Memory and occupancy statistics of a table.
#[cfg(feature = "stats")]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of entries.
    pub len: usize,
    /// Number of slots.
    pub capacity: usize,
    /// Number of entries allowed before the next growth.
    pub max_len: usize,
    /// `len / capacity`.
    pub load_factor: f64,
    /// Bytes held by the slot allocation.
    pub total_bytes: usize,
    /// Bytes held by separately allocated items.
    pub item_bytes: usize,
    /// Whether the next insert will grow the table first.
    pub rehash_pending: bool,
}

#[cfg(feature = "stats")]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} slots ({:.2}% load factor, grows past {})",
            self.len,
            self.capacity,
            self.load_factor * 100.0,
            self.max_len
        );
        println!("Slot allocation: {} bytes", self.total_bytes);
        println!("Item allocations: {} bytes", self.item_bytes);
        println!("Rehash pending: {}", self.rehash_pending);
    }
}

/// A view into a single entry of a [`HashTable`].
pub enum Entry<'a, N: NodeTraits, S, P, A: Allocator> {
    /// An existing item.
    Occupied(OccupiedEntry<'a, N, S, P, A>),
    /// A secured but unfilled slot.
    Vacant(VacantEntry<'a, N, S, P, A>),
}

impl<'a, N, S, P, A> Entry<'a, N, S, P, A>
where
    N: NodeTraits,
    N::Key: Hash,
    S: BuildHasher,
    A: Allocator,
{
    /// Inserts `default` if the entry is vacant and returns the stored item.
    pub fn or_insert(self, default: N::Item) -> &'a mut N::Item {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the item built by `default` if the entry is vacant.
    pub fn or_insert_with(self, default: impl FnOnce() -> N::Item) -> &'a mut N::Item {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }
}

/// An occupied entry of a [`HashTable`].
pub struct OccupiedEntry<'a, N: NodeTraits, S, P, A: Allocator> {
    table: &'a mut HashTable<N, S, P, A>,
    index: usize,
}

impl<'a, N: NodeTraits, S, P, A: Allocator> OccupiedEntry<'a, N, S, P, A> {
    /// Gets a reference to the item.
    pub fn get(&self) -> &N::Item {
        self.table.item_at(self.index)
    }

    /// Gets a mutable reference to the item.
    pub fn get_mut(&mut self) -> &mut N::Item {
        self.table.item_at_mut(self.index)
    }

    /// Converts the entry into a mutable reference bound to the table.
    pub fn into_mut(self) -> &'a mut N::Item {
        self.table.item_at_mut(self.index)
    }

    /// Removes the item from the table and returns it.
    pub fn remove(self) -> N::Item {
        self.table.remove_at(self.index)
    }
}

/// A vacant entry of a [`HashTable`], holding a secured slot.
pub struct VacantEntry<'a, N: NodeTraits, S, P, A: Allocator> {
    table: &'a mut HashTable<N, S, P, A>,
    hash: u64,
    home: usize,
    vacancy: Vacancy,
}

impl<'a, N, S, P, A> VacantEntry<'a, N, S, P, A>
where
    N: NodeTraits,
    N::Key: Hash,
    S: BuildHasher,
    A: Allocator,
{
    /// Inserts `item` into the secured slot.
    ///
    /// # Panics
    ///
    /// Panics if `item`'s key does not hash like the key that produced this
    /// entry. Such an item could never be found again.
    pub fn insert(self, item: N::Item) -> &'a mut N::Item {
        assert_eq!(
            mix(self.table.hash_builder.hash_one(N::key_of(&item))),
            self.hash,
            "vacant entry filled with a different key"
        );
        self.insert_unchecked(item)
    }

    /// Inserts `item` whose key the caller already knows to be the entry's.
    pub(crate) fn insert_unchecked(self, item: N::Item) -> &'a mut N::Item {
        let node = N::create(item, &self.table.alloc);
        // SAFETY: The vacancy was computed for `home` and the exclusive borrow
        // prevented any mutation since.
        let index = unsafe {
            self.table
                .slots
                .place(self.home, metadata::fragment(self.hash), self.vacancy, node)
        };
        self.table.len += 1;
        self.table.item_at_mut(index)
    }
}

/// Cursor over the occupied slots of a slot array.
///
/// Walks a node pointer and a metadata pointer in lockstep, skipping empty
/// slots a group at a time. `end` is the first sentinel, so the walk stops
/// there without a separate bounds check on each group.
struct RawIter<T> {
    nodes: *mut T,
    metadata: *const u8,
    end: *const u8,
    remaining: usize,
}

impl<T> RawIter<T> {
    #[inline]
    fn next_slot(&mut self) -> Option<*mut T> {
        loop {
            if self.metadata >= self.end {
                return None;
            }

            // SAFETY: `metadata < end`, and the sentinels make GROUP_WIDTH bytes
            // readable from any such position.
            let group = unsafe { Group::load(self.metadata) };
            match group.match_occupied().lowest_set_bit() {
                Some(lane) => {
                    // SAFETY: `lane` is inside the loaded group, so the
                    // pointers stay inside the allocation (at worst on the
                    // first sentinel).
                    unsafe {
                        let metadata = self.metadata.add(lane);
                        if metadata >= self.end {
                            self.metadata = self.end;
                            return None;
                        }
                        let node = self.nodes.add(lane);
                        self.metadata = metadata.add(1);
                        self.nodes = node.add(1);
                        self.remaining -= 1;
                        return Some(node);
                    }
                }
                None => {
                    // A fully empty group contains no sentinel, so it ends
                    // before `end`.
                    // SAFETY: See above.
                    unsafe {
                        self.metadata = self.metadata.add(GROUP_WIDTH);
                        self.nodes = self.nodes.add(GROUP_WIDTH);
                    }
                }
            }
        }
    }
}

/// An iterator over the items of a [`HashTable`].
pub struct Iter<'a, N: NodeTraits> {
    raw: RawIter<N::Node>,
    _marker: PhantomData<(&'a N::Node, &'a N::Item)>,
}

// SAFETY: Only shared references to items are produced.
unsafe impl<N: NodeTraits> Send for Iter<'_, N> where N::Item: Sync {}
// SAFETY: As above.
unsafe impl<N: NodeTraits> Sync for Iter<'_, N> where N::Item: Sync {}

impl<N: NodeTraits> Clone for Iter<'_, N> {
    fn clone(&self) -> Self {
        Iter {
            raw: RawIter {
                nodes: self.raw.nodes,
                metadata: self.raw.metadata,
                end: self.raw.end,
                remaining: self.raw.remaining,
            },
            _marker: PhantomData,
        }
    }
}

impl<'a, N: NodeTraits> Iterator for Iter<'a, N> {
    type Item = &'a N::Item;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.raw.next_slot()?;
        // SAFETY: The slot is occupied and the table is borrowed for `'a`.
        Some(N::item(unsafe { &*node }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.remaining, Some(self.raw.remaining))
    }
}

impl<N: NodeTraits> ExactSizeIterator for Iter<'_, N> {}
impl<N: NodeTraits> FusedIterator for Iter<'_, N> {}

/// A mutable iterator over the items of a [`HashTable`].
pub struct IterMut<'a, N: NodeTraits> {
    raw: RawIter<N::Node>,
    _marker: PhantomData<(&'a mut N::Node, &'a mut N::Item)>,
}

// SAFETY: Each item is handed out at most once.
unsafe impl<N: NodeTraits> Send for IterMut<'_, N> where N::Item: Send {}
// SAFETY: As above.
unsafe impl<N: NodeTraits> Sync for IterMut<'_, N> where N::Item: Sync {}

impl<'a, N: NodeTraits> Iterator for IterMut<'a, N> {
    type Item = &'a mut N::Item;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.raw.next_slot()?;
        // SAFETY: The slot is occupied, the table is exclusively borrowed for
        // `'a`, and each slot is visited once.
        Some(N::item_mut(unsafe { &mut *node }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.remaining, Some(self.raw.remaining))
    }
}

impl<N: NodeTraits> ExactSizeIterator for IterMut<'_, N> {}
impl<N: NodeTraits> FusedIterator for IterMut<'_, N> {}

/// A draining iterator over the items of a [`HashTable`].
///
/// Items not consumed are dropped when the iterator is.
pub struct Drain<'a, N: NodeTraits, S, P, A: Allocator> {
    table: &'a mut HashTable<N, S, P, A>,
    index: usize,
}

impl<N: NodeTraits, S, P, A: Allocator> Iterator for Drain<'_, N, S, P, A> {
    type Item = N::Item;

    fn next(&mut self) -> Option<Self::Item> {
        next_owned(self.table, &mut self.index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len, Some(self.table.len))
    }
}

impl<N: NodeTraits, S, P, A: Allocator> ExactSizeIterator for Drain<'_, N, S, P, A> {}
impl<N: NodeTraits, S, P, A: Allocator> FusedIterator for Drain<'_, N, S, P, A> {}

impl<N: NodeTraits, S, P, A: Allocator> Drop for Drain<'_, N, S, P, A> {
    fn drop(&mut self) {
        for _ in &mut *self {}
        self.table.rehash_pending = false;
    }
}

/// An owning iterator over the items of a [`HashTable`].
pub struct IntoIter<N: NodeTraits, S, P, A: Allocator> {
    table: HashTable<N, S, P, A>,
    index: usize,
}

impl<N: NodeTraits, S, P, A: Allocator> Iterator for IntoIter<N, S, P, A> {
    type Item = N::Item;

    fn next(&mut self) -> Option<Self::Item> {
        next_owned(&mut self.table, &mut self.index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len, Some(self.table.len))
    }
}

impl<N: NodeTraits, S, P, A: Allocator> ExactSizeIterator for IntoIter<N, S, P, A> {}
impl<N: NodeTraits, S, P, A: Allocator> FusedIterator for IntoIter<N, S, P, A> {}

impl<N: NodeTraits, S, P, A: Allocator> IntoIterator for HashTable<N, S, P, A> {
    type Item = N::Item;
    type IntoIter = IntoIter<N, S, P, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            index: 0,
        }
    }
}

impl<'a, N: NodeTraits, S, P, A: Allocator> IntoIterator for &'a HashTable<N, S, P, A> {
    type Item = &'a N::Item;
    type IntoIter = Iter<'a, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Takes the next item at or after `index` out of the table.
///
/// Removal goes through the backward shift so the table stays consistent even
/// if the iterator is leaked part way.
fn next_owned<N: NodeTraits, S, P, A: Allocator>(
    table: &mut HashTable<N, S, P, A>,
    index: &mut usize,
) -> Option<N::Item> {
    if table.len == 0 {
        return None;
    }

    while *index < table.slots.slot_count {
        if table.slots.is_occupied(*index) {
            return Some(table.remove_at(*index));
        }
        *index += 1;
    }

    None
}

#[cfg(test)]
impl<N, S, P, A> HashTable<N, S, P, A>
where
    N: NodeTraits,
    N::Key: Hash,
    S: BuildHasher,
    P: GrowthPolicy,
    A: Allocator,
{
    /// Checks every structural invariant of the slot array.
    pub(crate) fn assert_invariants(&self) {
        let capacity = self.slots.capacity;
        if capacity == 0 {
            assert_eq!(self.len, 0);
            return;
        }
        assert!(capacity >= crate::growth_policy::MIN_CAPACITY);
        assert!(self.len <= capacity);

        let slot_count = self.slots.slot_count;
        assert_eq!(slot_count, capacity + MAX_OFFSET);
        for sentinel in slot_count..slot_count + GROUP_WIDTH {
            // SAFETY: Sentinels are inside the metadata array.
            assert_eq!(unsafe { self.slots.meta(sentinel) }, SENTINEL);
        }

        let mut occupied = 0;
        let mut previous_home: Option<usize> = None;
        for index in 0..slot_count {
            // SAFETY: `index` is below the slot count.
            let meta = unsafe { self.slots.meta(index) };
            if !metadata::is_occupied(meta) {
                previous_home = None;
                continue;
            }
            occupied += 1;

            let hash = self.hash_of(N::key(unsafe { &*self.slots.node(index) }));
            let home = self.policy.index(hash, capacity);
            assert!(home <= index, "slot {index} sits before its home {home}");
            assert_eq!(
                metadata::offset(meta),
                index - home,
                "slot {index} records a wrong displacement: {self:#?}"
            );
            assert_eq!(meta >> 1 & 0b111, metadata::fragment(hash));
            for between in home..index {
                assert!(
                    self.slots.is_occupied(between),
                    "hole at {between} between slot {index} and its home {home}"
                );
            }
            if let Some(previous_home) = previous_home {
                assert!(
                    previous_home <= home,
                    "slot {index} (home {home}) follows an entry homed at {previous_home}"
                );
            }
            previous_home = Some(home);
        }
        assert_eq!(occupied, self.len);
    }
}
