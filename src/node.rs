//! How items are shaped and where they live.
//!
//! Two orthogonal axes select the node type stored in each slot:
//!
//! - The value shape: [`MapNode`] stores `(K, V)` pairs keyed by `K`,
//!   [`SetNode`] stores bare keys.
//! - The storage strategy: [`Inline`] keeps the item in the slot itself,
//!   [`Boxed`] keeps a pointer to an item allocated separately through the
//!   table's allocator.
//!
//! Slots are moved bitwise by the table during displacement, backward shifts
//! and rehashing. With [`Boxed`] storage only the pointer moves, so the address
//! of an item survives a rehash at the cost of one allocation per entry.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;

use alloc::alloc::handle_alloc_error;
use allocator_api2::alloc::Allocator;

/// Where an item is kept relative to its slot.
pub trait Storage {
    /// What a slot physically holds for an item of type `T`.
    type Slot<T>;

    /// Whether item addresses are preserved when the table reallocates.
    const STABLE_ADDRESSES: bool;

    /// Builds a slot value holding `item`.
    fn create<T, A: Allocator>(item: T, alloc: &A) -> Self::Slot<T>;

    /// Drops the item held by `slot` and releases any storage it owns.
    ///
    /// # Safety
    ///
    /// `slot` must have been produced by `create` with an allocator
    /// interchangeable with `alloc`.
    unsafe fn destroy<T, A: Allocator>(slot: Self::Slot<T>, alloc: &A);

    /// Moves the item out of `slot`, releasing any storage it owns.
    ///
    /// # Safety
    ///
    /// Same as [`destroy`](Storage::destroy).
    unsafe fn into_inner<T, A: Allocator>(slot: Self::Slot<T>, alloc: &A) -> T;

    /// Borrows the item held by `slot`.
    fn get<T>(slot: &Self::Slot<T>) -> &T;

    /// Mutably borrows the item held by `slot`.
    fn get_mut<T>(slot: &mut Self::Slot<T>) -> &mut T;
}

/// Items live directly inside the table's slot array.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Storage for Inline {
    type Slot<T> = T;

    const STABLE_ADDRESSES: bool = false;

    #[inline(always)]
    fn create<T, A: Allocator>(item: T, _alloc: &A) -> T {
        item
    }

    #[inline(always)]
    unsafe fn destroy<T, A: Allocator>(slot: T, _alloc: &A) {
        drop(slot);
    }

    #[inline(always)]
    unsafe fn into_inner<T, A: Allocator>(slot: T, _alloc: &A) -> T {
        slot
    }

    #[inline(always)]
    fn get<T>(slot: &T) -> &T {
        slot
    }

    #[inline(always)]
    fn get_mut<T>(slot: &mut T) -> &mut T {
        slot
    }
}

/// Items live in their own allocation; slots hold an owning pointer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boxed;

impl Storage for Boxed {
    type Slot<T> = NonNull<T>;

    const STABLE_ADDRESSES: bool = true;

    fn create<T, A: Allocator>(item: T, alloc: &A) -> NonNull<T> {
        let layout = Layout::new::<T>();
        if layout.size() == 0 {
            let ptr = NonNull::<T>::dangling();
            // SAFETY: Writes of zero-sized values through a dangling, aligned
            // pointer are valid.
            unsafe { ptr.as_ptr().write(item) };
            return ptr;
        }

        let ptr = match alloc.allocate(layout) {
            Ok(block) => block.cast::<T>(),
            Err(_) => handle_alloc_error(layout),
        };
        // SAFETY: The block was just allocated with the layout of `T`.
        unsafe { ptr.as_ptr().write(item) };
        ptr
    }

    unsafe fn destroy<T, A: Allocator>(slot: NonNull<T>, alloc: &A) {
        // SAFETY: Caller guarantees `slot` came from `create` with `alloc`.
        unsafe {
            core::ptr::drop_in_place(slot.as_ptr());
            release(slot, alloc);
        }
    }

    unsafe fn into_inner<T, A: Allocator>(slot: NonNull<T>, alloc: &A) -> T {
        // SAFETY: Caller guarantees `slot` came from `create` with `alloc`; the
        // value is read once before its storage is released.
        unsafe {
            let item = slot.as_ptr().read();
            release(slot, alloc);
            item
        }
    }

    #[inline(always)]
    fn get<T>(slot: &NonNull<T>) -> &T {
        // SAFETY: A `Boxed` slot always points to a live, uniquely owned item.
        unsafe { slot.as_ref() }
    }

    #[inline(always)]
    fn get_mut<T>(slot: &mut NonNull<T>) -> &mut T {
        // SAFETY: A `Boxed` slot always points to a live, uniquely owned item,
        // and `&mut` on the slot gives exclusive access to it.
        unsafe { slot.as_mut() }
    }
}

/// # Safety
///
/// `ptr` must come from `Boxed::create` with `alloc`, and its item must
/// already be dropped or moved out.
unsafe fn release<T, A: Allocator>(ptr: NonNull<T>, alloc: &A) {
    let layout = Layout::new::<T>();
    if layout.size() != 0 {
        // SAFETY: Guaranteed by the caller.
        unsafe { alloc.deallocate(ptr.cast(), layout) };
    }
}

/// The node operations the table core is written against.
pub trait NodeTraits {
    /// The lookup key.
    type Key;
    /// What users insert and iterate over.
    type Item;
    /// What a slot holds.
    type Node;

    /// Whether item addresses survive a rehash.
    const STABLE_ADDRESSES: bool;

    /// Wraps `item` into a node, allocating if the storage requires it.
    fn create<A: Allocator>(item: Self::Item, alloc: &A) -> Self::Node;

    /// Drops a node and its item.
    ///
    /// # Safety
    ///
    /// `node` must come from [`create`](NodeTraits::create) with `alloc`.
    unsafe fn destroy<A: Allocator>(node: Self::Node, alloc: &A);

    /// Unwraps a node back into its item.
    ///
    /// # Safety
    ///
    /// `node` must come from [`create`](NodeTraits::create) with `alloc`.
    unsafe fn into_item<A: Allocator>(node: Self::Node, alloc: &A) -> Self::Item;

    /// Borrows the item of a node.
    fn item(node: &Self::Node) -> &Self::Item;

    /// Mutably borrows the item of a node.
    fn item_mut(node: &mut Self::Node) -> &mut Self::Item;

    /// Extracts the key of an item.
    fn key_of(item: &Self::Item) -> &Self::Key;

    /// Extracts the key of a node.
    #[inline(always)]
    fn key<'a>(node: &'a Self::Node) -> &'a Self::Key
    where
        Self::Item: 'a,
    {
        Self::key_of(Self::item(node))
    }
}

/// `(K, V)` items keyed by `K`.
pub struct MapNode<K, V, St>(PhantomData<(K, V, St)>);

impl<K, V, St: Storage> NodeTraits for MapNode<K, V, St> {
    type Key = K;
    type Item = (K, V);
    type Node = St::Slot<(K, V)>;

    const STABLE_ADDRESSES: bool = St::STABLE_ADDRESSES;

    #[inline(always)]
    fn create<A: Allocator>(item: (K, V), alloc: &A) -> Self::Node {
        St::create(item, alloc)
    }

    #[inline(always)]
    unsafe fn destroy<A: Allocator>(node: Self::Node, alloc: &A) {
        // SAFETY: Forwarded from the caller.
        unsafe { St::destroy(node, alloc) }
    }

    #[inline(always)]
    unsafe fn into_item<A: Allocator>(node: Self::Node, alloc: &A) -> (K, V) {
        // SAFETY: Forwarded from the caller.
        unsafe { St::into_inner(node, alloc) }
    }

    #[inline(always)]
    fn item(node: &Self::Node) -> &(K, V) {
        St::get(node)
    }

    #[inline(always)]
    fn item_mut(node: &mut Self::Node) -> &mut (K, V) {
        St::get_mut(node)
    }

    #[inline(always)]
    fn key_of(item: &(K, V)) -> &K {
        &item.0
    }
}

/// Bare keys.
pub struct SetNode<K, St>(PhantomData<(K, St)>);

impl<K, St: Storage> NodeTraits for SetNode<K, St> {
    type Key = K;
    type Item = K;
    type Node = St::Slot<K>;

    const STABLE_ADDRESSES: bool = St::STABLE_ADDRESSES;

    #[inline(always)]
    fn create<A: Allocator>(item: K, alloc: &A) -> Self::Node {
        St::create(item, alloc)
    }

    #[inline(always)]
    unsafe fn destroy<A: Allocator>(node: Self::Node, alloc: &A) {
        // SAFETY: Forwarded from the caller.
        unsafe { St::destroy(node, alloc) }
    }

    #[inline(always)]
    unsafe fn into_item<A: Allocator>(node: Self::Node, alloc: &A) -> K {
        // SAFETY: Forwarded from the caller.
        unsafe { St::into_inner(node, alloc) }
    }

    #[inline(always)]
    fn item(node: &Self::Node) -> &K {
        St::get(node)
    }

    #[inline(always)]
    fn item_mut(node: &mut Self::Node) -> &mut K {
        St::get_mut(node)
    }

    #[inline(always)]
    fn key_of(item: &K) -> &K {
        item
    }
}
