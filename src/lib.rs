#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

use cfg_if::cfg_if;

/// Emits a `tracing` event at debug level when the `tracing` feature is on.
macro_rules! debug_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!($($arg)*);
    };
}
pub(crate) use debug_event;

/// Emits a `tracing` event at trace level when the `tracing` feature is on.
macro_rules! trace_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
    };
}
pub(crate) use trace_event;

/// The error returned by fallible reservation.
pub mod error;
pub mod growth_policy;

/// A key-value map over the Robin Hood table.
///
/// This module provides [`HashMap`] and its address-stable flavor
/// [`NodeHashMap`], with the usual map interface plus `emplace`-style
/// insertion that never overwrites.
pub mod hash_map;

/// A set over the Robin Hood table.
///
/// This module provides [`HashSet`] and its address-stable flavor
/// [`NodeHashSet`].
pub mod hash_set;

pub mod hash_table;
mod metadata;
pub mod node;

cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder default hasher when neither `foldhash` nor `std` is
        /// enabled. It cannot be constructed; pick a hasher explicitly.
        pub enum DefaultHashBuilder {}
    }
}

pub use error::TryReserveError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_map::NodeHashMap;
pub use hash_set::HashSet;
pub use hash_set::NodeHashSet;
pub use hash_table::HashTable;
