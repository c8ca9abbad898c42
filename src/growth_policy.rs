//! Rules mapping a hash to a slot index and a requested size to a capacity.
//!
//! A policy is chosen as a generic parameter of the table so that the index
//! computation inlines into the probe path. Both policies shipped here are
//! zero-sized.

/// The smallest capacity a table allocates once it holds any element.
pub const MIN_CAPACITY: usize = 8;

/// Converts hashes into slot indices and requested sizes into capacities.
///
/// Implementations must uphold:
///
/// - `index(hash, capacity) < capacity` for every `capacity` previously
///   returned by `capacity_for`.
/// - `capacity_for(size) >= size.max(MIN_CAPACITY)`.
///
/// Growth relies on the second property to strictly increase capacity on
/// every resize.
pub trait GrowthPolicy {
    /// Maps a (mixed) hash into `[0, capacity)`.
    fn index(&self, hash: u64, capacity: usize) -> usize;

    /// Returns the capacity to allocate for at least `size` slots.
    ///
    /// # Panics
    ///
    /// Panics on arithmetic overflow.
    fn capacity_for(&self, size: usize) -> usize;
}

/// Power-of-two capacities with mask-based indexing.
///
/// This is the default policy. It relies on the table mixing its hashes, since
/// only the low bits of the hash select the slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PowerOfTwo;

impl GrowthPolicy for PowerOfTwo {
    #[inline(always)]
    fn index(&self, hash: u64, capacity: usize) -> usize {
        debug_assert!(capacity.is_power_of_two());
        hash as usize & (capacity - 1)
    }

    #[inline]
    fn capacity_for(&self, size: usize) -> usize {
        size.max(MIN_CAPACITY)
            .checked_next_power_of_two()
            .expect("capacity overflow")
    }
}

/// Exact capacities with modulo indexing.
///
/// Slower than [`PowerOfTwo`] per lookup, but wastes no memory on rounding and
/// tolerates hashes whose low bits are poorly distributed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modulo;

impl GrowthPolicy for Modulo {
    #[inline(always)]
    fn index(&self, hash: u64, capacity: usize) -> usize {
        (hash % capacity as u64) as usize
    }

    #[inline]
    fn capacity_for(&self, size: usize) -> usize {
        size.max(MIN_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_of_two_rounds_up() {
        let policy = PowerOfTwo;
        assert_eq!(policy.capacity_for(0), 8);
        assert_eq!(policy.capacity_for(8), 8);
        assert_eq!(policy.capacity_for(9), 16);
        assert_eq!(policy.capacity_for(1143), 2048);
    }

    #[test]
    fn power_of_two_masks() {
        let policy = PowerOfTwo;
        assert_eq!(policy.index(0x1234_5678, 16), 0x8);
        assert_eq!(policy.index(u64::MAX, 1024), 1023);
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn power_of_two_overflow_panics() {
        PowerOfTwo.capacity_for(usize::MAX);
    }

    #[test]
    fn modulo_is_exact() {
        let policy = Modulo;
        assert_eq!(policy.capacity_for(3), 8);
        assert_eq!(policy.capacity_for(100), 100);
        assert_eq!(policy.index(205, 100), 5);
        for hash in 0..1000u64 {
            assert!(policy.index(hash, 37) < 37);
        }
    }
}
