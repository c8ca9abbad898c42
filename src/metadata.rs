//! Per-slot metadata bytes and 16-wide batched matching over them.
//!
//! Every slot owns one metadata byte laid out as:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! +---------------+-----------+---+
//! |    offset     | fragment  | o |
//! +---------------+-----------+---+
//! ```
//!
//! - `o`: the slot is occupied.
//! - `fragment`: three bits of the key's hash, used to reject most non-matching
//!   slots without comparing keys.
//! - `offset`: distance (0..=15) from the slot to its key's desired index.
//!
//! An empty slot is all zeroes. The metadata array carries [`GROUP_WIDTH`]
//! sentinel bytes past the logical capacity, marked occupied with offset 0.
//! A lane `k >= 1` can never expect offset 0, so sentinels never match a probe,
//! never look empty, end backward-shift scans, and stop iteration.

use cfg_if::cfg_if;

/// Number of metadata bytes compared at once. Also the probe window length.
pub(crate) const GROUP_WIDTH: usize = 16;

/// Largest displacement an entry may have from its desired index.
pub(crate) const MAX_OFFSET: usize = GROUP_WIDTH - 1;

/// Metadata of an unoccupied slot.
pub(crate) const EMPTY: u8 = 0x00;

/// Metadata of the trailing sentinel slots.
pub(crate) const SENTINEL: u8 = OCCUPIED;

const OCCUPIED: u8 = 0x01;
const OFFSET_SHIFT: u32 = 4;
const OFFSET_UNIT: u8 = 1 << OFFSET_SHIFT;

/// Extracts the 3-bit fragment stored alongside an entry.
///
/// The fragment is taken from the top bits so it stays independent of the low
/// bits that mask-based growth policies use to pick the slot.
#[inline(always)]
pub(crate) fn fragment(hash: u64) -> u8 {
    (hash >> 61) as u8
}

#[inline(always)]
pub(crate) fn encode(fragment: u8, offset: usize) -> u8 {
    debug_assert!(fragment < 8);
    debug_assert!(offset <= MAX_OFFSET);
    OCCUPIED | (fragment << 1) | ((offset as u8) << OFFSET_SHIFT)
}

#[inline(always)]
pub(crate) fn is_occupied(meta: u8) -> bool {
    meta & OCCUPIED != 0
}

#[inline(always)]
pub(crate) fn offset(meta: u8) -> usize {
    (meta >> OFFSET_SHIFT) as usize
}

/// Same entry, one slot further from home.
#[inline(always)]
pub(crate) fn pushed(meta: u8) -> u8 {
    debug_assert!(is_occupied(meta) && offset(meta) < MAX_OFFSET);
    meta + OFFSET_UNIT
}

/// Same entry, one slot closer to home.
#[inline(always)]
pub(crate) fn pulled(meta: u8) -> u8 {
    debug_assert!(is_occupied(meta) && offset(meta) > 0);
    meta - OFFSET_UNIT
}

/// A set of lanes within a group, lowest lane first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BitMask(pub(crate) u16);

impl BitMask {
    #[inline(always)]
    pub(crate) fn lowest_set_bit(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    /// Keeps only lanes strictly below `lane`.
    #[inline(always)]
    pub(crate) fn below(self, lane: usize) -> Self {
        if lane >= GROUP_WIDTH {
            self
        } else {
            BitMask(self.0 & ((1u16 << lane) - 1))
        }
    }
}

impl Iterator for BitMask {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        let lane = self.lowest_set_bit()?;
        self.0 &= self.0 - 1;
        Some(lane)
    }
}

#[cfg_attr(
    all(target_arch = "x86_64", target_feature = "sse2"),
    allow(dead_code)
)]
mod scalar {
    use super::BitMask;
    use super::GROUP_WIDTH;
    use super::encode;
    use super::is_occupied;

    /// Portable group, testing each byte in turn.
    #[derive(Clone, Copy)]
    pub(crate) struct Group([u8; GROUP_WIDTH]);

    impl Group {
        /// # Safety
        ///
        /// `ptr` must be valid for reads of [`GROUP_WIDTH`] bytes.
        #[inline(always)]
        pub(crate) unsafe fn load(ptr: *const u8) -> Self {
            // SAFETY: Caller guarantees GROUP_WIDTH readable bytes.
            unsafe { Group(core::ptr::read_unaligned(ptr.cast())) }
        }

        #[inline(always)]
        pub(crate) fn match_probe(&self, fragment: u8) -> BitMask {
            let mut bits = 0u16;
            for lane in 0..GROUP_WIDTH {
                if self.0[lane] == encode(fragment, lane) {
                    bits |= 1 << lane;
                }
            }
            BitMask(bits)
        }

        #[inline(always)]
        pub(crate) fn match_occupied(&self) -> BitMask {
            let mut bits = 0u16;
            for lane in 0..GROUP_WIDTH {
                if is_occupied(self.0[lane]) {
                    bits |= 1 << lane;
                }
            }
            BitMask(bits)
        }

        #[inline(always)]
        pub(crate) fn match_empty(&self) -> BitMask {
            BitMask(!self.match_occupied().0)
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
mod sse2 {
    use core::arch::x86_64::*;

    use super::BitMask;
    use super::GROUP_WIDTH;
    use super::OCCUPIED;
    use super::OFFSET_SHIFT;

    /// Lane `k` of a probe expects offset `k`.
    static LANE_OFFSETS: [u8; GROUP_WIDTH] = {
        let mut lanes = [0u8; GROUP_WIDTH];
        let mut lane = 0;
        while lane < GROUP_WIDTH {
            lanes[lane] = (lane as u8) << OFFSET_SHIFT;
            lane += 1;
        }
        lanes
    };

    #[derive(Clone, Copy)]
    pub(crate) struct Group(__m128i);

    impl Group {
        /// # Safety
        ///
        /// `ptr` must be valid for reads of [`GROUP_WIDTH`] bytes.
        #[inline(always)]
        pub(crate) unsafe fn load(ptr: *const u8) -> Self {
            // SAFETY: Caller guarantees GROUP_WIDTH readable bytes; the load is
            // unaligned.
            unsafe { Group(_mm_loadu_si128(ptr as *const __m128i)) }
        }

        #[inline(always)]
        pub(crate) fn match_probe(&self, fragment: u8) -> BitMask {
            // SAFETY: SSE2 is statically enabled and LANE_OFFSETS is 16 bytes.
            unsafe {
                let lanes = _mm_loadu_si128(LANE_OFFSETS.as_ptr() as *const __m128i);
                let tag = _mm_set1_epi8((OCCUPIED | (fragment << 1)) as i8);
                let expected = _mm_or_si128(lanes, tag);
                let cmp = _mm_cmpeq_epi8(self.0, expected);
                BitMask(_mm_movemask_epi8(cmp) as u16)
            }
        }

        #[inline(always)]
        pub(crate) fn match_occupied(&self) -> BitMask {
            // Moves bit 0 of every byte into that byte's sign bit. Within each
            // 16-bit lane the high byte's bit 0 lands on bit 15 and the low
            // byte's on bit 7; nothing else reaches a sign bit.
            // SAFETY: SSE2 is statically enabled.
            unsafe {
                let shifted = _mm_slli_epi16(self.0, 7);
                BitMask(_mm_movemask_epi8(shifted) as u16)
            }
        }

        #[inline(always)]
        pub(crate) fn match_empty(&self) -> BitMask {
            BitMask(!self.match_occupied().0)
        }
    }
}

cfg_if! {
    if #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))] {
        pub(crate) use sse2::Group;
    } else {
        pub(crate) use scalar::Group;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(bytes: &[u8]) -> [u8; GROUP_WIDTH] {
        let mut out = [EMPTY; GROUP_WIDTH];
        out[..bytes.len()].copy_from_slice(bytes);
        out
    }

    #[test]
    fn encode_roundtrips_fields() {
        let meta = encode(5, 11);
        assert!(is_occupied(meta));
        assert_eq!(offset(meta), 11);
        assert_eq!(fragment(0xA000_0000_0000_0000), 5);
        assert_eq!(offset(pushed(meta)), 12);
        assert_eq!(offset(pulled(meta)), 10);
        assert!(!is_occupied(EMPTY));
        assert!(is_occupied(SENTINEL));
        assert_eq!(offset(SENTINEL), 0);
    }

    #[test]
    fn bitmask_iterates_ascending() {
        let lanes: alloc::vec::Vec<usize> = BitMask(0b1000_0000_0010_0101).collect();
        assert_eq!(lanes, [0, 2, 5, 15]);
        assert_eq!(BitMask(0b1111).below(2), BitMask(0b11));
        assert_eq!(BitMask(0xFFFF).below(16), BitMask(0xFFFF));
        assert_eq!(BitMask(0).lowest_set_bit(), None);
    }

    #[test]
    fn probe_requires_matching_offset() {
        // Lane 0 and lane 2 hold fragment 3 entries homed at the window start;
        // lane 1 holds fragment 3 but homed one slot later.
        let bytes = window(&[encode(3, 0), encode(3, 0), encode(3, 2), encode(1, 3)]);
        let group = unsafe { Group::load(bytes.as_ptr()) };
        assert_eq!(group.match_probe(3), BitMask(0b101));
        assert_eq!(group.match_probe(1), BitMask(0b1000));
        assert_eq!(group.match_occupied(), BitMask(0b1111));
        assert_eq!(group.match_empty().lowest_set_bit(), Some(4));
    }

    #[test]
    fn sentinels_never_match() {
        let mut bytes = [SENTINEL; GROUP_WIDTH];
        bytes[0] = encode(0, 0);
        let group = unsafe { Group::load(bytes.as_ptr()) };
        assert_eq!(group.match_probe(0), BitMask(0b1));
        assert_eq!(group.match_empty().count(), 0);
    }

    #[test]
    fn scalar_and_selected_groups_agree() {
        let mut bytes = [0u8; GROUP_WIDTH];
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        for _ in 0..512 {
            for byte in bytes.iter_mut() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                *byte = state as u8;
            }
            let fast = unsafe { Group::load(bytes.as_ptr()) };
            let slow = unsafe { scalar::Group::load(bytes.as_ptr()) };
            for fragment in 0..8 {
                assert_eq!(fast.match_probe(fragment), slow.match_probe(fragment));
            }
            assert_eq!(fast.match_occupied(), slow.match_occupied());
            assert_eq!(fast.match_empty(), slow.match_empty());
        }
    }
}
