//! Mod-30 wheel: only the 8 residues coprime to 2·3·5 can be prime (apart
//! from 2, 3 and 5 themselves), so a sieve indexes 8 slots per 30 integers.
//!
//! Index mapping: slot `i` stands for `(i / 8) * 30 + WHEEL[i % 8]`.

pub const WHEEL_MODULUS: u64 = 30;
pub const WHEEL_SLOTS: u64 = 8;
pub const WHEEL: [u64; 8] = [1, 7, 11, 13, 17, 19, 23, 29];

/// Distance from each wheel residue to the next one (29 wraps to 31)
pub const WHEEL_GAPS: [u64; 8] = [6, 4, 2, 4, 2, 4, 6, 2];

const OFF: u8 = u8::MAX;

/// Slot of each residue mod 30, or `OFF` when the residue is not on the wheel
const SLOT_OF_RESIDUE: [u8; 30] = {
    let mut table = [OFF; 30];
    let mut i = 0;
    while i < WHEEL.len() {
        table[WHEEL[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Wheel index of `n`, or `None` when `n` shares a factor with 30
#[inline]
pub fn index_of(n: u64) -> Option<u64> {
    let slot = SLOT_OF_RESIDUE[(n % WHEEL_MODULUS) as usize];
    if slot == OFF {
        return None;
    }
    Some((n / WHEEL_MODULUS) * WHEEL_SLOTS + u64::from(slot))
}

/// Integer at wheel index `index`, or `None` when it would overflow `u64`
#[inline]
pub fn value_of(index: u64) -> Option<u64> {
    (index / WHEEL_SLOTS)
        .checked_mul(WHEEL_MODULUS)?
        .checked_add(WHEEL[(index % WHEEL_SLOTS) as usize])
}

/// Smallest wheel value `>= n` and its slot within the wheel
#[inline]
pub fn next_on_wheel(n: u64) -> Option<(u64, usize)> {
    let residue = n % WHEEL_MODULUS;
    // WHEEL ends at 29, so every residue finds a slot
    let slot = WHEEL.iter().position(|&r| r >= residue)?;
    let value = (n - residue).checked_add(WHEEL[slot])?;
    Some((value, slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_slots_map_to_first_wheel_numbers() {
        let values: Vec<u64> = (0..10).map(|i| value_of(i).unwrap()).collect();
        assert_eq!(values, vec![1, 7, 11, 13, 17, 19, 23, 29, 31, 37]);
        assert_eq!(index_of(31), Some(8));
        assert_eq!(index_of(30), None);
        assert_eq!(index_of(25), None);
        assert_eq!(index_of(49), Some(13));
    }

    #[test]
    fn gaps_walk_the_wheel() {
        let mut v = 1;
        for (slot, gap) in WHEEL_GAPS.iter().enumerate() {
            assert_eq!(v % 30, WHEEL[slot]);
            v += gap;
        }
        assert_eq!(v, 31);
    }

    #[test]
    fn next_on_wheel_rounds_up() {
        assert_eq!(next_on_wheel(0), Some((1, 0)));
        assert_eq!(next_on_wheel(1), Some((1, 0)));
        assert_eq!(next_on_wheel(2), Some((7, 1)));
        assert_eq!(next_on_wheel(24), Some((29, 7)));
        assert_eq!(next_on_wheel(30), Some((31, 0)));
        assert_eq!(next_on_wheel(u64::MAX), None);
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        // u64::MAX = 18446744073709551615 ≡ 15 (mod 30), so it is off the wheel
        assert_eq!(index_of(u64::MAX), None);
        let top = u64::MAX - 2; // ≡ 13 (mod 30)
        let idx = index_of(top).unwrap();
        assert_eq!(value_of(idx), Some(top));
        assert_eq!(value_of(u64::MAX), None);
    }

    proptest! {
        #[test]
        fn wheel_mapping_round_trips(block in 0u64..(u64::MAX / 30), slot in 0usize..8) {
            let n = block * 30 + WHEEL[slot];
            let idx = index_of(n);
            prop_assert!(idx.is_some());
            prop_assert_eq!(value_of(idx.unwrap()), Some(n));
        }

        #[test]
        fn off_wheel_numbers_have_no_index(n in any::<u64>()) {
            let on_wheel = n % 2 != 0 && n % 3 != 0 && n % 5 != 0;
            prop_assert_eq!(index_of(n).is_some(), on_wheel);
        }
    }
}
