use crate::primes::clear_bit;
use crate::wheel::{self, WHEEL_GAPS, WHEEL_MODULUS, WHEEL_SLOTS};

/// Closed range `[start, end]` sieved by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Position in the run, used to merge results in order
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl Segment {
    pub fn new(index: usize, start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { index, start, end }
    }

    /// Split `[start, end]` into contiguous segments of `size` numbers, the
    /// last one truncated to `end`
    pub fn partition(start: u64, end: u64, size: u64) -> Vec<Segment> {
        let size = size.max(1);
        let mut segments = Vec::new();
        if start > end {
            return segments;
        }

        let mut low = start;
        loop {
            let high = low.saturating_add(size - 1).min(end);
            segments.push(Segment::new(segments.len(), low, high));
            if high >= end {
                break;
            }
            low = high + 1;
        }
        segments
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Wheel-30 segment sieve with a reusable bit buffer.
///
/// - Memory: 8 bits per 30 integers, bit-packed in u64 words
/// - Only multiples `p*q` with `q` on the wheel are marked, since every other
///   multiple is already excluded by the wheel
/// - 2, 3 and 5 never appear on the wheel and are added when in range
#[derive(Debug, Default)]
pub struct SegmentSieve {
    bits: Vec<u64>,
}

impl SegmentSieve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primes in `[segment.start, segment.end]`, ascending. `base_primes`
    /// must be ascending and contain every prime `<= isqrt(segment.end)`.
    pub fn sieve(&mut self, segment: &Segment, base_primes: &[u64]) -> Vec<u64> {
        let (start, end) = (segment.start, segment.end);
        let mut primes = Vec::new();
        if start > end || end < 2 {
            return primes;
        }

        for p in [2, 3, 5] {
            if (start..=end).contains(&p) {
                primes.push(p);
            }
        }

        let first_block = start / WHEEL_MODULUS;
        let last_block = end / WHEEL_MODULUS;
        let base_index = first_block * WHEEL_SLOTS;
        let slot_count = ((last_block - first_block + 1) * WHEEL_SLOTS) as usize;

        // Reinitialize (all bits to 1 = prime)
        self.bits.clear();
        self.bits.resize(slot_count.div_ceil(64), !0_u64);

        // 1 sits on the wheel but is not prime
        if first_block == 0 {
            clear_bit(&mut self.bits, 0);
        }

        for &p in base_primes {
            if p <= 5 {
                continue;
            }
            match p.checked_mul(p) {
                Some(square) if square <= end => {}
                _ => break,
            }

            // Smallest cofactor q with p*q >= start, never below p itself
            let Some((mut q, mut slot)) = wheel::next_on_wheel(start.div_ceil(p).max(p)) else {
                continue;
            };

            while let Some(multiple) = p.checked_mul(q) {
                if multiple > end {
                    break;
                }
                if let Some(idx) = wheel::index_of(multiple) {
                    clear_bit(&mut self.bits, (idx - base_index) as usize);
                }
                let Some(next) = q.checked_add(WHEEL_GAPS[slot]) else {
                    break;
                };
                q = next;
                slot = (slot + 1) % WHEEL_GAPS.len();
            }
        }

        // Collect survivors (iterate word-by-word, skip to set bits)
        for (word_idx, &word) in self.bits.iter().enumerate() {
            let mut word = word;
            while word != 0 {
                let idx = word_idx * 64 + word.trailing_zeros() as usize;
                word &= word - 1;
                if idx >= slot_count {
                    break;
                }
                match wheel::value_of(base_index + idx as u64) {
                    Some(n) if n > end => break,
                    Some(n) if n >= start => primes.push(n),
                    Some(_) => {}
                    None => break,
                }
            }
        }

        primes
    }
}

/// Sieve a single closed range with a fresh buffer
pub fn sieve_segment(start: u64, end: u64, base_primes: &[u64]) -> Vec<u64> {
    if start > end {
        return vec![];
    }
    SegmentSieve::new().sieve(&Segment::new(0, start, end), base_primes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primes::{base_primes, sieve_up_to};
    use crate::trial;
    use proptest::prelude::*;

    #[test]
    fn partition_covers_range_without_overlap() {
        let segments = Segment::partition(1_000, 10_500, 2_000);
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0], Segment::new(0, 1_000, 2_999));
        assert_eq!(segments[4], Segment::new(4, 9_000, 10_500));
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
        assert_eq!(segments.iter().map(Segment::len).sum::<u64>(), 9_501);
    }

    #[test]
    fn partition_edge_cases() {
        assert!(Segment::partition(10, 9, 5).is_empty());
        assert_eq!(Segment::partition(7, 7, 100), vec![Segment::new(0, 7, 7)]);
        let top = Segment::partition(u64::MAX - 10, u64::MAX, 4);
        assert_eq!(top.len(), 3);
        assert_eq!(top[2].end, u64::MAX);
    }

    #[test]
    fn small_primes_are_injected() {
        assert_eq!(sieve_segment(0, 30, &base_primes(30)), sieve_up_to(30));
        assert_eq!(sieve_segment(2, 2, &[]), vec![2]);
        assert_eq!(sieve_segment(4, 6, &[2]), vec![5]);
        assert!(sieve_segment(0, 1, &[]).is_empty());
    }

    #[test]
    fn segment_matches_plain_sieve() {
        let all = sieve_up_to(200_000);
        let seeds = base_primes(200_000);
        let got = sieve_segment(150_001, 200_000, &seeds);
        let expected: Vec<u64> = all.into_iter().filter(|&p| p >= 150_001).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn buffer_reuse_across_segments() {
        let seeds = base_primes(100_000);
        let mut sieve = SegmentSieve::new();
        let mut merged = Vec::new();
        for segment in Segment::partition(2, 100_000, 7_919) {
            merged.extend(sieve.sieve(&segment, &seeds));
        }
        assert_eq!(merged, sieve_up_to(100_000));
    }

    #[test]
    fn squares_of_seed_primes_are_composite() {
        let seeds = base_primes(10_000);
        let got = sieve_segment(40, 10_000, &seeds);
        for p in [7_u64, 11, 13, 97] {
            assert!(!got.contains(&(p * p)));
            assert!(got.contains(&p) || p < 40);
        }
    }

    #[test]
    fn near_u64_max() {
        // 18446744073709551557 is the largest prime below 2^64
        let end = u64::MAX;
        let start = end - 200;
        let seeds = base_primes(1 << 20); // not a full seed set, only an overflow check
        let got = sieve_segment(start, end, &seeds);
        assert!(got.contains(&18_446_744_073_709_551_557));
        assert!(got.iter().all(|&n| n >= start));
    }

    #[test]
    fn segment_membership_matches_trial_division() {
        let seeds = base_primes(10_000);
        let sieved = sieve_segment(2, 10_000, &seeds);
        for n in 2..=10_000 {
            assert_eq!(
                sieved.binary_search(&n).is_ok(),
                trial::is_prime(n),
                "disagreement at {n}"
            );
        }
    }

    proptest! {
        #[test]
        fn arbitrary_windows_agree_with_trial_division(
            start in 0u64..2_000_000,
            len in 0u64..5_000,
        ) {
            let end = start + len;
            let seeds = base_primes(end);
            let sieved = sieve_segment(start, end, &seeds);
            let expected: Vec<u64> = (start..=end).filter(|&n| trial::is_prime(n)).collect();
            prop_assert_eq!(sieved, expected);
        }
    }
}
