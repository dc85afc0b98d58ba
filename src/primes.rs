/// Lowest value the segmented path starts at; primes below it come from the
/// seed sieve.
pub const SEED_FLOOR: u64 = 1_000;

#[inline]
pub(crate) fn get_bit(bits: &[u64], idx: usize) -> bool {
    (bits[idx / 64] & (1_u64 << (idx % 64))) != 0
}

#[inline]
pub(crate) fn clear_bit(bits: &mut [u64], idx: usize) {
    bits[idx / 64] &= !(1_u64 << (idx % 64));
}

/// Plain single-pass Sieve of Eratosthenes, odd-only and bit-packed.
///
/// - Memory: 1 bit per odd number
/// - Index mapping: bit i represents number (2*i + 3)
/// - Returns the primes `<= limit` in ascending order
pub fn sieve_up_to(limit: u64) -> Vec<u64> {
    if limit < 2 {
        return vec![];
    }
    if limit == 2 {
        return vec![2];
    }

    let odd_count = ((limit - 1) / 2) as usize;
    let mut is_prime = vec![!0_u64; odd_count.div_ceil(64)];

    let sqrt_idx = ((limit.isqrt() - 1) / 2) as usize;

    for i in 0..=sqrt_idx.min(odd_count - 1) {
        if get_bit(&is_prime, i) {
            let p = 2 * i + 3;
            // Mark odd multiples of p starting at p*p
            let mut j = (p * p - 3) / 2;
            while j < odd_count {
                clear_bit(&mut is_prime, j);
                j += p;
            }
        }
    }

    let mut primes = Vec::with_capacity(prime_count_estimate(limit));
    primes.push(2);

    // Iterate word-by-word, skipping straight to set bits
    for (word_idx, &word) in is_prime.iter().enumerate() {
        let mut word = word;
        while word != 0 {
            let i = word_idx * 64 + word.trailing_zeros() as usize;
            if i >= odd_count {
                break;
            }
            primes.push(2 * i as u64 + 3);
            word &= word - 1;
        }
    }

    primes
}

/// Seed primes needed to sieve anything up to `limit`: every prime
/// `<= isqrt(limit) + 1`, ascending.
pub fn base_primes(limit: u64) -> Vec<u64> {
    sieve_up_to(limit.isqrt() + 1)
}

/// Every prime `<= seed_limit(bound, floor)`. This is `base_primes(bound)`
/// unless the floor widens it.
pub fn seed_primes(bound: u64, floor: u64) -> Vec<u64> {
    let limit = seed_limit(bound, floor);
    if limit > bound.isqrt() + 1 {
        sieve_up_to(limit)
    } else {
        base_primes(bound)
    }
}

/// Upper end of the seed range for a run up to `bound`. Segments start above
/// it, and the seed sieve covers everything below.
pub fn seed_limit(bound: u64, floor: u64) -> u64 {
    (bound.isqrt() + 1).max(floor).min(bound)
}

/// Rough π(x) upper estimate for pre-allocation
pub(crate) fn prime_count_estimate(limit: u64) -> usize {
    if limit < 10 {
        return 4;
    }
    let x = limit as f64;
    (x / x.ln() * 1.15) as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_limits() {
        assert!(sieve_up_to(0).is_empty());
        assert!(sieve_up_to(1).is_empty());
        assert_eq!(sieve_up_to(2), vec![2]);
        assert_eq!(sieve_up_to(3), vec![2, 3]);
        assert_eq!(sieve_up_to(30), vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn known_prime_counts() {
        assert_eq!(sieve_up_to(100).len(), 25);
        assert_eq!(sieve_up_to(1_000).len(), 168);
        assert_eq!(sieve_up_to(1_000_000).len(), 78_498);
    }

    #[test]
    fn limits_on_square_boundaries() {
        assert_eq!(sieve_up_to(49).last(), Some(&47));
        assert_eq!(sieve_up_to(121).len(), 30);
        assert_eq!(sieve_up_to(127).last(), Some(&127));
    }

    #[test]
    fn base_primes_cover_square_root() {
        assert_eq!(base_primes(100), vec![2, 3, 5, 7, 11]);
        assert_eq!(base_primes(3), vec![2]);
        assert_eq!(base_primes(1_000_000).last(), Some(&997));
    }

    #[test]
    fn seed_primes_reach_the_seed_limit() {
        assert_eq!(seed_primes(30, SEED_FLOOR), sieve_up_to(30));
        assert_eq!(seed_primes(10_000, SEED_FLOOR), sieve_up_to(1_000));
        // past the floor only the square root matters
        let seeds = seed_primes(100_000_000, SEED_FLOOR);
        assert_eq!(seeds, base_primes(100_000_000));
        assert_eq!(seeds.last(), Some(&9_973));
    }

    #[test]
    fn seed_limit_respects_floor_and_bound() {
        assert_eq!(seed_limit(30, SEED_FLOOR), 30);
        assert_eq!(seed_limit(10_000, SEED_FLOOR), 1_000);
        assert_eq!(seed_limit(100_000_000, SEED_FLOOR), 10_001);
        assert_eq!(seed_limit(100_000_000, 0), 10_001);
    }
}
