/// Deterministic trial division over the 6k±1 wheel
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let limit = n.isqrt();
    let mut i = 5;
    while i <= limit {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Primes in `[start, end]`, checked one by one. Cheaper than a sieve when
/// the range is short compared to the numbers in it.
pub fn primes_in_range(start: u64, end: u64) -> Vec<u64> {
    if start > end {
        return vec![];
    }

    let mut primes: Vec<u64> = [2, 3].into_iter().filter(|p| (start..=end).contains(p)).collect();

    // Odd candidates from max(start, 5)
    let mut n = start.max(5) | 1;
    while n <= end {
        if is_prime(n) {
            primes.push(n);
        }
        match n.checked_add(2) {
            Some(next) => n = next,
            None => break,
        }
    }
    primes
}
