//! The CPU-bound demo workload: primality checks by trial division.

use std::time::{Duration, Instant};

use serde::Serialize;

/// The result of checking a single number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrimeCheck {
    /// The number that was checked.
    pub i: i64,
    /// Whether the number is prime.
    pub is_prime: bool,
    /// How long the check took.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

/// All primes within a range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrimeRange {
    /// Inclusive lower bound.
    pub from: i64,
    /// Exclusive upper bound.
    pub to: i64,
    /// The number of primes found.
    pub count: usize,
    /// How long the whole range took.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
    /// The primes in ascending order.
    pub primes: Vec<PrimeCheck>,
}

/// Returns `true` if `i` is a prime number.
///
/// Tests every divisor up to `i / 2`, so the cost grows linearly with `i`.
pub fn is_prime(i: i64) -> bool {
    if i < 2 {
        return false;
    }
    (2..=i / 2).all(|divisor| i % divisor != 0)
}

/// Checks a single number and times the check.
pub fn check(i: i64) -> PrimeCheck {
    let start = Instant::now();
    let is_prime = is_prime(i);
    PrimeCheck {
        i,
        is_prime,
        elapsed: start.elapsed(),
    }
}

/// Lists all primes in `from..to`. An inverted range yields no primes.
pub fn between(from: i64, to: i64) -> PrimeRange {
    let start = Instant::now();
    let primes: Vec<_> = (from..to.max(from))
        .map(check)
        .filter(|check| check.is_prime)
        .collect();

    PrimeRange {
        from,
        to,
        count: primes.len(),
        elapsed: start.elapsed(),
        primes,
    }
}

fn serialize_duration<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&format_args!("{d:?}"))
}
