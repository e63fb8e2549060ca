use crate::types::{PrimeSet, Range};

/// How to classify 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PrimalityPolicy {
    /// 1 is not prime
    #[default]
    Standard,
    /// Everything in 1..=3 is prime, as in the legacy benchmark
    OneIsPrime,
}

impl PrimalityPolicy {
    pub fn is_prime(self, n: u64) -> bool {
        match (self, n) {
            (Self::OneIsPrime, 1) => true,
            _ => is_prime(n),
        }
    }
}

/// Trial division over candidates of the form 6k ± 1.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut tester = 5u64;
    // `tester <= n / tester` is `tester * tester <= n` without overflow
    while tester <= n / tester {
        if n % tester == 0 || n % (tester + 2) == 0 {
            return false;
        }
        tester += 6;
    }
    true
}

/// Computes the primes of a single range.
pub trait RangeWorker: Send + Sync + 'static {
    fn test_range(&self, range: Range) -> PrimeSet;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrialDivision {
    pub policy: PrimalityPolicy,
}

impl TrialDivision {
    pub fn new(policy: PrimalityPolicy) -> Self {
        Self { policy }
    }
}

impl RangeWorker for TrialDivision {
    fn test_range(&self, range: Range) -> PrimeSet {
        range.values().filter(|&n| self.policy.is_prime(n)).collect()
    }
}

pub fn test_range(first: u64, last: u64) -> PrimeSet {
    TrialDivision::default().test_range(Range::new(first, last))
}
