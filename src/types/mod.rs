pub mod range;

pub use range::Range;

// Primes found in one range, ascending.
pub type PrimeSet = Vec<u64>;
