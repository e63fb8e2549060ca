pub mod cli;
pub mod driver;
pub mod metrics;
pub mod pool;
pub mod primes;
pub mod types;
