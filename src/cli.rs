use std::num::{NonZeroU64, NonZeroUsize};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use crate::driver::{Config, DEFAULT_INTERVAL, DEFAULT_MAX_TASKS, DEFAULT_MAX_VAL};
use crate::pool::WaitStrategy;
use crate::primes::PrimalityPolicy;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Counts primes with a bounded pool of range tasks")]
pub struct Args {
    /// Number of values tested by a single task
    #[clap(env, value_parser = parse_positive, default_value_t = NonZeroU64::new(DEFAULT_INTERVAL).unwrap())]
    pub interval: NonZeroU64,

    /// Values in [0, MAX_VAL) are tested
    #[clap(long, env, default_value_t = DEFAULT_MAX_VAL)]
    pub max_val: u64,

    /// Maximum number of tasks in flight, 1 runs sequentially
    #[clap(long, env, value_parser = parse_max_tasks, default_value_t = NonZeroUsize::new(DEFAULT_MAX_TASKS).unwrap())]
    pub max_tasks: NonZeroUsize,

    /// How the dispatcher finds out that a task has finished
    #[clap(long, env, value_enum, default_value_t = WaitMode::Notify)]
    pub wait_strategy: WaitMode,

    /// Time spent waiting on each task per round with `--wait-strategy poll`
    #[clap(long = "poll-interval-ms", env = "POLL_INTERVAL_MS", value_name = "MS", value_parser = parse_millis, default_value = "50")]
    pub poll_interval: Duration,

    /// Whether 1 counts as a prime
    #[clap(long, env = "PRIMALITY_POLICY", value_enum, default_value_t = PrimalityPolicy::Standard)]
    pub policy: PrimalityPolicy,

    /// Print collected metrics to stderr after the run
    #[clap(long, env)]
    pub print_metrics: bool,

    #[clap(long, env, hide(true))]
    pub log_span_durations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WaitMode {
    Notify,
    Poll,
}

impl Args {
    pub fn config(&self) -> Config {
        let wait = match self.wait_strategy {
            WaitMode::Notify => WaitStrategy::Notify,
            WaitMode::Poll => WaitStrategy::Poll {
                interval: self.poll_interval,
            },
        };
        Config {
            max_val: self.max_val,
            interval: self.interval,
            max_tasks: self.max_tasks,
            wait,
        }
    }
}

/// Exit code for a failed `Args::try_parse`: 1 for invalid input, 0 for `--help` and `--version`.
pub fn exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn parse_positive(s: &str) -> Result<NonZeroU64> {
    let value: u64 = s
        .parse()
        .with_context(|| format!("'{s}' is not a valid number"))?;
    NonZeroU64::new(value).ok_or_else(|| anyhow!("value must be positive"))
}

fn parse_max_tasks(s: &str) -> Result<NonZeroUsize> {
    Ok(NonZeroUsize::try_from(parse_positive(s)?)?)
}

fn parse_millis(s: &str) -> Result<Duration> {
    Ok(Duration::from_millis(parse_positive(s)?.get()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::error::ErrorKind;
    use clap::Parser;

    use super::{exit_code, Args};
    use crate::pool::WaitStrategy;
    use crate::primes::PrimalityPolicy;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["prime-dispatch"]).unwrap();
        let config = args.config();
        assert_eq!(config.interval.get(), 10_000);
        assert_eq!(config.max_val, 10_000_000);
        assert_eq!(config.max_tasks.get(), 4);
        assert_eq!(config.wait, WaitStrategy::Notify);
        assert_eq!(args.policy, PrimalityPolicy::Standard);
        assert!(!args.print_metrics);
    }

    #[test]
    fn test_explicit_values() {
        let args = Args::try_parse_from([
            "prime-dispatch",
            "500",
            "--max-val",
            "1000",
            "--max-tasks",
            "16",
            "--wait-strategy",
            "poll",
            "--poll-interval-ms",
            "10",
            "--policy",
            "one-is-prime",
        ])
        .unwrap();
        let config = args.config();
        assert_eq!(config.interval.get(), 500);
        assert_eq!(config.max_val, 1000);
        assert_eq!(config.max_tasks.get(), 16);
        assert_eq!(
            config.wait,
            WaitStrategy::Poll {
                interval: Duration::from_millis(10)
            }
        );
        assert_eq!(args.policy, PrimalityPolicy::OneIsPrime);
    }

    #[test]
    fn test_invalid_interval() {
        for bad in ["abc", "0", "1.5", "18446744073709551616"] {
            let err = Args::try_parse_from(["prime-dispatch", bad]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "{bad}");
            assert!(err.use_stderr());
        }
    }

    #[test]
    fn test_invalid_options() {
        for args in [
            ["prime-dispatch", "--max-tasks", "0"],
            ["prime-dispatch", "--poll-interval-ms", "0"],
            ["prime-dispatch", "--max-val", "many"],
        ] {
            assert!(Args::try_parse_from(args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn test_exit_codes() {
        for bad in ["abc", "12abc", "0"] {
            let err = Args::try_parse_from(["prime-dispatch", bad]).unwrap_err();
            assert_eq!(exit_code(&err), 1, "{bad}");
        }
        let err = Args::try_parse_from(["prime-dispatch", "--no-such-flag"]).unwrap_err();
        assert_eq!(exit_code(&err), 1);

        for flag in ["--help", "--version"] {
            let err = Args::try_parse_from(["prime-dispatch", flag]).unwrap_err();
            assert_eq!(exit_code(&err), 0, "{flag}");
        }
    }
}
