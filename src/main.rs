// Parallel prime counting benchmark.
// Copyright (C) 2024 prime-dispatch contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use prometheus_client::metrics::info::Info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use prime_dispatch::cli::{self, Args};
use prime_dispatch::primes::TrialDivision;
use prime_dispatch::{driver, metrics};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn setup_tracing(args: &Args) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::builder().parse_lossy(
        std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV).unwrap_or("info".to_string()),
    );
    // stdout only carries the result line
    let fmt = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_span_events(if args.log_span_durations {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_filter(env_filter);
    tracing_subscriber::registry().with(fmt).try_init()?;
    Ok(())
}

fn run(args: Args) -> Result<()> {
    setup_tracing(&args)?;

    let mut metrics_registry = prometheus_client::registry::Registry::default();
    let info = Info::new(vec![(
        "version".to_owned(),
        env!("CARGO_PKG_VERSION").to_owned(),
    )]);
    metrics::register_metrics(&mut metrics_registry, info);

    let config = args.config();
    tracing::debug!("Running with {config:?}");
    let worker = TrialDivision::new(args.policy);
    let report = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(driver::run(&config, worker))?;

    println!("{report}");

    if args.print_metrics {
        eprint!("{}", metrics::encode(&metrics_registry)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            e.print().ok();
            return ExitCode::from(cli::exit_code(&e));
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}
