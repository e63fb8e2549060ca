use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::info::Info;
use prometheus_client::registry::Registry;

lazy_static::lazy_static! {
    pub static ref CHUNKS_SUBMITTED: Counter = Default::default();
    pub static ref CHUNKS_COMPLETED: Counter = Default::default();
    pub static ref TASKS_FAILED: Counter = Default::default();
    pub static ref PRIMES_FOUND: Counter = Default::default();
    pub static ref POLL_TIMEOUTS: Counter = Default::default();
    pub static ref TASKS_IN_FLIGHT: Gauge = Default::default();
}

pub fn register_metrics(registry: &mut Registry, info: Info<Vec<(String, String)>>) {
    registry.register("dispatch_info", "Benchmark info", info);
    registry.register(
        "num_chunks_submitted",
        "Number of ranges handed to the task pool",
        CHUNKS_SUBMITTED.clone(),
    );
    registry.register(
        "num_chunks_completed",
        "Number of ranges whose primes were collected",
        CHUNKS_COMPLETED.clone(),
    );
    registry.register(
        "num_tasks_failed",
        "Number of range tasks that panicked or were cancelled",
        TASKS_FAILED.clone(),
    );
    registry.register(
        "num_primes_found",
        "Number of primes collected from finished tasks",
        PRIMES_FOUND.clone(),
    );
    registry.register(
        "num_poll_timeouts",
        "Number of polls that found the task still running",
        POLL_TIMEOUTS.clone(),
    );
    registry.register(
        "tasks_in_flight",
        "Number of tasks submitted but not collected yet",
        TASKS_IN_FLIGHT.clone(),
    );
}

pub fn encode(registry: &Registry) -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, registry)?;
    Ok(buffer)
}
