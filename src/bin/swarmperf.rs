//! Runs a workload described by a resolved TOML config record against the
//! self-contained in-memory target. Real deployments link the library and
//! supply their own [`swarmperf::store::DocumentStore`].

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use swarmperf::store::MemoryStore;
use swarmperf::{Config, Error, FleetExecutor, PromRecorder, setup, workloads};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run().await {
        error!(%err, "fatal");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| Error::Setup("usage: swarmperf <config.toml>".to_string()))?;
    let config = Config::load(path)?;
    config.validate()?;
    info!(?config, "parsed config");

    let store = Arc::new(MemoryStore::new());
    let workload = workloads::by_name(&config.workload, store.clone(), config.num_items, config.seed)?;

    let recorder = Arc::new(PromRecorder::new(workload.operations())?);
    let registry = recorder.registry().clone();
    tokio::spawn(async move {
        if let Err(err) = swarmperf::metrics::serve(registry).await {
            error!(%err, "metrics endpoint failed");
        }
    });

    info!(workload = %config.workload, "setting up for workload");
    setup::run(workload.clone(), store, config.num_items).await?;

    info!("running workload");
    let mut executor = FleetExecutor::builder()
        .workload(workload)
        .recorder(recorder)
        .users(config.num_users)
        .run_time(config.run_time())
        .ramp_time(config.ramp_time())
        .think(config.think_time()?)
        .seed(config.seed)
        .build();
    executor.only_operation = config.only_operation().map(str::to_string);
    executor.chain = config.markov_chain().cloned();

    executor.run().await
}
