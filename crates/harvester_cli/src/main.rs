mod config;
mod logging;
mod signals;

use std::path::PathBuf;

use anyhow::Context;
use engine_logging::{engine_error, engine_info};
use harvester_engine::{
    CheckpointStore, Extractor, HarvestSettings, Harvester, LinkPatternExtractor, PageBuffer,
    PagedHttpAdvancer, RunOutcome, RunSummary, StructuredDataExtractor,
};
use tokio_util::sync::CancellationToken;

use config::{ExtractorKind, HarvestConfig};

/// Usage: `harvester [config.ron]`. Environment variables override the file.
fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config =
        HarvestConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    logging::initialize(&config.log_file);
    engine_info!("Starting harvest of {}", config.start_url);
    engine_info!(
        "Checkpoint: {:?} | Output: {:?} | Target: {} steps | Max runtime: {} h",
        config.checkpoint_path,
        config.output_path,
        config.max_steps,
        config.max_runtime_hours
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let summary = runtime.block_on(run(&config))?;

    if let Some(reason) = summary.stop_reason() {
        engine_info!("Harvest stopped: {}", reason);
        return Ok(());
    }
    let RunOutcome::Halted(err) = summary.outcome else {
        return Ok(());
    };
    engine_error!("Harvest halted: {}", err);
    Err(anyhow::Error::new(err).context(format!(
        "harvest halted; rerun to resume from {:?}",
        config.checkpoint_path
    )))
}

async fn run(config: &HarvestConfig) -> anyhow::Result<RunSummary> {
    let settings = config.harvest_settings()?;
    let buffer = PageBuffer::new();
    let advancer = PagedHttpAdvancer::new(config.fetch_settings()?, config.paging(), buffer.clone());
    let store = CheckpointStore::new(config.checkpoint_path.clone(), config.output_path.clone());

    let cancel = CancellationToken::new();
    let _ = signals::spawn_shutdown_listener(cancel.clone());

    let summary = match config.extractor {
        ExtractorKind::LinkPattern => {
            let extractor = LinkPatternExtractor::new(buffer, config.link_marker.clone());
            harvest(advancer, extractor, store, settings, cancel).await
        }
        ExtractorKind::StructuredData => {
            let extractor = StructuredDataExtractor::new(buffer);
            harvest(advancer, extractor, store, settings, cancel).await
        }
    };
    Ok(summary)
}

async fn harvest<E: Extractor>(
    advancer: PagedHttpAdvancer,
    extractor: E,
    store: CheckpointStore,
    settings: HarvestSettings,
    cancel: CancellationToken,
) -> RunSummary {
    let mut harvester =
        Harvester::new(advancer, extractor, store, settings).with_cancellation(cancel);
    harvester.run().await
}
