//! Top-level wiring and run coordination

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::info;

use crate::broker::{BrokerConfig, Consumer};
use crate::config::Config;
use crate::error::Result;
use crate::shutdown;
use crate::store::{self, LogRepo, LogService};

/// Wire up the store and consumer, then run until shutdown completes.
///
/// Startup failures (store unreachable, broker setup) surface immediately;
/// after startup the process runs for the configured lifetime, or until a
/// termination signal, or until the broker closes the delivery stream.
pub async fn run(config: Config) -> Result<()> {
    info!(database = %config.database, "connecting document store");
    let client = store::connect(&config.connection).await?;
    let repo = LogRepo::new(&client.database(&config.database));
    let sink = Arc::new(LogService::new(repo));

    info!("starting broker consumer");
    let consumer = Consumer::start(BrokerConfig::from(&config), sink).await?;

    let trigger = shutdown::listen();
    run_consumer(consumer, config.lifetime, trigger).await
}

/// Run a started consumer until a shutdown condition, then shut it down.
///
/// With a positive lifetime the run ends when the lifetime elapses; with a
/// zero lifetime it ends when the delivery stream closes. Either way a
/// trigger on the shutdown token ends the run early, and `shutdown` is
/// invoked exactly once.
pub async fn run_consumer(
    consumer: Consumer,
    lifetime: Duration,
    mut trigger: watch::Receiver<bool>,
) -> Result<()> {
    if lifetime > Duration::ZERO {
        info!(?lifetime, "running for fixed lifetime");
        tokio::select! {
            _ = time::sleep(lifetime) => info!("lifetime elapsed"),
            _ = trigger.changed() => {}
        }
    } else {
        info!("running until the delivery stream closes");
        tokio::select! {
            _ = consumer.wait_drained() => {}
            _ = trigger.changed() => {}
        }
    }

    info!("shutting down");
    consumer.shutdown().await
}
