use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::pipeline::IngestPipeline;

/// Drive the pipeline on a fixed cadence, forever.
///
/// A run that outlasts the interval defers the next tick instead of stacking
/// concurrent runs. A failed run is logged and the next tick still fires —
/// the timer does not depend on run outcome.
pub async fn run_scheduler(pipeline: IngestPipeline, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval() yields immediately on the first tick; consume it so the
    // first run happens one full interval after startup.
    ticker.tick().await;

    info!(interval_secs = every.as_secs(), "Ingest scheduler started");

    loop {
        ticker.tick().await;
        info!("Scheduled ingest run starting");
        match pipeline.run().await {
            Ok(stats) => info!("{stats}"),
            Err(e) => error!(error = %e, "Ingest run failed"),
        }
    }
}
