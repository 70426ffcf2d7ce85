use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::watch,
    time::{self, Instant, MissedTickBehavior},
};

/// Runs `runnable` every `interval` until `shutdown` fires, then runs its
/// shutdown hook once.
///
/// The first run happens one full `interval` after the call. A run that is
/// already in progress when the signal arrives is allowed to finish, and no
/// run starts after the signal has been observed. Dropping the sender counts
/// as a shutdown signal.
pub(crate) async fn run_at_fixed_interval<T: PeriodicRunnable + ?Sized>(
    runnable: Arc<T>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => runnable.run_once().await,
        }
    }

    runnable.before_shutdown_complete().await;
}

#[async_trait]
pub(crate) trait PeriodicRunnable: Send + Sync {
    async fn run_once(&self);
    async fn before_shutdown_complete(&self) {}
}
