use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    error::StoreResult,
    interface::{logger::Logger, store::LeaseStore},
    util::runnable::PeriodicRunnable,
};

/// Keeps one node's lease alive: writes it on every run and removes it when
/// the heartbeat shuts down.
pub(crate) struct LeaseRenewer {
    store: Arc<dyn LeaseStore>,
    node_id: String,
    ttl: Duration,
    logger: Arc<dyn Logger>,
}

impl LeaseRenewer {
    pub(crate) fn new(
        store: Arc<dyn LeaseStore>,
        node_id: String,
        ttl: Duration,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            store,
            node_id,
            ttl,
            logger,
        }
    }

    /// Writes the lease with a fresh TTL. The value is the node identity.
    pub(crate) async fn register(&self) -> StoreResult<()> {
        self.store.put(&self.node_id, &self.node_id, self.ttl).await
    }

    async fn deregister(&self) -> StoreResult<()> {
        self.store.delete(&[self.node_id.as_str()]).await
    }
}

#[async_trait]
impl PeriodicRunnable for LeaseRenewer {
    async fn run_once(&self) {
        match self.register().await {
            Ok(()) => debug!(node_id = %self.node_id, "lease renewed"),
            Err(err) => self.logger.error(format_args!(
                "renew lease for node {} failed: {}",
                self.node_id, err
            )),
        }
    }

    async fn before_shutdown_complete(&self) {
        match self.deregister().await {
            Ok(()) => debug!(node_id = %self.node_id, "lease removed"),
            Err(err) => self.logger.error(format_args!(
                "remove lease for node {} failed: {}",
                self.node_id, err
            )),
        }
    }
}
