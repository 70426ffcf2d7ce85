use std::{collections::BTreeSet, sync::Arc, time::Duration};

use futures::TryStreamExt;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    error::{MembershipError, MembershipResult},
    interface::store::LeaseStore,
    util::runnable::run_at_fixed_interval,
};

use super::{
    generate_node_name, key_prefix, node_id,
    options::{DriverOption, DriverSettings},
    renewer::LeaseRenewer,
    validate_node_name, validate_service_name,
};

enum Lifecycle {
    /// `draining` is the heartbeat of the previous cycle, which may still be
    /// removing its lease.
    Stopped { draining: Option<JoinHandle<()>> },
    Running {
        shutdown: watch::Sender<bool>,
        heartbeat: JoinHandle<()>,
    },
}

/// Registers this node in a [`LeaseStore`], keeps its lease alive while
/// running, and lists the live nodes of the same service.
///
/// Dropping a running driver cancels its heartbeat, which then removes the
/// lease just like [`stop`](Self::stop).
pub struct MembershipDriver {
    store: Arc<dyn LeaseStore>,
    service_name: String,
    key_prefix: String,
    node_id: String,
    timeout: Duration,
    renewer: Arc<LeaseRenewer>,
    lifecycle: Mutex<Lifecycle>,
}

impl MembershipDriver {
    /// Creates a stopped driver for `service_name` and fixes its node identity.
    pub fn init<I>(
        store: Arc<dyn LeaseStore>,
        service_name: &str,
        options: I,
    ) -> MembershipResult<Self>
    where
        I: IntoIterator<Item = DriverOption>,
    {
        validate_service_name(service_name)?;
        let settings = DriverSettings::from_options(options);
        settings.validate_timeout()?;
        let node_name = match settings.node_name {
            Some(name) => {
                validate_node_name(&name)?;
                name
            }
            None => generate_node_name(),
        };

        let node_id = node_id(service_name, &node_name);
        let renewer = Arc::new(LeaseRenewer::new(
            store.clone(),
            node_id.clone(),
            settings.timeout,
            settings.logger,
        ));

        Ok(Self {
            store,
            service_name: service_name.to_string(),
            key_prefix: key_prefix(service_name),
            node_id,
            timeout: settings.timeout,
            renewer,
            lifecycle: Mutex::new(Lifecycle::Stopped { draining: None }),
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Lease TTL.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().await, Lifecycle::Running { .. })
    }

    /// Registers the lease, then starts renewing it every `timeout / 2`.
    ///
    /// Fails with [`MembershipError::AlreadyStarted`] on a running driver. If
    /// the first registration fails the driver stays stopped and no heartbeat
    /// is launched.
    pub async fn start(&self) -> MembershipResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let draining = match &mut *lifecycle {
            Lifecycle::Running { .. } => return Err(MembershipError::AlreadyStarted),
            Lifecycle::Stopped { draining } => draining.take(),
        };

        // The previous heartbeat deletes the same key on its way out.
        if let Some(heartbeat) = draining {
            if let Err(err) = heartbeat.await {
                warn!(node_id = %self.node_id, error = %err, "previous heartbeat did not finish cleanly");
            }
        }

        self.renewer
            .register()
            .await
            .map_err(MembershipError::StoreUnavailable)?;

        let (shutdown, signal) = watch::channel(false);
        let heartbeat = tokio::spawn(run_at_fixed_interval(
            self.renewer.clone(),
            self.renew_interval(),
            signal,
        ));
        *lifecycle = Lifecycle::Running {
            shutdown,
            heartbeat,
        };

        debug!(node_id = %self.node_id, timeout = ?self.timeout, "membership driver started");
        Ok(())
    }

    /// Cancels the heartbeat and returns without waiting for it.
    ///
    /// The heartbeat removes the lease asynchronously, so the key can still be
    /// visible to [`discover`](Self::discover) right after this returns. Use
    /// [`stop_and_wait`](Self::stop_and_wait) to wait for the removal. Stopping
    /// a stopped driver does nothing.
    pub async fn stop(&self) -> MembershipResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let previous = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped { draining: None });
        *lifecycle = match previous {
            Lifecycle::Running {
                shutdown,
                heartbeat,
            } => {
                // The receiver is gone only if the heartbeat already exited.
                let _ = shutdown.send(true);
                debug!(node_id = %self.node_id, "membership driver stopped");
                Lifecycle::Stopped {
                    draining: Some(heartbeat),
                }
            }
            stopped => stopped,
        };
        Ok(())
    }

    /// Like [`stop`](Self::stop), but returns only after the heartbeat has
    /// attempted to remove the lease.
    pub async fn stop_and_wait(&self) -> MembershipResult<()> {
        self.stop().await?;

        let mut lifecycle = self.lifecycle.lock().await;
        if let Lifecycle::Stopped { draining } = &mut *lifecycle {
            if let Some(heartbeat) = draining.take() {
                if let Err(err) = heartbeat.await {
                    warn!(node_id = %self.node_id, error = %err, "heartbeat did not finish cleanly");
                }
            }
        }
        Ok(())
    }

    /// Lists the identities of all nodes of this service whose lease is live.
    ///
    /// Independent of whether this driver is running. The result is a
    /// snapshot: nodes may join or expire while the scan runs. If the scan
    /// fails partway nothing is returned.
    pub async fn discover(&self) -> MembershipResult<BTreeSet<String>> {
        self.store
            .scan(&self.key_prefix)
            .try_collect()
            .await
            .map_err(MembershipError::Scan)
    }

    fn renew_interval(&self) -> Duration {
        self.timeout / 2
    }
}
