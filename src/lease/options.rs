use std::{sync::Arc, time::Duration};

use crate::{
    error::{MembershipError, MembershipResult},
    interface::logger::{Logger, TracingLogger},
};

/// Lease TTL used when no [`DriverOption::Timeout`] is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shortest accepted lease TTL; renewal runs every half of it.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(2);

/// Longest accepted lease TTL.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Settings accepted by [`MembershipDriver::init`](super::driver::MembershipDriver::init).
///
/// Applied in order; a later option of the same kind replaces an earlier one.
pub enum DriverOption {
    /// Lease TTL. Renewal runs every half of it.
    Timeout(Duration),
    /// Sink for renewal and deregistration failures.
    Logger(Arc<dyn Logger>),
    /// Fixed node discriminator, used instead of a generated one.
    NodeName(String),
}

pub(crate) struct DriverSettings {
    pub(crate) timeout: Duration,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) node_name: Option<String>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            logger: Arc::new(TracingLogger),
            node_name: None,
        }
    }
}

impl DriverSettings {
    pub(crate) fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = DriverOption>,
    {
        let mut settings = Self::default();
        for option in options {
            settings.apply(option);
        }
        settings
    }

    pub(crate) fn validate_timeout(&self) -> MembershipResult<()> {
        if self.timeout < MIN_TIMEOUT || self.timeout > MAX_TIMEOUT {
            return Err(MembershipError::InvalidTimeout(self.timeout));
        }
        Ok(())
    }

    fn apply(&mut self, option: DriverOption) {
        match option {
            DriverOption::Timeout(timeout) => self.timeout = timeout,
            DriverOption::Logger(logger) => self.logger = logger,
            DriverOption::NodeName(name) => self.node_name = Some(name),
        }
    }
}
