//! Lease-based node membership and discovery.
//!
//! Every running instance of a service keeps a key with a TTL alive in a
//! shared [`LeaseStore`]. The key is the node identity, `"{service}:{node}"`,
//! and it is rewritten every half TTL by a background heartbeat. A node that
//! stops renewing, whether it stopped cleanly or crashed, drops out once its key
//! expires. Any instance lists the live nodes of its service with a prefix scan.
//!
//! [`MemoryLeaseStore`] shares a keyspace between drivers in one process. With
//! the `redis` feature, `RedisLeaseStore` shares it through a Redis server.
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use lease_membership::{DriverOption, MemoryLeaseStore, MembershipDriver};
//!
//! # async fn run() -> Result<(), lease_membership::MembershipError> {
//! let store = Arc::new(MemoryLeaseStore::new());
//! let driver = MembershipDriver::init(
//!     store,
//!     "jobs",
//!     vec![DriverOption::Timeout(Duration::from_secs(10))],
//! )?;
//!
//! driver.start().await?;
//! let live = driver.discover().await?;
//! assert!(live.contains(driver.node_id()));
//! driver.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod interface;
pub mod lease;
pub mod store;
mod util;

pub use error::{MembershipError, MembershipResult, StoreError, StoreResult};
pub use interface::{
    logger::{Logger, TracingLogger},
    store::LeaseStore,
};
pub use lease::{
    driver::MembershipDriver,
    options::{DriverOption, DEFAULT_TIMEOUT, MAX_TIMEOUT, MIN_TIMEOUT},
};
pub use store::MemoryLeaseStore;
#[cfg(feature = "redis")]
pub use store::RedisLeaseStore;
