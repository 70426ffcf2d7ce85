mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::{MemoryLeaseStore, DEFAULT_SCAN_PAGE_SIZE};
#[cfg(feature = "redis")]
pub use redis_store::{RedisLeaseStore, DEFAULT_SCAN_COUNT};
