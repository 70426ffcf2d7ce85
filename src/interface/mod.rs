pub mod logger;
pub mod store;
