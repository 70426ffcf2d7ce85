use std::process;

use rand::Rng;

use crate::error::{MembershipError, MembershipResult};

pub(crate) mod driver;
pub(crate) mod options;
mod renewer;

/// Separates the service name from the node name in a node identity.
pub const KEY_SEPARATOR: char = ':';

/// Scan prefix shared by every node of `service_name`.
pub fn key_prefix(service_name: &str) -> String {
    format!("{}{}", service_name, KEY_SEPARATOR)
}

/// Node identity (and lease key) of `node_name` within `service_name`.
pub fn node_id(service_name: &str, node_name: &str) -> String {
    format!("{}{}", key_prefix(service_name), node_name)
}

/// `{pid}-{random}`, distinct across processes on a host and across restarts.
pub(crate) fn generate_node_name() -> String {
    format!("{}-{:08x}", process::id(), rand::thread_rng().gen::<u32>())
}

/// A service name must not contain the separator, otherwise one service's
/// prefix could match another service's keys.
pub(crate) fn validate_service_name(service_name: &str) -> MembershipResult<()> {
    if service_name.is_empty() || service_name.contains(KEY_SEPARATOR) {
        return Err(MembershipError::InvalidServiceName(service_name.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_node_name(node_name: &str) -> MembershipResult<()> {
    if node_name.is_empty() {
        return Err(MembershipError::InvalidNodeName(node_name.to_string()));
    }
    Ok(())
}
