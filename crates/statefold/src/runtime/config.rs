//! Service configuration.

/// Configuration for a [`StatefoldService`](crate::StatefoldService).
///
/// # Example
///
/// ```
/// use statefold::ServiceConfig;
///
/// let config = ServiceConfig {
///     forward_hop_limit: 4,
/// };
/// assert_eq!(config.forward_hop_limit, 4);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum number of forward hops one invocation may chain through.
    ///
    /// A forward effect re-dispatches the command to another component; a
    /// cycle of forwarding components would otherwise loop indefinitely.
    /// Default: 8.
    pub forward_hop_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            forward_hop_limit: 8,
        }
    }
}
