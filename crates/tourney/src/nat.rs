//! Port-mapping hook for reaching the server from outside a NAT.
//!
//! Mapping is best effort: it runs in the background with a short
//! timeout, and the server keeps serving on its local port whatever the
//! outcome.

use std::future::Future;
use std::time::Duration;

/// How long a port-mapping attempt may take.
pub const PORT_MAPPING_TIMEOUT: Duration = Duration::from_millis(2500);

/// Why a port could not be mapped.
#[derive(Debug, thiserror::Error)]
pub enum NatError {
    /// No mapping mechanism is available.
    #[error("port mapping is not supported")]
    Unsupported,

    /// The gateway did not answer in time.
    #[error("port mapping timed out after {0:?}")]
    TimedOut(Duration),

    /// The gateway refused or the request failed.
    #[error("port mapping failed: {0}")]
    Failed(String),
}

/// Asks a gateway to forward an external port to this host.
pub trait PortMapper: Send + Sync + 'static {
    fn map_port(
        &self,
        port: u16,
    ) -> impl Future<Output = Result<(), NatError>> + Send;
}

/// A [`PortMapper`] that never maps anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPortMapping;

impl PortMapper for NoPortMapping {
    async fn map_port(&self, _port: u16) -> Result<(), NatError> {
        Err(NatError::Unsupported)
    }
}

/// Tries to map `port`, bounded by [`PORT_MAPPING_TIMEOUT`].
///
/// The outcome is logged; callers may ignore the result.
pub async fn open_port<M: PortMapper>(
    mapper: &M,
    port: u16,
) -> Result<(), NatError> {
    open_port_within(mapper, port, PORT_MAPPING_TIMEOUT).await
}

async fn open_port_within<M: PortMapper>(
    mapper: &M,
    port: u16,
    limit: Duration,
) -> Result<(), NatError> {
    let result = match tokio::time::timeout(limit, mapper.map_port(port)).await
    {
        Ok(result) => result,
        Err(_) => Err(NatError::TimedOut(limit)),
    };
    match &result {
        Ok(()) => tracing::info!(port, "port mapped"),
        Err(e) => tracing::warn!(
            port,
            error = %e,
            "port mapping unavailable, server is reachable on the local network only"
        ),
    }
    result
}
