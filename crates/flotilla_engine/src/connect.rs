use std::fmt;
use std::sync::Arc;

use flotilla_logging::flotilla_debug;

use crate::transport::{ReqwestTransport, Transport, TransportSettings};
use crate::tunnel::{TunnelDialer, TunnelTransport};
use crate::{ConnectionError, Target, TransportError};

/// Tears down whatever a strategy set up for one target.
pub type ReleaseAction = Box<dyn FnOnce() + Send + Sync>;

/// A ready transport plus its optional release action.
///
/// The release action runs exactly once, when the connection is dropped.
pub struct Connection {
    transport: Arc<dyn Transport>,
    release: Option<ReleaseAction>,
}

impl Connection {
    pub fn shared(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            release: None,
        }
    }

    pub fn with_release(transport: Arc<dyn Transport>, release: ReleaseAction) -> Self {
        Self {
            transport,
            release: Some(release),
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Turns a target into a usable transport. Called concurrently, once per target.
#[async_trait::async_trait]
pub trait ConnectionStrategy: Send + Sync {
    async fn connect(&self, target: &Target) -> Result<Connection, ConnectionError>;
}

/// Every target shares one client; nothing to release.
pub struct DirectStrategy {
    transport: Arc<dyn Transport>,
}

impl DirectStrategy {
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new(settings)?)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait::async_trait]
impl ConnectionStrategy for DirectStrategy {
    async fn connect(&self, _target: &Target) -> Result<Connection, ConnectionError> {
        Ok(Connection::shared(self.transport.clone()))
    }
}

/// One dedicated tunnel per target, closed when the connection is released.
pub struct TunneledStrategy {
    dialer: Arc<dyn TunnelDialer>,
    requested_port: u16,
}

impl TunneledStrategy {
    /// `requested_port` is mapped through each target's declared ports before dialing.
    pub fn new(dialer: Arc<dyn TunnelDialer>, requested_port: u16) -> Self {
        Self {
            dialer,
            requested_port,
        }
    }
}

#[async_trait::async_trait]
impl ConnectionStrategy for TunneledStrategy {
    async fn connect(&self, target: &Target) -> Result<Connection, ConnectionError> {
        let port = target.resolve_port(self.requested_port);
        let tunnel = self.dialer.dial(target, port).await?;
        flotilla_debug!(
            "tunnel to {} port {} open ({})",
            target.name,
            port,
            tunnel.protocol
        );

        let (transport, task) = TunnelTransport::open(tunnel, target.name.clone()).await?;
        let name = target.name.clone();
        Ok(Connection::with_release(
            Arc::new(transport),
            Box::new(move || {
                task.abort();
                flotilla_debug!("tunnel to {} released", name);
            }),
        ))
    }
}

/// Tries strategies in order; moves on only while failures are retryable.
pub struct FallbackStrategy {
    strategies: Vec<Arc<dyn ConnectionStrategy>>,
}

impl FallbackStrategy {
    pub fn new(strategies: Vec<Arc<dyn ConnectionStrategy>>) -> Self {
        Self { strategies }
    }
}

#[async_trait::async_trait]
impl ConnectionStrategy for FallbackStrategy {
    async fn connect(&self, target: &Target) -> Result<Connection, ConnectionError> {
        let mut last_error = ConnectionError::NoStrategy;
        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.connect(target).await {
                Ok(connection) => return Ok(connection),
                Err(err) if err.is_retryable() => {
                    flotilla_debug!(
                        "strategy {} failed for {}: {}; trying next",
                        index,
                        target.name,
                        err
                    );
                    last_error = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }
}
