use bytes::Bytes;
use futures_util::StreamExt;
use http::header::{CONNECTION, CONTENT_LENGTH, HOST, UPGRADE};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use flotilla_logging::flotilla_debug;

use crate::request::HTTP;
use crate::transport::{Transport, TransportResponse};
use crate::{ConnectionError, RequestDescriptor, Target, TransportError};

/// Sub-protocol requested from upgrade brokers unless configured otherwise.
pub const DEFAULT_TUNNEL_PROTOCOL: &str = "flotilla-tunnel.v1";

// Characters that cannot appear raw inside one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn upgrade_path(target: &Target, port: u16) -> String {
    format!(
        "/targets/{}/tunnel?port={port}",
        utf8_percent_encode(&target.name, PATH_SEGMENT)
    )
}

/// Any bidirectional byte stream a tunnel can hand back.
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> DuplexStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// A dedicated byte stream to one target, established through a broker.
pub struct Tunnel {
    pub stream: Box<dyn DuplexStream>,
    /// Protocol the broker agreed to speak.
    pub protocol: String,
}

/// Opens a duplex stream to `port` on `target` through some intermediary.
#[async_trait::async_trait]
pub trait TunnelDialer: Send + Sync {
    async fn dial(&self, target: &Target, port: u16) -> Result<Tunnel, ConnectionError>;
}

/// Asks an HTTP broker to upgrade the connection into a tunnel to the target.
///
/// The broker must answer `101 Switching Protocols` and echo the requested
/// protocol in its `Upgrade` header.
#[derive(Debug, Clone)]
pub struct UpgradeDialer {
    broker: String,
    protocol: String,
}

impl UpgradeDialer {
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            protocol: DEFAULT_TUNNEL_PROTOCOL.to_string(),
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }
}

#[async_trait::async_trait]
impl TunnelDialer for UpgradeDialer {
    async fn dial(&self, target: &Target, port: u16) -> Result<Tunnel, ConnectionError> {
        let mut sender = handshake_with_broker(&self.broker).await?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(upgrade_path(target, port))
            .header(HOST, self.broker.as_str())
            .header(CONNECTION, "Upgrade")
            .header(UPGRADE, self.protocol.as_str())
            .body(Empty::<Bytes>::new())
            .map_err(|err| ConnectionError::Setup(err.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|err| ConnectionError::UpgradeFailed(err.to_string()))?;

        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return Err(ConnectionError::UpgradeFailed(format!(
                "broker answered {}",
                response.status()
            )));
        }

        let negotiated = response
            .headers()
            .get(UPGRADE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if negotiated.as_deref() != Some(self.protocol.as_str()) {
            return Err(ConnectionError::ProtocolMismatch {
                expected: self.protocol.clone(),
                actual: negotiated,
            });
        }

        let upgraded = hyper::upgrade::on(response)
            .await
            .map_err(|err| ConnectionError::UpgradeFailed(err.to_string()))?;

        Ok(Tunnel {
            stream: Box::new(TokioIo::new(upgraded)),
            protocol: self.protocol.clone(),
        })
    }
}

/// Tunnels through an HTTP proxy with `CONNECT host:port`.
#[derive(Debug, Clone)]
pub struct ConnectDialer {
    proxy: String,
}

impl ConnectDialer {
    pub fn new(proxy: impl Into<String>) -> Self {
        Self {
            proxy: proxy.into(),
        }
    }
}

#[async_trait::async_trait]
impl TunnelDialer for ConnectDialer {
    async fn dial(&self, target: &Target, port: u16) -> Result<Tunnel, ConnectionError> {
        let mut sender = handshake_with_broker(&self.proxy).await?;
        let authority = target.authority(port);

        let request = Request::builder()
            .method(Method::CONNECT)
            .uri(authority.as_str())
            .header(HOST, authority.as_str())
            .body(Empty::<Bytes>::new())
            .map_err(|err| ConnectionError::Setup(err.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|err| ConnectionError::ProxyRefused(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ConnectionError::ProxyRefused(format!(
                "proxy answered {}",
                response.status()
            )));
        }

        let upgraded = hyper::upgrade::on(response)
            .await
            .map_err(|err| ConnectionError::ProxyRefused(err.to_string()))?;

        Ok(Tunnel {
            stream: Box::new(TokioIo::new(upgraded)),
            protocol: "connect".to_string(),
        })
    }
}

async fn handshake_with_broker(
    broker: &str,
) -> Result<http1::SendRequest<Empty<Bytes>>, ConnectionError> {
    let tcp = TcpStream::connect(broker)
        .await
        .map_err(|err| ConnectionError::BrokerUnreachable {
            broker: broker.to_string(),
            message: err.to_string(),
        })?;

    let (sender, connection) = http1::handshake(TokioIo::new(tcp))
        .await
        .map_err(|err| ConnectionError::Setup(err.to_string()))?;

    let broker = broker.to_string();
    tokio::spawn(async move {
        if let Err(err) = connection.with_upgrades().await {
            flotilla_debug!("broker connection {} closed: {}", broker, err);
        }
    });

    Ok(sender)
}

/// HTTP/1.1 client running over a single tunnel.
pub(crate) struct TunnelTransport {
    sender: Mutex<http1::SendRequest<Empty<Bytes>>>,
}

impl TunnelTransport {
    /// Starts the client connection; the returned task owns the stream until aborted.
    pub(crate) async fn open(
        tunnel: Tunnel,
        label: String,
    ) -> Result<(Self, JoinHandle<()>), ConnectionError> {
        let (sender, connection) = http1::handshake(TokioIo::new(tunnel.stream))
            .await
            .map_err(|err| ConnectionError::Setup(err.to_string()))?;

        let task = tokio::spawn(async move {
            if let Err(err) = connection.await {
                flotilla_debug!("tunnel to {} closed: {}", label, err);
            }
        });

        Ok((
            Self {
                sender: Mutex::new(sender),
            },
            task,
        ))
    }
}

#[async_trait::async_trait]
impl Transport for TunnelTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, TransportError> {
        if request.scheme != HTTP {
            return Err(TransportError::UnsupportedScheme(request.scheme.clone()));
        }

        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(request.path.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers.clone());
            if !headers.contains_key(HOST) {
                let host = request
                    .target
                    .authority(request.port)
                    .parse::<http::HeaderValue>()
                    .map_err(|_| TransportError::Request("invalid host header".to_string()))?;
                headers.insert(HOST, host);
            }
        }
        let outgoing = builder
            .body(Empty::<Bytes>::new())
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let mut sender = self.sender.lock().await;
        sender
            .ready()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let response = sender
            .send_request(outgoing)
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let (parts, incoming) = response.into_parts();
        let content_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let body = incoming
            .into_data_stream()
            .map(|chunk| chunk.map_err(|err| TransportError::Body(err.to_string())));

        Ok(TransportResponse {
            status: parts.status,
            headers: parts.headers,
            content_length,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::upgrade_path;
    use crate::Target;

    #[test]
    fn upgrade_path_escapes_the_target_name() {
        assert_eq!(
            upgrade_path(&Target::new("pod-0", "10.0.0.1"), 8080),
            "/targets/pod-0/tunnel?port=8080"
        );
        assert_eq!(
            upgrade_path(&Target::new("web 1?/x%", "10.0.0.2"), 80),
            "/targets/web%201%3F%2Fx%25/tunnel?port=80"
        );
    }
}
