use http::{HeaderMap, Method, StatusCode};

use crate::TargetFailure;

/// A declared port on a target: requests for `port` are served on `target_port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub port: u16,
    pub target_port: u16,
}

/// One backend instance behind a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub address: String,
    pub ports: Vec<PortMapping>,
}

impl Target {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ports: Vec::new(),
        }
    }

    pub fn with_ports(mut self, ports: Vec<PortMapping>) -> Self {
        self.ports = ports;
        self
    }

    /// Maps a requested port through the declared ports; unknown ports pass through.
    pub fn resolve_port(&self, requested: u16) -> u16 {
        self.ports
            .iter()
            .find(|mapping| mapping.port == requested)
            .map(|mapping| mapping.target_port)
            .unwrap_or(requested)
    }

    /// `host:port` with IPv6 literals bracketed.
    pub fn authority(&self, port: u16) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{port}", self.address)
        } else {
            format!("{}:{port}", self.address)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub scheme: String,
    pub port: u16,
    /// Path plus optional query, always starting with `/`.
    pub path: String,
    pub headers: HeaderMap,
    pub target: Target,
}

impl RequestDescriptor {
    pub fn url(&self) -> String {
        format!(
            "{}://{}{}",
            self.scheme,
            self.target.authority(self.port),
            self.path
        )
    }

    /// Row subtitle: `METHOD scheme://host:port/path`.
    pub fn subtitle(&self) -> String {
        format!("{} {}", self.method, self.url())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TargetResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Final result for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub target: Target,
    pub result: Result<TargetResponse, TargetFailure>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn response(&self) -> Option<&TargetResponse> {
        self.result.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&TargetFailure> {
        self.result.as_ref().err()
    }
}

#[cfg(test)]
mod tests {
    use super::{PortMapping, Target};

    #[test]
    fn declared_port_is_mapped_to_target_port() {
        let target = Target::new("api-0", "10.1.2.3").with_ports(vec![
            PortMapping {
                port: 80,
                target_port: 8080,
            },
            PortMapping {
                port: 443,
                target_port: 8443,
            },
        ]);
        assert_eq!(target.resolve_port(80), 8080);
        assert_eq!(target.resolve_port(443), 8443);
        assert_eq!(target.resolve_port(9000), 9000);
    }

    #[test]
    fn ipv6_authority_is_bracketed() {
        assert_eq!(Target::new("a", "fd00::1").authority(80), "[fd00::1]:80");
        assert_eq!(Target::new("a", "10.0.0.1").authority(80), "10.0.0.1:80");
    }
}
