use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use flotilla_core::DEFAULT_REFRESH_INTERVAL;
use flotilla_engine::{GroupMember, PortMapping, StaticDiscovery, Target};
use flotilla_logging::flotilla_info;
use serde::Deserialize;

const DEFAULT_CONFIG_FILENAME: &str = "flotilla.ron";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub refresh_interval_ms: Option<u64>,
    pub tunnel: Option<TunnelConfig>,
    pub groups: BTreeMap<String, Vec<MemberConfig>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TunnelConfig {
    /// Tried in order; later brokers are used when earlier ones cannot be reached.
    pub brokers: Vec<BrokerConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BrokerKind {
    Upgrade,
    Connect,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    pub kind: BrokerKind,
    /// `host:port`
    pub address: String,
    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberConfig {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub ports: Vec<(u16, u16)>,
    #[serde(default = "ready_by_default")]
    pub ready: bool,
}

fn ready_by_default() -> bool {
    true
}

impl Config {
    /// Loads the configuration file.
    ///
    /// An explicit path must exist. Without one, `./flotilla.ron` is read when
    /// present and an empty configuration is used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                if path.exists() {
                    Self::read(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        flotilla_info!(
            "loaded configuration {:?} with {} group(s)",
            path,
            config.groups.len()
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn refresh_interval(&self, override_ms: Option<u64>) -> Duration {
        override_ms
            .or(self.refresh_interval_ms)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL)
    }

    pub fn brokers(&self) -> &[BrokerConfig] {
        self.tunnel
            .as_ref()
            .map(|tunnel| tunnel.brokers.as_slice())
            .unwrap_or_default()
    }

    pub fn discovery(&self) -> StaticDiscovery {
        self.groups
            .iter()
            .fold(StaticDiscovery::new(), |discovery, (name, members)| {
                let members = members.iter().map(MemberConfig::to_member).collect();
                discovery.with_group(name.clone(), members)
            })
    }
}

impl MemberConfig {
    fn to_member(&self) -> GroupMember {
        let ports = self
            .ports
            .iter()
            .map(|&(port, target_port)| PortMapping { port, target_port })
            .collect();
        GroupMember {
            target: Target::new(self.name.clone(), self.address.clone()).with_ports(ports),
            ready: self.ready,
        }
    }
}
