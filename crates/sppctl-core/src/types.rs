//! Domain types shared by the protocol, the registry and the REST gateway.

use crate::error::{BrokerError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Role of a connected worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    Primary,
    /// Forwarder secondary (`spp_nfv`).
    Nfv,
    /// Classifier/forwarder secondary (`spp_vf`).
    Vf,
    /// Mirror secondary (`spp_mirror`).
    Mirror,
    /// Capture secondary (`spp_pcap`).
    Pcap,
}

impl ProcessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessType::Primary => "primary",
            ProcessType::Nfv => "nfv",
            ProcessType::Vf => "vf",
            ProcessType::Mirror => "mirror",
            ProcessType::Pcap => "pcap",
        }
    }

    pub fn is_secondary(&self) -> bool {
        !matches!(self, ProcessType::Primary)
    }
}

impl FromStr for ProcessType {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "primary" => Ok(ProcessType::Primary),
            "nfv" => Ok(ProcessType::Nfv),
            "vf" => Ok(ProcessType::Vf),
            "mirror" => Ok(ProcessType::Mirror),
            "pcap" => Ok(ProcessType::Pcap),
            _ => Err(BrokerError::key_invalid("process_type", s)),
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port types accepted in a port UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Phy,
    Vhost,
    Ring,
    Pcap,
    NullPmd,
    Tap,
}

impl PortKind {
    pub const ALL: [PortKind; 6] = [
        PortKind::Phy,
        PortKind::Vhost,
        PortKind::Ring,
        PortKind::Pcap,
        PortKind::NullPmd,
        PortKind::Tap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PortKind::Phy => "phy",
            PortKind::Vhost => "vhost",
            PortKind::Ring => "ring",
            PortKind::Pcap => "pcap",
            PortKind::NullPmd => "nullpmd",
            PortKind::Tap => "tap",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

/// A `type:index` port identifier such as `ring:3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortUid {
    pub kind: PortKind,
    pub index: u32,
}

impl PortUid {
    pub fn new(kind: PortKind, index: u32) -> Self {
        Self { kind, index }
    }
}

impl FromStr for PortUid {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BrokerError::key_invalid("port", s);
        let (kind, index) = s.split_once(':').ok_or_else(invalid)?;
        let kind = PortKind::parse(kind).ok_or_else(invalid)?;
        let index = index.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { kind, index })
    }
}

impl fmt::Display for PortUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.index)
    }
}

/// Direction of a port attached to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Rx => "rx",
            Direction::Tx => "tx",
        }
    }

}

impl FromStr for Direction {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rx" => Ok(Direction::Rx),
            "tx" => Ok(Direction::Tx),
            _ => Err(BrokerError::key_invalid("dir", s)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker thread types started with `component start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Forward,
    Merge,
    Classifier,
    Mirror,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Forward => "forward",
            ComponentKind::Merge => "merge",
            ComponentKind::Classifier => "classifier",
            ComponentKind::Mirror => "mirror",
        }
    }

    /// Component types a process type can run.
    pub fn allowed_for(process: ProcessType) -> &'static [ComponentKind] {
        match process {
            ProcessType::Vf => &[
                ComponentKind::Forward,
                ComponentKind::Merge,
                ComponentKind::Classifier,
            ],
            ProcessType::Mirror => &[ComponentKind::Mirror],
            _ => &[],
        }
    }

    /// Parse a component type name valid for `process`.
    pub fn parse_for(process: ProcessType, s: &str) -> Option<Self> {
        Self::allowed_for(process)
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// VLAN tag operation applied when attaching a port to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VlanOp {
    #[default]
    None,
    Add {
        id: u16,
        pcp: u8,
    },
    Del,
}

/// A MAC address as accepted by the classifier table, or `default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacAddress(String);

impl MacAddress {
    pub const DEFAULT: &'static str = "default";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

static MAC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$|^(?:[0-9A-Fa-f]{2}-){5}[0-9A-Fa-f]{2}$")
        .expect("MAC address regex must compile")
});

impl FromStr for MacAddress {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self> {
        if s == Self::DEFAULT || MAC_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(BrokerError::key_invalid("mac_address", s))
        }
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
