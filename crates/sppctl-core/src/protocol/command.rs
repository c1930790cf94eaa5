//! Command vocabulary of the worker processes.
//!
//! Every command renders to a single newline-free line of space separated
//! tokens. Which commands a process understands depends on its type; the
//! mapping lives in [`Command::supported_by`].

use super::launch::LaunchCommand;
use crate::config::ProtocolConfig;
use crate::types::{ComponentKind, Direction, MacAddress, PortUid, ProcessType, VlanOp};
use std::fmt;

/// Whether `s` can stand as one token of a command line.
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Add or remove a classifier table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    Add,
    Del,
}

impl TableAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableAction::Add => "add",
            TableAction::Del => "del",
        }
    }
}

/// A classifier table entry keyed by MAC, optionally within a VLAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierEntry {
    Mac {
        mac: MacAddress,
        port: PortUid,
    },
    Vlan {
        vlan: u16,
        mac: MacAddress,
        port: PortUid,
    },
}

/// A command sent to a worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Identification handshake sent to freshly accepted secondaries.
    GetClientId,
    Status,
    /// Clear port statistics (primary).
    Clear,
    AddPort(PortUid),
    DelPort(PortUid),
    Patch {
        src: PortUid,
        dst: PortUid,
    },
    PatchReset,
    Forward,
    Stop,
    /// Start capturing (pcap).
    Start,
    Exit,
    Launch(LaunchCommand),
    ComponentStart {
        name: String,
        core: u32,
        kind: ComponentKind,
    },
    ComponentStop {
        name: String,
    },
    ComponentPortAdd {
        port: PortUid,
        dir: Direction,
        component: String,
        vlan: VlanOp,
    },
    ComponentPortDel {
        port: PortUid,
        dir: Direction,
        component: String,
    },
    ClassifierTable {
        action: TableAction,
        entry: ClassifierEntry,
    },
}

impl Command {
    /// Whether a process of type `kind` understands this command.
    pub fn supported_by(&self, kind: ProcessType) -> bool {
        use ProcessType::*;
        match self {
            Command::Status | Command::Exit => true,
            Command::GetClientId => kind.is_secondary(),
            Command::Clear | Command::Launch(_) => kind == Primary,
            Command::AddPort(_)
            | Command::DelPort(_)
            | Command::Patch { .. }
            | Command::PatchReset
            | Command::Forward => matches!(kind, Primary | Nfv),
            Command::Stop => matches!(kind, Primary | Nfv | Pcap),
            Command::Start => kind == Pcap,
            Command::ComponentStart { kind: component, .. } => {
                ComponentKind::allowed_for(kind).contains(component)
            }
            Command::ComponentStop { .. } | Command::ComponentPortDel { .. } => {
                matches!(kind, Vf | Mirror)
            }
            Command::ComponentPortAdd { vlan, .. } => match vlan {
                VlanOp::None => matches!(kind, Vf | Mirror),
                _ => kind == Vf,
            },
            Command::ClassifierTable { .. } => kind == Vf,
        }
    }

    /// Leading verb, used in log and error messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::GetClientId => ProtocolConfig::GET_CLIENT_ID,
            Command::Status => "status",
            Command::Clear => "clear",
            Command::AddPort(_) | Command::ComponentPortAdd { .. } => "add",
            Command::DelPort(_) | Command::ComponentPortDel { .. } => "del",
            Command::Patch { .. } | Command::PatchReset => "patch",
            Command::Forward => "forward",
            Command::Stop | Command::ComponentStop { .. } => "stop",
            Command::Start | Command::ComponentStart { .. } => "start",
            Command::Exit => "exit",
            Command::Launch(_) => "launch",
            Command::ClassifierTable { .. } => "classifier_table",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GetClientId => f.write_str(ProtocolConfig::GET_CLIENT_ID),
            Command::Status => f.write_str("status"),
            Command::Clear => f.write_str("clear"),
            Command::AddPort(port) => write!(f, "add {}", port),
            Command::DelPort(port) => write!(f, "del {}", port),
            Command::Patch { src, dst } => write!(f, "patch {} {}", src, dst),
            Command::PatchReset => f.write_str("patch reset"),
            Command::Forward => f.write_str("forward"),
            Command::Stop => f.write_str("stop"),
            Command::Start => f.write_str("start"),
            Command::Exit => f.write_str("exit"),
            Command::Launch(launch) => write!(f, "{}", launch),
            Command::ComponentStart { name, core, kind } => {
                write!(f, "component start {} {} {}", name, core, kind)
            }
            Command::ComponentStop { name } => write!(f, "component stop {}", name),
            Command::ComponentPortAdd {
                port,
                dir,
                component,
                vlan,
            } => {
                write!(f, "port add {} {} {}", port, dir, component)?;
                match vlan {
                    VlanOp::None => Ok(()),
                    VlanOp::Add { id, pcp } => write!(f, " add_vlantag {} {}", id, pcp),
                    VlanOp::Del => f.write_str(" del_vlantag"),
                }
            }
            Command::ComponentPortDel {
                port,
                dir,
                component,
            } => write!(f, "port del {} {} {}", port, dir, component),
            Command::ClassifierTable { action, entry } => match entry {
                ClassifierEntry::Mac { mac, port } => {
                    write!(f, "classifier_table {} mac {} {}", action.as_str(), mac, port)
                }
                ClassifierEntry::Vlan { vlan, mac, port } => write!(
                    f,
                    "classifier_table {} vlan {} {} {}",
                    action.as_str(),
                    vlan,
                    mac,
                    port
                ),
            },
        }
    }
}
