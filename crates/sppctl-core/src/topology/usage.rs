//! Lcore accounting over process status replies.

use super::layout::SocketLayout;
use crate::types::ProcessType;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Lcores claimed by one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuUsage {
    #[serde(rename = "proc-type")]
    pub proc_type: ProcessType,
    #[serde(rename = "client-id", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u32>,
    #[serde(rename = "master-lcore")]
    pub master_lcore: u32,
    pub lcores: Vec<u32>,
}

fn as_lcore(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|v| u32::try_from(v).ok())
}

fn as_lcores(value: &Value) -> Option<Vec<u32>> {
    value.as_array()?.iter().map(as_lcore).collect()
}

/// Derive lcore usage from a `status` reply.
///
/// Returns `None` when the reply lacks the fields the process type reports.
pub fn usage_from_status(kind: ProcessType, id: u32, status: &Value) -> Option<CpuUsage> {
    match kind {
        ProcessType::Primary => {
            let lcores = as_lcores(status.get("lcores")?)?;
            let master_lcore = match status.get("master-lcore") {
                Some(master) => as_lcore(master)?,
                None => *lcores.first()?,
            };
            Some(CpuUsage {
                proc_type: kind,
                client_id: None,
                master_lcore,
                lcores,
            })
        }
        ProcessType::Nfv => Some(CpuUsage {
            proc_type: kind,
            client_id: Some(id),
            master_lcore: as_lcore(status.get("master-lcore")?)?,
            lcores: as_lcores(status.get("lcores")?)?,
        }),
        ProcessType::Vf | ProcessType::Mirror | ProcessType::Pcap => {
            let info = status.get("info")?;
            let master_lcore = as_lcore(info.get("master-lcore")?)?;
            let mut lcores = vec![master_lcore];
            for core in info.get("core")?.as_array()? {
                lcores.push(as_lcore(core.get("core")?)?);
            }
            Some(CpuUsage {
                proc_type: kind,
                client_id: Some(id),
                master_lcore,
                lcores,
            })
        }
    }
}

/// Unused lcores of one socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedLcores {
    pub socket_id: u32,
    pub lcores: Vec<u32>,
}

/// Lcores of every socket not claimed by any process.
///
/// With `master_lcore` set, only lcores with a greater id are kept, as slave
/// lcores must be numbered above their master.
pub fn unused_lcores(
    layout: &[SocketLayout],
    usage: &[CpuUsage],
    master_lcore: Option<u32>,
) -> Vec<UnusedLcores> {
    let claimed: BTreeSet<u32> = usage
        .iter()
        .flat_map(|u| std::iter::once(u.master_lcore).chain(u.lcores.iter().copied()))
        .collect();

    layout
        .iter()
        .map(|socket| UnusedLcores {
            socket_id: socket.socket_id,
            lcores: socket
                .lcores()
                .into_iter()
                .filter(|lcore| !claimed.contains(lcore))
                .filter(|lcore| master_lcore.map_or(true, |master| *lcore > master))
                .collect(),
        })
        .collect()
}

/// Pick `count` slave lcores above `master_lcore`, lowest ids first.
///
/// Returns `None` when fewer than `count` remain.
pub fn pick_slave_lcores(unused: &[UnusedLcores], master_lcore: u32, count: usize) -> Option<Vec<u32>> {
    let mut eligible: Vec<u32> = unused
        .iter()
        .flat_map(|socket| socket.lcores.iter().copied())
        .filter(|lcore| *lcore > master_lcore)
        .collect();
    eligible.sort_unstable();
    eligible.dedup();

    (eligible.len() >= count).then(|| eligible.into_iter().take(count).collect())
}
