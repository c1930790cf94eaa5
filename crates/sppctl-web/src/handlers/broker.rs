//! Broker-wide reads: processes and CPU accounting.

use super::{json_ok, ApiResult};
use crate::server::AppState;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use sppctl_core::topology::pick_slave_lcores;
use sppctl_core::UnusedLcores;
use std::sync::Arc;
use tracing::info;

pub async fn processes(State(state): State<Arc<AppState>>) -> ApiResult {
    info!("get processes called.");
    Ok(json_ok(state.controller.list_processes().await))
}

pub async fn cpu_usage(State(state): State<Arc<AppState>>) -> ApiResult {
    info!("get cpu usage called.");
    Ok(json_ok(state.controller.cpu_usage().await))
}

pub async fn cpu_layout(State(state): State<Arc<AppState>>) -> ApiResult {
    info!("get cpu layout called.");
    Ok(json_ok(state.controller.cpu_layout().await))
}

#[derive(Debug, Deserialize)]
pub struct CpuUnusedQuery {
    pub master_lcore: Option<u32>,
    /// Number of slave lcores wanted; all eligible ones when absent.
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
struct CpuUnused {
    sockets: Vec<UnusedLcores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slave_lcores: Option<Vec<u32>>,
}

/// `GET /v1/cpu_unused?master_lcore=N&count=M`
///
/// `slave_lcores` is empty when fewer than `count` lcores are free.
pub async fn cpu_unused(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CpuUnusedQuery>,
) -> ApiResult {
    let sockets = state.controller.unused_lcores(query.master_lcore).await;
    let slave_lcores = query.master_lcore.map(|master| {
        let eligible = sockets.iter().map(|socket| socket.lcores.len()).sum();
        let count = query.count.unwrap_or(eligible);
        pick_slave_lcores(&sockets, master, count).unwrap_or_default()
    });
    Ok(json_ok(CpuUnused {
        sockets,
        slave_lcores,
    }))
}
