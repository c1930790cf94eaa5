//! Connection manager.
//!
//! The [`Controller`] owns the process registry, accepts worker connections
//! (see `listen`) and provides the broker-wide reads. Reads that query worker
//! status also prune secondaries whose connection turned out to be dead.

mod listener;
mod registry;

pub use listener::ListenerHandle;
pub use registry::Registry;

use crate::config::BrokerConfig;
use crate::error::Result;
use crate::process::Process;
use crate::topology::{
    layout_source, unused_lcores, usage_from_status, CpuUsage, LayoutSource, SocketLayout,
    UnusedLcores,
};
use crate::types::ProcessType;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Entry of the process listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessEntry {
    #[serde(rename = "type")]
    pub kind: ProcessType,
    #[serde(rename = "client-id", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u32>,
}

impl ProcessEntry {
    fn of(proc: &Process) -> Self {
        Self {
            kind: proc.kind(),
            client_id: proc.kind().is_secondary().then_some(proc.id()),
        }
    }
}

/// Connection manager and owner of the process registry.
pub struct Controller {
    registry: Registry,
    command_timeout: Duration,
    layout: Arc<dyn LayoutSource>,
}

impl Controller {
    pub fn new(config: &BrokerConfig) -> Self {
        Self::with_layout_source(config.command_timeout, layout_source(&config.layout_source))
    }

    pub fn with_layout_source(command_timeout: Duration, layout: Arc<dyn LayoutSource>) -> Self {
        Self {
            registry: Registry::new(),
            command_timeout,
            layout,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn primary(&self) -> Result<Arc<Process>> {
        self.registry.primary().await
    }

    pub async fn secondary(&self, kind: ProcessType, id: u32) -> Result<Arc<Process>> {
        self.registry.secondary(kind, id).await
    }

    /// Query the status of every process in `procs` and drop dead secondaries.
    ///
    /// Returns the surviving processes with their status outcome. Only a
    /// transport failure on a connection nothing replaced counts as dead;
    /// the primary is never removed.
    async fn sweep(&self, procs: Vec<Arc<Process>>) -> Vec<(Arc<Process>, Result<Value>)> {
        let statuses = join_all(procs.iter().map(|proc| proc.status())).await;

        let mut alive = Vec::with_capacity(procs.len());
        for (proc, status) in procs.into_iter().zip(statuses) {
            if let Err(e) = &status {
                if e.is_transport() && proc.kind().is_secondary() {
                    error!("{}", e);
                    if self.unregister_dead(&proc).await {
                        continue;
                    }
                }
            }
            alive.push((proc, status));
        }
        alive
    }

    /// Unregister `proc` unless a new connection was installed meanwhile.
    async fn unregister_dead(&self, proc: &Arc<Process>) -> bool {
        if !proc.retire_if_disconnected().await {
            info!("{} reconnected; keeping it", proc.label());
            return false;
        }
        if self.registry.remove_if_same(proc).await {
            info!("Removed unreachable {}", proc.label());
        }
        true
    }

    /// List registered processes after pruning dead secondaries.
    pub async fn list_processes(&self) -> Vec<ProcessEntry> {
        let secondaries = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .filter(|proc| proc.kind().is_secondary())
            .collect();
        self.sweep(secondaries).await;

        self.registry
            .snapshot()
            .await
            .iter()
            .map(|proc| ProcessEntry::of(proc))
            .collect()
    }

    /// Lcore usage reported by every process.
    pub async fn cpu_usage(&self) -> Vec<CpuUsage> {
        let procs = self.registry.snapshot().await;
        let mut usage = Vec::new();
        for (proc, status) in self.sweep(procs).await {
            let status = match status {
                Ok(status) => status,
                Err(e) => {
                    warn!("cpu_usage: {}: {}", proc.label(), e);
                    continue;
                }
            };
            match usage_from_status(proc.kind(), proc.id(), &status) {
                Some(entry) => usage.push(entry),
                None => warn!("cpu_usage: {} reported no lcores", proc.label()),
            }
        }
        usage
    }

    /// Host CPU layout; empty when it cannot be read.
    pub async fn cpu_layout(&self) -> Vec<SocketLayout> {
        match self.layout.layout().await {
            Ok(layout) => layout,
            Err(e) => {
                error!("{}", e);
                Vec::new()
            }
        }
    }

    /// Lcores not claimed by any process, optionally above `master_lcore`.
    pub async fn unused_lcores(&self, master_lcore: Option<u32>) -> Vec<UnusedLcores> {
        let layout = self.cpu_layout().await;
        let usage = self.cpu_usage().await;
        unused_lcores(&layout, &usage, master_lcore)
    }

    /// Drop a process from the registry without touching its connection.
    pub async fn terminate(&self, kind: ProcessType, id: u32) -> bool {
        match self.registry.terminate(kind, id).await {
            Some(proc) => {
                info!("Terminated {}", proc.label());
                true
            }
            None => false,
        }
    }

    /// Send `exit`, then unregister and disconnect the process.
    ///
    /// A worker-reported error leaves the process registered; a transport
    /// failure removes it as dead unless the worker already reconnected.
    pub async fn exit(&self, proc: &Arc<Process>) -> Result<Value> {
        let outcome = proc.exit().await;
        match &outcome {
            Ok(_) => {
                proc.close().await;
                if self.registry.remove_if_same(proc).await {
                    info!("Terminated {}", proc.label());
                }
            }
            Err(e) if e.is_transport() => {
                self.unregister_dead(proc).await;
            }
            Err(_) => {}
        }
        outcome
    }
}
