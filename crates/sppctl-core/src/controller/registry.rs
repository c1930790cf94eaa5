//! Live process registry.

use crate::config::ProtocolConfig;
use crate::error::{BrokerError, Result};
use crate::process::Process;
use crate::types::ProcessType;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Map from process id to process; the primary lives at
/// [`ProtocolConfig::PRIMARY_ID`].
///
/// The lock is never held across a worker round-trip.
#[derive(Debug, Default)]
pub struct Registry {
    procs: RwLock<BTreeMap<u32, Arc<Process>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: u32) -> Option<Arc<Process>> {
        self.procs.read().await.get(&id).cloned()
    }

    pub async fn primary(&self) -> Result<Arc<Process>> {
        self.get(ProtocolConfig::PRIMARY_ID)
            .await
            .ok_or_else(|| BrokerError::not_found("primary"))
    }

    /// Look up a secondary of the given type.
    pub async fn secondary(&self, kind: ProcessType, id: u32) -> Result<Arc<Process>> {
        match self.get(id).await {
            Some(proc) if proc.kind() == kind && kind.is_secondary() => Ok(proc),
            _ => Err(BrokerError::not_found(format!("sec_id {}", id))),
        }
    }

    /// Copy of the current entries, ordered by id.
    pub async fn snapshot(&self) -> Vec<Arc<Process>> {
        self.procs.read().await.values().cloned().collect()
    }

    /// Register a process, returning the entry it replaced.
    pub async fn insert(&self, proc: Arc<Process>) -> Option<Arc<Process>> {
        self.procs.write().await.insert(proc.id(), proc)
    }

    /// Remove `proc` unless its slot has since been taken by another process.
    pub async fn remove_if_same(&self, proc: &Arc<Process>) -> bool {
        let mut procs = self.procs.write().await;
        match procs.get(&proc.id()) {
            Some(current) if Arc::ptr_eq(current, proc) => {
                procs.remove(&proc.id());
                true
            }
            _ => false,
        }
    }

    /// Remove the entry matching both type and id.
    pub async fn terminate(&self, kind: ProcessType, id: u32) -> Option<Arc<Process>> {
        let mut procs = self.procs.write().await;
        match procs.get(&id) {
            Some(current) if current.kind() == kind => procs.remove(&id),
            _ => None,
        }
    }

    pub async fn len(&self) -> usize {
        self.procs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.procs.read().await.is_empty()
    }
}
