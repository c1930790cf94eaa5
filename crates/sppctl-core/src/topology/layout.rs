//! CPU layout discovery.

use crate::config::{LayoutSourceConfig, TopologyConfig};
use crate::error::{BrokerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Physical core and its hyperthread siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreLayout {
    pub core_id: u32,
    pub lcores: Vec<u32>,
}

/// One CPU socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketLayout {
    pub socket_id: u32,
    pub cores: Vec<CoreLayout>,
}

impl SocketLayout {
    /// Every lcore on this socket, ascending.
    pub fn lcores(&self) -> Vec<u32> {
        let mut lcores: Vec<u32> = self
            .cores
            .iter()
            .flat_map(|core| core.lcores.iter().copied())
            .collect();
        lcores.sort_unstable();
        lcores
    }
}

/// Source of the host CPU layout.
#[async_trait::async_trait]
pub trait LayoutSource: Send + Sync + 'static {
    /// Read the layout. Fails with `LayoutUnavailable`.
    async fn layout(&self) -> Result<Vec<SocketLayout>>;
}

/// Build the layout source selected by configuration.
pub fn layout_source(config: &LayoutSourceConfig) -> Arc<dyn LayoutSource> {
    match config {
        LayoutSourceConfig::Sysfs(root) => Arc::new(SysfsLayout::new(root.clone())),
        LayoutSourceConfig::Helper(program) => Arc::new(HelperLayout::new(program.clone())),
    }
}

/// Reads `cpuN/topology/{core_id,physical_package_id}` under a sysfs root.
#[derive(Debug, Clone)]
pub struct SysfsLayout {
    root: PathBuf,
}

impl SysfsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_blocking(root: &Path) -> Result<Vec<SocketLayout>> {
        let kernel_max: u32 = read_number(&root.join("kernel_max")).ok_or_else(|| {
            BrokerError::LayoutUnavailable {
                message: format!("cannot read {}/kernel_max", root.display()),
            }
        })?;

        let mut core_map: BTreeMap<(u32, u32), Vec<u32>> = BTreeMap::new();
        for cpu in 0..=kernel_max {
            let topology = root.join(format!("cpu{}", cpu)).join("topology");
            let Some(core_id) = read_number(&topology.join("core_id")) else {
                continue;
            };
            let Some(socket_id) = read_number(&topology.join("physical_package_id")) else {
                continue;
            };
            core_map.entry((socket_id, core_id)).or_default().push(cpu);
        }

        let mut sockets: Vec<SocketLayout> = Vec::new();
        for ((socket_id, core_id), lcores) in core_map {
            let core = CoreLayout { core_id, lcores };
            match sockets.last_mut() {
                Some(socket) if socket.socket_id == socket_id => socket.cores.push(core),
                _ => sockets.push(SocketLayout {
                    socket_id,
                    cores: vec![core],
                }),
            }
        }
        Ok(sockets)
    }
}

fn read_number(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[async_trait::async_trait]
impl LayoutSource for SysfsLayout {
    async fn layout(&self) -> Result<Vec<SocketLayout>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::read_blocking(&root))
            .await
            .map_err(|e| BrokerError::LayoutUnavailable {
                message: format!("sysfs reader failed: {}", e),
            })?
    }
}

/// Runs an external helper that prints the layout as JSON.
#[derive(Debug, Clone)]
pub struct HelperLayout {
    program: PathBuf,
}

impl HelperLayout {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait::async_trait]
impl LayoutSource for HelperLayout {
    async fn layout(&self) -> Result<Vec<SocketLayout>> {
        let unavailable = |message: String| BrokerError::LayoutUnavailable { message };

        let output = tokio::process::Command::new(&self.program)
            .arg(TopologyConfig::HELPER_JSON_FLAG)
            .output()
            .await
            .map_err(|e| unavailable(format!("{}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            return Err(unavailable(format!(
                "{} exited with {}",
                self.program.display(),
                output.status
            )));
        }
        debug!(
            "layout helper output: {}",
            String::from_utf8_lossy(&output.stdout)
        );

        serde_json::from_slice(&output.stdout)
            .map_err(|e| unavailable(format!("invalid layout JSON: {}", e)))
    }
}
