//! spp-ctl core - control-plane broker for SPP worker processes.
//!
//! This crate accepts TCP connections from the primary and secondary worker
//! processes, identifies them, and serializes commands to each of them. It has
//! no HTTP layer; the REST gateway lives in `sppctl-web`.
//!
//! # Example
//!
//! ```rust,no_run
//! use sppctl_core::{BrokerConfig, Controller};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> sppctl_core::Result<()> {
//!     let config = BrokerConfig::default();
//!     let controller = Arc::new(Controller::new(&config));
//!     let _listeners = controller.listen(&config).await?;
//!
//!     for entry in controller.list_processes().await {
//!         println!("{:?} {:?}", entry.kind, entry.client_id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod process;
pub mod protocol;
pub mod topology;
pub mod types;

pub use config::{BrokerConfig, LayoutSourceConfig};
pub use controller::{Controller, ListenerHandle, ProcessEntry, Registry};
pub use error::{BrokerError, Result};
pub use process::Process;
pub use protocol::{ClassifierEntry, Command, LaunchCommand, TableAction};
pub use topology::{CpuUsage, SocketLayout, UnusedLcores};
pub use types::{ComponentKind, Direction, MacAddress, PortKind, PortUid, ProcessType, VlanOp};
