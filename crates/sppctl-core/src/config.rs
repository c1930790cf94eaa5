//! Centralized configuration for spp-ctl.
//!
//! Constant holders for the worker protocol, listening defaults and CPU
//! topology discovery, plus the runtime [`BrokerConfig`] assembled by the
//! binary from its command line.

use std::path::PathBuf;
use std::time::Duration;

/// Worker protocol configuration.
pub struct ProtocolConfig;

impl ProtocolConfig {
    /// Receive chunk size. A short read marks the end of a reply.
    pub const MSG_SIZE: usize = 4096;
    /// Reserved verb answered by secondaries with their identity.
    pub const GET_CLIENT_ID: &'static str = "_get_client_id";
    /// Upper bound on waiting for the first chunk of a reply.
    pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
    /// Registry key of the primary process.
    pub const PRIMARY_ID: u32 = 0;
}

/// Listening defaults.
pub struct ListenConfig;

impl ListenConfig {
    pub const BIND_ADDR: &'static str = "localhost";
    pub const PRIMARY_PORT: u16 = 5555;
    pub const SECONDARY_PORT: u16 = 6666;
    pub const API_PORT: u16 = 7777;
}

/// CPU topology discovery.
pub struct TopologyConfig;

impl TopologyConfig {
    pub const SYSFS_CPU_PATH: &'static str = "/sys/devices/system/cpu";
    /// Flag passed to an external layout helper.
    pub const HELPER_JSON_FLAG: &'static str = "--json";
}

/// Where the CPU layout is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSourceConfig {
    /// Read `cpuN/topology/*` under the given sysfs directory.
    Sysfs(PathBuf),
    /// Run an external helper executable with `--json`.
    Helper(PathBuf),
}

impl Default for LayoutSourceConfig {
    fn default() -> Self {
        LayoutSourceConfig::Sysfs(PathBuf::from(TopologyConfig::SYSFS_CPU_PATH))
    }
}

/// Runtime settings of a broker instance.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub bind_addr: String,
    pub primary_port: u16,
    pub secondary_port: u16,
    pub api_port: u16,
    pub command_timeout: Duration,
    pub layout_source: LayoutSourceConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ListenConfig::BIND_ADDR.to_string(),
            primary_port: ListenConfig::PRIMARY_PORT,
            secondary_port: ListenConfig::SECONDARY_PORT,
            api_port: ListenConfig::API_PORT,
            command_timeout: ProtocolConfig::COMMAND_TIMEOUT,
            layout_source: LayoutSourceConfig::default(),
        }
    }
}

impl BrokerConfig {
    /// Reject settings the broker cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.command_timeout.is_zero() {
            return Err(crate::BrokerError::Config {
                message: "command timeout must be greater than zero".to_string(),
            });
        }
        let ports = [self.primary_port, self.secondary_port, self.api_port];
        for (i, port) in ports.iter().enumerate() {
            if *port != 0 && ports[i + 1..].contains(port) {
                return Err(crate::BrokerError::Config {
                    message: format!("port {} is assigned to more than one listener", port),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = BrokerConfig::default();
        assert_eq!(config.primary_port, 5555);
        assert_eq!(config.secondary_port, 6666);
        assert_eq!(config.api_port, 7777);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_ports_rejected() {
        let config = BrokerConfig {
            secondary_port: 5555,
            ..BrokerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ephemeral_ports_allowed() {
        let config = BrokerConfig {
            primary_port: 0,
            secondary_port: 0,
            api_port: 0,
            ..BrokerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = BrokerConfig {
            command_timeout: Duration::ZERO,
            ..BrokerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
