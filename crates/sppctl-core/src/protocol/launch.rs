//! Composition of the primary's `launch` command.
//!
//! A launch request names a secondary application and carries two option
//! maps: EAL options and application options. Only allow-listed keys are
//! forwarded; anything else is dropped without error.

use super::command::is_token;
use crate::error::{BrokerError, Result};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// EAL options forwarded to a launched secondary, in emission order.
pub const EAL_OPTS: &[&str] = &[
    // lcores
    "-c",
    "-l",
    "--lcores",
    "--master-lcore",
    "-s",
    // devices
    "-b",
    "--pci-blacklist",
    "-w",
    "--pci-whitelist",
    "--vdev",
    "-d",
    "--no-pci",
    // multi-process
    "--proc-type",
    // memory
    "-n",
    "-r",
    "-m",
    "--in-memory",
    "--iova-mode",
    // debugging
    "--no-shconf",
    "--no-huge",
    "--log-level",
    "--file-prefix",
    // linux specific
    "--create-uio-dev",
    "--vmware-tsc-map",
    "--no-hpet",
    "--vfio-intr",
    "--base-virtaddr",
    "--legacy-mem",
    "--socket-mem",
    "--socket-limit",
    "--single-file-segments",
    "--huge-dir",
    "--huge-unlink",
    "--match-allocations",
    "--syslog",
];

/// At least one of these must be present in the EAL options.
pub const LCORE_OPTS: &[&str] = &["-c", "-l", "--lcores"];

/// Mandatory multi-process option.
pub const PROC_TYPE_OPT: &str = "--proc-type";

/// Application options forwarded per secondary application name.
pub fn app_opts(proc_name: &str) -> &'static [&'static str] {
    match proc_name {
        "spp_nfv" => &["-n", "-s", "--vhost-client"],
        "spp_vf" | "spp_mirror" => &["--client-id", "-s", "--vhost-client"],
        "spp_pcap" => &["--client-id", "-s", "-c", "--out-dir", "--fsize"],
        _ => &[],
    }
}

/// A fully composed `launch` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub client_id: u32,
    pub proc_name: String,
    pub eal: Vec<String>,
    pub app: Vec<String>,
}

impl LaunchCommand {
    /// Compose a launch command from raw option maps.
    ///
    /// Fails with `KeyRequired` when no lcore option or no `--proc-type` is
    /// given, and with `KeyInvalid` when the name or a forwarded value would
    /// not stay a single token on the command line.
    pub fn compose(
        client_id: u32,
        proc_name: impl Into<String>,
        eal: &Map<String, Value>,
        app: &Map<String, Value>,
    ) -> Result<Self> {
        let proc_name = proc_name.into();
        if !is_token(&proc_name) {
            return Err(BrokerError::key_invalid("proc_name", proc_name));
        }

        if !LCORE_OPTS.iter().any(|opt| eal.contains_key(*opt)) {
            return Err(BrokerError::key_required(LCORE_OPTS.join("|")));
        }
        if !eal.contains_key(PROC_TYPE_OPT) {
            return Err(BrokerError::key_required(PROC_TYPE_OPT));
        }

        for key in eal.keys().filter(|k| !EAL_OPTS.contains(&k.as_str())) {
            debug!("launch {}: dropping unsupported EAL option {}", proc_name, key);
        }
        let app_allowed = app_opts(&proc_name);
        for key in app.keys().filter(|k| !app_allowed.contains(&k.as_str())) {
            debug!("launch {}: dropping unsupported app option {}", proc_name, key);
        }

        Ok(Self {
            client_id,
            eal: collect_opts(EAL_OPTS, eal)?,
            app: collect_opts(app_allowed, app)?,
            proc_name,
        })
    }
}

fn collect_opts(allowed: &[&str], given: &Map<String, Value>) -> Result<Vec<String>> {
    let mut opts = Vec::new();
    for opt in allowed {
        let Some(value) = given.get(*opt) else {
            continue;
        };
        opts.push(opt.to_string());
        if let Some(value) = render_value(value) {
            if !is_token(&value) {
                return Err(BrokerError::key_invalid(*opt, value));
            }
            opts.push(value);
        }
    }
    Ok(opts)
}

/// Render an option value; `None` for flags without a value.
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "launch {} {} {} -- {}",
            self.client_id,
            self.proc_name,
            self.eal.join(" "),
            self.app.join(" ")
        )
    }
}
