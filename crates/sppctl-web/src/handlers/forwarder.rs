//! Port, patch and forwarding operations shared by the primary and `nfv`
//! secondaries.

use super::validation::{require_choice, require_keys, require_port};
use serde_json::Value;
use sppctl_core::{Command, Process, Result};

/// `PUT .../forward {action: start|stop}`
pub async fn forward(proc: &Process, body: &Value) -> Result<Value> {
    let command = match require_choice(body, "action", &["start", "stop"])? {
        "start" => Command::Forward,
        _ => Command::Stop,
    };
    proc.execute(&command).await
}

/// `PUT .../ports {action: add|del, port}`
pub async fn port(proc: &Process, body: &Value) -> Result<Value> {
    require_keys(body, &["action", "port"])?;
    let action = require_choice(body, "action", &["add", "del"])?;
    let port = require_port(body, "port")?;
    let command = match action {
        "add" => Command::AddPort(port),
        _ => Command::DelPort(port),
    };
    proc.execute(&command).await
}

/// `PUT .../patches {src, dst}`
pub async fn patch(proc: &Process, body: &Value) -> Result<Value> {
    require_keys(body, &["src", "dst"])?;
    let src = require_port(body, "src")?;
    let dst = require_port(body, "dst")?;
    proc.execute(&Command::Patch { src, dst }).await
}

/// `DELETE .../patches`
pub async fn patch_reset(proc: &Process) -> Result<Value> {
    proc.execute(&Command::PatchReset).await
}
