//! Request body validation.
//!
//! Every check fails with `KeyRequired` when a key is missing and with
//! `KeyInvalid` when its value is outside the accepted set, so the gateway can
//! reject a request before anything is sent to a worker.

use serde_json::{Map, Value};
use sppctl_core::protocol::is_token;
use sppctl_core::{BrokerError, MacAddress, PortUid, Result, VlanOp};

/// Render a rejected value for an error message; strings appear unquoted.
fn shown(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Check that every key is present, reporting the first missing one.
pub fn require_keys(body: &Value, keys: &[&str]) -> Result<()> {
    match keys.iter().find(|key| body.get(**key).is_none()) {
        Some(key) => Err(BrokerError::key_required(*key)),
        None => Ok(()),
    }
}

pub fn require<'a>(body: &'a Value, key: &str) -> Result<&'a Value> {
    body.get(key).ok_or_else(|| BrokerError::key_required(key))
}

pub fn require_str<'a>(body: &'a Value, key: &str) -> Result<&'a str> {
    let value = require(body, key)?;
    value
        .as_str()
        .ok_or_else(|| BrokerError::key_invalid(key, shown(value)))
}

/// A name sent to a worker as one command token.
pub fn check_name<'a>(key: &str, name: &'a str) -> Result<&'a str> {
    if is_token(name) {
        Ok(name)
    } else {
        Err(BrokerError::key_invalid(key, name))
    }
}

pub fn require_name<'a>(body: &'a Value, key: &str) -> Result<&'a str> {
    check_name(key, require_str(body, key)?)
}

/// A string value from a fixed set of choices.
pub fn require_choice<'a>(body: &'a Value, key: &str, choices: &[&str]) -> Result<&'a str> {
    let value = require_str(body, key)?;
    if choices.contains(&value) {
        Ok(value)
    } else {
        Err(BrokerError::key_invalid(key, value))
    }
}

/// A non-negative JSON integer.
pub fn require_u32(body: &Value, key: &str) -> Result<u32> {
    let value = require(body, key)?;
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| BrokerError::key_invalid(key, shown(value)))
}

pub fn require_object<'a>(body: &'a Value, key: &str) -> Result<&'a Map<String, Value>> {
    let value = require(body, key)?;
    value
        .as_object()
        .ok_or_else(|| BrokerError::key_invalid(key, shown(value)))
}

/// A `type:index` port UID.
pub fn require_port(body: &Value, key: &str) -> Result<PortUid> {
    let value = require(body, key)?;
    let port = value
        .as_str()
        .ok_or_else(|| BrokerError::key_invalid(key, shown(value)))?;
    port.parse()
        .map_err(|_| BrokerError::key_invalid(key, port))
}

pub fn require_mac(body: &Value, key: &str) -> Result<MacAddress> {
    let mac = require_str(body, key)?;
    mac.parse().map_err(|_| BrokerError::key_invalid(key, mac))
}

/// An integer given either as a JSON number or as a decimal string.
fn as_integer<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    let n = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    T::try_from(n).ok()
}

/// The VLAN id of a classifier entry.
pub fn require_vlan_id(body: &Value, key: &str) -> Result<u16> {
    let value = body
        .get(key)
        .ok_or_else(|| BrokerError::key_invalid(key, "None"))?;
    as_integer(value).ok_or_else(|| BrokerError::key_invalid(key, shown(value)))
}

/// The optional `vlan` object of a port attachment.
///
/// Absent, null or empty means no tag operation.
pub fn optional_vlan_op(body: &Value) -> Result<VlanOp> {
    let Some(vlan) = body.get("vlan") else {
        return Ok(VlanOp::None);
    };
    let empty = match vlan {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Ok(VlanOp::None);
    }

    let invalid = || BrokerError::key_invalid("vlan", shown(vlan));
    match vlan.get("operation").and_then(Value::as_str) {
        Some("none") => Ok(VlanOp::None),
        Some("del") => Ok(VlanOp::Del),
        Some("add") => {
            let id = vlan.get("id").and_then(as_integer).ok_or_else(invalid)?;
            let pcp = vlan.get("pcp").and_then(as_integer).ok_or_else(invalid)?;
            Ok(VlanOp::Add { id, pcp })
        }
        _ => Err(invalid()),
    }
}
