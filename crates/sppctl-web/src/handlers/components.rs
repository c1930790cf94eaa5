//! `/v1/vfs/:sec_id` and `/v1/mirrors/:sec_id` routes.
//!
//! Both process types run named components on lcores and attach ports to
//! them. Only `vf` has VLAN tagging and a classifier table.

use super::validation::{
    check_name, optional_vlan_op, require_choice, require_keys, require_mac, require_name,
    require_port, require_str, require_u32, require_vlan_id,
};
use super::{exit_process, json_ok, no_content, parse_body, resolve_secondary, ApiResult};
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use sppctl_core::{
    BrokerError, ClassifierEntry, Command, ComponentKind, Direction, PortKind, ProcessType,
    TableAction, VlanOp,
};
use std::sync::Arc;

/// Port types listed in a component process status.
const STATUS_PORT_TYPES: [PortKind; 3] = [PortKind::Phy, PortKind::Vhost, PortKind::Ring];

/// Routes shared by `vf` and `mirror`, relative to the collection.
pub fn routes(kind: ProcessType) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:sec_id",
            get(move |State(state): State<Arc<AppState>>, Path(sec_id): Path<String>| {
                get_info(state, kind, sec_id)
            })
            .delete(move |State(state): State<Arc<AppState>>, Path(sec_id): Path<String>| {
                exit(state, kind, sec_id)
            }),
        )
        .route(
            "/:sec_id/components",
            post(
                move |State(state): State<Arc<AppState>>,
                      Path(sec_id): Path<String>,
                      body: Bytes| { start_component(state, kind, sec_id, body) },
            ),
        )
        .route(
            "/:sec_id/components/:name",
            delete(
                move |State(state): State<Arc<AppState>>,
                      Path((sec_id, name)): Path<(String, String)>| {
                    stop_component(state, kind, sec_id, name)
                },
            ),
        )
        .route(
            "/:sec_id/components/:name/ports",
            put(
                move |State(state): State<Arc<AppState>>,
                      Path((sec_id, name)): Path<(String, String)>,
                      body: Bytes| { component_port(state, kind, sec_id, name, body) },
            ),
        )
}

/// Reshape the status `info` object for REST callers.
fn convert_info(status: &Value) -> Option<Value> {
    let info = status.get("info")?;
    let mut ports = Vec::new();
    for kind in STATUS_PORT_TYPES {
        for index in info.get(kind.as_str())?.as_array()? {
            ports.push(format!("{}:{}", kind.as_str(), index.as_u64()?));
        }
    }

    let mut converted = json!({
        "client-id": info.get("client-id")?,
        "ports": ports,
        "master-lcore": info.get("master-lcore")?,
        "components": info.get("core")?,
    });
    if let Some(table) = info.get("classifier_table") {
        converted["classifier_table"] = table.clone();
    }
    Some(converted)
}

async fn get_info(state: Arc<AppState>, kind: ProcessType, sec_id: String) -> ApiResult {
    let proc = resolve_secondary(&state, kind, &sec_id).await?;
    let status = proc.status().await?;
    let info = convert_info(&status)
        .ok_or_else(|| BrokerError::Other(format!("{}: malformed status", proc.label())))?;
    Ok(json_ok(info))
}

/// `POST .../components {name, core, type}`
async fn start_component(
    state: Arc<AppState>,
    kind: ProcessType,
    sec_id: String,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = resolve_secondary(&state, kind, &sec_id).await?;

    require_keys(&body, &["name", "core", "type"])?;
    let name = require_name(&body, "name")?;
    let core = require_u32(&body, "core")?;
    let component_type = require_str(&body, "type")?;
    let component = ComponentKind::parse_for(kind, component_type)
        .ok_or_else(|| BrokerError::key_invalid("type", component_type))?;

    proc.execute(&Command::ComponentStart {
        name: name.to_string(),
        core,
        kind: component,
    })
    .await?;
    Ok(no_content())
}

async fn stop_component(
    state: Arc<AppState>,
    kind: ProcessType,
    sec_id: String,
    name: String,
) -> ApiResult {
    let proc = resolve_secondary(&state, kind, &sec_id).await?;
    check_name("name", &name)?;
    proc.execute(&Command::ComponentStop { name }).await?;
    Ok(no_content())
}

/// `PUT .../components/:name/ports {action: attach|detach, port, dir, vlan?}`
async fn component_port(
    state: Arc<AppState>,
    kind: ProcessType,
    sec_id: String,
    name: String,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = resolve_secondary(&state, kind, &sec_id).await?;

    check_name("name", &name)?;
    require_keys(&body, &["action", "port", "dir"])?;
    let action = require_choice(&body, "action", &["attach", "detach"])?;
    let dir: Direction = require_choice(&body, "dir", &["rx", "tx"])?.parse()?;
    let port = require_port(&body, "port")?;

    let command = match action {
        "attach" => Command::ComponentPortAdd {
            port,
            dir,
            component: name,
            vlan: match kind {
                ProcessType::Vf => optional_vlan_op(&body)?,
                _ => VlanOp::None,
            },
        },
        _ => Command::ComponentPortDel {
            port,
            dir,
            component: name,
        },
    };
    proc.execute(&command).await?;
    Ok(no_content())
}

/// `PUT /v1/vfs/:sec_id/classifier_table {action, type, port, mac_address, vlan?}`
pub async fn classifier_table(
    State(state): State<Arc<AppState>>,
    Path(sec_id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = resolve_secondary(&state, ProcessType::Vf, &sec_id).await?;

    require_keys(&body, &["action", "type", "port", "mac_address"])?;
    let action = match require_choice(&body, "action", &["add", "del"])? {
        "add" => TableAction::Add,
        _ => TableAction::Del,
    };
    let entry_type = require_choice(&body, "type", &["mac", "vlan"])?;
    let port = require_port(&body, "port")?;
    let mac = require_mac(&body, "mac_address")?;

    let entry = match entry_type {
        "mac" => ClassifierEntry::Mac { mac, port },
        _ => ClassifierEntry::Vlan {
            vlan: require_vlan_id(&body, "vlan")?,
            mac,
            port,
        },
    };
    proc.execute(&Command::ClassifierTable { action, entry }).await?;
    Ok(no_content())
}

async fn exit(state: Arc<AppState>, kind: ProcessType, sec_id: String) -> ApiResult {
    let proc = resolve_secondary(&state, kind, &sec_id).await?;
    exit_process(&state, &proc).await
}
