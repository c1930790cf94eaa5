//! `/v1/pcaps/:sec_id` routes.

use super::validation::require_choice;
use super::{exit_process, json_ok, no_content, parse_body, resolve_secondary, ApiResult};
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
};
use sppctl_core::{BrokerError, Command, ProcessType};
use std::sync::Arc;

/// Returns the `info` object of the capture status.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(sec_id): Path<String>,
) -> ApiResult {
    let proc = resolve_secondary(&state, ProcessType::Pcap, &sec_id).await?;
    let mut status = proc.status().await?;
    let info = status
        .get_mut("info")
        .map(serde_json::Value::take)
        .ok_or_else(|| BrokerError::Other(format!("{}: status without info", proc.label())))?;
    Ok(json_ok(info))
}

/// `PUT /v1/pcaps/:sec_id/capture {action: start|stop}`
pub async fn capture(
    State(state): State<Arc<AppState>>,
    Path(sec_id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = resolve_secondary(&state, ProcessType::Pcap, &sec_id).await?;
    let command = match require_choice(&body, "action", &["start", "stop"])? {
        "start" => Command::Start,
        _ => Command::Stop,
    };
    proc.execute(&command).await?;
    Ok(no_content())
}

pub async fn exit(State(state): State<Arc<AppState>>, Path(sec_id): Path<String>) -> ApiResult {
    let proc = resolve_secondary(&state, ProcessType::Pcap, &sec_id).await?;
    exit_process(&state, &proc).await
}
