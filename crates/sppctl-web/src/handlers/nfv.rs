//! `/v1/nfvs/:sec_id` routes.

use super::{exit_process, forwarder, json_ok, no_content, parse_body, resolve_secondary, ApiResult};
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
};
use sppctl_core::ProcessType;
use std::sync::Arc;

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(sec_id): Path<String>,
) -> ApiResult {
    let proc = resolve_secondary(&state, ProcessType::Nfv, &sec_id).await?;
    let status = proc.status().await?;
    Ok(json_ok(status))
}

pub async fn forward(
    State(state): State<Arc<AppState>>,
    Path(sec_id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = resolve_secondary(&state, ProcessType::Nfv, &sec_id).await?;
    forwarder::forward(&proc, &body).await?;
    Ok(no_content())
}

pub async fn ports(
    State(state): State<Arc<AppState>>,
    Path(sec_id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = resolve_secondary(&state, ProcessType::Nfv, &sec_id).await?;
    forwarder::port(&proc, &body).await?;
    Ok(no_content())
}

pub async fn patch(
    State(state): State<Arc<AppState>>,
    Path(sec_id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = resolve_secondary(&state, ProcessType::Nfv, &sec_id).await?;
    forwarder::patch(&proc, &body).await?;
    Ok(no_content())
}

pub async fn patch_reset(
    State(state): State<Arc<AppState>>,
    Path(sec_id): Path<String>,
) -> ApiResult {
    let proc = resolve_secondary(&state, ProcessType::Nfv, &sec_id).await?;
    forwarder::patch_reset(&proc).await?;
    Ok(no_content())
}

pub async fn exit(State(state): State<Arc<AppState>>, Path(sec_id): Path<String>) -> ApiResult {
    let proc = resolve_secondary(&state, ProcessType::Nfv, &sec_id).await?;
    exit_process(&state, &proc).await
}
