//! `/v1/primary` routes.

use super::validation::{require_keys, require_name, require_object, require_u32};
use super::{exit_process, forwarder, json_ok, no_content, parse_body, ApiResult};
use crate::server::AppState;
use axum::{body::Bytes, extract::State};
use sppctl_core::{Command, LaunchCommand};
use std::sync::Arc;

pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult {
    let proc = state.controller.primary().await?;
    let status = proc.status().await?;
    Ok(json_ok(status))
}

pub async fn clear_status(State(state): State<Arc<AppState>>) -> ApiResult {
    let proc = state.controller.primary().await?;
    proc.execute(&Command::Clear).await?;
    Ok(no_content())
}

pub async fn forward(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = state.controller.primary().await?;
    forwarder::forward(&proc, &body).await?;
    Ok(no_content())
}

pub async fn ports(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = state.controller.primary().await?;
    forwarder::port(&proc, &body).await?;
    Ok(no_content())
}

pub async fn patch(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let body = parse_body(&body)?;
    let proc = state.controller.primary().await?;
    forwarder::patch(&proc, &body).await?;
    Ok(no_content())
}

pub async fn patch_reset(State(state): State<Arc<AppState>>) -> ApiResult {
    let proc = state.controller.primary().await?;
    forwarder::patch_reset(&proc).await?;
    Ok(no_content())
}

/// `PUT /v1/primary/launch {client_id, proc_name, eal, app}`
pub async fn launch(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let body = parse_body(&body)?;
    require_keys(&body, &["client_id", "proc_name", "eal", "app"])?;
    let proc = state.controller.primary().await?;

    let launch = LaunchCommand::compose(
        require_u32(&body, "client_id")?,
        require_name(&body, "proc_name")?,
        require_object(&body, "eal")?,
        require_object(&body, "app")?,
    )?;
    proc.execute(&Command::Launch(launch)).await?;
    Ok(no_content())
}

pub async fn exit(State(state): State<Arc<AppState>>) -> ApiResult {
    let proc = state.controller.primary().await?;
    exit_process(&state, &proc).await
}
