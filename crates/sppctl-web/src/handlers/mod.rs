//! REST handlers, split by resource family.
//!
//! Handlers parse the body before resolving the target process, so a malformed
//! request is rejected even when the process is gone.

pub mod broker;
pub mod components;
pub mod forwarder;
pub mod nfv;
pub mod pcap;
pub mod primary;
pub mod validation;

use crate::server::AppState;
use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use sppctl_core::{BrokerError, Process, ProcessType};
use std::sync::Arc;
use tracing::{debug, error};

/// A broker error on its way to the HTTP caller.
#[derive(Debug)]
pub struct ApiError(pub BrokerError);

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self.0 {
            BrokerError::Protocol { message, payload } => {
                debug!("command error: {}", message);
                (status, Json(payload)).into_response()
            }
            err => {
                if status.is_server_error() {
                    error!("{}", err);
                }
                (status, err.to_string()).into_response()
            }
        }
    }
}

pub type ApiResult = std::result::Result<Response, ApiError>;

/// Decode a request body as JSON whatever its content type.
pub fn parse_body(body: &Bytes) -> sppctl_core::Result<Value> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| BrokerError::key_invalid("body", e))?;
    debug!("body: {}", value);
    Ok(value)
}

/// 204 for calls without a payload.
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// 200 with a JSON payload.
pub fn json_ok<T: Serialize>(payload: T) -> Response {
    (StatusCode::OK, Json(payload)).into_response()
}

/// Resolve a secondary by the raw `sec_id` path segment.
///
/// A segment that is not an id is reported like an unknown id.
pub async fn resolve_secondary(
    state: &AppState,
    kind: ProcessType,
    sec_id: &str,
) -> sppctl_core::Result<Arc<Process>> {
    let id: u32 = sec_id
        .parse()
        .map_err(|_| BrokerError::not_found(format!("sec_id {}", sec_id)))?;
    state.controller.secondary(kind, id).await
}

/// Send `exit` to a process and unregister it.
pub async fn exit_process(state: &AppState, proc: &Arc<Process>) -> ApiResult {
    state.controller.exit(proc).await?;
    Ok(no_content())
}
