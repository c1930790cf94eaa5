//! HTTP server implementation using Axum.

use crate::handlers::{broker, components, nfv, pcap, primary};
use axum::{
    routing::{get, put},
    Router,
};
use sppctl_core::{Controller, ProcessType};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    pub controller: Arc<Controller>,
}

/// Build the `/v1` route tree.
pub fn build_router(controller: Arc<Controller>) -> Router {
    let state = Arc::new(AppState { controller });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let primary_routes = Router::new()
        .route("/", get(primary::get_status).delete(primary::exit))
        .route(
            "/status",
            get(primary::get_status).delete(primary::clear_status),
        )
        .route("/forward", put(primary::forward))
        .route("/ports", put(primary::ports))
        .route("/patches", put(primary::patch).delete(primary::patch_reset))
        .route("/launch", put(primary::launch));

    let nfv_routes = Router::new()
        .route("/:sec_id", get(nfv::get_status).delete(nfv::exit))
        .route("/:sec_id/forward", put(nfv::forward))
        .route("/:sec_id/ports", put(nfv::ports))
        .route("/:sec_id/patches", put(nfv::patch).delete(nfv::patch_reset));

    let vf_routes = components::routes(ProcessType::Vf).route(
        "/:sec_id/classifier_table",
        put(components::classifier_table),
    );

    let pcap_routes = Router::new()
        .route("/:sec_id", get(pcap::get_status).delete(pcap::exit))
        .route("/:sec_id/capture", put(pcap::capture));

    let v1 = Router::new()
        .route("/processes", get(broker::processes))
        .route("/cpu_usage", get(broker::cpu_usage))
        .route("/cpu_layout", get(broker::cpu_layout))
        .route("/cpu_unused", get(broker::cpu_unused))
        .nest("/primary", primary_routes)
        .nest("/nfvs", nfv_routes)
        .nest("/vfs", vf_routes)
        .nest("/mirrors", components::routes(ProcessType::Mirror))
        .nest("/pcaps", pcap_routes);

    Router::new()
        .nest("/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the REST gateway.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    controller: Arc<Controller>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(controller);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let actual_addr = listener.local_addr()?;

    info!("REST API listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("REST API server error: {}", e);
        }
    });

    Ok(actual_addr)
}
