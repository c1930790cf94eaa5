//! spp-ctl REST gateway.
//!
//! Exposes the `/v1` HTTP API on top of a [`sppctl_core::Controller`]. The
//! `spp-ctl` binary wires this to the worker listeners; tests build the router
//! directly.

pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, AppState};
