//! HTTP handler definitions for the remote library server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod xmlrpc;

pub use health::{health_handler, readiness_handler};
pub use xmlrpc::xmlrpc_handler;

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownCoordinator;
use crate::service::RemoteLibraryService;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Remote library dispatcher.
    pub service: RemoteLibraryService,
    /// Health state and remote shutdown scheduling.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
