//! services/expiry_worker/src/web/state.rs
//!
//! Defines the state shared by the ops HTTP handlers.

use crate::config::Config;
use crate::scheduler::SweepRunner;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<SweepRunner>,
    pub config: Arc<Config>,
}
