//! HTTP route handlers for the relay.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Health check
//!
//! # Slash command (form payload)
//! POST /api/command                   - `/jenkins ...`
//!
//! # Dialog callbacks (JSON, require Mattermost-User-ID)
//! POST /api/triggerBuild/{job_name}   - Build with submitted parameters
//! POST /api/createJob                 - Create job named in the dialog
//! POST /api/createJob/{job_name}      - Create the named job
//! ```

pub mod command;
pub mod dialogs;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Create all relay routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(command::router())
        .merge(dialogs::router())
}
