//! Slash command endpoint.

use axum::{Form, Json, Router, extract::State, routing::post};
use tracing::instrument;

use crate::commands;
use crate::error::{AppError, set_sentry_user};
use crate::mattermost::{CommandResponse, SlashCommandRequest, verify_command_token};
use crate::state::AppState;

/// Create slash command routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/command", post(handle_command))
}

/// Handle a `/jenkins` slash command.
///
/// Mattermost posts the command as a form. When a verification token is
/// configured, requests carrying a different token are rejected.
#[instrument(skip_all, fields(user_id = %request.user_id))]
async fn handle_command(
    State(state): State<AppState>,
    Form(request): Form<SlashCommandRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let config = state.config();
    if let Some(expected) = &config.mattermost.command_token
        && !verify_command_token(expected, &request.token)
    {
        return Err(AppError::Unauthorized("Invalid command token".to_string()));
    }

    set_sentry_user(request.user_id.as_str());
    Ok(Json(commands::execute(&state, request).await))
}
