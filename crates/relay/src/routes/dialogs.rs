//! Interactive dialog callbacks.
//!
//! Mattermost posts the submitted dialog as JSON. Validation problems are
//! returned as a [`SubmitDialogResponse`] so the dialog stays open and shows
//! them; everything else is reported in the channel.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use jenkins_relay_core::{BuildParameters, JobPath, JobReference, UserId};
use tracing::{info, instrument};

use crate::config::RelayConfig;
use crate::error::AppError;
use crate::mattermost::messages::{CONFIG_FIELD, JOB_NAME_FIELD};
use crate::mattermost::{SubmitDialogRequest, SubmitDialogResponse};
use crate::middleware::MattermostUser;
use crate::services::builds::spawn_build;
use crate::state::AppState;

/// Create dialog callback routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/triggerBuild/{job_name}", post(trigger_build))
        .route("/api/createJob", post(create_job))
        .route("/api/createJob/{job_name}", post(create_job_named))
}

/// Build a parameterized job with the submitted values.
#[instrument(skip_all, fields(user_id = %user_id, job = %job_name))]
async fn trigger_build(
    State(state): State<AppState>,
    MattermostUser(user_id): MattermostUser,
    Path(job_name): Path<String>,
    Json(request): Json<SubmitDialogRequest>,
) -> Json<SubmitDialogResponse> {
    if request.cancelled {
        return Json(SubmitDialogResponse::ok());
    }

    let config = state.config();
    let result = submit_build(&state, config, &user_id, &job_name, &request).await;
    Json(result.unwrap_or_else(|e| dialog_error(&e, "trigger build")))
}

async fn submit_build(
    state: &AppState,
    config: Arc<RelayConfig>,
    user_id: &UserId,
    job_name: &str,
    request: &SubmitDialogRequest,
) -> Result<SubmitDialogResponse, AppError> {
    let job = JobReference::from_job_name(job_name)
        .map_err(|e| AppError::BadRequest(format!("Invalid job name '{job_name}': {e}")))?
        .job;

    let client = state.jenkins().client_for(&config, user_id).await?;
    let definitions = client.job(&job).await?.parameter_definitions();

    let parameters = match BuildParameters::validate(request.values(), &definitions) {
        Ok(parameters) => parameters,
        Err(e) => {
            let name = e.parameter_name();
            let response = if definitions.iter().any(|d| d.name == name) {
                SubmitDialogResponse::field_error(name, e.to_string())
            } else {
                SubmitDialogResponse::error(e.to_string())
            };
            return Ok(response);
        }
    };

    info!(job = %job, parameters = parameters.len(), "Build parameters accepted");
    spawn_build(
        state,
        config,
        client,
        user_id.clone(),
        request.channel_id.clone(),
        job,
        Some(parameters),
    );
    Ok(SubmitDialogResponse::ok())
}

/// Create a job named in the dialog's `job_name` field.
#[instrument(skip_all, fields(user_id = %user_id))]
async fn create_job(
    State(state): State<AppState>,
    MattermostUser(user_id): MattermostUser,
    Json(request): Json<SubmitDialogRequest>,
) -> Json<SubmitDialogResponse> {
    let Some(name) = request.value(JOB_NAME_FIELD).map(str::to_string) else {
        return Json(SubmitDialogResponse::field_error(
            JOB_NAME_FIELD,
            "Please enter the job name.",
        ));
    };
    Json(submit_job(&state, &user_id, &name, &request).await)
}

/// Create the job named in the callback path.
#[instrument(skip_all, fields(user_id = %user_id, job = %job_name))]
async fn create_job_named(
    State(state): State<AppState>,
    MattermostUser(user_id): MattermostUser,
    Path(job_name): Path<String>,
    Json(request): Json<SubmitDialogRequest>,
) -> Json<SubmitDialogResponse> {
    Json(submit_job(&state, &user_id, &job_name, &request).await)
}

async fn submit_job(
    state: &AppState,
    user_id: &UserId,
    name: &str,
    request: &SubmitDialogRequest,
) -> SubmitDialogResponse {
    if request.cancelled {
        return SubmitDialogResponse::ok();
    }

    let job = match JobPath::parse(name.trim()) {
        Ok(job) => job,
        Err(e) => return SubmitDialogResponse::field_error(JOB_NAME_FIELD, e.to_string()),
    };
    let Some(config_xml) = request.value(CONFIG_FIELD) else {
        return SubmitDialogResponse::field_error(
            CONFIG_FIELD,
            "Please paste the job's config.xml.",
        );
    };

    let config = state.config();
    let result: Result<(), AppError> = async {
        let client = state.jenkins().client_for(&config, user_id).await?;
        client.create_job(&job, config_xml.to_string()).await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            info!(job = %job, "Job created");
            state
                .responder(&config)
                .permanent(&request.channel_id, format!("Job '{job}' has been created."))
                .await;
            SubmitDialogResponse::ok()
        }
        Err(e) => dialog_error(&e, "create job"),
    }
}

fn dialog_error(error: &AppError, action: &str) -> SubmitDialogResponse {
    error.log(action);
    SubmitDialogResponse::error(error.user_message())
}
