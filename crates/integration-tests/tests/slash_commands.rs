//! `/jenkins` commands through the relay router, with Jenkins and
//! Mattermost mocked.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use httpmock::prelude::*;
use jenkins_relay::middleware::USER_ID_HEADER;
use jenkins_relay_integration_tests::{drain, relay_config, relay_state, slash_command};
use secrecy::SecretString;
use serde_json::json;
use tower::ServiceExt;

fn text(body: Option<&serde_json::Value>) -> &str {
    body.and_then(|b| b["text"].as_str()).unwrap_or_default()
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_health() {
    let state = relay_state(relay_config("http://127.0.0.1:9", "http://127.0.0.1:9"));
    let response = jenkins_relay::app(state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_help_is_ephemeral() {
    let state = relay_state(relay_config("http://127.0.0.1:9", "http://127.0.0.1:9"));
    let (status, body) = slash_command(jenkins_relay::app(state), "help", "").await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["response_type"], "ephemeral");
    assert!(text(Some(&body)).contains("/jenkins connect"));
}

#[tokio::test]
async fn test_command_token_checked() {
    let mut config = relay_config("http://127.0.0.1:9", "http://127.0.0.1:9");
    config.mattermost.command_token = Some(SecretString::from("expected-token"));
    let state = relay_state(config);

    let (status, _) = slash_command(jenkins_relay::app(state.clone()), "help", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = slash_command(jenkins_relay::app(state), "help", "expected-token").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_dialog_callback_requires_user_header() {
    let state = relay_state(relay_config("http://127.0.0.1:9", "http://127.0.0.1:9"));
    let request = Request::post("/api/createJob")
        .header("content-type", "application/json")
        .body(Body::from(json!({"channel_id": "channel-1"}).to_string()))
        .unwrap();

    let response = jenkins_relay::app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Connect, then build
// =============================================================================

#[tokio::test]
async fn test_connect_then_build() {
    let jenkins = MockServer::start_async().await;
    let mattermost = MockServer::start_async().await;

    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/api/json");
            then.status(200).json_body(json!({"mode": "NORMAL"}));
        })
        .await;
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/job/deploy/api/json");
            then.status(200).json_body(json!({
                "name": "deploy",
                "buildable": true,
                "color": "blue",
                "property": []
            }));
        })
        .await;
    let trigger = jenkins
        .mock_async(|when, then| {
            when.method(POST).path("/job/deploy/build");
            then.status(201)
                .header("Location", &jenkins.url("/queue/item/5/"));
        })
        .await;
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/queue/item/5/api/json");
            then.status(200).json_body(json!({
                "id": 5,
                "executable": {"number": 8, "url": "http://jenkins.test/job/deploy/8/"}
            }));
        })
        .await;
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/job/deploy/8/api/json");
            then.status(200).json_body(json!({
                "number": 8,
                "url": "http://jenkins.test/job/deploy/8/",
                "building": true
            }));
        })
        .await;

    let queued = mattermost
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v4/posts/ephemeral")
                .body_includes("has been triggered and is in queue");
            then.status(201).json_body(json!({"id": "post-1"}));
        })
        .await;
    let started = mattermost
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v4/posts")
                .body_includes("has been started")
                .body_includes("http://jenkins.test/job/deploy/8/");
            then.status(201).json_body(json!({"id": "post-2"}));
        })
        .await;

    let state = relay_state(relay_config(&jenkins.base_url(), &mattermost.base_url()));

    let (_, body) = slash_command(jenkins_relay::app(state.clone()), "connect alice api-token", "").await;
    assert_eq!(text(body.as_ref()), "Jenkins has been connected.");

    let (_, body) = slash_command(jenkins_relay::app(state.clone()), "me", "").await;
    assert_eq!(text(body.as_ref()), "You are connected to Jenkins as: alice");

    let (_, body) = slash_command(jenkins_relay::app(state.clone()), "build deploy", "").await;
    assert_eq!(text(body.as_ref()), "Triggering a build of 'deploy'...");

    drain(&state).await;
    trigger.assert_async().await;
    queued.assert_async().await;
    started.assert_async().await;
}

#[tokio::test]
async fn test_connect_with_wrong_token() {
    let jenkins = MockServer::start_async().await;
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/api/json");
            then.status(401);
        })
        .await;

    let state = relay_state(relay_config(&jenkins.base_url(), "http://127.0.0.1:9"));
    let (_, body) = slash_command(jenkins_relay::app(state.clone()), "connect alice nope", "").await;
    assert_eq!(text(body.as_ref()), "Incorrect username or token");

    let (_, body) = slash_command(jenkins_relay::app(state), "me", "").await;
    assert_eq!(text(body.as_ref()), "You are not connected to Jenkins.");
}

#[tokio::test]
async fn test_parameterized_build_opens_dialog() {
    let jenkins = MockServer::start_async().await;
    let mattermost = MockServer::start_async().await;

    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/api/json");
            then.status(200).json_body(json!({}));
        })
        .await;
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/job/team/job/deploy/api/json");
            then.status(200).json_body(json!({
                "name": "deploy",
                "buildable": true,
                "color": "blue",
                "property": [{
                    "parameterDefinitions": [{
                        "name": "BRANCH",
                        "type": "StringParameterDefinition",
                        "defaultParameterValue": {"value": "main"}
                    }]
                }]
            }));
        })
        .await;
    let dialog = mattermost
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v4/actions/dialogs/open")
                .body_includes("\"trigger_id\":\"trigger-1\"")
                .body_includes("http://relay.test/api/triggerBuild/team%2Fdeploy")
                .body_includes("BRANCH");
            then.status(200).json_body(json!({}));
        })
        .await;

    let state = relay_state(relay_config(&jenkins.base_url(), &mattermost.base_url()));
    slash_command(jenkins_relay::app(state.clone()), "connect alice api-token", "").await;

    let (_, body) = slash_command(jenkins_relay::app(state), "build team/deploy", "").await;
    assert_eq!(
        text(body.as_ref()),
        "Fill in the build parameters for 'team/deploy'."
    );
    dialog.assert_async().await;
}

// =============================================================================
// Build parameters dialog
// =============================================================================

/// Mock a connected Jenkins whose `team/deploy` job takes three parameters.
async fn parameterized_jenkins(jenkins: &MockServer) {
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/api/json");
            then.status(200).json_body(json!({}));
        })
        .await;
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/job/team/job/deploy/api/json");
            then.status(200).json_body(json!({
                "name": "deploy",
                "color": "blue",
                "property": [{
                    "parameterDefinitions": [
                        {
                            "name": "BRANCH",
                            "type": "StringParameterDefinition",
                            "defaultParameterValue": {"value": "main"}
                        },
                        {
                            "name": "DRY_RUN",
                            "type": "BooleanParameterDefinition",
                            "defaultParameterValue": {"value": false}
                        },
                        {
                            "name": "ENV",
                            "type": "ChoiceParameterDefinition",
                            "choices": ["staging", "production"]
                        }
                    ]
                }]
            }));
        })
        .await;
}

/// Submit the build parameters dialog for `team/deploy` as `user-1`.
async fn submit_parameters(
    state: &jenkins_relay::state::AppState,
    values: serde_json::Value,
) -> serde_json::Value {
    let body = json!({
        "type": "dialog_submission",
        "callback_id": "jenkins_build",
        "user_id": "user-1",
        "channel_id": "channel-1",
        "submission": values
    });
    let request = Request::post("/api/triggerBuild/team%2Fdeploy")
        .header("content-type", "application/json")
        .header(USER_ID_HEADER, "user-1")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = jenkins_relay::app(state.clone())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_dialog_submission_builds_with_parameters() {
    let jenkins = MockServer::start_async().await;
    let mattermost = MockServer::start_async().await;
    parameterized_jenkins(&jenkins).await;

    let trigger = jenkins
        .mock_async(|when, then| {
            when.method(POST)
                .path("/job/team/job/deploy/buildWithParameters")
                .body_includes("BRANCH=release%2F2.0")
                .body_includes("DRY_RUN=true")
                .body_includes("ENV=production");
            then.status(201)
                .header("Location", &jenkins.url("/queue/item/11/"));
        })
        .await;
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/queue/item/11/api/json");
            then.status(200).json_body(json!({
                "id": 11,
                "executable": {"number": 4, "url": "http://jenkins.test/job/team/job/deploy/4/"}
            }));
        })
        .await;
    jenkins
        .mock_async(|when, then| {
            when.method(GET).path("/job/team/job/deploy/4/api/json");
            then.status(200).json_body(json!({
                "number": 4,
                "url": "http://jenkins.test/job/team/job/deploy/4/",
                "building": true
            }));
        })
        .await;

    mattermost
        .mock_async(|when, then| {
            when.method(POST).path("/api/v4/posts/ephemeral");
            then.status(201).json_body(json!({"id": "post-1"}));
        })
        .await;
    let started = mattermost
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v4/posts")
                .body_includes("has been started")
                .body_includes("http://jenkins.test/job/team/job/deploy/4/");
            then.status(201).json_body(json!({"id": "post-2"}));
        })
        .await;

    let state = relay_state(relay_config(&jenkins.base_url(), &mattermost.base_url()));
    slash_command(jenkins_relay::app(state.clone()), "connect alice api-token", "").await;

    let response = submit_parameters(
        &state,
        json!({"BRANCH": "release/2.0", "DRY_RUN": true, "ENV": "production"}),
    )
    .await;
    assert!(response.get("error").is_none());
    assert!(response.get("errors").is_none());

    drain(&state).await;
    trigger.assert_async().await;
    started.assert_async().await;
}

#[tokio::test]
async fn test_dialog_submission_reports_invalid_fields() {
    let jenkins = MockServer::start_async().await;
    parameterized_jenkins(&jenkins).await;
    let trigger = jenkins
        .mock_async(|when, then| {
            when.method(POST).path("/job/team/job/deploy/buildWithParameters");
            then.status(201);
        })
        .await;

    let state = relay_state(relay_config(&jenkins.base_url(), "http://127.0.0.1:9"));
    slash_command(jenkins_relay::app(state.clone()), "connect alice api-token", "").await;

    let response = submit_parameters(&state, json!({"ENV": "qa"})).await;
    assert!(response["errors"]["ENV"].as_str().unwrap().contains("qa"));

    let response = submit_parameters(&state, json!({"ENV": "staging", "DRY_RUN": "maybe"})).await;
    assert!(response["errors"]["DRY_RUN"].is_string());

    drain(&state).await;
    assert_eq!(trigger.calls_async().await, 0);
}
