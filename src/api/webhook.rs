//! Webhook handler for GitHub push events

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::SharedState;
use crate::job::{BuildInvocation, trigger_build};
use crate::utils::{SIGNATURE_HEADER, verify_github_signature};
use crate::webhook::{FilterOutcome, filter_push};

/// Handles the GitHub webhook POST request.
///
/// Signature first, then JSON, then the ref filter. A matching push dispatches
/// the build and answers 200 whether or not the launch succeeded.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature_opt = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let Some(signature) = signature_opt else {
        warn!("Missing {} header - rejecting webhook", SIGNATURE_HEADER);
        return StatusCode::FORBIDDEN.into_response();
    };

    if !verify_github_signature(state.config.secret.as_bytes(), &body, signature) {
        warn!("Invalid signature - rejecting webhook");
        return StatusCode::FORBIDDEN.into_response();
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            error!("Invalid JSON payload: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let data = match filter_push(&payload, &state.config.target_ref) {
        FilterOutcome::Matched(data) => data,
        FilterOutcome::Ignored { git_ref } => {
            info!(
                "Ignoring push to {} (only {} triggers a build)",
                git_ref, state.config.target_ref
            );
            return StatusCode::OK.into_response();
        }
    };

    data.log_summary(&state.config.app_name);

    let invocation = BuildInvocation::from_webhook(&data);
    trigger_build(state.dispatcher.as_ref(), &invocation);

    Json(json!({
        "status": "success",
        "message": "Build triggered",
        "branch": data.branch,
        "commit": data.commit_sha,
        "app": state.config.app_name,
    }))
    .into_response()
}
