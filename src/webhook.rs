//! Push event extraction and branch filtering

use serde_json::Value;
use tracing::info;

use crate::utils::truncate_chars;

pub const SHORT_SHA_LEN: usize = 7;
pub const MESSAGE_DISPLAY_LEN: usize = 60;
pub const NO_MESSAGE: &str = "No message";
pub const UNKNOWN_PUSHER: &str = "Unknown";

/// Fields of a push payload the listener cares about.
///
/// Every field is optional; missing or mistyped values never fail the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushEvent {
    pub git_ref: Option<String>,
    pub after: Option<String>,
    pub commit_message: Option<String>,
    pub pusher_name: Option<String>,
}

impl PushEvent {
    pub fn from_payload(payload: &Value) -> Self {
        let git_ref = payload
            .get("ref")
            .and_then(|r| r.as_str())
            .map(String::from);
        let after = payload
            .get("after")
            .and_then(|v| v.as_str())
            .map(String::from);
        let commit_message = payload
            .get("commits")
            .and_then(|c| c.as_array())
            .and_then(|commits| commits.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(String::from);
        let pusher_name = payload
            .get("pusher")
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(String::from);

        Self {
            git_ref,
            after,
            commit_message,
            pusher_name,
        }
    }
}

/// Data extracted from a push to the target ref.
/// `branch` and `commit_sha` become the build script arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookData {
    pub branch: String,
    pub commit_sha: String,
    pub commit_message: String,
    pub pusher_name: String,
}

impl WebhookData {
    pub fn from_event(git_ref: &str, event: &PushEvent) -> Self {
        let branch = git_ref.rsplit('/').next().unwrap_or(git_ref).to_string();
        let commit_sha = event
            .after
            .as_deref()
            .map(|sha| truncate_chars(sha, SHORT_SHA_LEN).to_string())
            .unwrap_or_default();

        Self {
            branch,
            commit_sha,
            commit_message: event
                .commit_message
                .clone()
                .unwrap_or_else(|| NO_MESSAGE.to_string()),
            pusher_name: event
                .pusher_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_PUSHER.to_string()),
        }
    }

    /// Writes the push summary to the log, one line per field.
    pub fn log_summary(&self, app_name: &str) {
        info!("{}", "=".repeat(70));
        info!("Push event received for {}", app_name);
        info!("{}", "=".repeat(70));
        info!("Branch:  {}", self.branch);
        info!("Commit:  {}", self.commit_sha);
        info!("Pusher:  {}", self.pusher_name);
        info!(
            "Message: {}",
            truncate_chars(&self.commit_message, MESSAGE_DISPLAY_LEN)
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Not a push to the target ref. `git_ref` is the value received, or "unknown".
    Ignored { git_ref: String },
    Matched(WebhookData),
}

/// Decides whether a verified payload should trigger a build.
pub fn filter_push(payload: &Value, target_ref: &str) -> FilterOutcome {
    let event = PushEvent::from_payload(payload);
    match event.git_ref.as_deref() {
        Some(git_ref) if git_ref == target_ref => {
            FilterOutcome::Matched(WebhookData::from_event(git_ref, &event))
        }
        Some(git_ref) => FilterOutcome::Ignored {
            git_ref: git_ref.to_string(),
        },
        None => FilterOutcome::Ignored {
            git_ref: payload
                .get("ref")
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        },
    }
}
