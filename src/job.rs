use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{HookError, Result};
use crate::webhook::WebhookData;

/// One fire-and-forget run of the build script
#[derive(Debug, Clone, PartialEq)]
pub struct BuildInvocation {
    pub id: String,
    pub branch: String,
    pub commit_sha: String,
    pub requested_at: DateTime<Utc>,
}

impl BuildInvocation {
    pub fn new(branch: String, commit_sha: String) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            branch,
            commit_sha,
            requested_at: Utc::now(),
        }
    }

    pub fn from_webhook(data: &WebhookData) -> Self {
        Self::new(data.branch.clone(), data.commit_sha.clone())
    }

    /// Positional arguments passed to the build script.
    pub fn args(&self) -> [&str; 2] {
        [&self.branch, &self.commit_sha]
    }
}

/// Launches builds. Implementations must return without waiting for the build.
pub trait BuildDispatcher: Send + Sync {
    fn dispatch(&self, invocation: &BuildInvocation) -> Result<()>;
}

/// Runs an executable as `<script> <branch> <commit_sha>` in its own process group.
#[derive(Debug, Clone)]
pub struct ScriptDispatcher {
    script: PathBuf,
}

impl ScriptDispatcher {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl BuildDispatcher for ScriptDispatcher {
    fn dispatch(&self, invocation: &BuildInvocation) -> Result<()> {
        let mut cmd = Command::new(&self.script);
        cmd.args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        // Leave the listener's process group so signals sent to it (Ctrl-C) skip the build
        #[cfg(unix)]
        cmd.process_group(0);

        // The runtime reaps the child once the handle is dropped
        let child = cmd.spawn().map_err(|source| HookError::DispatchFailed {
            script: self.script.display().to_string(),
            source,
        })?;

        info!(
            "Build {} started (pid {:?}): {} {} {}",
            invocation.id,
            child.id(),
            self.script.display(),
            invocation.branch,
            invocation.commit_sha
        );
        Ok(())
    }
}

/// Dispatches a build and logs, rather than returns, any launch failure.
pub fn trigger_build(dispatcher: &dyn BuildDispatcher, invocation: &BuildInvocation) {
    info!(
        "Starting build {} for branch '{}' at {}",
        invocation.id, invocation.branch, invocation.commit_sha
    );
    if let Err(e) = dispatcher.dispatch(invocation) {
        error!("Failed to trigger build {}: {}", invocation.id, e);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records invocations instead of spawning anything.
    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub calls: Mutex<Vec<BuildInvocation>>,
        pub fail: bool,
    }

    impl RecordingDispatcher {
        pub fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|i| (i.branch.clone(), i.commit_sha.clone()))
                .collect()
        }
    }

    impl BuildDispatcher for RecordingDispatcher {
        fn dispatch(&self, invocation: &BuildInvocation) -> Result<()> {
            self.calls.lock().unwrap().push(invocation.clone());
            if self.fail {
                return Err(HookError::DispatchFailed {
                    script: "recording".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn invocation_args_are_branch_then_commit() {
        let invocation = BuildInvocation::new("main".to_string(), "abcdef1".to_string());
        assert_eq!(invocation.args(), ["main", "abcdef1"]);
        assert!(Uuid::parse_str(&invocation.id).is_ok());
    }

    #[test]
    fn invocation_ids_are_unique() {
        let a = BuildInvocation::new("main".to_string(), "a".to_string());
        let b = BuildInvocation::new("main".to_string(), "a".to_string());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn trigger_build_swallows_dispatch_failure() {
        let dispatcher = RecordingDispatcher::failing();
        let invocation = BuildInvocation::new("main".to_string(), "abcdef1".to_string());
        trigger_build(&dispatcher, &invocation);
        assert_eq!(
            dispatcher.calls(),
            vec![("main".to_string(), "abcdef1".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_script_is_dispatch_error() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = ScriptDispatcher::new(dir.path().join("does-not-exist.sh"));
        let invocation = BuildInvocation::new("main".to_string(), "abcdef1".to_string());
        let err = dispatcher.dispatch(&invocation).unwrap_err();
        assert!(matches!(err, HookError::DispatchFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn script_receives_branch_and_commit() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::{Duration, Instant};

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");
        let script = dir.path().join("build.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$1 $2\" > \"{}.tmp\"\nmv \"{0}.tmp\" \"{0}\"\n", out.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dispatcher = ScriptDispatcher::new(&script);
        let invocation = BuildInvocation::new("main".to_string(), "abcdef1".to_string());
        dispatcher.dispatch(&invocation).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while !out.exists() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "main abcdef1");
    }
}
