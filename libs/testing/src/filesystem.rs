//! Filesystem resize doubles.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use pgvr_volumes::{FilesystemResizeBackend, NamespacedName, PodCommandExecutor};

/// Filesystem backend that records the pods it was asked to resize.
#[derive(Default)]
pub struct RecordingFilesystem {
    pods: Mutex<Vec<NamespacedName>>,
    failure: Option<String>,
}

impl RecordingFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every resize fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            pods: Mutex::default(),
            failure: Some(message.to_string()),
        }
    }

    pub fn resized_pods(&self) -> Vec<NamespacedName> {
        self.pods().clone()
    }

    fn pods(&self) -> MutexGuard<'_, Vec<NamespacedName>> {
        self.pods.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FilesystemResizeBackend for RecordingFilesystem {
    async fn resize_filesystem(&self, pod: &NamespacedName) -> Result<()> {
        self.pods().push(pod.clone());
        match &self.failure {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// A command executed through [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub pod: NamespacedName,
    pub container: String,
    pub command: Vec<String>,
}

impl ExecutedCommand {
    /// The shell command line, i.e. the last argument.
    pub fn script(&self) -> &str {
        self.command.last().map(String::as_str).unwrap_or_default()
    }
}

/// One scripted answer.
#[derive(Clone)]
struct Response {
    prefix: String,
    stdout: String,
    stderr: String,
    failure: Option<String>,
    once: bool,
}

/// Pod executor answering shell commands from a script.
///
/// Responses are matched against the start of the shell command line, first
/// match wins. Unmatched commands fail. Like a real exec, only stdout is
/// returned; stderr text is included only when the command line redirects
/// it with `2>&1`.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<Vec<Response>>,
    executed: Mutex<Vec<ExecutedCommand>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `stdout`.
    #[must_use]
    pub fn respond(self, prefix: &str, stdout: &str) -> Self {
        self.push(prefix, stdout, "", None)
    }

    /// Answer commands starting with `prefix` by writing `stdout` and
    /// `stderr` to their respective streams.
    #[must_use]
    pub fn respond_with_stderr(self, prefix: &str, stdout: &str, stderr: &str) -> Self {
        self.push(prefix, stdout, stderr, None)
    }

    /// Fail commands starting with `prefix` with `message`.
    #[must_use]
    pub fn fail(self, prefix: &str, message: &str) -> Self {
        self.push(prefix, "", "", Some(message.to_string()))
    }

    /// Make the most recently added response answer a single command.
    #[must_use]
    pub fn once(self) -> Self {
        if let Some(last) = self.responses().last_mut() {
            last.once = true;
        }
        self
    }

    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(self, prefix: &str, stdout: &str, stderr: &str, failure: Option<String>) -> Self {
        self.responses().push(Response {
            prefix: prefix.to_string(),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            failure,
            once: false,
        });
        self
    }

    fn responses(&self) -> MutexGuard<'_, Vec<Response>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PodCommandExecutor for ScriptedExecutor {
    async fn exec(
        &self,
        pod: &NamespacedName,
        container: &str,
        command: &[&str],
    ) -> Result<String> {
        let executed = ExecutedCommand {
            pod: pod.clone(),
            container: container.to_string(),
            command: command.iter().map(|arg| arg.to_string()).collect(),
        };
        let script = executed.script().to_string();
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(executed);

        let mut responses = self.responses();
        let Some(index) = responses
            .iter()
            .position(|response| script.starts_with(response.prefix.as_str()))
        else {
            bail!("no scripted response for {script:?}");
        };

        let response = if responses[index].once {
            responses.remove(index)
        } else {
            responses[index].clone()
        };
        drop(responses);

        if let Some(message) = response.failure {
            return Err(anyhow!(message));
        }
        if script.contains("2>&1") {
            Ok(format!("{}{}", response.stderr, response.stdout))
        } else {
            Ok(response.stdout)
        }
    }
}
