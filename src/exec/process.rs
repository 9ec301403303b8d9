// src/exec/process.rs

//! External process runner and supervisor.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::lifecycle::ShutdownSignal;
use crate::types::{ExitStatus, Narrator};

/// How long output forwarders may lag behind process exit.
const OUTPUT_DRAIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub enum CommandLine {
    /// Run through `sh -c` (`cmd /C` on Windows).
    Shell(String),
    Exec { program: PathBuf, args: Vec<String> },
}

/// Everything needed to launch one external process.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub label: String,
    pub command: CommandLine,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// A stdout line matching this is narrated as "ready" (first match only).
    pub ready_pattern: Option<Regex>,
    /// Time between closing stdin and killing on shutdown.
    pub grace: Duration,
}

impl ProcessSpec {
    pub fn shell(label: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self::with_command(label, CommandLine::Shell(cmd.into()))
    }

    pub fn exec(label: impl Into<String>, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self::with_command(
            label,
            CommandLine::Exec {
                program: program.into(),
                args,
            },
        )
    }

    fn with_command(label: impl Into<String>, command: CommandLine) -> Self {
        Self {
            label: label.into(),
            command,
            cwd: None,
            env: Vec::new(),
            ready_pattern: None,
            grace: Duration::from_secs(3),
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn ready_on(mut self, pattern: Regex) -> Self {
        self.ready_pattern = Some(pattern);
        self
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn display(&self) -> String {
        match &self.command {
            CommandLine::Shell(cmd) => cmd.clone(),
            CommandLine::Exec { program, args } => {
                let mut s = program.display().to_string();
                for a in args {
                    s.push(' ');
                    s.push_str(a);
                }
                s
            }
        }
    }

    fn build(&self) -> Command {
        let mut cmd = match &self.command {
            CommandLine::Shell(line) => {
                if cfg!(windows) {
                    let mut c = Command::new("cmd");
                    c.arg("/C").arg(line);
                    c
                } else {
                    let mut c = Command::new("sh");
                    c.arg("-c").arg(line);
                    c
                }
            }
            CommandLine::Exec { program, args } => {
                let mut c = Command::new(program);
                c.args(args);
                c
            }
        };

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn(&self, log: &Narrator) -> Result<(Child, Vec<JoinHandle<()>>)> {
        info!(process = %self.label, cmd = %self.display(), "starting process");

        let mut child = self
            .build()
            .spawn()
            .with_context(|| format!("spawning process '{}' ({})", self.label, self.display()))?;

        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(forward_lines(
                stdout,
                self.label.clone(),
                StreamKind::Stdout,
                self.ready_pattern.clone(),
                log.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(forward_lines(
                stderr,
                self.label.clone(),
                StreamKind::Stderr,
                None,
                log.clone(),
            ));
        }
        Ok((child, forwarders))
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

fn forward_lines<R>(
    stream: R,
    label: String,
    kind: StreamKind,
    ready: Option<Regex>,
    log: Narrator,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        let mut ready = ready;
        while let Ok(Some(line)) = lines.next_line().await {
            match kind {
                StreamKind::Stdout => debug!(process = %label, "stdout: {}", line),
                StreamKind::Stderr => debug!(process = %label, "stderr: {}", line),
            }
            log.say(format!("[{label}] {line}"));

            if ready.as_ref().is_some_and(|re| re.is_match(&line)) {
                info!(process = %label, "process reported ready");
                log.say(format!("{label} ready"));
                ready = None;
            }
        }
    })
}

async fn drain(forwarders: Vec<JoinHandle<()>>) {
    for handle in forwarders {
        let _ = tokio::time::timeout(OUTPUT_DRAIN, handle).await;
    }
}

/// Run the process until it exits on its own.
pub async fn run_to_completion(spec: &ProcessSpec, log: &Narrator) -> Result<ExitStatus> {
    let (mut child, forwarders) = spec.spawn(log)?;
    drop(child.stdin.take());

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process '{}'", spec.label))?;
    drain(forwarders).await;

    info!(
        process = %spec.label,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "process exited"
    );
    Ok(status.into())
}

/// Run the process until it exits or `shutdown` is requested.
///
/// On shutdown stdin is closed (watch-mode compilers exit on EOF), the child
/// gets `spec.grace` to leave, then it is killed. A stop-initiated exit is
/// `Success`; a process that dies on its own reports its own status.
pub async fn supervise(
    spec: &ProcessSpec,
    log: &Narrator,
    mut shutdown: ShutdownSignal,
) -> Result<ExitStatus> {
    let (mut child, forwarders) = spec.spawn(log)?;
    let mut stdin = child.stdin.take();

    tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for process '{}'", spec.label))?;
            drain(forwarders).await;
            info!(
                process = %spec.label,
                exit_code = status.code().unwrap_or(-1),
                "process exited on its own"
            );
            if !status.success() {
                log.error(format!("{} exited with {}", spec.label, status));
            }
            Ok(status.into())
        }

        _ = shutdown.requested() => {
            debug!(process = %spec.label, "shutdown requested; closing stdin");
            drop(stdin.take());

            match tokio::time::timeout(spec.grace, child.wait()).await {
                Ok(_) => debug!(process = %spec.label, "process left within grace period"),
                Err(_) => {
                    warn!(process = %spec.label, "process ignored shutdown; killing");
                    if let Err(e) = child.kill().await {
                        warn!(process = %spec.label, error = %e, "failed to kill process");
                    }
                }
            }
            drain(forwarders).await;
            Ok(ExitStatus::Success)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::lifecycle::Lifecycle;

    fn recorder() -> (Narrator, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let narrator = Narrator::new(Arc::new(move |m: &str| sink.lock().unwrap().push(m.to_string())));
        (narrator, lines)
    }

    #[tokio::test]
    async fn completion_status_and_output_are_reported() {
        let (log, lines) = recorder();

        let ok = run_to_completion(&ProcessSpec::shell("echo", "echo hello"), &log)
            .await
            .unwrap();
        let bad = run_to_completion(&ProcessSpec::shell("fail", "exit 3"), &log)
            .await
            .unwrap();

        assert_eq!(ok, ExitStatus::Success);
        assert_eq!(bad, ExitStatus::Failure);
        assert!(lines.lock().unwrap().contains(&"[echo] hello".to_string()));
    }

    #[tokio::test]
    async fn stop_terminates_unresponsive_process_as_success() {
        let (log, lines) = recorder();
        let lc = Lifecycle::new("sleeper");
        let signal = lc.begin().unwrap();

        let spec = ProcessSpec::shell("sleeper", "echo listening; exec sleep 30")
            .ready_on(Regex::new("^listening").unwrap())
            .grace(Duration::from_millis(100));

        let handle = tokio::spawn(async move { supervise(&spec, &log, signal).await });
        tokio::time::sleep(Duration::from_millis(300)).await;
        lc.stop();

        let status = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(status, ExitStatus::Success);
        assert!(lines.lock().unwrap().contains(&"sleeper ready".to_string()));
    }
}
