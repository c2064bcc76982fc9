//! Tool invoker: runs one external command and classifies how it ended.
//!
//! `ToolInvoker` is the seam the pipeline runner drives; `ProcessInvoker` is
//! the real implementation backed by `tokio::process`. Child output is
//! streamed straight to the terminal, argv is passed literally (no shell),
//! and the caller is held until the child exits, times out, or the user
//! interrupts.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::EngineError;
use crate::resolver::ResolvedCommand;

/// How a started tool finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero or missing exit code into a tool failure.
    pub fn into_outcome(self, cmd: &ResolvedCommand) -> Result<InvocationResult, EngineError> {
        if self.success() {
            Ok(self)
        } else {
            Err(EngineError::ToolFailure {
                tool: cmd.tool.clone(),
                exec: cmd.exec.clone(),
                code: self.exit_code,
            })
        }
    }
}

#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Run `cmd` to completion.
    ///
    /// Errors represent runs that never produced an exit status: spawn
    /// failures, timeouts, and interrupts. A non-zero exit is returned as a
    /// normal result and classified by the caller.
    async fn invoke(&self, cmd: &ResolvedCommand) -> Result<InvocationResult, EngineError>;
}

/// What cancels a running tool.
#[derive(Debug, Clone, Default)]
enum Interrupt {
    #[default]
    Ignored,
    CtrlC,
    Notified(Arc<Notify>),
}

impl Interrupt {
    /// Resolves when the running tool should be cancelled.
    async fn fired(self) {
        match self {
            Interrupt::CtrlC => {
                if tokio::signal::ctrl_c().await.is_ok() {
                    return;
                }
            }
            Interrupt::Notified(notify) => return notify.notified().await,
            Interrupt::Ignored => {}
        }
        std::future::pending::<()>().await
    }
}

/// Runs tools as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
    interrupt: Interrupt,
}

impl ProcessInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            interrupt: Interrupt::CtrlC,
        }
    }

    /// Leave Ctrl-C to the default handler.
    pub fn without_interrupt_handling(mut self) -> Self {
        self.interrupt = Interrupt::Ignored;
        self
    }

    /// Cancel the running tool when `notify` is signalled instead of on
    /// Ctrl-C. A `notify_one` issued before the tool starts still cancels it.
    pub fn with_interrupt(mut self, notify: Arc<Notify>) -> Self {
        self.interrupt = Interrupt::Notified(notify);
        self
    }
}

enum Ending {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Interrupted,
}

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, cmd: &ResolvedCommand) -> Result<InvocationResult, EngineError> {
        tracing::info!("running {}: {}", cmd.tool, cmd);
        let started = Instant::now();

        let mut child = tokio::process::Command::new(&cmd.exec)
            .args(&cmd.argv)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn {
                tool: cmd.tool.clone(),
                exec: cmd.exec.clone(),
                source: e,
            })?;
        tracing::debug!("spawned {} pid={:?}", cmd.tool, child.id());

        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        let interrupt = self.interrupt.clone().fired();

        // A terminal Ctrl-C also reaches the child, so its exit and the
        // interrupt can be ready together; the interrupt wins.
        let ending = tokio::select! {
            biased;
            _ = interrupt => Ending::Interrupted,
            _ = deadline => Ending::TimedOut,
            status = child.wait() => Ending::Exited(status),
        };

        match ending {
            Ending::Exited(Ok(status)) => {
                let result = InvocationResult {
                    exit_code: status.code(),
                    duration: started.elapsed(),
                };
                tracing::info!(
                    "{} finished: exit_code={:?}, duration_ms={}",
                    cmd.tool,
                    result.exit_code,
                    result.duration.as_millis()
                );
                Ok(result)
            }
            Ending::Exited(Err(e)) => Err(EngineError::Spawn {
                tool: cmd.tool.clone(),
                exec: cmd.exec.clone(),
                source: e,
            }),
            Ending::TimedOut => {
                tracing::warn!("{} exceeded timeout; killing", cmd.tool);
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to kill {}: {}", cmd.tool, e);
                }
                Err(EngineError::ToolTimeout {
                    tool: cmd.tool.clone(),
                    timeout: timeout.unwrap_or_default(),
                })
            }
            Ending::Interrupted => {
                tracing::warn!("interrupted; killing {}", cmd.tool);
                if let Err(e) = child.kill().await {
                    tracing::warn!("failed to kill {}: {}", cmd.tool, e);
                }
                Err(EngineError::Cancelled {
                    tool: cmd.tool.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(tool: &str, script: &str) -> ResolvedCommand {
        ResolvedCommand {
            tool: tool.into(),
            exec: "sh".into(),
            argv: vec!["-c".into(), script.into()],
        }
    }

    #[test]
    fn non_zero_exit_is_tool_failure() {
        let cmd = sh("qbsp", "exit 1");
        let r = InvocationResult {
            exit_code: Some(1),
            duration: Duration::ZERO,
        };
        match r.into_outcome(&cmd) {
            Err(EngineError::ToolFailure { tool, code, .. }) => {
                assert_eq!(tool, "qbsp");
                assert_eq!(code, Some(1));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let killed = InvocationResult {
            exit_code: None,
            duration: Duration::ZERO,
        };
        assert!(killed.into_outcome(&cmd).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_codes_are_captured() {
        let inv = ProcessInvoker::new(None).without_interrupt_handling();
        let ok = inv.invoke(&sh("qbsp", "exit 0")).await.unwrap();
        assert!(ok.success());

        let failed = inv.invoke(&sh("light", "exit 3")).await.unwrap();
        assert_eq!(failed.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn argv_is_not_shell_interpreted() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("pwned");
        let inv = ProcessInvoker::new(None).without_interrupt_handling();
        let cmd = ResolvedCommand {
            tool: "echo".into(),
            exec: "echo".into(),
            argv: vec![format!("; touch {}", marker.display())],
        };
        let r = inv.invoke(&cmd).await.unwrap();
        assert!(r.success());
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn missing_executable_is_spawn_error() {
        let inv = ProcessInvoker::new(None).without_interrupt_handling();
        let cmd = ResolvedCommand {
            tool: "qbsp".into(),
            exec: "/nonexistent/kcc-test/qbsp".into(),
            argv: vec![],
        };
        match inv.invoke(&cmd).await {
            Err(EngineError::Spawn { tool, exec, .. }) => {
                assert_eq!(tool, "qbsp");
                assert_eq!(exec, "/nonexistent/kcc-test/qbsp");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn interrupt_kills_the_child_and_reports_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let notify = Arc::new(Notify::new());
        let inv = ProcessInvoker::new(None).with_interrupt(notify.clone());
        let cmd = sh(
            "light",
            &format!("echo $$ > '{}'; sleep 10", pid_file.display()),
        );

        let fire = async {
            for _ in 0..250 {
                if std::fs::read_to_string(&pid_file).is_ok_and(|s| s.ends_with('\n')) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            notify.notify_one();
        };
        let started = Instant::now();
        let (outcome, ()) = tokio::join!(inv.invoke(&cmd), fire);

        match outcome {
            Err(EngineError::Cancelled { tool }) => assert_eq!(tool, "light"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(8));

        let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
        let alive = std::process::Command::new("sh")
            .args(["-c", &format!("kill -0 {pid}")])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success(), "tool process {pid} still running");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_the_child() {
        let inv =
            ProcessInvoker::new(Some(Duration::from_millis(200))).without_interrupt_handling();
        let started = Instant::now();
        match inv.invoke(&sh("vis", "sleep 10")).await {
            Err(EngineError::ToolTimeout { tool, timeout }) => {
                assert_eq!(tool, "vis");
                assert_eq!(timeout, Duration::from_millis(200));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
