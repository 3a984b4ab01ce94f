//! External EXPLAIN hook for `querytune optimize --explain-cmd`
//!
//! The command receives the candidate SQL on stdin and must print
//! `{"explain": "...", "metrics": {...}}` on stdout. A non-zero exit status,
//! a spawn failure or unparseable output fails the attempt.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use querytune_core::bail_usage;
use querytune_core::error::Result;
use querytune_core::metrics::MetricsMap;
use querytune_core::optimize::{ExecutionError, ExplainHook, ExplainOutput};

/// Maximum stderr characters carried into an attempt's error
const STDERR_EXCERPT_LEN: usize = 500;

#[derive(Debug, Deserialize)]
struct HookReply {
    #[serde(default)]
    explain: String,
    #[serde(default)]
    metrics: Value,
}

/// Runs a shell-style command line once per candidate query
#[derive(Debug, Clone)]
pub struct CommandExplainHook {
    program: String,
    args: Vec<String>,
}

impl CommandExplainHook {
    /// Split `command_line` into program and arguments
    pub fn new(command_line: &str) -> Result<Self> {
        let parts = shlex::split(command_line).unwrap_or_default();
        let Some((program, args)) = parts.split_first() else {
            bail_usage!(format!("invalid --explain-cmd: {:?}", command_line));
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn run(&self, query: &str) -> std::result::Result<Vec<u8>, ExecutionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionError::new(format!("failed to run {}: {}", self.program, e)))?;

        // Feed stdin while stdout is drained so a large query cannot fill both pipes
        let stdin = child.stdin.take();
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(query.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output
            .map_err(|e| ExecutionError::new(format!("failed to wait for {}: {}", self.program, e)))?;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(program = %self.program, "explain command closed stdin early");
            }
            Ok(Err(e)) => {
                return Err(ExecutionError::new(format!(
                    "failed to send query to {}: {}",
                    self.program, e
                )));
            }
            Err(_) => {
                return Err(ExecutionError::new(format!(
                    "failed to send query to {}",
                    self.program
                )));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_LEN).collect();
            return Err(ExecutionError::new(format!(
                "{} exited with {}: {}",
                self.program, output.status, excerpt
            )));
        }

        Ok(output.stdout)
    }
}

impl ExplainHook for CommandExplainHook {
    fn explain(&self, query: &str) -> std::result::Result<ExplainOutput, ExecutionError> {
        let stdout = self.run(query)?;
        let reply: HookReply = serde_json::from_slice(&stdout).map_err(|e| {
            ExecutionError::new(format!("invalid output from {}: {}", self.program, e))
        })?;

        let metrics = MetricsMap::from(reply.metrics);
        debug!(program = %self.program, metric_keys = metrics.len(), "explain hook finished");

        Ok(ExplainOutput {
            explain_text: reply.explain,
            metrics,
        })
    }
}
