//! Script runtime: executes learner source out of process and captures its trace.
//!
//! The default [`NodeRuntime`] runs each submission in a fresh `node` child with a
//! bootstrap script that replaces `console`, a wall-clock timeout, a heap cap, and a
//! bounded output budget. The captured console lines are the only data that crosses
//! the process boundary. Every record carries a per-run nonce sent on stdin; records
//! without it are dropped.

use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, instrument, warn};

use crate::core::types::ExecutionTrace;
use crate::io::config::RuntimeConfig;
use crate::io::process::{CommandOutput, run_command_with_timeout};
use crate::io::random_token;

const BOOTSTRAP: &str = include_str!("../../js/bootstrap.js");
const OUTPUT_LIMIT_ENV: &str = "GRADER_OUTPUT_LIMIT";
const OUTPUT_LIMIT_MESSAGE: &str = "output limit exceeded";
const NO_RESULT_MESSAGE: &str = "runtime exited without reporting a result";
const NONCE_LEN: usize = 32;
/// Room for the final result record: nonce, framing, and a message the bootstrap
/// clips to 1024 UTF-16 units (at most six bytes each once JSON-escaped).
const RESULT_RESERVE_BYTES: usize = 8 * 1024;

/// Executes source text and returns what it printed.
///
/// Implementations must contain every failure in the returned trace: a runtime
/// fault, a timeout, or the runtime failing to start all yield `succeeded = false`.
pub trait ScriptRuntime: Send + Sync {
    fn execute(&self, source: &str) -> ExecutionTrace;
}

/// Runs submissions with a Node.js interpreter in a child process.
#[derive(Debug, Clone)]
pub struct NodeRuntime {
    config: RuntimeConfig,
}

impl NodeRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Option<Command> {
        let (program, args) = self.config.command.split_first()?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(format!("--max-old-space-size={}", self.config.heap_limit_mb))
            .arg("-e")
            .arg(BOOTSTRAP)
            .env_clear()
            .envs(std::env::var_os("PATH").map(|path| ("PATH", path)))
            .env(OUTPUT_LIMIT_ENV, self.config.output_limit_bytes.to_string())
            .current_dir(std::env::temp_dir());
        Some(cmd)
    }

    /// Pipe budget for the NDJSON stream. The bootstrap charges console records in
    /// encoded bytes against the output limit, so only the result record needs room.
    fn pipe_limit_bytes(&self) -> usize {
        self.config
            .output_limit_bytes
            .saturating_add(RESULT_RESERVE_BYTES)
    }
}

impl ScriptRuntime for NodeRuntime {
    #[instrument(skip_all, fields(source_bytes = source.len()))]
    fn execute(&self, source: &str) -> ExecutionTrace {
        let Some(cmd) = self.command() else {
            error!("script runtime command is empty");
            return ExecutionTrace::faulted(Vec::new(), "script runtime command is empty");
        };
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let nonce = random_token(NONCE_LEN);
        let input = format!("{nonce}\n{source}");
        let output = match run_command_with_timeout(
            cmd,
            Some(input.as_bytes()),
            timeout,
            self.pipe_limit_bytes(),
        ) {
            Ok(output) => output,
            Err(err) => {
                error!(err = %err, "script runtime failed to run");
                return ExecutionTrace::faulted(
                    Vec::new(),
                    format!("failed to start script runtime: {err:#}"),
                );
            }
        };

        let trace = trace_from_output(&output, &nonce, self.config.timeout_ms);
        debug!(
            succeeded = trace.succeeded,
            output_lines = trace.output_lines.len(),
            error_lines = trace.error_lines.len(),
            "script finished"
        );
        trace
    }
}

/// One line of the bootstrap's NDJSON protocol.
#[derive(Debug, Deserialize)]
struct Envelope {
    nonce: String,
    #[serde(flatten)]
    record: Record,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record {
    Log {
        text: String,
    },
    Error {
        text: String,
    },
    Result {
        success: bool,
        message: Option<String>,
    },
}

/// Rebuild a trace from the child's captured streams.
///
/// Records whose nonce differs from `nonce` are dropped. Lines after the first
/// `result` record are ignored. Without a `result` record the run is a failure and
/// the message explains why (timeout, truncation, stderr).
fn trace_from_output(output: &CommandOutput, nonce: &str, timeout_ms: u64) -> ExecutionTrace {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut output_lines = Vec::new();
    let mut error_lines = Vec::new();
    let mut outcome = None;

    for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
        let envelope = match serde_json::from_str::<Envelope>(line) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(err = %err, "ignoring unparseable runtime record");
                continue;
            }
        };
        if envelope.nonce != nonce {
            warn!("ignoring runtime record with a foreign nonce");
            continue;
        }
        match envelope.record {
            Record::Log { text } => output_lines.push(text),
            Record::Error { text } => error_lines.push(text),
            Record::Result { success, message } => {
                outcome = Some((success, message));
                break;
            }
        }
    }

    let message = match outcome {
        Some((true, _)) if !output.timed_out => {
            return ExecutionTrace::completed(output_lines, error_lines);
        }
        _ if output.timed_out => format!("execution timed out after {timeout_ms} ms"),
        Some((_, message)) => message.unwrap_or_else(|| "script failed".to_string()),
        None if output.stdout_truncated > 0 => OUTPUT_LIMIT_MESSAGE.to_string(),
        None => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                NO_RESULT_MESSAGE.to_string()
            } else {
                stderr.to_string()
            }
        }
    };

    ExecutionTrace {
        succeeded: false,
        output_lines,
        error_lines,
        error_message: Some(message),
    }
}
