//! Test-only runtime fakes and trace builders.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::types::ExecutionTrace;
use crate::io::runtime::ScriptRuntime;

/// Trace of a clean run that printed `lines`.
pub fn printed(lines: &[&str]) -> ExecutionTrace {
    ExecutionTrace::completed(lines.iter().map(|l| l.to_string()).collect(), Vec::new())
}

/// Trace of a run that printed `lines` and then faulted with `message`.
pub fn faulted(lines: &[&str], message: &str) -> ExecutionTrace {
    ExecutionTrace::faulted(lines.iter().map(|l| l.to_string()).collect(), message)
}

/// Runtime returning queued traces instead of executing anything.
///
/// With a fallback set, the fallback is returned once the queue is empty;
/// otherwise an exhausted queue yields a faulted trace.
pub struct ScriptedRuntime {
    queue: Mutex<VecDeque<ExecutionTrace>>,
    fallback: Option<ExecutionTrace>,
    calls: AtomicUsize,
}

impl ScriptedRuntime {
    pub fn new(traces: Vec<ExecutionTrace>) -> Self {
        Self {
            queue: Mutex::new(traces.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `trace` for every execution.
    pub fn always(trace: ExecutionTrace) -> Self {
        Self {
            fallback: Some(trace),
            ..Self::new(Vec::new())
        }
    }

    /// Number of `execute` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScriptRuntime for ScriptedRuntime {
    fn execute(&self, _source: &str) -> ExecutionTrace {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self
            .queue
            .lock()
            .expect("scripted runtime lock")
            .pop_front();
        queued
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| ExecutionTrace::faulted(Vec::new(), "scripted runtime exhausted"))
    }
}
