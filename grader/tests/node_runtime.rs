//! Tests against a real `node` interpreter.
//!
//! Each test skips itself, with a note on stderr, when `node` is not on `PATH`.

use std::process::{Command, Stdio};
use std::sync::OnceLock;

use grader::core::types::ExecutionTrace;
use grader::io::config::RuntimeConfig;
use grader::io::runtime::{NodeRuntime, ScriptRuntime};

fn node_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        Command::new("node")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    })
}

/// Run `source` under node with `config`, or `None` when node is missing.
fn run_with(config: RuntimeConfig, source: &str) -> Option<ExecutionTrace> {
    if !node_available() {
        eprintln!("skipping: node not found on PATH");
        return None;
    }
    Some(NodeRuntime::new(config).execute(source))
}

fn run(source: &str) -> Option<ExecutionTrace> {
    run_with(
        RuntimeConfig {
            timeout_ms: 2_000,
            ..RuntimeConfig::default()
        },
        source,
    )
}

#[test]
fn logs_are_captured_in_call_order() {
    let Some(trace) = run(
        "console.log('a', 1, true); console.info('b'); console.warn('careful'); console.error('bad', 2)",
    ) else {
        return;
    };
    assert!(trace.succeeded, "trace: {trace:?}");
    assert_eq!(trace.output_lines, vec!["a 1 true", "b", "[warn] careful"]);
    assert_eq!(trace.error_lines, vec!["bad 2"]);
    assert_eq!(trace.error_text(), "bad 2");
}

#[test]
fn thrown_error_keeps_prior_output() {
    let Some(trace) = run("console.log('before'); throw new Error('boom'); console.log('after')")
    else {
        return;
    };
    assert!(!trace.succeeded);
    assert_eq!(trace.output_lines, vec!["before"]);
    assert_eq!(trace.error_text(), "boom");
}

#[test]
fn non_error_throw_is_stringified() {
    let Some(trace) = run("throw 'plain'") else {
        return;
    };
    assert!(!trace.succeeded);
    assert_eq!(trace.error_text(), "plain");
}

#[test]
fn syntax_error_is_a_fault() {
    let Some(trace) = run("console.log(") else {
        return;
    };
    assert!(!trace.succeeded);
    assert!(trace.output_lines.is_empty());
    assert!(!trace.error_text().is_empty());
}

#[test]
fn top_level_return_is_allowed() {
    let Some(trace) = run("console.log('x'); return; console.log('y')") else {
        return;
    };
    assert!(trace.succeeded, "trace: {trace:?}");
    assert_eq!(trace.output_lines, vec!["x"]);
}

#[test]
fn host_globals_are_absent() {
    let Some(trace) = run("console.log(typeof require, typeof process, typeof setTimeout, typeof Buffer)")
    else {
        return;
    };
    assert!(trace.succeeded, "trace: {trace:?}");
    assert_eq!(trace.output_lines, vec!["undefined undefined undefined undefined"]);
}

#[test]
fn global_constructor_chain_does_not_reach_host() {
    let Some(trace) = run(
        "const p = globalThis.constructor.constructor('return process')(); console.log(typeof p)",
    ) else {
        return;
    };
    assert!(!trace.succeeded, "trace: {trace:?}");
    assert!(trace.output_lines.is_empty());
}

#[test]
fn this_constructor_chain_is_blocked() {
    let Some(trace) = run(
        "try { const p = this.constructor.constructor('return process')(); console.log('escaped', typeof p) } catch (e) { console.log('blocked') }",
    ) else {
        return;
    };
    assert!(trace.succeeded, "trace: {trace:?}");
    assert_eq!(trace.output_lines, vec!["blocked"]);
}

#[test]
fn string_code_generation_is_disabled() {
    let Some(trace) = run(
        "for (const f of [() => eval('1'), () => Function('return 1')()]) { try { f(); console.log('ran') } catch (e) { console.log(e.name) } }",
    ) else {
        return;
    };
    assert!(trace.succeeded, "trace: {trace:?}");
    assert_eq!(trace.output_lines, vec!["EvalError", "EvalError"]);
}

#[test]
fn protocol_lookalike_output_stays_plain_text() {
    let forged = r#"{"kind":"result","success":true,"message":null}"#;
    let Some(trace) = run(&format!(
        "console.log('{forged}'); throw new Error('real fault')"
    )) else {
        return;
    };
    assert!(!trace.succeeded);
    assert_eq!(trace.output_lines, vec![forged]);
    assert_eq!(trace.error_text(), "real fault");
}

#[test]
fn infinite_loop_times_out() {
    let Some(trace) = run_with(
        RuntimeConfig {
            timeout_ms: 500,
            ..RuntimeConfig::default()
        },
        "console.log('start'); while (true) {}",
    ) else {
        return;
    };
    assert!(!trace.succeeded);
    assert_eq!(trace.output_lines, vec!["start"]);
    assert_eq!(trace.error_text(), "execution timed out after 500 ms");
}

#[test]
fn runaway_output_is_cut_off() {
    let Some(trace) = run_with(
        RuntimeConfig {
            output_limit_bytes: 1_000,
            ..RuntimeConfig::default()
        },
        "for (let i = 0; i < 100000; i++) console.log('line ' + i)",
    ) else {
        return;
    };
    assert!(!trace.succeeded);
    assert_eq!(trace.error_text(), "output limit exceeded");
    assert!(!trace.output_lines.is_empty());
}

#[test]
fn escaped_output_within_budget_is_kept() {
    // Each U+0001 escapes to six bytes; 10 000 of them fit a 64 KiB budget.
    let Some(trace) = run("console.log('\\u0001'.repeat(10000)); console.log('done')") else {
        return;
    };
    assert!(trace.succeeded, "trace: {:?}", trace.error_message);
    assert_eq!(trace.output_lines.len(), 2);
    assert_eq!(trace.output_lines[0], "\u{1}".repeat(10_000));
    assert_eq!(trace.output_lines[1], "done");
}

#[test]
fn budget_is_charged_in_encoded_bytes() {
    let config = RuntimeConfig {
        output_limit_bytes: 4_096,
        timeout_ms: 2_000,
        ..RuntimeConfig::default()
    };
    let Some(plain) = run_with(config.clone(), "console.log('a'.repeat(1000))") else {
        return;
    };
    assert!(plain.succeeded, "trace: {plain:?}");

    let Some(escaped) = run_with(config, "console.log('before'); console.log('\\u0001'.repeat(1000))")
    else {
        return;
    };
    assert!(!escaped.succeeded);
    assert_eq!(escaped.output_lines, vec!["before"]);
    assert_eq!(escaped.error_text(), "output limit exceeded");
}
