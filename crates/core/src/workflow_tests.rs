// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

// ── Prompt rendering ─────────────────────────────────────────────────────────

#[test]
fn render_substitutes_files_and_promise() {
    let rendered = render_prompt("do: {{files}} until {{promise}}", &["/a/spec.md"], "<done/>");
    assert_eq!(rendered, "do: /a/spec.md until <done/>");
}

#[test]
fn render_single_file_has_no_plural() {
    let rendered = render_prompt("spec{{plural}}", &["/a.md"], "x");
    assert_eq!(rendered, "spec");
}

#[test]
fn render_multiple_files_pluralizes_and_joins() {
    let rendered = render_prompt("spec{{plural}}: {{files}}", &["/a.md", "/b.md"], "x");
    assert_eq!(rendered, "specs: /a.md /b.md");
}

#[test]
fn render_repeated_placeholders() {
    let rendered = render_prompt("{{promise}} {{promise}}", &["/a.md"], "DONE");
    assert_eq!(rendered, "DONE DONE");
}

// ── Gate markers ─────────────────────────────────────────────────────────────

#[parameterized(
    plain = { "GATE: PASS", Some(true) },
    lowercase = { "gate: pass", Some(true) },
    equals_sep = { "GATE = PASS", Some(true) },
    extra_space = { "GATE :  PASS", Some(true) },
    embedded = { "review done\nGATE: PASS\n", Some(true) },
    fail = { "GATE: FAIL", Some(false) },
    fail_lowercase = { "Gate: fail, missing tests", Some(false) },
    absent = { "all good", None },
    no_separator = { "GATE PASS", None },
    key_only = { "the GATE is open", None },
)]
fn gate_verdict_cases(text: &str, expected: Option<bool>) {
    assert_eq!(gate_verdict(text), expected);
}

#[test]
fn last_gate_marker_wins() {
    assert_eq!(gate_verdict("GATE: PASS\nre-checked\nGATE: FAIL"), Some(false));
    assert_eq!(gate_verdict("GATE: FAIL\nfixed\nGATE: PASS"), Some(true));
}

#[parameterized(
    success = { "MERGE_SUCCESS: true", Some(true) },
    caps = { "MERGE_SUCCESS: TRUE", Some(true) },
    spaced = { "merge_success = true", Some(true) },
    failure = { "MERGE_SUCCESS: false", Some(false) },
    absent = { "rebased cleanly", None },
)]
fn merge_verdict_cases(text: &str, expected: Option<bool>) {
    assert_eq!(merge_verdict(text), expected);
}

// ── Workflows ────────────────────────────────────────────────────────────────

#[test]
fn builtin_build_is_single_step() {
    let wf = Workflow::builtin("build").unwrap();
    assert_eq!(wf.steps.len(), 1);
    assert!(!wf.steps[0].gate);
    wf.validate().unwrap();
}

#[test]
fn builtin_build_review_gates_back_to_implement() {
    let wf = Workflow::builtin("build-review").unwrap();
    assert_eq!(wf.steps.len(), 2);
    let review = &wf.steps[1];
    assert!(review.gate);
    assert_eq!(review.on_fail.as_deref(), Some("implement"));
    wf.validate().unwrap();
}

#[test]
fn unknown_builtin_is_none() {
    assert!(Workflow::builtin("nope").is_none());
}

#[test]
fn validate_rejects_unknown_on_fail_target() {
    let wf = Workflow::new(
        "broken",
        vec![WorkflowStep::new("a", "p").gated("missing")],
    );
    assert!(wf.validate().is_err());
}

#[test]
fn validate_rejects_empty_workflow() {
    assert!(Workflow::new("empty", vec![]).validate().is_err());
}

#[test]
fn step_index_finds_by_name() {
    let wf = Workflow::builtin("build-review").unwrap();
    assert_eq!(wf.step_index("implement"), Some(0));
    assert_eq!(wf.step_index("review"), Some(1));
    assert_eq!(wf.step_index("nope"), None);
}

#[test]
fn step_serde_defaults() {
    let step: WorkflowStep = serde_json::from_str(r#"{"name":"a","prompt":"p"}"#).unwrap();
    assert!(!step.gate);
    assert!(step.on_fail.is_none());
    assert_eq!(step.max_retries, DEFAULT_GATE_RETRIES);
}
