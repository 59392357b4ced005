//! Reporting (C11): renders a [`TestResult`] to a human-readable summary and
//! a machine-readable JSON summary for CI consumption.
//!
//! Failure message composition follows §7 exactly: associated-group
//! summary, then the failing instruction's request, then its debug lines,
//! then a unified-diff-style comparison, then any `user_exception` text,
//! then the first ~15 lines of a core backtrace if one was captured.

use serde_json::json;

use crate::case::{InstructionResultGroup, TestCaseResult};
use crate::model::TestCase;
use crate::suite::TestResult;

const MAX_DEBUG_LINES: usize = 20;

/// Render the full suite result as a human-readable summary, with a
/// per-failure diagnostic block for every case that did not pass.
pub fn render_text(result: &TestResult, cases: &[TestCase]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "suite {}: {}/{} passed in {:?}\n",
        result.suite_name,
        result.passed_count(),
        result.cases.len(),
        result.duration
    ));

    for case_result in &result.cases {
        if case_result.passed() {
            out.push_str(&format!("  PASS {}\n", case_result.case_name));
            continue;
        }
        out.push_str(&format!("  FAIL {}\n", case_result.case_name));
        let case = cases.iter().find(|c| c.name == case_result.case_name);
        if let Some(case) = case {
            for line in failure_report(case, case_result) {
                out.push_str("    ");
                out.push_str(&line);
                out.push('\n');
            }
        } else if let Some(test_exception) = &case_result.test_exception {
            out.push_str(&format!("    test_exception: {test_exception}\n"));
        }
    }
    out
}

/// Build the ordered diagnostic lines for one failing case, per §7's
/// composition order.
pub fn failure_report(case: &TestCase, result: &TestCaseResult) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(test_exception) = &result.test_exception {
        lines.push(format!("test_exception: {test_exception}"));
        return lines;
    }

    let Some(failing_group_idx) = result.groups.len().checked_sub(1) else {
        return lines;
    };
    let Some(failing_result_group) = result.groups.get(failing_group_idx) else {
        return lines;
    };
    let Some(failing_instr) = failing_result_group.results.last() else {
        return lines;
    };

    if let Some(case_group) = case.groups.get(failing_group_idx) {
        for &assoc_idx in &case_group.associate_groups {
            if let Some(assoc_group) = case.groups.get(assoc_idx) {
                lines.push(format!("-- associated group: {} --", assoc_group.name));
                if let Some(assoc_result) = result.groups.get(assoc_idx) {
                    lines.extend(summary_with_prefix(assoc_result));
                }
            }
        }
    }

    lines.push(format!("request: {}", failing_instr.instruction.request().data()));

    let debug_lines: Vec<String> = failing_instr
        .received
        .debug_messages()
        .take(MAX_DEBUG_LINES)
        .map(|m| m.text().to_string())
        .collect();
    if !debug_lines.is_empty() {
        lines.push("debug:".to_string());
        lines.extend(debug_lines);
    }

    let diff = failing_instr.diff_lines();
    if !diff.is_empty() {
        lines.push("diff:".to_string());
        lines.extend(diff);
    }

    if let Some(user_exception) = &result.user_exception {
        lines.push(format!("user_exception: {user_exception}"));
    }

    if let Some(backtrace) = &result.core_backtrace {
        lines.push("core backtrace:".to_string());
        lines.extend(backtrace.lines().take(15).map(str::to_string));
    }

    lines
}

fn summary_with_prefix(group: &InstructionResultGroup) -> Vec<String> {
    group
        .summary_lines()
        .into_iter()
        .map(|l| format!("  {l}"))
        .collect()
}

/// Render the suite result as a `serde_json::Value` suitable for
/// `--report-json`.
pub fn render_json(result: &TestResult, cases: &[TestCase]) -> serde_json::Value {
    let case_values: Vec<serde_json::Value> = result
        .cases
        .iter()
        .map(|case_result| {
            let passed = case_result.passed();
            let mut value = json!({
                "name": case_result.case_name,
                "passed": passed,
                "score": case_result.score,
                "user_exception": case_result.user_exception,
                "test_exception": case_result.test_exception,
            });
            if !passed {
                if let Some(case) = cases.iter().find(|c| c.name == case_result.case_name) {
                    value["failure"] = json!(failure_report(case, case_result).join("\n"));
                }
            }
            value
        })
        .collect();

    json!({
        "suite": result.suite_name,
        "passed": result.passed_count(),
        "failed": result.failed_count(),
        "total": result.cases.len(),
        "duration_ms": result.duration.as_millis() as u64,
        "exit_code": result.exit_code(),
        "cases": case_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::InstructionResult;
    use crate::model::{Instruction, Response};
    use std::time::Duration;

    #[test]
    fn render_text_reports_pass_and_fail_lines_with_a_diff() {
        let mut passing = TestCase::new("ok");
        passing.add_execution_group("g", &[]).add_echo_instruction("hi");

        let mut failing = TestCase::new("bad");
        failing
            .add_execution_group("g", &[])
            .add_sql_instruction("SELECT 1", Response::single_normal("expected"));

        let cases = vec![passing.clone(), failing.clone()];

        let mut pass_result = TestCaseResult::new(&passing);
        pass_result.groups.push(InstructionResultGroup::new("g"));

        let mut fail_result = TestCaseResult::new(&failing);
        let mut group = InstructionResultGroup::new("g");
        let mut instr_result = InstructionResult::new(
            Instruction::sql("SELECT 1", Response::single_normal("expected")),
            Response::single_normal("actual"),
        );
        instr_result.mark_checked();
        group.results.push(instr_result);
        fail_result.groups.push(group);

        let suite = TestResult::new("suite", vec![pass_result, fail_result], Duration::from_secs(1));
        let text = render_text(&suite, &cases);

        assert!(text.contains("PASS ok"));
        assert!(text.contains("FAIL bad"));
        assert!(text.contains("request: SELECT 1"));
        assert!(text.contains("diff:"));
    }

    #[test]
    fn render_json_marks_exit_code_from_all_passed() {
        let case = TestCase::new("ok");
        let mut result = TestCaseResult::new(&case);
        result.groups.push(InstructionResultGroup::new("g"));
        let suite = TestResult::new("suite", vec![result], Duration::from_secs(0));

        let value = render_json(&suite, &[case]);
        assert_eq!(value["exit_code"], 0);
        assert_eq!(value["passed"], 1);
        assert_eq!(value["failed"], 0);
    }
}
