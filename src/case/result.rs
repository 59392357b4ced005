//! Result types produced by running instructions, groups, and whole cases.

use crate::model::{Instruction, Response, ResponseMessage, TestCase};

/// The outcome of a single instruction: what actually ran (possibly
/// rewritten, for `RuntimeSql`, with its oracle-derived expectation baked
/// in), what came back, and an optional numeric score (benchmarks only).
#[derive(Debug, Clone)]
pub struct InstructionResult {
    pub instruction: Instruction,
    pub received: Response,
    pub score: Option<f64>,
    /// The verdict from the last `mark_checked()` call. Recorded separately
    /// from `received` because a passing instruction has its response body
    /// cleared (see `clear_response`) to bound memory, and the verdict must
    /// survive that clearing — re-deriving it from `check()` afterward would
    /// always see an empty `received` and report a false failure.
    passed: bool,
}

impl InstructionResult {
    pub fn new(instruction: Instruction, received: Response) -> Self {
        Self {
            instruction,
            received,
            score: None,
            passed: true,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Case-insensitive, line-by-line comparison of `Normal` messages only.
    /// `Debug` messages never participate (see SPEC_FULL.md Open Questions).
    pub fn check(&self) -> bool {
        let Some(expected) = self.instruction.static_expected() else {
            return true;
        };
        let expected_normals: Vec<&ResponseMessage> = expected.normal_messages().collect();
        let received_normals: Vec<&ResponseMessage> = self.received.normal_messages().collect();
        expected_normals.len() == received_normals.len()
            && expected_normals
                .iter()
                .zip(received_normals.iter())
                .all(|(a, b)| a == b)
    }

    /// Run `check()` against the current `received` and record the verdict,
    /// returning it. Must be called before `clear_response`.
    pub fn mark_checked(&mut self) -> bool {
        self.passed = self.check();
        self.passed
    }

    /// The verdict recorded by the last `mark_checked()` call.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Force the verdict to failed, for a synthetic result built from a
    /// caught exception rather than a real comparison.
    pub fn mark_failed(&mut self) {
        self.passed = false;
    }

    /// Bound memory on success: drop the response bodies but keep the
    /// instruction (still needed to render associate-group context later).
    pub fn clear_response(&mut self) {
        self.received = Response::empty();
    }

    /// Up to ~12 diff hunk lines between expected and received `Normal`
    /// messages, `+`/`-`/`  ` prefixed, for inclusion in a failure report.
    pub fn diff_lines(&self) -> Vec<String> {
        let expected: Vec<String> = self
            .instruction
            .static_expected()
            .map(|r| r.normal_messages().map(|m| m.text().to_string()).collect())
            .unwrap_or_default();
        let received: Vec<String> = self
            .received
            .normal_messages()
            .map(|m| m.text().to_string())
            .collect();

        let diff = similar::TextDiff::from_slices(&expected, &received);
        let mut out = Vec::new();
        for change in diff.iter_all_changes() {
            let prefix = match change.tag() {
                similar::ChangeTag::Delete => "- ",
                similar::ChangeTag::Insert => "+ ",
                similar::ChangeTag::Equal => "  ",
            };
            out.push(format!("{prefix}{}", change.value()));
            if out.len() >= 12 {
                break;
            }
        }
        out
    }
}

/// Outcome of one instruction group: its per-instruction results, up to and
/// including the first failure.
#[derive(Debug, Clone, Default)]
pub struct InstructionResultGroup {
    pub name: String,
    pub results: Vec<InstructionResult>,
}

impl InstructionResultGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.results.iter().all(InstructionResult::passed)
    }

    /// Up to 5 lines summarizing this group, for use as associate-group
    /// context in a failure report.
    pub fn summary_lines(&self) -> Vec<String> {
        self.results
            .iter()
            .take(5)
            .map(|r| r.instruction.request().data().to_string())
            .collect()
    }
}

/// The full outcome of running one test case.
#[derive(Debug, Clone)]
pub struct TestCaseResult {
    pub case_name: String,
    pub groups: Vec<InstructionResultGroup>,
    pub user_exception: Option<String>,
    pub test_exception: Option<String>,
    pub core_backtrace: Option<String>,
    pub score: f64,
}

impl TestCaseResult {
    pub fn new(case: &TestCase) -> Self {
        Self {
            case_name: case.name.clone(),
            groups: Vec::new(),
            user_exception: None,
            test_exception: None,
            core_backtrace: None,
            score: 0.0,
        }
    }

    pub fn passed(&self) -> bool {
        self.user_exception.is_none()
            && self.test_exception.is_none()
            && self.groups.iter().all(InstructionResultGroup::passed)
    }
}
