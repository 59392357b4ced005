//! Suite loading (C10): the script loader (compiled-in case factories) and
//! the legacy text loader (`<name>.test`/`<name>.result` file pairs).

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, TestError};
use crate::model::TestCase;

/// A case-author module's entry point. In the original, this is a Python
/// file's `create_test_cases()` function, discovered by scanning a
/// directory and importing each file; here, case modules are ordinary Rust
/// functions linked into the binary and handed to the loader explicitly —
/// no dynamic loading, since the variant set of what a "case module" can
/// produce is closed and known at compile time.
pub type CaseFactory = fn() -> Vec<TestCase>;

/// Concatenates every factory's output, validates each case's
/// associate-group references, and enforces suite-wide name uniqueness.
/// Cases are returned sorted lexicographically by name, matching the
/// original loader's directory-scan ordering.
pub fn load_script_cases(factories: &[CaseFactory]) -> Result<Vec<TestCase>> {
    let mut cases: Vec<TestCase> = factories.iter().flat_map(|f| f()).collect();
    validate_and_sort(&mut cases)?;
    Ok(cases)
}

/// Scans `dir` for `<name>.test`/`<name>.result` pairs and builds one
/// [`TestCase`] per pair, each holding a single group with one `Chunk`
/// instruction whose lines are the `.test` file's content and whose
/// expected response is the `.result` file's lines. Kept for compatibility
/// with suites that have not migrated to the script API; a file with no
/// matching sibling is skipped.
pub fn load_text_cases(dir: &Path) -> Result<Vec<TestCase>> {
    let mut cases = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(TestError::Io)?;
    for entry in entries {
        let entry = entry.map_err(TestError::Io)?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("test") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let result_path = path.with_extension("result");
        if !result_path.is_file() {
            continue;
        }
        let test_text = std::fs::read_to_string(&path).map_err(TestError::Io)?;
        let result_text = std::fs::read_to_string(&result_path).map_err(TestError::Io)?;

        let mut case = TestCase::new(stem);
        case.add_execution_group("chunk", &[])
            .add_chunk_instruction(&test_text, &result_text);
        cases.push(case);
    }
    validate_and_sort(&mut cases)?;
    Ok(cases)
}

fn validate_and_sort(cases: &mut Vec<TestCase>) -> Result<()> {
    for case in cases.iter() {
        case.validate()?;
    }
    let mut seen = HashSet::new();
    for case in cases.iter() {
        if !seen.insert(case.name.clone()) {
            return Err(TestError::DuplicateCaseName {
                name: case.name.clone(),
            });
        }
    }
    cases.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestCase;

    #[test]
    fn sorts_cases_lexicographically_by_name() {
        let mut cases = vec![TestCase::new("zebra"), TestCase::new("apple"), TestCase::new("mango")];
        validate_and_sort(&mut cases).unwrap();
        let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn rejects_duplicate_case_names() {
        let mut cases = vec![TestCase::new("dup"), TestCase::new("dup")];
        let err = validate_and_sort(&mut cases).unwrap_err();
        assert!(matches!(err, TestError::DuplicateCaseName { .. }));
    }

    #[test]
    fn load_script_cases_concatenates_every_factory() {
        fn one() -> Vec<TestCase> {
            vec![TestCase::new("a")]
        }
        fn two() -> Vec<TestCase> {
            vec![TestCase::new("b"), TestCase::new("c")]
        }
        let factories: &[CaseFactory] = &[one, two];
        let cases = load_script_cases(factories).unwrap();
        let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
