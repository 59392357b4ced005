//! Built-in example case modules, written against the script API described
//! in §6. These double as worked examples of every `add_*_instruction`
//! helper and as the default suite a bare checkout can run.

mod basic;
mod isolation;
mod restart;

use crate::model::TestCase;
use crate::suite::CaseFactory;

/// All case modules linked into this binary. `main` hands this straight to
/// [`crate::suite::load_script_cases`].
pub const CASE_FACTORIES: &[CaseFactory] = &[
    basic::create_test_cases,
    isolation::create_test_cases,
    restart::create_test_cases,
];

pub fn all() -> Vec<TestCase> {
    CASE_FACTORIES.iter().flat_map(|f| f()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::load_script_cases;

    #[test]
    fn every_built_in_case_has_a_unique_name_and_resolves_its_associate_groups() {
        let cases = load_script_cases(CASE_FACTORIES).expect("built-in cases must be internally consistent");
        assert!(!cases.is_empty());
        for case in &cases {
            assert!(case.validate().is_ok(), "case '{}' failed validation", case.name);
        }
    }

    #[tokio::test]
    async fn every_built_in_case_validates_its_shape_under_dryrun() {
        for case in all() {
            let result = crate::case::dryrun(&case).await;
            assert!(
                result.test_exception.is_none(),
                "case '{}' raised a test_exception during dryrun: {:?}",
                case.name,
                result.test_exception
            );
        }
    }
}
