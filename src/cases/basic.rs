//! The `basic` case: create a table, insert a row, read it back sorted
//! with its header stripped. Matches §8 scenario S1.

use crate::model::{Response, TestCase};

pub fn create_test_cases() -> Vec<TestCase> {
    let mut case = TestCase::new("basic").with_description("create, insert, select round trip");

    let group = case.add_execution_group("ddl_dml", &[]);
    group.add_sql_instruction("CREATE TABLE t(id int, name char(4))", Response::single_normal("SUCCESS"));
    group.add_sql_instruction("INSERT INTO t VALUES (1,'a')", Response::single_normal("SUCCESS"));

    let select_group = case.add_execution_group("select", &["ddl_dml"]);
    select_group.add_sort_sql_instruction("SELECT * FROM t", Response::single_normal("1 | a"));

    vec![case, ensure_hashjoin_case()]
}

/// The `ensure_hashjoin` case: populates two tables and checks the join
/// plan uses a hash join. Matches §8 scenarios S2/S3.
fn ensure_hashjoin_case() -> TestCase {
    let mut case = TestCase::new("ensure_hashjoin").with_description("join plan must use a hash join");

    let setup = case.add_execution_group("setup", &[]);
    setup.add_sql_instruction("CREATE TABLE t(a int)", Response::single_normal("SUCCESS"));
    setup.add_sql_instruction("CREATE TABLE s(a int)", Response::single_normal("SUCCESS"));

    let plan = case.add_execution_group("plan", &["setup"]);
    plan.add_ensure_sql_instruction("SELECT * FROM t JOIN s ON t.a=s.a", "ensure:hashjoin");

    case
}
