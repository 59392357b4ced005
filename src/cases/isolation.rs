//! The `connection_isolation` case: a second connection's insert must be
//! visible from `default` once it commits. Matches §8 scenario S6.

use crate::model::TestCase;

pub fn create_test_cases() -> Vec<TestCase> {
    let mut case = TestCase::new("connection_isolation")
        .with_description("a committed insert on one connection is visible from another")
        .needs_mysql();

    let setup = case.add_execution_group("setup", &[]);
    setup.add_runtime_ddl_instruction("CREATE TABLE iso(id int)");

    let write = case.add_execution_group("write_other_connection", &["setup"]);
    write.add_connect_instruction("u1");
    write.add_connection_instruction("u1");
    write.add_runtime_dml_instruction("INSERT INTO iso VALUES(1)");

    let read = case.add_execution_group("read_default", &["setup", "write_other_connection"]);
    read.add_connection_instruction("default");
    read.add_sort_runtime_dql_instruction("SELECT * FROM iso");

    vec![case]
}
