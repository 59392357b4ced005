//! The `restart_persists` case: a row inserted before a restart must still
//! be visible afterward. Matches §8 scenario S5.

use crate::model::{Response, TestCase};

pub fn create_test_cases() -> Vec<TestCase> {
    let mut case = TestCase::new("restart_persists")
        .with_description("a committed row survives a server restart");

    let group = case.add_execution_group("insert_restart_select", &[]);
    group.add_sql_instruction("CREATE TABLE r(id int)", Response::single_normal("SUCCESS"));
    group.add_sql_instruction("INSERT INTO r VALUES (7)", Response::single_normal("SUCCESS"));
    group.add_restart_instruction(false);
    group.add_sort_sql_instruction("SELECT * FROM r", Response::single_normal("7"));

    vec![case]
}
