//! Test case and instruction group containers (C4).

use super::instruction::{EnsurePredicate, ExecutableKind, Instruction, RuntimeSqlResultType};
use super::response::{Response, ResponseMessage};
use std::time::Duration;

/// A named ordered list of instructions, plus back-references to earlier
/// groups whose contents should be attached as context in a failure report.
///
/// `associate_groups` are stored as indices into the owning [`TestCase`]'s
/// group list, never as owning references — an `InstructionGroup` holding an
/// `Rc<InstructionGroup>` to an earlier sibling would create a structure
/// that can't express "must appear earlier", and is needless indirection for
/// what is really just a lookup.
#[derive(Debug, Clone, Default)]
pub struct InstructionGroup {
    pub name: String,
    pub instructions: Vec<Instruction>,
    pub associate_groups: Vec<usize>,
}

impl InstructionGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
            associate_groups: Vec::new(),
        }
    }

    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    pub fn add_echo_instruction(&mut self, payload: impl Into<String>) -> &mut Self {
        self.push(Instruction::Echo {
            payload: payload.into(),
        })
    }

    pub fn add_sql_instruction(&mut self, sql: impl Into<String>, expected: Response) -> &mut Self {
        self.push(Instruction::sql(sql, expected))
    }

    pub fn add_sort_sql_instruction(
        &mut self,
        sql: impl Into<String>,
        expected: Response,
    ) -> &mut Self {
        self.push(Instruction::sql(sql, expected).sorted())
    }

    /// Parses a block: first non-empty line is the SQL, remaining non-empty
    /// lines are the expected result, one `Normal` message per line.
    pub fn add_block_sql_instruction(&mut self, block: &str) -> &mut Self {
        let mut lines = block.lines().filter(|l| !l.trim().is_empty());
        let sql = lines.next().unwrap_or_default().to_string();
        let expected = Response::from_raw_text(&lines.collect::<Vec<_>>().join("\n"));
        self.add_sql_instruction(sql, expected)
    }

    pub fn add_sort_block_sql_instruction(&mut self, block: &str) -> &mut Self {
        self.add_block_sql_instruction(block);
        if let Some(last) = self.instructions.pop() {
            self.push(last.sorted());
        }
        self
    }

    fn runtime_sql(
        &mut self,
        sql: impl Into<String>,
        result_type: RuntimeSqlResultType,
        remove_header: bool,
    ) -> &mut Self {
        self.push(Instruction::RuntimeSql {
            sql: sql.into(),
            oracle_sql: None,
            result_type,
            remove_header,
            timeout: super::instruction::DEFAULT_TIMEOUT,
        })
    }

    pub fn add_runtime_ddl_instruction(&mut self, sql: impl Into<String>) -> &mut Self {
        self.runtime_sql(sql, RuntimeSqlResultType::Boolean, false)
    }

    pub fn add_runtime_dml_instruction(&mut self, sql: impl Into<String>) -> &mut Self {
        self.runtime_sql(sql, RuntimeSqlResultType::Boolean, false)
    }

    pub fn add_runtime_dql_instruction(&mut self, sql: impl Into<String>) -> &mut Self {
        self.runtime_sql(sql, RuntimeSqlResultType::ResultSet, true)
    }

    pub fn add_sort_runtime_dql_instruction(&mut self, sql: impl Into<String>) -> &mut Self {
        self.runtime_sql(sql, RuntimeSqlResultType::ResultSet, true);
        if let Some(last) = self.instructions.pop() {
            self.push(last.sorted());
        }
        self
    }

    pub fn add_ensure_sql_instruction(
        &mut self,
        sql: impl Into<String>,
        predicate: &str,
    ) -> &mut Self {
        let predicate = EnsurePredicate::parse(predicate)
            .unwrap_or_else(|| panic!("unknown ensure predicate: {predicate}"));
        self.push(Instruction::EnsureSql {
            sql: sql.into(),
            predicate,
            timeout: super::instruction::DEFAULT_TIMEOUT,
        })
    }

    pub fn add_connect_instruction(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Instruction::Connect { name: name.into() })
    }

    pub fn add_connection_instruction(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Instruction::Connection { name: name.into() })
    }

    pub fn add_restart_instruction(&mut self, force: bool) -> &mut Self {
        self.push(Instruction::Restart { force })
    }

    pub fn add_unittest_instruction(
        &mut self,
        path: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> &mut Self {
        self.push(Instruction::Executable {
            path: path.into(),
            args,
            kind: ExecutableKind::Unittest,
            timeout,
        })
    }

    pub fn add_annbm_instruction(
        &mut self,
        path: impl Into<String>,
        args: Vec<String>,
        min_recall: f64,
        min_qps: f64,
        timeout: Duration,
    ) -> &mut Self {
        self.push(Instruction::Executable {
            path: path.into(),
            args,
            kind: ExecutableKind::AnnBenchmark { min_recall, min_qps },
            timeout,
        })
    }

    /// Legacy text-mode instruction: the sibling `.test`/`.result` file
    /// pair becomes one `Chunk` whose lines are re-dispatched by the
    /// [`crate::executor::ChunkExecutor`] and compared against the result
    /// file's lines verbatim.
    pub fn add_chunk_instruction(&mut self, test_text: &str, result_text: &str) -> &mut Self {
        let lines = test_text.lines().map(str::to_string).collect();
        let expected = Response::new(
            result_text
                .lines()
                .map(|l| ResponseMessage::Normal(l.to_string()))
                .collect(),
        );
        self.push(Instruction::Chunk { lines, expected })
    }

    pub fn add_tpcc_instruction(
        &mut self,
        path: impl Into<String>,
        args: Vec<String>,
        min_tpmc: f64,
        timeout: Duration,
    ) -> &mut Self {
        self.push(Instruction::Executable {
            path: path.into(),
            args,
            kind: ExecutableKind::Tpcc { min_tpmc },
            timeout,
        })
    }
}

/// Per-case server knobs passed through to the supervisor at start time.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    pub trx_model: Option<String>,
    pub protocol: Option<String>,
    pub storage_engine: Option<String>,
}

/// A complete test case: name, description, ordered instruction groups, and
/// the flags that govern what the case executor must set up before running.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub description: Option<String>,
    pub groups: Vec<InstructionGroup>,
    pub need_observer: bool,
    pub need_mysql: bool,
    pub server_options: ServerOptions,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            groups: Vec::new(),
            need_observer: true,
            need_mysql: false,
            server_options: ServerOptions::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn needs_mysql(mut self) -> Self {
        self.need_mysql = true;
        self
    }

    /// Adds a new instruction group. `associate_groups` must reference groups
    /// that already exist in `self.groups` (i.e. appear strictly earlier);
    /// violating this is a [`crate::error::TestError::InvalidAssociateGroup`]
    /// raised by the suite loader's validation pass, not here, so that
    /// case-author code stays ergonomic (panicking mid-construction on a
    /// forward reference would be a worse failure mode than a clear
    /// validation error at load time).
    pub fn add_execution_group(
        &mut self,
        name: impl Into<String>,
        associate_groups: &[&str],
    ) -> &mut InstructionGroup {
        let indices: Vec<usize> = associate_groups
            .iter()
            .filter_map(|want| self.groups.iter().position(|g| g.name == *want))
            .collect();
        self.groups.push(InstructionGroup {
            name: name.into(),
            instructions: Vec::new(),
            associate_groups: indices,
        });
        self.groups.last_mut().expect("just pushed")
    }

    /// Validate associate-group references resolved correctly and the case
    /// name set is internally consistent (no duplicate group names).
    pub fn validate(&self) -> Result<(), crate::error::TestError> {
        for group in &self.groups {
            for &idx in &group.associate_groups {
                if idx >= self.groups.len() {
                    return Err(crate::error::TestError::InvalidAssociateGroup {
                        case: self.name.clone(),
                        detail: format!(
                            "group '{}' references out-of-range group index {idx}",
                            group.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn associate_group_resolves_to_an_earlier_index() {
        let mut case = TestCase::new("t");
        case.add_execution_group("setup", &[]);
        let read = case.add_execution_group("read", &["setup"]);
        read.add_echo_instruction("hi");
        assert_eq!(case.groups[1].associate_groups, vec![0]);
        assert!(case.validate().is_ok());
    }

    #[test]
    fn unknown_associate_group_name_is_silently_dropped_at_construction() {
        // A forward/unknown reference resolves to no index here; the suite
        // loader is the one that turns a dangling reference into an error
        // (see `crate::suite::loader::validate_and_sort`), since an
        // out-of-range index can only arise from manual `InstructionGroup`
        // construction, not from `add_execution_group`.
        let mut case = TestCase::new("t");
        case.add_execution_group("read", &["does_not_exist"]);
        assert!(case.groups[0].associate_groups.is_empty());
        assert!(case.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_associate_group_index() {
        let mut case = TestCase::new("t");
        case.groups.push(InstructionGroup {
            name: "bad".to_string(),
            instructions: Vec::new(),
            associate_groups: vec![5],
        });
        assert!(case.validate().is_err());
    }
}
