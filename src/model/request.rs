//! The request half of the wire protocol: what an instruction sends.

use std::fmt;

/// The kind of request an instruction sends to the system under test.
///
/// Kept as a closed enum (rather than a free-form string tag) so that every
/// construction site is exhaustively checked by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Echo,
    Sort,
    Sql,
    RuntimeSql,
    Connect,
    Connection,
    Restart,
    Chunk,
    Executable,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Echo => "echo",
            Self::Sort => "sort",
            Self::Sql => "sql",
            Self::RuntimeSql => "runtime_sql",
            Self::Connect => "connect",
            Self::Connection => "connection",
            Self::Restart => "restart",
            Self::Chunk => "chunk",
            Self::Executable => "executable",
        };
        f.write_str(s)
    }
}

/// A single outbound request: a tag plus its opaque payload.
///
/// Immutable after construction, matching the original's `Request`, which is
/// built once per instruction and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: CommandKind,
    data: String,
}

impl Request {
    pub fn new(command: CommandKind, data: impl Into<String>) -> Self {
        Self {
            command,
            data: data.into(),
        }
    }

    pub fn command(&self) -> CommandKind {
        self.command
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}
