//! The instruction model (C4): requests, responses, instructions, and the
//! test case / instruction group containers that hold them.

mod case;
mod instruction;
mod request;
mod response;

pub use case::{InstructionGroup, ServerOptions, TestCase};
pub use instruction::{
    EnsurePredicate, ExecutableKind, Instruction, RuntimeSqlResultType, DEFAULT_TIMEOUT,
};
pub use request::{CommandKind, Request};
pub use response::{Response, ResponseMessage};
