//#![warn(clippy::pedantic)]

mod func_compiler;

pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod disassembler;
pub mod error;
pub mod obj;
pub mod op_code;
pub mod symbol_table;
pub mod value;

pub use bytecode::Bytecode;
pub use compiler::Compiler;
