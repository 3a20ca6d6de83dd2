use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Failures of the instruction encoding layer. These indicate a corrupt
/// instruction stream rather than a problem in the compiled source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("opcode {0} undefined")]
    UnknownOpcode(u8),
    #[error("{opcode} expects {expected} operand bytes but only {actual} remain")]
    TruncatedOperands {
        opcode: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("undefined identifier: {name}")]
    UndefinedIdentifier { name: String },
    #[error("unknown operator {operator} in {expression}")]
    UnknownOperator {
        operator: String,
        expression: String,
    },
    #[error("invalid literal {literal}: {reason}")]
    InvalidLiteral { literal: String, reason: String },
    #[error("too many constants in one program (limit is {limit})")]
    TooManyConstants { limit: usize },
    #[error("too many global variables in one program (limit is {limit})")]
    TooManyGlobals { limit: usize },
    #[error("too many local variables in function (limit is {limit})")]
    TooManyLocals { limit: usize },
    #[error("too many items in {literal} literal (limit is {limit})")]
    TooManyElements { literal: &'static str, limit: usize },
    #[error("jump target {target} is out of range (limit is {limit})")]
    JumpTooFar { target: usize, limit: usize },
    #[error("can't call {callee} with more than {limit} arguments")]
    TooManyArguments { callee: String, limit: usize },
    #[error(transparent)]
    Code(#[from] CodeError),
}

impl CompileError {
    pub fn unknown_operator(operator: &str, expression: impl ToString) -> Self {
        Self::UnknownOperator {
            operator: operator.to_string(),
            expression: expression.to_string(),
        }
    }

    pub fn invalid_literal(literal: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidLiteral {
            literal: literal.to_string(),
            reason: reason.into(),
        }
    }
}
