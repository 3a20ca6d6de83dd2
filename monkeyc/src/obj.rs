use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::op_code::Instructions;

/// A function body lowered to its own instruction stream. Stored in the
/// constant pool of the program that defines it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Local slots to reserve on call, parameters included
    pub num_locals: usize,
    pub num_parameters: usize,
}

impl Display for CompiledFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<fn/{}>", self.num_parameters)
    }
}
