use serde::{Deserialize, Serialize};

use crate::{op_code::Instructions, value::Value};

/// The compiled program handed to the VM: the top-level instruction stream
/// plus the constant pool every instruction stream indexes into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}
