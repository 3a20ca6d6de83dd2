use std::fmt::{self, Display, Formatter};

use crate::{
    bytecode::Bytecode,
    op_code::{Instructions, Opcode},
    value::Value,
};

/// Render `bytecode` as a human readable listing: the top-level code, the
/// constant pool, then the body of every function constant.
pub fn disassemble(bytecode: &Bytecode) -> String {
    Listing(bytecode).to_string()
}

pub struct Listing<'a>(pub &'a Bytecode);

impl Display for Listing<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Bytecode {
            instructions,
            constants,
        } = self.0;

        code(f, "<program>", instructions, constants)?;

        if !constants.is_empty() {
            writeln!(f, "== constants ==")?;
            for (index, constant) in constants.iter().enumerate() {
                writeln!(f, "{index:04} {:<17} {constant:?}", constant.type_name())?;
            }
        }

        for (index, constant) in constants.iter().enumerate() {
            if let Value::Function(function) = constant {
                code(f, &format!("<fn {index}>"), &function.instructions, constants)?;
            }
        }
        Ok(())
    }
}

fn code(
    f: &mut Formatter<'_>,
    name: &str,
    instructions: &Instructions,
    constants: &[Value],
) -> fmt::Result {
    writeln!(f, "== {name} ==")?;
    for decoded in instructions.iter() {
        let instruction = match decoded {
            Ok(instruction) => instruction,
            Err(e) => {
                writeln!(f, "ERROR: {e}")?;
                continue;
            }
        };

        write!(f, "{instruction}")?;
        if instruction.opcode == Opcode::Constant {
            if let Some(constant) = constants.get(instruction.operands[0]) {
                write!(f, " '{constant}'")?;
            }
        }
        writeln!(f)?;
    }
    Ok(())
}
