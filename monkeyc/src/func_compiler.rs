use crate::op_code::{make, Instructions, Opcode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmittedInstruction {
    pub opcode: Opcode,
    pub position: usize,
}

/// Instruction buffer for one function body, including the implicit
/// top-level program.
///
/// Remembers the last two instructions emitted so the compiler can drop or
/// rewrite a trailing `Pop`.
#[derive(Debug, Default)]
pub struct FuncCompiler {
    pub instructions: Instructions,
    pub last_instruction: Option<EmittedInstruction>,
    pub previous_instruction: Option<EmittedInstruction>,
}

impl FuncCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an encoded instruction and return its address.
    pub fn add_instruction(&mut self, opcode: Opcode, instruction: &[u8]) -> usize {
        let position = self.instructions.push_instruction(instruction);
        self.previous_instruction = self.last_instruction;
        self.last_instruction = Some(EmittedInstruction { opcode, position });
        position
    }

    pub fn last_instruction_is(&self, opcode: Opcode) -> bool {
        self.last_instruction
            .map_or(false, |last| last.opcode == opcode)
    }

    /// Drop a trailing `Pop` so the value it would discard stays on the stack.
    pub fn remove_last_pop(&mut self) {
        if let Some(last) = self.last_instruction {
            if last.opcode == Opcode::Pop {
                self.instructions.truncate(last.position);
                self.last_instruction = self.previous_instruction;
            }
        }
    }

    /// Rewrite a trailing `Pop` into `ReturnValue` in place. Both encode to a
    /// single byte so no address moves.
    pub fn replace_last_pop_with_return(&mut self) {
        if let Some(last) = self.last_instruction.as_mut() {
            if last.opcode == Opcode::Pop {
                self.instructions
                    .replace(last.position, &make(Opcode::ReturnValue, &[]));
                last.opcode = Opcode::ReturnValue;
            }
        }
    }
}
