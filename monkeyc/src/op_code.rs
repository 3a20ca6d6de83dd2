use std::{
    fmt::{self, Display, Formatter},
    ops::Deref,
};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString};

use crate::error::CodeError;

/// One-byte instruction tags. The discriminants are part of the wire format
/// shared with the VM, so new opcodes only ever go at the end.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
    EnumIter,
    EnumString,
    strum::Display,
)]
#[repr(u8)]
pub enum Opcode {
    /// Push a constant pool entry. Operands: `index:u16`
    Constant,
    Add,
    Sub,
    Mul,
    Div,
    Pop,
    True,
    False,
    Equal,
    NotEqual,
    GreaterThan,
    Minus,
    Bang,
    /// Absolute jump when the popped value is not truthy. Operands: `target:u16`
    JumpNotTruthy,
    /// Absolute jump. Operands: `target:u16`
    Jump,
    Null,
    GetGlobal,
    SetGlobal,
    /// Operands: `element_count:u16`
    Array,
    /// Operands: `item_count:u16`, keys and values combined
    Hash,
    Index,
    /// Operands: `arg_count:u8`
    Call,
    ReturnValue,
    Return,
    GetLocal,
    SetLocal,
}

/// Name and operand layout of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    pub name: &'static str,
    /// Width in bytes of each operand, in order
    pub operand_widths: &'static [usize],
}

impl Definition {
    const fn new(name: &'static str, operand_widths: &'static [usize]) -> Self {
        Self {
            name,
            operand_widths,
        }
    }

    /// Total encoded length of an instruction with this definition.
    pub fn instruction_len(&self) -> usize {
        1 + self.operand_widths.iter().sum::<usize>()
    }
}

impl Opcode {
    pub const fn definition(self) -> Definition {
        match self {
            Opcode::Constant => Definition::new("OpConstant", &[2]),
            Opcode::Add => Definition::new("OpAdd", &[]),
            Opcode::Sub => Definition::new("OpSub", &[]),
            Opcode::Mul => Definition::new("OpMul", &[]),
            Opcode::Div => Definition::new("OpDiv", &[]),
            Opcode::Pop => Definition::new("OpPop", &[]),
            Opcode::True => Definition::new("OpTrue", &[]),
            Opcode::False => Definition::new("OpFalse", &[]),
            Opcode::Equal => Definition::new("OpEqual", &[]),
            Opcode::NotEqual => Definition::new("OpNotEqual", &[]),
            Opcode::GreaterThan => Definition::new("OpGreaterThan", &[]),
            Opcode::Minus => Definition::new("OpMinus", &[]),
            Opcode::Bang => Definition::new("OpBang", &[]),
            Opcode::JumpNotTruthy => Definition::new("OpJumpNotTruthy", &[2]),
            Opcode::Jump => Definition::new("OpJump", &[2]),
            Opcode::Null => Definition::new("OpNull", &[]),
            Opcode::GetGlobal => Definition::new("OpGetGlobal", &[2]),
            Opcode::SetGlobal => Definition::new("OpSetGlobal", &[2]),
            Opcode::Array => Definition::new("OpArray", &[2]),
            Opcode::Hash => Definition::new("OpHash", &[2]),
            Opcode::Index => Definition::new("OpIndex", &[]),
            Opcode::Call => Definition::new("OpCall", &[1]),
            Opcode::ReturnValue => Definition::new("OpReturnValue", &[]),
            Opcode::Return => Definition::new("OpReturn", &[]),
            Opcode::GetLocal => Definition::new("OpGetLocal", &[1]),
            Opcode::SetLocal => Definition::new("OpSetLocal", &[1]),
        }
    }

    pub fn from_byte(byte: u8) -> Result<Opcode, CodeError> {
        Opcode::try_from(byte).map_err(|_| CodeError::UnknownOpcode(byte))
    }
}

pub fn lookup(byte: u8) -> Result<Definition, CodeError> {
    Opcode::from_byte(byte).map(Opcode::definition)
}

/// Encode a single instruction. Operands are written big-endian and truncated
/// to their declared width; range checking is up to the caller.
pub fn make(opcode: Opcode, operands: &[usize]) -> Vec<u8> {
    let definition = opcode.definition();
    debug_assert_eq!(
        operands.len(),
        definition.operand_widths.len(),
        "wrong operand count for {}",
        definition.name
    );

    let mut instruction = Vec::with_capacity(definition.instruction_len());
    instruction.push(opcode.into());
    for (operand, width) in operands.iter().zip(definition.operand_widths) {
        for shift in (0..*width).rev() {
            instruction.push((operand >> (8 * shift)) as u8);
        }
    }
    instruction
}

/// Decode the operands following an opcode byte. Returns the operands and the
/// number of bytes they occupied.
pub fn read_operands(
    definition: &Definition,
    bytes: &[u8],
) -> Result<(Vec<usize>, usize), CodeError> {
    let expected = definition.instruction_len() - 1;
    if bytes.len() < expected {
        return Err(CodeError::TruncatedOperands {
            opcode: definition.name,
            expected,
            actual: bytes.len(),
        });
    }

    let mut operands = Vec::with_capacity(definition.operand_widths.len());
    let mut offset = 0;
    for width in definition.operand_widths {
        operands.push(read_operand(&bytes[offset..offset + width]));
        offset += width;
    }
    Ok((operands, offset))
}

pub fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

pub fn read_u8(bytes: &[u8]) -> u8 {
    bytes[0]
}

fn read_operand(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .fold(0, |operand, byte| (operand << 8) | usize::from(*byte))
}

/// A flat, append-only stream of encoded instructions. Addresses are byte
/// offsets into the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instructions(Vec<u8>);

impl Instructions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an encoded instruction, returning its starting address.
    pub fn push_instruction(&mut self, instruction: &[u8]) -> usize {
        let position = self.0.len();
        self.0.extend_from_slice(instruction);
        position
    }

    /// Overwrite bytes starting at `position` without changing the length.
    pub fn replace(&mut self, position: usize, instruction: &[u8]) {
        self.0[position..position + instruction.len()].copy_from_slice(instruction);
    }

    /// Drop everything from `position` onwards. Only the tail instruction is
    /// ever removed, so no address that is still referenced moves.
    pub fn truncate(&mut self, position: usize) {
        self.0.truncate(position);
    }

    /// Re-encode the single operand of the instruction at `position`.
    pub fn change_operand(&mut self, position: usize, operand: usize) -> Result<(), CodeError> {
        let opcode = Opcode::from_byte(self.0[position])?;
        let instruction = make(opcode, &[operand]);
        self.replace(position, &instruction);
        Ok(())
    }

    pub fn iter(&self) -> InstructionIter<'_> {
        InstructionIter {
            bytes: &self.0,
            offset: 0,
        }
    }
}

impl Deref for Instructions {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromIterator<Vec<u8>> for Instructions {
    fn from_iter<T: IntoIterator<Item = Vec<u8>>>(iter: T) -> Self {
        Self(iter.into_iter().flatten().collect())
    }
}

impl Display for Instructions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for decoded in self.iter() {
            match decoded {
                Ok(instruction) => writeln!(f, "{instruction}")?,
                Err(e) => writeln!(f, "ERROR: {e}")?,
            }
        }
        Ok(())
    }
}

/// An instruction decoded back out of an [`Instructions`] stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub offset: usize,
    pub opcode: Opcode,
    pub operands: Vec<usize>,
}

impl Display for DecodedInstruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04} {}", self.offset, self.opcode.definition().name)?;
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Walks an instruction stream one instruction at a time. Stops after the
/// first decoding error.
pub struct InstructionIter<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for InstructionIter<'a> {
    type Item = Result<DecodedInstruction, CodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }

        let offset = self.offset;
        let decoded = Opcode::from_byte(self.bytes[offset]).and_then(|opcode| {
            let definition = opcode.definition();
            let (operands, read) = read_operands(&definition, &self.bytes[offset + 1..])?;
            Ok((opcode, operands, read))
        });

        match decoded {
            Ok((opcode, operands, read)) => {
                self.offset += 1 + read;
                Some(Ok(DecodedInstruction {
                    offset,
                    opcode,
                    operands,
                }))
            }
            Err(e) => {
                self.offset = self.bytes.len();
                Some(Err(e))
            }
        }
    }
}
