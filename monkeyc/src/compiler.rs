use std::mem;

use log::{debug, trace};

use crate::{
    ast::{BlockStatement, Expression, Program, Statement},
    bytecode::Bytecode,
    error::{CompileError, Result},
    func_compiler::FuncCompiler,
    obj::CompiledFunction,
    op_code::{make, Instructions, Opcode},
    symbol_table::{Symbol, SymbolScope, SymbolTable},
    value::Value,
};

/// Operand written into a forward jump until its target is known.
pub const JUMP_PLACEHOLDER: usize = 9999;

const MAX_CONSTANTS: usize = u16::MAX as usize + 1;
const MAX_GLOBALS: usize = u16::MAX as usize + 1;
const MAX_LOCALS: usize = u8::MAX as usize + 1;
const MAX_ARGUMENTS: usize = u8::MAX as usize;
/// Largest value a two-byte operand holds: item counts and jump targets
const MAX_U16_OPERAND: usize = u16::MAX as usize;

/// Lowers a [`Program`] into [`Bytecode`].
///
/// One instance compiles one program. Use [`Compiler::into_state`] and
/// [`Compiler::new_with_state`] to carry globals and constants over to the
/// next compilation, as a REPL does.
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    /// Scope currently being emitted into
    scope: FuncCompiler,
    /// Scopes of the functions surrounding `scope`, outermost first
    enclosing_scopes: Vec<FuncCompiler>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::new_with_state(SymbolTable::new(), Vec::new())
    }

    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scope: FuncCompiler::new(),
            enclosing_scopes: vec![],
        }
    }

    /// Compile every statement of `program` into the top-level scope.
    ///
    /// # Errors
    ///
    /// Fails on the first construct that can't be compiled. The compiler is
    /// left in an unspecified state and its bytecode should be discarded.
    pub fn compile(&mut self, program: &Program) -> Result<()> {
        for statement in &program.statements {
            self.statement(statement)?;
        }

        #[cfg(feature = "debug_print_code")]
        debug!("{}", crate::disassembler::disassemble(&self.bytecode()));

        Ok(())
    }

    /// The top-level instructions and the constant pool compiled so far.
    pub fn bytecode(&self) -> Bytecode {
        let global = self.enclosing_scopes.first().unwrap_or(&self.scope);
        Bytecode {
            instructions: global.instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    /// Give up this compiler, keeping the global symbol table and the
    /// constant pool.
    pub fn into_state(mut self) -> (SymbolTable, Vec<Value>) {
        while self.scope_index() > 0 {
            self.leave_scope();
        }
        (self.symbol_table, self.constants)
    }

    /// Depth of the current scope, 0 being the top level.
    pub fn scope_index(&self) -> usize {
        self.enclosing_scopes.len()
    }

    fn statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Expression { expression } => {
                self.expression(expression)?;
                self.emit(Opcode::Pop, &[]);
            }
            Statement::Let { name, value } => {
                self.expression(value)?;
                let symbol = self.define(name)?;
                let opcode = match symbol.scope {
                    SymbolScope::Global => Opcode::SetGlobal,
                    SymbolScope::Local => Opcode::SetLocal,
                };
                self.emit(opcode, &[symbol.index]);
            }
            Statement::Return { value: Some(value) } => {
                self.expression(value)?;
                self.emit(Opcode::ReturnValue, &[]);
            }
            Statement::Return { value: None } => {
                self.emit(Opcode::Return, &[]);
            }
        }
        Ok(())
    }

    fn block(&mut self, block: &BlockStatement) -> Result<()> {
        for statement in &block.statements {
            self.statement(statement)?;
        }
        Ok(())
    }

    fn expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Integer { value } => {
                let constant = self.add_constant(Value::Integer(*value))?;
                self.emit(Opcode::Constant, &[constant]);
            }
            Expression::String { value } => {
                let constant = self.add_constant(Value::String(value.clone()))?;
                self.emit(Opcode::Constant, &[constant]);
            }
            Expression::Boolean { value } => {
                self.emit(if *value { Opcode::True } else { Opcode::False }, &[]);
            }
            Expression::Identifier { name } => {
                let (opcode, index) = match self.symbol_table.resolve(name) {
                    Some(Symbol {
                        scope: SymbolScope::Global,
                        index,
                        ..
                    }) => (Opcode::GetGlobal, *index),
                    Some(Symbol {
                        scope: SymbolScope::Local,
                        index,
                        ..
                    }) => (Opcode::GetLocal, *index),
                    None => {
                        return Err(CompileError::UndefinedIdentifier { name: name.clone() });
                    }
                };
                self.emit(opcode, &[index]);
            }
            Expression::Prefix { operator, right } => {
                self.expression(right)?;
                let opcode = match operator.as_str() {
                    "-" => Opcode::Minus,
                    "!" => Opcode::Bang,
                    _ => return Err(CompileError::unknown_operator(operator, expression)),
                };
                self.emit(opcode, &[]);
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                // There is no less-than instruction: `a < b` is `b > a`
                if operator == "<" {
                    self.expression(right)?;
                    self.expression(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }

                self.expression(left)?;
                self.expression(right)?;
                let opcode = match operator.as_str() {
                    "+" => Opcode::Add,
                    "-" => Opcode::Sub,
                    "*" => Opcode::Mul,
                    "/" => Opcode::Div,
                    ">" => Opcode::GreaterThan,
                    "==" => Opcode::Equal,
                    "!=" => Opcode::NotEqual,
                    _ => return Err(CompileError::unknown_operator(operator, expression)),
                };
                self.emit(opcode, &[]);
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => self.if_expression(condition, consequence, alternative.as_ref())?,
            Expression::Array { elements } => {
                if elements.len() > MAX_U16_OPERAND {
                    return Err(CompileError::TooManyElements {
                        literal: "array",
                        limit: MAX_U16_OPERAND,
                    });
                }
                for element in elements {
                    self.expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            Expression::Hash { pairs } => self.hash_literal(pairs)?,
            Expression::Index { left, index } => {
                self.expression(left)?;
                self.expression(index)?;
                self.emit(Opcode::Index, &[]);
            }
            Expression::Function { parameters, body } => self.function(parameters, body)?,
            Expression::Call {
                function,
                arguments,
            } => {
                if arguments.len() > MAX_ARGUMENTS {
                    return Err(CompileError::TooManyArguments {
                        callee: function.to_string(),
                        limit: MAX_ARGUMENTS,
                    });
                }
                self.expression(function)?;
                for argument in arguments {
                    self.expression(argument)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }
        }
        Ok(())
    }

    fn if_expression(
        &mut self,
        condition: &Expression,
        consequence: &BlockStatement,
        alternative: Option<&BlockStatement>,
    ) -> Result<()> {
        self.expression(condition)?;
        let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[JUMP_PLACEHOLDER]);

        // The conditional is an expression, so each branch leaves its value
        // on the stack
        self.block(consequence)?;
        self.scope.remove_last_pop();

        let jump = self.emit(Opcode::Jump, &[JUMP_PLACEHOLDER]);
        self.patch_jump(jump_not_truthy)?;

        match alternative {
            Some(alternative) => {
                self.block(alternative)?;
                self.scope.remove_last_pop();
            }
            None => {
                self.emit(Opcode::Null, &[]);
            }
        }
        self.patch_jump(jump)
    }

    fn hash_literal(&mut self, pairs: &[(Expression, Expression)]) -> Result<()> {
        let item_count = pairs.len() * 2;
        if item_count > MAX_U16_OPERAND {
            return Err(CompileError::TooManyElements {
                literal: "hash",
                limit: MAX_U16_OPERAND,
            });
        }

        let mut sorted: Vec<&(Expression, Expression)> = pairs.iter().collect();
        sorted.sort_by_cached_key(|(key, _)| key.to_string());

        for (key, value) in sorted {
            if matches!(
                key,
                Expression::Array { .. } | Expression::Hash { .. } | Expression::Function { .. }
            ) {
                return Err(CompileError::invalid_literal(
                    Expression::Hash {
                        pairs: pairs.to_vec(),
                    },
                    format!("{key} is unusable as a hash key"),
                ));
            }
            self.expression(key)?;
            self.expression(value)?;
        }
        self.emit(Opcode::Hash, &[item_count]);
        Ok(())
    }

    fn function(&mut self, parameters: &[String], body: &BlockStatement) -> Result<()> {
        self.enter_scope();

        for parameter in parameters {
            self.define(parameter)?;
        }
        self.block(body)?;

        self.scope.replace_last_pop_with_return();
        if !self.scope.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[]);
        }

        let num_locals = self.symbol_table.num_definitions();
        let instructions = self.leave_scope();
        let function = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: parameters.len(),
        };
        debug!(
            "compiled function with {} parameters and {} locals",
            function.num_parameters, function.num_locals
        );
        #[cfg(feature = "debug_print_code")]
        debug!("{}", function.instructions);

        let constant = self.add_constant(Value::from(function))?;
        self.emit(Opcode::Constant, &[constant]);
        Ok(())
    }

    fn define(&mut self, name: &str) -> Result<Symbol> {
        let symbol = self.symbol_table.define(name);
        match symbol.scope {
            SymbolScope::Global if symbol.index >= MAX_GLOBALS => {
                Err(CompileError::TooManyGlobals { limit: MAX_GLOBALS })
            }
            SymbolScope::Local if symbol.index >= MAX_LOCALS => {
                Err(CompileError::TooManyLocals { limit: MAX_LOCALS })
            }
            _ => Ok(symbol),
        }
    }

    fn add_constant(&mut self, value: Value) -> Result<usize> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants {
                limit: MAX_CONSTANTS,
            });
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    /// Encode and append an instruction to the current scope, returning its
    /// address.
    fn emit(&mut self, opcode: Opcode, operands: &[usize]) -> usize {
        let instruction = make(opcode, operands);
        let position = self.scope.add_instruction(opcode, &instruction);
        trace!("emit {position:04} {opcode} {operands:?}");
        position
    }

    /// Point the jump at `position` to the next instruction to be emitted.
    fn patch_jump(&mut self, position: usize) -> Result<()> {
        let target = self.scope.instructions.len();
        if target > MAX_U16_OPERAND {
            return Err(CompileError::JumpTooFar {
                target,
                limit: MAX_U16_OPERAND,
            });
        }
        trace!("patch jump at {position:04} -> {target:04}");
        self.scope.instructions.change_operand(position, target)?;
        Ok(())
    }

    fn enter_scope(&mut self) {
        let outer = mem::take(&mut self.scope);
        self.enclosing_scopes.push(outer);
        self.symbol_table.enclose();
        debug!("enter scope {}", self.scope_index());
    }

    fn leave_scope(&mut self) -> Instructions {
        debug!("leave scope {}", self.scope_index());
        let outer = self.enclosing_scopes.pop().unwrap_or_default();
        let inner = mem::replace(&mut self.scope, outer);
        self.symbol_table.unenclose();
        inner.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
