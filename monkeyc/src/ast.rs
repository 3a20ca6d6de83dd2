use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Root of a parsed program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    Let {
        name: String,
        value: Expression,
    },
    Return {
        #[serde(default)]
        value: Option<Expression>,
    },
    Expression {
        expression: Expression,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    Identifier {
        name: String,
    },
    Integer {
        value: i64,
    },
    String {
        value: String,
    },
    Boolean {
        value: bool,
    },
    Prefix {
        operator: String,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: String,
        right: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        #[serde(default)]
        alternative: Option<BlockStatement>,
    },
    #[serde(alias = "fn")]
    Function {
        parameters: Vec<String>,
        body: BlockStatement,
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Array {
        elements: Vec<Expression>,
    },
    /// Pairs in source order. Their order carries no meaning.
    Hash {
        pairs: Vec<(Expression, Expression)>,
    },
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

impl BlockStatement {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

impl Statement {
    pub fn expression(expression: Expression) -> Self {
        Statement::Expression { expression }
    }

    pub fn let_(name: &str, value: Expression) -> Self {
        Statement::Let {
            name: name.to_string(),
            value,
        }
    }

    pub fn return_(value: Option<Expression>) -> Self {
        Statement::Return { value }
    }
}

impl Expression {
    pub fn identifier(name: &str) -> Self {
        Expression::Identifier {
            name: name.to_string(),
        }
    }

    pub fn integer(value: i64) -> Self {
        Expression::Integer { value }
    }

    pub fn string(value: &str) -> Self {
        Expression::String {
            value: value.to_string(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Boolean { value }
    }

    pub fn prefix(operator: &str, right: Expression) -> Self {
        Expression::Prefix {
            operator: operator.to_string(),
            right: Box::new(right),
        }
    }

    pub fn infix(left: Expression, operator: &str, right: Expression) -> Self {
        Expression::Infix {
            left: Box::new(left),
            operator: operator.to_string(),
            right: Box::new(right),
        }
    }

    pub fn if_(
        condition: Expression,
        consequence: Vec<Statement>,
        alternative: Option<Vec<Statement>>,
    ) -> Self {
        Expression::If {
            condition: Box::new(condition),
            consequence: BlockStatement::new(consequence),
            alternative: alternative.map(BlockStatement::new),
        }
    }

    pub fn function(parameters: &[&str], body: Vec<Statement>) -> Self {
        Expression::Function {
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            body: BlockStatement::new(body),
        }
    }

    pub fn call(function: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            function: Box::new(function),
            arguments,
        }
    }

    pub fn array(elements: Vec<Expression>) -> Self {
        Expression::Array { elements }
    }

    pub fn hash(pairs: Vec<(Expression, Expression)>) -> Self {
        Expression::Hash { pairs }
    }

    pub fn index(left: Expression, index: Expression) -> Self {
        Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            Display::fmt(statement, f)?;
        }
        Ok(())
    }
}

impl Display for BlockStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            Display::fmt(statement, f)?;
        }
        Ok(())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "let {name} = {value};"),
            Statement::Return { value: Some(value) } => write!(f, "return {value};"),
            Statement::Return { value: None } => f.write_str("return;"),
            Statement::Expression { expression } => Display::fmt(expression, f),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier { name } => f.write_str(name),
            Expression::Integer { value } => Display::fmt(value, f),
            Expression::String { value } => f.write_str(value),
            Expression::Boolean { value } => Display::fmt(value, f),
            Expression::Prefix { operator, right } => write!(f, "({operator}{right})"),
            Expression::Infix {
                left,
                operator,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if{condition} {consequence}")?;
                if let Some(alternative) = alternative {
                    write!(f, "else {alternative}")?;
                }
                Ok(())
            }
            Expression::Function { parameters, body } => {
                write!(f, "fn({}) {body}", parameters.join(", "))
            }
            Expression::Call {
                function,
                arguments,
            } => write!(f, "{function}({})", join(arguments, ", ")),
            Expression::Array { elements } => write!(f, "[{}]", join(elements, ", ")),
            Expression::Hash { pairs } => {
                let pairs: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{key}:{value}"))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Expression::Index { left, index } => write!(f, "({left}[{index}])"),
        }
    }
}

fn join<T: Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}
