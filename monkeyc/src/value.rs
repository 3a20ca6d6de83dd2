use std::{
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

use serde::{Deserialize, Serialize};

use crate::obj::CompiledFunction;

/// Runtime values as they appear in the constant pool and on the VM stack.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    String(String),
    Null,
    Array(Vec<Value>),
    /// Key/value pairs in insertion order
    Hash(Vec<(Value, Value)>),
    // Shared so that copying a function value onto the stack doesn't copy its body
    Function(Rc<CompiledFunction>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::String(_) => "STRING",
            Value::Null => "NULL",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "COMPILED_FUNCTION",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(x) => Display::fmt(x, f),
            Value::Boolean(x) => Display::fmt(x, f),
            Value::String(x) => f.write_str(x),
            Value::Null => f.write_str("null"),
            Value::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(element, f)?;
                }
                f.write_str("]")
            }
            Value::Hash(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Function(x) => Display::fmt(x.as_ref(), f),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(x) => Debug::fmt(x, f),
            _ => Display::fmt(self, f),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<CompiledFunction> for Value {
    fn from(function: CompiledFunction) -> Self {
        Value::Function(Rc::new(function))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn inspect() {
        let value = Value::Array(vec![
            Value::from(1),
            Value::from("two"),
            Value::Hash(vec![(Value::Boolean(true), Value::Null)]),
        ]);
        assert_eq!(value.to_string(), "[1, two, {true: null}]");
        assert_eq!(format!("{:?}", Value::from("two")), "\"two\"");
        assert_eq!(value.type_name(), "ARRAY");
    }
}
