//! IR values
//!
//! Values are compared structurally: two occurrences of `p.x` in the same
//! method denote the same value, and parameters / `this` carry their method.

use super::types::{FieldSignature, Type};
use super::{AllocId, LocalId, MethodId};
use std::fmt;

/// Index of an array access
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayIndex {
    Const(usize),
    Local(LocalId),
}

/// Literal constant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    pub value: String,
    pub ty: Type,
}

impl Constant {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ty: Type::String(None),
        }
    }

    pub fn number(value: i64) -> Self {
        Self {
            value: value.to_string(),
            ty: Type::Number,
        }
    }

    pub fn null() -> Self {
        Self {
            value: "null".to_string(),
            ty: Type::Unknown,
        }
    }

    pub fn is_null(&self) -> bool {
        self.value == "null" && self.ty == Type::Unknown
    }
}

/// Operand of a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Local(LocalId),
    /// `parameter<index>` reference inside `method`
    Parameter { method: MethodId, index: usize },
    /// `this` reference inside `method`
    This { method: MethodId },
    InstanceField { base: LocalId, field: FieldSignature },
    StaticField(FieldSignature),
    ArrayElement { base: LocalId, index: ArrayIndex },
    /// Object allocation `new C()`
    New(AllocId),
    /// Array allocation `new T[n]` / array literal
    NewArray(AllocId),
    Constant(Constant),
}

impl Value {
    pub fn as_local(&self) -> Option<LocalId> {
        match self {
            Value::Local(l) => Some(*l),
            _ => None,
        }
    }

    /// Base local of a field or element reference
    pub fn ref_base(&self) -> Option<LocalId> {
        match self {
            Value::InstanceField { base, .. } | Value::ArrayElement { base, .. } => Some(*base),
            _ => None,
        }
    }

    #[inline]
    pub fn is_allocation(&self) -> bool {
        matches!(self, Value::New(_) | Value::NewArray(_))
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(l) => write!(f, "local#{}", l.0),
            Value::Parameter { method, index } => write!(f, "parameter{}@m{}", index, method.0),
            Value::This { method } => write!(f, "this@m{}", method.0),
            Value::InstanceField { base, field } => write!(f, "local#{}.{}", base.0, field.name),
            Value::StaticField(field) => write!(f, "{}", field),
            Value::ArrayElement { base, index } => match index {
                ArrayIndex::Const(i) => write!(f, "local#{}[{}]", base.0, i),
                ArrayIndex::Local(l) => write!(f, "local#{}[local#{}]", base.0, l.0),
            },
            Value::New(a) => write!(f, "new#{}", a.0),
            Value::NewArray(a) => write!(f, "newarray#{}", a.0),
            Value::Constant(c) => write!(f, "{}", c.value),
        }
    }
}
