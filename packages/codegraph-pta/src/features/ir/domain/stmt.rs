//! IR statements and invoke expressions

use super::types::MethodSignature;
use super::value::Value;
use super::{LocalId, MethodId};

/// How the callee of an invoke is selected
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    /// Callee fixed by the signature
    Static,
    /// Virtual call on a receiver local
    Instance { base: LocalId },
    /// Call through a function-valued local
    Ptr { fn_ptr: LocalId },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvokeExpr {
    pub kind: InvokeKind,
    pub signature: MethodSignature,
    pub args: Vec<Value>,
}

impl InvokeExpr {
    pub fn new_static(signature: MethodSignature, args: Vec<Value>) -> Self {
        Self {
            kind: InvokeKind::Static,
            signature,
            args,
        }
    }

    pub fn new_instance(base: LocalId, signature: MethodSignature, args: Vec<Value>) -> Self {
        Self {
            kind: InvokeKind::Instance { base },
            signature,
            args,
        }
    }

    pub fn new_ptr(fn_ptr: LocalId, signature: MethodSignature, args: Vec<Value>) -> Self {
        Self {
            kind: InvokeKind::Ptr { fn_ptr },
            signature,
            args,
        }
    }

    /// Receiver of an instance invoke
    pub fn base(&self) -> Option<LocalId> {
        match self.kind {
            InvokeKind::Instance { base } => Some(base),
            _ => None,
        }
    }

    /// Local through which a dynamic call is dispatched
    pub fn dispatch_local(&self) -> Option<LocalId> {
        match self.kind {
            InvokeKind::Instance { base } => Some(base),
            InvokeKind::Ptr { fn_ptr } => Some(fn_ptr),
            InvokeKind::Static => None,
        }
    }

    /// Values read by the invoke (receiver / function pointer, then arguments)
    pub fn uses(&self) -> Vec<Value> {
        let mut uses = Vec::with_capacity(self.args.len() + 1);
        if let Some(l) = self.dispatch_local() {
            uses.push(Value::Local(l));
        }
        uses.extend(self.args.iter().cloned());
        uses
    }

    #[inline]
    pub fn method_name(&self) -> &str {
        &self.signature.name
    }
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rhs {
    Value(Value),
    Invoke(InvokeExpr),
    /// Arithmetic, casts, comparisons: no pointer flow
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Assign { lhs: Value, rhs: Rhs },
    Invoke(InvokeExpr),
    Return(Option<Value>),
    Nop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub method: MethodId,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn invoke_expr(&self) -> Option<&InvokeExpr> {
        match &self.kind {
            StmtKind::Assign {
                rhs: Rhs::Invoke(invoke),
                ..
            } => Some(invoke),
            StmtKind::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }

    /// Left operand of an assignment
    pub fn lhs(&self) -> Option<&Value> {
        match &self.kind {
            StmtKind::Assign { lhs, .. } => Some(lhs),
            _ => None,
        }
    }

    #[inline]
    pub fn is_assign(&self) -> bool {
        matches!(self.kind, StmtKind::Assign { .. })
    }
}
