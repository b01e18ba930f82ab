//! IR domain model
//!
//! The analysis reads this model and never mutates it.

pub mod program;
pub mod stmt;
pub mod types;
pub mod value;

use crate::define_id;

define_id!(
    /// Source file
    FileId
);
define_id!(
    /// Namespace declaration
    NamespaceId
);
define_id!(
    /// Class declaration
    ClassId
);
define_id!(
    /// Method declaration
    MethodId
);
define_id!(
    /// Method-local variable
    LocalId
);
define_id!(
    /// Statement
    StmtId
);
define_id!(
    /// Allocation site
    AllocId
);

pub use program::{
    Allocation, Class, File, ImportInfo, Local, Method, MethodKind, Namespace, Param, Program,
};
pub use stmt::{InvokeExpr, InvokeKind, Rhs, Stmt, StmtKind};
pub use types::{FieldSignature, MethodSignature, Type};
pub use value::{ArrayIndex, Constant, Value};
