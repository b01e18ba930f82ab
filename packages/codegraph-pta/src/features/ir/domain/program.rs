//! Program model: files, namespaces, classes, methods, locals, statements
//!
//! Read-only once built. Every entity lives in an arena on [`Program`] and
//! is addressed by a dense id.

use super::stmt::{Rhs, Stmt, StmtKind};
use super::types::{MethodSignature, Type};
use super::value::Value;
use super::{AllocId, ClassId, FileId, LocalId, MethodId, NamespaceId, StmtId};
use rustc_hash::FxHashMap;

/// `import { export_name as name } from 'from_file'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    pub name: String,
    pub from_file: String,
    pub export_name: String,
}

#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    /// Top-level code of the file
    pub default_method: Option<MethodId>,
    pub imports: Vec<ImportInfo>,
    /// Exported name -> exported local
    pub exports: FxHashMap<String, LocalId>,
}

#[derive(Debug, Clone)]
pub struct Namespace {
    pub name: String,
    pub file: FileId,
    pub parent: Option<NamespaceId>,
    /// Top-level code of the namespace body
    pub default_method: Option<MethodId>,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub file: FileId,
    pub namespace: Option<NamespaceId>,
    pub super_class: Option<ClassId>,
    pub methods: FxHashMap<String, MethodId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Normal,
    Constructor,
    /// Front-end generated initializer invoked on a receiver
    Intrinsic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub signature: MethodSignature,
    pub class: ClassId,
    pub kind: MethodKind,
    pub is_static: bool,
    /// Declared by the platform SDK (no body available)
    pub is_sdk: bool,
    pub params: Vec<Param>,
    pub return_type: Type,
    /// Local name -> local
    pub locals: FxHashMap<String, LocalId>,
    pub body: Option<Vec<StmtId>>,
}

impl Method {
    #[inline]
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    #[inline]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    pub ty: Type,
    pub method: MethodId,
    /// First assignment to the local; `None` for captured or imported names
    pub declaring_stmt: Option<StmtId>,
}

/// Allocation site
#[derive(Debug, Clone)]
pub struct Allocation {
    pub ty: Type,
    pub method: MethodId,
}

/// Whole program
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub(crate) files: Vec<File>,
    pub(crate) namespaces: Vec<Namespace>,
    pub(crate) classes: Vec<Class>,
    pub(crate) methods: Vec<Method>,
    pub(crate) locals: Vec<Local>,
    pub(crate) stmts: Vec<Stmt>,
    pub(crate) allocs: Vec<Allocation>,
    pub(crate) method_index: FxHashMap<MethodSignature, MethodId>,
    pub(crate) class_index: FxHashMap<String, ClassId>,
    pub(crate) file_index: FxHashMap<String, FileId>,
}

impl Program {
    // ═══════════════════════════════════════════════════════════════════════
    // Arena access
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.index()]
    }

    #[inline]
    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.index()]
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    #[inline]
    pub fn local(&self, id: LocalId) -> &Local {
        &self.locals[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn alloc(&self, id: AllocId) -> &Allocation {
        &self.allocs[id.index()]
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> + '_ {
        (0..self.methods.len()).map(MethodId::new)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lookups
    // ═══════════════════════════════════════════════════════════════════════

    pub fn method_by_signature(&self, sig: &MethodSignature) -> Option<MethodId> {
        self.method_index.get(sig).copied()
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_index.get(name).copied()
    }

    pub fn file_by_name(&self, name: &str) -> Option<FileId> {
        self.file_index.get(name).copied()
    }

    pub fn local_by_name(&self, method: MethodId, name: &str) -> Option<LocalId> {
        self.method(method).locals.get(name).copied()
    }

    pub fn method_file(&self, method: MethodId) -> FileId {
        self.class(self.method(method).class).file
    }

    pub fn method_namespace(&self, method: MethodId) -> Option<NamespaceId> {
        self.class(self.method(method).class).namespace
    }

    /// Walk `class` and its superclasses for a method named `name`
    pub fn find_method_in_hierarchy(&self, class: ClassId, name: &str) -> Option<MethodId> {
        let mut cur = Some(class);
        while let Some(c) = cur {
            let cls = self.class(c);
            if let Some(m) = cls.methods.get(name) {
                return Some(*m);
            }
            cur = cls.super_class;
        }
        None
    }

    /// Statements of a method body (empty for bodiless methods)
    pub fn body(&self, method: MethodId) -> &[StmtId] {
        self.method(method).body.as_deref().unwrap_or(&[])
    }

    pub fn return_stmts(&self, method: MethodId) -> Vec<StmtId> {
        self.body(method)
            .iter()
            .copied()
            .filter(|s| matches!(self.stmt(*s).kind, StmtKind::Return(_)))
            .collect()
    }

    /// Operands of the method's return statements
    pub fn return_values(&self, method: MethodId) -> Vec<Value> {
        self.return_stmts(method)
            .into_iter()
            .filter_map(|s| match &self.stmt(s).kind {
                StmtKind::Return(Some(v)) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    /// `x := parameter<i>` right operands in body order
    pub fn parameter_refs(&self, method: MethodId) -> Vec<Value> {
        self.body(method)
            .iter()
            .filter_map(|s| match &self.stmt(*s).kind {
                StmtKind::Assign {
                    rhs: Rhs::Value(v @ Value::Parameter { .. }),
                    ..
                } => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    /// The `this := this-ref` statement of an instance method
    pub fn this_assign_stmt(&self, method: MethodId) -> Option<StmtId> {
        self.body(method).iter().copied().find(|s| {
            matches!(
                &self.stmt(*s).kind,
                StmtKind::Assign {
                    rhs: Rhs::Value(Value::This { .. }),
                    ..
                }
            )
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Types
    // ═══════════════════════════════════════════════════════════════════════

    pub fn value_type(&self, value: &Value) -> Type {
        match value {
            Value::Local(l) => self.local(*l).ty.clone(),
            Value::Parameter { method, index } => self
                .method(*method)
                .params
                .get(*index)
                .map(|p| p.ty.clone())
                .unwrap_or(Type::Unknown),
            Value::This { method } => {
                Type::Class(self.class(self.method(*method).class).name.clone())
            }
            Value::InstanceField { field, .. } | Value::StaticField(field) => field.ty.clone(),
            Value::ArrayElement { base, .. } => match &self.local(*base).ty {
                Type::Array(elem) => (**elem).clone(),
                _ => Type::Unknown,
            },
            Value::New(a) => self.alloc(*a).ty.clone(),
            Value::NewArray(a) => self.alloc(*a).ty.clone(),
            Value::Constant(c) => c.ty.clone(),
        }
    }

    /// Class name of an object allocation
    pub fn alloc_class_name(&self, alloc: AllocId) -> Option<&str> {
        self.alloc(alloc).ty.class_name()
    }
}
