//! Programmatic IR construction
//!
//! Stands in for a language front-end in tests and benchmarks. Mirrors the
//! shapes a front-end emits: every file and namespace has a default method
//! for its top-level code, instance methods start with `this := this-ref`,
//! and every parameter is read once through `p := parameter<i>`.

use crate::features::ir::domain::{
    AllocId, Allocation, Class, ClassId, FieldSignature, File, FileId, ImportInfo, InvokeExpr,
    Local, LocalId, Method, MethodId, MethodKind, MethodSignature, Namespace, NamespaceId, Param,
    Program, Rhs, Stmt, StmtId, StmtKind, Type, Value,
};
use crate::shared::constants::names::{DEFAULT_METHOD_NAME, THIS_NAME};
use rustc_hash::FxHashMap;

/// Shape of a method to add
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub is_static: bool,
    pub kind: MethodKind,
    pub is_sdk: bool,
    pub params: Vec<Param>,
    pub return_type: Type,
}

impl MethodSpec {
    pub fn instance() -> Self {
        Self {
            is_static: false,
            kind: MethodKind::Normal,
            is_sdk: false,
            params: Vec::new(),
            return_type: Type::Void,
        }
    }

    pub fn static_method() -> Self {
        Self {
            is_static: true,
            ..Self::instance()
        }
    }

    pub fn constructor() -> Self {
        Self {
            kind: MethodKind::Constructor,
            ..Self::instance()
        }
    }

    /// Bodiless platform method
    pub fn sdk() -> Self {
        Self {
            is_sdk: true,
            ..Self::instance()
        }
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.return_type = ty;
        self
    }
}

/// Builder for [`Program`]
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Declarations
    // ═══════════════════════════════════════════════════════════════════════

    /// Add a file with its default class and default method
    pub fn add_file(&mut self, name: impl Into<String>) -> FileId {
        let name = name.into();
        let file = FileId::new(self.program.files.len());
        self.program.files.push(File {
            name: name.clone(),
            default_method: None,
            imports: Vec::new(),
            exports: FxHashMap::default(),
        });
        self.program.file_index.insert(name, file);

        let class = self.push_class(file, None, DEFAULT_METHOD_NAME.to_string(), None, false);
        let method = self.add_method(class, DEFAULT_METHOD_NAME, MethodSpec::static_method());
        self.program.files[file.index()].default_method = Some(method);
        file
    }

    /// Add a namespace (nested when `parent` is set) with its default method
    pub fn add_namespace(
        &mut self,
        file: FileId,
        name: impl Into<String>,
        parent: Option<NamespaceId>,
    ) -> NamespaceId {
        let name = name.into();
        let ns = NamespaceId::new(self.program.namespaces.len());
        self.program.namespaces.push(Namespace {
            name: name.clone(),
            file,
            parent,
            default_method: None,
        });

        let class_name = format!("{}.{}", name, DEFAULT_METHOD_NAME);
        let class = self.push_class(file, Some(ns), class_name, None, false);
        let method = self.add_method(class, DEFAULT_METHOD_NAME, MethodSpec::static_method());
        self.program.namespaces[ns.index()].default_method = Some(method);
        ns
    }

    pub fn add_class(
        &mut self,
        file: FileId,
        name: impl Into<String>,
        super_class: Option<ClassId>,
    ) -> ClassId {
        self.push_class(file, None, name.into(), super_class, true)
    }

    pub fn add_class_in_namespace(
        &mut self,
        ns: NamespaceId,
        name: impl Into<String>,
        super_class: Option<ClassId>,
    ) -> ClassId {
        let file = self.program.namespaces[ns.index()].file;
        self.push_class(file, Some(ns), name.into(), super_class, true)
    }

    fn push_class(
        &mut self,
        file: FileId,
        namespace: Option<NamespaceId>,
        name: String,
        super_class: Option<ClassId>,
        indexed: bool,
    ) -> ClassId {
        let class = ClassId::new(self.program.classes.len());
        if indexed {
            self.program.class_index.insert(name.clone(), class);
        }
        self.program.classes.push(Class {
            name,
            file,
            namespace,
            super_class,
            methods: FxHashMap::default(),
        });
        class
    }

    /// Add a method; non-SDK methods get a body with `this` and parameter reads
    pub fn add_method(&mut self, class: ClassId, name: impl Into<String>, spec: MethodSpec) -> MethodId {
        let name = name.into();
        let cls = &self.program.classes[class.index()];
        let file_name = self.program.files[cls.file.index()].name.clone();
        let signature = MethodSignature::new(file_name, cls.name.clone(), name.clone());
        let class_name = cls.name.clone();

        let method = MethodId::new(self.program.methods.len());
        self.program.methods.push(Method {
            signature: signature.clone(),
            class,
            kind: spec.kind,
            is_static: spec.is_static,
            is_sdk: spec.is_sdk,
            params: spec.params.clone(),
            return_type: spec.return_type,
            locals: FxHashMap::default(),
            body: if spec.is_sdk { None } else { Some(Vec::new()) },
        });
        self.program.method_index.insert(signature, method);
        self.program.classes[class.index()]
            .methods
            .insert(name, method);

        if spec.is_sdk {
            return method;
        }

        if !spec.is_static {
            let this = self.local(method, THIS_NAME, Type::Class(class_name));
            self.assign(method, Value::Local(this), Rhs::Value(Value::This { method }));
        }
        for (index, param) in spec.params.iter().enumerate() {
            let local = self.local(method, param.name.clone(), param.ty.clone());
            self.assign(
                method,
                Value::Local(local),
                Rhs::Value(Value::Parameter { method, index }),
            );
        }
        method
    }

    pub fn add_import(
        &mut self,
        file: FileId,
        name: impl Into<String>,
        from_file: impl Into<String>,
        export_name: impl Into<String>,
    ) {
        self.program.files[file.index()].imports.push(ImportInfo {
            name: name.into(),
            from_file: from_file.into(),
            export_name: export_name.into(),
        });
    }

    pub fn add_export(&mut self, file: FileId, name: impl Into<String>, local: LocalId) {
        self.program.files[file.index()]
            .exports
            .insert(name.into(), local);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Locals
    // ═══════════════════════════════════════════════════════════════════════

    /// Get or create the local `name` of `method`
    pub fn local(&mut self, method: MethodId, name: impl Into<String>, ty: Type) -> LocalId {
        let name = name.into();
        if let Some(l) = self.program.methods[method.index()].locals.get(&name) {
            return *l;
        }
        let id = LocalId::new(self.program.locals.len());
        self.program.locals.push(Local {
            name: name.clone(),
            ty,
            method,
            declaring_stmt: None,
        });
        self.program.methods[method.index()].locals.insert(name, id);
        id
    }

    /// Local bound to parameter `index`
    pub fn param(&self, method: MethodId, index: usize) -> Option<LocalId> {
        let m = &self.program.methods[method.index()];
        m.params.get(index).and_then(|p| m.locals.get(&p.name).copied())
    }

    pub fn this_local(&self, method: MethodId) -> Option<LocalId> {
        self.program.methods[method.index()]
            .locals
            .get(THIS_NAME)
            .copied()
    }

    pub fn default_method(&self, file: FileId) -> Option<MethodId> {
        self.program.files[file.index()].default_method
    }

    pub fn namespace_default_method(&self, ns: NamespaceId) -> Option<MethodId> {
        self.program.namespaces[ns.index()].default_method
    }

    pub fn signature(&self, method: MethodId) -> MethodSignature {
        self.program.methods[method.index()].signature.clone()
    }

    /// Function value naming `target`: a local without declaring statement
    pub fn function_ref(&mut self, method: MethodId, target: MethodId) -> LocalId {
        let sig = self.signature(target);
        self.local(method, sig.name.clone(), Type::Function(sig))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════

    fn push_stmt(&mut self, method: MethodId, kind: StmtKind) -> StmtId {
        let id = StmtId::new(self.program.stmts.len());
        self.program.stmts.push(Stmt { method, kind });
        if let Some(body) = self.program.methods[method.index()].body.as_mut() {
            body.push(id);
        }
        id
    }

    pub fn assign(&mut self, method: MethodId, lhs: Value, rhs: Rhs) -> StmtId {
        let declared = lhs.as_local();
        let id = self.push_stmt(method, StmtKind::Assign { lhs, rhs });
        if let Some(l) = declared {
            let local = &mut self.program.locals[l.index()];
            if local.declaring_stmt.is_none() {
                local.declaring_stmt = Some(id);
            }
        }
        id
    }

    /// `dst := src`
    pub fn copy(&mut self, method: MethodId, dst: LocalId, src: Value) -> StmtId {
        self.assign(method, Value::Local(dst), Rhs::Value(src))
    }

    /// `dst := new class()`
    pub fn new_object(&mut self, method: MethodId, dst: LocalId, class: &str) -> AllocId {
        let alloc = AllocId::new(self.program.allocs.len());
        self.program.allocs.push(Allocation {
            ty: Type::class(class),
            method,
        });
        self.copy(method, dst, Value::New(alloc));
        alloc
    }

    /// `dst := new elem[]`
    pub fn new_array(&mut self, method: MethodId, dst: LocalId, elem: Type) -> AllocId {
        let alloc = AllocId::new(self.program.allocs.len());
        self.program.allocs.push(Allocation {
            ty: Type::array_of(elem),
            method,
        });
        self.copy(method, dst, Value::NewArray(alloc));
        alloc
    }

    /// `dst := base.field`
    pub fn load(&mut self, method: MethodId, dst: LocalId, base: LocalId, field: FieldSignature) -> StmtId {
        self.copy(method, dst, Value::InstanceField { base, field })
    }

    /// `base.field := src`
    pub fn store(&mut self, method: MethodId, base: LocalId, field: FieldSignature, src: LocalId) -> StmtId {
        self.assign(
            method,
            Value::InstanceField { base, field },
            Rhs::Value(Value::Local(src)),
        )
    }

    /// `[dst :=] invoke`
    pub fn call(&mut self, method: MethodId, dst: Option<LocalId>, invoke: InvokeExpr) -> StmtId {
        match dst {
            Some(l) => self.assign(method, Value::Local(l), Rhs::Invoke(invoke)),
            None => self.push_stmt(method, StmtKind::Invoke(invoke)),
        }
    }

    pub fn ret(&mut self, method: MethodId, value: Option<Value>) -> StmtId {
        self.push_stmt(method, StmtKind::Return(value))
    }

    pub fn build(self) -> Program {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_gets_default_method() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("main.ts");
        let dflt = pb.default_method(file).unwrap();
        let program = pb.build();

        assert_eq!(program.method(dflt).name(), DEFAULT_METHOD_NAME);
        assert!(program.method(dflt).is_static);
        assert_eq!(program.file_by_name("main.ts"), Some(file));
    }

    #[test]
    fn test_instance_method_prologue() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let class = pb.add_class(file, "A", None);
        let m = pb.add_method(class, "f", MethodSpec::instance().param("x", Type::class("A")));
        let this = pb.this_local(m).unwrap();
        let x = pb.param(m, 0).unwrap();
        let program = pb.build();

        assert!(program.this_assign_stmt(m).is_some());
        assert_eq!(program.parameter_refs(m), vec![Value::Parameter { method: m, index: 0 }]);
        assert!(program.local(this).declaring_stmt.is_some());
        assert!(program.local(x).declaring_stmt.is_some());
    }

    #[test]
    fn test_sdk_method_has_no_body() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("lib.d.ts");
        let class = pb.add_class(file, "Set", None);
        let add = pb.add_method(class, "add", MethodSpec::sdk().param("v", Type::Unknown));
        let program = pb.build();

        assert!(!program.method(add).has_body());
        assert!(program.body(add).is_empty());
    }

    #[test]
    fn test_function_ref_is_undeclared() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let dflt = pb.default_method(file).unwrap();
        let class = pb.add_class(file, "A", None);
        let cb = pb.add_method(class, "cb", MethodSpec::instance());
        let f = pb.function_ref(dflt, cb);
        let program = pb.build();

        assert!(program.local(f).declaring_stmt.is_none());
        assert!(program.local(f).ty.is_function());
    }

    #[test]
    fn test_hierarchy_lookup() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let a = pb.add_class(file, "A", None);
        let b = pb.add_class(file, "B", Some(a));
        let af = pb.add_method(a, "f", MethodSpec::instance());
        let program = pb.build();

        assert_eq!(program.find_method_in_hierarchy(b, "f"), Some(af));
        assert_eq!(program.find_method_in_hierarchy(b, "g"), None);
    }
}
