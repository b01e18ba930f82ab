//! Program fixtures
//!
//! Small programs in the shape a front-end emits, plus helpers to run the
//! analysis over them.

use codegraph_pta::features::call_graph::CallGraphBuilder;
use codegraph_pta::features::ir::{
    FieldSignature, InvokeExpr, LocalId, MethodId, MethodSpec, Program, ProgramBuilder, Rhs, Type,
    Value,
};
use codegraph_pta::{PointerAnalysis, PtaConfig};

/// Route `tracing` output through the test harness (`RUST_LOG=debug` to see it)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build the call graph from `entries` and solve
pub fn solved<'p>(program: &'p Program, entries: &[MethodId], config: PtaConfig) -> PointerAnalysis<'p> {
    init_tracing();
    let cg = CallGraphBuilder::new(program).build(entries);
    let mut pta = PointerAnalysis::new(program, cg, config).expect("valid config");
    pta.solve().expect("analysis succeeds");
    pta
}

pub fn local(l: LocalId) -> Value {
    Value::Local(l)
}

/// Factory called from two sites
///
/// ```text
/// class Factory { static make() { let t = new O(); let v = new V(); t.x = v; return t; } }
/// let p = Factory.make(); let q = Factory.make();
/// let px = p.x; let qx = q.x;
/// ```
pub struct FactoryFixture {
    pub program: Program,
    pub main: MethodId,
    pub p: LocalId,
    pub q: LocalId,
    pub px: LocalId,
    pub qx: LocalId,
}

pub fn fixture_factory() -> FactoryFixture {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("factory.ts");
    let main = pb.default_method(file).expect("default method");
    pb.add_class(file, "O", None);
    pb.add_class(file, "V", None);
    let factory = pb.add_class(file, "Factory", None);
    let make = pb.add_method(
        factory,
        "make",
        MethodSpec::static_method().returns(Type::class("O")),
    );
    let field = FieldSignature::new("O", "x", Type::class("V"));

    let t = pb.local(make, "t", Type::class("O"));
    let v = pb.local(make, "v", Type::class("V"));
    pb.new_object(make, t, "O");
    pb.new_object(make, v, "V");
    pb.store(make, t, field.clone(), v);
    pb.ret(make, Some(Value::Local(t)));

    let p = pb.local(main, "p", Type::class("O"));
    let q = pb.local(main, "q", Type::class("O"));
    let px = pb.local(main, "px", Type::class("V"));
    let qx = pb.local(main, "qx", Type::class("V"));
    let sig = pb.signature(make);
    pb.call(main, Some(p), InvokeExpr::new_static(sig.clone(), vec![]));
    pb.call(main, Some(q), InvokeExpr::new_static(sig, vec![]));
    pb.load(main, px, p, field.clone());
    pb.load(main, qx, q, field);

    FactoryFixture {
        program: pb.build(),
        main,
        p,
        q,
        px,
        qx,
    }
}

/// Overriding method reached through a base-class signature
///
/// ```text
/// class A { f() { return new XA(); } }
/// class B extends A { f() { return new XB(); } }
/// let o = new B(); let r = o.f();   // declared as A.f
/// ```
pub struct DispatchFixture {
    pub program: Program,
    pub main: MethodId,
    pub a_f: MethodId,
    pub b_f: MethodId,
    pub o: LocalId,
    pub r: LocalId,
}

pub fn fixture_dispatch() -> DispatchFixture {
    dispatch_program(&["B"])
}

/// Receiver allocated on two branches
///
/// ```text
/// let o; if (c) { o = new A(); } else { o = new B(); }
/// let r = o.f();
/// ```
pub fn fixture_dispatch_either() -> DispatchFixture {
    dispatch_program(&["A", "B"])
}

fn dispatch_program(receiver_classes: &[&str]) -> DispatchFixture {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("dispatch.ts");
    let main = pb.default_method(file).expect("default method");
    let a = pb.add_class(file, "A", None);
    let b = pb.add_class(file, "B", Some(a));
    pb.add_class(file, "XA", None);
    pb.add_class(file, "XB", None);

    let a_f = pb.add_method(a, "f", MethodSpec::instance().returns(Type::class("XA")));
    let ra = pb.local(a_f, "ra", Type::class("XA"));
    pb.new_object(a_f, ra, "XA");
    pb.ret(a_f, Some(Value::Local(ra)));

    let b_f = pb.add_method(b, "f", MethodSpec::instance().returns(Type::class("XB")));
    let rb = pb.local(b_f, "rb", Type::class("XB"));
    pb.new_object(b_f, rb, "XB");
    pb.ret(b_f, Some(Value::Local(rb)));

    let o = pb.local(main, "o", Type::class("A"));
    let r = pb.local(main, "r", Type::class("XA"));
    for &class in receiver_classes {
        let branch = pb.local(main, format!("o_{class}"), Type::class(class));
        pb.new_object(main, branch, class);
        pb.copy(main, o, Value::Local(branch));
    }
    let sig = pb.signature(a_f);
    pb.call(main, Some(r), InvokeExpr::new_instance(o, sig, vec![]));

    DispatchFixture {
        program: pb.build(),
        main,
        a_f,
        b_f,
        o,
        r,
    }
}

/// Lazily created instance kept in a static field
///
/// ```text
/// class Registry {
///     static getInstance() { let t = new Registry(); Registry.inst = t; let r = Registry.inst; return r; }
/// }
/// let a1 = Registry.getInstance(); let a2 = Registry.getInstance();
/// ```
pub struct SingletonFixture {
    pub program: Program,
    pub main: MethodId,
    pub a1: LocalId,
    pub a2: LocalId,
    /// Throwaway allocation made before the instance, when requested
    pub scratch: Option<LocalId>,
}

pub fn fixture_singleton() -> SingletonFixture {
    singleton_program(false)
}

/// Same factory with `let tmp = new Scratch();` as its first statement
pub fn fixture_singleton_with_scratch() -> SingletonFixture {
    singleton_program(true)
}

fn singleton_program(with_scratch: bool) -> SingletonFixture {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("registry.ts");
    let main = pb.default_method(file).expect("default method");
    let registry = pb.add_class(file, "Registry", None);
    let get = pb.add_method(
        registry,
        "getInstance",
        MethodSpec::static_method().returns(Type::class("Registry")),
    );
    let inst = Value::StaticField(FieldSignature::new("Registry", "inst", Type::class("Registry")));

    let scratch = with_scratch.then(|| {
        pb.add_class(file, "Scratch", None);
        let tmp = pb.local(get, "tmp", Type::class("Scratch"));
        pb.new_object(get, tmp, "Scratch");
        tmp
    });
    let t = pb.local(get, "t", Type::class("Registry"));
    let r = pb.local(get, "r", Type::class("Registry"));
    pb.new_object(get, t, "Registry");
    pb.assign(get, inst.clone(), Rhs::Value(Value::Local(t)));
    pb.copy(get, r, inst);
    pb.ret(get, Some(Value::Local(r)));

    let a1 = pb.local(main, "a1", Type::class("Registry"));
    let a2 = pb.local(main, "a2", Type::class("Registry"));
    let sig = pb.signature(get);
    pb.call(main, Some(a1), InvokeExpr::new_static(sig.clone(), vec![]));
    pb.call(main, Some(a2), InvokeExpr::new_static(sig, vec![]));

    SingletonFixture {
        program: pb.build(),
        main,
        a1,
        a2,
        scratch,
    }
}

/// Chain of `n` static methods, each wrapping its argument into a fresh holder
///
/// ```text
/// static f_i(x) { let h = new H(); h.v = x; let y = h.v; return f_{i+1}(y); }
/// ```
pub fn fixture_call_chain(n: usize) -> (Program, MethodId, LocalId, LocalId) {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("chain.ts");
    let main = pb.default_method(file).expect("default method");
    pb.add_class(file, "A", None);
    pb.add_class(file, "H", None);
    let chain = pb.add_class(file, "Chain", None);
    let field = FieldSignature::new("H", "v", Type::class("A"));

    let methods: Vec<MethodId> = (0..n)
        .map(|i| {
            pb.add_method(
                chain,
                format!("f{i}"),
                MethodSpec::static_method()
                    .param("x", Type::class("A"))
                    .returns(Type::class("A")),
            )
        })
        .collect();

    for (i, &m) in methods.iter().enumerate() {
        let x = pb.param(m, 0).expect("parameter local");
        let h = pb.local(m, "h", Type::class("H"));
        let y = pb.local(m, "y", Type::class("A"));
        pb.new_object(m, h, "H");
        pb.store(m, h, field.clone(), x);
        pb.load(m, y, h, field.clone());
        match methods.get(i + 1) {
            Some(&next) => {
                let out = pb.local(m, "out", Type::class("A"));
                let sig = pb.signature(next);
                pb.call(m, Some(out), InvokeExpr::new_static(sig, vec![Value::Local(y)]));
                pb.ret(m, Some(Value::Local(out)));
            }
            None => {
                pb.ret(m, Some(Value::Local(y)));
            }
        }
    }

    let a = pb.local(main, "a", Type::class("A"));
    let res = pb.local(main, "res", Type::class("A"));
    pb.new_object(main, a, "A");
    if let Some(&first) = methods.first() {
        let sig = pb.signature(first);
        pb.call(main, Some(res), InvokeExpr::new_static(sig, vec![Value::Local(a)]));
    }
    (pb.build(), main, a, res)
}
