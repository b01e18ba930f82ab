//! Captured variables, imports and context-free values

mod common;

use codegraph_pta::features::ir::{FieldSignature, InvokeExpr, MethodSpec, ProgramBuilder, Type, Value};
use codegraph_pta::PtaConfig;
use common::*;
use pretty_assertions::assert_eq;

#[test]
fn test_imported_value_aliases_export() {
    let mut pb = ProgramBuilder::new();
    let lib = pb.add_file("lib.ts");
    let app = pb.add_file("app.ts");
    let lib_main = pb.default_method(lib).unwrap();
    let app_main = pb.default_method(app).unwrap();
    pb.add_class(lib, "C", None);

    let inst = pb.local(lib_main, "inst", Type::class("C"));
    pb.new_object(lib_main, inst, "C");
    pb.add_export(lib, "inst", inst);
    pb.add_import(app, "c", "lib.ts", "inst");
    let c = pb.local(app_main, "c", Type::class("C"));
    let z = pb.local(app_main, "z", Type::class("C"));
    pb.copy(app_main, z, Value::Local(c));
    let program = pb.build();

    let pta = solved(&program, &[app_main], PtaConfig::default());
    assert_may_alias(&pta, &local(z), &local(inst));
    assert_points_to_classes(&pta, &local(c), &["C"]);
    // the exporting file runs even though only the importer is an entry
    assert!(pta.unhandled_functions().is_empty());
}

#[test]
fn test_innermost_namespace_shadows_file_scope() {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("ns.ts");
    let file_main = pb.default_method(file).unwrap();
    let ns = pb.add_namespace(file, "N", None);
    let ns_main = pb.namespace_default_method(ns).unwrap();
    pb.add_class(file, "Outer", None);
    pb.add_class(file, "Inner", None);
    let k = pb.add_class_in_namespace(ns, "K", None);
    let f = pb.add_method(k, "f", MethodSpec::static_method());

    let outer = pb.local(file_main, "x", Type::class("Outer"));
    pb.new_object(file_main, outer, "Outer");
    let inner = pb.local(ns_main, "x", Type::class("Inner"));
    pb.new_object(ns_main, inner, "Inner");
    let captured = pb.local(f, "x", Type::class("Inner"));
    let y = pb.local(f, "y", Type::class("Inner"));
    pb.copy(f, y, Value::Local(captured));

    let sig = pb.signature(f);
    pb.call(file_main, None, InvokeExpr::new_static(sig, vec![]));
    let program = pb.build();

    let pta = solved(&program, &[file_main], PtaConfig::default());
    assert_points_to_classes(&pta, &local(y), &["Inner"]);
    assert_may_alias(&pta, &local(y), &local(inner));
    assert_no_alias(&pta, &local(y), &local(outer));
}

#[test]
fn test_captured_receiver_dispatches() {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("svc.ts");
    let main = pb.default_method(file).unwrap();
    let svc = pb.add_class(file, "Svc", None);
    pb.add_class(file, "R", None);
    let ping = pb.add_method(svc, "ping", MethodSpec::instance().returns(Type::class("R")));
    let out = pb.local(ping, "out", Type::class("R"));
    pb.new_object(ping, out, "R");
    pb.ret(ping, Some(Value::Local(out)));

    let runner = pb.add_class(file, "Runner", None);
    let run = pb.add_method(runner, "run", MethodSpec::static_method());
    let captured = pb.local(run, "svc", Type::class("Svc"));
    let r = pb.local(run, "r", Type::class("R"));
    let sig = pb.signature(ping);
    pb.call(run, Some(r), InvokeExpr::new_instance(captured, sig, vec![]));

    let s = pb.local(main, "svc", Type::class("Svc"));
    pb.new_object(main, s, "Svc");
    let sig = pb.signature(run);
    pb.call(main, None, InvokeExpr::new_static(sig, vec![]));
    let program = pb.build();

    let pta = solved(&program, &[main], PtaConfig::default());
    assert_may_alias(&pta, &local(captured), &local(s));
    assert_points_to_classes(&pta, &local(r), &["R"]);
    assert!(pta.unhandled_functions().is_empty());
}

#[test]
fn test_global_object_fields_are_shared() {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("global.ts");
    let main = pb.default_method(file).unwrap();
    pb.add_class(file, "A", None);
    let reader = pb.add_class(file, "Reader", None);
    let read = pb.add_method(reader, "read", MethodSpec::static_method());
    let field = FieldSignature::new("Object", "shared", Type::class("A"));

    let a = pb.local(main, "a", Type::class("A"));
    let g = pb.local(main, "g", Type::class("Object"));
    let global = pb.local(main, "globalThis", Type::class("Object"));
    pb.new_object(main, a, "A");
    pb.copy(main, g, Value::Local(global));
    pb.store(main, g, field.clone(), a);

    let h = pb.local(read, "h", Type::class("Object"));
    let read_global = pb.local(read, "globalThis", Type::class("Object"));
    let b = pb.local(read, "b", Type::class("A"));
    pb.copy(read, h, Value::Local(read_global));
    pb.load(read, b, h, field);

    let sig = pb.signature(read);
    pb.call(main, None, InvokeExpr::new_static(sig, vec![]));
    let program = pb.build();

    let pta = solved(&program, &[main], PtaConfig::default());
    assert_may_alias(&pta, &local(g), &local(h));
    assert_may_alias(&pta, &local(b), &local(a));
}

#[test]
fn test_singleton_factory_shares_one_instance() {
    let f = fixture_singleton();
    let pta = solved(&f.program, &[f.main], PtaConfig::default());

    assert_eq!(pta.points_to_of_value(&local(f.a1)).len(), 1);
    assert_eq!(pta.points_to_of_value(&local(f.a1)), pta.points_to_of_value(&local(f.a2)));
}

#[test]
fn test_singleton_detection_off_keeps_per_context_instances() {
    let f = fixture_singleton();
    let pta = solved(&f.program, &[f.main], PtaConfig::default().detect_singleton(false));

    // both contexts write the same static field
    assert_eq!(pta.points_to_of_value(&local(f.a1)).len(), 2);
    assert_may_alias(&pta, &local(f.a1), &local(f.a2));
    assert_points_to_classes(&pta, &local(f.a1), &["Registry"]);
}

#[test]
fn test_factory_with_earlier_allocation_is_not_folded() {
    let f = fixture_singleton_with_scratch();
    let scratch = f.scratch.expect("scratch local");
    let pta = solved(&f.program, &[f.main], PtaConfig::default());

    // one scratch object per calling context
    assert_eq!(pta.points_to_of_value(&local(scratch)).len(), 2);
    assert_eq!(pta.points_to_of_value(&local(f.a1)).len(), 2);
    assert_may_alias(&pta, &local(f.a1), &local(f.a2));
    assert_points_to_classes(&pta, &local(f.a1), &["Registry"]);
}
