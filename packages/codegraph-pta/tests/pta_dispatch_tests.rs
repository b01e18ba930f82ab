//! Dynamic call resolution tests
//!
//! Virtual dispatch, signature fallback for receivers without pointees,
//! bodiless platform methods and method-level analysis.

mod common;

use codegraph_pta::config::PtaAnalysisScale;
use codegraph_pta::features::ir::{InvokeExpr, MethodSpec, ProgramBuilder, Rhs, Type, Value};
use codegraph_pta::PtaConfig;
use common::*;
use pretty_assertions::assert_eq;

#[test]
fn test_virtual_dispatch_follows_receiver_class() {
    let d = fixture_dispatch();
    let pta = solved(&d.program, &[d.main], PtaConfig::default());

    assert_points_to_classes(&pta, &local(d.r), &["XB"]);
    assert_points_to_classes(&pta, &local(d.o), &["B"]);

    let cg = pta.call_graph();
    let main = cg.func_of_method(d.main).unwrap();
    let b_f = cg.func_of_method(d.b_f).unwrap();
    assert!(cg.has_edge(main, b_f));
    assert_eq!(pta.stats().dynamic_call_edges, 1);
    assert_eq!(pta.unhandled_functions(), vec![d.program.method(d.a_f).signature.clone()]);
}

#[test]
fn test_receiver_of_either_class_dispatches_to_both() {
    let d = fixture_dispatch_either();
    let pta = solved(&d.program, &[d.main], PtaConfig::default());

    assert_points_to_classes(&pta, &local(d.o), &["A", "B"]);
    assert_points_to_classes(&pta, &local(d.r), &["XA", "XB"]);

    let cg = pta.call_graph();
    let main = cg.func_of_method(d.main).unwrap();
    let a_f = cg.func_of_method(d.a_f).unwrap();
    let b_f = cg.func_of_method(d.b_f).unwrap();
    assert!(cg.has_edge(main, a_f));
    assert!(cg.has_edge(main, b_f));
    assert_eq!(cg.dynamic_edge_count(), 2);
    assert_eq!(pta.stats().dynamic_call_edges, 2);
    assert!(pta.unhandled_functions().is_empty());
}

#[test]
fn test_receiver_flows_into_this() {
    let d = fixture_dispatch();
    let pta = solved(&d.program, &[d.main], PtaConfig::default());

    let this = Value::This { method: d.b_f };
    assert_may_alias(&pta, &this, &local(d.o));
    assert!(pta.related_values(&local(d.o)).contains(&this));
}

#[test]
fn test_receiver_without_pointee_resolves_by_signature() {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("loss.ts");
    let main = pb.default_method(file).unwrap();
    let k = pb.add_class(file, "K", None);
    pb.add_class(file, "XK", None);
    let f = pb.add_method(k, "f", MethodSpec::instance().returns(Type::class("XK")));
    let out = pb.local(f, "out", Type::class("XK"));
    pb.new_object(f, out, "XK");
    pb.ret(f, Some(Value::Local(out)));

    // the receiver comes from an expression the IR does not model
    let w = pb.local(main, "w", Type::class("K"));
    let w2 = pb.local(main, "w2", Type::class("K"));
    let r = pb.local(main, "r", Type::class("XK"));
    pb.assign(main, Value::Local(w), Rhs::Expr("cond ? a : b".into()));
    pb.copy(main, w2, Value::Local(w));
    let sig = pb.signature(f);
    pb.call(main, Some(r), InvokeExpr::new_instance(w2, sig, vec![]));
    let program = pb.build();

    let pta = solved(&program, &[main], PtaConfig::default());
    assert!(pta.points_to_of_value(&local(w2)).is_empty());
    assert_points_to_classes(&pta, &local(r), &["XK"]);
    assert!(pta.unhandled_functions().is_empty());
}

#[test]
fn test_sdk_result_is_a_fabricated_object() {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("io.ts");
    let main = pb.default_method(file).unwrap();
    let fs = pb.add_class(file, "Fs", None);
    let open = pb.add_method(
        fs,
        "open",
        MethodSpec::sdk().static_().returns(Type::class("Stream")),
    );
    let s1 = pb.local(main, "s1", Type::class("Stream"));
    let s2 = pb.local(main, "s2", Type::class("Stream"));
    let n = pb.local(main, "n", Type::Number);
    let sig = pb.signature(open);
    pb.call(main, Some(s1), InvokeExpr::new_static(sig.clone(), vec![]));
    pb.call(main, Some(s2), InvokeExpr::new_static(sig, vec![]));
    let count = pb.add_method(fs, "count", MethodSpec::sdk().static_().returns(Type::Number));
    let sig = pb.signature(count);
    pb.call(main, Some(n), InvokeExpr::new_static(sig, vec![]));
    let program = pb.build();

    let pta = solved(&program, &[main], PtaConfig::default());
    assert_points_to_classes(&pta, &local(s1), &["Stream"]);
    // one fabricated object per call-site context
    assert_no_alias(&pta, &local(s1), &local(s2));
    assert!(pta.points_to_of_value(&local(n)).is_empty());
    // bodiless methods are never reported as unreached
    assert!(pta.unhandled_functions().is_empty());
}

#[test]
fn test_callback_handed_to_sdk_is_reached() {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("events.ts");
    let main = pb.default_method(file).unwrap();
    let app = pb.add_class(file, "App", None);
    let on_event = pb.add_method(app, "onEvent", MethodSpec::static_method());
    let inside = pb.local(on_event, "inside", Type::class("App"));
    pb.new_object(on_event, inside, "App");

    let bus = pb.add_class(file, "Bus", None);
    let handler_ty = Type::Function(pb.signature(on_event));
    let register = pb.add_method(
        bus,
        "register",
        MethodSpec::sdk().static_().param("cb", handler_ty),
    );
    let cb = pb.function_ref(main, on_event);
    let sig = pb.signature(register);
    pb.call(main, None, InvokeExpr::new_static(sig, vec![Value::Local(cb)]));
    let program = pb.build();

    let pta = solved(&program, &[main], PtaConfig::default());
    assert!(pta.unhandled_functions().is_empty());
    assert_points_to_classes(&pta, &local(inside), &["App"]);

    let cg = pta.call_graph();
    let register = cg.func_of_method(register).unwrap();
    let on_event = cg.func_of_method(on_event).unwrap();
    assert!(cg.has_edge(register, on_event));
}

#[test]
fn test_method_level_parameters_get_fake_objects() {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("unit.ts");
    let class = pb.add_class(file, "Svc", None);
    pb.add_class(file, "A", None);
    let g = pb.add_method(
        class,
        "g",
        MethodSpec::static_method()
            .param("a", Type::class("A"))
            .param("s", Type::String(None)),
    );
    let a = pb.param(g, 0).unwrap();
    let s = pb.param(g, 1).unwrap();
    let b = pb.local(g, "b", Type::class("A"));
    pb.copy(g, b, Value::Local(a));
    let program = pb.build();

    let config = PtaConfig::default().scale(PtaAnalysisScale::MethodLevel);
    let pta = solved(&program, &[g], config);
    assert_points_to_classes(&pta, &local(b), &["A"]);
    assert_may_alias(&pta, &local(a), &local(b));
    assert!(pta.points_to_of_value(&local(s)).is_empty());

    // whole-program scale leaves entry parameters empty
    let pta = solved(&program, &[g], PtaConfig::default());
    assert!(pta.points_to_of_value(&local(b)).is_empty());
}

#[test]
fn test_recursive_dispatch_terminates() {
    let mut pb = ProgramBuilder::new();
    let file = pb.add_file("rec.ts");
    let main = pb.default_method(file).unwrap();
    let node = pb.add_class(file, "Node", None);
    let visit = pb.add_method(node, "visit", MethodSpec::instance());
    let this = pb.this_local(visit).unwrap();
    let sig = pb.signature(visit);
    pb.call(visit, None, InvokeExpr::new_instance(this, sig.clone(), vec![]));

    let n = pb.local(main, "n", Type::class("Node"));
    pb.new_object(main, n, "Node");
    pb.call(main, None, InvokeExpr::new_instance(n, sig, vec![]));
    let program = pb.build();

    let pta = solved(&program, &[main], PtaConfig::default());
    assert_may_alias(&pta, &local(this), &local(n));
    assert!(pta.unhandled_functions().is_empty());
}
