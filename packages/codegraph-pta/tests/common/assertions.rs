//! Custom assertions for points-to results

use codegraph_pta::features::ir::Value;
use codegraph_pta::features::points_to::PagValue;
use codegraph_pta::PointerAnalysis;

/// Class names of the objects `value` may point to, sorted
pub fn pointee_classes(pta: &PointerAnalysis<'_>, value: &Value) -> Vec<String> {
    let program = pta.program();
    let mut classes: Vec<String> = pta
        .points_to_of_value(value)
        .into_iter()
        .filter_map(|n| match &pta.pag().node(n).value {
            PagValue::Ir(Value::New(alloc)) => program.alloc_class_name(*alloc).map(str::to_string),
            PagValue::Ir(Value::NewArray(_)) => Some("Array".to_string()),
            PagValue::FakeObject { ty, .. } => ty.class_name().map(str::to_string),
            _ => None,
        })
        .collect();
    classes.sort();
    classes.dedup();
    classes
}

pub fn assert_may_alias(pta: &PointerAnalysis<'_>, a: &Value, b: &Value) {
    assert!(
        pta.may_alias(a, b),
        "Expected {a} and {b} to alias. pts({a}) = {:?}, pts({b}) = {:?}",
        pta.points_to_of_value(a),
        pta.points_to_of_value(b)
    );
}

pub fn assert_no_alias(pta: &PointerAnalysis<'_>, a: &Value, b: &Value) {
    assert!(
        pta.no_alias(a, b),
        "Expected {a} and {b} not to alias. pts({a}) = {:?}, pts({b}) = {:?}",
        pta.points_to_of_value(a),
        pta.points_to_of_value(b)
    );
}

/// Assert `value` points to objects of exactly `expected` classes
pub fn assert_points_to_classes(pta: &PointerAnalysis<'_>, value: &Value, expected: &[&str]) {
    let actual = pointee_classes(pta, value);
    assert_eq!(
        actual,
        expected.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        "Unexpected pointees for {value}"
    );
}
