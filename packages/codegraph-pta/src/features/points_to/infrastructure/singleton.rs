//! Singleton factory detection
//!
//! A static method is a singleton factory when a freshly allocated object
//! reaches one of its return values through a static field:
//!
//! ```text
//! static getInstance() {
//!     if (!Registry.inst) { let t = new Registry(); Registry.inst = t; }
//!     let r = Registry.inst;
//!     return r;
//! }
//! ```
//!
//! Such methods are analysed in the empty context so every caller shares
//! one allocation.

use crate::features::ir::{MethodId, Program, Value};
use crate::features::points_to::domain::{FuncPag, PagEdgeKind};
use rustc_hash::{FxHashMap, FxHashSet};

/// Whether `method` looks like a singleton factory
pub fn is_singleton_function(program: &Program, method: MethodId, func_pag: &FuncPag) -> bool {
    if !program.method(method).is_static {
        return false;
    }

    let mut graph: FxHashMap<&Value, Vec<&Value>> = FxHashMap::default();
    let mut has_static_field = false;
    for edge in func_pag.edges() {
        has_static_field |= matches!(edge.src, Value::StaticField(_))
            || matches!(edge.dst, Value::StaticField(_));
        graph.entry(&edge.src).or_default().push(&edge.dst);
        graph.entry(&edge.dst).or_default();
    }
    if !has_static_field {
        return false;
    }

    // Only the first allocation is tried against each return value
    let Some(first_heap_object) = func_pag
        .edges()
        .iter()
        .find(|e| e.kind == PagEdgeKind::Address)
        .map(|e| &e.dst)
    else {
        return false;
    };

    let return_values = program.return_values(method);
    let connected = return_values
        .iter()
        .filter(|v| matches!(v, Value::Local(_)))
        .any(|target| reaches_through_static_field(&graph, first_heap_object, target));
    connected
}

struct Frame<'a> {
    node: &'a Value,
    static_found: bool,
    next: usize,
}

/// Iterative DFS from `start` to `target`
///
/// Nodes are visited once. A frame's flag is set once one of its successors
/// is a static field, and every child pushed afterwards inherits it. The
/// target is never marked visited, so every path into it is checked.
fn reaches_through_static_field<'a>(
    graph: &FxHashMap<&'a Value, Vec<&'a Value>>,
    start: &'a Value,
    target: &Value,
) -> bool {
    if start == target {
        return false;
    }

    let mut visited: FxHashSet<&'a Value> = FxHashSet::default();
    visited.insert(start);
    let mut stack = vec![Frame {
        node: start,
        static_found: false,
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let successors = graph.get(frame.node).map(Vec::as_slice).unwrap_or_default();
        let Some(&next) = successors.get(frame.next) else {
            stack.pop();
            continue;
        };
        frame.next += 1;
        if visited.contains(next) {
            continue;
        }
        if matches!(next, Value::StaticField(_)) {
            frame.static_found = true;
        }
        let static_found = frame.static_found;

        if next == target {
            if static_found {
                return true;
            }
            continue;
        }
        visited.insert(next);
        stack.push(Frame {
            node: next,
            static_found,
            next: 0,
        });
    }
    false
}
