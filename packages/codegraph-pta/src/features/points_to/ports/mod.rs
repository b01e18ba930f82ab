//! Ports (interfaces) for the pointer analysis
//!
//! Clients that only ask alias questions depend on [`AliasAnalysis`]
//! rather than on the solver type.
//!
//! ```rust,ignore
//! fn shares_state<A: AliasAnalysis>(pta: &A, a: &Value, b: &Value) -> bool {
//!     pta.may_alias(a, b)
//! }
//! ```

use crate::features::ir::Value;
use crate::features::points_to::application::PointerAnalysis;
use crate::features::points_to::domain::NodeId;

/// Alias queries over a solved analysis
pub trait AliasAnalysis {
    /// Objects `value` may point to in any context, ascending
    fn points_to(&self, value: &Value) -> Vec<NodeId>;

    /// Whether `a` and `b` may point to a common object
    fn may_alias(&self, a: &Value, b: &Value) -> bool;

    fn no_alias(&self, a: &Value, b: &Value) -> bool {
        !self.may_alias(a, b)
    }

    /// Values connected to `value` by assignment or receiver binding
    fn related_values(&self, value: &Value) -> Vec<Value>;
}

impl AliasAnalysis for PointerAnalysis<'_> {
    fn points_to(&self, value: &Value) -> Vec<NodeId> {
        self.points_to_of_value(value)
    }

    fn may_alias(&self, a: &Value, b: &Value) -> bool {
        PointerAnalysis::may_alias(self, a, b)
    }

    fn no_alias(&self, a: &Value, b: &Value) -> bool {
        PointerAnalysis::no_alias(self, a, b)
    }

    fn related_values(&self, value: &Value) -> Vec<Value> {
        PointerAnalysis::related_values(self, value)
    }
}
