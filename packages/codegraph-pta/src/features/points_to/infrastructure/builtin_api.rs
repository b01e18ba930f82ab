//! Built-in APIs modelled by hand and callee resolution strategies

use crate::features::ir::MethodSignature;
use crate::shared::constants::builtin::{
    FUNCTION_APPLY, FUNCTION_BIND, FUNCTION_CALL, FUNCTION_CLASS, MAP_CLASS, MAP_SET, SET_ADD,
    SET_CLASS,
};
use serde::Serialize;

/// Built-in method an invoke targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinApi {
    NotBuiltIn,
    /// `Set.prototype.add(value)`
    SetAdd,
    /// `Map.prototype.set(key, value)`
    MapSet,
    /// `Function.prototype.call(thisArg, ...args)`
    FunctionCall,
    /// `Function.prototype.apply(thisArg, argsArray)`
    FunctionApply,
    /// `Function.prototype.bind(thisArg, ...args)`
    FunctionBind,
}

impl BuiltinApi {
    /// Classify by declaring class and method name
    pub fn classify(signature: &MethodSignature) -> Self {
        match (signature.class.as_str(), signature.name.as_str()) {
            (SET_CLASS, SET_ADD) => BuiltinApi::SetAdd,
            (MAP_CLASS, MAP_SET) => BuiltinApi::MapSet,
            (FUNCTION_CLASS, FUNCTION_CALL) => BuiltinApi::FunctionCall,
            (FUNCTION_CLASS, FUNCTION_APPLY) => BuiltinApi::FunctionApply,
            (FUNCTION_CLASS, FUNCTION_BIND) => BuiltinApi::FunctionBind,
            _ => BuiltinApi::NotBuiltIn,
        }
    }

    #[inline]
    pub fn is_builtin(self) -> bool {
        self != BuiltinApi::NotBuiltIn
    }

    /// Writes into a container's element node
    #[inline]
    pub fn is_container_op(self) -> bool {
        matches!(self, BuiltinApi::SetAdd | BuiltinApi::MapSet)
    }

    /// Argument written into the container element
    pub fn container_value_arg(self) -> Option<usize> {
        match self {
            BuiltinApi::SetAdd => Some(0),
            BuiltinApi::MapSet => Some(1),
            _ => None,
        }
    }
}

/// How the callee of a dynamic call was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResolutionStrategy {
    /// Declared signature of the invoke
    StaticTarget,
    /// Method lookup along the receiver object's class hierarchy
    VirtualDispatch,
    /// Method behind a function value
    ClosureValue,
    /// Function-typed arguments of the call
    ArgumentInferredFunction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let sig = |class: &str, name: &str| MethodSignature::new("lib.d.ts", class, name);
        assert_eq!(BuiltinApi::classify(&sig("Set", "add")), BuiltinApi::SetAdd);
        assert_eq!(BuiltinApi::classify(&sig("Map", "set")), BuiltinApi::MapSet);
        assert_eq!(BuiltinApi::classify(&sig("Function", "bind")), BuiltinApi::FunctionBind);
        assert_eq!(BuiltinApi::classify(&sig("Map", "add")), BuiltinApi::NotBuiltIn);
        assert_eq!(BuiltinApi::classify(&sig("A", "call")), BuiltinApi::NotBuiltIn);
    }

    #[test]
    fn test_container_value_arg() {
        assert_eq!(BuiltinApi::SetAdd.container_value_arg(), Some(0));
        assert_eq!(BuiltinApi::MapSet.container_value_arg(), Some(1));
        assert!(!BuiltinApi::FunctionApply.is_container_op());
        assert!(BuiltinApi::FunctionApply.is_builtin());
    }
}
