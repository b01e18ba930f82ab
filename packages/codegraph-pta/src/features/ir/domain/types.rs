//! Types and signatures of the IR

use crate::shared::constants::names::UNKNOWN_FILE_NAME;
use std::fmt;

/// Method identity as seen from a call expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodSignature {
    pub file: String,
    pub class: String,
    pub name: String,
}

impl MethodSignature {
    pub fn new(file: impl Into<String>, class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            class: class.into(),
            name: name.into(),
        }
    }

    /// Signature the front-end could not resolve to a declaration
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(UNKNOWN_FILE_NAME, "", name)
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.file == UNKNOWN_FILE_NAME
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}: {}.{}()", self.file, self.class, self.name)
    }
}

/// Field identity: declaring class, name and declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSignature {
    pub class: String,
    pub name: String,
    pub ty: Type,
}

impl FieldSignature {
    pub fn new(class: impl Into<String>, name: impl Into<String>, ty: Type) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for FieldSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.name)
    }
}

/// Declared or inferred type of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Class instance, by class name
    Class(String),
    /// Function value pointing at a method
    Function(MethodSignature),
    /// Array with element type
    Array(Box<Type>),
    /// String, optionally a literal type
    String(Option<String>),
    Number,
    Boolean,
    Void,
    Unknown,
}

impl Type {
    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    pub fn array_of(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    /// Class name for class types
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Target signature for function types
    pub fn function_signature(&self) -> Option<&MethodSignature> {
        match self {
            Type::Function(sig) => Some(sig),
            _ => None,
        }
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function(_))
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Class(name) => write!(f, "{}", name),
            Type::Function(sig) => write!(f, "fn {}", sig),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::String(Some(lit)) => write!(f, "'{}'", lit),
            Type::String(None) => write!(f, "string"),
            Type::Number => write!(f, "number"),
            Type::Boolean => write!(f, "boolean"),
            Type::Void => write!(f, "void"),
            Type::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_signature() {
        let sig = MethodSignature::unknown("f");
        assert!(sig.is_unknown());
        assert!(!MethodSignature::new("a.ts", "A", "f").is_unknown());
    }

    #[test]
    fn test_type_accessors() {
        let sig = MethodSignature::new("a.ts", "A", "f");
        assert_eq!(Type::Function(sig.clone()).function_signature(), Some(&sig));
        assert_eq!(Type::class("A").class_name(), Some("A"));
        assert!(Type::array_of(Type::Number).is_array());
        assert_eq!(Type::array_of(Type::class("A")).to_string(), "A[]");
    }
}
