//! Signature registry for primitive methods and builtin static modules.
//!
//! Methods on `str`, `[T]`, and `Dict[K, V]` live in a fixed table keyed
//! by receiver family and method name. Signatures may reference the
//! receiver's generic parameters (`T`, `K`, `V`) through [`TypePattern`];
//! the analyzer substitutes them with the concrete parameters at each
//! call site before checking arity and argument types.
//!
//! The reserved static modules `File` and `Env` use the same signature
//! shape with no generic parameters.

use crate::frontend::ast::Type;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Receiver families that carry methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// `str` receivers
    Str,
    /// `[T]` receivers
    List,
    /// `Dict[K, V]` receivers
    Dict,
}

impl Family {
    /// The family of a receiver type, if it has one.
    pub fn of(ty: &Type) -> Option<Family> {
        match ty {
            Type::Str => Some(Family::Str),
            Type::List(_) => Some(Family::List),
            Type::Dict(_, _) => Some(Family::Dict),
            _ => None,
        }
    }
}

/// A type in a method signature, possibly referencing the receiver's
/// generic parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePattern {
    /// Concrete `int`
    Int,
    /// Concrete `float`
    Float,
    /// Concrete `bool`
    Bool,
    /// Concrete `str`
    Str,
    /// No value (mutating methods)
    Void,
    /// The list element type `T`
    Elem,
    /// The dict key type `K`
    Key,
    /// The dict value type `V`
    Value,
    /// `[str]`
    ListOfStr,
    /// `[K]`
    ListOfKey,
    /// `[V]`
    ListOfValue,
}

impl TypePattern {
    /// Substitute the receiver's generic parameters into this pattern.
    ///
    /// Panics only on registry bugs (a generic pattern paired with a
    /// receiver family that cannot bind it), which the table below rules
    /// out by construction.
    pub fn substitute(&self, receiver: &Type) -> Type {
        match self {
            TypePattern::Int => Type::Int,
            TypePattern::Float => Type::Float,
            TypePattern::Bool => Type::Bool,
            TypePattern::Str => Type::Str,
            TypePattern::Void => Type::Void,
            TypePattern::ListOfStr => Type::list_of(Type::Str),
            TypePattern::Elem => match receiver {
                Type::List(element) => (**element).clone(),
                _ => unreachable!("Elem pattern on non-list receiver"),
            },
            TypePattern::Key => match receiver {
                Type::Dict(key, _) => (**key).clone(),
                _ => unreachable!("Key pattern on non-dict receiver"),
            },
            TypePattern::Value => match receiver {
                Type::Dict(_, value) => (**value).clone(),
                _ => unreachable!("Value pattern on non-dict receiver"),
            },
            TypePattern::ListOfKey => match receiver {
                Type::Dict(key, _) => Type::list_of((**key).clone()),
                _ => unreachable!("ListOfKey pattern on non-dict receiver"),
            },
            TypePattern::ListOfValue => match receiver {
                Type::Dict(_, value) => Type::list_of((**value).clone()),
                _ => unreachable!("ListOfValue pattern on non-dict receiver"),
            },
        }
    }

    /// Whether this pattern references a generic parameter of the
    /// receiver. Argument mismatches against generic parameters report a
    /// different code than mismatches against concrete types.
    pub fn is_generic(&self) -> bool {
        matches!(
            self,
            TypePattern::Elem | TypePattern::Key | TypePattern::Value
        )
    }
}

/// A builtin method signature.
#[derive(Debug, Clone, Copy)]
pub struct MethodSig {
    /// Parameter patterns
    pub params: &'static [TypePattern],
    /// Return pattern
    pub ret: TypePattern,
}

type Registry = HashMap<(Family, &'static str), MethodSig>;

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    use Family::{Dict, List};
    use TypePattern::*;

    let mut m = Registry::new();

    // str methods
    m.insert((Family::Str, "len"), MethodSig { params: &[], ret: Int });
    m.insert((Family::Str, "upper"), MethodSig { params: &[], ret: Str });
    m.insert((Family::Str, "lower"), MethodSig { params: &[], ret: Str });
    m.insert((Family::Str, "trim"), MethodSig { params: &[], ret: Str });
    m.insert((Family::Str, "trim_start"), MethodSig { params: &[], ret: Str });
    m.insert((Family::Str, "trim_end"), MethodSig { params: &[], ret: Str });
    m.insert((Family::Str, "split"), MethodSig { params: &[Str], ret: ListOfStr });
    m.insert((Family::Str, "replace"), MethodSig { params: &[Str, Str], ret: Str });
    m.insert((Family::Str, "contains"), MethodSig { params: &[Str], ret: Bool });
    m.insert((Family::Str, "starts_with"), MethodSig { params: &[Str], ret: Bool });
    m.insert((Family::Str, "ends_with"), MethodSig { params: &[Str], ret: Bool });
    m.insert((Family::Str, "to_int"), MethodSig { params: &[], ret: Int });
    m.insert((Family::Str, "to_float"), MethodSig { params: &[], ret: Float });

    // list methods
    m.insert((List, "len"), MethodSig { params: &[], ret: Int });
    m.insert((List, "push"), MethodSig { params: &[Elem], ret: Void });
    m.insert((List, "pop"), MethodSig { params: &[], ret: Elem });
    m.insert((List, "contains"), MethodSig { params: &[Elem], ret: Bool });
    m.insert((List, "join"), MethodSig { params: &[Str], ret: Str });
    m.insert((List, "reverse"), MethodSig { params: &[], ret: Void });
    m.insert((List, "clear"), MethodSig { params: &[], ret: Void });

    // dict methods
    m.insert((Dict, "len"), MethodSig { params: &[], ret: Int });
    m.insert((Dict, "has_key"), MethodSig { params: &[Key], ret: Bool });
    m.insert((Dict, "get"), MethodSig { params: &[Key, Value], ret: Value });
    m.insert((Dict, "keys"), MethodSig { params: &[], ret: ListOfKey });
    m.insert((Dict, "values"), MethodSig { params: &[], ret: ListOfValue });
    m.insert((Dict, "remove"), MethodSig { params: &[Key], ret: Void });
    m.insert((Dict, "clear"), MethodSig { params: &[], ret: Void });

    m
});

/// Look up a primitive method by receiver family and name.
pub fn lookup(family: Family, name: &str) -> Option<&'static MethodSig> {
    REGISTRY
        .iter()
        .find(|((f, n), _)| *f == family && *n == name)
        .map(|(_, sig)| sig)
}

/// Names of the builtin static modules that cannot be shadowed.
pub const BUILTIN_MODULES: &[&str] = &["File", "Env"];

/// Check whether an identifier names a builtin static module.
pub fn is_builtin_module(name: &str) -> bool {
    BUILTIN_MODULES.contains(&name)
}

static STATIC_METHODS: Lazy<HashMap<(&'static str, &'static str), MethodSig>> = Lazy::new(|| {
    use TypePattern::*;

    let mut m = HashMap::new();
    m.insert(("File", "exists"), MethodSig { params: &[Str], ret: Bool });
    m.insert(("Env", "args"), MethodSig { params: &[], ret: ListOfStr });
    m
});

/// Look up a method on a builtin static module.
pub fn static_module_method(module: &str, name: &str) -> Option<&'static MethodSig> {
    STATIC_METHODS
        .iter()
        .find(|((m, n), _)| *m == module && *n == name)
        .map(|(_, sig)| sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_methods() {
        assert!(lookup(Family::Str, "upper").is_some());
        assert!(lookup(Family::Str, "split").is_some());
        assert!(lookup(Family::Str, "append").is_none());
    }

    #[test]
    fn test_substitution_on_list() {
        let receiver = Type::list_of(Type::Int);
        let sig = lookup(Family::List, "pop").unwrap();
        assert_eq!(sig.ret.substitute(&receiver), Type::Int);

        let sig = lookup(Family::List, "push").unwrap();
        assert_eq!(sig.params[0].substitute(&receiver), Type::Int);
    }

    #[test]
    fn test_substitution_on_dict() {
        let receiver = Type::dict_of(Type::Str, Type::Int);
        let sig = lookup(Family::Dict, "keys").unwrap();
        assert_eq!(sig.ret.substitute(&receiver), Type::list_of(Type::Str));

        let sig = lookup(Family::Dict, "get").unwrap();
        assert_eq!(sig.params[0].substitute(&receiver), Type::Str);
        assert_eq!(sig.params[1].substitute(&receiver), Type::Int);
        assert_eq!(sig.ret.substitute(&receiver), Type::Int);
    }

    #[test]
    fn test_generic_flag() {
        let sig = lookup(Family::List, "push").unwrap();
        assert!(sig.params[0].is_generic());
        let sig = lookup(Family::Str, "split").unwrap();
        assert!(!sig.params[0].is_generic());
    }

    #[test]
    fn test_static_modules() {
        assert!(is_builtin_module("File"));
        assert!(is_builtin_module("Env"));
        assert!(!is_builtin_module("Math"));
        assert!(static_module_method("File", "exists").is_some());
        assert!(static_module_method("Env", "args").is_some());
        assert!(static_module_method("Env", "get").is_none());
    }
}
