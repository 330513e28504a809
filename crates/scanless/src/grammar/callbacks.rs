//! Opaque user callbacks stored inside element records.
//!
//! Callbacks dedup by pointer identity: two elements are structurally equal
//! only when they share the same callback allocation.

use std::fmt;
use std::sync::Arc;

use super::value::Value;

macro_rules! define_callback {
    ($(#[$doc:meta])* $name:ident($($arg:ident: $arg_ty:ty),*) -> $ret:ty) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name(Arc<dyn Fn($($arg_ty),*) -> $ret + Send + Sync>);

        impl $name {
            pub fn new<F>(f: F) -> Self
            where
                F: Fn($($arg_ty),*) -> $ret + Send + Sync + 'static,
            {
                Self(Arc::new(f))
            }

            pub(crate) fn identity(&self) -> usize {
                Arc::as_ptr(&self.0) as *const () as usize
            }

            pub fn call(&self, $($arg: $arg_ty),*) -> $ret {
                (self.0)($($arg),*)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(@{:x})"), self.identity())
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.identity() == other.identity()
            }
        }

        impl Eq for $name {}
    };
}

define_callback!(
    /// Character class membership test for char-run tokens.
    CharPredicate(c: char) -> bool
);

define_callback!(
    /// Maps one intermediate value to another (`Map` combinator).
    ValueMapper(value: Value) -> Value
);

define_callback!(
    /// Maps the matched text span to a value (`MapSpan`).
    SpanMapper(text: &str) -> Value
);

define_callback!(
    /// Combines ordered child intermediate values into one (`passage`).
    PassageFn(values: Vec<Value>) -> Value
);

define_callback!(
    /// Predicate over the matched text; `true` fails the element (`FailIf`).
    TextPredicate(text: &str) -> bool
);

define_callback!(
    /// Predicate over the parse parameter (`If` dispatch).
    ParamPredicate(parameter: Option<&Value>) -> bool
);

define_callback!(
    /// Branch selector over the parse parameter (`Switch` dispatch).
    ParamSelector(parameter: Option<&Value>) -> Option<usize>
);

define_callback!(
    /// Computes a rule node's user value from its text and child values.
    ValueFactory(args: &FactoryArgs<'_>) -> Value
);

define_callback!(
    /// Custom token matcher: `(remaining input, parameter)` to an optional
    /// `(consumed length, value)`.
    CustomTokenFn(rest: &str, parameter: Option<&Value>) -> Option<(usize, Option<Value>)>
);

define_callback!(
    /// Custom rule body. Receives the parse context snapshot and the parsed
    /// children; returns the final element or `None` for failure.
    CustomRuleFn(args: &CustomArgs<'_>) -> Option<CustomElement>
);

/// Inputs handed to a [`ValueFactory`].
pub struct FactoryArgs<'a> {
    /// Text consumed by the node.
    pub text: &'a str,
    /// User values of the node's children, in order.
    pub values: &'a [Value],
    /// The node's own intermediate value, if any.
    pub intermediate: Option<&'a Value>,
}

/// Inputs handed to a [`CustomRuleFn`].
pub struct CustomArgs<'a> {
    /// The whole input.
    pub input: &'a str,
    /// Position where the rule started (after skipping).
    pub start: usize,
    /// Position after the parsed children.
    pub cursor: usize,
    /// Exclusive upper bound the rule may consume up to (next barrier or EOF).
    pub bound: usize,
    /// The parse parameter, if any.
    pub parameter: Option<&'a Value>,
    /// Already-parsed child elements, in order.
    pub children: &'a [crate::ast::ParsedRule],
}

/// Result shape a custom rule must produce.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomElement {
    pub start: usize,
    pub length: usize,
    pub value: Option<Value>,
}
