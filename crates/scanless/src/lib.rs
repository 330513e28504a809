//! Scannerless PEG parser construction.
//!
//! A grammar is a set of named rules and token patterns built into an
//! immutable, deduplicated [`Parser`]: flat id-indexed element tables
//! driven by a single cursor-advancing interpreter. The engine supports
//! configurable trivia skipping, pre-scanned barrier tokens for
//! indentation-sensitive grammars, grouped error reporting with optional
//! stack and walk traces, per-rule error recovery, memoization, and
//! incremental re-parsing.
//!
//! # Example
//!
//! ```
//! use scanless::{GrammarBuilder, NumberFlags, NumericKind, RuleExpr, TokenExpr};
//!
//! let parser = GrammarBuilder::new()
//!     .token("number", TokenExpr::Number(NumberFlags::FLOAT, NumericKind::Auto))
//!     .token("plus", TokenExpr::Literal("+".to_string()))
//!     .rule(
//!         "sum",
//!         RuleExpr::Sequence(vec!["number".into(), "plus".into(), "number".into()]),
//!     )
//!     .main_rule("sum")
//!     .skip_whitespaces()
//!     .build()
//!     .expect("grammar builds");
//!
//! let ast = parser.parse("10 + 15").expect("input parses");
//! assert_eq!(ast.text(), "10 + 15");
//! assert_eq!(ast.root().child_count(), 3);
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod ast;
pub mod barriers;
pub mod build;
pub mod engine;
pub mod errors;
pub mod grammar;

#[cfg(test)]
mod scenarios_tests;
#[cfg(test)]
pub mod test_utils;

pub use ast::{Ast, AstNode, FindAllMatches, ParseTreeOptimization, ParsedRule, TextChange};
pub use barriers::{BarrierToken, BarrierTokenizer, IndentMode, IndentTokenizer};
pub use build::{GrammarBuilder, RecoveryExpr, RuleExpr, TokenExpr};
pub use engine::{MemoTable, TokenMatch, WalkTrace};
pub use errors::{ErrorFormatting, ErrorGroup, ErrorPrinter, ErrorReport};
pub use grammar::{
    ChoiceMode, ErrorHandling, FactoryArgs, NumberFlags, NumericKind, OverrideMode, Parser,
    ParserOptions, RuleSettings, SkipStrategy, Value,
};

/// Errors from building a grammar or from a failed parse.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A name that resolves to no rule or token.
    #[error("unknown reference `{0}`")]
    UnknownReference(String),

    /// Named definitions that alias each other in a loop.
    #[error("definition cycle: {0}")]
    NameCycle(String),

    /// An element with nothing to match (empty sequence, choice, literal).
    #[error("empty element: {0}")]
    EmptyElement(String),

    /// A repeat range with `max < min`.
    #[error("invalid repeat range: max {max} is below min {min}")]
    InvalidRange { min: u32, max: u32 },

    /// A rule that can re-enter itself without consuming input.
    #[error("trivially left-recursive rule: {0}")]
    LeftRecursion(String),

    #[error("invalid regex `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// A `Barrier` token naming an alias no tokenizer declares.
    #[error("unknown barrier alias `{0}`")]
    UnknownBarrierAlias(String),

    #[error("unknown rule `{0}`")]
    UnknownRule(String),

    #[error("unknown token `{0}`")]
    UnknownToken(String),

    /// `parse` was called without a main rule configured.
    #[error("no main rule defined")]
    NoMainRule,

    /// The parse failed; the report carries the aggregated error groups.
    #[error("{}", .0.message())]
    ParseFailed(Box<ErrorReport>),

    /// Interpreter step budget exhausted.
    #[error("execution limit exceeded")]
    ExecFuelExhausted,

    /// Rule nesting exceeded the recursion limit.
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,
}

impl Error {
    /// The aggregated report of a failed parse, when this is one.
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            Error::ParseFailed(report) => Some(report),
            _ => None,
        }
    }
}

/// Result type for grammar building and parsing.
pub type Result<T> = std::result::Result<T, Error>;
