//! The immutable parser model: flat, id-indexed rule and token tables.
//!
//! A `Parser` is produced once by the builder and never mutated. Children
//! are integer ids into the flat tables, so recursive grammars introduce no
//! ownership cycles.

mod callbacks;
mod chars;
mod dump;
mod rule;
mod settings;
mod token;
mod trie;
mod value;

#[cfg(test)]
mod trie_tests;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::barriers::BarrierTokenizer;
use crate::errors::ErrorFormatting;

pub use callbacks::{
    CharPredicate, CustomArgs, CustomElement, CustomRuleFn, CustomTokenFn, FactoryArgs,
    ParamPredicate, ParamSelector, PassageFn, SpanMapper, TextPredicate, ValueFactory, ValueMapper,
};
pub use chars::{CharSet, FirstChars};
pub use rule::{ChoiceMode, Recovery, Rule, RuleKind};
pub use settings::{
    ErrorHandling, OverrideMode, ResolvedSettings, RuleSettings, Setting, SkipStrategy,
};
pub use token::{CompiledRegex, NumberFlags, NumericKind, TokenKind, TokenPattern};
pub use trie::LiteralTrie;
pub use value::Value;

/// Index into [`Parser`]'s rule table.
pub type RuleId = u32;

/// Index into [`Parser`]'s token table.
pub type TokenId = u32;

/// Global flags and defaults frozen into the parser at build time.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Global default settings, the bottom of the override chain.
    pub defaults: ResolvedSettings,
    /// Replace the skip rule with an inline ASCII whitespace skipper.
    pub optimized_whitespace_skip: bool,
    /// Prune first-choice branches by first-character sets.
    pub use_first_character_match: bool,
    /// Memoize rule results per `(rule, position, settings)`.
    pub use_caching: bool,
    /// Disable error recording entirely.
    pub ignore_errors: bool,
    /// Record ancestor rule chains on every error.
    pub write_stack_trace: bool,
    /// Record an enter/success/fail walk log.
    pub record_walk_trace: bool,
    /// Record errors for composite rules, not only tokens.
    pub detailed_errors: bool,
    pub error_formatting: ErrorFormatting,
    /// Visual column width of a tab stop.
    pub tab_size: u32,
    /// Tail length of the walk trace shown by the formatter.
    pub max_steps_to_display: usize,
    /// Interpreter step budget per parse call.
    pub exec_fuel: u32,
    /// Maximum rule nesting depth per parse call.
    pub recursion_limit: u32,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            defaults: ResolvedSettings::default(),
            optimized_whitespace_skip: false,
            use_first_character_match: false,
            use_caching: false,
            ignore_errors: false,
            write_stack_trace: false,
            record_walk_trace: false,
            detailed_errors: true,
            error_formatting: ErrorFormatting::default(),
            tab_size: 4,
            max_steps_to_display: 30,
            exec_fuel: 1_000_000,
            recursion_limit: 1024,
        }
    }
}

/// An immutable parser: the deduplicated element graph plus its entry
/// points. Safe to share across threads; all mutation lives in the
/// per-parse context.
#[derive(Debug)]
pub struct Parser {
    pub(crate) rules: Vec<Rule>,
    pub(crate) tokens: Vec<TokenPattern>,
    pub(crate) tokenizers: Vec<Arc<dyn BarrierTokenizer>>,
    pub(crate) rule_names: IndexMap<String, RuleId>,
    pub(crate) token_names: IndexMap<String, TokenId>,
    pub(crate) main_rule: Option<RuleId>,
    pub(crate) options: ParserOptions,
}

impl Parser {
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id as usize]
    }

    pub fn token(&self, id: TokenId) -> &TokenPattern {
        &self.tokens[id as usize]
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_names.get(name).copied()
    }

    pub fn token_id(&self, name: &str) -> Option<TokenId> {
        self.token_names.get(name).copied()
    }

    pub fn main_rule(&self) -> Option<RuleId> {
        self.main_rule
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub(crate) fn tokenizers(&self) -> &[Arc<dyn BarrierTokenizer>] {
        &self.tokenizers
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenPattern> {
        self.tokens.iter()
    }

    /// Display name of a rule: first alias, else a kind-derived description.
    pub fn rule_display_name(&self, id: RuleId) -> String {
        let rule = self.rule(id);
        if let Some(alias) = rule.aliases.first() {
            return alias.clone();
        }
        match &rule.kind {
            RuleKind::Token(token) => self.token(*token).display_name(),
            RuleKind::Sequence(_) => "sequence".to_string(),
            RuleKind::Choice { .. } => "one of alternatives".to_string(),
            RuleKind::Optional(_) => "optional".to_string(),
            RuleKind::Repeat { .. } | RuleKind::SeparatedRepeat { .. } => "repetition".to_string(),
            RuleKind::Lookahead { .. } => "lookahead".to_string(),
            RuleKind::If { .. } | RuleKind::Switch { .. } => "conditional rule".to_string(),
            RuleKind::Custom { .. } => "custom rule".to_string(),
        }
    }
}
