//! The grammar builder: named definitions in, frozen [`Parser`] out.
//!
//! Build pipeline: alias resolution, traversal with structural dedup,
//! barrier-alias installation, validation (ranges, empties, trivial left
//! recursion), first-character sets, optional inlining, emission.

mod expr;
mod first_sets;
mod inline;
mod intern;
mod validate;

#[cfg(test)]
mod build_tests;
#[cfg(test)]
mod first_sets_tests;

pub use expr::{RuleExpr, TokenExpr};

use std::sync::Arc;

use indexmap::IndexMap;

use crate::barriers::BarrierTokenizer;
use crate::errors::ErrorFormatting;
use crate::grammar::{
    FactoryArgs, Parser, ParserOptions, RuleSettings, SkipStrategy, Value, ValueFactory,
};
use crate::Error;

/// Recovery strategy over buildable expressions; anchors and stops are
/// interned like any other rule.
#[derive(Debug, Clone)]
pub enum RecoveryExpr {
    FindNext {
        stop: Option<Box<RuleExpr>>,
    },
    SkipUntilAnchor {
        anchor: Box<RuleExpr>,
        stop: Option<Box<RuleExpr>>,
        repeat: bool,
    },
    SkipAfterAnchor {
        anchor: Box<RuleExpr>,
        stop: Option<Box<RuleExpr>>,
        repeat: bool,
    },
}

impl RecoveryExpr {
    pub fn find_next() -> Self {
        RecoveryExpr::FindNext { stop: None }
    }

    pub fn skip_until(anchor: impl Into<RuleExpr>) -> Self {
        RecoveryExpr::SkipUntilAnchor {
            anchor: Box::new(anchor.into()),
            stop: None,
            repeat: false,
        }
    }

    pub fn skip_after(anchor: impl Into<RuleExpr>) -> Self {
        RecoveryExpr::SkipAfterAnchor {
            anchor: Box::new(anchor.into()),
            stop: None,
            repeat: false,
        }
    }

    pub fn with_stop(mut self, stop: impl Into<RuleExpr>) -> Self {
        let slot = match &mut self {
            RecoveryExpr::FindNext { stop }
            | RecoveryExpr::SkipUntilAnchor { stop, .. }
            | RecoveryExpr::SkipAfterAnchor { stop, .. } => stop,
        };
        *slot = Some(Box::new(stop.into()));
        self
    }

    pub fn repeating(mut self) -> Self {
        if let RecoveryExpr::SkipUntilAnchor { repeat, .. }
        | RecoveryExpr::SkipAfterAnchor { repeat, .. } = &mut self
        {
            *repeat = true;
        }
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RuleDef {
    pub expr: RuleExpr,
    pub settings: RuleSettings,
    pub recovery: Option<RecoveryExpr>,
    pub factory: Option<ValueFactory>,
}

#[derive(Debug, Clone)]
pub(crate) struct TokenDef {
    pub expr: TokenExpr,
    pub settings: RuleSettings,
    pub factory: Option<ValueFactory>,
}

/// Builder for a [`Parser`]: named rules and tokens, barrier tokenizers,
/// and global configuration.
pub struct GrammarBuilder {
    rules: IndexMap<String, RuleDef>,
    tokens: IndexMap<String, TokenDef>,
    tokenizers: Vec<Arc<dyn BarrierTokenizer>>,
    main: Option<String>,
    skip: Option<(RuleExpr, SkipStrategy)>,
    use_inlining: bool,
    options: ParserOptions,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            rules: IndexMap::new(),
            tokens: IndexMap::new(),
            tokenizers: Vec::new(),
            main: None,
            skip: None,
            use_inlining: false,
            options: ParserOptions::default(),
        }
    }

    /// Define a named rule. Redefinition replaces the previous body.
    pub fn rule(mut self, name: impl Into<String>, expr: impl Into<RuleExpr>) -> Self {
        self.rules.insert(
            name.into(),
            RuleDef {
                expr: expr.into(),
                settings: RuleSettings::default(),
                recovery: None,
                factory: None,
            },
        );
        self
    }

    /// Define a named token.
    pub fn token(mut self, name: impl Into<String>, expr: impl Into<TokenExpr>) -> Self {
        self.tokens.insert(
            name.into(),
            TokenDef {
                expr: expr.into(),
                settings: RuleSettings::default(),
                factory: None,
            },
        );
        self
    }

    /// Attach settings to a named rule or token (token settings become the
    /// defaults of rules referencing it). The definition must exist.
    pub fn settings(mut self, name: &str, settings: RuleSettings) -> Self {
        if let Some(def) = self.rules.get_mut(name) {
            def.settings = settings;
        } else if let Some(def) = self.tokens.get_mut(name) {
            def.settings = settings;
        }
        self
    }

    /// Attach a value factory to a named rule (or a default factory to a
    /// named token).
    pub fn factory(
        mut self,
        name: &str,
        factory: impl Fn(&FactoryArgs<'_>) -> Value + Send + Sync + 'static,
    ) -> Self {
        let factory = ValueFactory::new(factory);
        if let Some(def) = self.rules.get_mut(name) {
            def.factory = Some(factory);
        } else if let Some(def) = self.tokens.get_mut(name) {
            def.factory = Some(factory);
        }
        self
    }

    /// Attach an error-recovery strategy to a named rule.
    pub fn recover(mut self, name: &str, recovery: RecoveryExpr) -> Self {
        if let Some(def) = self.rules.get_mut(name) {
            def.recovery = Some(recovery);
        }
        self
    }

    /// Install a barrier tokenizer; its aliases become `Barrier` tokens.
    pub fn tokenizer(mut self, tokenizer: impl BarrierTokenizer + 'static) -> Self {
        self.tokenizers.push(Arc::new(tokenizer));
        self
    }

    pub fn main_rule(mut self, name: impl Into<String>) -> Self {
        self.main = Some(name.into());
        self
    }

    /// Global skip rule and strategy.
    pub fn skip(mut self, expr: impl Into<RuleExpr>, strategy: SkipStrategy) -> Self {
        self.skip = Some((expr.into(), strategy));
        self
    }

    /// Convenience: skip runs of whitespace before every rule.
    pub fn skip_whitespaces(self) -> Self {
        self.skip(
            RuleExpr::Token(TokenExpr::Whitespaces),
            SkipStrategy::SkipBeforeParsing,
        )
    }

    /// Replace the skip rule with the inline ASCII whitespace fast path.
    pub fn optimized_whitespace_skip(mut self) -> Self {
        self.options.optimized_whitespace_skip = true;
        if self.skip.is_none() {
            self.skip = Some((
                RuleExpr::Token(TokenExpr::Whitespaces),
                SkipStrategy::SkipBeforeParsing,
            ));
        }
        self
    }

    pub fn use_inlining(mut self, value: bool) -> Self {
        self.use_inlining = value;
        self
    }

    pub fn use_first_character_match(mut self, value: bool) -> Self {
        self.options.use_first_character_match = value;
        self
    }

    pub fn use_caching(mut self, value: bool) -> Self {
        self.options.use_caching = value;
        self
    }

    pub fn ignore_errors(mut self, value: bool) -> Self {
        self.options.ignore_errors = value;
        self
    }

    pub fn write_stack_trace(mut self, value: bool) -> Self {
        self.options.write_stack_trace = value;
        self
    }

    pub fn record_walk_trace(mut self, value: bool) -> Self {
        self.options.record_walk_trace = value;
        self
    }

    pub fn detailed_errors(mut self, value: bool) -> Self {
        self.options.detailed_errors = value;
        self
    }

    pub fn error_formatting(mut self, formatting: ErrorFormatting) -> Self {
        self.options.error_formatting = formatting;
        self
    }

    pub fn tab_size(mut self, value: u32) -> Self {
        self.options.tab_size = value.max(1);
        self
    }

    pub fn max_steps_to_display(mut self, value: usize) -> Self {
        self.options.max_steps_to_display = value;
        self
    }

    pub fn exec_fuel(mut self, value: u32) -> Self {
        self.options.exec_fuel = value;
        self
    }

    pub fn recursion_limit(mut self, value: u32) -> Self {
        self.options.recursion_limit = value;
        self
    }

    /// Resolve, dedup, validate, and freeze into an immutable [`Parser`].
    pub fn build(self) -> Result<Parser, Error> {
        intern::build(self)
    }

    pub(crate) fn parts(
        self,
    ) -> (
        IndexMap<String, RuleDef>,
        IndexMap<String, TokenDef>,
        Vec<Arc<dyn BarrierTokenizer>>,
        Option<String>,
        Option<(RuleExpr, SkipStrategy)>,
        bool,
        ParserOptions,
    ) {
        (
            self.rules,
            self.tokens,
            self.tokenizers,
            self.main,
            self.skip,
            self.use_inlining,
            self.options,
        )
    }
}
