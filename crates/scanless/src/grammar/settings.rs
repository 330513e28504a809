//! Per-rule settings with inherit/local/global override modes.
//!
//! Each setting field travels with a seven-way mode that decides whether the
//! value applies to the rule itself, to its children, or to both, and whether
//! it comes from the parent chain, the rule, or the global defaults.

use super::RuleId;

/// How surrounding trivia is consumed before a rule parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipStrategy {
    /// Parse immediately, no skipping.
    #[default]
    NoSkipping,
    /// Run the skip rule once, then parse.
    SkipBeforeParsing,
    /// Parse; on failure alternate one skip application and a re-parse until
    /// the parse succeeds or the skip stops advancing.
    SkipBeforeParsingLazy,
    /// Skip repeatedly until the skip rule no longer advances, then parse.
    SkipBeforeParsingGreedy,
    /// Parse; on failure skip once and re-parse.
    TryParseThenSkip,
    /// Parse; on failure alternate skip and parse until success or exhaustion.
    TryParseThenSkipLazy,
    /// Parse; on failure skip greedily, then re-parse.
    TryParseThenSkipGreedy,
}

impl SkipStrategy {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            SkipStrategy::NoSkipping => 0,
            SkipStrategy::SkipBeforeParsing => 1,
            SkipStrategy::SkipBeforeParsingLazy => 2,
            SkipStrategy::SkipBeforeParsingGreedy => 3,
            SkipStrategy::TryParseThenSkip => 4,
            SkipStrategy::TryParseThenSkipLazy => 5,
            SkipStrategy::TryParseThenSkipGreedy => 6,
        }
    }
}

/// What happens to an error produced by a failing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Append to the context accumulator and return failure.
    #[default]
    Record,
    /// Return failure without recording. Forced in speculative contexts.
    NoRecord,
    /// Abort the whole parse immediately.
    Throw,
}

impl ErrorHandling {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            ErrorHandling::Record => 0,
            ErrorHandling::NoRecord => 1,
            ErrorHandling::Throw => 2,
        }
    }
}

/// Scope and origin of a setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideMode {
    /// Take whatever the parent chain propagates.
    #[default]
    Inherit,
    /// The local value applies to this rule and is propagated to children.
    LocalForAll,
    /// The local value applies to this rule only; children inherit.
    LocalForSelf,
    /// This rule inherits; children receive the local value.
    LocalForChildren,
    /// The global default applies to this rule and its children.
    GlobalForAll,
    /// The global default applies to this rule only.
    GlobalForSelf,
    /// The global default applies to children only.
    GlobalForChildren,
}

/// One setting field: an optional local value plus its override mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Setting<T> {
    pub value: Option<T>,
    pub mode: OverrideMode,
}

impl<T: Clone> Setting<T> {
    pub fn local(value: T) -> Self {
        Self {
            value: Some(value),
            mode: OverrideMode::LocalForAll,
        }
    }

    pub fn local_for_self(value: T) -> Self {
        Self {
            value: Some(value),
            mode: OverrideMode::LocalForSelf,
        }
    }

    pub fn local_for_children(value: T) -> Self {
        Self {
            value: Some(value),
            mode: OverrideMode::LocalForChildren,
        }
    }

    pub fn global(mode: OverrideMode) -> Self {
        Self { value: None, mode }
    }

    /// Resolve the value seen by this rule itself.
    fn for_self(&self, inherited: &T, global: &T) -> T {
        match self.mode {
            OverrideMode::Inherit
            | OverrideMode::LocalForChildren
            | OverrideMode::GlobalForChildren => inherited.clone(),
            OverrideMode::LocalForAll | OverrideMode::LocalForSelf => {
                self.value.clone().unwrap_or_else(|| inherited.clone())
            }
            OverrideMode::GlobalForAll | OverrideMode::GlobalForSelf => global.clone(),
        }
    }

    /// Resolve the value propagated to children.
    fn for_children(&self, inherited: &T, global: &T) -> T {
        match self.mode {
            OverrideMode::Inherit | OverrideMode::LocalForSelf | OverrideMode::GlobalForSelf => {
                inherited.clone()
            }
            OverrideMode::LocalForAll | OverrideMode::LocalForChildren => {
                self.value.clone().unwrap_or_else(|| inherited.clone())
            }
            OverrideMode::GlobalForAll | OverrideMode::GlobalForChildren => global.clone(),
        }
    }
}

/// Raw per-rule settings as attached by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleSettings {
    pub skip_strategy: Setting<SkipStrategy>,
    pub skip_rule: Setting<Option<RuleId>>,
    pub error_handling: Setting<ErrorHandling>,
    pub ignore_barriers: Setting<bool>,
}

impl RuleSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip(mut self, strategy: SkipStrategy) -> Self {
        self.skip_strategy = Setting::local(strategy);
        self
    }

    pub fn with_error_handling(mut self, handling: ErrorHandling) -> Self {
        self.error_handling = Setting::local(handling);
        self
    }

    pub fn with_ignore_barriers(mut self, ignore: bool) -> Self {
        self.ignore_barriers = Setting::local(ignore);
        self
    }

    /// Combine this rule's settings with the parent-propagated snapshot and
    /// the global defaults, producing the pair (effective for self, snapshot
    /// propagated to children).
    pub(crate) fn resolve(
        &self,
        inherited: &ResolvedSettings,
        global: &ResolvedSettings,
    ) -> (ResolvedSettings, ResolvedSettings) {
        let own = ResolvedSettings {
            skip_strategy: self
                .skip_strategy
                .for_self(&inherited.skip_strategy, &global.skip_strategy),
            skip_rule: self
                .skip_rule
                .for_self(&inherited.skip_rule, &global.skip_rule),
            error_handling: self
                .error_handling
                .for_self(&inherited.error_handling, &global.error_handling),
            ignore_barriers: self
                .ignore_barriers
                .for_self(&inherited.ignore_barriers, &global.ignore_barriers),
        };
        let children = ResolvedSettings {
            skip_strategy: self
                .skip_strategy
                .for_children(&inherited.skip_strategy, &global.skip_strategy),
            skip_rule: self
                .skip_rule
                .for_children(&inherited.skip_rule, &global.skip_rule),
            error_handling: self
                .error_handling
                .for_children(&inherited.error_handling, &global.error_handling),
            ignore_barriers: self
                .ignore_barriers
                .for_children(&inherited.ignore_barriers, &global.ignore_barriers),
        };
        (own, children)
    }
}

/// Fully resolved settings for one rule at one point of the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedSettings {
    pub skip_strategy: SkipStrategy,
    pub skip_rule: Option<RuleId>,
    pub error_handling: ErrorHandling,
    pub ignore_barriers: bool,
}

impl ResolvedSettings {
    /// Pack into a memo-key fingerprint. Distinct effective settings must
    /// produce distinct fingerprints; the packing is lossless.
    pub(crate) fn fingerprint(&self) -> u64 {
        let rule_bits = match self.skip_rule {
            Some(id) => (id as u64) + 1,
            None => 0,
        };
        (rule_bits << 8)
            | ((self.skip_strategy.as_u8() as u64) << 3)
            | ((self.error_handling.as_u8() as u64) << 1)
            | (self.ignore_barriers as u64)
    }
}
