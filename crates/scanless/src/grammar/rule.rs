//! Rule records: the composite layer of the element graph.

use super::callbacks::{CustomRuleFn, ParamPredicate, ParamSelector, ValueFactory};
use super::chars::FirstChars;
use super::settings::RuleSettings;
use super::{RuleId, TokenId};

/// Alternative selection policy for `Choice` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChoiceMode {
    /// First successful alternative wins.
    #[default]
    First,
    /// All alternatives are tried; the shortest success wins, declaration
    /// order breaking ties.
    Shortest,
    /// All alternatives are tried; the longest success wins.
    Longest,
}

/// The tagged union of rule behaviours, dispatched by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// Leaf: match one token pattern.
    Token(TokenId),
    /// Children in order; fails as a whole without consuming.
    Sequence(Vec<RuleId>),
    Choice {
        mode: ChoiceMode,
        children: Vec<RuleId>,
    },
    /// Child or empty success.
    Optional(RuleId),
    /// Greedy repetition within `[min, max]`; `max = None` is unbounded.
    Repeat {
        child: RuleId,
        min: u32,
        max: Option<u32>,
    },
    SeparatedRepeat {
        child: RuleId,
        separator: RuleId,
        min: u32,
        max: Option<u32>,
        allow_trailing: bool,
        include_separators: bool,
    },
    /// Tries the child and restores the cursor exactly.
    Lookahead {
        child: RuleId,
        positive: bool,
    },
    /// Parameter-dispatched conditional.
    If {
        predicate: ParamPredicate,
        then_rule: RuleId,
        else_rule: Option<RuleId>,
    },
    /// Parameter-dispatched branch table.
    Switch {
        selector: ParamSelector,
        branches: Vec<RuleId>,
        default: Option<RuleId>,
    },
    /// User function over sequentially parsed children.
    Custom {
        func: CustomRuleFn,
        children: Vec<RuleId>,
    },
}

impl RuleKind {
    /// Ordered child rule ids, for traversal passes.
    pub fn child_ids(&self) -> Vec<RuleId> {
        match self {
            RuleKind::Token(_) => Vec::new(),
            RuleKind::Sequence(children) => children.clone(),
            RuleKind::Choice { children, .. } => children.clone(),
            RuleKind::Optional(child) => vec![*child],
            RuleKind::Repeat { child, .. } => vec![*child],
            RuleKind::SeparatedRepeat {
                child, separator, ..
            } => vec![*child, *separator],
            RuleKind::Lookahead { child, .. } => vec![*child],
            RuleKind::If {
                then_rule,
                else_rule,
                ..
            } => {
                let mut ids = vec![*then_rule];
                ids.extend(else_rule.iter().copied());
                ids
            }
            RuleKind::Switch {
                branches, default, ..
            } => {
                let mut ids = branches.clone();
                ids.extend(default.iter().copied());
                ids
            }
            RuleKind::Custom { children, .. } => children.clone(),
        }
    }
}

/// Error recovery strategy attached to a rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Recovery {
    /// Propagate failure.
    #[default]
    None,
    /// Advance one character and retry, until success, the stop rule
    /// matches, or the next barrier is reached.
    FindNext { stop: Option<RuleId> },
    /// Advance until the anchor matches, reposition at the anchor start,
    /// retry.
    SkipUntilAnchor {
        anchor: RuleId,
        stop: Option<RuleId>,
        repeat: bool,
    },
    /// Advance until the anchor matches, reposition just after it, retry.
    SkipAfterAnchor {
        anchor: RuleId,
        stop: Option<RuleId>,
        repeat: bool,
    },
}

impl Recovery {
    pub fn is_none(&self) -> bool {
        matches!(self, Recovery::None)
    }
}

/// A finalised rule record in the flat parser table.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    pub kind: RuleKind,
    /// Names that resolved to this rule, in declaration order.
    pub aliases: Vec<String>,
    pub settings: RuleSettings,
    pub recovery: Recovery,
    pub factory: Option<ValueFactory>,
    pub first_chars: FirstChars,
}

impl Rule {
    pub fn is_token(&self) -> bool {
        matches!(self.kind, RuleKind::Token(_))
    }

    pub fn token_id(&self) -> Option<TokenId> {
        match self.kind {
            RuleKind::Token(token) => Some(token),
            _ => None,
        }
    }
}
