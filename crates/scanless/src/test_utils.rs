//! Shared grammar-fixture constructors for unit tests.
//!
//! The public surface exposes the buildable enums directly; these helpers
//! only shorten the most common fixture shapes.

use crate::build::{RuleExpr, TokenExpr};
use crate::grammar::{ChoiceMode, NumberFlags, NumericKind};

pub fn lit(text: &str) -> TokenExpr {
    TokenExpr::Literal(text.to_string())
}

pub fn ch(c: char) -> TokenExpr {
    TokenExpr::LiteralChar(c)
}

/// Signed decimal, `Int` or `Float` per the matched shape.
pub fn num() -> TokenExpr {
    TokenExpr::Number(NumberFlags::FLOAT, NumericKind::Auto)
}

pub fn int() -> TokenExpr {
    TokenExpr::Number(NumberFlags::INTEGER, NumericKind::Integer)
}

pub fn r(name: &str) -> RuleExpr {
    RuleExpr::Ref(name.to_string())
}

pub fn tok(token: TokenExpr) -> RuleExpr {
    RuleExpr::Token(token)
}

pub fn seq(children: impl IntoIterator<Item = RuleExpr>) -> RuleExpr {
    RuleExpr::Sequence(children.into_iter().collect())
}

pub fn choice(children: impl IntoIterator<Item = RuleExpr>) -> RuleExpr {
    RuleExpr::Choice(ChoiceMode::First, children.into_iter().collect())
}

pub fn opt(child: RuleExpr) -> RuleExpr {
    RuleExpr::Optional(Box::new(child))
}

pub fn many0(child: RuleExpr) -> RuleExpr {
    RuleExpr::Repeat {
        child: Box::new(child),
        min: 0,
        max: None,
    }
}

pub fn many1(child: RuleExpr) -> RuleExpr {
    RuleExpr::Repeat {
        child: Box::new(child),
        min: 1,
        max: None,
    }
}

pub fn sep_by(child: RuleExpr, separator: RuleExpr, min: u32) -> RuleExpr {
    RuleExpr::SeparatedRepeat {
        child: Box::new(child),
        separator: Box::new(separator),
        min,
        max: None,
        allow_trailing: false,
        include_separators: false,
    }
}

pub fn tseq(children: impl IntoIterator<Item = TokenExpr>) -> TokenExpr {
    TokenExpr::Sequence {
        children: children.into_iter().collect(),
        passage: None,
    }
}
