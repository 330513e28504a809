//! Bottom-up first-character set computation.
//!
//! Sets start empty and grow to a fixpoint; `Any` is the absorbing top for
//! open-ended leaves (regex, identifier, nullable elements).

use crate::grammar::{
    CharSet, FirstChars, NumberFlags, Rule, RuleKind, TokenKind, TokenPattern,
};

use super::validate::{rule_nullability, token_nullability};

pub(super) fn compute(rules: &mut [Rule], tokens: &mut [TokenPattern]) {
    let token_nullable = token_nullability(tokens);
    let rule_nullable = rule_nullability(rules, &token_nullable);

    let mut token_firsts = vec![FirstChars::empty(); tokens.len()];
    loop {
        let mut changed = false;
        for token in tokens.iter() {
            let computed = token_first(&token.kind, &token_firsts, &token_nullable);
            if token_firsts[token.id as usize] != computed {
                token_firsts[token.id as usize] = computed;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut rule_firsts = vec![FirstChars::empty(); rules.len()];
    loop {
        let mut changed = false;
        for rule in rules.iter() {
            let computed = rule_first(&rule.kind, &rule_firsts, &token_firsts, &rule_nullable);
            if rule_firsts[rule.id as usize] != computed {
                rule_firsts[rule.id as usize] = computed;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for token in tokens.iter_mut() {
        token.first_chars = token_firsts[token.id as usize].clone();
    }
    for rule in rules.iter_mut() {
        rule.first_chars = rule_firsts[rule.id as usize].clone();
    }
}

fn token_first(kind: &TokenKind, firsts: &[FirstChars], nullable: &[bool]) -> FirstChars {
    let of = |id: &u32| firsts[*id as usize].clone();
    match kind {
        TokenKind::Literal(text) => match text.chars().next() {
            Some(c) => FirstChars::single(c),
            None => FirstChars::Any,
        },
        TokenKind::LiteralChar(c) => FirstChars::single(*c),
        TokenKind::LiteralChoice(trie) => FirstChars::Set(trie.first_chars().collect()),
        TokenKind::Keyword { text, .. } => match text.chars().next() {
            Some(c) => FirstChars::single(c),
            None => FirstChars::Any,
        },
        TokenKind::Number(flags, _) => FirstChars::Set(number_first_chars(*flags)),
        TokenKind::Newline => FirstChars::Set(['\r', '\n'].into_iter().collect()),
        TokenKind::Fail => FirstChars::empty(),
        // Open-ended or position-dependent leaves restrict nothing.
        TokenKind::Regex(_)
        | TokenKind::Identifier
        | TokenKind::Whitespaces
        | TokenKind::Empty
        | TokenKind::Eof
        | TokenKind::Barrier(_)
        | TokenKind::EscapedTextPrefix { .. }
        | TokenKind::EscapedTextDoubleChars { .. }
        | TokenKind::TextUntil { .. }
        | TokenKind::OneOrMoreChars(_)
        | TokenKind::ZeroOrMoreChars(_)
        | TokenKind::SkipWhitespaces(_)
        | TokenKind::Lookahead { .. }
        | TokenKind::Custom(_) => FirstChars::Any,
        TokenKind::Sequence { children, .. } => prefix_union(children, firsts, nullable),
        TokenKind::Choice { children, .. } => union_of(children, firsts),
        TokenKind::Repeat { child, min, .. } | TokenKind::SeparatedRepeat { child, min, .. } => {
            if *min == 0 {
                FirstChars::Any
            } else {
                of(child)
            }
        }
        TokenKind::Optional { .. } => FirstChars::Any,
        TokenKind::Between { open, inner, close } => {
            prefix_union(&[*open, *inner, *close], firsts, nullable)
        }
        TokenKind::First { first, second } | TokenKind::Second { first, second } => {
            prefix_union(&[*first, *second], firsts, nullable)
        }
        TokenKind::Map { child, .. }
        | TokenKind::MapSpan { child, .. }
        | TokenKind::Return { child, .. }
        | TokenKind::CaptureText { child, .. }
        | TokenKind::FailIf { child, .. } => of(child),
        TokenKind::If {
            then_token,
            else_token,
            ..
        } => {
            let mut set = of(then_token);
            if let Some(else_token) = else_token {
                set.merge(&firsts[*else_token as usize]);
            }
            set
        }
        TokenKind::Switch {
            branches, default, ..
        } => {
            let mut set = union_of(branches, firsts);
            if let Some(default) = default {
                set.merge(&firsts[*default as usize]);
            }
            set
        }
    }
}

fn rule_first(
    kind: &RuleKind,
    rule_firsts: &[FirstChars],
    token_firsts: &[FirstChars],
    nullable: &[bool],
) -> FirstChars {
    let of = |id: &u32| rule_firsts[*id as usize].clone();
    match kind {
        RuleKind::Token(token) => token_firsts[*token as usize].clone(),
        RuleKind::Sequence(children) => prefix_union(children, rule_firsts, nullable),
        RuleKind::Choice { children, .. } => union_of(children, rule_firsts),
        // Nullable wrappers may begin with anything that follows them.
        RuleKind::Optional(_) | RuleKind::Lookahead { .. } => FirstChars::Any,
        RuleKind::Repeat { child, min, .. } | RuleKind::SeparatedRepeat { child, min, .. } => {
            if *min == 0 {
                FirstChars::Any
            } else {
                of(child)
            }
        }
        RuleKind::If {
            then_rule,
            else_rule,
            ..
        } => {
            let mut set = of(then_rule);
            if let Some(else_rule) = else_rule {
                set.merge(&rule_firsts[*else_rule as usize]);
            }
            set
        }
        RuleKind::Switch {
            branches, default, ..
        } => {
            let mut set = union_of(branches, rule_firsts);
            if let Some(default) = default {
                set.merge(&rule_firsts[*default as usize]);
            }
            set
        }
        RuleKind::Custom { .. } => FirstChars::Any,
    }
}

/// Union over the nullable prefix of a sequence: the first child always
/// contributes; each further child contributes while everything before it
/// may be empty. An all-nullable sequence restricts nothing.
fn prefix_union(children: &[u32], firsts: &[FirstChars], nullable: &[bool]) -> FirstChars {
    let mut set = FirstChars::empty();
    for &child in children {
        set.merge(&firsts[child as usize]);
        if !nullable[child as usize] {
            return set;
        }
    }
    FirstChars::Any
}

fn union_of(children: &[u32], firsts: &[FirstChars]) -> FirstChars {
    let mut set = FirstChars::empty();
    for &child in children {
        set.merge(&firsts[child as usize]);
    }
    set
}

fn number_first_chars(flags: NumberFlags) -> CharSet {
    let mut set: CharSet = ('0'..='9').collect();
    if flags.signed {
        set.insert('-');
        set.insert('+');
    }
    set
}
