//! Build-time validation: nullability analysis and rejection of trivially
//! left-recursive rules.

use crate::grammar::{Rule, RuleId, RuleKind, TokenKind, TokenPattern};
use crate::Error;

/// Reject rules that can re-enter themselves without consuming input.
///
/// A rule is trivially left-recursive when a path from it back to itself
/// passes only through positions reachable after a nullable prefix (e.g.
/// as the first child of a sequence whose earlier children all match the
/// empty string).
pub(super) fn reject_left_recursion(rules: &[Rule], tokens: &[TokenPattern]) -> Result<(), Error> {
    let token_nullable = token_nullability(tokens);
    let rule_nullable = rule_nullability(rules, &token_nullable);

    // Edges to children reachable at the rule's own start position.
    let left_edges: Vec<Vec<RuleId>> = rules
        .iter()
        .map(|rule| left_children(&rule.kind, &rule_nullable))
        .collect();

    // Depth-first cycle search with an explicit color per node.
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }
    let mut colors = vec![Color::White; rules.len()];
    let mut path: Vec<RuleId> = Vec::new();

    fn visit(
        id: RuleId,
        edges: &[Vec<RuleId>],
        colors: &mut [Color],
        path: &mut Vec<RuleId>,
        rules: &[Rule],
    ) -> Result<(), Error> {
        match colors[id as usize] {
            Color::Black => return Ok(()),
            Color::Gray => {
                let start = path.iter().position(|&p| p == id).unwrap_or(0);
                let mut names: Vec<String> = path[start..]
                    .iter()
                    .map(|&p| rule_label(&rules[p as usize]))
                    .collect();
                names.push(rule_label(&rules[id as usize]));
                return Err(Error::LeftRecursion(names.join(" -> ")));
            }
            Color::White => {}
        }
        colors[id as usize] = Color::Gray;
        path.push(id);
        for &child in &edges[id as usize] {
            visit(child, edges, colors, path, rules)?;
        }
        path.pop();
        colors[id as usize] = Color::Black;
        Ok(())
    }

    for rule in rules {
        visit(rule.id, &left_edges, &mut colors, &mut path, rules)?;
    }
    Ok(())
}

fn rule_label(rule: &Rule) -> String {
    rule.aliases
        .first()
        .cloned()
        .unwrap_or_else(|| format!("rule #{}", rule.id))
}

/// Children a rule may try at its own start position.
fn left_children(kind: &RuleKind, nullable: &[bool]) -> Vec<RuleId> {
    match kind {
        RuleKind::Token(_) => Vec::new(),
        RuleKind::Sequence(children) | RuleKind::Custom { children, .. } => {
            let mut edges = Vec::new();
            for &child in children {
                edges.push(child);
                if !nullable[child as usize] {
                    break;
                }
            }
            edges
        }
        RuleKind::Choice { children, .. } => children.clone(),
        RuleKind::Optional(child) | RuleKind::Lookahead { child, .. } => vec![*child],
        RuleKind::Repeat { child, .. } => vec![*child],
        RuleKind::SeparatedRepeat {
            child, separator, ..
        } => {
            let mut edges = vec![*child];
            if nullable[*child as usize] {
                edges.push(*separator);
            }
            edges
        }
        RuleKind::If {
            then_rule,
            else_rule,
            ..
        } => {
            let mut edges = vec![*then_rule];
            edges.extend(else_rule.iter().copied());
            edges
        }
        RuleKind::Switch {
            branches, default, ..
        } => {
            let mut edges = branches.clone();
            edges.extend(default.iter().copied());
            edges
        }
    }
}

/// Fixpoint: can each token match the empty string?
pub(super) fn token_nullability(tokens: &[TokenPattern]) -> Vec<bool> {
    let mut nullable = vec![false; tokens.len()];
    loop {
        let mut changed = false;
        for token in tokens {
            if nullable[token.id as usize] {
                continue;
            }
            if token_is_nullable(&token.kind, &nullable) {
                nullable[token.id as usize] = true;
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn token_is_nullable(kind: &TokenKind, nullable: &[bool]) -> bool {
    let n = |id: &u32| nullable[*id as usize];
    match kind {
        TokenKind::Empty | TokenKind::Eof | TokenKind::Lookahead { .. } => true,
        TokenKind::ZeroOrMoreChars(_) => true,
        TokenKind::EscapedTextPrefix { .. } | TokenKind::EscapedTextDoubleChars { .. } => true,
        TokenKind::TextUntil { allow_empty, .. } => *allow_empty,
        // Unknown matchers are conservatively treated as possibly empty.
        TokenKind::Custom(_) => true,
        // An empty-matching pattern makes the token nullable.
        TokenKind::Regex(re) => re.match_len("") == Some(0),
        TokenKind::Literal(_)
        | TokenKind::LiteralChar(_)
        | TokenKind::LiteralChoice(_)
        | TokenKind::Keyword { .. }
        | TokenKind::Identifier
        | TokenKind::Number(..)
        | TokenKind::Whitespaces
        | TokenKind::Newline
        | TokenKind::Fail
        | TokenKind::Barrier(_)
        | TokenKind::OneOrMoreChars(_) => false,
        TokenKind::Sequence { children, .. } => children.iter().all(n),
        TokenKind::Choice { children, .. } => children.iter().any(n),
        TokenKind::Repeat { child, min, .. } => *min == 0 || n(child),
        TokenKind::SeparatedRepeat { child, min, .. } => *min == 0 || n(child),
        TokenKind::Optional { .. } => true,
        TokenKind::Between { open, inner, close } => n(open) && n(inner) && n(close),
        TokenKind::First { first, second } | TokenKind::Second { first, second } => {
            n(first) && n(second)
        }
        TokenKind::Map { child, .. }
        | TokenKind::MapSpan { child, .. }
        | TokenKind::Return { child, .. }
        | TokenKind::CaptureText { child, .. }
        | TokenKind::FailIf { child, .. } => n(child),
        TokenKind::SkipWhitespaces(child) => n(child),
        TokenKind::If {
            then_token,
            else_token,
            ..
        } => n(then_token) || else_token.as_ref().is_some_and(|t| n(t)),
        TokenKind::Switch {
            branches, default, ..
        } => branches.iter().any(n) || default.as_ref().is_some_and(|t| n(t)),
    }
}

/// Fixpoint: can each rule match the empty string?
pub(super) fn rule_nullability(rules: &[Rule], token_nullable: &[bool]) -> Vec<bool> {
    let mut nullable = vec![false; rules.len()];
    loop {
        let mut changed = false;
        for rule in rules {
            if nullable[rule.id as usize] {
                continue;
            }
            if rule_is_nullable(&rule.kind, &nullable, token_nullable) {
                nullable[rule.id as usize] = true;
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn rule_is_nullable(kind: &RuleKind, nullable: &[bool], token_nullable: &[bool]) -> bool {
    let n = |id: &u32| nullable[*id as usize];
    match kind {
        RuleKind::Token(token) => token_nullable[*token as usize],
        RuleKind::Sequence(children) => children.iter().all(n),
        RuleKind::Choice { children, .. } => children.iter().any(n),
        RuleKind::Optional(_) | RuleKind::Lookahead { .. } => true,
        RuleKind::Repeat { child, min, .. } => *min == 0 || n(child),
        RuleKind::SeparatedRepeat { child, min, .. } => *min == 0 || n(child),
        RuleKind::If {
            then_rule,
            else_rule,
            ..
        } => n(then_rule) || else_rule.as_ref().is_some_and(|r| n(r)),
        RuleKind::Switch {
            branches, default, ..
        } => branches.iter().any(n) || default.as_ref().is_some_and(|r| n(r)),
        // A custom body decides its own length; assume it may be empty.
        RuleKind::Custom { .. } => true,
    }
}
