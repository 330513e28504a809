//! Inlining pass: collapse single-child pass-through rules into their
//! referents and compact the rule table.

use crate::grammar::{Parser, Recovery, RuleId, RuleKind, RuleSettings};

pub(super) fn inline_single_children(parser: &mut Parser) {
    let len = parser.rules.len();
    let mut redirect: Vec<RuleId> = (0..len as RuleId).collect();

    for rule in &parser.rules {
        let target = match &rule.kind {
            RuleKind::Sequence(children) if children.len() == 1 => Some(children[0]),
            RuleKind::Choice { children, .. } if children.len() == 1 => Some(children[0]),
            _ => None,
        };
        if let Some(target) = target
            && rule.settings == RuleSettings::default()
            && rule.factory.is_none()
            && rule.recovery == Recovery::None
        {
            redirect[rule.id as usize] = target;
        }
    }

    // Chase chains; a cycle would mean a rule wrapping itself, which the
    // recursion check has already rejected, but stay bounded anyway.
    let resolve = |redirect: &[RuleId], mut id: RuleId| {
        for _ in 0..redirect.len() {
            let next = redirect[id as usize];
            if next == id {
                break;
            }
            id = next;
        }
        id
    };
    let final_redirect: Vec<RuleId> = (0..len as RuleId)
        .map(|id| resolve(&redirect, id))
        .collect();

    if final_redirect.iter().enumerate().all(|(i, &t)| i as RuleId == t) {
        return;
    }

    // Merge the aliases of inlined wrappers into their targets.
    for id in 0..len {
        let target = final_redirect[id] as usize;
        if target == id {
            continue;
        }
        let aliases = std::mem::take(&mut parser.rules[id].aliases);
        for alias in aliases {
            if !parser.rules[target].aliases.contains(&alias) {
                parser.rules[target].aliases.push(alias);
            }
        }
    }

    // Dense re-numbering of the surviving rules.
    let mut new_ids = vec![RuleId::MAX; len];
    let mut next = 0 as RuleId;
    for id in 0..len {
        if final_redirect[id] as usize == id {
            new_ids[id] = next;
            next += 1;
        }
    }
    let map = |id: RuleId| new_ids[final_redirect[id as usize] as usize];

    let mut survivors = Vec::with_capacity(next as usize);
    for (id, mut rule) in std::mem::take(&mut parser.rules).into_iter().enumerate() {
        if final_redirect[id] as usize != id {
            continue;
        }
        rule.id = new_ids[id];
        remap_kind(&mut rule.kind, map);
        remap_recovery(&mut rule.recovery, map);
        if let Some(skip) = &mut rule.settings.skip_rule.value {
            *skip = skip.map(map);
        }
        survivors.push(rule);
    }
    parser.rules = survivors;

    if let Some(skip) = &mut parser.options.defaults.skip_rule {
        *skip = map(*skip);
    }
    if let Some(main) = &mut parser.main_rule {
        *main = map(*main);
    }
    for id in parser.rule_names.values_mut() {
        *id = map(*id);
    }
}

fn remap_kind(kind: &mut RuleKind, map: impl Fn(RuleId) -> RuleId) {
    match kind {
        RuleKind::Token(_) => {}
        RuleKind::Sequence(children) | RuleKind::Custom { children, .. } => {
            for child in children {
                *child = map(*child);
            }
        }
        RuleKind::Choice { children, .. } => {
            for child in children {
                *child = map(*child);
            }
        }
        RuleKind::Optional(child)
        | RuleKind::Repeat { child, .. }
        | RuleKind::Lookahead { child, .. } => *child = map(*child),
        RuleKind::SeparatedRepeat {
            child, separator, ..
        } => {
            *child = map(*child);
            *separator = map(*separator);
        }
        RuleKind::If {
            then_rule,
            else_rule,
            ..
        } => {
            *then_rule = map(*then_rule);
            if let Some(else_rule) = else_rule {
                *else_rule = map(*else_rule);
            }
        }
        RuleKind::Switch {
            branches, default, ..
        } => {
            for branch in branches {
                *branch = map(*branch);
            }
            if let Some(default) = default {
                *default = map(*default);
            }
        }
    }
}

fn remap_recovery(recovery: &mut Recovery, map: impl Fn(RuleId) -> RuleId) {
    match recovery {
        Recovery::None => {}
        Recovery::FindNext { stop } => {
            if let Some(stop) = stop {
                *stop = map(*stop);
            }
        }
        Recovery::SkipUntilAnchor { anchor, stop, .. }
        | Recovery::SkipAfterAnchor { anchor, stop, .. } => {
            *anchor = map(*anchor);
            if let Some(stop) = stop {
                *stop = map(*stop);
            }
        }
    }
}
