//! Name resolution, traversal, and structural dedup into flat records.
//!
//! Canonical ids are content-addressed: a candidate record equal in kind,
//! settings, recovery, and factory identity to an existing one collapses
//! onto it, appending its names to the alias list. Forward references
//! (recursive rules) reserve a slot first and fill it when their body
//! finishes lowering.

use indexmap::{IndexMap, IndexSet};

use crate::grammar::{
    CompiledRegex, FirstChars, LiteralTrie, Parser, Recovery, Rule, RuleId, RuleKind, RuleSettings,
    TokenId, TokenKind, TokenPattern, ValueFactory,
};
use crate::Error;

use super::expr::{RuleExpr, TokenExpr};
use super::{first_sets, inline, validate, GrammarBuilder, RecoveryExpr, RuleDef, TokenDef};

/// Where a name in the rule namespace ultimately lands.
#[derive(Debug, Clone)]
enum RuleTarget {
    Rule(String),
    Token(String),
}

pub(super) fn build(builder: GrammarBuilder) -> Result<Parser, Error> {
    let (rule_defs, mut token_defs, tokenizers, main, skip, use_inlining, mut options) =
        builder.parts();

    // Every alias a tokenizer declares is installed as a Barrier leaf.
    let mut declared_aliases = IndexSet::new();
    for tokenizer in &tokenizers {
        for alias in tokenizer.aliases() {
            if !token_defs.contains_key(&alias) {
                token_defs.insert(
                    alias.clone(),
                    TokenDef {
                        expr: TokenExpr::Barrier(alias.clone()),
                        settings: RuleSettings::default(),
                        factory: None,
                    },
                );
            }
            declared_aliases.insert(alias);
        }
    }

    let mut cx = BuildCx {
        rule_canon: resolve_rule_aliases(&rule_defs, &token_defs)?,
        token_canon: resolve_token_aliases(&token_defs)?,
        rule_defs,
        token_defs,
        declared_aliases,
        rules: Vec::new(),
        tokens: Vec::new(),
        rule_ids: IndexMap::new(),
        token_ids: IndexMap::new(),
        rules_in_progress: IndexSet::new(),
        tokens_in_progress: IndexSet::new(),
    };

    // Intern every named root in declaration order: tokens, then rules.
    let token_names: Vec<String> = cx.token_defs.keys().cloned().collect();
    for name in token_names {
        cx.resolve_token_name(&name)?;
    }
    let rule_names: Vec<String> = cx.rule_defs.keys().cloned().collect();
    for name in rule_names {
        cx.resolve_rule_ref(&name)?;
    }

    // The global skip rule and the main rule are roots too.
    if let Some((skip_expr, strategy)) = skip {
        let skip_id = cx.intern_rule_child(&skip_expr)?;
        options.defaults.skip_rule = Some(skip_id);
        options.defaults.skip_strategy = strategy;
    }
    let main_rule = match &main {
        Some(name) => Some(cx.resolve_rule_ref(name)?),
        None => None,
    };

    let mut rules: Vec<Rule> = cx
        .rules
        .into_iter()
        .map(|slot| slot.expect("all reserved slots are filled"))
        .collect();
    let mut tokens = std::mem::take(&mut cx.tokens);

    // Alias lists follow the declaration order of the names that reached
    // each canonical element.
    let rule_order: IndexMap<&String, usize> =
        cx.rule_defs.keys().enumerate().map(|(i, k)| (k, i)).collect();
    for rule in &mut rules {
        rule.aliases
            .sort_by_key(|a| rule_order.get(a).copied().unwrap_or(usize::MAX));
    }
    let token_order: IndexMap<&String, usize> = cx
        .token_defs
        .keys()
        .enumerate()
        .map(|(i, k)| (k, i))
        .collect();
    for token in &mut tokens {
        token
            .aliases
            .sort_by_key(|a| token_order.get(a).copied().unwrap_or(usize::MAX));
    }

    validate::reject_left_recursion(&rules, &tokens)?;
    first_sets::compute(&mut rules, &mut tokens);

    let mut rule_names_map: IndexMap<String, RuleId> = IndexMap::new();
    for (name, target) in &cx.rule_canon {
        let id = match target {
            RuleTarget::Rule(canon) => cx.rule_ids[canon],
            RuleTarget::Token(tname) => {
                let tid = cx.token_ids[tname];
                // A rule-namespace name landing on a token needs a wrapper
                // rule to be addressable as a parse entry point.
                find_or_push_token_rule(&mut rules, &tokens, tid)
            }
        };
        rule_names_map.insert(name.clone(), id);
    }
    let mut token_names_map: IndexMap<String, TokenId> = IndexMap::new();
    for (name, canon) in &cx.token_canon {
        token_names_map.insert(name.clone(), cx.token_ids[canon]);
    }

    let mut parser = Parser {
        rules,
        tokens,
        tokenizers,
        rule_names: rule_names_map,
        token_names: token_names_map,
        main_rule,
        options,
    };

    if use_inlining {
        inline::inline_single_children(&mut parser);
    }

    Ok(parser)
}

/// Follow pure-reference definitions to their targets, recording every
/// intermediate name as an alias. Cycles are build errors naming the path.
fn resolve_rule_aliases(
    rule_defs: &IndexMap<String, RuleDef>,
    token_defs: &IndexMap<String, TokenDef>,
) -> Result<IndexMap<String, RuleTarget>, Error> {
    let mut canon = IndexMap::new();
    for name in rule_defs.keys() {
        let mut path = vec![name.clone()];
        let mut current = name.clone();
        loop {
            let def = &rule_defs[&current];
            let RuleExpr::Ref(next) = &def.expr else {
                canon.insert(name.clone(), RuleTarget::Rule(current));
                break;
            };
            // A reference with attachments is a real wrapper, not an alias.
            if def.settings != RuleSettings::default()
                || def.recovery.is_some()
                || def.factory.is_some()
            {
                canon.insert(name.clone(), RuleTarget::Rule(current));
                break;
            }
            if path.contains(next) {
                path.push(next.clone());
                return Err(Error::NameCycle(path.join(" -> ")));
            }
            if rule_defs.contains_key(next) {
                path.push(next.clone());
                current = next.clone();
            } else if token_defs.contains_key(next) {
                canon.insert(name.clone(), RuleTarget::Token(next.clone()));
                break;
            } else {
                return Err(Error::UnknownReference(next.clone()));
            }
        }
    }
    Ok(canon)
}

fn resolve_token_aliases(
    token_defs: &IndexMap<String, TokenDef>,
) -> Result<IndexMap<String, String>, Error> {
    let mut canon = IndexMap::new();
    for name in token_defs.keys() {
        let mut path = vec![name.clone()];
        let mut current = name.clone();
        loop {
            let def = &token_defs[&current];
            let TokenExpr::Ref(next) = &def.expr else {
                canon.insert(name.clone(), current);
                break;
            };
            if def.settings != RuleSettings::default() || def.factory.is_some() {
                canon.insert(name.clone(), current);
                break;
            }
            if path.contains(next) {
                path.push(next.clone());
                return Err(Error::NameCycle(path.join(" -> ")));
            }
            if !token_defs.contains_key(next) {
                return Err(Error::UnknownReference(next.clone()));
            }
            path.push(next.clone());
            current = next.clone();
        }
    }
    Ok(canon)
}

struct BuildCx {
    rule_defs: IndexMap<String, RuleDef>,
    token_defs: IndexMap<String, TokenDef>,
    rule_canon: IndexMap<String, RuleTarget>,
    token_canon: IndexMap<String, String>,
    declared_aliases: IndexSet<String>,
    rules: Vec<Option<Rule>>,
    tokens: Vec<TokenPattern>,
    rule_ids: IndexMap<String, RuleId>,
    token_ids: IndexMap<String, TokenId>,
    rules_in_progress: IndexSet<String>,
    tokens_in_progress: IndexSet<String>,
}

impl BuildCx {
    // -- tokens -----------------------------------------------------------

    fn resolve_token_name(&mut self, name: &str) -> Result<TokenId, Error> {
        let canon = self
            .token_canon
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownReference(name.to_string()))?;
        if let Some(&id) = self.token_ids.get(&canon) {
            self.push_token_alias(id, name);
            return Ok(id);
        }
        if self.tokens_in_progress.contains(&canon) {
            let mut path: Vec<&str> = self.tokens_in_progress.iter().map(String::as_str).collect();
            path.push(&canon);
            return Err(Error::NameCycle(path.join(" -> ")));
        }
        self.tokens_in_progress.insert(canon.clone());
        let def = self.token_defs[&canon].clone();
        let kind = self.lower_token(&def.expr)?;
        self.tokens_in_progress.swap_remove(&canon);

        let id = self.add_token(kind, def.factory, def.settings, Some(&canon));
        self.token_ids.insert(canon.clone(), id);
        if name != canon {
            self.push_token_alias(id, name);
        }
        Ok(id)
    }

    fn intern_token_child(&mut self, expr: &TokenExpr) -> Result<TokenId, Error> {
        match expr {
            TokenExpr::Ref(name) => self.resolve_token_name(name),
            _ => {
                let kind = self.lower_token(expr)?;
                Ok(self.add_token(kind, None, RuleSettings::default(), None))
            }
        }
    }

    fn add_token(
        &mut self,
        kind: TokenKind,
        factory: Option<ValueFactory>,
        settings: RuleSettings,
        name: Option<&str>,
    ) -> TokenId {
        let factory_identity = factory.as_ref().map(ValueFactory::identity);
        for token in &mut self.tokens {
            if token.kind == kind
                && token.default_settings == settings
                && token.default_factory.as_ref().map(ValueFactory::identity) == factory_identity
            {
                if let Some(name) = name
                    && !token.aliases.iter().any(|a| a == name)
                {
                    token.aliases.push(name.to_string());
                }
                return token.id;
            }
        }
        let id = self.tokens.len() as TokenId;
        self.tokens.push(TokenPattern {
            id,
            kind,
            aliases: name.map(|n| vec![n.to_string()]).unwrap_or_default(),
            first_chars: FirstChars::Any,
            default_factory: factory,
            default_settings: settings,
        });
        id
    }

    fn push_token_alias(&mut self, id: TokenId, name: &str) {
        let token = &mut self.tokens[id as usize];
        if !token.aliases.iter().any(|a| a == name) {
            token.aliases.push(name.to_string());
        }
    }

    fn lower_token(&mut self, expr: &TokenExpr) -> Result<TokenKind, Error> {
        Ok(match expr {
            TokenExpr::Ref(name) => {
                let id = self.resolve_token_name(name)?;
                // A bare reference with attachments wraps its target.
                TokenKind::Sequence {
                    children: vec![id],
                    passage: None,
                }
            }
            TokenExpr::Literal(text) => {
                if text.is_empty() {
                    return Err(Error::EmptyElement("literal".to_string()));
                }
                TokenKind::Literal(text.clone())
            }
            TokenExpr::LiteralChar(c) => TokenKind::LiteralChar(*c),
            TokenExpr::LiteralChoice {
                alternatives,
                case_insensitive,
            } => {
                if alternatives.is_empty() || alternatives.iter().any(String::is_empty) {
                    return Err(Error::EmptyElement("literal choice".to_string()));
                }
                TokenKind::LiteralChoice(LiteralTrie::new(alternatives, *case_insensitive))
            }
            TokenExpr::Keyword { text, terminator } => {
                if text.is_empty() {
                    return Err(Error::EmptyElement("keyword".to_string()));
                }
                TokenKind::Keyword {
                    text: text.clone(),
                    terminator: terminator.clone(),
                }
            }
            TokenExpr::Regex(pattern) => {
                let compiled = CompiledRegex::compile(pattern).map_err(|reason| {
                    Error::InvalidRegex {
                        pattern: pattern.clone(),
                        reason,
                    }
                })?;
                TokenKind::Regex(compiled)
            }
            TokenExpr::Identifier => TokenKind::Identifier,
            TokenExpr::Number(flags, numeric) => TokenKind::Number(*flags, *numeric),
            TokenExpr::Whitespaces => TokenKind::Whitespaces,
            TokenExpr::Newline => TokenKind::Newline,
            TokenExpr::Empty => TokenKind::Empty,
            TokenExpr::Fail => TokenKind::Fail,
            TokenExpr::Eof => TokenKind::Eof,
            TokenExpr::Barrier(alias) => {
                if !self.declared_aliases.contains(alias) {
                    return Err(Error::UnknownBarrierAlias(alias.clone()));
                }
                TokenKind::Barrier(alias.clone())
            }
            TokenExpr::EscapedTextPrefix { escape, stop } => TokenKind::EscapedTextPrefix {
                escape: *escape,
                stop: stop.clone(),
            },
            TokenExpr::EscapedTextDoubleChars { stop } => {
                TokenKind::EscapedTextDoubleChars { stop: *stop }
            }
            TokenExpr::TextUntil {
                stop,
                allow_empty,
                consume_stop,
                fail_on_eof,
            } => TokenKind::TextUntil {
                stop: self.intern_token_child(stop)?,
                allow_empty: *allow_empty,
                consume_stop: *consume_stop,
                fail_on_eof: *fail_on_eof,
            },
            TokenExpr::OneOrMoreChars(p) => TokenKind::OneOrMoreChars(p.clone()),
            TokenExpr::ZeroOrMoreChars(p) => TokenKind::ZeroOrMoreChars(p.clone()),
            TokenExpr::Sequence { children, passage } => {
                if children.is_empty() {
                    return Err(Error::EmptyElement("token sequence".to_string()));
                }
                let ids = children
                    .iter()
                    .map(|c| self.intern_token_child(c))
                    .collect::<Result<_, _>>()?;
                TokenKind::Sequence {
                    children: ids,
                    passage: passage.clone(),
                }
            }
            TokenExpr::Choice(mode, children) => {
                if children.is_empty() {
                    return Err(Error::EmptyElement("token choice".to_string()));
                }
                let ids = children
                    .iter()
                    .map(|c| self.intern_token_child(c))
                    .collect::<Result<_, _>>()?;
                TokenKind::Choice {
                    mode: *mode,
                    children: ids,
                }
            }
            TokenExpr::Repeat {
                child,
                min,
                max,
                passage,
            } => {
                check_range(*min, *max)?;
                TokenKind::Repeat {
                    child: self.intern_token_child(child)?,
                    min: *min,
                    max: *max,
                    passage: passage.clone(),
                }
            }
            TokenExpr::SeparatedRepeat {
                child,
                separator,
                min,
                max,
                allow_trailing,
                include_separators,
                passage,
            } => {
                check_range(*min, *max)?;
                TokenKind::SeparatedRepeat {
                    child: self.intern_token_child(child)?,
                    separator: self.intern_token_child(separator)?,
                    min: *min,
                    max: *max,
                    allow_trailing: *allow_trailing,
                    include_separators: *include_separators,
                    passage: passage.clone(),
                }
            }
            TokenExpr::Optional { child, fallback } => TokenKind::Optional {
                child: self.intern_token_child(child)?,
                fallback: fallback.clone(),
            },
            TokenExpr::Between { open, inner, close } => TokenKind::Between {
                open: self.intern_token_child(open)?,
                inner: self.intern_token_child(inner)?,
                close: self.intern_token_child(close)?,
            },
            TokenExpr::First { first, second } => TokenKind::First {
                first: self.intern_token_child(first)?,
                second: self.intern_token_child(second)?,
            },
            TokenExpr::Second { first, second } => TokenKind::Second {
                first: self.intern_token_child(first)?,
                second: self.intern_token_child(second)?,
            },
            TokenExpr::Map { child, mapper } => TokenKind::Map {
                child: self.intern_token_child(child)?,
                mapper: mapper.clone(),
            },
            TokenExpr::MapSpan { child, mapper } => TokenKind::MapSpan {
                child: self.intern_token_child(child)?,
                mapper: mapper.clone(),
            },
            TokenExpr::Return { child, value } => TokenKind::Return {
                child: self.intern_token_child(child)?,
                value: value.clone(),
            },
            TokenExpr::CaptureText {
                child,
                trim_start,
                trim_end,
            } => TokenKind::CaptureText {
                child: self.intern_token_child(child)?,
                trim_start: *trim_start,
                trim_end: *trim_end,
            },
            TokenExpr::SkipWhitespaces(child) => {
                TokenKind::SkipWhitespaces(self.intern_token_child(child)?)
            }
            TokenExpr::Lookahead { child, positive } => TokenKind::Lookahead {
                child: self.intern_token_child(child)?,
                positive: *positive,
            },
            TokenExpr::If {
                predicate,
                then_token,
                else_token,
            } => TokenKind::If {
                predicate: predicate.clone(),
                then_token: self.intern_token_child(then_token)?,
                else_token: match else_token {
                    Some(t) => Some(self.intern_token_child(t)?),
                    None => None,
                },
            },
            TokenExpr::Switch {
                selector,
                branches,
                default,
            } => TokenKind::Switch {
                selector: selector.clone(),
                branches: branches
                    .iter()
                    .map(|b| self.intern_token_child(b))
                    .collect::<Result<_, _>>()?,
                default: match default {
                    Some(d) => Some(self.intern_token_child(d)?),
                    None => None,
                },
            },
            TokenExpr::FailIf {
                child,
                predicate,
                message,
            } => TokenKind::FailIf {
                child: self.intern_token_child(child)?,
                predicate: predicate.clone(),
                message: message.clone(),
            },
            TokenExpr::Custom(func) => TokenKind::Custom(func.clone()),
        })
    }

    // -- rules ------------------------------------------------------------

    fn resolve_rule_ref(&mut self, name: &str) -> Result<RuleId, Error> {
        match self.rule_canon.get(name).cloned() {
            Some(RuleTarget::Rule(canon)) => self.resolve_rule_name(&canon, name),
            Some(RuleTarget::Token(tname)) => {
                let tid = self.resolve_token_name(&tname)?;
                Ok(self.token_rule(tid))
            }
            None => {
                if self.token_canon.contains_key(name) {
                    let tid = self.resolve_token_name(name)?;
                    Ok(self.token_rule(tid))
                } else {
                    Err(Error::UnknownReference(name.to_string()))
                }
            }
        }
    }

    fn resolve_rule_name(&mut self, canon: &str, requested: &str) -> Result<RuleId, Error> {
        if let Some(&id) = self.rule_ids.get(canon) {
            self.push_rule_alias(id, requested);
            return Ok(id);
        }
        if self.rules_in_progress.contains(canon) {
            // Forward reference into a rule currently lowering: reserve its
            // slot so the cycle breaks into an integer id.
            let id = self.rules.len() as RuleId;
            self.rules.push(None);
            self.rule_ids.insert(canon.to_string(), id);
            return Ok(id);
        }
        self.rules_in_progress.insert(canon.to_string());
        let def = self.rule_defs[canon].clone();
        let kind = self.lower_rule(&def.expr)?;
        let recovery = self.lower_recovery(def.recovery.as_ref())?;
        self.rules_in_progress.swap_remove(canon);

        // Token-wrapping rules with untouched settings inherit the token's
        // declared defaults.
        let settings = match (&kind, def.settings == RuleSettings::default()) {
            (RuleKind::Token(tid), true) => self.tokens[*tid as usize].default_settings.clone(),
            _ => def.settings,
        };

        if let Some(&reserved) = self.rule_ids.get(canon) {
            let mut aliases = vec![canon.to_string()];
            if requested != canon {
                aliases.push(requested.to_string());
            }
            self.rules[reserved as usize] = Some(Rule {
                id: reserved,
                kind,
                aliases,
                settings,
                recovery,
                factory: def.factory,
                first_chars: FirstChars::Any,
            });
            return Ok(reserved);
        }

        let id = self.add_rule(kind, settings, recovery, def.factory, Some(canon));
        self.rule_ids.insert(canon.to_string(), id);
        if requested != canon {
            self.push_rule_alias(id, requested);
        }
        Ok(id)
    }

    pub(super) fn intern_rule_child(&mut self, expr: &RuleExpr) -> Result<RuleId, Error> {
        match expr {
            RuleExpr::Ref(name) => self.resolve_rule_ref(name),
            RuleExpr::Token(texpr) => {
                let tid = self.intern_token_child(texpr)?;
                Ok(self.token_rule(tid))
            }
            _ => {
                let kind = self.lower_rule(expr)?;
                Ok(self.add_rule(kind, RuleSettings::default(), Recovery::None, None, None))
            }
        }
    }

    fn token_rule(&mut self, tid: TokenId) -> RuleId {
        let settings = self.tokens[tid as usize].default_settings.clone();
        self.add_rule(RuleKind::Token(tid), settings, Recovery::None, None, None)
    }

    fn add_rule(
        &mut self,
        kind: RuleKind,
        settings: RuleSettings,
        recovery: Recovery,
        factory: Option<ValueFactory>,
        name: Option<&str>,
    ) -> RuleId {
        let factory_identity = factory.as_ref().map(ValueFactory::identity);
        for slot in &mut self.rules {
            let Some(rule) = slot else { continue };
            if rule.kind == kind
                && rule.settings == settings
                && rule.recovery == recovery
                && rule.factory.as_ref().map(ValueFactory::identity) == factory_identity
            {
                if let Some(name) = name
                    && !rule.aliases.iter().any(|a| a == name)
                {
                    rule.aliases.push(name.to_string());
                }
                return rule.id;
            }
        }
        let id = self.rules.len() as RuleId;
        self.rules.push(Some(Rule {
            id,
            kind,
            aliases: name.map(|n| vec![n.to_string()]).unwrap_or_default(),
            settings,
            recovery,
            factory,
            first_chars: FirstChars::Any,
        }));
        id
    }

    fn push_rule_alias(&mut self, id: RuleId, name: &str) {
        if let Some(rule) = &mut self.rules[id as usize]
            && !rule.aliases.iter().any(|a| a == name)
        {
            rule.aliases.push(name.to_string());
        }
    }

    fn lower_rule(&mut self, expr: &RuleExpr) -> Result<RuleKind, Error> {
        Ok(match expr {
            RuleExpr::Ref(name) => {
                // A named body that is a bare reference but carries
                // attachments wraps the target.
                RuleKind::Sequence(vec![self.resolve_rule_ref(name)?])
            }
            RuleExpr::Token(texpr) => RuleKind::Token(self.intern_token_child(texpr)?),
            RuleExpr::Sequence(children) => {
                if children.is_empty() {
                    return Err(Error::EmptyElement("sequence".to_string()));
                }
                RuleKind::Sequence(
                    children
                        .iter()
                        .map(|c| self.intern_rule_child(c))
                        .collect::<Result<_, _>>()?,
                )
            }
            RuleExpr::Choice(mode, children) => {
                if children.is_empty() {
                    return Err(Error::EmptyElement("choice".to_string()));
                }
                RuleKind::Choice {
                    mode: *mode,
                    children: children
                        .iter()
                        .map(|c| self.intern_rule_child(c))
                        .collect::<Result<_, _>>()?,
                }
            }
            RuleExpr::Optional(child) => RuleKind::Optional(self.intern_rule_child(child)?),
            RuleExpr::Repeat { child, min, max } => {
                check_range(*min, *max)?;
                RuleKind::Repeat {
                    child: self.intern_rule_child(child)?,
                    min: *min,
                    max: *max,
                }
            }
            RuleExpr::SeparatedRepeat {
                child,
                separator,
                min,
                max,
                allow_trailing,
                include_separators,
            } => {
                check_range(*min, *max)?;
                RuleKind::SeparatedRepeat {
                    child: self.intern_rule_child(child)?,
                    separator: self.intern_rule_child(separator)?,
                    min: *min,
                    max: *max,
                    allow_trailing: *allow_trailing,
                    include_separators: *include_separators,
                }
            }
            RuleExpr::Lookahead { child, positive } => RuleKind::Lookahead {
                child: self.intern_rule_child(child)?,
                positive: *positive,
            },
            RuleExpr::If {
                predicate,
                then_expr,
                else_expr,
            } => RuleKind::If {
                predicate: predicate.clone(),
                then_rule: self.intern_rule_child(then_expr)?,
                else_rule: match else_expr {
                    Some(e) => Some(self.intern_rule_child(e)?),
                    None => None,
                },
            },
            RuleExpr::Switch {
                selector,
                branches,
                default,
            } => RuleKind::Switch {
                selector: selector.clone(),
                branches: branches
                    .iter()
                    .map(|b| self.intern_rule_child(b))
                    .collect::<Result<_, _>>()?,
                default: match default {
                    Some(d) => Some(self.intern_rule_child(d)?),
                    None => None,
                },
            },
            RuleExpr::Custom { func, children } => RuleKind::Custom {
                func: func.clone(),
                children: children
                    .iter()
                    .map(|c| self.intern_rule_child(c))
                    .collect::<Result<_, _>>()?,
            },
        })
    }

    fn lower_recovery(&mut self, recovery: Option<&RecoveryExpr>) -> Result<Recovery, Error> {
        let Some(recovery) = recovery else {
            return Ok(Recovery::None);
        };
        Ok(match recovery {
            RecoveryExpr::FindNext { stop } => Recovery::FindNext {
                stop: self.intern_optional(stop.as_deref())?,
            },
            RecoveryExpr::SkipUntilAnchor {
                anchor,
                stop,
                repeat,
            } => Recovery::SkipUntilAnchor {
                anchor: self.intern_rule_child(anchor)?,
                stop: self.intern_optional(stop.as_deref())?,
                repeat: *repeat,
            },
            RecoveryExpr::SkipAfterAnchor {
                anchor,
                stop,
                repeat,
            } => Recovery::SkipAfterAnchor {
                anchor: self.intern_rule_child(anchor)?,
                stop: self.intern_optional(stop.as_deref())?,
                repeat: *repeat,
            },
        })
    }

    fn intern_optional(&mut self, expr: Option<&RuleExpr>) -> Result<Option<RuleId>, Error> {
        match expr {
            Some(expr) => Ok(Some(self.intern_rule_child(expr)?)),
            None => Ok(None),
        }
    }
}

fn check_range(min: u32, max: Option<u32>) -> Result<(), Error> {
    if let Some(max) = max
        && max < min
    {
        return Err(Error::InvalidRange { min, max });
    }
    Ok(())
}

fn find_or_push_token_rule(rules: &mut Vec<Rule>, tokens: &[TokenPattern], tid: TokenId) -> RuleId {
    if let Some(rule) = rules
        .iter()
        .find(|r| matches!(r.kind, RuleKind::Token(t) if t == tid))
    {
        return rule.id;
    }
    let id = rules.len() as RuleId;
    rules.push(Rule {
        id,
        kind: RuleKind::Token(tid),
        aliases: Vec::new(),
        settings: tokens[tid as usize].default_settings.clone(),
        recovery: Recovery::None,
        factory: None,
        first_chars: tokens[tid as usize].first_chars.clone(),
    });
    id
}
