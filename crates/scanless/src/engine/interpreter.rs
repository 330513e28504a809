//! The core rule interpreter: a single dispatch loop over `RuleKind`,
//! threading one mutable context.
//!
//! Failure is a result variant. `Fail::Mismatch` restores the cursor to the
//! caller's position; `Fail::Fatal` aborts the parse.

use crate::ast::ParsedRule;
use crate::errors::ElementRef;
use crate::grammar::{
    ChoiceMode, CustomArgs, ErrorHandling, ResolvedSettings, Rule, RuleId, RuleKind, SkipStrategy,
};
use crate::Error;

use super::context::{Context, Fail, ParseOutcome};
use super::trace::WalkStep;

impl<'p, 'i> Context<'p, 'i> {
    pub(crate) fn parse_rule(
        &mut self,
        id: RuleId,
        inherited: ResolvedSettings,
    ) -> ParseOutcome<ParsedRule> {
        self.consume_fuel()?;
        if self.depth >= self.parser.options().recursion_limit {
            return Err(Fail::Fatal(Error::RecursionLimitExceeded));
        }

        let rule = self.parser.rule(id);
        let (own, child_inherited) = rule
            .settings
            .resolve(&inherited, &self.parser.options().defaults);
        let fingerprint = own.fingerprint();

        if let Some(memo) = &self.memo
            && let Some((node, end_pos, end_barriers)) =
                memo.get(id, self.pos, self.passed_barriers, fingerprint)
        {
            self.pos = end_pos;
            self.passed_barriers = end_barriers;
            return Ok(node);
        }

        let entry = self.checkpoint();
        self.trace_step(WalkStep::Enter, entry.0, id);
        let frame = self.sink.enter_frame(id);
        self.depth += 1;

        let result = match self.parse_with_skip(rule, &own, child_inherited) {
            Ok(node) => Ok(node),
            Err(Fail::Fatal(e)) => Err(Fail::Fatal(e)),
            Err(Fail::Mismatch) => {
                // The cursor sits at the failed attempt position (post-skip).
                let outcome = self
                    .record_failure(rule, &own)
                    .and_then(|_| self.try_recover(rule, &own, inherited));
                if outcome.is_err() {
                    self.restore(entry);
                }
                outcome
            }
        };

        self.depth -= 1;
        self.sink.restore_frame(frame);

        match &result {
            Ok(node) => {
                self.trace_step(WalkStep::Success, node.start, id);
                if !node.recovered {
                    let (end_pos, end_barriers) = self.checkpoint();
                    if let Some(memo) = &mut self.memo {
                        memo.insert(
                            id,
                            entry.0,
                            entry.1,
                            fingerprint,
                            node.clone(),
                            end_pos,
                            end_barriers,
                        );
                    }
                }
            }
            Err(_) => self.trace_step(WalkStep::Fail, entry.0, id),
        }
        result
    }

    fn try_recover(
        &mut self,
        rule: &'p Rule,
        own: &ResolvedSettings,
        inherited: ResolvedSettings,
    ) -> ParseOutcome<ParsedRule> {
        if rule.recovery.is_none()
            || own.error_handling != ErrorHandling::Record
            || self.speculating()
        {
            return Err(Fail::Mismatch);
        }
        self.recover(rule, own, inherited)
    }

    /// Record a rule failure per the effective error handling. `Throw`
    /// escalates to a fatal parse error.
    fn record_failure(&mut self, rule: &Rule, own: &ResolvedSettings) -> ParseOutcome<()> {
        let message = self.fail_message.take();
        let recordable = rule.is_token() || self.parser.options().detailed_errors;
        match own.error_handling {
            ErrorHandling::NoRecord => Ok(()),
            ErrorHandling::Record => {
                if recordable {
                    self.sink.record(self.pos, element_of(rule), message);
                }
                Ok(())
            }
            ErrorHandling::Throw => {
                if recordable {
                    self.sink.record(self.pos, element_of(rule), message);
                }
                Err(Fail::Fatal(super::fatal_failure(self)))
            }
        }
    }

    /// Apply the effective skip strategy around the rule body.
    fn parse_with_skip(
        &mut self,
        rule: &'p Rule,
        own: &ResolvedSettings,
        child_inherited: ResolvedSettings,
    ) -> ParseOutcome<ParsedRule> {
        use SkipStrategy::*;
        match own.skip_strategy {
            NoSkipping => self.parse_body(rule, own, child_inherited),
            SkipBeforeParsing => {
                self.skip_once(own)?;
                self.parse_body(rule, own, child_inherited)
            }
            SkipBeforeParsingGreedy => {
                self.skip_greedy(own)?;
                self.parse_body(rule, own, child_inherited)
            }
            SkipBeforeParsingLazy | TryParseThenSkipLazy => loop {
                match self.parse_body(rule, own, child_inherited) {
                    Err(Fail::Mismatch) => {
                        if !self.skip_once(own)? {
                            return Err(Fail::Mismatch);
                        }
                    }
                    other => return other,
                }
            },
            TryParseThenSkip => match self.parse_body(rule, own, child_inherited) {
                Err(Fail::Mismatch) => {
                    if self.skip_once(own)? {
                        self.parse_body(rule, own, child_inherited)
                    } else {
                        Err(Fail::Mismatch)
                    }
                }
                other => other,
            },
            TryParseThenSkipGreedy => match self.parse_body(rule, own, child_inherited) {
                Err(Fail::Mismatch) => {
                    if self.skip_greedy(own)? {
                        self.parse_body(rule, own, child_inherited)
                    } else {
                        Err(Fail::Mismatch)
                    }
                }
                other => other,
            },
        }
    }

    /// One application of the skip rule (or the inline whitespace fast
    /// path). Returns whether the cursor advanced.
    pub(super) fn skip_once(&mut self, own: &ResolvedSettings) -> ParseOutcome<bool> {
        if self.parser.options().optimized_whitespace_skip {
            let start = self.pos;
            while matches!(self.peek_char(true), Some(' ' | '\t' | '\r' | '\n')) {
                self.pos += 1;
            }
            return Ok(self.pos > start);
        }
        let Some(skip_rule) = own.skip_rule else {
            return Ok(false);
        };
        let start = self.pos;
        // The skip rule parses silently, unbounded by barriers and without
        // skipping of its own.
        let skip_settings = ResolvedSettings {
            skip_strategy: SkipStrategy::NoSkipping,
            skip_rule: None,
            error_handling: ErrorHandling::NoRecord,
            ignore_barriers: true,
        };
        self.begin_speculation();
        let result = self.parse_rule(skip_rule, skip_settings);
        self.end_speculation();
        match result {
            Ok(_) => Ok(self.pos > start),
            Err(Fail::Mismatch) => Ok(false),
            Err(fatal) => Err(fatal),
        }
    }

    pub(super) fn skip_greedy(&mut self, own: &ResolvedSettings) -> ParseOutcome<bool> {
        let start = self.pos;
        while self.skip_once(own)? {}
        Ok(self.pos > start)
    }

    fn parse_body(
        &mut self,
        rule: &'p Rule,
        own: &ResolvedSettings,
        child_inherited: ResolvedSettings,
    ) -> ParseOutcome<ParsedRule> {
        let start = self.checkpoint();
        match &rule.kind {
            RuleKind::Token(token) => {
                let value = self.match_token(*token, own.ignore_barriers, true)?;
                let mut node = self.new_node(rule.id, start);
                node.token = Some(*token);
                node.value = value;
                Ok(node)
            }

            RuleKind::Sequence(children) => {
                let mut nodes = Vec::with_capacity(children.len());
                for &child in children {
                    match self.parse_rule(child, child_inherited) {
                        Ok(node) => nodes.push(node),
                        Err(e) => {
                            self.restore(start);
                            return Err(e);
                        }
                    }
                }
                let mut node = self.new_node(rule.id, start);
                node.children = nodes;
                Ok(node)
            }

            RuleKind::Choice { mode, children } => {
                self.parse_choice(rule, *mode, children, own, child_inherited)
            }

            RuleKind::Optional(child) => match self.parse_rule(*child, child_inherited) {
                Ok(inner) => {
                    let mut node = self.new_node(rule.id, start);
                    node.children = vec![inner];
                    Ok(node)
                }
                Err(Fail::Fatal(e)) => Err(Fail::Fatal(e)),
                Err(Fail::Mismatch) => {
                    self.restore(start);
                    Ok(self.new_node(rule.id, start))
                }
            },

            RuleKind::Repeat { child, min, max } => {
                let mut nodes = Vec::new();
                loop {
                    if let Some(max) = max
                        && nodes.len() as u32 >= *max
                    {
                        break;
                    }
                    let before = self.checkpoint();
                    match self.parse_rule(*child, child_inherited) {
                        Ok(mut inner) => {
                            inner.occurrence = nodes.len() as u32;
                            let advanced = self.checkpoint() != before;
                            nodes.push(inner);
                            // A zero-width child would repeat forever.
                            if !advanced {
                                break;
                            }
                        }
                        Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                        Err(Fail::Mismatch) => break,
                    }
                }
                if (nodes.len() as u32) < *min {
                    self.restore(start);
                    return Err(Fail::Mismatch);
                }
                let mut node = self.new_node(rule.id, start);
                node.children = nodes;
                Ok(node)
            }

            RuleKind::SeparatedRepeat {
                child,
                separator,
                min,
                max,
                allow_trailing,
                include_separators,
            } => self.parse_separated(
                rule,
                *child,
                *separator,
                *min,
                *max,
                *allow_trailing,
                *include_separators,
                child_inherited,
            ),

            RuleKind::Lookahead { child, positive } => {
                self.begin_speculation();
                let result = self.parse_rule(*child, child_inherited);
                self.end_speculation();
                self.restore(start);
                match (result, positive) {
                    (Ok(_), true) | (Err(Fail::Mismatch), false) => {
                        Ok(self.new_node(rule.id, start))
                    }
                    (Err(Fail::Fatal(e)), _) => Err(Fail::Fatal(e)),
                    _ => Err(Fail::Mismatch),
                }
            }

            RuleKind::If {
                predicate,
                then_rule,
                else_rule,
            } => {
                let branch = if predicate.call(self.parameter.as_ref()) {
                    Some(*then_rule)
                } else {
                    *else_rule
                };
                self.parse_dispatched(rule, branch, start, child_inherited)
            }

            RuleKind::Switch {
                selector,
                branches,
                default,
            } => {
                let branch = selector
                    .call(self.parameter.as_ref())
                    .and_then(|i| branches.get(i).copied())
                    .or(*default);
                self.parse_dispatched(rule, branch, start, child_inherited)
            }

            RuleKind::Custom { func, children } => {
                let mut nodes = Vec::with_capacity(children.len());
                for &child in children {
                    match self.parse_rule(child, child_inherited) {
                        Ok(node) => nodes.push(node),
                        Err(e) => {
                            self.restore(start);
                            return Err(e);
                        }
                    }
                }
                let args = CustomArgs {
                    input: self.input,
                    start: start.0,
                    cursor: self.pos,
                    bound: self.bound(own.ignore_barriers),
                    parameter: self.parameter.as_ref(),
                    children: &nodes,
                };
                let Some(element) = func.call(&args) else {
                    self.restore(start);
                    return Err(Fail::Mismatch);
                };
                let end = element.start + element.length;
                if element.start < start.0
                    || end > self.input.len()
                    || !self.input.is_char_boundary(element.start)
                    || !self.input.is_char_boundary(end)
                {
                    self.restore(start);
                    return Err(Fail::Mismatch);
                }
                self.pos = end;
                let mut node = self.new_node(rule.id, start);
                node.start = element.start;
                node.length = element.length;
                node.value = element.value;
                node.children = nodes;
                Ok(node)
            }
        }
    }

    fn parse_dispatched(
        &mut self,
        rule: &Rule,
        branch: Option<RuleId>,
        start: (usize, usize),
        child_inherited: ResolvedSettings,
    ) -> ParseOutcome<ParsedRule> {
        let Some(branch) = branch else {
            return Err(Fail::Mismatch);
        };
        let inner = self.parse_rule(branch, child_inherited)?;
        let mut node = self.new_node(rule.id, start);
        node.children = vec![inner];
        Ok(node)
    }

    fn parse_choice(
        &mut self,
        rule: &Rule,
        mode: ChoiceMode,
        children: &[RuleId],
        own: &ResolvedSettings,
        child_inherited: ResolvedSettings,
    ) -> ParseOutcome<ParsedRule> {
        let start = self.checkpoint();
        match mode {
            ChoiceMode::First => {
                // First-set pruning is only sound when no skipping can move
                // the cursor before the child matches.
                let prune = self.parser.options().use_first_character_match
                    && own.skip_strategy == SkipStrategy::NoSkipping;
                let current = self.peek_char(own.ignore_barriers);
                for &child in children {
                    if prune
                        && let Some(c) = current
                        && !self.parser.rule(child).first_chars.allows(c)
                    {
                        continue;
                    }
                    match self.parse_rule(child, child_inherited) {
                        Ok(inner) => {
                            let mut node = self.new_node(rule.id, start);
                            node.children = vec![inner];
                            return Ok(node);
                        }
                        Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                        Err(Fail::Mismatch) => self.restore(start),
                    }
                }
                Err(Fail::Mismatch)
            }
            ChoiceMode::Shortest | ChoiceMode::Longest => {
                // Losing branches are speculative and record nothing.
                let mut best: Option<(ParsedRule, usize, usize)> = None;
                for &child in children {
                    self.begin_speculation();
                    let result = self.parse_rule(child, child_inherited);
                    self.end_speculation();
                    match result {
                        Ok(inner) => {
                            let (end_pos, end_barriers) = self.checkpoint();
                            let better = match (&best, mode) {
                                (None, _) => true,
                                (Some((b, ..)), ChoiceMode::Shortest) => inner.length < b.length,
                                (Some((b, ..)), _) => inner.length > b.length,
                            };
                            if better {
                                best = Some((inner, end_pos, end_barriers));
                            }
                            self.restore(start);
                        }
                        Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                        Err(Fail::Mismatch) => self.restore(start),
                    }
                }
                let Some((inner, end_pos, end_barriers)) = best else {
                    return Err(Fail::Mismatch);
                };
                self.pos = end_pos;
                self.passed_barriers = end_barriers;
                let mut node = self.new_node(rule.id, start);
                node.children = vec![inner];
                Ok(node)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_separated(
        &mut self,
        rule: &Rule,
        child: RuleId,
        separator: RuleId,
        min: u32,
        max: Option<u32>,
        allow_trailing: bool,
        include_separators: bool,
        child_inherited: ResolvedSettings,
    ) -> ParseOutcome<ParsedRule> {
        let start = self.checkpoint();
        let mut nodes: Vec<ParsedRule> = Vec::new();
        let mut count = 0u32;

        match self.parse_rule(child, child_inherited) {
            Ok(inner) => {
                nodes.push(inner);
                count = 1;
            }
            Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
            Err(Fail::Mismatch) => {
                self.restore(start);
                if min >= 1 {
                    return Err(Fail::Mismatch);
                }
                let mut node = self.new_node(rule.id, start);
                node.children = nodes;
                return Ok(node);
            }
        }

        loop {
            if let Some(max) = max
                && count >= max
            {
                break;
            }
            let before_sep = self.checkpoint();
            let sep = match self.parse_rule(separator, child_inherited) {
                Ok(sep) => sep,
                Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                Err(Fail::Mismatch) => break,
            };
            match self.parse_rule(child, child_inherited) {
                Ok(inner) => {
                    if include_separators {
                        nodes.push(sep);
                    }
                    nodes.push(inner);
                    count += 1;
                }
                Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                Err(Fail::Mismatch) => {
                    if allow_trailing {
                        if include_separators {
                            nodes.push(sep);
                        }
                    } else {
                        self.restore(before_sep);
                    }
                    break;
                }
            }
        }

        if count < min {
            self.restore(start);
            return Err(Fail::Mismatch);
        }
        for (occurrence, node) in nodes.iter_mut().enumerate() {
            node.occurrence = occurrence as u32;
        }
        let mut node = self.new_node(rule.id, start);
        node.children = nodes;
        Ok(node)
    }

    /// A node spanning from `start` to the current cursor.
    pub(super) fn new_node(&self, rule: RuleId, start: (usize, usize)) -> ParsedRule {
        ParsedRule {
            rule,
            token: None,
            start: start.0,
            length: self.pos - start.0,
            passed_barriers: start.1 as u32,
            occurrence: 0,
            recovered: false,
            version: self.version,
            value: None,
            children: Vec::new(),
            computed: Default::default(),
        }
    }

    fn trace_step(&mut self, step: WalkStep, pos: usize, id: RuleId) {
        if self.trace.is_none() {
            return;
        }
        let label = self.parser.rule_display_name(id);
        let input = self.input;
        if let Some(trace) = self.trace.as_mut() {
            trace.record(step, pos, label, input);
        }
    }
}

fn element_of(rule: &Rule) -> ElementRef {
    match rule.kind {
        RuleKind::Token(token) => ElementRef::Token(token),
        _ => ElementRef::Rule(rule.id),
    }
}
