//! Error recovery strategies: resynchronizing the cursor after a failure.
//!
//! Recovery runs with recording suppressed; the original failure stays in
//! the sink and the recovered node is flagged so diagnostics surface it.

use crate::ast::ParsedRule;
use crate::grammar::{Recovery, ResolvedSettings, Rule, RuleId};

use super::context::{Context, Fail, ParseOutcome};

impl<'p, 'i> Context<'p, 'i> {
    /// Attempt the rule's recovery strategy. On entry the cursor sits at
    /// the failed attempt position; on failure it is left for the caller
    /// to restore.
    pub(super) fn recover(
        &mut self,
        rule: &'p Rule,
        own: &ResolvedSettings,
        inherited: ResolvedSettings,
    ) -> ParseOutcome<ParsedRule> {
        let repeat = match &rule.recovery {
            Recovery::None => return Err(Fail::Mismatch),
            Recovery::FindNext { .. } => true,
            Recovery::SkipUntilAnchor { repeat, .. } | Recovery::SkipAfterAnchor { repeat, .. } => {
                *repeat
            }
        };
        if !repeat && self.recovered_once.contains(&rule.id) {
            return Err(Fail::Mismatch);
        }
        let failed_at = self.sink.furthest().unwrap_or(self.pos);

        let result = match &rule.recovery {
            Recovery::None => Err(Fail::Mismatch),
            Recovery::FindNext { stop } => self.recover_find_next(rule, own, inherited, *stop),
            Recovery::SkipUntilAnchor { anchor, stop, .. } => {
                self.recover_until_anchor(rule, own, inherited, *anchor, *stop, repeat)
            }
            Recovery::SkipAfterAnchor { anchor, stop, .. } => {
                self.recover_after_anchor(rule, own, *anchor, *stop)
            }
        };

        if result.is_ok() {
            if !repeat {
                self.recovered_once.push(rule.id);
            }
            self.sink.mark_recovery(failed_at);
        }
        result
    }

    /// Advance one character at a time and retry the rule.
    fn recover_find_next(
        &mut self,
        rule: &'p Rule,
        own: &ResolvedSettings,
        inherited: ResolvedSettings,
        stop: Option<RuleId>,
    ) -> ParseOutcome<ParsedRule> {
        loop {
            if !self.advance_char(own.ignore_barriers) {
                return Err(Fail::Mismatch);
            }
            if let Some(stop) = stop
                && self.probe_rule(stop, own)?.is_some()
            {
                return Err(Fail::Mismatch);
            }
            match self.retry(rule, inherited)? {
                Some(node) => return Ok(node),
                None => continue,
            }
        }
    }

    /// Scan for the anchor, reposition at its start, and retry the rule.
    fn recover_until_anchor(
        &mut self,
        rule: &'p Rule,
        own: &ResolvedSettings,
        inherited: ResolvedSettings,
        anchor: RuleId,
        stop: Option<RuleId>,
        repeat: bool,
    ) -> ParseOutcome<ParsedRule> {
        loop {
            let Some((_, anchor_end, _)) = self.scan_for_anchor(anchor, stop, own)? else {
                return Err(Fail::Mismatch);
            };
            if let Some(node) = self.retry(rule, inherited)? {
                return Ok(node);
            }
            if !repeat {
                return Err(Fail::Mismatch);
            }
            // Move past this anchor and keep searching.
            self.pos = anchor_end.max(self.pos);
            if !self.advance_char(own.ignore_barriers) {
                return Err(Fail::Mismatch);
            }
        }
    }

    /// Scan for the anchor and consume through it: the recovered node spans
    /// from the failed attempt to just after the anchor.
    fn recover_after_anchor(
        &mut self,
        rule: &'p Rule,
        own: &ResolvedSettings,
        anchor: RuleId,
        stop: Option<RuleId>,
    ) -> ParseOutcome<ParsedRule> {
        let start = self.checkpoint();
        let Some((_, anchor_end, end_barriers)) = self.scan_for_anchor(anchor, stop, own)? else {
            return Err(Fail::Mismatch);
        };
        self.pos = anchor_end;
        self.passed_barriers = end_barriers;
        let mut node = self.new_node(rule.id, start);
        node.recovered = true;
        Ok(node)
    }

    /// Speculative retry of the whole rule (skip included) at the current
    /// position. `Ok(Some)` carries the recovered node. The retry re-enters
    /// `parse_rule`, so fuel and tracing behave like a first attempt;
    /// recovery itself is not re-entered because the sink is suppressed.
    fn retry(
        &mut self,
        rule: &'p Rule,
        inherited: ResolvedSettings,
    ) -> ParseOutcome<Option<ParsedRule>> {
        self.begin_speculation();
        let result = self.parse_rule(rule.id, inherited);
        self.end_speculation();
        match result {
            Ok(mut node) => {
                node.recovered = true;
                Ok(Some(node))
            }
            Err(Fail::Mismatch) => Ok(None),
            Err(fatal) => Err(fatal),
        }
    }

    /// Advance the cursor until the anchor rule matches at it. Returns the
    /// anchor span and the barrier index after it, cursor left at the
    /// anchor start. The stop rule or the cursor bound gives up the search.
    fn scan_for_anchor(
        &mut self,
        anchor: RuleId,
        stop: Option<RuleId>,
        own: &ResolvedSettings,
    ) -> ParseOutcome<Option<(usize, usize, usize)>> {
        loop {
            if let Some(stop) = stop
                && self.probe_rule(stop, own)?.is_some()
            {
                return Ok(None);
            }
            if let Some(span) = self.probe_rule(anchor, own)? {
                return Ok(Some(span));
            }
            if !self.advance_char(own.ignore_barriers) {
                return Ok(None);
            }
        }
    }

    /// Speculatively parse a rule at the cursor, restoring it. Returns
    /// `(match start, end position, barriers after)` on success.
    fn probe_rule(
        &mut self,
        id: RuleId,
        own: &ResolvedSettings,
    ) -> ParseOutcome<Option<(usize, usize, usize)>> {
        let checkpoint = self.checkpoint();
        let probe_settings = ResolvedSettings {
            skip_strategy: crate::grammar::SkipStrategy::NoSkipping,
            skip_rule: None,
            error_handling: crate::grammar::ErrorHandling::NoRecord,
            ignore_barriers: own.ignore_barriers,
        };
        self.begin_speculation();
        let result = self.parse_rule(id, probe_settings);
        self.end_speculation();
        match result {
            Ok(node) => {
                let (end_pos, end_barriers) = self.checkpoint();
                self.restore(checkpoint);
                Ok(Some((node.start, end_pos, end_barriers)))
            }
            Err(Fail::Mismatch) => {
                self.restore(checkpoint);
                Ok(None)
            }
            Err(fatal) => Err(fatal),
        }
    }
}
