//! Parse execution: the public entry points over an immutable [`Parser`].

mod context;
mod interpreter;
mod memo;
mod recovery;
mod tokens;
mod trace;

#[cfg(test)]
mod skip_tests;
#[cfg(test)]
mod tokens_tests;

pub use memo::MemoTable;
pub use trace::{WalkEntry, WalkStep, WalkTrace};

pub(crate) use context::{Context, Fail};
pub(crate) use memo::shift_node;

use std::sync::Arc;

use crate::ast::{Ast, FindAllMatches};
use crate::barriers::BarrierError;
use crate::errors::{build_report, message_report, ErrorPrinter, ErrorReport};
use crate::grammar::{Parser, RuleId, Value};
use crate::Error;

/// Outcome of [`Parser::try_match_token`].
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMatch {
    pub start: usize,
    pub length: usize,
    pub text: String,
    pub value: Option<Value>,
}

impl Parser {
    /// Parse the whole input with the main rule.
    pub fn parse<'p>(&'p self, input: &str) -> Result<Ast<'p>, Error> {
        let main = self.main_rule().ok_or(Error::NoMainRule)?;
        run_parse(self, main, Arc::from(input), None, None, 1)
    }

    /// Parse with a named rule as the entry point.
    pub fn parse_named<'p>(&'p self, rule: &str, input: &str) -> Result<Ast<'p>, Error> {
        let id = self.resolve_rule(rule)?;
        run_parse(self, id, Arc::from(input), None, None, 1)
    }

    /// Parse with a named rule and a parse parameter available to `If` /
    /// `Switch` dispatch and user callbacks.
    pub fn parse_with<'p>(
        &'p self,
        rule: &str,
        input: &str,
        parameter: Option<Value>,
    ) -> Result<Ast<'p>, Error> {
        let id = self.resolve_rule(rule)?;
        run_parse(self, id, Arc::from(input), parameter, None, 1)
    }

    /// Match a named token at the start of the input, computing its value.
    pub fn try_match_token(
        &self,
        token: &str,
        input: &str,
        parameter: Option<Value>,
    ) -> Result<TokenMatch, Error> {
        let id = self
            .token_id(token)
            .ok_or_else(|| Error::UnknownToken(token.to_string()))?;
        let mut ctx = Context::new(self, input, parameter, None, 1)?;
        match ctx.match_token(id, false, true) {
            Ok(value) => Ok(TokenMatch {
                start: 0,
                length: ctx.pos,
                text: input[..ctx.pos].to_string(),
                value,
            }),
            Err(Fail::Fatal(e)) => Err(e),
            Err(Fail::Mismatch) => {
                ctx.sink
                    .record(0, crate::errors::ElementRef::Token(id), None);
                Err(Error::ParseFailed(Box::new(failure_report(&ctx))))
            }
        }
    }

    /// Validation-only token match: no value calculation. Returns the
    /// matched length.
    pub fn matches_token(&self, token: &str, input: &str) -> Option<usize> {
        let id = self.token_id(token)?;
        let mut ctx = Context::new(self, input, None, None, 1).ok()?;
        ctx.match_token(id, false, false).ok()?;
        Some(ctx.pos)
    }

    /// Every non-overlapping match of the named rule across the input, in
    /// source order.
    pub fn find_all_matches<'p>(
        &'p self,
        rule: &str,
        input: &str,
    ) -> Result<FindAllMatches<'p>, Error> {
        let id = self.resolve_rule(rule)?;
        Ok(FindAllMatches::new(self, id, Arc::from(input)))
    }

    fn resolve_rule(&self, rule: &str) -> Result<RuleId, Error> {
        self.rule_id(rule)
            .ok_or_else(|| Error::UnknownRule(rule.to_string()))
    }
}

/// Drive one full parse call and wrap the outcome.
pub(crate) fn run_parse<'p>(
    parser: &'p Parser,
    rule: RuleId,
    input: Arc<str>,
    parameter: Option<Value>,
    memo: Option<MemoTable>,
    version: u32,
) -> Result<Ast<'p>, Error> {
    let mut ctx = Context::new(parser, &input, parameter.clone(), memo, version)?;
    let inherited = parser.options().defaults;
    let result = ctx.parse_rule(rule, inherited);

    match result {
        Ok(root) => {
            let report = finish_report(&ctx);
            let memo = ctx.memo.take();
            drop(ctx);
            Ok(Ast {
                parser,
                input,
                root,
                report,
                memo,
                version,
                parameter,
            })
        }
        Err(Fail::Mismatch) => Err(Error::ParseFailed(Box::new(failure_report(&ctx)))),
        Err(Fail::Fatal(e)) => Err(e),
    }
}

/// Silent probe for `find_all_matches`: parse at a position with recording
/// suppressed; failures yield `None`.
pub(crate) fn run_match_at<'p>(
    parser: &'p Parser,
    rule: RuleId,
    input: Arc<str>,
    start: usize,
) -> Option<Ast<'p>> {
    let mut ctx = Context::new(parser, &input, None, None, 1).ok()?;
    ctx.pos = start;
    // Barriers before the probe position count as passed.
    while ctx
        .pending_barrier()
        .is_some_and(|b| b.position < start)
    {
        ctx.passed_barriers += 1;
    }
    ctx.begin_speculation();
    let result = ctx.parse_rule(rule, parser.options().defaults);
    ctx.end_speculation();
    match result {
        Ok(root) => {
            drop(ctx);
            Some(Ast {
                parser,
                input,
                root,
                report: ErrorReport::default(),
                memo: None,
                version: 1,
                parameter: None,
            })
        }
        Err(_) => None,
    }
}

/// Aggregate the sink into a report and preformat its headline message.
pub(crate) fn finish_report(ctx: &Context<'_, '_>) -> ErrorReport {
    let options = ctx.parser.options();
    let mut report = build_report(&ctx.sink, ctx.parser, ctx.input, |pos| {
        ctx.barrier_alias_at(pos)
    });
    let walk_tail = ctx
        .trace
        .as_ref()
        .filter(|_| options.error_formatting.show_walk_trace)
        .map(|trace| trace.format_tail(options.max_steps_to_display));
    let mut printer = ErrorPrinter::new(&report)
        .source(ctx.input)
        .max_groups(1)
        .stack_traces(options.error_formatting.show_stack_traces);
    if let Some(tail) = walk_tail.as_deref() {
        printer = printer.walk_tail(tail);
    }
    let message = printer.render();
    report.set_message(message);
    report
}

/// Report for a parse that failed outright; an empty sink still produces a
/// synthetic group so callers always see at least one.
pub(crate) fn failure_report(ctx: &Context<'_, '_>) -> ErrorReport {
    if ctx.sink.is_empty() {
        let position = ctx.sink.furthest().unwrap_or(ctx.pos);
        let mut report = message_report(
            ctx.input,
            position,
            "Unknown error".to_string(),
            ctx.parser.options().tab_size,
        );
        let message = ErrorPrinter::new(&report).source(ctx.input).render();
        report.set_message(message);
        return report;
    }
    finish_report(ctx)
}

/// Escalate a `Throw`-mode failure into a fatal error carrying the report.
pub(crate) fn fatal_failure(ctx: &Context<'_, '_>) -> Error {
    Error::ParseFailed(Box::new(failure_report(ctx)))
}

/// A pre-scan failure (e.g. strict-indent violation) becomes a positional
/// parse error.
pub(crate) fn barrier_error(parser: &Parser, input: &str, error: BarrierError) -> Error {
    let mut report = message_report(
        input,
        error.position,
        error.message,
        parser.options().tab_size,
    );
    let message = ErrorPrinter::new(&report).source(input).render();
    report.set_message(message);
    Error::ParseFailed(Box::new(report))
}
