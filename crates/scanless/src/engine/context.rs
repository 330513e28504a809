//! The per-parse mutable state threaded through the interpreter.

use crate::barriers::{BarrierTable, BarrierToken};
use crate::errors::ErrorSink;
use crate::grammar::{Parser, Value};
use crate::Error;

use super::memo::MemoTable;
use super::trace::WalkTrace;

/// Soft vs fatal failure inside the interpreter.
///
/// A `Mismatch` is ordinary PEG failure: recorded (or suppressed) and open
/// to backtracking and recovery. `Fatal` aborts the whole parse.
#[derive(Debug)]
pub(crate) enum Fail {
    Mismatch,
    Fatal(Error),
}

pub(crate) type ParseOutcome<T> = Result<T, Fail>;

/// Cursor, barrier index, accumulators, and budgets for one parse call.
pub(crate) struct Context<'p, 'i> {
    pub parser: &'p Parser,
    pub input: &'i str,
    pub pos: usize,
    pub barriers: BarrierTable,
    /// Barrier tokens consumed so far; indexes the table.
    pub passed_barriers: usize,
    pub parameter: Option<Value>,
    pub sink: ErrorSink,
    pub memo: Option<MemoTable>,
    pub trace: Option<WalkTrace>,
    pub fuel: u32,
    pub depth: u32,
    /// Structural-speculation depth (lookahead, losing branches, probes).
    pub speculation: u32,
    /// Version stamped onto nodes created by this parse.
    pub version: u32,
    /// Rules whose non-repeating recovery already fired.
    pub recovered_once: Vec<crate::grammar::RuleId>,
    /// User message produced by the most recent `FailIf`/custom failure,
    /// picked up by the next error record.
    pub fail_message: Option<String>,
}

impl<'p, 'i> Context<'p, 'i> {
    pub fn new(
        parser: &'p Parser,
        input: &'i str,
        parameter: Option<Value>,
        memo: Option<MemoTable>,
        version: u32,
    ) -> Result<Self, Error> {
        let barriers = BarrierTable::build(parser.tokenizers(), input)
            .map_err(|e| super::barrier_error(parser, input, e))?;
        Ok(Self::with_barriers(parser, input, parameter, memo, version, barriers))
    }

    pub fn with_barriers(
        parser: &'p Parser,
        input: &'i str,
        parameter: Option<Value>,
        memo: Option<MemoTable>,
        version: u32,
        barriers: BarrierTable,
    ) -> Self {
        let options = parser.options();
        Self {
            parser,
            input,
            pos: 0,
            barriers,
            passed_barriers: 0,
            parameter,
            sink: ErrorSink::new(options.ignore_errors, options.write_stack_trace),
            memo: if options.use_caching {
                Some(memo.unwrap_or_default())
            } else {
                None
            },
            trace: options.record_walk_trace.then(WalkTrace::new),
            fuel: options.exec_fuel,
            depth: 0,
            speculation: 0,
            version,
            recovered_once: Vec::new(),
            fail_message: None,
        }
    }

    /// The barrier that must be consumed next, if any.
    pub fn pending_barrier(&self) -> Option<&BarrierToken> {
        self.barriers.get(self.passed_barriers)
    }

    /// Exclusive cursor bound: end of input, or the next pending barrier
    /// when barriers are honoured.
    pub fn bound(&self, ignore_barriers: bool) -> usize {
        if ignore_barriers {
            return self.input.len();
        }
        match self.barriers.bound_after(self.passed_barriers) {
            Some(barrier_pos) => barrier_pos.max(self.pos).min(self.input.len()),
            None => self.input.len(),
        }
    }

    /// Alias of any barrier sitting exactly at `position`, for reports.
    pub fn barrier_alias_at(&self, position: usize) -> Option<String> {
        self.barriers.alias_at(position).map(str::to_string)
    }

    pub fn speculating(&self) -> bool {
        self.speculation > 0
    }

    pub fn begin_speculation(&mut self) {
        self.speculation += 1;
        self.sink.suppress();
    }

    pub fn end_speculation(&mut self) {
        debug_assert!(self.speculation > 0);
        self.speculation -= 1;
        self.sink.unsuppress();
    }

    /// Cursor state snapshot for backtracking.
    pub fn checkpoint(&self) -> (usize, usize) {
        (self.pos, self.passed_barriers)
    }

    pub fn restore(&mut self, checkpoint: (usize, usize)) {
        self.pos = checkpoint.0;
        self.passed_barriers = checkpoint.1;
    }

    pub fn consume_fuel(&mut self) -> ParseOutcome<()> {
        if self.fuel == 0 {
            return Err(Fail::Fatal(Error::ExecFuelExhausted));
        }
        self.fuel -= 1;
        Ok(())
    }

    /// Character at the cursor, bounded.
    pub fn peek_char(&self, ignore_barriers: bool) -> Option<char> {
        let bound = self.bound(ignore_barriers);
        self.input.get(self.pos..bound).and_then(|s| s.chars().next())
    }

    /// Advance the cursor by one character, bounded. Returns false at the
    /// bound.
    pub fn advance_char(&mut self, ignore_barriers: bool) -> bool {
        match self.peek_char(ignore_barriers) {
            Some(c) => {
                self.pos += c.len_utf8();
                true
            }
            None => false,
        }
    }
}
