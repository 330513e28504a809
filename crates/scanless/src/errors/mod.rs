//! Parse-error accumulation: the per-context sink, stack-frame arena, and
//! position-grouped reporting.

mod group;
mod printer;


pub use group::{ErrorGroup, ErrorReport};
pub use printer::ErrorPrinter;

pub(crate) use group::{build_report, line_column, message_report};

use crate::grammar::{RuleId, TokenId};

/// Formatter knobs frozen into the parser options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorFormatting {
    /// Upper bound on rendered groups, ordered by descending position.
    pub max_groups: usize,
    /// Render recorded ancestor chains under each group.
    pub show_stack_traces: bool,
    /// Append the walk-trace tail to the rendered report.
    pub show_walk_trace: bool,
}

impl Default for ErrorFormatting {
    fn default() -> Self {
        Self {
            max_groups: 5,
            show_stack_traces: false,
            show_walk_trace: false,
        }
    }
}

/// The expected element an error points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRef {
    Rule(RuleId),
    Token(TokenId),
}

impl ElementRef {
    pub fn is_token(&self) -> bool {
        matches!(self, ElementRef::Token(_))
    }
}

/// Index into the sink's frame arena.
pub type FrameId = u32;

/// One link of an ancestor chain, arena-allocated per parse.
#[derive(Debug, Clone, Copy)]
pub struct StackFrame {
    pub rule: RuleId,
    pub parent: Option<FrameId>,
}

/// A single recorded parse error.
#[derive(Debug, Clone)]
pub struct ParsingError {
    pub position: usize,
    pub element: ElementRef,
    /// User-supplied message (`FailIf`, custom rules), if any.
    pub message: Option<String>,
    /// Innermost ancestor frame at record time, when stack traces are on.
    pub frame: Option<FrameId>,
}

/// Per-context error accumulator.
///
/// Speculative parsing (lookahead, losing choice branches, skip rules,
/// recovery probes) suppresses recording by depth-counting rather than by
/// toggling, so nested speculation unwinds correctly.
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Vec<ParsingError>,
    frames: Vec<StackFrame>,
    current_frame: Option<FrameId>,
    suppress_depth: u32,
    disabled: bool,
    record_frames: bool,
    /// Furthest recorded error position so far.
    furthest: Option<usize>,
    /// Error-index boundaries of recovery segments.
    segments: Vec<usize>,
    /// Furthest position known when the last segment opened.
    segment_furthest: Option<usize>,
}

impl ErrorSink {
    pub fn new(disabled: bool, record_frames: bool) -> Self {
        Self {
            disabled,
            record_frames,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ParsingError] {
        &self.errors
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn furthest(&self) -> Option<usize> {
        self.furthest
    }

    /// Recovery-segment boundaries as error indices.
    pub fn segments(&self) -> &[usize] {
        &self.segments
    }

    pub fn is_suppressed(&self) -> bool {
        self.disabled || self.suppress_depth > 0
    }

    pub fn suppress(&mut self) {
        self.suppress_depth += 1;
    }

    pub fn unsuppress(&mut self) {
        debug_assert!(self.suppress_depth > 0);
        self.suppress_depth = self.suppress_depth.saturating_sub(1);
    }

    /// Push an ancestor frame; returns the previous innermost frame for
    /// restoration on rule exit.
    pub fn enter_frame(&mut self, rule: RuleId) -> Option<FrameId> {
        if !self.record_frames {
            return None;
        }
        let prev = self.current_frame;
        let id = self.frames.len() as FrameId;
        self.frames.push(StackFrame {
            rule,
            parent: prev,
        });
        self.current_frame = Some(id);
        prev
    }

    pub fn restore_frame(&mut self, prev: Option<FrameId>) {
        if self.record_frames {
            self.current_frame = prev;
        }
    }

    pub fn record(&mut self, position: usize, element: ElementRef, message: Option<String>) {
        if self.is_suppressed() {
            return;
        }
        self.furthest = Some(self.furthest.map_or(position, |f| f.max(position)));
        self.errors.push(ParsingError {
            position,
            element,
            message,
            frame: self.current_frame,
        });
    }

    /// Note that recovery fired after a failure at `position`. Opens a new
    /// segment when the failure lies beyond the previously-known furthest
    /// error of the current segment.
    pub fn mark_recovery(&mut self, position: usize) {
        let beyond = self.segment_furthest.is_none_or(|f| position > f);
        if beyond {
            self.segments.push(self.errors.len());
            self.segment_furthest = Some(position);
        }
    }

    /// Resolve the ancestor rule chain of an error, innermost first.
    pub fn stack_of(&self, error: &ParsingError) -> Vec<RuleId> {
        let mut chain = Vec::new();
        let mut frame = error.frame;
        while let Some(id) = frame {
            let f = self.frames[id as usize];
            chain.push(f.rule);
            frame = f.parent;
        }
        chain
    }
}
