//! Walk-trace recording: an append-only enter/success/fail log.

use std::fmt::Write;

/// One step kind of the interpreter walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    Enter,
    Success,
    Fail,
}

impl WalkStep {
    fn label(self) -> &'static str {
        match self {
            WalkStep::Enter => "ENTER",
            WalkStep::Success => "OK",
            WalkStep::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub step: WalkStep,
    pub position: usize,
    pub label: String,
    /// Short escaped excerpt of the input at the position.
    pub snippet: String,
}

/// The recorded walk of one parse call.
#[derive(Debug, Clone, Default)]
pub struct WalkTrace {
    entries: Vec<WalkEntry>,
}

const SNIPPET_CHARS: usize = 12;

impl WalkTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[WalkEntry] {
        &self.entries
    }

    pub(crate) fn record(&mut self, step: WalkStep, position: usize, label: String, input: &str) {
        self.entries.push(WalkEntry {
            step,
            position,
            label,
            snippet: snippet_at(input, position),
        });
    }

    /// The tail of the log, prefixed with a hidden-step count when capped.
    pub fn format_tail(&self, max_steps: usize) -> String {
        let mut out = String::new();
        let hidden = self.entries.len().saturating_sub(max_steps);
        if hidden > 0 {
            let _ = writeln!(out, "... ({hidden} steps hidden)");
        }
        for entry in &self.entries[hidden..] {
            let _ = writeln!(
                out,
                "{:5} @{} {} `{}`",
                entry.step.label(),
                entry.position,
                entry.label,
                entry.snippet
            );
        }
        out
    }
}

fn snippet_at(input: &str, position: usize) -> String {
    let mut pos = position.min(input.len());
    while pos > 0 && !input.is_char_boundary(pos) {
        pos -= 1;
    }
    input[pos..]
        .chars()
        .take(SNIPPET_CHARS)
        .map(|c| match c {
            '\n' => '␊',
            '\t' => '␉',
            c => c,
        })
        .collect()
}
