//! Aggregation of recorded errors into per-position groups.

use indexmap::IndexMap;

use crate::grammar::Parser;

use super::{ElementRef, ErrorSink};

/// All errors recorded at one input position, merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorGroup {
    pub position: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based character column.
    pub column: usize,
    /// 1-based column with tabs expanded to the next tab stop.
    pub visual_column: usize,
    /// Distinct pretty-printed expectations, in record order.
    pub expected: Vec<String>,
    /// Distinct user-supplied messages.
    pub messages: Vec<String>,
    /// Alias of a barrier token pending exactly here, if any.
    pub barrier: Option<String>,
    /// Distinct ancestor chains (innermost first), when stack traces are on.
    pub stacks: Vec<Vec<String>>,
}

/// The aggregated outcome of a parse's error sink.
#[derive(Debug, Clone, Default)]
pub struct ErrorReport {
    /// Groups ordered by descending position (furthest first).
    groups: Vec<ErrorGroup>,
    /// Indices into `groups`: the furthest group of each recovery segment.
    relevant: Vec<usize>,
    /// Preformatted summary of the furthest group.
    message: String,
}

impl ErrorReport {
    pub fn groups(&self) -> &[ErrorGroup] {
        &self.groups
    }

    pub fn relevant_groups(&self) -> impl Iterator<Item = &ErrorGroup> {
        self.relevant.iter().map(|&i| &self.groups[i])
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The furthest group, when any error was recorded.
    pub fn furthest(&self) -> Option<&ErrorGroup> {
        self.groups.first()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn set_message(&mut self, message: String) {
        self.message = message;
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// 1-based `(line, column, visual column)` of a byte position.
pub(crate) fn line_column(input: &str, position: usize, tab_size: u32) -> (usize, usize, usize) {
    let position = position.min(input.len());
    let before = &input[..position];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let mut column = 1usize;
    let mut visual = 1usize;
    for c in input[line_start..position].chars() {
        column += 1;
        if c == '\t' {
            let tab = tab_size.max(1) as usize;
            visual = ((visual - 1) / tab + 1) * tab + 1;
        } else {
            visual += 1;
        }
    }
    (line, column, visual)
}

/// Build the grouped report from a finished sink.
///
/// `barrier_at` resolves the alias of a barrier pending exactly at a
/// position, surfacing "unexpected barrier" context.
pub(crate) fn build_report(
    sink: &ErrorSink,
    parser: &Parser,
    input: &str,
    barrier_at: impl Fn(usize) -> Option<String>,
) -> ErrorReport {
    let tab_size = parser.options().tab_size;
    let mut by_position: IndexMap<usize, ErrorGroup> = IndexMap::new();

    for error in sink.errors() {
        let group = by_position.entry(error.position).or_insert_with(|| {
            let (line, column, visual_column) = line_column(input, error.position, tab_size);
            ErrorGroup {
                position: error.position,
                line,
                column,
                visual_column,
                expected: Vec::new(),
                messages: Vec::new(),
                barrier: barrier_at(error.position),
                stacks: Vec::new(),
            }
        });

        let name = display_name(parser, error.element);
        if !group.expected.contains(&name) {
            group.expected.push(name);
        }
        if let Some(message) = &error.message
            && !group.messages.contains(message)
        {
            group.messages.push(message.clone());
        }
        let chain: Vec<String> = sink
            .stack_of(error)
            .into_iter()
            .map(|id| parser.rule_display_name(id))
            .collect();
        if !chain.is_empty() && !group.stacks.contains(&chain) {
            group.stacks.push(chain);
        }
    }

    let mut groups: Vec<ErrorGroup> = by_position.into_values().collect();
    groups.sort_by(|a, b| b.position.cmp(&a.position));

    let relevant = relevant_indices(sink, &groups);

    ErrorReport {
        groups,
        relevant,
        message: String::new(),
    }
}

/// A single-group report carrying one message, for failures that bypass
/// the sink (pre-scan errors, empty-sink failures).
pub(crate) fn message_report(
    input: &str,
    position: usize,
    message: String,
    tab_size: u32,
) -> ErrorReport {
    let (line, column, visual_column) = line_column(input, position, tab_size);
    ErrorReport {
        groups: vec![ErrorGroup {
            position,
            line,
            column,
            visual_column,
            expected: Vec::new(),
            messages: vec![message],
            barrier: None,
            stacks: Vec::new(),
        }],
        relevant: vec![0],
        message: String::new(),
    }
}

/// The furthest group of each recovery segment, as indices into `groups`.
fn relevant_indices(sink: &ErrorSink, groups: &[ErrorGroup]) -> Vec<usize> {
    let errors = sink.errors();
    let mut bounds = vec![0usize];
    bounds.extend_from_slice(sink.segments());
    bounds.push(errors.len());
    bounds.dedup();

    let mut relevant = Vec::new();
    for window in bounds.windows(2) {
        let slice = &errors[window[0]..window[1]];
        let Some(furthest) = slice.iter().map(|e| e.position).max() else {
            continue;
        };
        if let Some(index) = groups.iter().position(|g| g.position == furthest)
            && !relevant.contains(&index)
        {
            relevant.push(index);
        }
    }
    relevant.sort_unstable();
    relevant
}

fn display_name(parser: &Parser, element: ElementRef) -> String {
    match element {
        ElementRef::Rule(id) => parser.rule_display_name(id),
        ElementRef::Token(id) => parser.token(id).display_name(),
    }
}
