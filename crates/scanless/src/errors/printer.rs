//! Builder-pattern printer rendering error groups as annotated snippets.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

use super::group::{ErrorGroup, ErrorReport};

/// Renders an [`ErrorReport`] with various options.
pub struct ErrorPrinter<'a> {
    report: &'a ErrorReport,
    source: Option<&'a str>,
    path: Option<&'a str>,
    colored: bool,
    max_groups: usize,
    show_stacks: bool,
    relevant_only: bool,
    walk_tail: Option<&'a str>,
}

impl<'a> ErrorPrinter<'a> {
    pub fn new(report: &'a ErrorReport) -> Self {
        Self {
            report,
            source: None,
            path: None,
            colored: false,
            max_groups: usize::MAX,
            show_stacks: false,
            relevant_only: false,
            walk_tail: None,
        }
    }

    pub fn source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn max_groups(mut self, value: usize) -> Self {
        self.max_groups = value;
        self
    }

    pub fn stack_traces(mut self, value: bool) -> Self {
        self.show_stacks = value;
        self
    }

    /// Restrict output to the furthest group of each recovery segment.
    pub fn relevant_only(mut self, value: bool) -> Self {
        self.relevant_only = value;
        self
    }

    pub fn walk_tail(mut self, tail: &'a str) -> Self {
        self.walk_tail = Some(tail);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let groups: Vec<&ErrorGroup> = if self.relevant_only {
            self.report.relevant_groups().collect()
        } else {
            self.report.groups().iter().collect()
        };

        for (i, group) in groups.iter().take(self.max_groups).enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            match self.source {
                Some(source) => self.format_group(w, group, source)?,
                None => self.format_plain(w, group)?,
            }
        }

        if let Some(tail) = self.walk_tail
            && !tail.is_empty()
        {
            w.write_char('\n')?;
            w.write_str(tail)?;
        }

        Ok(())
    }

    fn format_group(
        &self,
        w: &mut impl Write,
        group: &ErrorGroup,
        source: &str,
    ) -> std::fmt::Result {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let title = group_title(group);
        let span = annotation_span(group.position, source);

        let mut snippet = Snippet::source(source).line_start(1).annotation(
            AnnotationKind::Primary
                .span(span)
                .label(&title),
        );
        if let Some(p) = self.path {
            snippet = snippet.path(p);
        }

        let report = vec![Level::ERROR.primary_title(&title).element(snippet)];
        write!(w, "{}", renderer.render(&report))?;

        if self.show_stacks {
            for chain in &group.stacks {
                w.write_char('\n')?;
                write!(w, "  while parsing {}", chain.join(" in "))?;
            }
        }
        Ok(())
    }

    fn format_plain(&self, w: &mut impl Write, group: &ErrorGroup) -> std::fmt::Result {
        write!(
            w,
            "error at line {}, column {}: {}",
            group.line,
            group.column,
            group_title(group)
        )
    }
}

/// Compose the one-line headline of a group.
fn group_title(group: &ErrorGroup) -> String {
    let mut parts = Vec::new();
    if let Some(alias) = &group.barrier {
        parts.push(format!("unexpected barrier token `{alias}`"));
    }
    match group.expected.len() {
        0 => {}
        1 => parts.push(format!("expected {}", quoted(&group.expected[0]))),
        _ => {
            let list: Vec<String> = group.expected.iter().map(|e| quoted(e)).collect();
            parts.push(format!("expected one of: {}", list.join(", ")));
        }
    }
    parts.extend(group.messages.iter().cloned());
    if parts.is_empty() {
        parts.push("Unknown error".to_string());
    }
    parts.join("; ")
}

fn quoted(expectation: &str) -> String {
    // Multi-word expectations read as descriptions, not literal text.
    if expectation.contains(' ') {
        expectation.to_string()
    } else {
        format!("'{expectation}'")
    }
}

/// One-character span at `position`, clamped to char boundaries so the
/// annotation never splits a multi-byte character.
fn annotation_span(position: usize, source: &str) -> std::ops::Range<usize> {
    let limit = source.len();
    if limit == 0 {
        return 0..0;
    }
    let start = floor_boundary(source, position.min(limit));
    if start == limit {
        // Point at the final character when the error sits at end of input.
        return floor_boundary(source, limit - 1)..limit;
    }
    let mut end = start + 1;
    while end < limit && !source.is_char_boundary(end) {
        end += 1;
    }
    start..end
}

fn floor_boundary(source: &str, mut pos: usize) -> usize {
    while pos > 0 && !source.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}
