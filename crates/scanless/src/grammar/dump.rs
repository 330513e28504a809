//! Debug dump of the built element tables, for snapshot tests.

use std::fmt::Write;

use super::{FirstChars, Parser, RuleKind, TokenKind};

impl Parser {
    /// One line per rule and token record: id, kind, children, aliases.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            let _ = write!(out, "r{} {}", rule.id, kind_label(&rule.kind));
            let children = rule.kind.child_ids();
            if !children.is_empty() {
                let ids: Vec<String> = children.iter().map(|id| format!("r{id}")).collect();
                let _ = write!(out, "({})", ids.join(" "));
            }
            if let RuleKind::Token(token) = rule.kind {
                let _ = write!(out, "(t{token})");
            }
            if !rule.aliases.is_empty() {
                let _ = write!(out, " as {}", rule.aliases.join(", "));
            }
            if let FirstChars::Set(set) = &rule.first_chars {
                let chars: String = set.iter().collect();
                let _ = write!(out, " first={chars:?}");
            }
            out.push('\n');
        }
        for token in &self.tokens {
            let _ = write!(out, "t{} {}", token.id, token.kind.describe());
            let children = token.child_ids();
            if !children.is_empty() {
                let ids: Vec<String> = children.iter().map(|id| format!("t{id}")).collect();
                let _ = write!(out, "({})", ids.join(" "));
            }
            if !token.aliases.is_empty() {
                let _ = write!(out, " as {}", token.aliases.join(", "));
            }
            out.push('\n');
        }
        if let Some(main) = self.main_rule {
            let _ = writeln!(out, "main r{main}");
        }
        out
    }
}

fn kind_label(kind: &RuleKind) -> &'static str {
    match kind {
        RuleKind::Token(_) => "token",
        RuleKind::Sequence(_) => "seq",
        RuleKind::Choice { .. } => "choice",
        RuleKind::Optional(_) => "opt",
        RuleKind::Repeat { .. } => "repeat",
        RuleKind::SeparatedRepeat { .. } => "sep-repeat",
        RuleKind::Lookahead { positive: true, .. } => "and",
        RuleKind::Lookahead {
            positive: false, ..
        } => "not",
        RuleKind::If { .. } => "if",
        RuleKind::Switch { .. } => "switch",
        RuleKind::Custom { .. } => "custom",
    }
}
