//! Incremental re-parse: reuse unchanged subtrees across one contiguous
//! text edit.

use std::sync::Arc;

use crate::barriers::BarrierTable;
use crate::engine::{self, shift_node, Context, Fail};
use crate::grammar::ResolvedSettings;
use crate::Error;

use super::{Ast, ParsedRule};

/// One contiguous edit window between two versions of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChange {
    pub start: usize,
    pub old_length: usize,
    pub new_length: usize,
}

impl TextChange {
    pub fn old_end(&self) -> usize {
        self.start + self.old_length
    }

    pub fn delta(&self) -> isize {
        self.new_length as isize - self.old_length as isize
    }
}

/// The single contiguous change window between two texts, by common
/// prefix/suffix, aligned to char boundaries. `None` when equal.
pub(crate) fn diff_change(old: &str, new: &str) -> Option<TextChange> {
    if old == new {
        return None;
    }
    let mut prefix = old
        .as_bytes()
        .iter()
        .zip(new.as_bytes())
        .take_while(|(a, b)| a == b)
        .count();
    while prefix > 0 && (!old.is_char_boundary(prefix) || !new.is_char_boundary(prefix)) {
        prefix -= 1;
    }

    let max_suffix = old.len().min(new.len()) - prefix;
    let mut suffix = old
        .as_bytes()
        .iter()
        .rev()
        .zip(new.as_bytes().iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    while suffix > 0
        && (!old.is_char_boundary(old.len() - suffix) || !new.is_char_boundary(new.len() - suffix))
    {
        suffix -= 1;
    }

    Some(TextChange {
        start: prefix,
        old_length: old.len() - prefix - suffix,
        new_length: new.len() - prefix - suffix,
    })
}

impl<'p> Ast<'p> {
    /// Re-parse against an edited input, reusing subtrees the edit cannot
    /// have touched. Version numbers identify rebuilt nodes: unchanged
    /// subtrees keep their previous version.
    pub fn reparsed(&self, new_input: &str) -> Result<Ast<'p>, Error> {
        let Some(change) = diff_change(&self.input, new_input) else {
            return Ok(self.shallow_copy());
        };

        // Barrier streams shift globally under an edit, invalidating the
        // per-node barrier counts; fall back to a full parse.
        if !self.parser.tokenizers().is_empty() {
            return engine::run_parse(
                self.parser,
                self.root.rule,
                Arc::from(new_input),
                self.parameter.clone(),
                None,
                self.version + 1,
            );
        }

        let version = self.version + 1;
        let mut memo = self.memo.clone();
        if let Some(memo) = &mut memo {
            memo.apply_edit(&change);
        }

        let input: Arc<str> = Arc::from(new_input);
        let mut ctx = Context::with_barriers(
            self.parser,
            &input,
            self.parameter.clone(),
            memo,
            version,
            BarrierTable::default(),
        );
        let inherited = self.parser.options().defaults;

        match reparse_node(&mut ctx, &self.root, inherited, &change) {
            Ok(root) => {
                let report = engine::finish_report(&ctx);
                let memo = ctx.memo.take();
                drop(ctx);
                Ok(Ast {
                    parser: self.parser,
                    input,
                    root,
                    report,
                    memo,
                    version,
                    parameter: self.parameter.clone(),
                })
            }
            Err(Fail::Mismatch) => Err(Error::ParseFailed(Box::new(engine::failure_report(&ctx)))),
            Err(Fail::Fatal(e)) => Err(e),
        }
    }

    fn shallow_copy(&self) -> Ast<'p> {
        Ast {
            parser: self.parser,
            input: self.input.clone(),
            root: self.root.clone(),
            report: self.report.clone(),
            memo: self.memo.clone(),
            version: self.version,
            parameter: self.parameter.clone(),
        }
    }
}

/// Top-down re-parse of one node that encloses the change.
fn reparse_node(
    ctx: &mut Context<'_, '_>,
    node: &ParsedRule,
    inherited: ResolvedSettings,
    change: &TextChange,
) -> Result<ParsedRule, Fail> {
    let rule = ctx.parser.rule(node.rule);
    let (_, child_inherited) = rule
        .settings
        .resolve(&inherited, &ctx.parser.options().defaults);

    // The unique child whose extent encloses the whole change window.
    let mut enclosing = node
        .children
        .iter()
        .enumerate()
        .filter(|(_, c)| c.start <= change.start && change.old_end() <= c.end());
    let candidate = enclosing.next();
    let unique = candidate.is_some() && enclosing.next().is_none();

    if unique
        && let Some((index, child)) = candidate
    {
        match reparse_node(ctx, child, child_inherited, change) {
            Ok(new_child)
                if new_child.start == child.start
                    && new_child.length as isize == child.length as isize + change.delta() =>
            {
                let mut rebuilt = node.clone();
                rebuilt.computed = Default::default();
                rebuilt.children[index] = new_child;
                for sibling in &mut rebuilt.children[index + 1..] {
                    shift_node(sibling, change.delta());
                }
                rebuilt.length = (rebuilt.length as isize + change.delta()) as usize;
                return Ok(rebuilt);
            }
            Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
            // Shape changed under the child, or it failed: re-parse here.
            _ => {}
        }
    }

    // Re-parse this node from its original start with its effective
    // settings, skip and recovery included.
    ctx.pos = node.start;
    ctx.passed_barriers = node.passed_barriers as usize;
    ctx.parse_rule(node.rule, inherited)
}
