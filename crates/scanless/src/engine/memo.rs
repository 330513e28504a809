//! Packrat-style memoization of rule results.

use std::collections::HashMap;

use crate::ast::{ParsedRule, TextChange};
use crate::grammar::RuleId;

/// Key: `(rule, position, barriers passed, effective-settings fingerprint)`.
/// The barrier index participates because a `Barrier` token's outcome
/// depends on which barrier is pending, not only on the byte position.
type MemoKey = (RuleId, usize, usize, u64);

#[derive(Debug, Clone)]
struct MemoEntry {
    node: ParsedRule,
    end_pos: usize,
    end_barriers: usize,
}

/// Cache of successful rule parses. On a hit the cursor advances past the
/// cached result without re-executing the rule.
#[derive(Debug, Clone, Default)]
pub struct MemoTable {
    entries: HashMap<MemoKey, MemoEntry>,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(
        &self,
        rule: RuleId,
        pos: usize,
        barriers: usize,
        fingerprint: u64,
    ) -> Option<(ParsedRule, usize, usize)> {
        self.entries
            .get(&(rule, pos, barriers, fingerprint))
            .map(|e| (e.node.clone(), e.end_pos, e.end_barriers))
    }

    pub(crate) fn insert(
        &mut self,
        rule: RuleId,
        pos: usize,
        barriers: usize,
        fingerprint: u64,
        node: ParsedRule,
        end_pos: usize,
        end_barriers: usize,
    ) {
        self.entries.insert(
            (rule, pos, barriers, fingerprint),
            MemoEntry {
                node,
                end_pos,
                end_barriers,
            },
        );
    }

    /// Incremental-edit invalidation: entries overlapping or touching the
    /// edited span are evicted (a match ending exactly at the edit could
    /// extend into inserted text); entries entirely past it are re-keyed
    /// and shifted by the length delta.
    pub(crate) fn apply_edit(&mut self, change: &TextChange) {
        let delta = change.new_length as isize - change.old_length as isize;
        let old_end = change.start + change.old_length;

        let entries = std::mem::take(&mut self.entries);
        for ((rule, pos, barriers, fp), mut entry) in entries {
            let span_end = entry.end_pos.max(entry.node.end());
            if span_end < change.start {
                self.entries.insert((rule, pos, barriers, fp), entry);
            } else if entry.node.start >= old_end && pos >= old_end {
                shift_node(&mut entry.node, delta);
                entry.end_pos = offset(entry.end_pos, delta);
                let new_pos = offset(pos, delta);
                self.entries.insert((rule, new_pos, barriers, fp), entry);
            }
            // Overlapping and edge-touching entries are dropped.
        }
    }
}

fn offset(pos: usize, delta: isize) -> usize {
    (pos as isize + delta) as usize
}

pub(crate) fn shift_node(node: &mut ParsedRule, delta: isize) {
    node.start = offset(node.start, delta);
    for child in &mut node.children {
        shift_node(child, delta);
    }
}
