//! Search iterator: every non-overlapping match of a rule across an input.

use std::sync::Arc;

use crate::engine;
use crate::grammar::{Parser, RuleId};

use super::Ast;

/// Iterator over non-overlapping matches, in source order.
///
/// After each match the scan resumes at the index one past the final
/// consumed character (the match end); empty matches advance by one
/// character so the scan always progresses.
pub struct FindAllMatches<'p> {
    parser: &'p Parser,
    rule: RuleId,
    input: Arc<str>,
    pos: usize,
}

impl<'p> FindAllMatches<'p> {
    pub(crate) fn new(parser: &'p Parser, rule: RuleId, input: Arc<str>) -> Self {
        Self {
            parser,
            rule,
            input,
            pos: 0,
        }
    }

    fn step_char(&self, pos: usize) -> usize {
        match self.input[pos..].chars().next() {
            Some(c) => pos + c.len_utf8(),
            None => pos + 1,
        }
    }
}

impl<'p> Iterator for FindAllMatches<'p> {
    type Item = Ast<'p>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos <= self.input.len() {
            let attempt =
                engine::run_match_at(self.parser, self.rule, self.input.clone(), self.pos);
            match attempt {
                Some(ast) => {
                    let end = ast.root.end();
                    self.pos = if end > self.pos {
                        end
                    } else {
                        self.step_char(self.pos)
                    };
                    return Some(ast);
                }
                None => {
                    if self.pos >= self.input.len() {
                        break;
                    }
                    self.pos = self.step_char(self.pos);
                }
            }
        }
        None
    }
}
