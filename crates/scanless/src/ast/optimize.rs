//! Parse-tree optimization: eliding pass-through and empty nodes.

use crate::grammar::Parser;

use super::{Ast, ParsedRule};

/// Which elisions the optimizer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseTreeOptimization {
    /// Replace a node that wraps exactly one same-span child by that child.
    pub collapse_single_child: bool,
    /// Drop zero-length children carrying no value.
    pub drop_empty: bool,
}

impl ParseTreeOptimization {
    pub const NONE: ParseTreeOptimization = ParseTreeOptimization {
        collapse_single_child: false,
        drop_empty: false,
    };
    pub const COLLAPSE_SINGLE_CHILD: ParseTreeOptimization = ParseTreeOptimization {
        collapse_single_child: true,
        drop_empty: false,
    };
    pub const DROP_EMPTY: ParseTreeOptimization = ParseTreeOptimization {
        collapse_single_child: false,
        drop_empty: true,
    };
}

impl Default for ParseTreeOptimization {
    fn default() -> Self {
        ParseTreeOptimization {
            collapse_single_child: true,
            drop_empty: true,
        }
    }
}

impl<'p> Ast<'p> {
    /// A new tree with the given elisions applied. Nodes whose rules carry
    /// a user value factory are never elided.
    pub fn optimized(mut self, flags: ParseTreeOptimization) -> Self {
        self.root = optimize_node(self.parser, std::mem::take(&mut self.root), flags);
        self
    }
}

fn optimize_node(
    parser: &Parser,
    mut node: ParsedRule,
    flags: ParseTreeOptimization,
) -> ParsedRule {
    let children = std::mem::take(&mut node.children);
    node.children = children
        .into_iter()
        .map(|child| optimize_node(parser, child, flags))
        .filter(|child| !(flags.drop_empty && droppable(parser, child)))
        .collect();

    if flags.collapse_single_child && collapsible(parser, &node) {
        let mut child = node.children.pop().expect("single child present");
        child.occurrence = node.occurrence;
        return child;
    }
    node
}

/// An empty child is droppable when nothing observable hangs off it.
fn droppable(parser: &Parser, node: &ParsedRule) -> bool {
    node.length == 0
        && node.value.is_none()
        && node.children.is_empty()
        && parser.rule(node.rule).factory.is_none()
}

/// A wrapper is collapsible when its single child spans the same text and
/// the wrapper adds no value of its own.
fn collapsible(parser: &Parser, node: &ParsedRule) -> bool {
    if node.children.len() != 1 {
        return false;
    }
    let rule = parser.rule(node.rule);
    if rule.factory.is_some() || node.value.is_some() {
        return false;
    }
    let child = &node.children[0];
    child.start == node.start && child.length == node.length
}
