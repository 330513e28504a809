//! The parse tree and its lazy / precalculated presentations.

mod find_iter;
mod incremental;
mod optimize;

#[cfg(test)]
mod incremental_tests;
#[cfg(test)]
mod optimize_tests;

pub use find_iter::FindAllMatches;
pub use incremental::TextChange;
pub use optimize::ParseTreeOptimization;

use std::cell::OnceCell;
use std::sync::Arc;

use crate::engine::MemoTable;
use crate::errors::{ErrorGroup, ErrorReport};
use crate::grammar::{FactoryArgs, Parser, RuleId, RuleKind, TokenId, Value};

/// One node of the parse tree. A plain value type: children are owned, and
/// positions are byte offsets into the parsed input.
#[derive(Debug, Clone, Default)]
pub struct ParsedRule {
    pub rule: RuleId,
    /// Set for token-rule leaves.
    pub token: Option<TokenId>,
    pub start: usize,
    pub length: usize,
    /// Barrier tokens consumed before this node began.
    pub passed_barriers: u32,
    /// Iteration index under a repeat parent, 0 elsewhere.
    pub occurrence: u32,
    /// Whether this node was produced by error recovery.
    pub recovered: bool,
    /// Bumped on every re-parse that rebuilt this node.
    pub version: u32,
    /// Intermediate value computed at parse time (tokens and combinators).
    pub value: Option<Value>,
    pub children: Vec<ParsedRule>,
    /// Lazily computed user value.
    pub(crate) computed: OnceCell<Value>,
}

impl PartialEq for ParsedRule {
    fn eq(&self, other: &Self) -> bool {
        self.rule == other.rule
            && self.token == other.token
            && self.start == other.start
            && self.length == other.length
            && self.passed_barriers == other.passed_barriers
            && self.occurrence == other.occurrence
            && self.recovered == other.recovered
            && self.value == other.value
            && self.children == other.children
    }
}

impl ParsedRule {
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn is_token(&self) -> bool {
        self.token.is_some()
    }

    /// Total node count of this subtree, itself included.
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ParsedRule::subtree_size)
            .sum::<usize>()
    }
}

/// A completed parse: the tree, the input it consumed, and the aggregated
/// error report (recoveries included).
#[derive(Debug)]
pub struct Ast<'p> {
    pub(crate) parser: &'p Parser,
    pub(crate) input: Arc<str>,
    pub(crate) root: ParsedRule,
    pub(crate) report: ErrorReport,
    /// Memo table carried over for incremental re-parse, when caching is on.
    pub(crate) memo: Option<MemoTable>,
    /// Version stamp of the latest (re-)parse that produced this tree.
    pub(crate) version: u32,
    /// The parameter the parse ran with, replayed on re-parse.
    pub(crate) parameter: Option<Value>,
}

impl<'p> Ast<'p> {
    pub fn parser(&self) -> &'p Parser {
        self.parser
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn root(&self) -> AstNode<'_, 'p> {
        AstNode {
            ast: self,
            node: &self.root,
        }
    }

    /// Text consumed by the root node.
    pub fn text(&self) -> &str {
        self.root().text()
    }

    /// User value of the root node.
    pub fn value(&self) -> Value {
        self.root().value().clone()
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }

    pub fn error_groups(&self) -> &[ErrorGroup] {
        self.report.groups()
    }

    pub fn relevant_groups(&self) -> Vec<&ErrorGroup> {
        self.report.relevant_groups().collect()
    }

    /// Render the grouped error report against the parsed input, honouring
    /// the configured formatting limits.
    pub fn format_errors(&self) -> String {
        let formatting = self.parser.options().error_formatting;
        crate::errors::ErrorPrinter::new(&self.report)
            .source(&self.input)
            .max_groups(formatting.max_groups)
            .stack_traces(formatting.show_stack_traces)
            .render()
    }

    /// Whether any subtree was produced by error recovery.
    pub fn has_recoveries(&self) -> bool {
        fn any_recovered(node: &ParsedRule) -> bool {
            node.recovered || node.children.iter().any(any_recovered)
        }
        any_recovered(&self.root)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Force every node's user value now, turning the lazy presentation
    /// into the precalculated one.
    pub fn precalculated(self) -> Self {
        fn force(ast: &Ast<'_>, node: &ParsedRule) {
            AstNode { ast, node }.value();
            for child in &node.children {
                force(ast, child);
            }
        }
        force(&self, &self.root);
        self
    }
}

/// A borrowed view of one tree node; computes text, children, and values on
/// demand.
#[derive(Clone, Copy)]
pub struct AstNode<'a, 'p> {
    ast: &'a Ast<'p>,
    node: &'a ParsedRule,
}

impl<'a, 'p> AstNode<'a, 'p> {
    pub fn parsed(&self) -> &'a ParsedRule {
        self.node
    }

    pub fn rule_id(&self) -> RuleId {
        self.node.rule
    }

    pub fn rule_name(&self) -> String {
        self.ast.parser.rule_display_name(self.node.rule)
    }

    pub fn start(&self) -> usize {
        self.node.start
    }

    pub fn length(&self) -> usize {
        self.node.length
    }

    pub fn is_token(&self) -> bool {
        self.node.is_token()
    }

    pub fn recovered(&self) -> bool {
        self.node.recovered
    }

    pub fn version(&self) -> u32 {
        self.node.version
    }

    pub fn text(&self) -> &'a str {
        &self.ast.input.as_ref()[self.node.start..self.node.end()]
    }

    pub fn intermediate(&self) -> Option<&'a Value> {
        self.node.value.as_ref()
    }

    pub fn child_count(&self) -> usize {
        self.node.children.len()
    }

    pub fn child(&self, index: usize) -> Option<AstNode<'a, 'p>> {
        self.node.children.get(index).map(|node| AstNode {
            ast: self.ast,
            node,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = AstNode<'a, 'p>> + '_ {
        self.node.children.iter().map(|node| AstNode {
            ast: self.ast,
            node,
        })
    }

    /// The node's user value. Computed through the attached factory on
    /// first access and cached on the node.
    pub fn value(&self) -> &'a Value {
        self.node.computed.get_or_init(|| self.compute_value())
    }

    fn compute_value(&self) -> Value {
        let parser = self.ast.parser;
        let rule = parser.rule(self.node.rule);

        let factory = rule.factory.as_ref().or_else(|| match &rule.kind {
            RuleKind::Token(token) => parser.token(*token).default_factory.as_ref(),
            _ => None,
        });

        if let Some(factory) = factory {
            let values: Vec<Value> = self.children().map(|c| c.value().clone()).collect();
            return factory.call(&FactoryArgs {
                text: self.text(),
                values: &values,
                intermediate: self.node.value.as_ref(),
            });
        }

        // Defaults: tokens surface their intermediate value (or raw text);
        // single-child composites pass through; wider ones collect a Seq.
        if self.node.is_token() {
            return match &self.node.value {
                Some(value) => value.clone(),
                None => Value::Str(self.text().to_string()),
            };
        }
        match self.node.children.len() {
            0 => self.node.value.clone().unwrap_or(Value::Null),
            1 => self
                .child(0)
                .map(|c| c.value().clone())
                .unwrap_or(Value::Null),
            _ => Value::Seq(self.children().map(|c| c.value().clone()).collect()),
        }
    }
}

impl std::fmt::Debug for AstNode<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AstNode")
            .field("rule", &self.rule_name())
            .field("start", &self.node.start)
            .field("length", &self.node.length)
            .field("children", &self.node.children.len())
            .finish()
    }
}
