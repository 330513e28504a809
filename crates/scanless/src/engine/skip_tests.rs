use crate::build::{GrammarBuilder, RuleExpr, TokenExpr};
use crate::grammar::SkipStrategy;
use crate::test_utils::{ch, r, seq, tok};

fn word_pair(strategy: SkipStrategy) -> crate::grammar::Parser {
    GrammarBuilder::new()
        .token("word", TokenExpr::Identifier)
        .rule("main", seq([r("word"), r("word")]))
        .main_rule("main")
        .skip(RuleExpr::Token(TokenExpr::Whitespaces), strategy)
        .build()
        .unwrap()
}

#[test]
fn no_skipping_requires_adjacency() {
    let parser = GrammarBuilder::new()
        .token("word", TokenExpr::Identifier)
        .rule("main", seq([r("word"), r("word")]))
        .main_rule("main")
        .build()
        .unwrap();
    // One identifier swallows everything; the second has nothing left.
    assert!(parser.parse("ab cd").is_err());
}

#[test]
fn skip_before_parsing_runs_once_between_rules() {
    let parser = word_pair(SkipStrategy::SkipBeforeParsing);
    let ast = parser.parse("ab cd").unwrap();
    assert_eq!(ast.text(), "ab cd");
    assert_eq!(ast.root().child(1).unwrap().text(), "cd");
}

#[test]
fn greedy_skip_consumes_repeated_trivia() {
    // A single-blank skip rule: greedy application crosses several blanks.
    let parser = GrammarBuilder::new()
        .token("word", TokenExpr::Identifier)
        .rule("main", seq([r("word"), r("word")]))
        .main_rule("main")
        .skip(tok(ch(' ')), SkipStrategy::SkipBeforeParsingGreedy)
        .build()
        .unwrap();
    assert!(parser.parse("ab    cd").is_ok());

    let lazy_once = GrammarBuilder::new()
        .token("word", TokenExpr::Identifier)
        .rule("main", seq([r("word"), r("word")]))
        .main_rule("main")
        .skip(tok(ch(' ')), SkipStrategy::SkipBeforeParsing)
        .build()
        .unwrap();
    // One application skips one blank only.
    assert!(lazy_once.parse("ab  cd").is_err());
    assert!(lazy_once.parse("ab cd").is_ok());
}

#[test]
fn lazy_skip_alternates_until_success() {
    let parser = GrammarBuilder::new()
        .token("word", TokenExpr::Identifier)
        .rule("main", seq([r("word"), r("word")]))
        .main_rule("main")
        .skip(tok(ch(' ')), SkipStrategy::TryParseThenSkipLazy)
        .build()
        .unwrap();
    assert!(parser.parse("ab   cd").is_ok());
    assert!(parser.parse("ab cd").is_ok());
    assert!(parser.parse("abcd").is_err());
}

#[test]
fn try_parse_then_skip_retries_once() {
    let parser = word_pair(SkipStrategy::TryParseThenSkip);
    assert!(parser.parse("ab cd").is_ok());
    assert!(parser.parse("abcd").is_err());
}

#[test]
fn optimized_whitespace_fast_path() {
    let parser = GrammarBuilder::new()
        .token("word", TokenExpr::Identifier)
        .rule("main", seq([r("word"), r("word")]))
        .main_rule("main")
        .optimized_whitespace_skip()
        .build()
        .unwrap();
    let ast = parser.parse("ab \t\n cd").unwrap();
    assert_eq!(ast.root().child(1).unwrap().text(), "cd");
}

#[test]
fn skipped_trivia_lands_between_children() {
    let parser = word_pair(SkipStrategy::SkipBeforeParsing);
    let ast = parser.parse("ab cd").unwrap();
    let first = ast.root().child(0).unwrap();
    let second = ast.root().child(1).unwrap();
    // The gap belongs to the parent span, not to either child.
    assert_eq!(first.start() + first.length(), 2);
    assert_eq!(second.start(), 3);
    assert_eq!(ast.root().length(), 5);
}

#[test]
fn skip_rule_failures_record_no_errors() {
    let parser = word_pair(SkipStrategy::SkipBeforeParsing);
    let ast = parser.parse("ab cd").unwrap();
    assert!(ast.error_groups().is_empty());
}
