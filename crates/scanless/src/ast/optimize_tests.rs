use crate::build::{GrammarBuilder, TokenExpr};
use crate::grammar::Value;
use crate::test_utils::{ch, choice, int, many1, opt, r, seq, tok};

use super::ParseTreeOptimization;

#[test]
fn collapse_replaces_single_child_wrappers() {
    let parser = GrammarBuilder::new()
        .token("num", int())
        .token("word", TokenExpr::Identifier)
        .rule("item", choice([r("num"), r("word")]))
        .rule("main", many1(r("item")))
        .main_rule("main")
        .build()
        .unwrap();

    let plain = parser.parse("42x").unwrap();
    // Unoptimized: repeat -> item (choice) -> token.
    let item = plain.root().child(0).unwrap();
    assert_eq!(item.child_count(), 1);
    assert!(!item.is_token());

    let optimized = parser.parse("42x").unwrap().optimized(Default::default());
    assert_eq!(optimized.root().child_count(), 2);
    let leaf = optimized.root().child(0).unwrap();
    assert!(leaf.is_token());
    assert_eq!(leaf.text(), "42");
}

#[test]
fn collapse_preserves_nodes_with_factories() {
    let parser = GrammarBuilder::new()
        .token("num", int())
        .rule("item", choice([r("num")]))
        .factory("item", |args| {
            Value::Int(args.values[0].as_int().unwrap_or(0) * 2)
        })
        .rule("main", many1(r("item")))
        .main_rule("main")
        .build()
        .unwrap();

    // The factory-bearing choice survives (the repeat wrapper around it
    // collapses) and still computes its value.
    let ast = parser.parse("21").unwrap().optimized(Default::default());
    let item = ast.root();
    assert_eq!(item.child_count(), 1);
    assert_eq!(item.value(), &Value::Int(42));
}

#[test]
fn drop_empty_removes_zero_length_children() {
    let parser = GrammarBuilder::new()
        .token("num", int())
        .rule(
            "main",
            seq([opt(tok(ch('-'))), r("num"), opt(tok(ch('!')))]),
        )
        .main_rule("main")
        .build()
        .unwrap();

    let plain = parser.parse("5").unwrap();
    assert_eq!(plain.root().child_count(), 3);

    let optimized = parser.parse("5").unwrap().optimized(ParseTreeOptimization::DROP_EMPTY);
    assert_eq!(optimized.root().child_count(), 1);
    assert_eq!(optimized.root().child(0).unwrap().text(), "5");
}

#[test]
fn optimization_flags_compose() {
    let parser = GrammarBuilder::new()
        .token("num", int())
        .rule("wrapped", choice([r("num")]))
        .rule("main", seq([opt(tok(ch('-'))), r("wrapped")]))
        .main_rule("main")
        .build()
        .unwrap();

    let none = parser.parse("7").unwrap().optimized(ParseTreeOptimization::NONE);
    assert_eq!(none.root().child_count(), 2);

    // Dropping the empty optional leaves one child, which then collapses
    // all the way down to the token leaf.
    let full = parser.parse("7").unwrap().optimized(Default::default());
    assert!(full.root().is_token());
    assert_eq!(full.root().text(), "7");
}

#[test]
fn precalculated_matches_lazy_values() {
    let parser = GrammarBuilder::new()
        .token("num", int())
        .rule("main", many1(r("num")))
        .main_rule("main")
        .build()
        .unwrap();

    let lazy = parser.parse("1").unwrap();
    let lazy_value = lazy.value();
    let precalculated = parser.parse("1").unwrap().precalculated();
    assert_eq!(precalculated.value(), lazy_value);
}
