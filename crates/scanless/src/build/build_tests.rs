use crate::build::{GrammarBuilder, RuleExpr, TokenExpr};
use crate::grammar::RuleKind;
use crate::test_utils::{ch, choice, int, lit, opt, r, seq, tok};
use crate::Error;

#[test]
fn structurally_equal_rules_share_one_id() {
    let parser = GrammarBuilder::new()
        .rule("a", seq([tok(lit("x")), tok(lit("y"))]))
        .rule("b", seq([tok(lit("x")), tok(lit("y"))]))
        .build()
        .unwrap();

    let a = parser.rule_id("a").unwrap();
    let b = parser.rule_id("b").unwrap();
    assert_eq!(a, b);
    assert_eq!(parser.rule(a).aliases, vec!["a", "b"]);
}

#[test]
fn equal_inline_children_collapse() {
    let parser = GrammarBuilder::new()
        .rule("main", seq([tok(lit("x")), tok(lit("x"))]))
        .main_rule("main")
        .build()
        .unwrap();

    let main = parser.rule_id("main").unwrap();
    let RuleKind::Sequence(children) = &parser.rule(main).kind else {
        panic!("main is a sequence");
    };
    assert_eq!(children[0], children[1]);
}

#[test]
fn attached_settings_keep_rules_distinct() {
    use crate::grammar::{ErrorHandling, RuleSettings};
    let parser = GrammarBuilder::new()
        .rule("a", seq([tok(lit("x"))]))
        .rule("b", seq([tok(lit("x"))]))
        .settings(
            "b",
            RuleSettings::default().with_error_handling(ErrorHandling::NoRecord),
        )
        .build()
        .unwrap();

    assert_ne!(parser.rule_id("a"), parser.rule_id("b"));
}

#[test]
fn pure_reference_definitions_are_aliases() {
    let parser = GrammarBuilder::new()
        .token("x", lit("x"))
        .rule("real", seq([r("x"), r("x")]))
        .rule("alias", r("real"))
        .main_rule("alias")
        .build()
        .unwrap();

    assert_eq!(parser.rule_id("alias"), parser.rule_id("real"));
    assert!(parser.parse("xx").is_ok());
}

#[test]
fn name_cycles_are_rejected_with_the_path() {
    let err = GrammarBuilder::new()
        .rule("a", r("b"))
        .rule("b", r("a"))
        .build()
        .unwrap_err();
    let Error::NameCycle(path) = err else {
        panic!("expected a name cycle");
    };
    assert!(path.contains("a"), "path names the cycle: {path}");
    assert!(path.contains("b"), "path names the cycle: {path}");
}

#[test]
fn unknown_references_are_rejected() {
    let err = GrammarBuilder::new()
        .rule("a", r("missing"))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::UnknownReference(name) if name == "missing"));
}

#[test]
fn trivially_left_recursive_rules_are_rejected() {
    let err = GrammarBuilder::new()
        .token("num", int())
        .rule(
            "expr",
            choice([seq([r("expr"), tok(ch('+')), r("num")]), r("num")]),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::LeftRecursion(path) if path.contains("expr")));
}

#[test]
fn left_recursion_through_a_nullable_prefix_is_rejected() {
    let err = GrammarBuilder::new()
        .rule("s", seq([opt(tok(ch('-'))), r("s"), tok(ch('!'))]))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::LeftRecursion(_)));
}

#[test]
fn right_recursion_is_accepted() {
    let parser = GrammarBuilder::new()
        .token("num", int())
        .rule(
            "list",
            choice([seq([r("num"), tok(ch(',')), r("list")]), r("num")]),
        )
        .build();
    assert!(parser.is_ok());
}

#[test]
fn invalid_repeat_ranges_are_rejected() {
    let err = GrammarBuilder::new()
        .rule(
            "r",
            RuleExpr::Repeat {
                child: Box::new(tok(ch('x'))),
                min: 3,
                max: Some(2),
            },
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRange { min: 3, max: 2 }));
}

#[test]
fn empty_elements_are_rejected() {
    let err = GrammarBuilder::new()
        .rule("r", RuleExpr::Sequence(Vec::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::EmptyElement(_)));

    let err = GrammarBuilder::new()
        .token("t", TokenExpr::Literal(String::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::EmptyElement(_)));
}

#[test]
fn invalid_regexes_are_rejected() {
    let err = GrammarBuilder::new()
        .token("t", TokenExpr::Regex("[".to_string()))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRegex { .. }));
}

#[test]
fn undeclared_barrier_aliases_are_rejected() {
    let err = GrammarBuilder::new()
        .token("t", TokenExpr::Barrier("NOPE".to_string()))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::UnknownBarrierAlias(alias) if alias == "NOPE"));
}

#[test]
fn parse_without_main_rule_fails() {
    let parser = GrammarBuilder::new()
        .rule("r", tok(ch('x')))
        .build()
        .unwrap();
    assert!(matches!(parser.parse("x"), Err(Error::NoMainRule)));
    assert!(parser.parse_named("r", "x").is_ok());
}

#[test]
fn inlining_collapses_single_child_wrappers() {
    let build = |inlining: bool| {
        GrammarBuilder::new()
            .token("x", lit("x"))
            .rule("wrapper", choice([r("x")]))
            .rule("main", seq([r("wrapper"), r("wrapper")]))
            .main_rule("main")
            .use_inlining(inlining)
            .build()
            .unwrap()
    };

    let plain = build(false);
    let inlined = build(true);
    assert!(inlined.rule_count() < plain.rule_count());

    // The wrapper now points straight at the token rule.
    let wrapper = inlined.rule_id("wrapper").unwrap();
    assert!(matches!(inlined.rule(wrapper).kind, RuleKind::Token(_)));
    assert!(inlined
        .rule(wrapper)
        .aliases
        .iter()
        .any(|a| a == "wrapper"));

    assert_eq!(inlined.parse("xx").unwrap().text(), "xx");
}

#[test]
fn dump_lists_the_flat_tables() {
    let parser = GrammarBuilder::new()
        .token("plus", lit("+"))
        .rule("sum", seq([r("plus"), r("plus")]))
        .main_rule("sum")
        .build()
        .unwrap();

    insta::assert_snapshot!(parser.dump().trim_end(), @r#"
    r0 token(t0) first="+"
    r1 seq(r0 r0) as sum first="+"
    t0 + as plus
    main r1
    "#);
}
