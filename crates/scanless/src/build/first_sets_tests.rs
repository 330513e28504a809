use crate::build::{GrammarBuilder, TokenExpr};
use crate::grammar::FirstChars;
use crate::test_utils::{ch, choice, lit, num, opt, r, seq, tok};

fn firsts_of(parser: &crate::grammar::Parser, rule: &str) -> FirstChars {
    parser
        .rule(parser.rule_id(rule).unwrap())
        .first_chars
        .clone()
}

#[test]
fn literal_choice_firsts_are_the_union() {
    let parser = GrammarBuilder::new()
        .rule("main", choice([tok(lit("abc")), tok(lit("x"))]))
        .build()
        .unwrap();

    let firsts = firsts_of(&parser, "main");
    assert!(firsts.allows('a'));
    assert!(firsts.allows('x'));
    assert!(!firsts.allows('b'));
}

#[test]
fn sequence_takes_the_nullable_prefix_union() {
    let parser = GrammarBuilder::new()
        .rule("signed", seq([opt(tok(ch('-'))), tok(lit("num"))]))
        .rule("strict", seq([tok(ch('-')), tok(lit("num"))]))
        .build()
        .unwrap();

    // An optional head leaves the set unrestricted.
    assert!(firsts_of(&parser, "signed").is_any());

    let strict = firsts_of(&parser, "strict");
    assert!(strict.allows('-'));
    assert!(!strict.allows('n'));
}

#[test]
fn number_firsts_include_digits_and_signs() {
    let parser = GrammarBuilder::new()
        .token("num", num())
        .rule("main", r("num"))
        .build()
        .unwrap();

    let firsts = firsts_of(&parser, "main");
    assert!(firsts.allows('0'));
    assert!(firsts.allows('9'));
    assert!(firsts.allows('-'));
    assert!(!firsts.allows('a'));
}

#[test]
fn open_ended_tokens_allow_anything() {
    let parser = GrammarBuilder::new()
        .token("id", TokenExpr::Identifier)
        .token("re", TokenExpr::Regex("[0-9]+".to_string()))
        .rule("a", r("id"))
        .rule("b", r("re"))
        .build()
        .unwrap();

    assert!(firsts_of(&parser, "a").is_any());
    assert!(firsts_of(&parser, "b").is_any());
}

#[test]
fn recursive_rules_reach_a_fixpoint() {
    let parser = GrammarBuilder::new()
        .rule(
            "list",
            choice([seq([tok(ch('[')), r("list"), tok(ch(']'))]), tok(ch('x'))]),
        )
        .build()
        .unwrap();

    let firsts = firsts_of(&parser, "list");
    assert!(firsts.allows('['));
    assert!(firsts.allows('x'));
    assert!(!firsts.allows(']'));
}

#[test]
fn pruning_never_changes_the_winner() {
    let grammar = |prune: bool| {
        GrammarBuilder::new()
            .rule(
                "main",
                choice([tok(lit("alpha")), tok(lit("beta")), tok(lit("b"))]),
            )
            .main_rule("main")
            .use_first_character_match(prune)
            .build()
            .unwrap()
    };

    for input in ["alpha", "beta", "b"] {
        let plain = grammar(false).parse(input).unwrap().text().to_string();
        let pruned = grammar(true).parse(input).unwrap().text().to_string();
        assert_eq!(plain, pruned);
    }
}
