//! End-to-end grammars exercising the whole pipeline.

use indexmap::IndexMap;
use indoc::indoc;
use serde_json::json;

use crate::barriers::{IndentMode, IndentTokenizer};
use crate::build::{GrammarBuilder, RecoveryExpr, RuleExpr, TokenExpr};
use crate::errors::ErrorFormatting;
use crate::grammar::{CharPredicate, Parser, SkipStrategy, Value};
use crate::test_utils::{ch, choice, lit, many1, num, r, seq, sep_by, tok, tseq};

#[test]
fn sum_of_two_numbers() {
    let parser = GrammarBuilder::new()
        .token("number", num())
        .rule("op", choice([tok(lit("+")), tok(lit("-"))]))
        .rule("expr", seq([r("number"), r("op"), r("number")]))
        .factory("expr", |args| {
            let a = args.values[0].as_int().unwrap_or(0);
            let b = args.values[2].as_int().unwrap_or(0);
            match args.values[1].as_str() {
                Some("-") => Value::Int(a - b),
                _ => Value::Int(a + b),
            }
        })
        .main_rule("expr")
        .skip_whitespaces()
        .build()
        .unwrap();

    let ast = parser.parse("10 + 15").unwrap();
    assert_eq!(ast.text(), "10 + 15");
    assert_eq!(ast.root().child(0).unwrap().text(), "10");
    assert_eq!(ast.root().child(1).unwrap().text(), "+");
    assert_eq!(ast.root().child(2).unwrap().text(), "15");
    assert_eq!(ast.value(), Value::Int(25));

    let difference = parser.parse("10 - 15").unwrap();
    assert_eq!(difference.value(), Value::Int(-5));
}

fn json_parser() -> Parser {
    let comment = tseq([
        lit("//"),
        TokenExpr::ZeroOrMoreChars(CharPredicate::new(|c| c != '\n')),
    ]);
    let ws_or_comment = TokenExpr::Choice(
        crate::grammar::ChoiceMode::First,
        vec![TokenExpr::Whitespaces, comment],
    );

    GrammarBuilder::new()
        .token(
            "string",
            TokenExpr::Between {
                open: Box::new(ch('"')),
                inner: Box::new(TokenExpr::EscapedTextPrefix {
                    escape: '\\',
                    stop: vec!['"'],
                }),
                close: Box::new(ch('"')),
            },
        )
        .token("number", num())
        .token(
            "true",
            TokenExpr::Return {
                child: Box::new(lit("true")),
                value: Value::Bool(true),
            },
        )
        .token(
            "false",
            TokenExpr::Return {
                child: Box::new(lit("false")),
                value: Value::Bool(false),
            },
        )
        .token(
            "null",
            TokenExpr::Return {
                child: Box::new(lit("null")),
                value: Value::Null,
            },
        )
        .rule(
            "value",
            choice([
                r("object"),
                r("array"),
                r("string"),
                r("number"),
                r("true"),
                r("false"),
                r("null"),
            ]),
        )
        .rule("member", seq([r("string"), tok(ch(':')), r("value")]))
        .factory("member", |args| {
            Value::Seq(vec![args.values[0].clone(), args.values[2].clone()])
        })
        .rule(
            "members",
            RuleExpr::SeparatedRepeat {
                child: Box::new(r("member")),
                separator: Box::new(tok(ch(','))),
                min: 0,
                max: None,
                allow_trailing: true,
                include_separators: false,
            },
        )
        .factory("members", |args| Value::Seq(args.values.to_vec()))
        .rule("object", seq([tok(ch('{')), r("members"), tok(ch('}'))]))
        .factory("object", |args| {
            let mut map = IndexMap::new();
            if let Some(pairs) = args.values[1].as_seq() {
                for pair in pairs {
                    if let (Some(key), Some(value)) =
                        (pair.at(0).and_then(Value::as_str), pair.at(1))
                    {
                        map.insert(key.to_string(), value.clone());
                    }
                }
            }
            Value::Map(map)
        })
        .rule("elements", sep_by(r("value"), tok(ch(',')), 0))
        .factory("elements", |args| Value::Seq(args.values.to_vec()))
        .rule("array", seq([tok(ch('[')), r("elements"), tok(ch(']'))]))
        .factory("array", |args| args.values[1].clone())
        .rule("json", seq([r("value"), tok(TokenExpr::Eof)]))
        .factory("json", |args| args.values[0].clone())
        .main_rule("json")
        .skip(
            RuleExpr::Token(ws_or_comment),
            SkipStrategy::SkipBeforeParsingGreedy,
        )
        .build()
        .unwrap()
}

#[test]
fn json_with_comments() {
    let input = indoc! {r#"
        {
         "name": "config",
         "version": 2,
         "created": "2024-01-15", // creation date
         "tags": ["tag1", "tag2", "tag3"],
         "nested": {
          "value": 123.456
         },
         "active": true
        }
    "#};

    let parser = json_parser();
    let ast = parser.parse(input).unwrap();
    let value = ast.value();
    assert_eq!(value.as_map().map(IndexMap::len), Some(6));
    assert_eq!(value.get("tags").and_then(Value::as_seq).map(<[_]>::len), Some(3));
    assert_eq!(
        value
            .get("nested")
            .and_then(|n| n.get("value"))
            .and_then(Value::as_f64),
        Some(123.456)
    );

    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({
            "name": "config",
            "version": 2,
            "created": "2024-01-15",
            "tags": ["tag1", "tag2", "tag3"],
            "nested": { "value": 123.456 },
            "active": true
        })
    );
}

#[test]
fn invalid_json_reports_the_furthest_group() {
    let input = indoc! {r#"
        {
         "name": "config",
         "version": 2,
         "created": "2024-01-15", // creation date
         "tags": ["tag1", "tag2", "tag3"],,
         "nested": {
          "value": 123.456
         },
         "active": true
        }
    "#};

    let err = json_parser().parse(input).unwrap_err();
    let report = err.report().expect("parse failure carries a report");
    let furthest = report.furthest().expect("at least one group");

    assert_eq!(furthest.line, 5);
    assert_eq!(furthest.column, 35);
    assert!(furthest.expected.iter().any(|e| e == "string"));
    assert!(furthest.expected.iter().any(|e| e == "}"));
}

#[test]
fn indentation_sensitive_grammar() {
    let keyword = |text: &str| TokenExpr::Keyword {
        text: text.to_string(),
        terminator: None,
    };
    let parser = GrammarBuilder::new()
        .tokenizer(IndentTokenizer::new(IndentMode::Hybrid, 4))
        .token("id", TokenExpr::Identifier)
        .rule(
            "assignment",
            seq([r("id"), tok(ch('=')), r("id"), tok(ch(';'))]),
        )
        .rule(
            "def_stmt",
            seq([
                tok(keyword("def")),
                r("id"),
                tok(lit("()")),
                tok(ch(':')),
                r("block"),
            ]),
        )
        .rule(
            "if_stmt",
            seq([tok(keyword("if")), r("id"), tok(ch(':')), r("block")]),
        )
        .rule(
            "block",
            seq([r("INDENT"), many1(r("statement")), r("DEDENT")]),
        )
        .rule(
            "statement",
            choice([r("def_stmt"), r("if_stmt"), r("assignment")]),
        )
        .rule("program", many1(r("statement")))
        .main_rule("program")
        .skip_whitespaces()
        .build()
        .unwrap();

    let input = indoc! {"
        def a():
            b = c;
        a = p;
        if c:
            h = i;
            if b:
                a = aa;
    "};

    let ast = parser.parse(input).unwrap().optimized(Default::default());
    assert_eq!(ast.root().child_count(), 3);

    let kinds: Vec<String> = ast.root().children().map(|c| c.rule_name()).collect();
    assert_eq!(kinds, vec!["def_stmt", "assignment", "if_stmt"]);

    // The inner if sits inside the outer if's block.
    let outer_if = ast.root().child(2).unwrap();
    let block = outer_if.child(3).unwrap();
    assert_eq!(block.rule_name(), "block");
}

#[test]
fn strict_indentation_violations_fail_the_parse() {
    let parser = GrammarBuilder::new()
        .tokenizer(IndentTokenizer::new(IndentMode::Strict, 4))
        .token("id", TokenExpr::Identifier)
        .rule("program", many1(r("id")))
        .main_rule("program")
        .skip_whitespaces()
        .build()
        .unwrap();

    let err = parser.parse("a\n   b\n").unwrap_err();
    let report = err.report().expect("indent violation carries a report");
    assert!(report.message().contains("not a multiple of 4"));
}

#[test]
fn find_all_matches_scans_the_whole_input() {
    let parser = GrammarBuilder::new()
        .token("number", num())
        .rule(
            "price",
            seq([
                tok(lit("Price:")),
                r("number"),
                choice([tok(lit("USD")), tok(lit("EUR"))]),
            ]),
        )
        .main_rule("price")
        .skip_whitespaces()
        .build()
        .unwrap();

    let log = indoc! {"
        2024-01-02 Price: 42.99 USD order shipped
        error: timeout while polling
        2024-01-03 Price: 99.50 EUR refund issued
        some unrelated line
        2024-01-04 Price: 2.50 USD partial delivery
        end of log
    "};

    let matches: Vec<_> = parser.find_all_matches("price", log).unwrap().collect();
    assert_eq!(matches.len(), 3);

    let amounts: Vec<f64> = matches
        .iter()
        .map(|m| m.root().child(1).unwrap().value().as_f64().unwrap())
        .collect();
    assert_eq!(amounts, vec![42.99, 99.50, 2.50]);

    let currencies: Vec<&str> = matches
        .iter()
        .map(|m| m.root().child(2).unwrap().text())
        .collect();
    assert_eq!(currencies, vec!["USD", "EUR", "USD"]);

    // Matches arrive in source order and never overlap.
    let mut last_end = 0;
    for m in &matches {
        assert!(m.root().start() >= last_end);
        last_end = m.root().start() + m.root().length();
    }
}

#[test]
fn recovery_skips_past_anchors() {
    let parser = GrammarBuilder::new()
        .token("id", TokenExpr::Identifier)
        .rule(
            "stmt_end",
            choice([
                tok(ch(';')),
                RuleExpr::Lookahead {
                    child: Box::new(tok(TokenExpr::Eof)),
                    positive: true,
                },
            ]),
        )
        .rule(
            "statement",
            seq([r("id"), tok(ch('=')), r("id"), r("stmt_end")]),
        )
        .recover(
            "statement",
            RecoveryExpr::skip_after(tok(ch(';'))).repeating(),
        )
        .rule("program", many1(r("statement")))
        .main_rule("program")
        .skip_whitespaces()
        .build()
        .unwrap();

    let input = "a = b; c = d garbage ; e = f nonsense ; g = h";
    let ast = parser.parse(input).unwrap();

    assert_eq!(ast.root().child_count(), 4);
    let recovered: Vec<bool> = ast.root().children().map(|c| c.recovered()).collect();
    assert_eq!(recovered, vec![false, true, true, false]);
    assert!(ast.has_recoveries());

    // The recovered spans run through their anchors.
    assert_eq!(ast.root().child(1).unwrap().text(), "c = d garbage ;");
    assert_eq!(ast.root().child(2).unwrap().text(), "e = f nonsense ;");

    let semicolon_groups = ast
        .error_groups()
        .iter()
        .filter(|g| g.expected.iter().any(|e| e == ";"))
        .count();
    assert!(semicolon_groups >= 2, "groups: {:?}", ast.error_groups());
    assert!(ast.relevant_groups().len() >= 2);
    assert!(ast.format_errors().contains("expected"));
}

#[test]
fn stack_traces_name_the_ancestor_chain() {
    let parser = GrammarBuilder::new()
        .rule("pair", seq([tok(lit("a")), tok(lit("b"))]))
        .main_rule("pair")
        .write_stack_trace(true)
        .error_formatting(ErrorFormatting {
            show_stack_traces: true,
            ..Default::default()
        })
        .build()
        .unwrap();

    let err = parser.parse("ax").unwrap_err();
    let report = err.report().unwrap();
    let group = report.furthest().unwrap();
    assert!(!group.stacks.is_empty());
    assert!(group.stacks.iter().any(|chain| chain.iter().any(|n| n == "pair")));
}

#[test]
fn walk_trace_appears_in_the_failure_message() {
    let parser = GrammarBuilder::new()
        .rule("main", tok(lit("expected")))
        .main_rule("main")
        .record_walk_trace(true)
        .error_formatting(ErrorFormatting {
            show_walk_trace: true,
            ..Default::default()
        })
        .build()
        .unwrap();

    let err = parser.parse("other").unwrap_err();
    let message = err.report().unwrap().message().to_string();
    assert!(message.contains("ENTER"), "message: {message}");
    assert!(message.contains("FAIL"), "message: {message}");
}

#[test]
fn successful_text_equals_the_consumed_prefix() {
    let parser = GrammarBuilder::new()
        .token("word", TokenExpr::Identifier)
        .rule("main", many1(r("word")))
        .main_rule("main")
        .skip_whitespaces()
        .build()
        .unwrap();

    let input = "alpha beta gamma";
    let ast = parser.parse(input).unwrap();
    let length = ast.root().length();
    assert_eq!(ast.text(), &input[..length]);
    assert_eq!(ast.text(), input);
}
