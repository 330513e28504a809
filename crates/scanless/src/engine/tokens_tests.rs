use crate::build::{GrammarBuilder, TokenExpr};
use crate::grammar::{
    CharPredicate, ChoiceMode, CustomTokenFn, ParamPredicate, Parser, SpanMapper, TextPredicate,
    Value, ValueMapper,
};
use crate::test_utils::{ch, int, lit, num, tseq};

fn single_token(expr: TokenExpr) -> Parser {
    GrammarBuilder::new()
        .token("t", expr)
        .build()
        .expect("grammar builds")
}

fn match_len(expr: TokenExpr, input: &str) -> Option<usize> {
    single_token(expr).matches_token("t", input)
}

fn match_value(expr: TokenExpr, input: &str) -> Option<Value> {
    single_token(expr)
        .try_match_token("t", input, None)
        .ok()
        .and_then(|m| m.value)
}

#[test]
fn literal_and_char() {
    assert_eq!(match_len(lit("let"), "let x"), Some(3));
    assert_eq!(match_len(lit("let"), "lex"), None);
    assert_eq!(match_len(ch('+'), "+1"), Some(1));
    assert_eq!(match_len(ch('+'), "-1"), None);
}

#[test]
fn keyword_requires_a_terminator() {
    let kw = || TokenExpr::Keyword {
        text: "if".to_string(),
        terminator: None,
    };
    assert_eq!(match_len(kw(), "if x"), Some(2));
    assert_eq!(match_len(kw(), "if"), Some(2));
    assert_eq!(match_len(kw(), "iffy"), None);
    assert_eq!(match_len(kw(), "if("), Some(2));
}

#[test]
fn identifier_shape() {
    assert_eq!(match_len(TokenExpr::Identifier, "_x9 rest"), Some(3));
    assert_eq!(match_len(TokenExpr::Identifier, "9x"), None);
    assert_eq!(
        match_value(TokenExpr::Identifier, "abc def"),
        Some(Value::Str("abc".into()))
    );
}

#[test]
fn number_values_follow_the_matched_shape() {
    assert_eq!(match_value(num(), "42"), Some(Value::Int(42)));
    assert_eq!(match_value(num(), "42.5"), Some(Value::Float(42.5)));
    assert_eq!(match_value(num(), "-3"), Some(Value::Int(-3)));
    assert_eq!(match_value(num(), "1e3"), Some(Value::Float(1000.0)));
    // The fraction needs a digit after the dot; the dot stays unconsumed.
    assert_eq!(match_len(num(), "1."), Some(1));
    assert_eq!(match_len(num(), "x"), None);
}

#[test]
fn integer_token_leaves_fraction_alone() {
    assert_eq!(match_len(int(), "12.5"), Some(2));
    assert_eq!(match_value(int(), "-7"), Some(Value::Int(-7)));
}

#[test]
fn regex_matches_anchored_at_the_cursor() {
    let re = |pattern: &str| TokenExpr::Regex(pattern.to_string());
    assert_eq!(match_len(re("[a-z]+"), "abc1"), Some(3));
    assert_eq!(match_len(re("[a-z]+"), "1abc"), None);
    // Alternation keeps the regex crate's leftmost-first preference.
    assert_eq!(match_len(re("ab|a"), "ab"), Some(2));
    assert_eq!(match_len(re("[0-9]{2}"), "123"), Some(2));
}

#[test]
fn whitespaces_and_newline() {
    assert_eq!(match_len(TokenExpr::Whitespaces, "  \t x"), Some(4));
    assert_eq!(match_len(TokenExpr::Whitespaces, "x"), None);
    assert_eq!(match_len(TokenExpr::Newline, "\r\nx"), Some(2));
    assert_eq!(match_len(TokenExpr::Newline, "\nx"), Some(1));
}

#[test]
fn eof_only_at_end() {
    assert_eq!(match_len(TokenExpr::Eof, ""), Some(0));
    assert_eq!(match_len(TokenExpr::Eof, "x"), None);
}

#[test]
fn escaped_text_prefix_unescapes() {
    let expr = TokenExpr::EscapedTextPrefix {
        escape: '\\',
        stop: vec!['"'],
    };
    assert_eq!(
        match_value(expr.clone(), r#"he said \"hi\"" rest"#),
        Some(Value::Str(r#"he said "hi""#.into()))
    );
    // The stop character itself is left unconsumed.
    assert_eq!(match_len(expr, r#"ab"cd"#), Some(2));
}

#[test]
fn escaped_text_double_chars() {
    let expr = TokenExpr::EscapedTextDoubleChars { stop: '"' };
    assert_eq!(
        match_value(expr, r#"a""b" rest"#),
        Some(Value::Str(r#"a"b"#.into()))
    );
}

#[test]
fn text_until_stops_before_the_stop_token() {
    let expr = TokenExpr::TextUntil {
        stop: Box::new(lit("-->")),
        allow_empty: true,
        consume_stop: false,
        fail_on_eof: false,
    };
    assert_eq!(
        match_value(expr, "comment text--> tail"),
        Some(Value::Str("comment text".into()))
    );
}

#[test]
fn text_until_can_consume_the_stop_and_fail_on_eof() {
    let consuming = TokenExpr::TextUntil {
        stop: Box::new(lit(";")),
        allow_empty: false,
        consume_stop: true,
        fail_on_eof: false,
    };
    assert_eq!(match_len(consuming, "ab;c"), Some(3));

    let strict = TokenExpr::TextUntil {
        stop: Box::new(lit(";")),
        allow_empty: true,
        consume_stop: false,
        fail_on_eof: true,
    };
    assert_eq!(match_len(strict, "abc"), None);
}

#[test]
fn char_runs() {
    let hex = TokenExpr::OneOrMoreChars(CharPredicate::new(|c| c.is_ascii_hexdigit()));
    assert_eq!(match_len(hex.clone(), "1a2fz"), Some(4));
    assert_eq!(match_len(hex, "z"), None);
    let any = TokenExpr::ZeroOrMoreChars(CharPredicate::new(|c| c.is_ascii_digit()));
    assert_eq!(match_len(any, "x"), Some(0));
}

#[test]
fn sequence_is_contiguous() {
    let expr = tseq([lit("a"), lit("b")]);
    assert_eq!(match_len(expr.clone(), "ab"), Some(2));
    assert_eq!(match_len(expr, "a b"), None);
}

#[test]
fn choice_modes_over_tokens() {
    let first = TokenExpr::Choice(ChoiceMode::First, vec![lit("a"), lit("ab")]);
    assert_eq!(match_len(first, "ab"), Some(1));

    let longest = TokenExpr::Choice(ChoiceMode::Longest, vec![lit("a"), lit("ab")]);
    assert_eq!(match_len(longest, "ab"), Some(2));

    let shortest = TokenExpr::Choice(ChoiceMode::Shortest, vec![lit("ab"), lit("a")]);
    assert_eq!(match_len(shortest, "ab"), Some(1));
}

#[test]
fn repeat_bounds() {
    let expr = TokenExpr::Repeat {
        child: Box::new(lit("ab")),
        min: 2,
        max: Some(3),
        passage: None,
    };
    assert_eq!(match_len(expr.clone(), "ab"), None);
    assert_eq!(match_len(expr.clone(), "abab"), Some(4));
    assert_eq!(match_len(expr, "abababab"), Some(6));
}

#[test]
fn between_keeps_the_middle_value() {
    let expr = TokenExpr::Between {
        open: Box::new(ch('(')),
        inner: Box::new(TokenExpr::Identifier),
        close: Box::new(ch(')')),
    };
    assert_eq!(match_value(expr, "(abc)"), Some(Value::Str("abc".into())));
}

#[test]
fn map_and_map_span_and_return() {
    let mapped = TokenExpr::Map {
        child: Box::new(TokenExpr::Identifier),
        mapper: ValueMapper::new(|v| match v {
            Value::Str(s) => Value::Int(s.len() as i64),
            other => other,
        }),
    };
    assert_eq!(match_value(mapped, "abcd"), Some(Value::Int(4)));

    let spanned = TokenExpr::MapSpan {
        child: Box::new(tseq([ch('#'), TokenExpr::Identifier])),
        mapper: SpanMapper::new(|text| Value::Str(text.to_uppercase())),
    };
    assert_eq!(match_value(spanned, "#ab"), Some(Value::Str("#AB".into())));

    let fixed = TokenExpr::Return {
        child: Box::new(lit("true")),
        value: Value::Bool(true),
    };
    assert_eq!(match_value(fixed, "true"), Some(Value::Bool(true)));
}

#[test]
fn capture_text_trims_when_asked() {
    let expr = TokenExpr::CaptureText {
        child: Box::new(TokenExpr::ZeroOrMoreChars(CharPredicate::new(|c| c != ';'))),
        trim_start: true,
        trim_end: true,
    };
    assert_eq!(
        match_value(expr, "  padded text  ;"),
        Some(Value::Str("padded text".into()))
    );
}

#[test]
fn skip_whitespaces_extends_the_match() {
    let expr = TokenExpr::SkipWhitespaces(Box::new(TokenExpr::Identifier));
    assert_eq!(match_len(expr, "   abc"), Some(6));
}

#[test]
fn token_lookahead_consumes_nothing() {
    let expr = tseq([
        TokenExpr::Lookahead {
            child: Box::new(lit("ab")),
            positive: true,
        },
        lit("abc"),
    ]);
    assert_eq!(match_len(expr, "abc"), Some(3));

    let negative = tseq([
        TokenExpr::Lookahead {
            child: Box::new(lit("x")),
            positive: false,
        },
        lit("abc"),
    ]);
    assert_eq!(match_len(negative, "abc"), Some(3));
}

#[test]
fn fail_if_rejects_by_text() {
    let expr = TokenExpr::FailIf {
        child: Box::new(TokenExpr::Identifier),
        predicate: TextPredicate::new(|text| text == "reserved"),
        message: "reserved word".to_string(),
    };
    assert_eq!(match_len(expr.clone(), "normal"), Some(6));
    assert_eq!(match_len(expr, "reserved"), None);
}

#[test]
fn optional_fallback_value() {
    let expr = TokenExpr::Optional {
        child: Box::new(lit("-")),
        fallback: Some(Value::Str("+".into())),
    };
    assert_eq!(match_value(expr.clone(), "-x"), Some(Value::Str("-".into())));
    assert_eq!(match_value(expr, "x"), Some(Value::Str("+".into())));
}

#[test]
fn custom_token_matcher() {
    let expr = TokenExpr::Custom(CustomTokenFn::new(|rest, _| {
        let len = rest.bytes().take_while(|b| *b == b'z').count();
        (len > 0).then_some((len, Some(Value::Int(len as i64))))
    }));
    assert_eq!(match_value(expr.clone(), "zzz!"), Some(Value::Int(3)));
    assert_eq!(match_len(expr, "a"), None);
}

#[test]
fn parameter_dispatch_in_tokens() {
    let expr = TokenExpr::If {
        predicate: ParamPredicate::new(|p| p.and_then(Value::as_bool).unwrap_or(false)),
        then_token: Box::new(lit("yes")),
        else_token: Some(Box::new(lit("no"))),
    };
    let parser = single_token(expr);
    assert!(parser
        .try_match_token("t", "yes", Some(Value::Bool(true)))
        .is_ok());
    assert!(parser
        .try_match_token("t", "no", Some(Value::Bool(false)))
        .is_ok());
    assert!(parser
        .try_match_token("t", "yes", Some(Value::Bool(false)))
        .is_err());
}

#[test]
fn try_match_token_is_idempotent() {
    let parser = single_token(num());
    let first = parser.try_match_token("t", "12.5 rest", None).unwrap();
    let second = parser.try_match_token("t", "12.5 rest", None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.length, 4);
    assert_eq!(first.text, "12.5");
    assert_eq!(first.value, Some(Value::Float(12.5)));
}
