//! Buildable expression trees: what the user constructs before `build()`
//! freezes them into flat records.
//!
//! These are plain data enums consumed directly by the lowering pass.
//! Expressions reference named definitions by string; inline children stay
//! anonymous and deduplicate structurally. The fluent one-factory-per-kind
//! surface lives outside this crate.

use crate::grammar::{
    CharPredicate, ChoiceMode, CustomRuleFn, CustomTokenFn, NumberFlags, NumericKind,
    ParamPredicate, ParamSelector, PassageFn, SpanMapper, TextPredicate, Value, ValueMapper,
};

/// A buildable rule expression.
#[derive(Debug, Clone)]
pub enum RuleExpr {
    /// Reference by name; resolves against rules first, then tokens.
    Ref(String),
    /// Inline anonymous token.
    Token(TokenExpr),
    Sequence(Vec<RuleExpr>),
    Choice(ChoiceMode, Vec<RuleExpr>),
    Optional(Box<RuleExpr>),
    Repeat {
        child: Box<RuleExpr>,
        min: u32,
        max: Option<u32>,
    },
    SeparatedRepeat {
        child: Box<RuleExpr>,
        separator: Box<RuleExpr>,
        min: u32,
        max: Option<u32>,
        allow_trailing: bool,
        include_separators: bool,
    },
    Lookahead {
        child: Box<RuleExpr>,
        positive: bool,
    },
    If {
        predicate: ParamPredicate,
        then_expr: Box<RuleExpr>,
        else_expr: Option<Box<RuleExpr>>,
    },
    Switch {
        selector: ParamSelector,
        branches: Vec<RuleExpr>,
        default: Option<Box<RuleExpr>>,
    },
    Custom {
        func: CustomRuleFn,
        children: Vec<RuleExpr>,
    },
}

impl From<TokenExpr> for RuleExpr {
    fn from(token: TokenExpr) -> Self {
        RuleExpr::Token(token)
    }
}

impl From<&str> for RuleExpr {
    fn from(name: &str) -> Self {
        RuleExpr::Ref(name.to_string())
    }
}

/// A buildable token expression.
#[derive(Debug, Clone)]
pub enum TokenExpr {
    Ref(String),
    Literal(String),
    LiteralChar(char),
    LiteralChoice {
        alternatives: Vec<String>,
        case_insensitive: bool,
    },
    Keyword {
        text: String,
        terminator: Option<CharPredicate>,
    },
    Regex(String),
    Identifier,
    Number(NumberFlags, NumericKind),
    Whitespaces,
    Newline,
    Empty,
    Fail,
    Eof,
    Barrier(String),
    EscapedTextPrefix {
        escape: char,
        stop: Vec<char>,
    },
    EscapedTextDoubleChars {
        stop: char,
    },
    TextUntil {
        stop: Box<TokenExpr>,
        allow_empty: bool,
        consume_stop: bool,
        fail_on_eof: bool,
    },
    OneOrMoreChars(CharPredicate),
    ZeroOrMoreChars(CharPredicate),
    Sequence {
        children: Vec<TokenExpr>,
        passage: Option<PassageFn>,
    },
    Choice(ChoiceMode, Vec<TokenExpr>),
    Repeat {
        child: Box<TokenExpr>,
        min: u32,
        max: Option<u32>,
        passage: Option<PassageFn>,
    },
    SeparatedRepeat {
        child: Box<TokenExpr>,
        separator: Box<TokenExpr>,
        min: u32,
        max: Option<u32>,
        allow_trailing: bool,
        include_separators: bool,
        passage: Option<PassageFn>,
    },
    Optional {
        child: Box<TokenExpr>,
        fallback: Option<Value>,
    },
    Between {
        open: Box<TokenExpr>,
        inner: Box<TokenExpr>,
        close: Box<TokenExpr>,
    },
    First {
        first: Box<TokenExpr>,
        second: Box<TokenExpr>,
    },
    Second {
        first: Box<TokenExpr>,
        second: Box<TokenExpr>,
    },
    Map {
        child: Box<TokenExpr>,
        mapper: ValueMapper,
    },
    MapSpan {
        child: Box<TokenExpr>,
        mapper: SpanMapper,
    },
    Return {
        child: Box<TokenExpr>,
        value: Value,
    },
    CaptureText {
        child: Box<TokenExpr>,
        trim_start: bool,
        trim_end: bool,
    },
    SkipWhitespaces(Box<TokenExpr>),
    Lookahead {
        child: Box<TokenExpr>,
        positive: bool,
    },
    If {
        predicate: ParamPredicate,
        then_token: Box<TokenExpr>,
        else_token: Option<Box<TokenExpr>>,
    },
    Switch {
        selector: ParamSelector,
        branches: Vec<TokenExpr>,
        default: Option<Box<TokenExpr>>,
    },
    FailIf {
        child: Box<TokenExpr>,
        predicate: TextPredicate,
        message: String,
    },
    Custom(CustomTokenFn),
}

impl From<&str> for TokenExpr {
    fn from(name: &str) -> Self {
        TokenExpr::Ref(name.to_string())
    }
}
