//! Token pattern records: the leaves and combinators matched by the
//! scannerless interpreter without a separate lexer phase.

use std::fmt;

use regex_automata::dfa::dense;
use regex_automata::util::syntax;

use super::callbacks::{
    CharPredicate, CustomTokenFn, ParamPredicate, ParamSelector, PassageFn, SpanMapper,
    TextPredicate, ValueFactory, ValueMapper,
};
use super::chars::FirstChars;
use super::rule::ChoiceMode;
use super::settings::RuleSettings;
use super::trie::LiteralTrie;
use super::value::Value;
use super::TokenId;

/// A regex pattern compiled to an anchored dense DFA at build time.
#[derive(Clone)]
pub struct CompiledRegex {
    pattern: String,
    dfa: dense::DFA<Vec<u32>>,
}

impl CompiledRegex {
    pub fn compile(pattern: &str) -> Result<Self, String> {
        let dfa = dense::Builder::new()
            .configure(dense::Config::new().start_kind(regex_automata::dfa::StartKind::Anchored))
            .syntax(syntax::Config::new().multi_line(false))
            .build(pattern)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            pattern: pattern.to_string(),
            dfa,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Anchored match length at the start of `rest`, with the regex
    /// crate's leftmost-first alternation preference.
    pub fn match_len(&self, rest: &str) -> Option<usize> {
        use regex_automata::dfa::Automaton;
        use regex_automata::{Anchored, Input};

        let input = Input::new(rest).anchored(Anchored::Yes);
        self.dfa
            .try_search_fwd(&input)
            .ok()
            .flatten()
            .map(|half| half.offset())
    }
}

impl fmt::Debug for CompiledRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledRegex({:?})", self.pattern)
    }
}

impl PartialEq for CompiledRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for CompiledRegex {}

/// Lexical shape accepted by a `Number` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFlags {
    /// Allow a leading `-` or `+`.
    pub signed: bool,
    /// Allow a `.fraction` part.
    pub fraction: bool,
    /// Allow an `e`/`E` exponent part.
    pub exponent: bool,
}

impl NumberFlags {
    pub const INTEGER: NumberFlags = NumberFlags {
        signed: true,
        fraction: false,
        exponent: false,
    };
    pub const FLOAT: NumberFlags = NumberFlags {
        signed: true,
        fraction: true,
        exponent: true,
    };
}

/// Value type produced by a `Number` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// Always `Value::Int`.
    Integer,
    /// Always `Value::Float`.
    Float,
    /// `Int` when no fraction/exponent matched, `Float` otherwise.
    Auto,
}

/// The tagged union of token pattern behaviours.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // -- leaves -----------------------------------------------------------
    /// Exact text.
    Literal(String),
    /// Exact single character.
    LiteralChar(char),
    /// Longest match among a fixed alternative set, via a prebuilt trie.
    LiteralChoice(LiteralTrie),
    /// Exact text that must not be followed by an identifier-like character.
    /// The terminator predicate accepts characters allowed to follow.
    Keyword {
        text: String,
        terminator: Option<CharPredicate>,
    },
    /// Anchored regex (leftmost-first alternation preference).
    Regex(CompiledRegex),
    /// `[A-Za-z_][A-Za-z0-9_]*`, Unicode letters included.
    Identifier,
    /// Numeric literal per flags; value per kind.
    Number(NumberFlags, NumericKind),
    /// One or more whitespace characters.
    Whitespaces,
    /// `\r\n`, `\n` or `\r`.
    Newline,
    /// Always succeeds, consumes nothing.
    Empty,
    /// Always fails.
    Fail,
    /// Succeeds only at end of input with no pending barrier.
    Eof,
    /// Consumes the pending barrier token with the given alias.
    Barrier(String),
    /// Text run where `escape`+X contributes X; stops before any stop char.
    EscapedTextPrefix { escape: char, stop: Vec<char> },
    /// Text run terminated by a single `stop` char; a doubled stop is a
    /// literal occurrence of it.
    EscapedTextDoubleChars { stop: char },
    /// Raw text until the stop token matches.
    TextUntil {
        stop: TokenId,
        allow_empty: bool,
        consume_stop: bool,
        fail_on_eof: bool,
    },
    /// Maximal non-empty run of characters satisfying the predicate.
    OneOrMoreChars(CharPredicate),
    /// Maximal (possibly empty) run of characters satisfying the predicate.
    ZeroOrMoreChars(CharPredicate),

    // -- combinators ------------------------------------------------------
    /// Contiguous children in order; value via passage (default: Seq).
    Sequence {
        children: Vec<TokenId>,
        passage: Option<PassageFn>,
    },
    Choice {
        mode: ChoiceMode,
        children: Vec<TokenId>,
    },
    Repeat {
        child: TokenId,
        min: u32,
        max: Option<u32>,
        passage: Option<PassageFn>,
    },
    SeparatedRepeat {
        child: TokenId,
        separator: TokenId,
        min: u32,
        max: Option<u32>,
        allow_trailing: bool,
        include_separators: bool,
        passage: Option<PassageFn>,
    },
    /// Child or nothing; on the empty path the value is the fallback.
    Optional {
        child: TokenId,
        fallback: Option<Value>,
    },
    /// Three children; value is the middle one's.
    Between {
        open: TokenId,
        inner: TokenId,
        close: TokenId,
    },
    /// Two children; value is the first one's.
    First { first: TokenId, second: TokenId },
    /// Two children; value is the second one's.
    Second { first: TokenId, second: TokenId },
    Map {
        child: TokenId,
        mapper: ValueMapper,
    },
    MapSpan {
        child: TokenId,
        mapper: SpanMapper,
    },
    /// Parses the child, discards its value, returns a fixed one.
    Return { child: TokenId, value: Value },
    /// Value is the matched text, optionally trimmed.
    CaptureText {
        child: TokenId,
        trim_start: bool,
        trim_end: bool,
    },
    /// Skips ASCII whitespace, then parses the inner token. The skipped run
    /// is part of the match length.
    SkipWhitespaces(TokenId),
    Lookahead {
        child: TokenId,
        positive: bool,
    },
    If {
        predicate: ParamPredicate,
        then_token: TokenId,
        else_token: Option<TokenId>,
    },
    Switch {
        selector: ParamSelector,
        branches: Vec<TokenId>,
        default: Option<TokenId>,
    },
    /// Parses the child, then fails with the message when the predicate
    /// holds on the matched text.
    FailIf {
        child: TokenId,
        predicate: TextPredicate,
        message: String,
    },
    Custom(CustomTokenFn),
}

/// A finalised token record in the flat parser table.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    pub id: TokenId,
    pub kind: TokenKind,
    /// Names that resolved to this token, in declaration order.
    pub aliases: Vec<String>,
    pub first_chars: FirstChars,
    /// Factory applied by the AST layer when the referencing rule has none.
    pub default_factory: Option<ValueFactory>,
    /// Settings inherited by a `Token` rule wrapping this pattern.
    pub default_settings: RuleSettings,
}

impl TokenPattern {
    /// Display name: first alias, else a kind-derived description.
    pub fn display_name(&self) -> String {
        if let Some(alias) = self.aliases.first() {
            return alias.clone();
        }
        self.kind.describe()
    }

    pub fn child_ids(&self) -> Vec<TokenId> {
        self.kind.child_ids()
    }
}

impl TokenKind {
    /// Human-readable expectation text used in error groups.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Literal(text) => text.clone(),
            TokenKind::LiteralChar(c) => c.to_string(),
            TokenKind::LiteralChoice(_) => "one of literals".to_string(),
            TokenKind::Keyword { text, .. } => text.clone(),
            TokenKind::Regex(re) => format!("/{}/", re.pattern()),
            TokenKind::Identifier => "identifier".to_string(),
            TokenKind::Number(..) => "number".to_string(),
            TokenKind::Whitespaces => "whitespace".to_string(),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::Empty => "nothing".to_string(),
            TokenKind::Fail => "unreachable input".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Barrier(alias) => alias.clone(),
            TokenKind::EscapedTextPrefix { .. } | TokenKind::EscapedTextDoubleChars { .. } => {
                "text".to_string()
            }
            TokenKind::TextUntil { .. } => "text".to_string(),
            TokenKind::OneOrMoreChars(_) | TokenKind::ZeroOrMoreChars(_) => {
                "character run".to_string()
            }
            TokenKind::Sequence { .. } => "sequence".to_string(),
            TokenKind::Choice { .. } => "one of alternatives".to_string(),
            TokenKind::Repeat { .. } | TokenKind::SeparatedRepeat { .. } => {
                "repetition".to_string()
            }
            TokenKind::Optional { .. } => "optional".to_string(),
            TokenKind::Between { .. } => "delimited text".to_string(),
            TokenKind::First { .. } | TokenKind::Second { .. } => "sequence".to_string(),
            TokenKind::Map { .. }
            | TokenKind::MapSpan { .. }
            | TokenKind::Return { .. }
            | TokenKind::CaptureText { .. } => "token".to_string(),
            TokenKind::SkipWhitespaces(_) => "token".to_string(),
            TokenKind::Lookahead { .. } => "lookahead".to_string(),
            TokenKind::If { .. } | TokenKind::Switch { .. } => "conditional token".to_string(),
            TokenKind::FailIf { .. } => "token".to_string(),
            TokenKind::Custom(_) => "custom token".to_string(),
        }
    }

    /// Ordered child token ids, for traversal passes.
    pub fn child_ids(&self) -> Vec<TokenId> {
        match self {
            TokenKind::Sequence { children, .. } | TokenKind::Choice { children, .. } => {
                children.clone()
            }
            TokenKind::Repeat { child, .. }
            | TokenKind::Optional { child, .. }
            | TokenKind::Map { child, .. }
            | TokenKind::MapSpan { child, .. }
            | TokenKind::Return { child, .. }
            | TokenKind::CaptureText { child, .. }
            | TokenKind::Lookahead { child, .. }
            | TokenKind::FailIf { child, .. } => vec![*child],
            TokenKind::SkipWhitespaces(child) => vec![*child],
            TokenKind::SeparatedRepeat {
                child, separator, ..
            } => vec![*child, *separator],
            TokenKind::Between { open, inner, close } => vec![*open, *inner, *close],
            TokenKind::First { first, second } | TokenKind::Second { first, second } => {
                vec![*first, *second]
            }
            TokenKind::If {
                then_token,
                else_token,
                ..
            } => {
                let mut ids = vec![*then_token];
                ids.extend(else_token.iter().copied());
                ids
            }
            TokenKind::Switch {
                branches, default, ..
            } => {
                let mut ids = branches.clone();
                ids.extend(default.iter().copied());
                ids
            }
            TokenKind::TextUntil { stop, .. } => vec![*stop],
            _ => Vec::new(),
        }
    }
}
