//! Token pattern matching: the character-consuming leaves and the
//! contiguous combinators above them.
//!
//! `match_token` consumes input on success (cursor and barrier index move)
//! and restores the cursor exactly on failure. Intermediate values are only
//! computed when `calc` is set; validation-only entry points pass `false`.

use crate::grammar::{ChoiceMode, NumberFlags, NumericKind, TokenId, TokenKind, Value};

use super::context::{Context, Fail, ParseOutcome};

impl Context<'_, '_> {
    pub(crate) fn match_token(
        &mut self,
        id: TokenId,
        ignore_barriers: bool,
        calc: bool,
    ) -> ParseOutcome<Option<Value>> {
        self.consume_fuel()?;
        let token = self.parser.token(id);
        let start = self.checkpoint();

        let result = self.match_kind(&token.kind, ignore_barriers, calc);
        if result.is_err() {
            self.restore(start);
        }
        result
    }

    fn rest(&self, ignore_barriers: bool) -> &str {
        &self.input[self.pos..self.bound(ignore_barriers)]
    }

    fn match_kind(
        &mut self,
        kind: &TokenKind,
        ignore: bool,
        calc: bool,
    ) -> ParseOutcome<Option<Value>> {
        match kind {
            TokenKind::Literal(text) => {
                if !self.rest(ignore).starts_with(text.as_str()) {
                    return Err(Fail::Mismatch);
                }
                self.pos += text.len();
                Ok(calc.then(|| Value::Str(text.clone())))
            }

            TokenKind::LiteralChar(c) => {
                if self.rest(ignore).chars().next() != Some(*c) {
                    return Err(Fail::Mismatch);
                }
                self.pos += c.len_utf8();
                Ok(calc.then(|| Value::Char(*c)))
            }

            TokenKind::LiteralChoice(trie) => {
                let Some((len, _)) = trie.longest_match(self.rest(ignore)) else {
                    return Err(Fail::Mismatch);
                };
                if len == 0 {
                    return Err(Fail::Mismatch);
                }
                let text = &self.input[self.pos..self.pos + len];
                let value = calc.then(|| Value::Str(text.to_string()));
                self.pos += len;
                Ok(value)
            }

            TokenKind::Keyword { text, terminator } => {
                let rest = self.rest(ignore);
                if !rest.starts_with(text.as_str()) {
                    return Err(Fail::Mismatch);
                }
                if let Some(next) = rest[text.len()..].chars().next() {
                    let allowed = match terminator {
                        Some(predicate) => predicate.call(next),
                        None => !next.is_alphanumeric() && next != '_',
                    };
                    if !allowed {
                        return Err(Fail::Mismatch);
                    }
                }
                self.pos += text.len();
                Ok(calc.then(|| Value::Str(text.clone())))
            }

            TokenKind::Regex(re) => {
                let Some(len) = re.match_len(self.rest(ignore)) else {
                    return Err(Fail::Mismatch);
                };
                let text = &self.input[self.pos..self.pos + len];
                let value = calc.then(|| Value::Str(text.to_string()));
                self.pos += len;
                Ok(value)
            }

            TokenKind::Identifier => {
                let rest = self.rest(ignore);
                let mut chars = rest.chars();
                let Some(first) = chars.next() else {
                    return Err(Fail::Mismatch);
                };
                if !first.is_alphabetic() && first != '_' {
                    return Err(Fail::Mismatch);
                }
                let mut len = first.len_utf8();
                for c in chars {
                    if !c.is_alphanumeric() && c != '_' {
                        break;
                    }
                    len += c.len_utf8();
                }
                let text = &self.input[self.pos..self.pos + len];
                let value = calc.then(|| Value::Str(text.to_string()));
                self.pos += len;
                Ok(value)
            }

            TokenKind::Number(flags, numeric) => self.match_number(*flags, *numeric, ignore, calc),

            TokenKind::Whitespaces => {
                let len: usize = self
                    .rest(ignore)
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .map(char::len_utf8)
                    .sum();
                if len == 0 {
                    return Err(Fail::Mismatch);
                }
                self.pos += len;
                Ok(None)
            }

            TokenKind::Newline => {
                let rest = self.rest(ignore);
                let len = if rest.starts_with("\r\n") {
                    2
                } else if rest.starts_with('\n') || rest.starts_with('\r') {
                    1
                } else {
                    return Err(Fail::Mismatch);
                };
                self.pos += len;
                Ok(None)
            }

            TokenKind::Empty => Ok(None),

            TokenKind::Fail => Err(Fail::Mismatch),

            TokenKind::Eof => {
                if self.pos == self.input.len() && (ignore || self.pending_barrier().is_none()) {
                    Ok(None)
                } else {
                    Err(Fail::Mismatch)
                }
            }

            TokenKind::Barrier(alias) => {
                if ignore {
                    return Err(Fail::Mismatch);
                }
                let Some(barrier) = self.pending_barrier() else {
                    return Err(Fail::Mismatch);
                };
                if barrier.position != self.pos || barrier.alias != *alias {
                    return Err(Fail::Mismatch);
                }
                let length = barrier.length;
                self.passed_barriers += 1;
                self.pos += length;
                Ok(calc.then(|| Value::Str(alias.clone())))
            }

            TokenKind::EscapedTextPrefix { escape, stop } => {
                let rest = self.rest(ignore);
                let mut unescaped = String::new();
                let mut chars = rest.chars();
                let mut len = 0usize;
                while let Some(c) = chars.clone().next() {
                    if stop.contains(&c) {
                        break;
                    }
                    chars.next();
                    if c == *escape {
                        let Some(escaped) = chars.next() else {
                            return Err(Fail::Mismatch);
                        };
                        len += c.len_utf8() + escaped.len_utf8();
                        if calc {
                            unescaped.push(escaped);
                        }
                    } else {
                        len += c.len_utf8();
                        if calc {
                            unescaped.push(c);
                        }
                    }
                }
                self.pos += len;
                Ok(calc.then(|| Value::Str(unescaped)))
            }

            TokenKind::EscapedTextDoubleChars { stop } => {
                let rest = self.rest(ignore);
                let mut unescaped = String::new();
                let mut chars = rest.chars().peekable();
                let mut len = 0usize;
                while let Some(&c) = chars.peek() {
                    if c == *stop {
                        let mut ahead = chars.clone();
                        ahead.next();
                        if ahead.peek() == Some(stop) {
                            chars.next();
                            chars.next();
                            len += 2 * c.len_utf8();
                            if calc {
                                unescaped.push(c);
                            }
                            continue;
                        }
                        break;
                    }
                    chars.next();
                    len += c.len_utf8();
                    if calc {
                        unescaped.push(c);
                    }
                }
                self.pos += len;
                Ok(calc.then(|| Value::Str(unescaped)))
            }

            TokenKind::TextUntil {
                stop,
                allow_empty,
                consume_stop,
                fail_on_eof,
            } => {
                let start = self.pos;
                loop {
                    let before_stop = self.checkpoint();
                    self.begin_speculation();
                    let stopped = self.match_token(*stop, ignore, false);
                    self.end_speculation();
                    match stopped {
                        Ok(_) => {
                            let text_end = before_stop.0;
                            if !*consume_stop {
                                self.restore(before_stop);
                            }
                            if text_end == start && !allow_empty {
                                return Err(Fail::Mismatch);
                            }
                            let text = &self.input[start..text_end];
                            return Ok(calc.then(|| Value::Str(text.to_string())));
                        }
                        Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                        Err(Fail::Mismatch) => {
                            if !self.advance_char(ignore) {
                                if *fail_on_eof {
                                    return Err(Fail::Mismatch);
                                }
                                if self.pos == start && !allow_empty {
                                    return Err(Fail::Mismatch);
                                }
                                let text = &self.input[start..self.pos];
                                return Ok(calc.then(|| Value::Str(text.to_string())));
                            }
                        }
                    }
                }
            }

            TokenKind::OneOrMoreChars(predicate) => {
                let len = self.char_run(predicate, ignore);
                if len == 0 {
                    return Err(Fail::Mismatch);
                }
                let text = &self.input[self.pos..self.pos + len];
                let value = calc.then(|| Value::Str(text.to_string()));
                self.pos += len;
                Ok(value)
            }

            TokenKind::ZeroOrMoreChars(predicate) => {
                let len = self.char_run(predicate, ignore);
                let text = &self.input[self.pos..self.pos + len];
                let value = calc.then(|| Value::Str(text.to_string()));
                self.pos += len;
                Ok(value)
            }

            TokenKind::Sequence { children, passage } => {
                let start = self.checkpoint();
                let mut values = Vec::new();
                for &child in children {
                    match self.match_token(child, ignore, calc) {
                        Ok(value) => values.push(value.unwrap_or(Value::Null)),
                        Err(e) => {
                            self.restore(start);
                            return Err(e);
                        }
                    }
                }
                Ok(calc.then(|| combine(passage.as_ref(), values)))
            }

            TokenKind::Choice { mode, children } => {
                self.match_token_choice(*mode, children, ignore, calc)
            }

            TokenKind::Repeat {
                child,
                min,
                max,
                passage,
            } => {
                let start = self.checkpoint();
                let mut values = Vec::new();
                loop {
                    if let Some(max) = max
                        && values.len() as u32 >= *max
                    {
                        break;
                    }
                    let before = self.checkpoint();
                    match self.match_token(*child, ignore, calc) {
                        Ok(value) => {
                            values.push(value.unwrap_or(Value::Null));
                            // A zero-width match would repeat forever.
                            if self.pos == before.0 && self.passed_barriers == before.1 {
                                break;
                            }
                        }
                        Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                        Err(Fail::Mismatch) => break,
                    }
                }
                if (values.len() as u32) < *min {
                    self.restore(start);
                    return Err(Fail::Mismatch);
                }
                Ok(calc.then(|| combine(passage.as_ref(), values)))
            }

            TokenKind::SeparatedRepeat {
                child,
                separator,
                min,
                max,
                allow_trailing,
                include_separators,
                passage,
            } => self.match_token_separated(
                *child,
                *separator,
                *min,
                *max,
                *allow_trailing,
                *include_separators,
                passage.as_ref(),
                ignore,
                calc,
            ),

            TokenKind::Optional { child, fallback } => {
                match self.match_token(*child, ignore, calc) {
                    Ok(value) => Ok(value),
                    Err(Fail::Fatal(e)) => Err(Fail::Fatal(e)),
                    Err(Fail::Mismatch) => {
                        Ok(calc.then(|| fallback.clone().unwrap_or(Value::Null)))
                    }
                }
            }

            TokenKind::Between { open, inner, close } => {
                let start = self.checkpoint();
                let result = (|ctx: &mut Self| {
                    ctx.match_token(*open, ignore, false)?;
                    let value = ctx.match_token(*inner, ignore, calc)?;
                    ctx.match_token(*close, ignore, false)?;
                    Ok(value)
                })(self);
                if result.is_err() {
                    self.restore(start);
                }
                result
            }

            TokenKind::First { first, second } => {
                let start = self.checkpoint();
                let result = (|ctx: &mut Self| {
                    let value = ctx.match_token(*first, ignore, calc)?;
                    ctx.match_token(*second, ignore, false)?;
                    Ok(value)
                })(self);
                if result.is_err() {
                    self.restore(start);
                }
                result
            }

            TokenKind::Second { first, second } => {
                let start = self.checkpoint();
                let result = (|ctx: &mut Self| {
                    ctx.match_token(*first, ignore, false)?;
                    ctx.match_token(*second, ignore, calc)
                })(self);
                if result.is_err() {
                    self.restore(start);
                }
                result
            }

            TokenKind::Map { child, mapper } => {
                let value = self.match_token(*child, ignore, calc)?;
                Ok(if calc {
                    Some(mapper.call(value.unwrap_or(Value::Null)))
                } else {
                    None
                })
            }

            TokenKind::MapSpan { child, mapper } => {
                let start = self.pos;
                self.match_token(*child, ignore, false)?;
                Ok(calc.then(|| mapper.call(&self.input[start..self.pos])))
            }

            TokenKind::Return { child, value } => {
                self.match_token(*child, ignore, false)?;
                Ok(calc.then(|| value.clone()))
            }

            TokenKind::CaptureText {
                child,
                trim_start,
                trim_end,
            } => {
                let start = self.pos;
                self.match_token(*child, ignore, false)?;
                let mut text = &self.input[start..self.pos];
                if *trim_start {
                    text = text.trim_start();
                }
                if *trim_end {
                    text = text.trim_end();
                }
                Ok(calc.then(|| Value::Str(text.to_string())))
            }

            TokenKind::SkipWhitespaces(inner) => {
                let start = self.checkpoint();
                while matches!(self.peek_char(ignore), Some(' ' | '\t' | '\r' | '\n')) {
                    self.pos += 1;
                }
                match self.match_token(*inner, ignore, calc) {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        self.restore(start);
                        Err(e)
                    }
                }
            }

            TokenKind::Lookahead { child, positive } => {
                let start = self.checkpoint();
                self.begin_speculation();
                let result = self.match_token(*child, ignore, false);
                self.end_speculation();
                self.restore(start);
                match (result, positive) {
                    (Ok(_), true) | (Err(Fail::Mismatch), false) => Ok(None),
                    (Err(Fail::Fatal(e)), _) => Err(Fail::Fatal(e)),
                    _ => Err(Fail::Mismatch),
                }
            }

            TokenKind::If {
                predicate,
                then_token,
                else_token,
            } => {
                let branch = if predicate.call(self.parameter.as_ref()) {
                    Some(*then_token)
                } else {
                    *else_token
                };
                match branch {
                    Some(token) => self.match_token(token, ignore, calc),
                    None => Err(Fail::Mismatch),
                }
            }

            TokenKind::Switch {
                selector,
                branches,
                default,
            } => {
                let branch = selector
                    .call(self.parameter.as_ref())
                    .and_then(|i| branches.get(i).copied())
                    .or(*default);
                match branch {
                    Some(token) => self.match_token(token, ignore, calc),
                    None => Err(Fail::Mismatch),
                }
            }

            TokenKind::FailIf {
                child,
                predicate,
                message,
            } => {
                let start = self.checkpoint();
                let value = self.match_token(*child, ignore, calc)?;
                if predicate.call(&self.input[start.0..self.pos]) {
                    self.restore(start);
                    self.fail_message = Some(message.clone());
                    return Err(Fail::Mismatch);
                }
                Ok(value)
            }

            TokenKind::Custom(func) => {
                let rest = self.rest(ignore);
                let Some((len, value)) = func.call(rest, self.parameter.as_ref()) else {
                    return Err(Fail::Mismatch);
                };
                if len > rest.len() || !self.input.is_char_boundary(self.pos + len) {
                    return Err(Fail::Mismatch);
                }
                self.pos += len;
                Ok(if calc { value } else { None })
            }
        }
    }

    fn match_number(
        &mut self,
        flags: NumberFlags,
        numeric: NumericKind,
        ignore: bool,
        calc: bool,
    ) -> ParseOutcome<Option<Value>> {
        let rest = self.rest(ignore);
        let bytes = rest.as_bytes();
        let mut i = 0usize;

        if flags.signed && matches!(bytes.first(), Some(b'-' | b'+')) {
            i += 1;
        }
        let digits_start = i;
        while matches!(bytes.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        if i == digits_start {
            return Err(Fail::Mismatch);
        }

        let mut is_float = false;
        if flags.fraction
            && bytes.get(i) == Some(&b'.')
            && matches!(bytes.get(i + 1), Some(b'0'..=b'9'))
        {
            is_float = true;
            i += 2;
            while matches!(bytes.get(i), Some(b'0'..=b'9')) {
                i += 1;
            }
        }
        if flags.exponent && matches!(bytes.get(i), Some(b'e' | b'E')) {
            let mut j = i + 1;
            if matches!(bytes.get(j), Some(b'-' | b'+')) {
                j += 1;
            }
            if matches!(bytes.get(j), Some(b'0'..=b'9')) {
                is_float = true;
                i = j;
                while matches!(bytes.get(i), Some(b'0'..=b'9')) {
                    i += 1;
                }
            }
        }

        let text = &rest[..i];
        let value = if calc {
            Some(number_value(text, is_float, numeric))
        } else {
            None
        };
        self.pos += i;
        Ok(value)
    }

    fn match_token_choice(
        &mut self,
        mode: ChoiceMode,
        children: &[TokenId],
        ignore: bool,
        calc: bool,
    ) -> ParseOutcome<Option<Value>> {
        let start = self.checkpoint();
        match mode {
            ChoiceMode::First => {
                for &child in children {
                    match self.match_token(child, ignore, calc) {
                        Ok(value) => return Ok(value),
                        Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                        Err(Fail::Mismatch) => self.restore(start),
                    }
                }
                Err(Fail::Mismatch)
            }
            ChoiceMode::Shortest | ChoiceMode::Longest => {
                let mut best: Option<(usize, usize, Option<Value>)> = None;
                for &child in children {
                    match self.match_token(child, ignore, calc) {
                        Ok(value) => {
                            let len = self.pos - start.0;
                            let better = match (&best, mode) {
                                (None, _) => true,
                                (Some((b, ..)), ChoiceMode::Shortest) => len < *b,
                                (Some((b, ..)), _) => len > *b,
                            };
                            if better {
                                best = Some((len, self.passed_barriers, value));
                            }
                            self.restore(start);
                        }
                        Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                        Err(Fail::Mismatch) => self.restore(start),
                    }
                }
                let Some((len, barriers, value)) = best else {
                    return Err(Fail::Mismatch);
                };
                self.pos = start.0 + len;
                self.passed_barriers = barriers;
                Ok(value)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn match_token_separated(
        &mut self,
        child: TokenId,
        separator: TokenId,
        min: u32,
        max: Option<u32>,
        allow_trailing: bool,
        include_separators: bool,
        passage: Option<&crate::grammar::PassageFn>,
        ignore: bool,
        calc: bool,
    ) -> ParseOutcome<Option<Value>> {
        let start = self.checkpoint();
        let mut values = Vec::new();
        let mut count = 0u32;

        match self.match_token(child, ignore, calc) {
            Ok(value) => {
                values.push(value.unwrap_or(Value::Null));
                count = 1;
            }
            Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
            Err(Fail::Mismatch) => {
                if min >= 1 {
                    return Err(Fail::Mismatch);
                }
                return Ok(calc.then(|| combine(passage, values)));
            }
        }

        loop {
            if let Some(max) = max
                && count >= max
            {
                break;
            }
            let before_sep = self.checkpoint();
            let sep_value = match self.match_token(separator, ignore, calc) {
                Ok(value) => value,
                Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                Err(Fail::Mismatch) => break,
            };
            match self.match_token(child, ignore, calc) {
                Ok(value) => {
                    if include_separators {
                        values.push(sep_value.unwrap_or(Value::Null));
                    }
                    values.push(value.unwrap_or(Value::Null));
                    count += 1;
                }
                Err(Fail::Fatal(e)) => return Err(Fail::Fatal(e)),
                Err(Fail::Mismatch) => {
                    if allow_trailing {
                        if include_separators {
                            values.push(sep_value.unwrap_or(Value::Null));
                        }
                    } else {
                        self.restore(before_sep);
                    }
                    break;
                }
            }
        }

        if count < min {
            self.restore(start);
            return Err(Fail::Mismatch);
        }
        Ok(calc.then(|| combine(passage, values)))
    }

    fn char_run(&self, predicate: &crate::grammar::CharPredicate, ignore: bool) -> usize {
        self.rest(ignore)
            .chars()
            .take_while(|&c| predicate.call(c))
            .map(char::len_utf8)
            .sum()
    }
}

fn combine(passage: Option<&crate::grammar::PassageFn>, values: Vec<Value>) -> Value {
    match passage {
        Some(f) => f.call(values),
        None => Value::Seq(values),
    }
}

fn number_value(text: &str, is_float: bool, numeric: NumericKind) -> Value {
    let float = || text.parse::<f64>().map(Value::Float).unwrap_or(Value::Null);
    match numeric {
        NumericKind::Integer => text.parse::<i64>().map(Value::Int).unwrap_or_else(|_| float()),
        NumericKind::Float => float(),
        NumericKind::Auto => {
            if is_float {
                float()
            } else {
                text.parse::<i64>().map(Value::Int).unwrap_or_else(|_| float())
            }
        }
    }
}
