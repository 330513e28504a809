//! Indentation pre-scan emitting `INDENT`/`DEDENT` (and optionally
//! `NEWLINE`) barrier tokens from leading-whitespace columns.

use super::{BarrierError, BarrierToken, BarrierTokenizer};

pub const INDENT: &str = "INDENT";
pub const DEDENT: &str = "DEDENT";
pub const NEWLINE: &str = "NEWLINE";

/// How columns translate to indentation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentMode {
    /// Columns must be exact multiples of the indent size; anything else is
    /// a positional error.
    Strict,
    /// A stack of seen columns: any strictly greater column opens one
    /// level, dropping below pops one level per entry removed.
    Soft,
    /// Levels are `column / indent_size`; the signed delta becomes a run of
    /// INDENT or DEDENT tokens.
    Hybrid,
}

#[derive(Debug, Clone)]
pub struct IndentTokenizer {
    mode: IndentMode,
    indent_size: u32,
    emit_newlines: bool,
}

impl IndentTokenizer {
    pub fn new(mode: IndentMode, indent_size: u32) -> Self {
        Self {
            mode,
            indent_size: indent_size.max(1),
            emit_newlines: false,
        }
    }

    /// Also emit a `NEWLINE` barrier at the end of each non-blank line.
    pub fn with_newlines(mut self) -> Self {
        self.emit_newlines = true;
        self
    }
}

impl BarrierTokenizer for IndentTokenizer {
    fn aliases(&self) -> Vec<String> {
        let mut aliases = vec![INDENT.to_string(), DEDENT.to_string()];
        if self.emit_newlines {
            aliases.push(NEWLINE.to_string());
        }
        aliases
    }

    fn tokenize(&self, input: &str) -> Result<Vec<BarrierToken>, BarrierError> {
        let mut tokens = Vec::new();
        let mut state = IndentState::new(self.mode, self.indent_size);

        let mut line_start = 0usize;
        while line_start <= input.len() {
            let rest = &input[line_start..];
            let line_end = rest.find('\n').map_or(input.len(), |i| line_start + i);
            let line = &input[line_start..line_end];

            let (column, ws_bytes) = measure_indent(line, self.indent_size);
            let content = &line[ws_bytes..];
            let is_blank = content.trim_end_matches('\r').is_empty();

            if !is_blank {
                let at = line_start + ws_bytes;
                state.advance_to(column, at, &mut tokens)?;
                if self.emit_newlines && line_end < input.len() {
                    tokens.push(BarrierToken {
                        position: line_end,
                        length: 0,
                        alias: NEWLINE.to_string(),
                    });
                }
            }

            if line_end >= input.len() {
                break;
            }
            line_start = line_end + 1;
        }

        state.flush(input.len(), &mut tokens);
        Ok(tokens)
    }
}

/// Column count and byte length of a line's leading whitespace. A tab
/// advances to the next multiple of the indent size.
fn measure_indent(line: &str, indent_size: u32) -> (u32, usize) {
    let mut column = 0u32;
    let mut bytes = 0usize;
    for c in line.chars() {
        match c {
            ' ' => column += 1,
            '\t' => column += indent_size - (column % indent_size),
            _ => break,
        }
        bytes += c.len_utf8();
    }
    (column, bytes)
}

/// Per-scan indentation state for the three modes.
#[derive(Debug)]
enum IndentState {
    /// Current level plus the shared indent size.
    Leveled {
        strict: bool,
        indent_size: u32,
        level: u32,
    },
    /// Stack of seen columns, implicit 0 at the bottom.
    Stacked { columns: Vec<u32> },
}

impl IndentState {
    fn new(mode: IndentMode, indent_size: u32) -> Self {
        match mode {
            IndentMode::Strict => IndentState::Leveled {
                strict: true,
                indent_size,
                level: 0,
            },
            IndentMode::Hybrid => IndentState::Leveled {
                strict: false,
                indent_size,
                level: 0,
            },
            IndentMode::Soft => IndentState::Stacked {
                columns: Vec::new(),
            },
        }
    }

    fn advance_to(
        &mut self,
        column: u32,
        position: usize,
        tokens: &mut Vec<BarrierToken>,
    ) -> Result<(), BarrierError> {
        match self {
            IndentState::Leveled {
                strict,
                indent_size,
                level,
            } => {
                if *strict && column % *indent_size != 0 {
                    return Err(BarrierError {
                        position,
                        message: format!(
                            "indentation of {column} columns is not a multiple of {indent_size}"
                        ),
                    });
                }
                let new_level = column / *indent_size;
                emit_delta(*level, new_level, position, tokens);
                *level = new_level;
            }
            IndentState::Stacked { columns } => {
                let top = columns.last().copied().unwrap_or(0);
                if column > top {
                    columns.push(column);
                    tokens.push(barrier(INDENT, position));
                } else if column < top {
                    while columns.last().copied().unwrap_or(0) > column {
                        columns.pop();
                        tokens.push(barrier(DEDENT, position));
                    }
                }
            }
        }
        Ok(())
    }

    /// Close every still-open level at end of input.
    fn flush(&mut self, position: usize, tokens: &mut Vec<BarrierToken>) {
        match self {
            IndentState::Leveled { level, .. } => {
                emit_delta(*level, 0, position, tokens);
                *level = 0;
            }
            IndentState::Stacked { columns } => {
                for _ in columns.drain(..) {
                    tokens.push(barrier(DEDENT, position));
                }
            }
        }
    }
}

fn emit_delta(from: u32, to: u32, position: usize, tokens: &mut Vec<BarrierToken>) {
    if to > from {
        for _ in from..to {
            tokens.push(barrier(INDENT, position));
        }
    } else {
        for _ in to..from {
            tokens.push(barrier(DEDENT, position));
        }
    }
}

fn barrier(alias: &str, position: usize) -> BarrierToken {
    BarrierToken {
        position,
        length: 0,
        alias: alias.to_string(),
    }
}
