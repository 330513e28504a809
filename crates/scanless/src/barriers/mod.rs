//! Barrier tokens: synthetic markers pre-scanned before parsing.
//!
//! A barrier blocks all consumption past its position until the grammar
//! explicitly consumes it through a `Barrier(alias)` token pattern.

mod indent;

#[cfg(test)]
mod indent_tests;

pub use indent::{IndentMode, IndentTokenizer};

/// A synthetic marker emitted by a pre-scan phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierToken {
    pub position: usize,
    pub length: usize,
    pub alias: String,
}

/// A positional failure produced while tokenizing (e.g. a strict-mode
/// indent violation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierError {
    pub position: usize,
    pub message: String,
}

/// A pre-scan pass producing barrier tokens for one concern.
///
/// Each tokenizer declares the aliases it may emit; the builder installs a
/// `Barrier(alias)` leaf token for every declared alias.
pub trait BarrierTokenizer: std::fmt::Debug + Send + Sync {
    fn aliases(&self) -> Vec<String>;

    fn tokenize(&self, input: &str) -> Result<Vec<BarrierToken>, BarrierError>;
}

/// The barriers pending at one position: a multi-level indent delta emits
/// its whole run here, consumed token by token in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierRun {
    position: usize,
    tokens: Vec<BarrierToken>,
}

impl BarrierRun {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn tokens(&self) -> &[BarrierToken] {
        &self.tokens
    }
}

/// The merged barrier stream for one input, keyed by strictly-increasing
/// run positions. Consumption is tracked by a flat token index that walks
/// each run in order before moving to the next position.
#[derive(Debug, Clone, Default)]
pub struct BarrierTable {
    runs: Vec<BarrierRun>,
    /// Flat index of each run's first token.
    starts: Vec<usize>,
    total: usize,
}

impl BarrierTable {
    pub fn build(
        tokenizers: &[std::sync::Arc<dyn BarrierTokenizer>],
        input: &str,
    ) -> Result<Self, BarrierError> {
        let mut tokens = Vec::new();
        for tokenizer in tokenizers {
            tokens.extend(tokenizer.tokenize(input)?);
        }
        tokens.sort_by_key(|t| t.position);

        let mut runs: Vec<BarrierRun> = Vec::new();
        for token in tokens {
            match runs.last_mut() {
                Some(run) if run.position == token.position => run.tokens.push(token),
                _ => runs.push(BarrierRun {
                    position: token.position,
                    tokens: vec![token],
                }),
            }
        }
        debug_assert!(runs.windows(2).all(|w| w[0].position < w[1].position));

        let mut starts = Vec::with_capacity(runs.len());
        let mut total = 0usize;
        for run in &runs {
            starts.push(total);
            total += run.tokens.len();
        }
        Ok(Self {
            runs,
            starts,
            total,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Total barrier token count across all runs.
    pub fn len(&self) -> usize {
        self.total
    }

    /// The same-position runs, positions strictly increasing.
    pub fn runs(&self) -> &[BarrierRun] {
        &self.runs
    }

    /// Token at the flat consumption index.
    pub fn get(&self, index: usize) -> Option<&BarrierToken> {
        if index >= self.total {
            return None;
        }
        let run = self.starts.partition_point(|&start| start <= index) - 1;
        self.runs[run].tokens.get(index - self.starts[run])
    }

    /// Position of the first barrier at or after `index`, which bounds the
    /// cursor of any rule that does not ignore barriers.
    pub fn bound_after(&self, index: usize) -> Option<usize> {
        self.get(index).map(|t| t.position)
    }

    /// Alias of the first barrier sitting exactly at `position`.
    pub fn alias_at(&self, position: usize) -> Option<&str> {
        self.runs
            .binary_search_by_key(&position, |run| run.position)
            .ok()
            .and_then(|i| self.runs[i].tokens.first())
            .map(|t| t.alias.as_str())
    }
}
