//! Prefix trie for `LiteralChoice` tokens, built once at parser build time.

use indexmap::IndexMap;

/// A character trie mapping literal alternatives to their declaration index.
///
/// Lookup returns the longest alternative matching at the cursor. Case
/// folding, when enabled, is ASCII-only and applied symmetrically at build
/// and at lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiteralTrie {
    nodes: Vec<TrieNode>,
    case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TrieNode {
    edges: IndexMap<char, u32>,
    /// Declaration index of the alternative ending here.
    terminal: Option<u32>,
}

impl LiteralTrie {
    pub fn new(alternatives: &[String], case_insensitive: bool) -> Self {
        let mut trie = Self {
            nodes: vec![TrieNode::default()],
            case_insensitive,
        };
        for (index, alt) in alternatives.iter().enumerate() {
            trie.insert(alt, index as u32);
        }
        trie
    }

    fn fold(&self, c: char) -> char {
        if self.case_insensitive {
            c.to_ascii_lowercase()
        } else {
            c
        }
    }

    fn insert(&mut self, text: &str, index: u32) {
        let mut node = 0usize;
        for c in text.chars() {
            let c = self.fold(c);
            let next = match self.nodes[node].edges.get(&c) {
                Some(&next) => next as usize,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].edges.insert(c, next as u32);
                    next
                }
            };
            node = next;
        }
        // First declaration wins on duplicates.
        if self.nodes[node].terminal.is_none() {
            self.nodes[node].terminal = Some(index);
        }
    }

    /// Longest match at the start of `rest`: `(byte length, alternative index)`.
    pub fn longest_match(&self, rest: &str) -> Option<(usize, u32)> {
        let mut node = 0usize;
        let mut best = None;
        let mut consumed = 0usize;
        if let Some(index) = self.nodes[node].terminal {
            best = Some((0, index));
        }
        for c in rest.chars() {
            let folded = self.fold(c);
            let Some(&next) = self.nodes[node].edges.get(&folded) else {
                break;
            };
            node = next as usize;
            consumed += c.len_utf8();
            if let Some(index) = self.nodes[node].terminal {
                best = Some((consumed, index));
            }
        }
        best
    }

    /// Characters any alternative may begin with (both cases when folding).
    pub fn first_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.nodes[0].edges.keys().flat_map(|&c| {
            let upper = c.to_ascii_uppercase();
            let pair = if self.case_insensitive && upper != c {
                Some(upper)
            } else {
                None
            };
            std::iter::once(c).chain(pair)
        })
    }
}
