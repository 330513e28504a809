//! First-character sets used to prune choice branches.

/// The set of input characters at which an element may possibly begin.
///
/// `Any` means unknown or unrestricted (nullable elements and open-ended
/// leaves like regex report `Any`). A `Set` is authoritative: a character
/// outside it can never start the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirstChars {
    Any,
    Set(CharSet),
}

impl FirstChars {
    pub fn empty() -> Self {
        FirstChars::Set(CharSet::new())
    }

    pub fn single(c: char) -> Self {
        let mut set = CharSet::new();
        set.insert(c);
        FirstChars::Set(set)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, FirstChars::Any)
    }

    /// Whether an element with this set may begin at `c`.
    pub fn allows(&self, c: char) -> bool {
        match self {
            FirstChars::Any => true,
            FirstChars::Set(set) => set.contains(c),
        }
    }

    /// Union in place. `Any` absorbs everything.
    pub fn merge(&mut self, other: &FirstChars) {
        match (&mut *self, other) {
            (FirstChars::Any, _) => {}
            (_, FirstChars::Any) => *self = FirstChars::Any,
            (FirstChars::Set(a), FirstChars::Set(b)) => a.union(b),
        }
    }
}

/// A sorted, deduplicated character set with binary-search lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharSet {
    chars: Vec<char>,
}

impl CharSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, c: char) {
        if let Err(idx) = self.chars.binary_search(&c) {
            self.chars.insert(idx, c);
        }
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.binary_search(&c).is_ok()
    }

    pub fn union(&mut self, other: &CharSet) {
        for &c in &other.chars {
            self.insert(c);
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }
}

impl FromIterator<char> for CharSet {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        let mut set = CharSet::new();
        for c in iter {
            set.insert(c);
        }
        set
    }
}
