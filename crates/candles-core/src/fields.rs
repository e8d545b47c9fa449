//! Header resolution: mapping CSV header cells to canonical column positions.

use std::fmt::{self, Display, Formatter};

/// One of the six column roles a candle CSV must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Open,
    High,
    Low,
    Close,
    Symbol,
    Unix,
}

impl CanonicalField {
    pub const ALL: [Self; 6] = [
        Self::Open,
        Self::High,
        Self::Low,
        Self::Close,
        Self::Symbol,
        Self::Unix,
    ];

    /// Header token recognized for this field. Matching is exact.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::High => "HIGH",
            Self::Low => "LOW",
            Self::Close => "CLOSE",
            Self::Symbol => "SYMBOL",
            Self::Unix => "UNIX",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.token() == token)
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

impl Display for CanonicalField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Column position of each canonical field within one CSV header.
///
/// Built fresh per header. When a token appears more than once the last
/// occurrence wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldIndexes {
    slots: [Option<usize>; 6],
}

impl FieldIndexes {
    /// Scan `header` left to right, recording the index of every canonical
    /// token. Unrecognized cells are ignored.
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Self {
        let mut indexes = Self::default();
        for (index, cell) in header.iter().enumerate() {
            if let Some(field) = CanonicalField::from_token(cell.as_ref()) {
                indexes.slots[field.slot()] = Some(index);
            }
        }
        indexes
    }

    pub const fn get(&self, field: CanonicalField) -> Option<usize> {
        self.slots[field.slot()]
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Canonical fields with no column, in canonical order.
    pub fn missing(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }
}
