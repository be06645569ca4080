use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Symmetric table of which pairs of bodies may touch without counting as a collision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedCollisionMatrix {
    entries: BTreeMap<(String, String), bool>,
}

fn pair_key(first: &str, second: &str) -> (String, String) {
    if first <= second {
        (first.to_owned(), second.to_owned())
    } else {
        (second.to_owned(), first.to_owned())
    }
}

impl AllowedCollisionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix with every pair allowed, used for robot description disabled pairs
    pub fn from_allowed_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut matrix = Self::new();
        for (first, second) in pairs {
            matrix.set_entry(first, second, true);
        }
        matrix
    }

    pub fn set_entry(&mut self, first: &str, second: &str, allowed: bool) {
        self.entries.insert(pair_key(first, second), allowed);
    }

    pub fn get_entry(&self, first: &str, second: &str) -> Option<bool> {
        self.entries.get(&pair_key(first, second)).copied()
    }

    /// Missing entries are not allowed
    pub fn is_allowed(&self, first: &str, second: &str) -> bool {
        self.get_entry(first, second).unwrap_or(false)
    }

    pub fn entry_names(&self) -> BTreeSet<&str> {
        self.entries
            .keys()
            .flat_map(|(first, second)| [first.as_str(), second.as_str()])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every entry of `other` over this matrix
    pub fn merge(&mut self, other: &AllowedCollisionMatrix) {
        for (key, allowed) in &other.entries {
            self.entries.insert(key.clone(), *allowed);
        }
    }
}

impl fmt::Display for AllowedCollisionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.entry_names();
        let width = names.iter().map(|name| name.len()).max().unwrap_or(0);
        for row in &names {
            write!(f, "{:>width$} ", row, width = width)?;
            for column in &names {
                let cell = match self.get_entry(row, column) {
                    Some(true) => '1',
                    Some(false) => '0',
                    None => '-',
                };
                write!(f, " {}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
