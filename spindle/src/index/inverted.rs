//! Inverted text index.
//!
//! Maps normalized tokens to the set of rows containing them, so a
//! token-containment query costs time proportional to the matching postings
//! rather than a full-table substring scan. Token derivation is
//! deterministic and runs synchronously whenever a row's text changes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Normalizes free text into its token set: lowercased, split on any
/// non-alphanumeric character, empty fragments dropped.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// An inverted index over rows identified by `R`.
#[derive(Debug, Clone)]
pub struct InvertedIndex<R> {
    postings: HashMap<String, BTreeSet<R>>,
    tokens_by_row: BTreeMap<R, BTreeSet<String>>,
}

impl<R: Ord + Clone> InvertedIndex<R> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            postings: HashMap::new(),
            tokens_by_row: BTreeMap::new(),
        }
    }

    /// (Re)indexes a row from its text fields, replacing any prior tokens.
    pub fn index_row(&mut self, row: R, fields: &[&str]) {
        self.remove_row(&row);
        let mut tokens = BTreeSet::new();
        for field in fields {
            tokens.append(&mut tokenize(field));
        }
        for token in &tokens {
            self.postings
                .entry(token.clone())
                .or_default()
                .insert(row.clone());
        }
        if !tokens.is_empty() {
            self.tokens_by_row.insert(row, tokens);
        }
    }

    /// Removes a row and all its postings.
    pub fn remove_row(&mut self, row: &R) {
        let Some(tokens) = self.tokens_by_row.remove(row) else {
            return;
        };
        for token in tokens {
            if let Some(rows) = self.postings.get_mut(&token) {
                rows.remove(row);
                if rows.is_empty() {
                    self.postings.remove(&token);
                }
            }
        }
    }

    /// Conjunctive containment search: rows whose token set contains every
    /// token of `query`. A query that normalizes to no tokens matches
    /// nothing.
    pub fn search(&self, query: &str) -> BTreeSet<R> {
        let tokens = tokenize(query);
        let mut terms = tokens.iter();
        let Some(first) = terms.next() else {
            return BTreeSet::new();
        };
        let Some(mut hits) = self.postings.get(first).cloned() else {
            return BTreeSet::new();
        };
        for token in terms {
            let Some(rows) = self.postings.get(token) else {
                return BTreeSet::new();
            };
            hits = hits.intersection(rows).cloned().collect();
            if hits.is_empty() {
                break;
            }
        }
        hits
    }

    /// Number of rows currently indexed.
    pub fn row_count(&self) -> usize {
        self.tokens_by_row.len()
    }
}

impl<R: Ord + Clone> Default for InvertedIndex<R> {
    fn default() -> Self {
        Self::new()
    }
}
