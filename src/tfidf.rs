//! Document-frequency table and tf-idf weighting.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A fitted tf-idf vectorizer.
///
/// Only document frequencies are stored; term frequencies are computed per
/// call from the terms passed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfIdf {
    documents: u64,
    document_frequency: HashMap<String, u64>,
}

impl TfIdf {
    /// Fit a fresh table on a corpus of already-sanitized term lists.
    pub fn fit<I, D, S>(corpus: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for terms in corpus {
            table.observe(terms);
        }
        table
    }

    /// Add one document to the table without refitting the rest.
    pub fn observe<D, S>(&mut self, terms: D)
    where
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: HashSet<String> =
            terms.into_iter().map(|t| t.as_ref().to_string()).collect();
        for term in unique {
            *self.document_frequency.entry(term).or_insert(0) += 1;
        }
        self.documents += 1;
    }

    pub fn documents(&self) -> u64 {
        self.documents
    }

    pub fn vocabulary_len(&self) -> usize {
        self.document_frequency.len()
    }

    /// Smoothed inverse document frequency. Unknown terms get the highest
    /// weight the table can produce.
    pub fn idf(&self, term: &str) -> f32 {
        let df = self.document_frequency.get(term).copied().unwrap_or(0);
        let n = self.documents as f32;
        ((1.0 + n) / (1.0 + df as f32)).ln() + 1.0
    }

    /// Per-token tf-idf weights, one entry per input term in input order.
    ///
    /// The length follows the number of terms, so callers that compare two
    /// of these bring them to a common length first.
    pub fn weights(&self, terms: &[&str]) -> Vec<f32> {
        if terms.is_empty() {
            return Vec::new();
        }
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &term in terms {
            *counts.entry(term).or_insert(0) += 1;
        }
        let total = terms.len() as f32;
        terms
            .iter()
            .map(|t| {
                let tf = counts.get(t).copied().unwrap_or(0) as f32 / total;
                tf * self.idf(t)
            })
            .collect()
    }
}
