use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::document::Document;

/// Ranking strategy of a search.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Case-insensitive substring match, unscored.
    Lexical,
    /// Cosine similarity of tf-idf vectors.
    Tfidf,
    /// Cosine similarity of dense embeddings.
    #[default]
    Dense,
    /// BM25 phrase search in the remote index.
    Bm25,
    /// Nearest-neighbour search in the remote index.
    Knn,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Lexical => "lexical",
            Self::Tfidf => "tfidf",
            Self::Dense => "dense",
            Self::Bm25 => "bm25",
            Self::Knn => "knn",
        };
        f.write_str(name)
    }
}

/// A document with its score for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDocument {
    pub document: Document,
    pub score: f32,
}

/// Compare two results: higher score first, then lower id.
pub fn compare(a: &RankedDocument, b: &RankedDocument) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.document.id.cmp(&b.document.id))
}

/// Sort `results` best first and keep at most `limit` of them. A `limit` of
/// zero keeps everything.
pub fn rank(
    mut results: Vec<RankedDocument>,
    limit: usize,
) -> Vec<RankedDocument> {
    results.sort_by(compare);
    truncate(&mut results, limit);
    results
}

/// Keep the first `limit` results if `limit` is positive and smaller than
/// the result count.
pub fn truncate<T>(results: &mut Vec<T>, limit: usize) {
    if limit > 0 && limit < results.len() {
        results.truncate(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(id: u64, score: f32) -> RankedDocument {
        RankedDocument {
            document: Document::new(id, &format!("{id}.txt"), "text"),
            score,
        }
    }

    fn ids(results: &[RankedDocument]) -> Vec<u64> {
        results.iter().map(|r| r.document.id).collect()
    }

    #[test]
    fn sorts_descending_with_id_tiebreak() {
        let results = rank(
            vec![
                ranked(3, 0.5),
                ranked(1, 0.9),
                ranked(2, 0.5),
                ranked(4, -0.1),
            ],
            0,
        );
        assert_eq!(ids(&results), vec![1, 2, 3, 4]);
    }

    #[test]
    fn truncates_only_when_smaller() {
        let all = || vec![ranked(1, 0.3), ranked(2, 0.2), ranked(3, 0.1)];
        assert_eq!(rank(all(), 2).len(), 2);
        assert_eq!(rank(all(), 3).len(), 3);
        assert_eq!(rank(all(), 10).len(), 3);
        assert_eq!(rank(all(), 0).len(), 3);
    }

    #[test]
    fn nan_scores_do_not_panic() {
        let results = rank(vec![ranked(2, f32::NAN), ranked(1, 0.5)], 0);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn mode_names() {
        assert_eq!(SearchMode::Tfidf.to_string(), "tfidf");
        let parsed: SearchMode = serde_json::from_str("\"knn\"").unwrap();
        assert_eq!(parsed, SearchMode::Knn);
    }
}
