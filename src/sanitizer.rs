//! Stop-word and punctuation filtering over a lemmatized token stream.

use std::{collections::HashSet, fs, path::Path};

use crate::{
    error::{Error, Result},
    pipeline::Token,
};

/// Built-in English stop words.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an",
    "and", "any", "are", "as", "at", "be", "because", "been", "before",
    "being", "below", "between", "both", "but", "by", "can", "could", "did",
    "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is",
    "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no",
    "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
    "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "would", "you", "your", "yours", "yourself", "yourselves",
];

/// Drops punctuation, symbols and stop words from a token stream.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    stop_words: HashSet<String>,
    case_sensitive: bool,
}

impl Sanitizer {
    pub fn new<I, S>(stop_words: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stop_words = stop_words
            .into_iter()
            .map(|w| fold(w.as_ref().trim(), case_sensitive))
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            stop_words,
            case_sensitive,
        }
    }

    pub fn english(case_sensitive: bool) -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().copied(), case_sensitive)
    }

    /// Load a stop-word table, one word per line. Blank lines and lines
    /// starting with `#` are ignored.
    pub fn from_file(path: &Path, case_sensitive: bool) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read stop words from {}: {e}",
                path.display()
            ))
        })?;
        let words = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        Ok(Self::new(words, case_sensitive))
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        if self.case_sensitive {
            self.stop_words.contains(word)
        } else {
            self.stop_words.contains(&word.to_lowercase())
        }
    }

    pub fn words(&self) -> Vec<String> {
        self.stop_words.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }

    /// Filter `tokens` down to the lemmas worth indexing.
    ///
    /// The returned iterator borrows the input and can be cloned and
    /// re-walked any number of times.
    pub fn sanitize<'a>(&'a self, tokens: &'a [Token]) -> Sanitized<'a> {
        Sanitized {
            sanitizer: self,
            tokens: tokens.iter(),
        }
    }

    fn keeps(&self, token: &Token) -> bool {
        !token.pos.is_punct_or_sym()
            && !token.lemma.is_empty()
            && !self.is_stop_word(&token.lemma)
            && !self.is_stop_word(&token.text)
    }
}

fn fold(word: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        word.to_string()
    } else {
        word.to_lowercase()
    }
}

/// Lazy iterator of sanitized lemmas.
#[derive(Debug, Clone)]
pub struct Sanitized<'a> {
    sanitizer: &'a Sanitizer,
    tokens: std::slice::Iter<'a, Token>,
}

impl<'a> Iterator for Sanitized<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let sanitizer = self.sanitizer;
        self.tokens
            .by_ref()
            .find(|t| sanitizer.keeps(t))
            .map(|t| t.lemma.as_str())
    }
}
