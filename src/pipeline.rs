//! Tokenization and lemmatization.
//!
//! Splits raw text into word, number, punctuation and symbol tokens and
//! reduces words to a lemma with tantivy's English stemmer. The pipeline's
//! settings are persisted alongside the other model state so a reloaded
//! engine produces the same lemmas it was trained with.

use serde::{Deserialize, Serialize};
use tantivy::tokenizer::{
    Language,
    LowerCaser,
    RawTokenizer,
    Stemmer,
    TextAnalyzer,
    TokenStream,
};

/// Coarse part-of-speech tag, enough to drop punctuation and symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartOfSpeech {
    Word,
    Number,
    Punct,
    Sym,
}

impl PartOfSpeech {
    pub fn is_punct_or_sym(self) -> bool {
        matches!(self, Self::Punct | Self::Sym)
    }
}

/// One token of the input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token as it appeared in the input.
    pub text: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
}

/// ASCII characters tagged as symbols rather than punctuation.
const ASCII_SYMBOLS: &str = "$+<=>^`|~";

/// Non-ASCII characters tagged as punctuation. Anything else that is neither
/// alphanumeric nor whitespace is a symbol.
const UNICODE_PUNCTUATION: &str = "\u{2010}\u{2011}\u{2012}\u{2013}\u{2014}\u{2015}\u{2018}\u{2019}\u{201C}\u{201D}\u{2026}\u{00AB}\u{00BB}\u{00BF}\u{00A1}\u{00B7}";

/// Tokenizer/lemmatizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub lowercase: bool,
    pub stem: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            lowercase: true,
            stem: true,
        }
    }
}

impl Pipeline {
    /// Split `text` into tokens and attach a lemma to each.
    ///
    /// Words may contain an inner apostrophe or hyphen (`don't`,
    /// `state-of-the-art`); a run of digits is a number.
    pub fn tokenize_lemmatize(&self, text: &str) -> Vec<Token> {
        let mut analyzer = self.lemmatizer();
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let (start, c) = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }

            if c.is_alphanumeric() {
                let mut j = i + 1;
                while j < chars.len() {
                    let next = chars[j].1;
                    let joins_word = chars
                        .get(j + 1)
                        .is_some_and(|(_, c)| c.is_alphanumeric());
                    let joiner = (next == '\'' || next == '-') && joins_word;
                    if next.is_alphanumeric() || joiner {
                        j += 1;
                    } else {
                        break;
                    }
                }
                let end = chars.get(j).map_or(text.len(), |(idx, _)| *idx);
                let word = &text[start..end];

                if word.chars().all(|c| c.is_ascii_digit()) {
                    tokens.push(Token {
                        text: word.to_string(),
                        lemma: word.to_string(),
                        pos: PartOfSpeech::Number,
                    });
                } else {
                    tokens.push(Token {
                        text: word.to_string(),
                        lemma: lemma(&mut analyzer, word),
                        pos: PartOfSpeech::Word,
                    });
                }
                i = j;
                continue;
            }

            tokens.push(Token {
                text: c.to_string(),
                lemma: c.to_string(),
                pos: classify_mark(c),
            });
            i += 1;
        }

        tokens
    }

    fn lemmatizer(&self) -> TextAnalyzer {
        let builder = TextAnalyzer::builder(RawTokenizer::default());
        match (self.lowercase, self.stem) {
            (true, true) => builder
                .filter(LowerCaser)
                .filter(Stemmer::new(Language::English))
                .build(),
            (true, false) => builder.filter(LowerCaser).build(),
            (false, true) => {
                builder.filter(Stemmer::new(Language::English)).build()
            }
            (false, false) => builder.build(),
        }
    }
}

fn lemma(analyzer: &mut TextAnalyzer, word: &str) -> String {
    let mut stream = analyzer.token_stream(word);
    let mut out = String::new();
    while stream.advance() {
        out.push_str(&stream.token().text);
    }
    if out.is_empty() { word.to_string() } else { out }
}

fn classify_mark(c: char) -> PartOfSpeech {
    if c.is_ascii() {
        if ASCII_SYMBOLS.contains(c) || !c.is_ascii_punctuation() {
            PartOfSpeech::Sym
        } else {
            PartOfSpeech::Punct
        }
    } else if UNICODE_PUNCTUATION.contains(c) {
        PartOfSpeech::Punct
    } else {
        PartOfSpeech::Sym
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lemmas(text: &str) -> Vec<String> {
        Pipeline::default()
            .tokenize_lemmatize(text)
            .into_iter()
            .map(|t| t.lemma)
            .collect()
    }

    #[test]
    fn splits_words_and_punctuation() {
        let tokens = Pipeline::default().tokenize_lemmatize("The cat sat.");
        let tags: Vec<_> = tokens.iter().map(|t| t.pos).collect();
        assert_eq!(
            tags,
            vec![
                PartOfSpeech::Word,
                PartOfSpeech::Word,
                PartOfSpeech::Word,
                PartOfSpeech::Punct,
            ]
        );
        assert_eq!(tokens[0].text, "The");
        assert_eq!(tokens[0].lemma, "the");
    }

    #[test]
    fn stems_plural_and_gerund() {
        assert_eq!(lemmas("cats running"), vec!["cat", "run"]);
    }

    #[test]
    fn without_stemming_keeps_lowercased_word() {
        let pipeline = Pipeline {
            lowercase: true,
            stem: false,
        };
        let tokens = pipeline.tokenize_lemmatize("Cats");
        assert_eq!(tokens[0].lemma, "cats");
    }

    #[test]
    fn numbers_and_symbols() {
        let tokens = Pipeline::default().tokenize_lemmatize("$5 + 10");
        let tags: Vec<_> = tokens.iter().map(|t| t.pos).collect();
        assert_eq!(
            tags,
            vec![
                PartOfSpeech::Sym,
                PartOfSpeech::Number,
                PartOfSpeech::Sym,
                PartOfSpeech::Number,
            ]
        );
    }

    #[test]
    fn inner_apostrophe_stays_in_word() {
        let tokens = Pipeline::default().tokenize_lemmatize("don't 'quoted'");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["don't", "'", "quoted", "'"]);
    }

    #[test]
    fn unicode_dash_is_punctuation() {
        let tokens = Pipeline::default().tokenize_lemmatize("one \u{2014} two");
        assert_eq!(tokens[1].pos, PartOfSpeech::Punct);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(Pipeline::default().tokenize_lemmatize("  \n ").is_empty());
    }
}
