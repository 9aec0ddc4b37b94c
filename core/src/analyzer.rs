use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
    static ref STOPWORDS: Vec<&'static str> = vec![
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
        "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
        "these", "they", "this", "to", "was", "will", "with",
    ];
}

/// Optional suffix stripping applied after stop-word removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stemming {
    #[default]
    None,
    English,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// `None` selects the built-in English list; an empty list disables stop-word removal.
    #[serde(default)]
    pub stop_words: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub unicode_normalization: bool,
    #[serde(default)]
    pub stemming: Stemming,
}

fn default_true() -> bool {
    true
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { stop_words: None, unicode_normalization: true, stemming: Stemming::None }
    }
}

/// Turns raw text into the terms that are indexed and searched.
pub struct Analyzer {
    stop_words: HashSet<String>,
    unicode_normalization: bool,
    stemmer: Option<Stemmer>,
}

impl Analyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        let stop_words = match &config.stop_words {
            Some(words) => words.iter().map(|w| w.to_lowercase()).collect(),
            None => STOPWORDS.iter().map(|w| w.to_string()).collect(),
        };
        let stemmer = match config.stemming {
            Stemming::None => None,
            Stemming::English => Some(Stemmer::create(Algorithm::English)),
        };
        Self { stop_words, unicode_normalization: config.unicode_normalization, stemmer }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Character-level normalization shared by analysis and stored values: NFKC then lowercase.
    pub fn normalize(&self, text: &str) -> String {
        if self.unicode_normalization {
            text.nfkc().collect::<String>().to_lowercase()
        } else {
            text.to_lowercase()
        }
    }

    /// Normalize, split on non-alphanumeric boundaries, drop stop words, then stem.
    /// Terms come back in the order they appear in `text`.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let normalized = self.normalize(text);
        let mut terms = Vec::new();
        for mat in RE.find_iter(&normalized) {
            let token = mat.as_str();
            if self.is_stopword(token) {
                continue;
            }
            terms.push(self.stem(token));
        }
        terms
    }

    /// Analyze `text` as a single term without splitting it: normalize, trim,
    /// drop it if it is a stop word, then stem.
    pub fn analyze_literal(&self, text: &str) -> Option<String> {
        let normalized = self.normalize(text);
        let literal = normalized.trim();
        if literal.is_empty() || self.is_stopword(literal) {
            return None;
        }
        Some(self.stem(literal))
    }

    fn stem(&self, token: &str) -> String {
        match &self.stemmer {
            Some(stemmer) => stemmer.stem(token).into_owned(),
            None => token.to_string(),
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}
