use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

lazy_static! {
    // Word characters plus hyphen, so compounds such as "palavra-chave" stay whole.
    static ref RE: Regex = Regex::new(r"[\w-]+").expect("valid regex");
}

/// Snowball stemmers available to the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemLanguage {
    English,
    French,
    German,
    Italian,
    Portuguese,
    Spanish,
}

impl StemLanguage {
    fn algorithm(self) -> Algorithm {
        match self {
            StemLanguage::English => Algorithm::English,
            StemLanguage::French => Algorithm::French,
            StemLanguage::German => Algorithm::German,
            StemLanguage::Italian => Algorithm::Italian,
            StemLanguage::Portuguese => Algorithm::Portuguese,
            StemLanguage::Spanish => Algorithm::Spanish,
        }
    }
}

impl FromStr for StemLanguage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(StemLanguage::English),
            "french" | "fr" => Ok(StemLanguage::French),
            "german" | "de" => Ok(StemLanguage::German),
            "italian" | "it" => Ok(StemLanguage::Italian),
            "portuguese" | "pt" => Ok(StemLanguage::Portuguese),
            "spanish" | "es" => Ok(StemLanguage::Spanish),
            other => bail!("unsupported stemming language '{other}'"),
        }
    }
}

/// Turns raw text into the ordered sequence of significant terms.
///
/// Text is NFKC-normalized and lowercased, split on runs of word characters
/// and hyphens, stripped of stop words, and tokens without a single
/// alphabetic character (numbers, lone hyphens) are dropped.
pub struct Normalizer {
    stopwords: HashSet<String>,
    stemmer: Option<Stemmer>,
    language: Option<StemLanguage>,
}

impl Normalizer {
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = stopwords
            .into_iter()
            .map(|w| fold(w.as_ref().trim()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { stopwords, stemmer: None, language: None }
    }

    /// Load stop words from a file with one word per line. A missing file is a setup error.
    pub fn from_stopword_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("stop-word list not found at {}", path.display());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading stop-word list {}", path.display()))?;
        let normalizer = Self::new(contents.lines());
        if normalizer.stopwords.is_empty() {
            tracing::warn!(path = %path.display(), "stop-word list is empty");
        }
        tracing::info!(stopwords = normalizer.stopwords.len(), path = %path.display(), "loaded stop words");
        Ok(normalizer)
    }

    pub fn with_stemming(mut self, language: StemLanguage) -> Self {
        self.stemmer = Some(Stemmer::create(language.algorithm()));
        self.language = Some(language);
        self
    }

    /// Stemmer in use; recorded next to everything built with this normalizer.
    pub fn stem_language(&self) -> Option<StemLanguage> { self.language }

    pub fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    pub fn normalize(&self, text: &str) -> Vec<String> {
        let folded = fold(text);
        let mut tokens = Vec::new();
        for mat in RE.find_iter(&folded) {
            let token = mat.as_str();
            if self.is_stopword(token) { continue; }
            if !token.chars().any(char::is_alphabetic) { continue; }
            match &self.stemmer {
                Some(stemmer) => tokens.push(stemmer.stem(token).into_owned()),
                None => tokens.push(token.to_string()),
            }
        }
        tokens
    }

    /// First significant term of `text`, if any.
    pub fn first_term(&self, text: &str) -> Option<String> {
        self.normalize(text).into_iter().next()
    }
}

fn fold(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_normalize() {
        let n = Normalizer::new(["de", "o"]);
        assert_eq!(n.normalize("Redes de Computadores"), vec!["redes", "computadores"]);
    }

    #[test]
    fn drops_numbers_and_lone_hyphens() {
        let n = Normalizer::new(Vec::<String>::new());
        assert_eq!(n.normalize("2025 - ano-base 12345"), vec!["ano-base"]);
    }

    #[test]
    fn stemming_is_opt_in() {
        let n = Normalizer::new(["the"]).with_stemming(StemLanguage::English);
        assert_eq!(n.normalize("The running runners"), vec!["run", "runner"]);
        assert_eq!(n.stem_language(), Some(StemLanguage::English));
        assert_eq!(Normalizer::new(["the"]).stem_language(), None);
    }

    #[test]
    fn parses_languages() {
        assert_eq!("PT".parse::<StemLanguage>().unwrap(), StemLanguage::Portuguese);
        assert!("klingon".parse::<StemLanguage>().is_err());
    }
}
