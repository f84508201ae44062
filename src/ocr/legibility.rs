use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use whatlang::Lang;

use crate::config::OcrConfig;

/// Why a piece of OCR text was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Legible,
    Empty,
    NoLongWord,
    NotInDictionary,
    WrongLanguage(Option<Lang>),
}

/// Immutable rule set shared by every OCR worker.
#[derive(Debug, Clone)]
pub struct LegibilityRules {
    language: Lang,
    min_word_length: usize,
    dictionary: Option<HashSet<String>>,
}

fn foreign_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[^A-Za-zÀ-ÖØ-öø-ÿ\s]").expect("valid character class")
    })
}

/// Languages whose text survives `clean_text` intact.
const LATIN1_LANGUAGES: &[&str] = &[
    "afr", "aka", "cat", "dan", "deu", "eng", "est", "fin", "fra", "ind", "ita", "jav", "lat",
    "nld", "nob", "por", "sna", "spa", "swe", "tgl", "zul",
];

impl LegibilityRules {
    /// `language` is an ISO 639-3 code such as `por` or `eng`, and must be
    /// written in the Latin-1 alphabet.
    pub fn new(language: &str, min_word_length: usize) -> Result<Self> {
        let language = Lang::from_code(language)
            .ok_or_else(|| anyhow::anyhow!("Unsupported OCR language: {}", language))?;
        if !LATIN1_LANGUAGES.contains(&language.code()) {
            anyhow::bail!(
                "OCR language {} is not written in the Latin-1 alphabet",
                language.code()
            );
        }
        Ok(Self {
            language,
            min_word_length,
            dictionary: None,
        })
    }

    pub fn with_dictionary<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self.dictionary = Some(words);
        self
    }

    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let rules = Self::new(&config.language, config.min_word_length)?;
        match &config.dictionary {
            Some(path) => Ok(rules.with_dictionary(load_word_list(path)?)),
            None => Ok(rules),
        }
    }

    pub fn assess(&self, text: &str) -> Verdict {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Verdict::Empty;
        }

        let long_words: Vec<&str> = cleaned
            .split(' ')
            .filter(|w| w.chars().count() >= self.min_word_length)
            .collect();
        if long_words.is_empty() {
            return Verdict::NoLongWord;
        }

        if let Some(dictionary) = &self.dictionary {
            if !long_words
                .iter()
                .any(|w| dictionary.contains(&w.to_lowercase()))
            {
                return Verdict::NotInDictionary;
            }
        }

        let detected = whatlang::detect_lang(&cleaned);
        if detected != Some(self.language) {
            return Verdict::WrongLanguage(detected);
        }
        Verdict::Legible
    }

    pub fn is_legible(&self, text: &str) -> bool {
        self.assess(text) == Verdict::Legible
    }
}

/// Drop everything but letters of the target alphabet and whitespace, then
/// collapse runs of whitespace into single spaces.
pub fn clean_text(text: &str) -> String {
    let letters = foreign_chars().replace_all(text, "");
    letters.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn load_word_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dictionary {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}
