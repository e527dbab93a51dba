//! Script-based language classification for recognized text.
//!
//! The recognition service does not report the text language, so it is
//! inferred from the decoded text itself. The classifier is a deliberate
//! two-outcome heuristic: count Cyrillic letters against Latin a-z letters
//! and pick whichever script dominates. It is not a general language
//! identifier; the fourteen display names below exist only for presentation.

use serde::{Deserialize, Serialize};

/// The two languages the classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Russian,
}

impl Language {
    /// ISO 639-1 code, `"en"` or `"ru"`.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Russian => "ru",
        }
    }
}

/// Classify text by script dominance.
///
/// Counts characters of the Russian Cyrillic alphabet (both cases,
/// including ё/Ё) and ASCII Latin letters; Russian wins only on a strict
/// majority of Cyrillic over Latin. Empty text and ties classify as English.
/// Pure and deterministic, no I/O.
pub fn detect(text: &str) -> Language {
    let mut cyrillic = 0usize;
    let mut latin = 0usize;

    for ch in text.chars() {
        if is_russian_cyrillic(ch) {
            cyrillic += 1;
        } else if ch.is_ascii_alphabetic() {
            latin += 1;
        }
    }

    if cyrillic > latin {
        Language::Russian
    } else {
        Language::English
    }
}

fn is_russian_cyrillic(ch: char) -> bool {
    matches!(ch, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Display name for a language code; names the original UI exposed.
/// Unknown codes fall back to the code itself.
pub fn display_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "ru" => "Russian",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "uk" => "Ukrainian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ar" => "Arabic",
        other => other,
    }
}
