//! Summary statistics over recognized text.

use serde::Serialize;
use std::collections::HashMap;

/// Counts and frequency summary for one piece of recognized text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextReport {
    pub chars: usize,
    pub words: usize,
    pub lines: usize,
    pub paragraphs: usize,
    pub letters: usize,
    pub digits: usize,
    pub spaces: usize,
    pub punctuation: usize,
    /// Up to five most frequent words (stop words excluded), most frequent
    /// first, ties broken alphabetically.
    pub top_words: Vec<(String, usize)>,
}

/// Common words excluded from the frequency ranking. Covers the two
/// languages the classifier produces.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "in", "is", "it", "of",
    "on", "or", "that", "the", "this", "to", "was", "were", "with", "и", "в", "во", "не", "на",
    "что", "он", "она", "оно", "они", "как", "а", "то", "все", "так", "его", "но", "за", "из", "у",
    "по", "же", "от", "это",
];

/// Analyze recognized text. Pure, no I/O.
pub fn analyze(text: &str) -> TextReport {
    let mut report = TextReport {
        chars: text.chars().count(),
        words: text.split_whitespace().count(),
        lines: text.lines().count(),
        paragraphs: text
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count(),
        ..TextReport::default()
    };

    for ch in text.chars() {
        if ch.is_alphabetic() {
            report.letters += 1;
        } else if ch.is_ascii_digit() {
            report.digits += 1;
        } else if ch == ' ' {
            report.spaces += 1;
        } else if ch.is_ascii_punctuation() {
            report.punctuation += 1;
        }
    }

    report.top_words = top_words(text, 5);
    report
}

/// Most frequent words after lowercasing, punctuation trimming, and stop-word
/// removal.
fn top_words(text: &str, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for raw in text.split_whitespace() {
        let word: String = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.is_empty() || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let report = analyze("");
        assert_eq!(report.chars, 0);
        assert_eq!(report.words, 0);
        assert_eq!(report.lines, 0);
        assert_eq!(report.paragraphs, 0);
        assert!(report.top_words.is_empty());
    }

    #[test]
    fn test_basic_counts() {
        let report = analyze("Hello world!\n\nSecond paragraph 42.");
        assert_eq!(report.words, 5);
        assert_eq!(report.lines, 3);
        assert_eq!(report.paragraphs, 2);
        assert_eq!(report.digits, 2);
        assert_eq!(report.punctuation, 2);
        assert_eq!(report.spaces, 3);
    }

    #[test]
    fn test_top_words_excludes_stop_words() {
        let report = analyze("the cat and the dog and the cat");
        assert_eq!(report.top_words[0], ("cat".to_string(), 2));
        assert!(report.top_words.iter().all(|(w, _)| w != "the" && w != "and"));
    }

    #[test]
    fn test_top_words_case_and_punctuation_folded() {
        let report = analyze("Scan, scan. SCAN! once");
        assert_eq!(report.top_words[0], ("scan".to_string(), 3));
    }

    #[test]
    fn test_russian_stop_words_excluded() {
        let report = analyze("текст и текст на экране");
        assert_eq!(report.top_words[0], ("текст".to_string(), 2));
        assert!(report.top_words.iter().all(|(w, _)| w != "и" && w != "на"));
    }

    #[test]
    fn test_top_words_capped_at_five() {
        let report = analyze("one two three four five six seven");
        assert_eq!(report.top_words.len(), 5);
    }
}
