//! Splits a meal message into food phrases.

use crate::core::quantity::extract_quantity;
use crate::domain::model::{FoodPhrase, QuantitySpec};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static CONVERSATIONAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:i just ate|i ate|just ate|ate)(?:\s+|$)").expect("valid prefix pattern")
});

static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*,\s*|\s+and\s+|\s*&\s*|\s*\+\s*").expect("valid separator pattern")
});

static THOUSANDS_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d),(\d{3})\b").expect("valid thousands pattern"));

static CALORIE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\s*(?P<n>\d+(?:\.\d+)?)\s*(?:kcals?|cals?|calories)\b\s*\)?")
        .expect("valid calorie pattern")
});

static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:a|an|some|the)\s+").expect("valid article pattern"));

#[derive(Debug, Clone, Default)]
pub struct ItemSplitter {
    /// Single-word dish names that may be written back to back ("dal roti").
    vocabulary: HashSet<String>,
}

impl ItemSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocabulary<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocabulary: words
                .into_iter()
                .map(|w| w.into().to_lowercase())
                .filter(|w| !w.is_empty() && !w.contains(' '))
                .collect(),
        }
    }

    /// Never fails: a message with no usable segment becomes one phrase
    /// holding the whole trimmed message.
    pub fn split(&self, message: &str) -> Vec<FoodPhrase> {
        let lowered = message.trim().to_lowercase();
        let body = CONVERSATIONAL_PREFIX.replace(&lowered, "");
        let body = strip_thousands_separators(&body);

        let mut phrases = Vec::new();
        for segment in SEPARATOR.split(&body) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let phrase = build_phrase(segment);
            if phrase.normalized_name.is_empty() && phrase.declared_calories.is_none() {
                continue;
            }
            self.push_split_juxtaposed(phrase, &mut phrases);
        }

        if phrases.is_empty() {
            let whole = message.trim();
            phrases.push(FoodPhrase {
                raw_text: whole.to_string(),
                normalized_name: whole.to_lowercase(),
                quantity: QuantitySpec::unspecified(),
                declared_calories: None,
            });
        }

        tracing::debug!("Split message into {} phrase(s)", phrases.len());
        phrases
    }

    fn push_split_juxtaposed(&self, phrase: FoodPhrase, out: &mut Vec<FoodPhrase>) {
        let words: Vec<&str> = phrase.normalized_name.split(' ').collect();
        let juxtaposed = phrase.quantity.raw_match.is_none()
            && phrase.declared_calories.is_none()
            && words.len() > 1
            && !self.vocabulary.contains(&phrase.normalized_name)
            && words.iter().all(|w| self.vocabulary.contains(*w))
            && words.iter().collect::<HashSet<_>>().len() == words.len();

        if !juxtaposed {
            out.push(phrase);
            return;
        }

        for word in words {
            out.push(FoodPhrase {
                raw_text: word.to_string(),
                normalized_name: word.to_string(),
                quantity: QuantitySpec::unspecified(),
                declared_calories: None,
            });
        }
    }
}

/// "1,000,000" becomes "1000000" so the comma separator leaves it intact.
fn strip_thousands_separators(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = THOUSANDS_SEPARATOR.replace_all(&current, "$1$2").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn build_phrase(segment: &str) -> FoodPhrase {
    let mut declared_calories = None;
    let mut text = segment.to_string();
    if let Some(caps) = CALORIE_ANNOTATION.captures(segment) {
        declared_calories = caps.name("n").and_then(|n| n.as_str().parse::<f64>().ok());
        text = CALORIE_ANNOTATION.replace(segment, " ").into_owned();
    }

    let text = LEADING_ARTICLE.replace(text.trim(), "").into_owned();
    let (quantity, rest) = extract_quantity(&text);
    let normalized_name = LEADING_ARTICLE.replace(&rest, "").trim().to_string();

    FoodPhrase {
        raw_text: segment.to_string(),
        normalized_name,
        quantity,
        declared_calories,
    }
}
