//! Built-in table of approximate nutrition values, the last stage of the
//! cascade. Loaded once per process and read-only afterwards.

use crate::domain::model::{Confidence, NutritionRecord, SourceId};
use crate::domain::ports::SourceAdapter;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macros {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

const fn m(calories: f64, protein_g: f64, carbs_g: f64, fat_g: f64) -> Macros {
    Macros {
        calories,
        protein_g,
        carbs_g,
        fat_g,
    }
}

// Per 100 g for staples, per piece or serving for dishes usually counted.
const BUILT_IN: &[(&str, Macros)] = &[
    ("apple", m(52.0, 0.3, 14.0, 0.2)),
    ("banana", m(89.0, 1.1, 23.0, 0.3)),
    ("beef", m(250.0, 26.0, 0.0, 15.0)),
    ("biryani", m(290.0, 12.0, 36.0, 10.0)),
    ("bread", m(265.0, 9.0, 49.0, 3.2)),
    ("burger", m(354.0, 17.0, 29.0, 17.0)),
    ("cappuccino", m(110.0, 6.0, 9.0, 6.0)),
    ("carrot", m(41.0, 0.9, 10.0, 0.2)),
    ("chai", m(70.0, 2.0, 10.0, 2.5)),
    ("chapati", m(264.0, 8.0, 46.0, 4.2)),
    ("cheese", m(113.0, 7.0, 0.4, 9.0)),
    ("chicken", m(165.0, 31.0, 0.0, 3.6)),
    ("chicken wing", m(81.0, 7.5, 0.0, 5.4)),
    ("coffee", m(2.0, 0.3, 0.0, 0.0)),
    ("coke", m(140.0, 0.0, 39.0, 0.0)),
    ("dal", m(116.0, 9.0, 20.0, 0.4)),
    ("dosa", m(168.0, 3.9, 29.0, 3.7)),
    ("egg", m(155.0, 13.0, 1.1, 11.0)),
    ("fish", m(84.0, 20.0, 0.0, 0.5)),
    ("fries", m(312.0, 3.4, 41.0, 15.0)),
    ("idli", m(58.0, 2.0, 12.0, 0.4)),
    ("khichdi", m(120.0, 4.5, 21.0, 2.0)),
    ("milk", m(42.0, 3.4, 5.0, 1.0)),
    ("muffin", m(420.0, 6.0, 58.0, 19.0)),
    ("noodles", m(138.0, 4.5, 25.0, 2.0)),
    ("oatmeal", m(150.0, 5.0, 27.0, 3.0)),
    ("onion", m(40.0, 1.1, 9.3, 0.1)),
    ("paneer", m(265.0, 18.0, 1.2, 21.0)),
    ("paratha", m(326.0, 6.4, 45.0, 13.0)),
    ("pasta", m(131.0, 5.0, 25.0, 1.1)),
    ("pizza", m(285.0, 12.0, 36.0, 10.0)),
    ("poha", m(180.0, 3.5, 32.0, 4.5)),
    ("pork", m(242.0, 27.0, 0.0, 14.0)),
    ("potato", m(77.0, 2.0, 17.0, 0.1)),
    ("rice", m(130.0, 2.7, 28.0, 0.3)),
    ("roti", m(264.0, 8.0, 46.0, 4.2)),
    ("sabzi", m(50.0, 2.0, 10.0, 0.5)),
    ("salad", m(33.0, 1.5, 6.0, 0.4)),
    ("samosa", m(262.0, 3.5, 24.0, 17.0)),
    ("spinach", m(23.0, 2.9, 3.6, 0.4)),
    ("subzi", m(50.0, 2.0, 10.0, 0.5)),
    ("tea", m(30.0, 1.0, 5.0, 0.7)),
    ("tofu", m(76.0, 8.0, 1.9, 4.8)),
    ("tomato", m(18.0, 0.9, 3.9, 0.2)),
    ("yogurt", m(59.0, 10.0, 3.6, 0.4)),
];

const GENERIC_DEFAULT: Macros = m(200.0, 8.0, 25.0, 8.0);

static SHARED: LazyLock<Arc<StaticFallbackTable>> =
    LazyLock::new(|| Arc::new(StaticFallbackTable::built_in()));

#[derive(Debug, Clone)]
pub struct StaticFallbackTable {
    entries: BTreeMap<String, Macros>,
    default: Macros,
}

impl StaticFallbackTable {
    /// Process-wide instance of the built-in table.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    pub fn built_in() -> Self {
        Self::from_entries(
            BUILT_IN.iter().map(|(name, macros)| (name.to_string(), *macros)),
            GENERIC_DEFAULT,
        )
    }

    pub fn from_entries<I>(entries: I, default: Macros) -> Self
    where
        I: IntoIterator<Item = (String, Macros)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, macros)| (name.trim().to_lowercase(), macros))
                .collect(),
            default,
        }
    }

    /// Single-word dish names, used to split juxtaposed dishes.
    pub fn standalone_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|name| !name.contains(' '))
    }

    /// Keyed entry for `food_name`, if any: exact name, then singular form,
    /// then the longest key appearing as whole words (alphabetical on ties).
    pub fn lookup(&self, food_name: &str) -> Option<(&str, Macros)> {
        let name = food_name.trim().to_lowercase();
        if let Some((key, macros)) = self.entries.get_key_value(&name) {
            return Some((key.as_str(), *macros));
        }

        let words: Vec<&str> = name.split_whitespace().collect();
        let singular_owned: Vec<String> = words.iter().map(|w| singular(w)).collect();
        let singular_name = singular_owned.join(" ");
        if let Some((key, macros)) = self.entries.get_key_value(&singular_name) {
            return Some((key.as_str(), *macros));
        }
        let singular_words: Vec<&str> = singular_owned.iter().map(String::as_str).collect();

        let mut best: Option<(&String, &Macros)> = None;
        for (key, macros) in &self.entries {
            let key_words: Vec<&str> = key.split(' ').collect();
            if !contains_run(&words, &key_words) && !contains_run(&singular_words, &key_words) {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, _)) => key_rank(key) > key_rank(current),
            };
            if better {
                best = Some((key, macros));
            }
        }
        best.map(|(key, macros)| (key.as_str(), *macros))
    }

    /// Always yields a record: keyed when possible, the generic default
    /// otherwise.
    pub fn resolve_record(&self, food_name: &str) -> NutritionRecord {
        match self.lookup(food_name) {
            Some((key, macros)) => {
                tracing::debug!("Static table matched '{}' as '{}'", food_name, key);
                to_record(food_name, macros)
            }
            None => {
                tracing::debug!("Static table has no entry for '{}'", food_name);
                let mut record = to_record(food_name, self.default);
                record.generic_default = true;
                record
            }
        }
    }
}

impl Default for StaticFallbackTable {
    fn default() -> Self {
        Self::built_in()
    }
}

#[async_trait]
impl SourceAdapter for StaticFallbackTable {
    fn source_id(&self) -> SourceId {
        SourceId::Fallback
    }

    fn time_budget(&self) -> Duration {
        Duration::from_millis(50)
    }

    async fn resolve(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        Ok(Some(self.resolve_record(food_name)))
    }
}

fn to_record(food_name: &str, macros: Macros) -> NutritionRecord {
    NutritionRecord::new(
        food_name,
        macros.calories,
        macros.protein_g,
        macros.carbs_g,
        macros.fat_g,
        SourceId::Fallback,
        Confidence::Low,
    )
}

fn contains_run(words: &[&str], run: &[&str]) -> bool {
    !run.is_empty() && words.windows(run.len()).any(|window| window == run)
}

fn key_rank(key: &str) -> (usize, usize) {
    (key.split(' ').count(), key.len())
}

fn singular(word: &str) -> String {
    if word.len() > 4 && word.ends_with("oes") {
        word[..word.len() - 2].to_string()
    } else if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_cultural_names() {
        let table = StaticFallbackTable::built_in();
        for name in ["dal", "roti", "subzi", "sabzi", "paneer", "idli"] {
            let record = table.resolve_record(name);
            assert!(!record.generic_default, "{} should be keyed", name);
            assert_eq!(record.source_id, SourceId::Fallback);
            assert_eq!(record.confidence, Confidence::Low);
        }
    }

    #[test]
    fn test_longest_whole_word_key_wins() {
        let table = StaticFallbackTable::built_in();
        let (key, macros) = table.lookup("spicy chicken wing").unwrap();
        assert_eq!(key, "chicken wing");
        assert_eq!(macros.calories, 81.0);

        let (key, _) = table.lookup("pizza slice").unwrap();
        assert_eq!(key, "pizza");
    }

    #[test]
    fn test_plural_forms_match() {
        let table = StaticFallbackTable::built_in();
        assert_eq!(table.lookup("eggs").unwrap().0, "egg");
        assert_eq!(table.lookup("potatoes").unwrap().0, "potato");
        assert_eq!(table.lookup("bananas").unwrap().0, "banana");
        assert_eq!(table.lookup("french fries").unwrap().0, "fries");
    }

    #[test]
    fn test_no_substring_matches_inside_words() {
        let table = StaticFallbackTable::built_in();
        assert!(table.lookup("licorice").is_none());
        assert!(table.lookup("teapot").is_none());
    }

    #[test]
    fn test_unknown_food_gets_generic_default() {
        let table = StaticFallbackTable::built_in();
        let record = table.resolve_record("double choco chip cookie");
        assert!(record.generic_default);
        assert_eq!(record.food_name, "double choco chip cookie");
        assert_eq!(record.calories, GENERIC_DEFAULT.calories);
        assert_eq!(record.source_id, SourceId::Fallback);
    }

    #[test]
    fn test_ties_break_alphabetically() {
        let table = StaticFallbackTable::from_entries(
            vec![
                ("rusk".to_string(), m(1.0, 0.0, 0.0, 0.0)),
                ("chai".to_string(), m(2.0, 0.0, 0.0, 0.0)),
            ],
            GENERIC_DEFAULT,
        );
        let (key, _) = table.lookup("chai rusk").unwrap();
        assert_eq!(key, "chai");
    }

    #[tokio::test]
    async fn test_adapter_never_returns_not_found() {
        let table = StaticFallbackTable::shared();
        let record = table.resolve("anything at all").await.unwrap();
        assert!(record.is_some());
        assert!(table.standalone_names().any(|n| n == "dal"));
        assert!(!table.standalone_names().any(|n| n == "chicken wing"));
    }
}
