//! Quantity detection for a single food phrase.
//!
//! Patterns are tried in order and the first hit wins. Each pattern names
//! the `tok` span to cut from the phrase and the `n` capture to parse.

use crate::domain::model::{QuantitySpec, Unit};
use regex::Regex;
use std::sync::LazyLock;

struct QuantityPattern {
    regex: Regex,
    unit: Unit,
}

const NUMBER: &str = r"(?P<n>\d+(?:\.\d+)?)";

static PATTERNS: LazyLock<Vec<QuantityPattern>> = LazyLock::new(|| {
    let table: [(String, Unit); 10] = [
        (format!(r"(?P<tok>\b{NUMBER}\s*-\s*pieces?\b)"), Unit::Piece),
        (format!(r"(?P<tok>\b{NUMBER}\s+pieces?\b)"), Unit::Piece),
        (format!(r"(?P<tok>\b{NUMBER}\s+cups?\b)"), Unit::Cup),
        (format!(r"(?P<tok>\b{NUMBER}\s*(?:grams?|g)\b)"), Unit::Gram),
        (format!(r"(?P<tok>\b{NUMBER}\s+medium\b)"), Unit::Medium),
        (format!(r"(?P<tok>\b{NUMBER}\s+servings?\b)"), Unit::Serving),
        (format!(r"(?P<tok>\b{NUMBER}\s*oz\b)"), Unit::Ounce),
        (format!(r"(?P<tok>\b{NUMBER}\s+large\b)"), Unit::Large),
        (format!(r"(?P<tok>\b{NUMBER}\s+small\b)"), Unit::Small),
        // Bare leading count followed by a noun: "2 eggs".
        (format!(r"^(?P<tok>{NUMBER}\s+)[a-z]"), Unit::Piece),
    ];
    table
        .into_iter()
        .map(|(pattern, unit)| QuantityPattern {
            regex: Regex::new(&pattern).expect("valid quantity pattern"),
            unit,
        })
        .collect()
});

static LEADING_CONNECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:of|x)\s+").expect("valid connector pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Returns the detected quantity and the phrase with the quantity token cut
/// out. Expects lowercase input.
pub fn extract_quantity(segment: &str) -> (QuantitySpec, String) {
    for pattern in PATTERNS.iter() {
        let Some(caps) = pattern.regex.captures(segment) else {
            continue;
        };
        let (Some(tok), Some(n)) = (caps.name("tok"), caps.name("n")) else {
            continue;
        };
        let multiplier = match n.as_str().parse::<f64>() {
            Ok(value) if value > 0.0 && value.is_finite() => value,
            _ => continue,
        };

        let mut remainder = String::with_capacity(segment.len());
        remainder.push_str(&segment[..tok.start()]);
        remainder.push(' ');
        remainder.push_str(&segment[tok.end()..]);

        let spec = QuantitySpec {
            multiplier,
            unit: pattern.unit,
            raw_match: Some(tok.as_str().trim().to_string()),
        };
        return (spec, tidy(&remainder));
    }

    (QuantitySpec::unspecified(), tidy(segment))
}

fn tidy(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    LEADING_CONNECTOR.replace(&collapsed, "").trim().to_string()
}
