use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Unit {
    Piece,
    Cup,
    Gram,
    Medium,
    Serving,
    Ounce,
    Large,
    Small,
    Unspecified,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Unit::Piece => "piece",
            Unit::Cup => "cup",
            Unit::Gram => "gram",
            Unit::Medium => "medium",
            Unit::Serving => "serving",
            Unit::Ounce => "oz",
            Unit::Large => "large",
            Unit::Small => "small",
            Unit::Unspecified => "unspecified",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantitySpec {
    pub multiplier: f64,
    pub unit: Unit,
    pub raw_match: Option<String>,
}

impl QuantitySpec {
    pub fn unspecified() -> Self {
        Self {
            multiplier: 1.0,
            unit: Unit::Unspecified,
            raw_match: None,
        }
    }
}

impl Default for QuantitySpec {
    fn default() -> Self {
        Self::unspecified()
    }
}

/// One food item of a message. Built by the splitter (or handed in
/// pre-split by an upstream parser) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodPhrase {
    pub raw_text: String,
    pub normalized_name: String,
    pub quantity: QuantitySpec,
    /// Calories the user wrote next to the item, e.g. "(400 cals)".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_calories: Option<f64>,
}

impl FoodPhrase {
    /// Phrase supplied already split by an upstream parser.
    pub fn given(name: &str, multiplier: f64, unit: Unit) -> Self {
        let normalized_name = name.trim().to_lowercase();
        Self {
            raw_text: name.to_string(),
            normalized_name,
            quantity: QuantitySpec {
                multiplier,
                unit,
                raw_match: None,
            },
            declared_calories: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceId {
    Primary,
    Secondary,
    Web,
    Fallback,
    UserSupplied,
    Unknown,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceId::Primary => "primary",
            SourceId::Secondary => "secondary",
            SourceId::Web => "web",
            SourceId::Fallback => "fallback",
            SourceId::UserSupplied => "userSupplied",
            SourceId::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionRecord {
    pub food_name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub source_id: SourceId,
    pub confidence: Confidence,
    /// Set only on the static table's catch-all record.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generic_default: bool,
}

impl NutritionRecord {
    /// Builds a record, clamping negative or non-finite macros to zero.
    pub fn new(
        food_name: impl Into<String>,
        calories: f64,
        protein_g: f64,
        carbs_g: f64,
        fat_g: f64,
        source_id: SourceId,
        confidence: Confidence,
    ) -> Self {
        Self {
            food_name: food_name.into(),
            calories: non_negative(calories),
            protein_g: non_negative(protein_g),
            carbs_g: non_negative(carbs_g),
            fat_g: non_negative(fat_g),
            source_id,
            confidence,
            generic_default: false,
        }
    }

    pub fn user_supplied(food_name: impl Into<String>, calories: f64) -> Self {
        Self::new(
            food_name,
            calories,
            0.0,
            0.0,
            0.0,
            SourceId::UserSupplied,
            Confidence::High,
        )
    }

    /// Every macro multiplied by `factor`; provenance is kept.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            food_name: self.food_name.clone(),
            calories: non_negative(self.calories * factor),
            protein_g: non_negative(self.protein_g * factor),
            carbs_g: non_negative(self.carbs_g * factor),
            fat_g: non_negative(self.fat_g * factor),
            source_id: self.source_id,
            confidence: self.confidence,
            generic_default: self.generic_default,
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl NutritionTotals {
    pub fn add(&mut self, record: &NutritionRecord) {
        self.calories += record.calories;
        self.protein_g += record.protein_g;
        self.carbs_g += record.carbs_g;
        self.fat_g += record.fat_g;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedItem {
    pub phrase: FoodPhrase,
    /// Already scaled by `phrase.quantity.multiplier`.
    pub record: NutritionRecord,
}

impl ResolvedItem {
    pub fn is_unresolved(&self) -> bool {
        self.record.generic_default
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    items: Vec<ResolvedItem>,
    totals: NutritionTotals,
    unresolved_count: usize,
}

impl AggregateResult {
    pub fn from_items(items: Vec<ResolvedItem>) -> Self {
        let mut totals = NutritionTotals::default();
        let mut unresolved_count = 0;
        for item in &items {
            totals.add(&item.record);
            if item.is_unresolved() {
                unresolved_count += 1;
            }
        }
        Self {
            items,
            totals,
            unresolved_count,
        }
    }

    pub fn items(&self) -> &[ResolvedItem] {
        &self.items
    }

    pub fn totals(&self) -> &NutritionTotals {
        &self.totals
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved_count
    }

    /// Human-readable breakdown shown to the user before anything is saved.
    pub fn breakdown(&self) -> String {
        let mut lines = Vec::with_capacity(self.items.len() + 3);
        for item in &self.items {
            let quantity = &item.phrase.quantity;
            let amount = match quantity.unit {
                Unit::Unspecified => String::new(),
                unit => format!(" ({} {})", format_number(quantity.multiplier), unit),
            };
            lines.push(format!(
                "• {}{}: {:.0} kcal, P {:.1}g, C {:.1}g, F {:.1}g [{}, {} confidence]",
                item.phrase.normalized_name,
                amount,
                item.record.calories,
                item.record.protein_g,
                item.record.carbs_g,
                item.record.fat_g,
                item.record.source_id,
                item.record.confidence,
            ));
        }
        lines.push(format!(
            "Total: {:.0} kcal, P {:.1}g, C {:.1}g, F {:.1}g",
            self.totals.calories, self.totals.protein_g, self.totals.carbs_g, self.totals.fat_g
        ));
        if self.unresolved_count > 0 {
            lines.push(format!(
                "{} item(s) used a generic estimate. Could you be more specific?",
                self.unresolved_count
            ));
        }
        lines.join("\n")
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
