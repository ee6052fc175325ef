use crate::domain::model::AggregateResult;
use crate::utils::error::{ResolveError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chosen by the user after seeing the breakdown; never inferred here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        };
        f.write_str(label)
    }
}

impl FromStr for MealType {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => Err(ResolveError::invalid_input(format!(
                "unknown meal type '{}', expected one of breakfast, lunch, dinner, snack",
                other
            ))),
        }
    }
}

/// One row in the food log, named the way the log's columns are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealLogRow {
    #[serde(rename = "Food")]
    pub food: String,
    #[serde(rename = "Calories")]
    pub calories: i64,
    #[serde(rename = "Proteins")]
    pub proteins: f64,
    #[serde(rename = "Carbs")]
    pub carbs: f64,
    #[serde(rename = "Fats")]
    pub fats: f64,
    #[serde(rename = "Meal")]
    pub meal: MealType,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Source")]
    pub source: String,
}

impl MealLogRow {
    pub fn from_aggregate(result: &AggregateResult, meal: MealType) -> Vec<Self> {
        Self::from_aggregate_at(result, meal, Local::now())
    }

    pub fn from_aggregate_at(
        result: &AggregateResult,
        meal: MealType,
        logged_at: DateTime<Local>,
    ) -> Vec<Self> {
        let date = logged_at.to_rfc3339();
        result
            .items()
            .iter()
            .map(|item| MealLogRow {
                food: item.phrase.normalized_name.clone(),
                calories: item.record.calories.round() as i64,
                proteins: round_one_decimal(item.record.protein_g),
                carbs: round_one_decimal(item.record.carbs_g),
                fats: round_one_decimal(item.record.fat_g),
                meal,
                date: date.clone(),
                source: item.record.source_id.to_string(),
            })
            .collect()
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
