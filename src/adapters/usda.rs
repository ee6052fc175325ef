use crate::adapters::http::HttpPolicy;
use crate::domain::model::{Confidence, NutritionRecord, SourceId};
use crate::domain::ports::SourceAdapter;
use crate::utils::error::{ResolveError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.nal.usda.gov";

const SOURCE_NAME: &str = "usda";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<UsdaFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaFood {
    #[serde(default)]
    description: String,
    #[serde(default)]
    food_nutrients: Vec<UsdaNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaNutrient {
    nutrient_id: Option<u32>,
    nutrient_number: Option<String>,
    value: Option<f64>,
}

enum Macro {
    Energy,
    /// Atwater energy, reported by Foundation foods that lack plain energy.
    AtwaterEnergy,
    Protein,
    Carbs,
    Fat,
}

impl UsdaNutrient {
    fn kind(&self) -> Option<Macro> {
        let by_id = match self.nutrient_id {
            Some(1008) => Some(Macro::Energy),
            Some(2047) | Some(2048) => Some(Macro::AtwaterEnergy),
            Some(1003) => Some(Macro::Protein),
            Some(1005) => Some(Macro::Carbs),
            Some(1004) => Some(Macro::Fat),
            _ => None,
        };
        by_id.or_else(|| match self.nutrient_number.as_deref() {
            Some("208") => Some(Macro::Energy),
            Some("957") | Some("958") => Some(Macro::AtwaterEnergy),
            Some("203") => Some(Macro::Protein),
            Some("205") => Some(Macro::Carbs),
            Some("204") => Some(Macro::Fat),
            _ => None,
        })
    }
}

/// Primary structured source: USDA FoodData Central food search.
pub struct UsdaAdapter {
    api_key: Option<String>,
    base_url: String,
    page_size: u32,
    policy: HttpPolicy,
    client: Client,
}

impl UsdaAdapter {
    pub fn new(api_key: Option<String>, base_url: &str, page_size: u32, policy: HttpPolicy) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
            client: policy.client(None),
            policy,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl SourceAdapter for UsdaAdapter {
    fn source_id(&self) -> SourceId {
        SourceId::Primary
    }

    fn time_budget(&self) -> Duration {
        self.policy.worst_case()
    }

    async fn resolve(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };

        let url = format!("{}/fdc/v1/foods/search", self.base_url);
        let page_size = self.page_size.to_string();
        tracing::debug!("Querying USDA for '{}'", food_name);
        let response = self
            .policy
            .send(SOURCE_NAME, || {
                self.client.get(&url).query(&[
                    ("api_key", api_key.as_str()),
                    ("query", food_name),
                    ("pageSize", page_size.as_str()),
                    ("dataType", "Foundation,SR Legacy"),
                ])
            })
            .await?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        let body: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| ResolveError::MalformedResponse {
                    source_name: SOURCE_NAME.to_string(),
                    message: e.to_string(),
                })?;

        Ok(pick_best(&body.foods, food_name))
    }
}

/// Among foods that carry an energy value, an exact case-insensitive
/// description match wins, otherwise the first such hit.
fn pick_best(foods: &[UsdaFood], food_name: &str) -> Option<NutritionRecord> {
    let exact = foods
        .iter()
        .filter(|f| f.description.trim().eq_ignore_ascii_case(food_name.trim()))
        .find_map(|f| to_record(f, food_name));
    exact.or_else(|| foods.iter().find_map(|f| to_record(f, food_name)))
}

fn to_record(food: &UsdaFood, food_name: &str) -> Option<NutritionRecord> {
    let mut energy = None;
    let mut atwater = None;
    let (mut protein, mut carbs, mut fat) = (0.0, 0.0, 0.0);
    for nutrient in &food.food_nutrients {
        let value = nutrient.value.unwrap_or(0.0);
        match nutrient.kind() {
            Some(Macro::Energy) => energy = Some(value),
            Some(Macro::AtwaterEnergy) => atwater = atwater.or(Some(value)),
            Some(Macro::Protein) => protein = value,
            Some(Macro::Carbs) => carbs = value,
            Some(Macro::Fat) => fat = value,
            None => {}
        }
    }

    let name = if food.description.is_empty() {
        food_name
    } else {
        food.description.as_str()
    };
    energy.or(atwater).map(|calories| {
        NutritionRecord::new(
            name,
            calories,
            protein,
            carbs,
            fat,
            SourceId::Primary,
            Confidence::High,
        )
    })
}
