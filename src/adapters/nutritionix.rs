use crate::adapters::http::HttpPolicy;
use crate::domain::model::{Confidence, NutritionRecord, SourceId};
use crate::domain::ports::SourceAdapter;
use crate::utils::error::{ResolveError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://trackapi.nutritionix.com";

const SOURCE_NAME: &str = "nutritionix";

#[derive(Debug, Deserialize)]
struct NaturalResponse {
    #[serde(default)]
    foods: Vec<NixFood>,
}

#[derive(Debug, Deserialize)]
struct NixFood {
    #[serde(default)]
    food_name: String,
    nf_calories: Option<f64>,
    nf_protein: Option<f64>,
    nf_total_carbohydrate: Option<f64>,
    nf_total_fat: Option<f64>,
}

/// Secondary source for restaurant and branded items, queried through the
/// natural-language nutrients endpoint.
pub struct NutritionixAdapter {
    credentials: Option<(String, String)>,
    base_url: String,
    policy: HttpPolicy,
    client: Client,
}

impl NutritionixAdapter {
    pub fn new(
        app_id: Option<String>,
        app_key: Option<String>,
        base_url: &str,
        policy: HttpPolicy,
    ) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let credentials = match (present(app_id), present(app_key)) {
            (Some(id), Some(key)) => Some((id, key)),
            _ => None,
        };
        Self {
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: policy.client(None),
            policy,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

#[async_trait]
impl SourceAdapter for NutritionixAdapter {
    fn source_id(&self) -> SourceId {
        SourceId::Secondary
    }

    fn time_budget(&self) -> Duration {
        self.policy.worst_case()
    }

    async fn resolve(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        let Some((app_id, app_key)) = &self.credentials else {
            return Ok(None);
        };

        let url = format!("{}/v2/natural/nutrients", self.base_url);
        let body = serde_json::json!({ "query": food_name });
        tracing::debug!("Querying Nutritionix for '{}'", food_name);
        let response = self
            .policy
            .send(SOURCE_NAME, || {
                self.client
                    .post(&url)
                    .header("x-app-id", app_id.as_str())
                    .header("x-app-key", app_key.as_str())
                    .json(&body)
            })
            .await?;

        // The endpoint answers 404 when it cannot match the query.
        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        let parsed: NaturalResponse =
            response
                .json()
                .await
                .map_err(|e| ResolveError::MalformedResponse {
                    source_name: SOURCE_NAME.to_string(),
                    message: e.to_string(),
                })?;

        // Entries without calories are never chosen, even on an exact name.
        let usable = || parsed.foods.iter().filter(|f| f.nf_calories.is_some());
        let best = usable()
            .find(|f| f.food_name.trim().eq_ignore_ascii_case(food_name.trim()))
            .or_else(|| usable().next());

        Ok(best.and_then(|food| {
            let calories = food.nf_calories?;
            let name = if food.food_name.is_empty() {
                food_name
            } else {
                food.food_name.as_str()
            };
            Some(NutritionRecord::new(
                name,
                calories,
                food.nf_protein.unwrap_or(0.0),
                food.nf_total_carbohydrate.unwrap_or(0.0),
                food.nf_total_fat.unwrap_or(0.0),
                SourceId::Secondary,
                Confidence::High,
            ))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn adapter(server: &MockServer) -> NutritionixAdapter {
        NutritionixAdapter::new(
            Some("app".to_string()),
            Some("secret".to_string()),
            &server.base_url(),
            HttpPolicy {
                timeout: Duration::from_secs(2),
                retry_attempts: 0,
                retry_delay: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn test_sends_credentials_and_maps_fields() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/natural/nutrients")
                .header("x-app-id", "app")
                .header("x-app-key", "secret")
                .json_body(serde_json::json!({"query": "big mac"}));
            then.status(200).json_body(serde_json::json!({
                "foods": [{
                    "food_name": "big mac",
                    "nf_calories": 563.0,
                    "nf_protein": 25.9,
                    "nf_total_carbohydrate": 44.0,
                    "nf_total_fat": 32.8
                }]
            }));
        });

        let record = adapter(&server).resolve("big mac").await.unwrap().unwrap();

        mock.assert();
        assert_eq!(record.calories, 563.0);
        assert_eq!(record.fat_g, 32.8);
        assert_eq!(record.source_id, SourceId::Secondary);
    }

    #[tokio::test]
    async fn test_exact_name_beats_first_entry() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/natural/nutrients");
            then.status(200).json_body(serde_json::json!({
                "foods": [
                    {"food_name": "coke zero", "nf_calories": 0.0},
                    {"food_name": "Coke", "nf_calories": 140.0, "nf_total_carbohydrate": 39.0}
                ]
            }));
        });

        let record = adapter(&server).resolve("coke").await.unwrap().unwrap();

        assert_eq!(record.food_name, "Coke");
        assert_eq!(record.calories, 140.0);
    }

    #[tokio::test]
    async fn test_unmatched_query_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/natural/nutrients");
            then.status(404)
                .json_body(serde_json::json!({"message": "We couldn't match any of your foods"}));
        });

        assert!(adapter(&server).resolve("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_credentials_disable_adapter() {
        let adapter = NutritionixAdapter::new(
            Some("app".to_string()),
            None,
            DEFAULT_BASE_URL,
            HttpPolicy::default(),
        );
        assert!(!adapter.is_configured());
        assert!(adapter.resolve("coke").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exact_name_without_calories_is_skipped() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/natural/nutrients");
            then.status(200).json_body(serde_json::json!({
                "foods": [
                    {"food_name": "latte with oat milk", "nf_calories": 130.0, "nf_protein": 3.0},
                    {"food_name": "latte"}
                ]
            }));
        });

        let record = adapter(&server).resolve("latte").await.unwrap().unwrap();

        assert_eq!(record.food_name, "latte with oat milk");
        assert_eq!(record.calories, 130.0);
    }
}
