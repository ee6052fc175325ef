use httpmock::prelude::*;
use meal_resolver::{Aggregator, Confidence, ResolveError, ResolverConfig, SourceId, Unit};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

const USDA_PATH: &str = "/fdc/v1/foods/search";
const NIX_PATH: &str = "/v2/natural/nutrients";
const WEB_PATH: &str = "/web/search";

/// All three network sources pointed at one mock server. Unmocked routes
/// answer 404, which every adapter reads as no match.
fn config_for(server: &MockServer) -> ResolverConfig {
    let mut config = ResolverConfig::default();

    config.usda.base_url = server.base_url();
    config.usda.api_key = Some("usda-key".to_string());
    config.usda.timeout_seconds = 2;
    config.usda.retry_attempts = 0;
    config.usda.retry_delay_millis = 1;

    config.nutritionix.base_url = server.base_url();
    config.nutritionix.app_id = Some("app".to_string());
    config.nutritionix.app_key = Some("secret".to_string());
    config.nutritionix.timeout_seconds = 2;
    config.nutritionix.retry_attempts = 0;

    config.web.destinations = vec![format!("{}{}?q={{query}}", server.base_url(), WEB_PATH)];
    config.web.politeness_delay_millis = 1;
    config.web.timeout_seconds = 2;
    config.web.total_timeout_seconds = 3;

    config
}

#[tokio::test]
async fn test_primary_source_wins_and_is_scaled() {
    let server = MockServer::start();
    let usda = server.mock(|when, then| {
        when.method(GET)
            .path(USDA_PATH)
            .query_param("api_key", "usda-key")
            .query_param("query", "chicken wing")
            .query_param("dataType", "Foundation,SR Legacy");
        then.status(200).json_body(json!({
            "foods": [{
                "description": "Chicken wing",
                "foodNutrients": [
                    {"nutrientId": 1008, "value": 86.0},
                    {"nutrientId": 1003, "value": 8.0},
                    {"nutrientId": 1005, "value": 0.0},
                    {"nutrientId": 1004, "value": 5.8}
                ]
            }]
        }));
    });
    let nix = server.mock(|when, then| {
        when.method(POST).path(NIX_PATH);
        then.status(200).json_body(json!({"foods": []}));
    });

    let aggregator = Aggregator::from_config(&config_for(&server));
    let result = aggregator
        .aggregate("I just ate chicken wing 6-piece")
        .await
        .unwrap();

    usda.assert();
    nix.assert_hits(0);

    assert_eq!(result.items().len(), 1);
    let item = &result.items()[0];
    assert_eq!(item.phrase.normalized_name, "chicken wing");
    assert_eq!(item.phrase.quantity.multiplier, 6.0);
    assert_eq!(item.phrase.quantity.unit, Unit::Piece);
    assert_eq!(item.record.source_id, SourceId::Primary);
    assert_eq!(item.record.confidence, Confidence::High);
    assert!((item.record.calories - 516.0).abs() < 1e-9);
    assert!((result.totals().protein_g - 48.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_secondary_answers_when_primary_has_no_match() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(USDA_PATH);
        then.status(200).json_body(json!({"foods": []}));
    });
    let pizza = server.mock(|when, then| {
        when.method(POST)
            .path(NIX_PATH)
            .header("x-app-id", "app")
            .header("x-app-key", "secret")
            .body_contains("pizza slice");
        then.status(200).json_body(json!({
            "foods": [{
                "food_name": "pizza slice",
                "nf_calories": 285.0,
                "nf_protein": 12.0,
                "nf_total_carbohydrate": 36.0,
                "nf_total_fat": 10.0
            }]
        }));
    });
    let coke = server.mock(|when, then| {
        when.method(POST).path(NIX_PATH).body_contains("coke");
        then.status(200).json_body(json!({
            "foods": [{"food_name": "coke", "nf_calories": 140.0, "nf_total_carbohydrate": 39.0}]
        }));
    });
    let web = server.mock(|when, then| {
        when.method(GET).path(WEB_PATH);
        then.status(200).body("Calories: 999kcal");
    });

    let result = Aggregator::from_config(&config_for(&server))
        .aggregate("pizza slice and coke")
        .await
        .unwrap();

    pizza.assert();
    coke.assert();
    web.assert_hits(0);

    let sources: Vec<SourceId> = result.items().iter().map(|i| i.record.source_id).collect();
    assert_eq!(sources, vec![SourceId::Secondary, SourceId::Secondary]);
    assert!((result.totals().calories - 425.0).abs() < 1e-9);
    assert!((result.totals().carbs_g - 75.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_web_estimate_used_when_apis_fail() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(USDA_PATH);
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(POST).path(NIX_PATH);
        then.status(503);
    });
    let web = server.mock(|when, then| {
        when.method(GET).path(WEB_PATH).query_param("q", "samosa");
        then.status(200)
            .body("<html><body><p>Samosa: Calories 262 kcal, Protein 3.5 g, Carbs 24 g, Fat 17 g</p></body></html>");
    });

    let result = Aggregator::from_config(&config_for(&server))
        .aggregate("samosa")
        .await
        .unwrap();

    web.assert();
    let record = &result.items()[0].record;
    assert_eq!(record.source_id, SourceId::Web);
    assert_eq!(record.confidence, Confidence::Medium);
    assert_eq!(record.calories, 262.0);
    assert_eq!(record.fat_g, 17.0);
}

#[tokio::test]
async fn test_everything_down_still_produces_a_result() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(USDA_PATH);
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(POST).path(NIX_PATH);
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(GET).path(WEB_PATH);
        then.status(500);
    });

    let result = Aggregator::from_config(&config_for(&server))
        .aggregate("pizza slice and coke")
        .await
        .unwrap();

    assert_eq!(result.items().len(), 2);
    for item in result.items() {
        assert_eq!(item.record.source_id, SourceId::Fallback);
        assert_eq!(item.record.confidence, Confidence::Low);
    }
    assert_eq!(result.unresolved_count(), 0);

    let summed: f64 = result.items().iter().map(|i| i.record.calories).sum();
    assert!((result.totals().calories - summed).abs() < 1e-9);
    assert!((result.totals().calories - (285.0 + 140.0)).abs() < 1e-9);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start();
    let usda = server.mock(|when, then| {
        when.method(GET).path(USDA_PATH);
        then.status(503);
    });

    let mut config = config_for(&server);
    config.usda.retry_attempts = 1;
    config.nutritionix.enabled = false;
    config.web.enabled = false;

    let result = Aggregator::from_config(&config).aggregate("rice").await.unwrap();

    usda.assert_hits(2);
    assert_eq!(result.items()[0].record.source_id, SourceId::Fallback);
}

#[tokio::test]
async fn test_missing_credentials_skip_api_sources() {
    let server = MockServer::start();
    let usda = server.mock(|when, then| {
        when.method(GET).path(USDA_PATH);
        then.status(200).json_body(json!({"foods": []}));
    });
    let nix = server.mock(|when, then| {
        when.method(POST).path(NIX_PATH);
        then.status(200).json_body(json!({"foods": []}));
    });

    let mut config = config_for(&server);
    config.usda.api_key = Some("${MEAL_RESOLVER_NO_SUCH_VAR}".to_string());
    config.nutritionix.app_key = Some("  ".to_string());
    config.web.enabled = false;

    let result = Aggregator::from_config(&config).aggregate("dal").await.unwrap();

    usda.assert_hits(0);
    nix.assert_hits(0);
    assert_eq!(result.items()[0].record.source_id, SourceId::Fallback);
}

#[tokio::test]
async fn test_passed_deadline_skips_network() {
    let server = MockServer::start();
    let usda = server.mock(|when, then| {
        when.method(GET).path(USDA_PATH);
        then.status(200).json_body(json!({"foods": []}));
    });

    let aggregator = Aggregator::from_config(&config_for(&server));
    let result = aggregator
        .aggregate_with_deadline("2 cups rice and dal", tokio::time::Instant::now())
        .await
        .unwrap();

    usda.assert_hits(0);
    assert_eq!(result.items().len(), 2);
    assert!(result
        .items()
        .iter()
        .all(|i| i.record.source_id == SourceId::Fallback));
    assert!((result.items()[0].record.calories - 260.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_deadline_cuts_in_flight_lookups_short() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(USDA_PATH);
        then.status(200)
            .delay(Duration::from_secs(3))
            .json_body(json!({"foods": []}));
    });

    let mut config = config_for(&server);
    config.usda.timeout_seconds = 5;

    let started = Instant::now();
    let result = Aggregator::from_config(&config)
        .aggregate_with_deadline("rice and dal", started + Duration::from_millis(300))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(1), "elapsed {:?}", elapsed);
    assert!(result
        .items()
        .iter()
        .all(|i| i.record.source_id == SourceId::Fallback));
}

#[tokio::test]
async fn test_web_requests_are_spaced_across_items() {
    let server = MockServer::start();
    let web = server.mock(|when, then| {
        when.method(GET).path(WEB_PATH);
        then.status(200).body("<p>Calories: 100kcal</p>");
    });

    let mut config = config_for(&server);
    config.usda.enabled = false;
    config.nutritionix.enabled = false;
    config.web.politeness_delay_millis = 250;

    let started = Instant::now();
    let result = Aggregator::from_config(&config)
        .aggregate("apple, banana, pear and plum")
        .await
        .unwrap();
    let elapsed = started.elapsed();

    web.assert_hits(4);
    assert!(result
        .items()
        .iter()
        .all(|i| i.record.source_id == SourceId::Web));
    assert!(elapsed >= Duration::from_millis(750), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_declared_calories_override_lookup() {
    let result = Aggregator::from_config(&ResolverConfig::offline())
        .aggregate("a double choco chip muffin (400 cals) and an iced cappuccino (173 cals)")
        .await
        .unwrap();

    let names: Vec<&str> = result
        .items()
        .iter()
        .map(|i| i.phrase.normalized_name.as_str())
        .collect();
    assert_eq!(names, vec!["double choco chip muffin", "iced cappuccino"]);
    for item in result.items() {
        assert_eq!(item.record.source_id, SourceId::UserSupplied);
        assert_eq!(item.record.confidence, Confidence::High);
    }
    assert!((result.totals().calories - 573.0).abs() < 1e-9);
    assert_eq!(result.unresolved_count(), 0);
}

#[tokio::test]
async fn test_empty_message_fails_fast() {
    let aggregator = Aggregator::from_config(&ResolverConfig::offline());
    let result = aggregator.aggregate("").await;
    assert!(matches!(result, Err(ResolveError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_same_message_same_result() {
    let aggregator = Aggregator::from_config(&ResolverConfig::offline());
    let message = "I ate dal roti and subzi, 2 eggs & some mystery stew";

    let first = aggregator.aggregate(message).await.unwrap();
    let second = aggregator.aggregate(message).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.items().len(), 5);
    assert_eq!(first.unresolved_count(), 1);
    assert!(first.breakdown().contains("Could you be more specific?"));
}
