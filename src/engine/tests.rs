//! Tests for the engine module

use super::*;
use crate::fetch::RetryPolicy;
use crate::http::HttpClientConfig;
use crate::output::MemorySink;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> KlaviyoClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .api_key("pk_test")
        .no_rate_limit()
        .build();
    KlaviyoClient::new(config, RetryPolicy::no_retry()).unwrap()
}

fn config(json: Value) -> ExtractorConfig {
    ExtractorConfig::from_json_str(&json.to_string()).unwrap()
}

fn rows(sink: &MemorySink, table: &str) -> Vec<Value> {
    sink.rows(table)
        .iter()
        .cloned()
        .map(Value::Object)
        .collect()
}

async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_lists_are_flattened() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/api/lists/",
        json!({
            "data": [
                {"type": "list", "id": "L1", "attributes": {"name": "VIP", "opt_in": {"double": true}}},
                {"type": "list", "id": "L2", "attributes": {"name": "All", "opt_in": {}}}
            ],
            "links": {"next": null}
        }),
    )
    .await;

    let cfg = config(json!({"api_token": "pk_test", "objects": {"lists": true}}));
    let mut extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    let columns = extractor.run().await.unwrap();

    assert_eq!(
        rows(extractor.sink(), "list"),
        vec![
            json!({"id": "L1", "name": "VIP", "opt_in_double": true}),
            json!({"id": "L2", "name": "All"}),
        ]
    );
    assert_eq!(columns["list"], vec!["id", "name", "opt_in_double"]);
    assert_eq!(extractor.stats().objects_extracted, 1);
    assert_eq!(extractor.stats().records_written, 2);
}

#[tokio::test]
async fn test_nested_attributes_kept_when_configured() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/api/metrics/",
        json!({
            "data": [{"type": "metric", "id": "M1", "attributes": {"integration": {"name": "Shopify"}}}],
            "links": {}
        }),
    )
    .await;

    let cfg = config(json!({
        "api_token": "pk_test",
        "objects": {"metrics": true},
        "store_nested_attributes": true
    }));
    let mut extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    extractor.run().await.unwrap();

    assert_eq!(
        rows(extractor.sink(), "metric"),
        vec![json!({"id": "M1", "integration": {"name": "Shopify"}})]
    );
}

#[tokio::test]
async fn test_profiles_by_segment_carry_parent_id() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/api/segments/S1/",
        json!({"data": {"type": "segment", "id": "S1", "attributes": {"name": "Buyers"}}}),
    )
    .await;
    mount_get(
        &server,
        "/api/segments/S1/profiles/",
        json!({
            "data": [{"type": "profile", "id": "P1", "attributes": {"email": "a@example.com"}}],
            "links": {"next": null}
        }),
    )
    .await;

    let cfg = config(json!({
        "api_token": "pk_test",
        "objects": {"profiles": true},
        "profiles_settings": {
            "fetch_profiles_mode": "fetch_by_segment",
            "fetch_profiles_by_segment": ["S1"]
        }
    }));
    let mut extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    extractor.run().await.unwrap();

    assert_eq!(
        rows(extractor.sink(), "segment_profile"),
        vec![json!({"id": "P1", "email": "a@example.com", "segment_id": "S1"})]
    );
}

#[tokio::test]
async fn test_unknown_segment_fails_validation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/segments/S9/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"title": "Not found", "detail": "no segment"}]
        })))
        .mount(&server)
        .await;

    let cfg = config(json!({
        "api_token": "pk_test",
        "objects": {"profiles": true},
        "profiles_settings": {
            "fetch_profiles_mode": "fetch_by_segment",
            "fetch_profiles_by_segment": ["S9"]
        }
    }));
    let mut extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    let err = extractor.run().await.unwrap_err();

    assert!(matches!(err, Error::Config { .. }));
    assert!(err.to_string().contains("Segment with ID S9 not found."));
    assert!(extractor.sink().tables().is_empty());
}

#[tokio::test]
async fn test_unknown_metric_fails_validation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/metrics/M404/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
        .mount(&server)
        .await;

    let cfg = config(json!({
        "api_token": "pk_test",
        "objects": {"metric_aggregates": true},
        "time_range_settings": {"date_from": "2024-01-01", "date_to": "2024-01-02"},
        "metric_aggregates_settings": {"metric_aggregates_ids": ["M404"]}
    }));
    let extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    let err = extractor.validate_parameters().await.unwrap_err();

    assert!(err.to_string().contains("Metric with ID M404 not found."));
}

#[tokio::test]
async fn test_bad_date_fails_validation() {
    let server = MockServer::start().await;
    let cfg = config(json!({
        "api_token": "pk_test",
        "objects": {"events": true},
        "time_range_settings": {"date_from": "whenever"}
    }));
    let extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());

    let err = extractor.validate_parameters().await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse date 'whenever'"));
}

#[tokio::test]
async fn test_campaigns_with_audiences_and_messages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/campaigns"))
        .and(query_param("page", "0"))
        .and(query_param("count", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "$list",
            "page": 0,
            "total": 1,
            "data": [{
                "object": "campaign",
                "id": "C1",
                "name": "Spring",
                "lists": [{"object": "list", "id": "L1"}],
                "excluded_lists": [{"object": "list", "id": "L2"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_get(
        &server,
        "/api/campaigns/C1/campaign-messages/",
        json!({
            "data": [{
                "type": "campaign-message",
                "id": "CM1",
                "attributes": {"label": "Spring", "content": {"subject": "Hi"}}
            }],
            "links": {"next": null}
        }),
    )
    .await;

    let cfg = config(json!({"api_token": "pk_test", "objects": {"campaigns": true}}));
    let mut extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    extractor.run().await.unwrap();
    let sink = extractor.sink();

    assert_eq!(rows(sink, "campaign"), vec![json!({"id": "C1", "name": "Spring"})]);
    assert_eq!(
        rows(sink, CAMPAIGN_AUDIENCE_TABLE),
        vec![json!({"campaign_id": "C1", "list_id": "L1"})]
    );
    assert_eq!(
        rows(sink, CAMPAIGN_EXCLUDED_AUDIENCE_TABLE),
        vec![json!({"campaign_id": "C1", "list_id": "L2"})]
    );
    assert_eq!(
        rows(sink, "campaign_message"),
        vec![json!({
            "id": "CM1",
            "label": "Spring",
            "content_subject": "Hi",
            "campaign_id": "C1"
        })]
    );
}

#[tokio::test]
async fn test_segments_keep_name_and_definition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/segments/"))
        .and(query_param("fields[segment]", "name,definition"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "type": "segment",
                "id": "S1",
                "attributes": {"name": "Buyers", "definition": {"condition_groups": []}}
            }],
            "links": {"next": null}
        })))
        .mount(&server)
        .await;

    let cfg = config(json!({"api_token": "pk_test", "objects": {"segments": true}}));
    let mut extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    extractor.run().await.unwrap();

    assert_eq!(
        rows(extractor.sink(), "segment"),
        vec![json!({"id": "S1", "name": "Buyers", "definition": {"condition_groups": []}})]
    );
}

#[tokio::test]
async fn test_metric_aggregates_rows() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/api/metrics/M1/",
        json!({"data": {"type": "metric", "id": "M1", "attributes": {"name": "Placed Order"}}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/metric-aggregates/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "type": "metric-aggregate",
                "id": "agg",
                "attributes": {
                    "dates": ["2024-01-01T00:00:00+00:00"],
                    "data": [{"dimensions": [], "measurements": {"count": 0, "unique": [2], "sum_value": [3.5]}}]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(json!({
        "api_token": "pk_test",
        "objects": {"metric_aggregates": true},
        "time_range_settings": {"date_from": "2024-01-01", "date_to": "2024-01-02"},
        "metric_aggregates_settings": {"metric_aggregates_ids": ["M1"], "metric_aggregates_interval": "day"}
    }));
    let mut extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    extractor.run().await.unwrap();

    assert_eq!(
        rows(extractor.sink(), METRIC_AGGREGATES_TABLE),
        vec![json!({
            "id": "2024-01-01T00:00:00+00:00_M1",
            "metric_id": "M1",
            "date": "2024-01-01T00:00:00+00:00",
            "count": null,
            "unique": 2,
            "sum_value": 3.5,
            "dimensions": ["NO DIMENSIONS SELECTED"]
        })]
    );
}

#[tokio::test]
async fn test_disabled_objects_make_no_calls() {
    let server = MockServer::start().await;
    let cfg = config(json!({"api_token": "pk_test"}));

    let mut extractor = Extractor::new(client_for(&server), cfg, MemorySink::new());
    let columns = extractor.run().await.unwrap();

    assert!(columns.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[test]
fn test_take_audiences_current_shape() {
    let mut attributes = json!({
        "name": "x",
        "audiences": {"included": ["L1", "L2"], "excluded": []}
    })
    .as_object()
    .cloned()
    .unwrap();

    let (included, excluded) = take_audiences(&mut attributes);

    assert_eq!(included, vec!["L1", "L2"]);
    assert!(excluded.is_empty());
    assert!(!attributes.contains_key("audiences"));
}

#[test]
fn test_take_audiences_missing() {
    let mut attributes = JsonObject::new();
    let (included, excluded) = take_audiences(&mut attributes);
    assert!(included.is_empty() && excluded.is_empty());
}

#[test]
fn test_run_state_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    assert_eq!(RunState::load(&path).unwrap(), RunState::default());

    let mut state = RunState {
        last_run: Some(1_700_000_000),
        ..Default::default()
    };
    state
        .columns
        .insert("list".to_string(), vec!["id".to_string(), "name".to_string()]);
    state.save(&path).unwrap();

    assert_eq!(RunState::load(&path).unwrap(), state);
}

#[test]
fn test_run_state_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(matches!(RunState::load(&path), Err(Error::Config { .. })));
}
