//! End-to-end ingestion against mocked geocoding and forecast services.

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use weatherwatch_core::UpstreamConfig;
use weatherwatch_ingest::{
    IngestStep, IngestionPipeline, Scheduler, SchedulerState, TrackedLocation,
};
use weatherwatch_store::{Reading, ReadingStore};
use weatherwatch_weather::WeatherProvider;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pipeline_for(server: &MockServer, store: ReadingStore) -> IngestionPipeline {
    let provider = WeatherProvider::new(&UpstreamConfig {
        geocoding_url: format!("{}/v1/search", server.uri()),
        forecast_url: format!("{}/v1/forecast", server.uri()),
        timeout_secs: 5,
        language: "en".to_string(),
    })
    .unwrap();

    IngestionPipeline::new(provider.geocoding, provider.forecast, store)
}

fn geocoding_match(latitude: f64, longitude: f64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "results": [{
            "id": 524901,
            "name": "Moscow",
            "latitude": latitude,
            "longitude": longitude,
            "country": "Russia"
        }],
        "generationtime_ms": 0.5
    }))
}

fn current(time: &str, temperature: f64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "latitude": 55.75,
        "longitude": 37.625,
        "current": {"time": time, "interval": 900, "temperature_2m": temperature}
    }))
}

fn at(hour: u32, minute: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
}

async fn mount_moscow(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Moscow"))
        .respond_with(geocoding_match(55.75, 37.62))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cycle_stores_reading_under_normalized_key() {
    let server = MockServer::start().await;
    mount_moscow(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "55.75"))
        .and(query_param("longitude", "37.62"))
        .respond_with(current("2024-01-01T12:00", -5.0))
        .expect(1)
        .mount(&server)
        .await;

    let store = ReadingStore::memory();
    let pipeline = pipeline_for(&server, store.clone());

    pipeline
        .run_cycle(&TrackedLocation::new("Moscow"))
        .await
        .unwrap();

    assert_eq!(
        store.latest("moscow").await.unwrap(),
        Some(Reading::new("moscow", at(12, 0), -5.0))
    );
}

#[tokio::test]
async fn test_resolver_failure_fetches_nothing_and_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "generationtime_ms": 0.3
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(current("2024-01-01T12:00", -5.0))
        .expect(0)
        .mount(&server)
        .await;

    let store = ReadingStore::memory();
    let pipeline = pipeline_for(&server, store.clone());

    let err = pipeline
        .run_cycle(&TrackedLocation::new("Atlantis"))
        .await
        .unwrap_err();

    assert_eq!(err.step(), IngestStep::Resolve);
    assert!(!err.is_transient());
    assert!(store.latest("atlantis").await.unwrap().is_none());
}

#[tokio::test]
async fn test_forecast_outage_leaves_previous_reading() {
    let server = MockServer::start().await;
    mount_moscow(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(current("2024-01-01T12:00", -5.0))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = ReadingStore::memory();
    let pipeline = pipeline_for(&server, store.clone());
    let moscow = TrackedLocation::new("Moscow");

    pipeline.run_cycle(&moscow).await.unwrap();
    let err = pipeline.run_cycle(&moscow).await.unwrap_err();

    assert_eq!(err.step(), IngestStep::Fetch);
    assert!(err.is_transient());
    assert_eq!(
        store.latest("moscow").await.unwrap(),
        Some(Reading::new("moscow", at(12, 0), -5.0))
    );
}

#[tokio::test]
async fn test_unparseable_time_is_rejected() {
    let server = MockServer::start().await;
    mount_moscow(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(current("yesterday at noon", -5.0))
        .mount(&server)
        .await;

    let store = ReadingStore::memory();
    let err = pipeline_for(&server, store.clone())
        .run_cycle(&TrackedLocation::new("Moscow"))
        .await
        .unwrap_err();

    assert_eq!(err.step(), IngestStep::ParseTime);
    assert!(store.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_consecutive_ticks_append_in_order() {
    let server = MockServer::start().await;
    mount_moscow(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(current("2024-01-01T12:00", -5.0))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(current("2024-01-01T12:15", -4.5))
        .mount(&server)
        .await;

    let store = ReadingStore::memory();
    let scheduler = Scheduler::from_names(
        pipeline_for(&server, store.clone()),
        &["Moscow"],
        Duration::from_secs(60),
    )
    .unwrap();

    scheduler.tick().await;
    scheduler.tick().await;

    let first = Reading::new("moscow", at(12, 0), -5.0);
    let second = Reading::new("moscow", at(12, 15), -4.5);
    assert_eq!(store.latest("moscow").await.unwrap(), Some(second.clone()));
    assert_eq!(store.all("moscow").await.unwrap(), vec![first, second]);
}

#[tokio::test]
async fn test_spawned_scheduler_ingests_until_cancelled() {
    let server = MockServer::start().await;
    mount_moscow(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(current("2024-01-01T12:00", -5.0))
        .mount(&server)
        .await;

    let store = ReadingStore::memory();
    let scheduler = Scheduler::new(
        pipeline_for(&server, store.clone()),
        vec![TrackedLocation::new("Moscow")],
        Duration::from_secs(3600),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let handle = scheduler.spawn(cancel.clone());
    let mut status = handle.subscribe();

    tokio::time::timeout(
        Duration::from_secs(10),
        status.wait_for(|s| s.completed_ticks >= 1),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(store.latest("moscow").await.unwrap().is_some());

    cancel.cancel();
    handle.join().await.unwrap();
    assert_eq!(status.borrow().state, SchedulerState::Stopped);
}

#[tokio::test]
async fn test_shared_store_with_sqlite_backend() {
    let server = MockServer::start().await;
    mount_moscow(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(current("2024-01-01T12:00", -5.0))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("readings.db");
    let store = ReadingStore::sqlite(weatherwatch_store::SqliteReadingStore::open(&db).unwrap());
    let view = store.reader();

    pipeline_for(&server, store)
        .run_cycle(&TrackedLocation::new("Moscow"))
        .await
        .unwrap();

    assert_eq!(
        view.latest("moscow").await.unwrap(),
        Some(Reading::new("moscow", at(12, 0), -5.0))
    );
}
