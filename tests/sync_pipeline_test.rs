mod common;

use chrono::NaiveDate;
use common::{InMemoryCalendar, StubSource, WEEK_FIXTURE};
use httpmock::prelude::*;
use serde_json::json;
use skema_sync::app::pipelines::sync_pipeline::{
    extractor_config, fetch_schedule, SyncPipeline, SyncSettings,
};
use skema_sync::app::runner::{portal_session, run_sync, RunOptions, RunOutcome};
use skema_sync::core::Storage;
use skema_sync::domain::model::WeekRef;
use skema_sync::{GoogleCalendar, LocalStorage, SyncEngine, SyncError, TomlConfig};
use tempfile::TempDir;

const BASE_CONFIG: &str = r#"
[portal]
school_id = "681"
username = "elev"
password = "hemmeligt"

[sync]
weeks = 1
"#;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
}

fn week_two() -> WeekRef {
    WeekRef { year: 2024, week: 2 }
}

async fn stub_pipeline(
    toml: &str,
    storage: &LocalStorage,
) -> SyncPipeline<StubSource, InMemoryCalendar> {
    let config = TomlConfig::from_toml_str(toml).unwrap();
    let settings = SyncSettings::from_config(&config).unwrap().with_today(monday());
    let extractor = extractor_config(&config, storage).await.unwrap();
    SyncPipeline::new(
        StubSource::with_week(week_two(), WEEK_FIXTURE),
        InMemoryCalendar::default(),
        extractor,
        settings,
    )
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let engine = SyncEngine::new(stub_pipeline(BASE_CONFIG, &storage).await);

    let first = engine.run().await.unwrap();
    assert_eq!(first.inserted, 5);

    let calendar = engine.pipeline().calendar();
    assert_eq!(calendar.event("lec1002").unwrap().color_id.as_deref(), Some("4"));
    assert_eq!(calendar.event("lec1003").unwrap().color_id.as_deref(), Some("2"));
    calendar.clear_writes();

    let second = engine.run().await.unwrap();
    assert_eq!(second.operations(), 0);
    assert_eq!(second.unchanged, 5);
    assert!(calendar.writes().is_empty());
}

#[tokio::test]
async fn test_plan_does_not_write() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let engine = SyncEngine::new(stub_pipeline(BASE_CONFIG, &storage).await);

    let plan = engine.plan().await.unwrap();
    assert_eq!(plan.write_count(), 5);
    assert!(engine.pipeline().calendar().writes().is_empty());
}

#[tokio::test]
async fn test_hide_cancelled_and_blacklist_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let toml = r#"
[portal]
school_id = "681"
username = "elev"
password = "hemmeligt"

[sync]
weeks = 1
hide_cancelled = true

[[blacklist]]
after = "15:00"
keywords = ["studiecafé"]
"#;
    let engine = SyncEngine::new(stub_pipeline(toml, &storage).await);

    let plan = engine.plan().await.unwrap();
    let ids: Vec<&str> = plan.inserts.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["lec1001", "lec1003", "lec1006"]);
}

#[tokio::test]
async fn test_decode_groups_reads_groups_file() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    storage
        .write_file("groups.json", json!({"3a Da": "Dansk A"}).to_string().as_bytes())
        .await
        .unwrap();

    let toml = format!("{}decode_groups = true\ngroups_file = \"groups.json\"\n", BASE_CONFIG);
    let engine = SyncEngine::new(stub_pipeline(&toml, &storage).await);

    let plan = engine.plan().await.unwrap();
    let dansk = plan.inserts.iter().find(|e| e.id == "lec1001").unwrap();
    assert_eq!(dansk.summary, "Dansk A: Dansk");
}

#[tokio::test]
async fn test_dry_run_dumps_snapshot_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let engine = SyncEngine::new(stub_pipeline(BASE_CONFIG, &storage).await);

    let options = RunOptions {
        dry_run: true,
        dump_json: Some("skema.json".to_string()),
    };
    let outcome = run_sync(&engine, &storage, &options).await.unwrap();

    match outcome {
        RunOutcome::Planned(plan) => assert_eq!(plan.inserts.len(), 5),
        other => panic!("expected a plan, got {:?}", other),
    }
    assert!(engine.pipeline().calendar().writes().is_empty());

    let dumped = storage.read_file("skema.json").await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&dumped).unwrap();
    assert_eq!(json["1002"]["status"], "cancelled");
    assert_eq!(json.as_object().unwrap().len(), 5);
}

#[tokio::test]
async fn test_session_released_after_failed_week() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let config = TomlConfig::from_toml_str(BASE_CONFIG)?;
    let extractor = extractor_config(&config, &storage).await?;

    let week_three = WeekRef { year: 2024, week: 3 };
    let source = StubSource::with_week(week_two(), WEEK_FIXTURE).failing_on(week_three);

    let result = fetch_schedule(&source, &[week_two(), week_three], &extractor).await;

    match result {
        Err(SyncError::FetchError { week, .. }) => assert_eq!(week, "03/2024"),
        other => panic!("expected a fetch error, got {:?}", other.map(|s| s.len())),
    }
    assert_eq!(
        source.calls(),
        vec!["open", "fetch 02/2024", "fetch 03/2024", "release"]
    );
    Ok(())
}

#[tokio::test]
async fn test_sync_releases_session_on_success() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let engine = SyncEngine::new(stub_pipeline(BASE_CONFIG, &storage).await);

    engine.plan().await.unwrap();
    assert_eq!(
        engine.pipeline().source().calls(),
        vec!["open", "fetch 02/2024", "release"]
    );
}

#[tokio::test]
async fn test_end_to_end_against_portal_and_calendar() {
    let portal = MockServer::start_async().await;
    let google = MockServer::start_async().await;

    portal
        .mock_async(|when, then| {
            when.method(GET).path("/lectio/681/login.aspx");
            then.status(200)
                .body(r#"<form><input type="hidden" name="__VIEWSTATEX" value="v"/></form>"#);
        })
        .await;
    portal
        .mock_async(|when, then| {
            when.method(POST).path("/lectio/681/login.aspx");
            then.status(302).header("Location", "/lectio/681/forside.aspx");
        })
        .await;
    portal
        .mock_async(|when, then| {
            when.method(GET).path("/lectio/681/forside.aspx");
            then.status(200).body("<html></html>");
        })
        .await;
    portal
        .mock_async(|when, then| {
            when.method(GET).path("/lectio/681/SkemaNy.aspx").query_param("week", "022024");
            then.status(200).body(format!(
                r#"<html><body><table id="s_m_Content_Content_SkemaNyMedNavigation_skema_skematabel">{}</table></body></html>"#,
                WEEK_FIXTURE
            ));
        })
        .await;
    let logout = portal
        .mock_async(|when, then| {
            when.method(GET).path("/lectio/681/logout.aspx");
            then.status(200);
        })
        .await;

    // lec1001 exists but was deleted by the user; the rest are new
    let list = google
        .mock_async(|when, then| {
            when.method(GET).path("/calendars/primary/events");
            then.status(200).json_body(json!({
                "items": [{"id": "lec1001", "status": "cancelled",
                           "start": {"dateTime": "2024-01-08T09:55:00+01:00"}}]
            }));
        })
        .await;
    let lookups = google
        .mock_async(|when, then| {
            when.method(GET).path_contains("/calendars/primary/events/lec");
            then.status(404);
        })
        .await;
    let restore = google
        .mock_async(|when, then| {
            when.method(PUT).path("/calendars/primary/events/lec1001");
            then.status(200).json_body(json!({"id": "lec1001", "status": "confirmed"}));
        })
        .await;
    let inserts = google
        .mock_async(|when, then| {
            when.method(POST).path("/calendars/primary/events");
            then.status(200).json_body(json!({"id": "lec0", "status": "confirmed"}));
        })
        .await;

    let toml = format!(
        "{}\n[calendar]\napi_url = \"{}\"\n",
        BASE_CONFIG.replace(
            "[portal]\n",
            &format!("[portal]\nurl = \"{}\"\n", portal.base_url())
        ),
        google.base_url()
    );
    let config = TomlConfig::from_toml_str(&toml).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let settings = SyncSettings::from_config(&config).unwrap().with_today(monday());
    let pipeline = SyncPipeline::new(
        portal_session(&config).unwrap(),
        GoogleCalendar::new(&google.base_url(), "token".to_string()).unwrap(),
        extractor_config(&config, &storage).await.unwrap(),
        settings,
    );

    let report = SyncEngine::new(pipeline).run().await.unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.inserted, 4);
    list.assert_async().await;
    restore.assert_async().await;
    lookups.assert_hits_async(4).await;
    inserts.assert_hits_async(4).await;
    logout.assert_hits_async(1).await;
}
