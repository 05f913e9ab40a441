//! Storage engine integration tests.
//!
//! These run against a real MongoDB and are skipped unless
//! `MERIDIAN_TEST_MONGODB_URI` is set (a replica set is required for the
//! transaction tests), e.g.
//!
//! ```sh
//! MERIDIAN_TEST_MONGODB_URI='mongodb://localhost:27017/?replicaSet=rs0' cargo test
//! ```

use bson::doc;
use mongodb::Client;
use serde_json::json;
use url::Url;

use meridian_model::Resource;
use meridian_search::Query;
use meridian_store::{new_resource_id, DataAccess, InterceptorRegistry, StoreConfig, StoreError};

struct TestDb {
    dal: DataAccess,
    client: Client,
    db_name: String,
}

impl TestDb {
    async fn cleanup(self) {
        let _ = self.client.database(&self.db_name).drop().await;
    }
}

async fn connect() -> Option<TestDb> {
    let Ok(uri) = std::env::var("MERIDIAN_TEST_MONGODB_URI") else {
        eprintln!("MERIDIAN_TEST_MONGODB_URI not set; skipping");
        return None;
    };
    let client = Client::with_uri_str(&uri).await.expect("connect to test MongoDB");
    let db_name = format!("meridian_test_{}", &new_resource_id()[..12]);
    let config = StoreConfig {
        default_db_name: db_name.clone(),
        ..Default::default()
    };
    let dal = DataAccess::new(client.clone(), config, InterceptorRegistry::new());
    Some(TestDb {
        dal,
        client,
        db_name,
    })
}

fn base_url() -> Url {
    Url::parse("http://localhost/Patient").unwrap()
}

fn patient(given: &str, gender: &str) -> Resource {
    Resource::from_json_value(json!({
        "resourceType": "Patient",
        "name": [{"given": [given]}],
        "gender": gender,
    }))
    .unwrap()
}

#[tokio::test]
async fn create_then_read_round_trips() {
    let Some(test) = connect().await else { return };
    let mut session = test.dal.start_session("").await.unwrap();

    let mut resource = patient("Donald", "male");
    let id = session.post(&mut resource).await.unwrap();
    assert_eq!(resource.version_id(), "1");

    let loaded = session.get(&id, "Patient").await.unwrap();
    assert_eq!(loaded.id(), id);
    let body = loaded.to_json_value().unwrap();
    assert_eq!(body["name"][0]["given"][0], "Donald");
    assert_eq!(body["meta"]["versionId"], "1");
    assert!(body["meta"]["lastUpdated"].is_string());

    session.finish().await;
    test.cleanup().await;
}

#[tokio::test]
async fn updates_archive_previous_versions() {
    let Some(test) = connect().await else { return };
    let mut session = test.dal.start_session("").await.unwrap();

    let mut resource = patient("Ada", "female");
    let id = session.post(&mut resource).await.unwrap();

    for expected_version in 2..=4 {
        let mut update = patient("Ada", "female");
        let created_new = session.put(&id, None, &mut update).await.unwrap();
        assert!(!created_new);
        assert_eq!(update.version_id(), expected_version.to_string());
    }

    // three updates archived versions 1..3
    let archived = test
        .client
        .database(&test.db_name)
        .collection::<bson::Document>("patients_prev")
        .count_documents(doc! {"_id._id": id.as_str()})
        .await
        .unwrap();
    assert_eq!(archived, 3);

    // each archived version is retrievable
    let v2 = session.get_version(&id, "2", "Patient").await.unwrap();
    assert_eq!(v2.version_id(), "2");

    session.finish().await;
    test.cleanup().await;
}

#[tokio::test]
async fn stale_if_match_conflicts() {
    let Some(test) = connect().await else { return };
    let mut session = test.dal.start_session("").await.unwrap();

    let mut resource = patient("Eve", "female");
    let id = session.post(&mut resource).await.unwrap();

    // matching If-Match succeeds and bumps the version
    let mut first = patient("Eve", "female");
    session.put(&id, Some(1), &mut first).await.unwrap();
    assert_eq!(first.version_id(), "2");

    // the stale If-Match loses
    let mut second = patient("Eve", "female");
    let err = session.put(&id, Some(1), &mut second).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    // body unchanged by the failed update
    let current = session.get(&id, "Patient").await.unwrap();
    assert_eq!(current.version_id(), "2");

    session.finish().await;
    test.cleanup().await;
}

#[tokio::test]
async fn delete_leaves_tombstone_and_history() {
    let Some(test) = connect().await else { return };
    let mut session = test.dal.start_session("").await.unwrap();

    let mut resource = patient("Gone", "male");
    let id = session.post(&mut resource).await.unwrap();

    let new_version = session.delete(&id, "Patient").await.unwrap();
    assert_eq!(new_version.as_deref(), Some("2"));

    // a deleted resource answers Deleted, not NotFound
    let err = session.get(&id, "Patient").await.unwrap_err();
    assert!(matches!(err, StoreError::Deleted));

    let history = session.history(&base_url(), "Patient", &id).await.unwrap();
    assert_eq!(history.bundle_type, "history");
    assert_eq!(history.total, Some(2));
    // newest first: the deletion, then the original create
    let first = history.entry[0].request.as_ref().unwrap();
    assert_eq!(first.method, "DELETE");
    assert!(history.entry[0].resource.is_none());
    let last = history.entry.last().unwrap().request.as_ref().unwrap();
    assert_eq!(last.method, "POST");
    assert_eq!(last.url, "Patient");

    session.finish().await;
    test.cleanup().await;
}

#[tokio::test]
async fn conditional_create_matches_existing() {
    let Some(test) = connect().await else { return };
    let mut session = test.dal.start_session("").await.unwrap();

    let identified = json!({
        "resourceType": "Patient",
        "identifier": [{"system": "urn:oid:0.1.2.3.4.5.6.7", "value": "123"}],
    });
    let mut first = Resource::from_json_value(identified.clone()).unwrap();
    let id = session.post(&mut first).await.unwrap();

    let query = Query::new("Patient", "identifier=urn:oid:0.1.2.3.4.5.6.7|123");
    let mut second = Resource::from_json_value(identified.clone()).unwrap();
    match session.conditional_post(&query, &mut second).await.unwrap() {
        meridian_store::ConditionalPostResult::Exists { id: existing, .. } => {
            assert_eq!(existing, id);
        }
        other => panic!("expected existing match, got {}", variant_name(&other)),
    }

    // a second patient with the same identifier makes the condition ambiguous
    let mut third = Resource::from_json_value(identified.clone()).unwrap();
    session.post(&mut third).await.unwrap();
    let mut fourth = Resource::from_json_value(identified).unwrap();
    assert!(matches!(
        session.conditional_post(&query, &mut fourth).await.unwrap(),
        meridian_store::ConditionalPostResult::MultipleMatches
    ));

    session.finish().await;
    test.cleanup().await;
}

fn variant_name(result: &meridian_store::ConditionalPostResult) -> &'static str {
    match result {
        meridian_store::ConditionalPostResult::Created { .. } => "Created",
        meridian_store::ConditionalPostResult::Exists { .. } => "Exists",
        meridian_store::ConditionalPostResult::MultipleMatches => "MultipleMatches",
    }
}

#[tokio::test]
async fn chained_search_filters_by_target() {
    let Some(test) = connect().await else { return };
    let mut session = test.dal.start_session("").await.unwrap();

    let mut condition_count = 0;
    for (given, gender) in [
        ("M1", "male"),
        ("M2", "male"),
        ("M3", "male"),
        ("M4", "male"),
        ("M5", "male"),
        ("F1", "female"),
    ] {
        let mut p = patient(given, gender);
        let patient_id = session.post(&mut p).await.unwrap();
        let mut condition = Resource::from_json_value(json!({
            "resourceType": "Condition",
            "subject": {"reference": format!("Patient/{patient_id}")},
        }))
        .unwrap();
        session.post(&mut condition).await.unwrap();
        condition_count += 1;
    }
    assert_eq!(condition_count, 6);

    let ids = session
        .find_ids(&Query::new("Condition", "patient.gender=male"))
        .await
        .unwrap();
    assert_eq!(ids.len(), 5);

    let ids = session
        .find_ids(&Query::new("Condition", "patient.gender=male,female"))
        .await
        .unwrap();
    assert_eq!(ids.len(), 6);

    session.finish().await;
    test.cleanup().await;
}

#[tokio::test]
async fn conditional_delete_removes_all_matches() {
    let Some(test) = connect().await else { return };
    let mut session = test.dal.start_session("").await.unwrap();

    for i in 0..40 {
        let gender = if i < 32 { "male" } else { "female" };
        let mut p = patient(&format!("P{i}"), gender);
        session.post(&mut p).await.unwrap();
    }

    let deleted = session
        .conditional_delete(&Query::new("Patient", "gender=male"))
        .await
        .unwrap();
    assert_eq!(deleted, 32);

    let bundle = session
        .search(&base_url(), &Query::new("Patient", "_summary=count"))
        .await
        .unwrap();
    assert_eq!(bundle.total, Some(8));
    assert!(bundle.entry.is_empty());

    session.finish().await;
    test.cleanup().await;
}

#[tokio::test]
async fn search_bundle_carries_paging_links() {
    let Some(test) = connect().await else { return };
    let mut session = test.dal.start_session("").await.unwrap();

    for i in 0..15 {
        let mut p = patient(&format!("Page{i}"), "male");
        session.post(&mut p).await.unwrap();
    }

    let bundle = session
        .search(&base_url(), &Query::new("Patient", "_count=10"))
        .await
        .unwrap();
    assert_eq!(bundle.total, Some(15));
    assert_eq!(bundle.entry.len(), 10);
    let relations: Vec<&str> = bundle.link.iter().map(|l| l.relation.as_str()).collect();
    assert!(relations.contains(&"self"));
    assert!(relations.contains(&"first"));
    assert!(relations.contains(&"next"));
    assert!(relations.contains(&"last"));

    session.finish().await;
    test.cleanup().await;
}
