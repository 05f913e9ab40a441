//! REST-layer integration tests, driven through the handlers.
//!
//! Skipped unless `MERIDIAN_TEST_MONGODB_URI` points at a MongoDB replica
//! set (transactions require one).

use axum::body::{to_bytes, Bytes};
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use bson::doc;
use mongodb::Client;
use serde_json::{json, Value};

use meridian_model::registry::{collection_name, previous_collection_name, RESOURCE_TYPES};
use meridian_rest::controller::{create_handler, read_handler, search_handler, update_handler};
use meridian_rest::bundle_ctrl::bundle_handler;
use meridian_rest::{AppState, RestConfig};
use meridian_store::{new_resource_id, DataAccess, InterceptorRegistry};

struct TestServer {
    state: AppState,
    client: Client,
    db_name: String,
}

impl TestServer {
    async fn cleanup(self) {
        let _ = self.client.database(&self.db_name).drop().await;
    }
}

async fn connect() -> Option<TestServer> {
    let Ok(uri) = std::env::var("MERIDIAN_TEST_MONGODB_URI") else {
        eprintln!("MERIDIAN_TEST_MONGODB_URI not set; skipping");
        return None;
    };
    let client = Client::with_uri_str(&uri).await.expect("connect to test MongoDB");
    let db_name = format!("meridian_rest_test_{}", &new_resource_id()[..12]);

    // transactions cannot create collections
    let db = client.database(&db_name);
    for resource_type in RESOURCE_TYPES {
        for name in [
            collection_name(resource_type),
            previous_collection_name(resource_type),
        ] {
            let _ = db.run_command(doc! {"create": name}).await;
        }
    }

    let config = RestConfig {
        server_url: "http://localhost:3001".to_string(),
        default_db_name: db_name.clone(),
        ..Default::default()
    };
    let dal = DataAccess::new(client.clone(), config.store_config(), InterceptorRegistry::new());
    Some(TestServer {
        state: AppState::new(dal, config),
        client,
        db_name,
    })
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "application/fhir+json".parse().unwrap());
    headers
}

#[tokio::test]
async fn create_and_read_with_version_headers() {
    let Some(server) = connect().await else { return };

    let body = json!({
        "resourceType": "Patient",
        "name": [{"given": ["Donald"]}],
        "identifier": [{"system": "urn:oid:0.1.2.3.4.5.6.7", "value": "123"}],
    });
    let response = create_handler(
        State(server.state.clone()),
        Path("Patient".to_string()),
        json_headers(),
        Bytes::from(body.to_string()),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.contains("/Patient/"));
    assert!(location.ends_with("/_history/1"));
    assert_eq!(response.headers().get(header::ETAG).unwrap(), "W/\"1\"");

    let id = location
        .trim_end_matches("/_history/1")
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    let response = read_handler(
        State(server.state.clone()),
        Path(("Patient".to_string(), id)),
        HeaderMap::new(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::ETAG).unwrap(), "W/\"1\"");
    let read_back = body_json(response).await;
    assert_eq!(read_back["name"][0]["given"][0], "Donald");

    server.cleanup().await;
}

#[tokio::test]
async fn update_wins_then_loses_on_stale_if_match() {
    let Some(server) = connect().await else { return };

    let body = json!({"resourceType": "Patient", "gender": "male"});
    let response = create_handler(
        State(server.state.clone()),
        Path("Patient".to_string()),
        json_headers(),
        Bytes::from(body.to_string()),
    )
    .await
    .unwrap();
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let id = location
        .trim_end_matches("/_history/1")
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    let mut headers = json_headers();
    headers.insert(header::IF_MATCH, "W/\"1\"".parse().unwrap());
    let update = json!({"resourceType": "Patient", "gender": "female"});
    let response = update_handler(
        State(server.state.clone()),
        Path(("Patient".to_string(), id.clone())),
        headers.clone(),
        Bytes::from(update.to_string()),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["meta"]["versionId"], "2");

    // the same stale If-Match now conflicts
    let err = update_handler(
        State(server.state.clone()),
        Path(("Patient".to_string(), id)),
        headers,
        Bytes::from(update.to_string()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    server.cleanup().await;
}

#[tokio::test]
async fn transaction_bundle_resolves_temp_ids() {
    let Some(server) = connect().await else { return };

    let temp_id = "urn:uuid:6002c2ab-9571-4db7-9a79-87163475b071";
    let bundle = json!({
        "resourceType": "Bundle",
        "type": "transaction",
        "entry": [
            {
                "fullUrl": temp_id,
                "resource": {"resourceType": "Patient", "name": [{"given": ["Linked"]}]},
                "request": {"method": "POST", "url": "Patient"}
            },
            {
                "resource": {
                    "resourceType": "Observation",
                    "status": "final",
                    "subject": {"reference": temp_id}
                },
                "request": {"method": "POST", "url": "Observation"}
            }
        ]
    });

    let response = bundle_handler(
        State(server.state.clone()),
        json_headers(),
        Bytes::from(bundle.to_string()),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_json(response).await;
    assert_eq!(reply["type"], "transaction-response");
    assert_eq!(reply["entry"][0]["response"]["status"], "201");
    assert_eq!(reply["entry"][1]["response"]["status"], "201");

    let patient_id = reply["entry"][0]["fullUrl"]
        .as_str()
        .unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    // the stored observation points at the final id
    let response = search_handler(
        State(server.state.clone()),
        Path("Observation".to_string()),
        RawQuery(Some(format!("subject=Patient/{patient_id}"))),
        HeaderMap::new(),
    )
    .await
    .unwrap();
    let results = body_json(response).await;
    assert_eq!(results["total"], 1);
    assert_eq!(
        results["entry"][0]["resource"]["subject"]["reference"],
        format!("Patient/{patient_id}")
    );

    server.cleanup().await;
}

#[tokio::test]
async fn batch_continues_past_entry_errors() {
    let Some(server) = connect().await else { return };

    let bundle = json!({
        "resourceType": "Bundle",
        "type": "batch",
        "entry": [
            {
                "resource": {"resourceType": "Patient", "gender": "male"},
                "request": {"method": "POST", "url": "Patient"}
            },
            {
                "request": {"method": "GET", "url": "Patient/does-not-exist"}
            }
        ]
    });

    let response = bundle_handler(
        State(server.state.clone()),
        json_headers(),
        Bytes::from(bundle.to_string()),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_json(response).await;
    assert_eq!(reply["type"], "batch-response");
    assert_eq!(reply["entry"][0]["response"]["status"], "201");
    assert_eq!(reply["entry"][1]["response"]["status"], "404");

    server.cleanup().await;
}

#[tokio::test]
async fn transaction_bundle_with_conditional_create() {
    let Some(server) = connect().await else { return };

    // seed one identified patient
    let seed = json!({
        "resourceType": "Patient",
        "identifier": [{"system": "urn:oid:0.1.2.3.4.5.6.7", "value": "123"}],
    });
    create_handler(
        State(server.state.clone()),
        Path("Patient".to_string()),
        json_headers(),
        Bytes::from(seed.to_string()),
    )
    .await
    .unwrap();

    let bundle = json!({
        "resourceType": "Bundle",
        "type": "transaction",
        "entry": [{
            "resource": {
                "resourceType": "Patient",
                "identifier": [{"system": "urn:oid:0.1.2.3.4.5.6.7", "value": "123"}],
            },
            "request": {
                "method": "POST",
                "url": "Patient",
                "ifNoneExist": "identifier=urn:oid:0.1.2.3.4.5.6.7|123"
            }
        }]
    });

    let response = bundle_handler(
        State(server.state.clone()),
        json_headers(),
        Bytes::from(bundle.to_string()),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_json(response).await;
    // the existing resource satisfied the condition: no new write
    assert_eq!(reply["entry"][0]["response"]["status"], "200");

    let count = server
        .client
        .database(&server.db_name)
        .collection::<bson::Document>("patients")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(count, 1);

    server.cleanup().await;
}
