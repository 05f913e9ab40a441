//! Per-resource REST handlers.
//!
//! Implements the type-level HTTP surface: search (GET and POST `_search`),
//! create (with `If-None-Exist`), read, vread, history, update (with
//! `If-Match`), delete, the conditional variants, and `$everything`.
//!
//! Every handler starts one session, runs its operation, and finishes the
//! session before mapping the result, so an aborting client can never leak
//! an open transaction.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use meridian_model::registry::is_resource_type;
use meridian_model::{Resource, ShallowBundle, WhatToEncrypt};
use meridian_search::Query;
use meridian_store::{ConditionalPostResult, StoreError};

use crate::bind::{
    check_accept, db_header, etag_to_version_id, fhir_bind_expecting, http_date, prefer_minimal,
};
use crate::error::{RestError, RestResult, FHIR_JSON_CONTENT_TYPE};
use crate::state::AppState;

fn ensure_known_type(resource_type: &str) -> RestResult<()> {
    if is_resource_type(resource_type) {
        Ok(())
    } else {
        Err(RestError::Store(StoreError::NotFound))
    }
}

fn what_to_encrypt(state: &AppState) -> WhatToEncrypt {
    WhatToEncrypt {
        patient_details: state.config().encrypt_patient_details,
    }
}

/// ETag and Last-Modified headers for a single-resource response.
fn resource_headers(resource: &Resource) -> Vec<(header::HeaderName, String)> {
    let mut headers = Vec::with_capacity(2);
    let version_id = resource.version_id();
    if !version_id.is_empty() {
        headers.push((header::ETAG, format!("W/\"{version_id}\"")));
    }
    if let Some(t) = resource.last_updated_time() {
        headers.push((header::LAST_MODIFIED, http_date(t)));
    }
    headers
}

fn render_resource(
    status: StatusCode,
    resource: &Resource,
    extra_headers: Vec<(header::HeaderName, String)>,
    minimal: bool,
) -> RestResult<Response> {
    let mut builder = Response::builder().status(status);
    for (name, value) in resource_headers(resource).into_iter().chain(extra_headers) {
        builder = builder.header(name, value);
    }
    let body = if minimal {
        String::new()
    } else {
        builder = builder.header(header::CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE);
        resource.to_json_string()?
    };
    builder
        .body(body.into())
        .map_err(|e| RestError::Internal(e.to_string()))
}

fn render_bundle(bundle: &ShallowBundle) -> RestResult<Response> {
    let body = bundle.to_json_value()?.to_string();
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE)],
        body,
    )
        .into_response())
}

// ---- search ----

pub async fn search_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    check_accept(&headers)?;
    let query = Query::new(resource_type.clone(), raw_query.unwrap_or_default());
    run_search(&state, &headers, &resource_type, query).await
}

/// POST `_search` accepts the query in a form-encoded body.
pub async fn search_post_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    check_accept(&headers)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    let raw_query = if content_type == "application/x-www-form-urlencoded" {
        String::from_utf8_lossy(&body).into_owned()
    } else {
        String::new()
    };

    let query = Query::new(resource_type.clone(), raw_query);
    run_search(&state, &headers, &resource_type, query).await
}

async fn run_search(
    state: &AppState,
    headers: &HeaderMap,
    resource_type: &str,
    query: Query,
) -> RestResult<Response> {
    let base_url = state.response_url(headers, db_header(headers), &[resource_type]);

    let mut session = state.dal().start_session(db_header(headers)).await?;
    let result = session.search(&base_url, &query).await;
    session.finish().await;
    let bundle = result?;

    tracing::debug!(resource_type, query = %query.query, results = bundle.entry.len(), "search");
    render_bundle(&bundle)
}

/// `$everything` is the union of `_include=*` and `_revinclude=*` over the
/// single resource.
pub async fn everything_handler(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> RestResult<Response> {
    if resource_type != "Patient" && resource_type != "Encounter" {
        return Err(RestError::Store(StoreError::NotFound));
    }
    let query = Query::new(
        resource_type.clone(),
        format!("_id={id}&_include=*&_revinclude=*"),
    );
    run_search(&state, &headers, &resource_type, query).await
}

// ---- read ----

pub async fn read_handler(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    check_accept(&headers)?;

    let mut session = state.dal().start_session(db_header(&headers)).await?;
    let result = session.get(&id, &resource_type).await;
    session.finish().await;
    let resource = result?;

    render_resource(StatusCode::OK, &resource, Vec::new(), false)
}

pub async fn vread_handler(
    State(state): State<AppState>,
    Path((resource_type, id, vid)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    check_accept(&headers)?;

    let mut session = state.dal().start_session(db_header(&headers)).await?;
    let result = session.get_version(&id, &vid, &resource_type).await;
    session.finish().await;
    let resource = result?;

    render_resource(StatusCode::OK, &resource, Vec::new(), false)
}

pub async fn history_handler(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    check_accept(&headers)?;
    let base_url = state.response_url(&headers, db_header(&headers), &[&resource_type]);

    let mut session = state.dal().start_session(db_header(&headers)).await?;
    let result = session.history(&base_url, &resource_type, &id).await;
    session.finish().await;
    let bundle = result?;

    render_bundle(&bundle)
}

// ---- create ----

pub async fn create_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    let mut resource =
        fhir_bind_expecting(&headers, &body, &resource_type, &what_to_encrypt(&state))?;
    let minimal = prefer_minimal(&headers);

    let if_none_exist = headers
        .get("If-None-Exist")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(condition) = if_none_exist {
        let query = Query::new(resource_type.clone(), condition);

        let mut session = state.dal().start_session(db_header(&headers)).await?;
        let result = session.conditional_post(&query, &mut resource).await;
        session.finish().await;

        return match result? {
            ConditionalPostResult::Created { id } => {
                tracing::debug!(resource_type, id, "conditional create: created");
                let location = location_header(&state, &headers, &resource_type, &id, &resource);
                render_resource(StatusCode::CREATED, &resource, location, minimal)
            }
            ConditionalPostResult::Exists { id, resource } => {
                tracing::debug!(resource_type, id, "conditional create: existing match");
                render_resource(StatusCode::OK, &resource, Vec::new(), minimal)
            }
            ConditionalPostResult::MultipleMatches => Err(RestError::MultipleMatches(
                "search criteria were not selective enough".to_string(),
            )),
        };
    }

    let mut session = state.dal().start_session(db_header(&headers)).await?;
    let result = session.post(&mut resource).await;
    session.finish().await;
    let id = result?;

    tracing::debug!(resource_type, id, "created");
    let location = location_header(&state, &headers, &resource_type, &id, &resource);
    render_resource(StatusCode::CREATED, &resource, location, minimal)
}

fn location_header(
    state: &AppState,
    headers: &HeaderMap,
    resource_type: &str,
    id: &str,
    resource: &Resource,
) -> Vec<(header::HeaderName, String)> {
    let version_id = resource.version_id();
    let url = if state.config().enable_history && !version_id.is_empty() {
        state.response_url(
            headers,
            db_header(headers),
            &[resource_type, id, "_history", &version_id],
        )
    } else {
        state.response_url(headers, db_header(headers), &[resource_type, id])
    };
    vec![(header::LOCATION, url.to_string())]
}

// ---- update ----

pub async fn update_handler(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    let mut resource =
        fhir_bind_expecting(&headers, &body, &resource_type, &what_to_encrypt(&state))?;
    let minimal = prefer_minimal(&headers);
    let conditional_version_id = parse_if_match(&headers)?;

    let mut session = state.dal().start_session(db_header(&headers)).await?;
    let result = session.put(&id, conditional_version_id, &mut resource).await;
    session.finish().await;
    let created_new = result?;

    tracing::debug!(resource_type, id, created_new, "update");
    if created_new {
        let location = location_header(&state, &headers, &resource_type, &id, &resource);
        render_resource(StatusCode::CREATED, &resource, location, minimal)
    } else {
        render_resource(StatusCode::OK, &resource, Vec::new(), minimal)
    }
}

pub async fn conditional_update_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    let mut resource =
        fhir_bind_expecting(&headers, &body, &resource_type, &what_to_encrypt(&state))?;
    let minimal = prefer_minimal(&headers);
    let conditional_version_id = parse_if_match(&headers)?;
    let query = Query::new(resource_type.clone(), raw_query.unwrap_or_default());

    let mut session = state.dal().start_session(db_header(&headers)).await?;
    let result = session
        .conditional_put(&query, conditional_version_id, &mut resource)
        .await;
    session.finish().await;
    let (id, created_new) = result?;

    tracing::debug!(resource_type, id, created_new, "conditional update");
    let location = location_header(&state, &headers, &resource_type, &id, &resource);
    let status = if created_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    render_resource(status, &resource, location, minimal)
}

fn parse_if_match(headers: &HeaderMap) -> RestResult<Option<i64>> {
    match headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok()) {
        Some(etag) if !etag.is_empty() => Ok(Some(etag_to_version_id(etag)?)),
        _ => Ok(None),
    }
}

// ---- delete ----

pub async fn delete_handler(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;

    let mut session = state.dal().start_session(db_header(&headers)).await?;
    let result = session.delete(&id, &resource_type).await;
    session.finish().await;
    let new_version = match result {
        Ok(version) => version,
        // deleting a missing resource is a no-op
        Err(StoreError::NotFound) => None,
        Err(err) => return Err(err.into()),
    };

    tracing::debug!(resource_type, id, "deleted");
    let mut builder = Response::builder().status(StatusCode::NO_CONTENT);
    if let Some(version) = new_version {
        builder = builder.header(header::ETAG, format!("W/\"{version}\""));
    }
    builder
        .body(axum::body::Body::empty())
        .map_err(|e| RestError::Internal(e.to_string()))
}

pub async fn conditional_delete_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> RestResult<Response> {
    ensure_known_type(&resource_type)?;
    let query = Query::new(resource_type.clone(), raw_query.unwrap_or_default());

    let mut session = state.dal().start_session(db_header(&headers)).await?;
    let result = session.conditional_delete(&query).await;
    session.finish().await;
    let count = result?;

    tracing::debug!(resource_type, count, "conditional delete");
    Ok(StatusCode::NO_CONTENT.into_response())
}
