//! Transaction and batch bundle processing.
//!
//! Entries are validated and ordered DELETE, POST, PUT, GET. A first pass
//! allocates ids for creates (honouring `If-None-Exist`) and rewrites
//! conditional updates to direct ones; a second pass substitutes temporary
//! `urn:uuid:` ids that the first pass resolved. Conditional references are
//! bound by searching, every reference is rewritten through the collected
//! map, `If-Match` failures are staged before any write, and finally the
//! entries execute: serially inside one transaction, or with bounded
//! concurrency for batches (one session per worker). A transaction-wide
//! write conflict retries the whole bundle up to three times.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

use meridian_model::outcome::error_outcome;
use meridian_model::{
    EntryResponse, ReferenceMap, Resource, ShallowBundle, ShallowBundleEntry, WhatToEncrypt,
};
use meridian_search::Query;
use meridian_store::{new_resource_id, Session, StoreError};

use crate::bind::{db_header, etag_to_version_id, fhir_bind};
use crate::error::{RestError, RestResult, FHIR_JSON_CONTENT_TYPE};
use crate::state::AppState;

const TRANSACTION_ATTEMPTS: usize = 3;
const PROVENANCE_LOCATION_HEADER: &str = "X-Provenance-Location";

/// Context carried into entry execution (also by batch workers).
#[derive(Clone)]
struct RequestContext {
    state: AppState,
    request_base: String,
    db: String,
}

impl RequestContext {
    fn response_url(&self, paths: &[&str]) -> Url {
        self.state
            .config()
            .response_url(&self.request_base, &self.db, paths)
    }
}

/// Handles `POST /` with a batch or transaction bundle.
pub async fn bundle_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> RestResult<Response> {
    let encrypt = WhatToEncrypt {
        patient_details: state.config().encrypt_patient_details,
    };
    let resource = fhir_bind(&headers, &body, &encrypt)?;
    if resource.resource_type() != "Bundle" {
        return Err(RestError::Structure(format!(
            "expected a Bundle, got {}",
            resource.resource_type()
        )));
    }
    let original = resource.json().clone();

    let provenance_header = headers
        .get("X-Provenance")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("")
        .to_string();

    let ctx = RequestContext {
        request_base: state.request_base(&headers),
        db: db_header(&headers).to_string(),
        state,
    };

    let bundle_type = original
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let mut attempts_left = if bundle_type == "transaction" {
        TRANSACTION_ATTEMPTS
    } else {
        1
    };

    loop {
        attempts_left -= 1;

        // entries are mutated in place, so each attempt reloads the bundle
        let mut bundle: ShallowBundle = serde_json::from_value(original.clone())
            .map_err(|e| RestError::Structure(format!("malformed bundle: {e}")))?;
        for entry in &mut bundle.entry {
            if let Some(resource) = &mut entry.resource {
                resource.set_what_to_encrypt(encrypt);
            }
        }

        match post_inner(&ctx, bundle, &provenance_header).await {
            Ok(response) => return Ok(response),
            Err(err) if attempts_left > 0 && err.is_write_conflict() => {
                tracing::info!(attempts_left, "write conflict, retrying transaction bundle");
                continue;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn post_inner(
    ctx: &RequestContext,
    mut bundle: ShallowBundle,
    provenance_header: &str,
) -> RestResult<Response> {
    let transaction = match bundle.bundle_type.as_str() {
        "transaction" => true,
        "batch" => false,
        _ => {
            return Err(RestError::Value(
                "Bundle type is neither 'batch' nor 'transaction'".to_string(),
            ));
        }
    };
    if !transaction && !provenance_header.is_empty() {
        return Err(RestError::Invariant(
            "X-Provenance header is only supported for transactions".to_string(),
        ));
    }

    let order = sort_bundle_entries(&bundle)?;

    let mut session = ctx.state.dal().start_session(&ctx.db).await?;
    let result = post_in_session(ctx, &mut session, &mut bundle, &order, transaction, provenance_header).await;
    session.finish().await;
    result
}

async fn post_in_session(
    ctx: &RequestContext,
    session: &mut Session,
    bundle: &mut ShallowBundle,
    order: &[usize],
    transaction: bool,
    provenance_header: &str,
) -> RestResult<Response> {
    if transaction {
        session.start_transaction().await?;
    }

    let entry_count = bundle.entry.len();
    let mut create_status: Vec<Option<u16>> = vec![None; entry_count];
    let mut new_ids: Vec<Option<String>> = vec![None; entry_count];
    let mut ref_map = ReferenceMap::new();

    // Pass 1: allocate ids for POSTs and rewrite resolvable conditional PUTs
    for &i in order {
        let request = match &bundle.entry[i].request {
            Some(request) => request.clone(),
            None => continue,
        };

        if request.method == "POST" {
            let mut id: Option<String> = None;

            if let Some(condition) = request.if_none_exist.as_deref().filter(|c| !c.is_empty()) {
                let query = Query::new(request.url.clone(), condition.to_string());
                let existing = session.find_ids(&query).await?;
                tracing::debug!(url = %request.url, condition, matches = existing.len(), "conditional create in bundle");
                match existing.len() {
                    0 => create_status[i] = Some(201),
                    1 => {
                        create_status[i] = Some(200);
                        id = existing.into_iter().next();
                    }
                    _ => create_status[i] = Some(412),
                }
            } else {
                create_status[i] = Some(201);
            }

            if create_status[i] == Some(201) {
                let fresh = new_resource_id();
                new_ids[i] = Some(fresh.clone());
                id = Some(fresh);
            }

            if let Some(id) = id {
                if !bundle.entry[i].full_url.is_empty() {
                    ref_map.insert(
                        bundle.entry[i].full_url.clone(),
                        format!("{}/{}", request.url, id),
                    );
                }
                bundle.entry[i].full_url = ctx.response_url(&[&request.url, &id]).to_string();
            }
        } else if request.method == "PUT" && is_conditional(&bundle.entry[i]) {
            // conditionals referencing temp ids wait for the second pass
            if has_temp_id(&request.url) {
                continue;
            }
            resolve_conditional_put(ctx, session, bundle, i, &mut new_ids, &mut ref_map).await?;
        }
    }

    // Pass 2: substitute resolved temp ids into the remaining conditionals.
    // A conditional referencing another unresolved conditional is out of
    // scope; report it instead of chasing transitive chains.
    for &i in order {
        let Some(request) = bundle.entry[i].request.clone() else {
            continue;
        };
        if request.method != "PUT" || !is_conditional(&bundle.entry[i]) || !has_temp_id(&request.url)
        {
            continue;
        }

        let mut rewritten = request.url.clone();
        for (temp_id, resolved) in &ref_map {
            if temp_id.is_empty() {
                continue;
            }
            rewritten = substitute_temp_id(&rewritten, temp_id, resolved);
        }
        if let Some(request) = &mut bundle.entry[i].request {
            request.url = rewritten.clone();
        }

        if has_temp_id(&rewritten) {
            return Err(RestError::NotImplemented(
                "cannot resolve conditionals referencing other conditionals".to_string(),
            ));
        }
        resolve_conditional_put(ctx, session, bundle, i, &mut new_ids, &mut ref_map).await?;
    }

    // Conditional references (`Type?query`) bind to exactly one resource
    for reference in bundle.all_references()? {
        if ref_map.contains_key(&reference) {
            continue;
        }
        let Some((resource_type, condition)) = reference.split_once('?') else {
            continue;
        };
        if !transaction {
            return Err(RestError::Invariant(
                "conditional references are only allowed in transactions, not batches".to_string(),
            ));
        }
        let query = Query::new(resource_type.to_string(), condition.to_string());
        let ids = session.find_ids(&query).await?;
        tracing::debug!(reference, matches = ids.len(), "conditional reference");
        match ids.len() {
            1 => {
                let new_ref = format!("{}/{}", resource_type, ids[0]);
                ref_map.insert(reference, new_ref);
            }
            0 => {
                return Err(RestError::NotFoundMessage(format!(
                    "no matches for conditional reference ({reference})"
                )));
            }
            _ => {
                return Err(RestError::MultipleMatches(format!(
                    "multiple matches for conditional reference ({reference})"
                )));
            }
        }
    }

    // all references rewrite through the map at canonicalisation time
    bundle.set_transform_references_map(&ref_map);

    // If-Match staging: failures preempt the write phase
    for &i in order {
        let Some(request) = bundle.entry[i].request.clone() else {
            continue;
        };
        if request.method != "PUT" {
            continue;
        }
        let Some(if_match) = request.if_match.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };

        let expected = etag_to_version_id(if_match)
            .map_err(|_| RestError::Value(format!("couldn't parse If-Match: {if_match}")))?;
        let resource_type = bundle.entry[i]
            .resource
            .as_ref()
            .map(|r| r.resource_type().to_string())
            .unwrap_or_default();
        let id = request
            .url
            .split_once('/')
            .map(|(_, id)| id.to_string())
            .ok_or_else(|| {
                RestError::Structure(format!(
                    "couldn't identify resource and id to put from {}",
                    request.url
                ))
            })?;

        match session.get(&id, &resource_type).await {
            Ok(current) => {
                if current.version_id() != expected.to_string() {
                    bundle.entry[i].response = Some(EntryResponse {
                        status: "409".to_string(),
                        outcome: Some(error_outcome(
                            "conflict",
                            &format!(
                                "version mismatch when handling If-Match (current={} wanted={})",
                                current.version_id(),
                                expected
                            ),
                        )),
                        ..Default::default()
                    });
                    bundle.entry[i].resource = None;
                }
            }
            Err(StoreError::NotFound) | Err(StoreError::Deleted) => {
                bundle.entry[i].response = Some(EntryResponse {
                    status: "404".to_string(),
                    outcome: Some(error_outcome(
                        "not-found",
                        "existing resource not found when handling If-Match",
                    )),
                    ..Default::default()
                });
                bundle.entry[i].resource = None;
            }
            Err(err) => return Err(err.into()),
        }
    }

    // a staged failure aborts a transaction before any write
    let mut proceed = true;
    if transaction {
        proceed = !bundle
            .entry
            .iter()
            .any(|entry| matches!(&entry.response, Some(response) if response.outcome.is_some()));
    }

    if proceed {
        let mut concurrency = if transaction {
            1
        } else {
            ctx.state.config().batch_concurrency.max(1)
        };
        if entry_count <= 1 {
            concurrency = 1;
        }

        if concurrency == 1 {
            for &i in order {
                let status = create_status[i];
                let new_id = new_ids[i].clone();
                let entry = &mut bundle.entry[i];
                if let Err(err) =
                    execute_entry(ctx, session, entry, status, new_id).await
                {
                    if transaction {
                        return Err(err);
                    }
                    embed_entry_error(entry, err);
                }
            }
        } else {
            execute_batch_concurrently(ctx, bundle, order, &create_status, &new_ids, concurrency)
                .await?;
        }
    }

    if transaction {
        // a failed entry turns the whole transaction into one outcome
        for &i in order {
            if let Some(response) = &bundle.entry[i].response {
                if let Some(outcome) = &response.outcome {
                    tracing::debug!(status = %response.status, "transaction failing");
                    let status = response
                        .status
                        .parse::<u16>()
                        .ok()
                        .and_then(|code| StatusCode::from_u16(code).ok())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    return Ok((
                        status,
                        [(header::CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE)],
                        outcome.to_string(),
                    )
                        .into_response());
                }
            }
        }
    }

    let provenance_location = if transaction {
        let location = process_provenance_header(provenance_header, session, bundle).await?;
        session.commit_if_transaction().await?;
        location
    } else {
        None
    };

    bundle.total = Some(entry_count as u32);
    bundle.bundle_type = format!("{}-response", bundle.bundle_type);

    let body = bundle.to_json_value()?.to_string();
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE);
    if let Some(location) = provenance_location {
        builder = builder.header(PROVENANCE_LOCATION_HEADER, location);
    }
    builder
        .body(body.into())
        .map_err(|e| RestError::Internal(e.to_string()))
}

/// Batch fan-out: each worker runs on its own session (sessions are not
/// safe to share between tasks).
async fn execute_batch_concurrently(
    ctx: &RequestContext,
    bundle: &mut ShallowBundle,
    order: &[usize],
    create_status: &[Option<u16>],
    new_ids: &[Option<String>],
    concurrency: usize,
) -> RestResult<()> {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = tokio::task::JoinSet::new();

    for &i in order {
        let mut entry = std::mem::take(&mut bundle.entry[i]);
        let ctx = ctx.clone();
        let status = create_status[i];
        let new_id = new_ids[i].clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closes");
            let result = async {
                let mut session = ctx.state.dal().start_session(&ctx.db).await?;
                let outcome = execute_entry(&ctx, &mut session, &mut entry, status, new_id).await;
                session.finish().await;
                outcome
            }
            .await;
            if let Err(err) = result {
                embed_entry_error(&mut entry, err);
            }
            (i, entry)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (i, entry) = joined.map_err(|e| RestError::Internal(format!("batch worker panicked: {e}")))?;
        bundle.entry[i] = entry;
    }
    Ok(())
}

fn embed_entry_error(entry: &mut ShallowBundleEntry, err: RestError) {
    let status = err.status();
    tracing::debug!(status = status.as_u16(), error = %err, "bundle entry failed");
    entry.resource = None;
    entry.request = None;
    entry.response = Some(EntryResponse {
        status: status.as_u16().to_string(),
        outcome: Some(
            err.outcome()
                .unwrap_or_else(|| error_outcome("processing", &err.to_string())),
        ),
        ..Default::default()
    });
}

/// Executes one entry against the session, filling in its response.
async fn execute_entry(
    ctx: &RequestContext,
    session: &mut Session,
    entry: &mut ShallowBundleEntry,
    create_status: Option<u16>,
    new_id: Option<String>,
) -> RestResult<()> {
    if entry.response.is_some() {
        // already staged (e.g. a 409 from If-Match handling)
        return Ok(());
    }
    let Some(request) = entry.request.clone() else {
        return Ok(());
    };
    tracing::debug!(method = %request.method, url = %request.url, "bundle entry");

    match request.method.as_str() {
        "DELETE" => {
            if !is_conditional(entry) {
                let (resource_type, id) = request.url.split_once('/').ok_or_else(|| {
                    RestError::Structure(format!(
                        "couldn't identify resource and id to delete from {}",
                        request.url
                    ))
                })?;
                match session.delete(id, resource_type).await {
                    Ok(_) | Err(StoreError::NotFound) => {}
                    Err(err) => return Err(err.into()),
                }
            } else {
                let (resource_type, condition) =
                    request.url.split_once('?').unwrap_or((request.url.as_str(), ""));
                let query = Query::new(resource_type.to_string(), condition.to_string());
                session.conditional_delete(&query).await?;
            }
            entry.request = None;
            entry.response = Some(EntryResponse {
                status: "204".to_string(),
                ..Default::default()
            });
        }

        "POST" => {
            let status = create_status.unwrap_or(201);
            let mut response = EntryResponse {
                status: status.to_string(),
                location: Some(entry.full_url.clone()).filter(|u| !u.is_empty()),
                ..Default::default()
            };

            match status {
                201 => {
                    let id = new_id.expect("pass 1 allocates an id for every created entry");
                    let resource = entry.resource.as_mut().ok_or_else(|| {
                        RestError::Invariant("bundle POST must have a resource body".to_string())
                    })?;
                    session.post_with_id(&id, resource).await?;
                    fill_response_meta(&mut response, resource);
                }
                200 => {
                    // conditional create matched one existing resource
                    let existing_id = entry
                        .full_url
                        .rsplit('/')
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    let existing = session.get(&existing_id, &request.url).await?;
                    fill_response_meta(&mut response, &existing);
                    entry.resource = Some(existing);
                }
                412 => {
                    response.outcome = Some(error_outcome(
                        "duplicate",
                        "search criteria were not selective enough",
                    ));
                    entry.resource = None;
                }
                other => {
                    return Err(RestError::Internal(format!(
                        "unexpected staged create status {other}"
                    )));
                }
            }
            entry.request = None;
            entry.response = Some(response);
        }

        "PUT" => {
            // conditional PUTs were rewritten to direct ones in pass 1/2
            let (resource_type, id) = request.url.split_once('/').ok_or_else(|| {
                RestError::Structure(format!(
                    "couldn't identify resource and id to put from {}",
                    request.url
                ))
            })?;
            entry.full_url = ctx.response_url(&[resource_type, id]).to_string();

            let resource = entry.resource.as_mut().ok_or_else(|| {
                RestError::Invariant("bundle PUT must have a resource body".to_string())
            })?;
            let created_new = session.put(id, None, resource).await?;

            let status = if created_new { "201" } else { "200" };
            let mut response = EntryResponse {
                status: status.to_string(),
                location: Some(entry.full_url.clone()),
                ..Default::default()
            };
            fill_response_meta(&mut response, resource);
            entry.request = None;
            entry.response = Some(response);
        }

        "GET" => {
            execute_inner_get(ctx, session, entry, &request.url).await?;
            entry.request = None;
        }

        other => {
            return Err(RestError::Value(format!(
                "operation currently unsupported in batch requests: {other}"
            )));
        }
    }

    Ok(())
}

/// Inner GETs dispatch to read / vread / history / search, like the
/// top-level routes.
async fn execute_inner_get(
    ctx: &RequestContext,
    session: &mut Session,
    entry: &mut ShallowBundleEntry,
    request_url: &str,
) -> RestResult<()> {
    let (path, query_string) = match request_url.split_once('?') {
        Some((path, query)) => (path, query.to_string()),
        None => (request_url, String::new()),
    };
    let path = path.trim_start_matches('/');
    let segments: Vec<&str> = path.split('/').collect();

    let resource_type = segments[0].to_string();
    let mut id = String::new();
    let mut vid = String::new();
    let mut history_request = false;

    if segments.len() >= 2 {
        id = segments[1].to_string();
        if id == "_search" {
            id.clear();
        }
        if id == "_history" {
            return Err(RestError::Value(format!(
                "resource-level history not supported in request: {request_url}"
            )));
        }
        if segments.len() >= 3 {
            if segments[2] != "_history" {
                return Err(RestError::Value(format!(
                    "operation not supported in request: {request_url}"
                )));
            }
            match segments.len() {
                3 => history_request = true,
                4 => vid = segments[3].to_string(),
                _ => {
                    return Err(RestError::Value(format!(
                        "failed to parse request path: {request_url}"
                    )));
                }
            }
        }
    }

    if history_request {
        let base_url = ctx.response_url(&[&resource_type]);
        match session.history(&base_url, &resource_type, &id).await {
            Ok(history) => {
                entry.response = Some(EntryResponse {
                    status: "200".to_string(),
                    ..Default::default()
                });
                entry.resource = Some(history.to_resource()?);
            }
            Err(StoreError::NotFound) => {
                entry.response = Some(EntryResponse {
                    status: "404".to_string(),
                    ..Default::default()
                });
            }
            Err(err) => return Err(err.into()),
        }
    } else if !id.is_empty() {
        let result = if vid.is_empty() {
            session.get(&id, &resource_type).await
        } else {
            session.get_version(&id, &vid, &resource_type).await
        };
        match result {
            Ok(resource) => {
                let mut response = EntryResponse {
                    status: "200".to_string(),
                    ..Default::default()
                };
                fill_response_meta(&mut response, &resource);
                entry.resource = Some(resource);
                entry.response = Some(response);
            }
            Err(StoreError::NotFound) => {
                entry.response = Some(EntryResponse {
                    status: "404".to_string(),
                    ..Default::default()
                });
            }
            Err(StoreError::Deleted) => {
                entry.response = Some(EntryResponse {
                    status: "410".to_string(),
                    ..Default::default()
                });
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        let base_url = ctx.response_url(&[&resource_type]);
        let query = Query::new(resource_type.clone(), query_string);
        let results = session.search(&base_url, &query).await?;
        entry.response = Some(EntryResponse {
            status: "200".to_string(),
            ..Default::default()
        });
        entry.resource = Some(results.to_resource()?);
    }

    Ok(())
}

fn fill_response_meta(response: &mut EntryResponse, resource: &Resource) {
    let version_id = resource.version_id();
    if !version_id.is_empty() {
        response.etag = Some(format!("W/\"{version_id}\""));
    }
    let last_updated = resource.last_updated();
    if !last_updated.is_empty() {
        response.last_modified = Some(last_updated);
    }
}

/// Rewrites one conditional PUT into a direct one by searching for its
/// target, allocating a fresh id when nothing matches.
async fn resolve_conditional_put(
    ctx: &RequestContext,
    session: &mut Session,
    bundle: &mut ShallowBundle,
    index: usize,
    new_ids: &mut [Option<String>],
    ref_map: &mut ReferenceMap,
) -> RestResult<()> {
    let request_url = bundle.entry[index]
        .request
        .as_ref()
        .map(|r| r.url.clone())
        .unwrap_or_default();
    let (resource_type, condition) = request_url.split_once('?').ok_or_else(|| {
        RestError::Structure(format!("conditional PUT URL has no query: {request_url}"))
    })?;

    let query = Query::new(resource_type.to_string(), condition.to_string());
    let ids = session.find_ids(&query).await?;
    let id = match ids.len() {
        0 => new_resource_id(),
        1 => ids.into_iter().next().unwrap(),
        _ => {
            return Err(RestError::Store(StoreError::multiple_matches(format!(
                "multiple matches for {request_url}"
            ))));
        }
    };

    let direct_url = format!("{resource_type}/{id}");
    tracing::debug!(from = %request_url, to = %direct_url, "conditional PUT resolved");

    if let Some(request) = &mut bundle.entry[index].request {
        request.url = direct_url.clone();
    }
    new_ids[index] = Some(id.clone());
    if !bundle.entry[index].full_url.is_empty() {
        ref_map.insert(bundle.entry[index].full_url.clone(), direct_url);
    }
    bundle.entry[index].full_url = ctx.response_url(&[resource_type, &id]).to_string();
    Ok(())
}

/// Validates entries and orders them DELETE, POST, PUT, GET as FHIR
/// mandates. Returns entry indices in execution order; the bundle itself
/// keeps its original order for the response.
fn sort_bundle_entries(bundle: &ShallowBundle) -> RestResult<Vec<usize>> {
    for entry in &bundle.entry {
        let request = entry.request.as_ref().ok_or_else(|| {
            RestError::Invariant("entries in a batch operation require a request".to_string())
        })?;
        match request.method.as_str() {
            "DELETE" => {
                if request.url.is_empty() {
                    return Err(RestError::Invariant("batch DELETE must have a URL".to_string()));
                }
            }
            "POST" => {
                if entry.resource.is_none() {
                    return Err(RestError::Invariant(
                        "batch POST must have a resource body".to_string(),
                    ));
                }
            }
            "PUT" => {
                if entry.resource.is_none() {
                    return Err(RestError::Invariant(
                        "batch PUT must have a resource body".to_string(),
                    ));
                }
                if !request.url.contains('/') && !request.url.contains('?') {
                    return Err(RestError::Invariant(
                        "batch PUT URL must have an id or a condition".to_string(),
                    ));
                }
            }
            "GET" => {
                if request.url.is_empty() {
                    return Err(RestError::Invariant("batch GET must have a URL".to_string()));
                }
            }
            other => {
                return Err(RestError::Value(format!(
                    "operation currently unsupported in batch requests: {other}"
                )));
            }
        }
    }

    let rank = |method: &str| match method {
        "DELETE" => 0,
        "POST" => 1,
        "PUT" => 2,
        _ => 3,
    };
    let mut order: Vec<usize> = (0..bundle.entry.len()).collect();
    order.sort_by_key(|&i| {
        bundle.entry[i]
            .request
            .as_ref()
            .map(|r| rank(&r.method))
            .unwrap_or(3)
    });
    Ok(order)
}

/// Conditional entries carry a query instead of (or alongside) an id.
fn is_conditional(entry: &ShallowBundleEntry) -> bool {
    let Some(request) = &entry.request else {
        return false;
    };
    if request.method != "PUT" && request.method != "DELETE" {
        return false;
    }
    !request.url.contains('/') || request.url.contains('?')
}

/// Matches a temporary in-bundle id used as a search value. Values like
/// `identifier=urn:oid:...|urn:uuid:...` must not match.
fn temp_id_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([=,])(urn:uuid:|urn%3Auuid%3A)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}(&|,|$)",
        )
        .expect("temp id pattern compiles")
    })
}

fn has_temp_id(text: &str) -> bool {
    temp_id_regex().is_match(text)
}

/// Replaces one resolved temp id inside a conditional URL.
fn substitute_temp_id(url: &str, temp_id: &str, resolved: &str) -> String {
    let encoded = temp_id.replace(':', "%3A");
    let pattern = format!(
        "([=,])({}|{})(&|,|$)",
        regex::escape(temp_id),
        regex::escape(&encoded)
    );
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace_all(url, format!("${{1}}{resolved}${{3}}"))
            .into_owned(),
        Err(_) => url.to_string(),
    }
}

/// Validates the `X-Provenance` header, synthesises its `target` array from
/// every written resource, and stores it. Returns the created location.
async fn process_provenance_header(
    provenance_header: &str,
    session: &mut Session,
    bundle: &ShallowBundle,
) -> RestResult<Option<String>> {
    if provenance_header.is_empty() {
        return Ok(None);
    }

    let mut provenance: Value = serde_json::from_str(provenance_header)
        .map_err(|e| RestError::Value(format!("error parsing X-Provenance header: {e}")))?;
    if provenance.get("resourceType").and_then(Value::as_str) != Some("Provenance") {
        return Err(RestError::Value(
            "error parsing X-Provenance header: invalid resourceType".to_string(),
        ));
    }
    if provenance.get("target").is_some() {
        return Err(RestError::Value(
            "error parsing X-Provenance header: target should not be set".to_string(),
        ));
    }

    let enable_history = session.config().enable_history;
    let mut targets = Vec::new();
    for entry in &bundle.entry {
        let Some(resource) = &entry.resource else {
            continue;
        };
        if resource.resource_type().is_empty() || resource.id().is_empty() {
            return Err(RestError::Internal(format!(
                "X-Provenance target missing type or id for {}",
                entry.full_url
            )));
        }
        let version_id = resource.version_id();
        let reference = if enable_history && !version_id.is_empty() {
            format!(
                "{}/{}/_history/{}",
                resource.resource_type(),
                resource.id(),
                version_id
            )
        } else {
            format!("{}/{}", resource.resource_type(), resource.id())
        };
        targets.push(serde_json::json!({"reference": reference}));
    }
    provenance["target"] = Value::Array(targets);

    let mut resource = Resource::from_json_value(provenance)
        .map_err(|e| RestError::Value(format!("error loading X-Provenance header: {e}")))?;
    let id = new_resource_id();
    session.post_with_id(&id, &mut resource).await?;

    Ok(Some(format!("Provenance/{id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(method: &str, url: &str, with_body: bool) -> ShallowBundleEntry {
        ShallowBundleEntry {
            resource: with_body.then(|| {
                Resource::from_json_value(json!({"resourceType": "Patient"})).unwrap()
            }),
            request: Some(meridian_model::EntryRequest {
                method: method.to_string(),
                url: url.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn entries_sort_delete_post_put_get() {
        let bundle = ShallowBundle {
            bundle_type: "transaction".to_string(),
            entry: vec![
                entry("GET", "Patient/1", false),
                entry("PUT", "Patient/2", true),
                entry("POST", "Patient", true),
                entry("DELETE", "Patient/3", false),
            ],
            ..Default::default()
        };
        let order = sort_bundle_entries(&bundle).unwrap();
        assert_eq!(order, vec![3, 2, 1, 0]);
    }

    #[test]
    fn validation_rejects_incomplete_entries() {
        let bundle = ShallowBundle {
            entry: vec![entry("POST", "Patient", false)],
            ..Default::default()
        };
        assert!(matches!(
            sort_bundle_entries(&bundle).unwrap_err(),
            RestError::Invariant(_)
        ));

        let bundle = ShallowBundle {
            entry: vec![entry("PUT", "Patient", true)],
            ..Default::default()
        };
        assert!(matches!(
            sort_bundle_entries(&bundle).unwrap_err(),
            RestError::Invariant(_)
        ));

        let bundle = ShallowBundle {
            entry: vec![entry("PATCH", "Patient/1", true)],
            ..Default::default()
        };
        assert!(matches!(
            sort_bundle_entries(&bundle).unwrap_err(),
            RestError::Value(_)
        ));
    }

    #[test]
    fn conditional_detection() {
        assert!(is_conditional(&entry("PUT", "Patient?identifier=x", true)));
        assert!(is_conditional(&entry("DELETE", "Patient?gender=male", false)));
        assert!(!is_conditional(&entry("PUT", "Patient/123", true)));
        assert!(!is_conditional(&entry("GET", "Patient?gender=male", false)));
    }

    #[test]
    fn temp_id_detection() {
        assert!(has_temp_id(
            "Patient?link=urn:uuid:6002c2ab-9571-4db7-9a79-87163475b071"
        ));
        assert!(has_temp_id(
            "Patient?link=urn%3Auuid%3A6002c2ab-9571-4db7-9a79-87163475b071"
        ));
        // a uuid inside a token value must not count as a temp id
        assert!(!has_temp_id(
            "Patient?identifier=urn:oid:0.1.2.3.4.5.6.7|urn:uuid:6002c2ab-9571-4db7-9a79-87163475b071"
        ));
    }

    #[test]
    fn temp_id_substitution() {
        let url = "Patient?link=urn:uuid:6002c2ab-9571-4db7-9a79-87163475b071&active=true";
        let rewritten = substitute_temp_id(
            url,
            "urn:uuid:6002c2ab-9571-4db7-9a79-87163475b071",
            "Patient/abc",
        );
        assert_eq!(rewritten, "Patient?link=Patient/abc&active=true");
    }
}
