//! Storage operations.
//!
//! CRUD with optimistic concurrency, conditional variants, history and
//! search, over two collections per resource type: a current collection
//! keyed by the resource id and a previous collection keyed vermongo-style
//! by `{_id: id, _version: n}`. Deletes leave a tombstone in the previous
//! collection so reads can answer 410.

use bson::{doc, Bson, Document};
use chrono::Utc;
use mongodb::options::ReturnDocument;
use mongodb::Collection;
use url::Url;
use uuid::Uuid;

use meridian_model::registry::{collection_name, previous_collection_name};
use meridian_model::{
    BundleLink, EntryRequest, EntrySearch, Resource, ShallowBundle, ShallowBundleEntry,
};
use meridian_search::{MongoSearcher, Query, SearchConfig};

use crate::error::{is_duplicate_key, StoreError, StoreResult};
use crate::interceptor::Op;
use crate::paging::generate_paging_links;
use crate::session::Session;

/// Outcome of a conditional create.
pub enum ConditionalPostResult {
    /// No match; a new resource was created (201).
    Created { id: String },
    /// Exactly one match; nothing was written (200).
    Exists { id: String, resource: Resource },
    /// More than one match (412).
    MultipleMatches,
}

impl Session {
    fn current(&self, resource_type: &str) -> Collection<Document> {
        self.db.collection(&collection_name(resource_type))
    }

    fn previous(&self, resource_type: &str) -> Collection<Document> {
        self.db.collection(&previous_collection_name(resource_type))
    }

    fn searcher(&self) -> MongoSearcher {
        MongoSearcher::new(
            self.db.clone(),
            SearchConfig {
                count_total_results: self.config.count_total_results,
                enable_ci_searches: self.config.enable_ci_searches,
                token_parameters_case_sensitive: self.config.token_parameters_case_sensitive,
                read_only: self.config.read_only,
            },
        )
    }

    /// Reads the current version of a resource. Distinguishes deleted
    /// resources from never-existing ones when history is enabled.
    pub async fn get(&mut self, id: &str, resource_type: &str) -> StoreResult<Resource> {
        let doc = self
            .current(resource_type)
            .find_one(doc! {"_id": id})
            .session(&mut self.session)
            .await?;
        tracing::debug!(resource_type, id, found = doc.is_some(), "get");

        match doc {
            Some(doc) => Ok(Resource::from_doc(&doc)?),
            None => {
                if self.config.enable_history {
                    let tombstone = self
                        .previous(resource_type)
                        .find_one(doc! {"_id._id": id, "_id._deleted": 1})
                        .projection(doc! {"_id": 1})
                        .session(&mut self.session)
                        .await?;
                    if tombstone.is_some() {
                        return Err(StoreError::Deleted);
                    }
                }
                Err(StoreError::NotFound)
            }
        }
    }

    /// Reads a specific version, from the current collection if its version
    /// matches, else from the previous collection.
    pub async fn get_version(
        &mut self,
        id: &str,
        version_id: &str,
        resource_type: &str,
    ) -> StoreResult<Resource> {
        let version: i64 = version_id.parse().map_err(|_| StoreError::NotFound)?;

        let current = self
            .current(resource_type)
            .find_one(doc! {"_id": id, "meta.versionId": version_id})
            .session(&mut self.session)
            .await?;
        if let Some(doc) = current {
            return Ok(Resource::from_doc(&doc)?);
        }

        let previous = self
            .previous(resource_type)
            .find_one(doc! {"_id._id": id, "_id._version": version as i32})
            .session(&mut self.session)
            .await?;
        match previous {
            Some(doc) => {
                let (deleted, resource) = unmarshal_previous_version(&doc)?;
                if deleted {
                    Err(StoreError::Deleted)
                } else {
                    Ok(resource.expect("non-deleted previous version carries a body"))
                }
            }
            None => Err(StoreError::NotFound),
        }
    }

    /// Creates a resource under a fresh server-assigned id.
    pub async fn post(&mut self, resource: &mut Resource) -> StoreResult<String> {
        let id = new_resource_id();
        self.post_with_id(&id, resource).await?;
        Ok(id)
    }

    /// Creates a resource under the supplied id; version 1.
    pub async fn post_with_id(&mut self, id: &str, resource: &mut Resource) -> StoreResult<()> {
        resource.set_id(id);
        update_resource_meta(resource, 1);
        let resource_type = resource.resource_type().to_string();

        self.interceptors.before(Op::Create, &resource_type, Some(resource));

        tracing::debug!(resource_type, id, "inserting");
        let doc = resource.to_doc()?;
        let result = self
            .current(&resource_type)
            .insert_one(doc)
            .session(&mut self.session)
            .await;

        match result {
            Ok(_) => {
                self.interceptors.after(Op::Create, &resource_type, Some(resource));
                Ok(())
            }
            Err(err) => {
                self.interceptors
                    .on_error(Op::Create, &resource_type, &err.to_string(), Some(resource));
                if is_duplicate_key(&err) {
                    Err(StoreError::conflict(format!(
                        "duplicate id creating {resource_type}/{id}"
                    )))
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// Conditional create: the query decides between create, no-op and 412.
    pub async fn conditional_post(
        &mut self,
        query: &Query,
        resource: &mut Resource,
    ) -> StoreResult<ConditionalPostResult> {
        let existing = self.find_ids(query).await?;
        match existing.len() {
            0 => {
                let id = new_resource_id();
                self.post_with_id(&id, resource).await?;
                Ok(ConditionalPostResult::Created { id })
            }
            1 => {
                let id = existing.into_iter().next().unwrap();
                let resource = self.get(&id, &query.resource).await?;
                Ok(ConditionalPostResult::Exists { id, resource })
            }
            _ => Ok(ConditionalPostResult::MultipleMatches),
        }
    }

    /// Updates (or creates) a resource under an id, with optional `If-Match`
    /// version checking, archiving the replaced version vermongo-style.
    ///
    /// Returns true when a new resource was created.
    pub async fn put(
        &mut self,
        id: &str,
        conditional_version_id: Option<i64>,
        resource: &mut Resource,
    ) -> StoreResult<bool> {
        let resource_type = resource.resource_type().to_string();
        resource.set_id(id);
        tracing::debug!(resource_type, id, if_match = ?conditional_version_id, "put");

        let mut current_version: Option<i64> = None;
        let mut new_version: i64 = 1;

        if !self.config.enable_history {
            if conditional_version_id.is_some() {
                return Err(StoreError::InvalidState(
                    "If-Match specified but version histories are disabled".to_string(),
                ));
            }
        } else {
            let current = self
                .current(&resource_type)
                .find_one(doc! {"_id": id})
                .session(&mut self.session)
                .await?;

            match current {
                None => {
                    if conditional_version_id.is_some() {
                        return Err(StoreError::conflict(
                            "If-Match specified for a resource that doesn't exist",
                        ));
                    }
                }
                Some(current_doc) => {
                    // documents written before versioning was enabled count
                    // as version 0
                    let version = version_from_doc(&current_doc).unwrap_or(0);
                    new_version = version + 1;
                    current_version = Some(version);

                    if let Some(expected) = conditional_version_id {
                        if expected != version {
                            return Err(StoreError::conflict(
                                "If-Match doesn't match current versionId",
                            ));
                        }
                    }

                    self.archive_version(&resource_type, id, version, current_doc)
                        .await?;
                }
            }
        }

        update_resource_meta(resource, new_version);

        if self.interceptors.has_any(Op::Update, &resource_type) {
            if let Ok(old) = self.get(id, &resource_type).await {
                self.interceptors.before(Op::Update, &resource_type, Some(&old));
            }
        }

        let doc = resource.to_doc()?;
        let write_result = match current_version {
            None => {
                // no archived version: plain upsert
                let info = self
                    .current(&resource_type)
                    .replace_one(doc! {"_id": id}, doc)
                    .upsert(true)
                    .session(&mut self.session)
                    .await;
                info.map(|info| info.modified_count == 0)
            }
            Some(version) => {
                // atomic check-then-update on the archived version
                let selector = if version == 0 {
                    doc! {"_id": id, "meta.versionId": {"$exists": false}}
                } else {
                    doc! {"_id": id, "meta.versionId": version.to_string()}
                };
                let info = self
                    .current(&resource_type)
                    .replace_one(selector.clone(), doc)
                    .session(&mut self.session)
                    .await;
                match info {
                    Ok(info) if info.modified_count == 0 => {
                        self.interceptors.on_error(
                            Op::Update,
                            &resource_type,
                            "conflicting update",
                            Some(resource),
                        );
                        return Err(StoreError::conflict(format!(
                            "conflicting update for {selector}"
                        )));
                    }
                    other => other.map(|_| false),
                }
            }
        };

        match write_result {
            Ok(created_new) => {
                let op = if created_new { Op::Create } else { Op::Update };
                self.interceptors.after(op, &resource_type, Some(resource));
                Ok(created_new)
            }
            Err(err) => {
                self.interceptors
                    .on_error(Op::Update, &resource_type, &err.to_string(), Some(resource));
                Err(err.into())
            }
        }
    }

    /// Conditional update: the query selects the id (or a fresh one).
    pub async fn conditional_put(
        &mut self,
        query: &Query,
        conditional_version_id: Option<i64>,
        resource: &mut Resource,
    ) -> StoreResult<(String, bool)> {
        let ids = self.find_ids(query).await?;
        let id = match ids.len() {
            0 => new_resource_id(),
            1 => ids.into_iter().next().unwrap(),
            _ => {
                return Err(StoreError::multiple_matches(format!(
                    "multiple matches for {}?{}",
                    query.resource, query.query
                )));
            }
        };
        let created_new = self.put(&id, conditional_version_id, resource).await?;
        Ok((id, created_new))
    }

    /// Deletes a resource, archiving its last version and writing a
    /// tombstone when history is enabled. Returns the tombstone's version.
    pub async fn delete(&mut self, id: &str, resource_type: &str) -> StoreResult<Option<String>> {
        let mut new_version_id = None;
        if self.config.enable_history {
            new_version_id = Some(self.save_deletion_into_history(resource_type, id).await?);
        }

        let has_interceptor = self.interceptors.has_any(Op::Delete, resource_type);
        let doomed = if has_interceptor {
            // fetch the body so interceptors see what is being deleted
            let doomed = self.get(id, resource_type).await.ok();
            self.interceptors.before(Op::Delete, resource_type, doomed.as_ref());
            doomed
        } else {
            None
        };

        let info = self
            .current(resource_type)
            .delete_one(doc! {"_id": id})
            .session(&mut self.session)
            .await;
        tracing::debug!(resource_type, id, result = ?info.as_ref().map(|i| i.deleted_count), "delete");

        let result = match info {
            Ok(info) if info.deleted_count == 0 => Err(StoreError::NotFound),
            Ok(_) => Ok(new_version_id),
            Err(err) => Err(err.into()),
        };

        if has_interceptor {
            match &result {
                Ok(_) => self.interceptors.after(Op::Delete, resource_type, doomed.as_ref()),
                Err(err) => self.interceptors.on_error(
                    Op::Delete,
                    resource_type,
                    &err.to_string(),
                    doomed.as_ref(),
                ),
            }
        }
        result
    }

    /// Moves the current document into the previous collection and inserts
    /// a tombstone; returns the tombstone's version id.
    async fn save_deletion_into_history(
        &mut self,
        resource_type: &str,
        id: &str,
    ) -> StoreResult<String> {
        let current = self
            .current(resource_type)
            .find_one(doc! {"_id": id})
            .session(&mut self.session)
            .await?
            .ok_or(StoreError::NotFound)?;

        let version = version_from_doc(&current).unwrap_or(0);
        let new_version = version + 1;

        self.archive_version(resource_type, id, version, current).await?;

        let tombstone = doc! {
            "_id": {"_id": id, "_version": new_version as i32, "_deleted": 1},
            "meta": {
                "versionId": new_version.to_string(),
                "lastUpdated": Bson::DateTime(Utc::now().into()),
            },
        };
        let key = doc! {"_id": tombstone.get("_id").cloned().unwrap()};
        let result = self
            .previous(resource_type)
            .find_one_and_replace(key, tombstone)
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .session(&mut self.session)
            .await;
        if let Err(err) = result {
            if is_duplicate_key(&err) {
                return Err(StoreError::conflict(format!(
                    "duplicate key storing deletion marker for {resource_type}/{id}"
                )));
            }
            return Err(err.into());
        }

        Ok(new_version.to_string())
    }

    /// Upserts a document into the previous collection under its vermongo
    /// composite key. A duplicate key means another writer archived this
    /// version concurrently.
    async fn archive_version(
        &mut self,
        resource_type: &str,
        id: &str,
        version: i64,
        mut current_doc: Document,
    ) -> StoreResult<()> {
        let vermongo_id = doc! {"_id": id, "_version": version as i32};
        replace_id(&mut current_doc, Bson::Document(vermongo_id.clone()));

        let result = self
            .previous(resource_type)
            .find_one_and_replace(doc! {"_id": vermongo_id}, current_doc)
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .session(&mut self.session)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::conflict(format!(
                "duplicate key storing previous version for {resource_type}/{id}"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes everything the query matches. When history or interceptors
    /// are involved the matching bodies are materialised first so archival
    /// and hooks see them, and the query is re-run afterwards to classify
    /// what was actually removed.
    pub async fn conditional_delete(&mut self, query: &Query) -> StoreResult<u64> {
        let ids = self.find_ids(query).await?;
        let resource_type = query.resource.clone();
        let delete_filter = doc! {"_id": {"$in": ids.clone()}};

        let has_interceptors = self.interceptors.has_any(Op::Delete, &resource_type);
        if !has_interceptors && !self.config.enable_history {
            let info = self
                .current(&resource_type)
                .delete_many(delete_filter)
                .session(&mut self.session)
                .await?;
            return Ok(info.deleted_count);
        }

        let searcher = self.searcher();
        let (doomed, _) = searcher.search(&mut self.session, query).await?;

        if has_interceptors {
            for resource in &doomed {
                self.interceptors.before(Op::Delete, &resource_type, Some(resource));
            }
        }

        if self.config.enable_history {
            for resource in &doomed {
                let id = resource.id().to_string();
                self.save_deletion_into_history(&resource_type, &id).await?;
            }
        }

        let info = self
            .current(&resource_type)
            .delete_many(delete_filter)
            .session(&mut self.session)
            .await;

        let count = match &info {
            Ok(info) => info.deleted_count,
            Err(_) => 0,
        };

        if let Err(err) = info {
            if has_interceptors {
                for resource in &doomed {
                    self.interceptors.on_error(
                        Op::Delete,
                        &resource_type,
                        &err.to_string(),
                        Some(resource),
                    );
                }
            }
            return Err(err.into());
        }

        if has_interceptors {
            // resources still matching the query were not actually removed
            let remaining = self.find_ids(query).await?;
            for resource in &doomed {
                if remaining.iter().any(|id| id == resource.id()) {
                    self.interceptors.on_error(
                        Op::Delete,
                        &resource_type,
                        "conditional delete left the resource in place",
                        Some(resource),
                    );
                } else {
                    self.interceptors.after(Op::Delete, &resource_type, Some(resource));
                }
            }
        }

        Ok(count)
    }

    /// Runs a search and assembles the result bundle with paging links and
    /// deduplicated includes.
    pub async fn search(&mut self, base_url: &Url, query: &Query) -> StoreResult<ShallowBundle> {
        let searcher = self.searcher();
        let (resources, total) = searcher.search(&mut self.session, query).await?;
        let num_results = resources.len() as u32;
        let options = query.parse()?.options;

        let base = base_url.as_str().trim_end_matches('/');
        let mut entries = Vec::with_capacity(resources.len());
        let mut seen_includes: Vec<(String, ShallowBundleEntry)> = Vec::new();

        for resource in resources {
            for included in resource.search_includes() {
                let key = format!("{}/{}", included.resource_type(), included.id());
                if seen_includes.iter().any(|(k, _)| *k == key) {
                    continue;
                }
                seen_includes.push((
                    key,
                    ShallowBundleEntry {
                        resource: Some(included.clone()),
                        search: Some(EntrySearch {
                            mode: Some("include".to_string()),
                        }),
                        ..Default::default()
                    },
                ));
            }

            entries.push(ShallowBundleEntry {
                full_url: format!("{}/{}", base, resource.id()),
                resource: Some(resource),
                search: Some(EntrySearch {
                    mode: Some("match".to_string()),
                }),
                ..Default::default()
            });
        }
        entries.extend(seen_includes.into_iter().map(|(_, entry)| entry));

        let include_total = self.config.count_total_results || options.count_only();
        Ok(ShallowBundle {
            id: new_resource_id(),
            bundle_type: "searchset".to_string(),
            total: include_total.then_some(total),
            entry: entries,
            link: generate_paging_links(
                base_url,
                query,
                total,
                num_results,
                self.config.count_total_results,
            ),
            ..Default::default()
        })
    }

    /// Runs a search and returns matching ids only.
    pub async fn find_ids(&mut self, query: &Query) -> StoreResult<Vec<String>> {
        let searcher = self.searcher();
        Ok(searcher.find_ids(&mut self.session, query).await?)
    }

    /// Returns the version history of a resource, newest first. The last
    /// (oldest) entry's request method is POST.
    pub async fn history(
        &mut self,
        base_url: &Url,
        resource_type: &str,
        id: &str,
    ) -> StoreResult<ShallowBundle> {
        let base = base_url.as_str().trim_end_matches('/');
        let full_url = format!("{base}/{id}");
        let request = |method: &str| {
            Some(EntryRequest {
                method: method.to_string(),
                url: format!("{resource_type}/{id}"),
                ..Default::default()
            })
        };

        let mut entries: Vec<ShallowBundleEntry> = Vec::new();

        let current = self
            .current(resource_type)
            .find_one(doc! {"_id": id})
            .session(&mut self.session)
            .await?;
        if let Some(doc) = current {
            entries.push(ShallowBundleEntry {
                full_url: full_url.clone(),
                resource: Some(Resource::from_doc(&doc)?),
                request: request("PUT"),
                ..Default::default()
            });
        }

        let mut cursor = self
            .previous(resource_type)
            .find(doc! {"_id._id": id})
            .sort(doc! {"_id._version": -1})
            .session(&mut self.session)
            .await?;
        while let Some(result) = cursor.next(&mut self.session).await {
            let doc = result?;
            let (deleted, resource) = unmarshal_previous_version(&doc)?;
            if deleted {
                entries.push(ShallowBundleEntry {
                    full_url: full_url.clone(),
                    request: request("DELETE"),
                    ..Default::default()
                });
            } else {
                entries.push(ShallowBundleEntry {
                    full_url: full_url.clone(),
                    resource,
                    request: request("PUT"),
                    ..Default::default()
                });
            }
        }

        let total = entries.len() as u32;
        if total == 0 {
            return Err(StoreError::NotFound);
        }

        // the oldest entry represents the original create
        if let Some(last) = entries.last_mut() {
            if let Some(request) = &mut last.request {
                request.method = "POST".to_string();
                request.url = resource_type.to_string();
            }
        }

        Ok(ShallowBundle {
            id: new_resource_id(),
            bundle_type: "history".to_string(),
            total: Some(total),
            entry: entries,
            link: Vec::<BundleLink>::new(),
            ..Default::default()
        })
    }
}

/// Fresh server-assigned resource id: 32 lowercase hex characters.
pub fn new_resource_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn update_resource_meta(resource: &mut Resource, version: i64) {
    resource.set_version_id(version);
    resource.set_last_updated(Utc::now());
}

/// Extracts `meta.versionId` (stored as a string) from a current document.
fn version_from_doc(doc: &Document) -> Option<i64> {
    doc.get_document("meta")
        .ok()
        .and_then(|meta| meta.get_str("versionId").ok())
        .and_then(|v| v.parse().ok())
}

fn replace_id(doc: &mut Document, id: Bson) {
    doc.remove("_id");
    let mut rebuilt = Document::new();
    rebuilt.insert("_id", id);
    rebuilt.extend(doc.clone());
    *doc = rebuilt;
}

/// Converts a previous-collection document back into a resource, undoing
/// the vermongo composite key. Tombstones return `(true, None)`.
fn unmarshal_previous_version(doc: &Document) -> StoreResult<(bool, Option<Resource>)> {
    let composite = doc
        .get_document("_id")
        .map_err(|_| StoreError::InvalidState("previous version has no composite _id".to_string()))?;
    let actual_id = composite
        .get_str("_id")
        .map_err(|_| StoreError::InvalidState("previous version _id._id is not a string".to_string()))?
        .to_string();

    if matches!(composite.get_i32("_deleted"), Ok(flag) if flag > 0) {
        return Ok((true, None));
    }

    let mut plain = doc.clone();
    replace_id(&mut plain, Bson::String(actual_id));
    let resource = Resource::from_doc(&plain)?;
    Ok((false, Some(resource)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_extraction() {
        let doc = doc! {"_id": "x", "meta": {"versionId": "4"}};
        assert_eq!(version_from_doc(&doc), Some(4));
        assert_eq!(version_from_doc(&doc! {"_id": "x"}), None);
        assert_eq!(
            version_from_doc(&doc! {"meta": {"versionId": "not-a-number"}}),
            None
        );
    }

    #[test]
    fn previous_version_unmarshalling() {
        let archived = doc! {
            "_id": {"_id": "p1", "_version": 2},
            "resourceType": "Patient",
            "gender": "male",
        };
        let (deleted, resource) = unmarshal_previous_version(&archived).unwrap();
        assert!(!deleted);
        let resource = resource.unwrap();
        assert_eq!(resource.id(), "p1");
        assert_eq!(resource.resource_type(), "Patient");

        let tombstone = doc! {
            "_id": {"_id": "p1", "_version": 3, "_deleted": 1},
            "meta": {"versionId": "3"},
        };
        let (deleted, resource) = unmarshal_previous_version(&tombstone).unwrap();
        assert!(deleted);
        assert!(resource.is_none());
    }

    #[test]
    fn fresh_ids_are_hex() {
        let id = new_resource_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_resource_id());
    }
}
