//! Query execution against MongoDB.
//!
//! Runs compiled filters/pipelines on a session, applies sorting and
//! paging, resolves `_include`/`_revinclude` through `$lookup` stages, and
//! maintains the read-only count cache.

use bson::{doc, Bson, Document};
use md5::{Digest, Md5};
use mongodb::{ClientSession, Database};

use meridian_model::registry::{collection_name, is_resource_type};
use meridian_model::Resource;

use crate::compiler::{BsonQuery, CompilerConfig, QueryCompiler};
use crate::error::{SearchError, SearchResult};
use crate::params::{param_info, params_targeting, reference_params, strip_markers, ParamKind, SearchParamInfo};
use crate::query::{IncludeDirective, Query, QueryOptions};

/// Collection holding memoised totals for read-only servers.
pub const COUNT_CACHE_COLLECTION: &str = "countcache";

/// Searcher settings mirrored from the server configuration.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub count_total_results: bool,
    pub enable_ci_searches: bool,
    pub token_parameters_case_sensitive: bool,
    pub read_only: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            count_total_results: true,
            enable_ci_searches: true,
            token_parameters_case_sensitive: false,
            read_only: false,
        }
    }
}

/// Compiles and executes searches over one database.
pub struct MongoSearcher {
    db: Database,
    config: SearchConfig,
}

impl MongoSearcher {
    pub fn new(db: Database, config: SearchConfig) -> Self {
        MongoSearcher { db, config }
    }

    fn compiler(&self) -> QueryCompiler {
        QueryCompiler::new(CompilerConfig {
            enable_ci_searches: self.config.enable_ci_searches,
            token_parameters_case_sensitive: self.config.token_parameters_case_sensitive,
        })
    }

    /// Runs a search, returning the page of resources and the total count.
    ///
    /// The total is 0 when counting is disabled, unless `_summary=count`
    /// forces the count path.
    pub async fn search(
        &self,
        session: &mut ClientSession,
        query: &Query,
    ) -> SearchResult<(Vec<Resource>, u32)> {
        let compiled = self.compiler().convert(query)?;
        let sort = self
            .compiler()
            .sort_document(&compiled.resource, &compiled.options.sorts)?;

        if compiled.options.count_only() {
            let total = self.total(session, &compiled, query).await?;
            return Ok((Vec::new(), total));
        }

        let total = if self.config.count_total_results {
            self.total(session, &compiled, query).await?
        } else {
            0
        };

        let include_stages = self.include_stages(&compiled.resource, &compiled.options)?;
        let coll = self
            .db
            .collection::<Document>(&collection_name(&compiled.resource));

        let mut docs: Vec<Document> = Vec::new();
        if compiled.pipeline.is_none() && include_stages.is_empty() {
            let mut find = coll
                .find(compiled.filter.clone().unwrap_or_default())
                .skip(compiled.options.offset as u64)
                .limit(compiled.options.count as i64);
            if !sort.is_empty() {
                find = find.sort(sort);
            }
            let mut cursor = find.session(&mut *session).await?;
            while let Some(result) = cursor.next(session).await {
                docs.push(result?);
            }
        } else {
            let mut pipeline = match &compiled.pipeline {
                Some(stages) => stages.clone(),
                None => vec![doc! {"$match": compiled.filter.clone().unwrap_or_default()}],
            };
            if !sort.is_empty() {
                pipeline.push(doc! {"$sort": sort});
            }
            if compiled.options.offset > 0 {
                pipeline.push(doc! {"$skip": compiled.options.offset as i64});
            }
            pipeline.push(doc! {"$limit": compiled.options.count as i64});
            pipeline.extend(include_stages);

            let mut cursor = coll.aggregate(pipeline).session(&mut *session).await?;
            while let Some(result) = cursor.next(session).await {
                docs.push(result?);
            }
        }

        let resources = docs
            .iter()
            .map(Resource::from_doc)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((resources, total))
    }

    /// Runs a search and returns only the matching ids, ignoring the
    /// result-shaping parameters.
    pub async fn find_ids(
        &self,
        session: &mut ClientSession,
        query: &Query,
    ) -> SearchResult<Vec<String>> {
        let stripped = query.without_result_params();
        let (resources, _) = self.search(session, &stripped).await?;
        Ok(resources.iter().map(|r| r.id().to_string()).collect())
    }

    async fn total(
        &self,
        session: &mut ClientSession,
        compiled: &BsonQuery,
        query: &Query,
    ) -> SearchResult<u32> {
        if !self.config.read_only {
            return self.compute_total(session, compiled).await;
        }

        // read-only servers memoise totals per canonical query string
        let key = {
            let mut hasher = Md5::new();
            hasher.update(query.canonical().as_bytes());
            format!("{:x}", hasher.finalize())
        };
        let cache = self.db.collection::<Document>(COUNT_CACHE_COLLECTION);
        if let Some(hit) = cache
            .find_one(doc! {"_id": key.as_str()})
            .session(&mut *session)
            .await?
        {
            if let Ok(count) = hit.get_i64("count") {
                return Ok(count as u32);
            }
            if let Ok(count) = hit.get_i32("count") {
                return Ok(count as u32);
            }
        }

        let total = self.compute_total(session, compiled).await?;
        cache
            .update_one(
                doc! {"_id": key.as_str()},
                doc! {"$set": {"count": total as i64}},
            )
            .upsert(true)
            .session(&mut *session)
            .await?;
        Ok(total)
    }

    async fn compute_total(
        &self,
        session: &mut ClientSession,
        compiled: &BsonQuery,
    ) -> SearchResult<u32> {
        let coll = self
            .db
            .collection::<Document>(&collection_name(&compiled.resource));
        match &compiled.pipeline {
            None => {
                let count = coll
                    .count_documents(compiled.filter.clone().unwrap_or_default())
                    .session(&mut *session)
                    .await?;
                Ok(count as u32)
            }
            Some(stages) => {
                let mut pipeline = stages.clone();
                pipeline.push(doc! {"$count": "count"});
                let mut cursor = coll.aggregate(pipeline).session(&mut *session).await?;
                match cursor.next(session).await.transpose()? {
                    Some(doc) => Ok(doc.get_i32("count").unwrap_or_default() as u32),
                    None => Ok(0),
                }
            }
        }
    }

    /// `$lookup` stages attaching included and reverse-included documents to
    /// each result, under keys the egress codec splits back off.
    fn include_stages(
        &self,
        resource: &str,
        options: &QueryOptions,
    ) -> SearchResult<Vec<Document>> {
        let mut stages = Vec::new();

        for directive in &options.includes {
            let params: Vec<&SearchParamInfo> = match directive {
                IncludeDirective::Wildcard => reference_params(resource),
                IncludeDirective::Named {
                    resource: directive_resource,
                    param,
                    ..
                } => {
                    if directive_resource != resource {
                        continue;
                    }
                    match param_info(resource, param) {
                        Some(info) if info.kind == ParamKind::Reference => vec![info],
                        _ => {
                            return Err(SearchError::InvalidValue {
                                name: format!("_include={directive_resource}:{param}"),
                            });
                        }
                    }
                }
            };
            let target_filter = match directive {
                IncludeDirective::Named { target: Some(t), .. } => Some(t.as_str()),
                _ => None,
            };

            for info in params {
                let targets: Vec<&str> = info
                    .targets
                    .iter()
                    .copied()
                    .filter(|t| target_filter.map_or(true, |wanted| wanted == *t))
                    .filter(|t| is_resource_type(t))
                    .collect();
                for target in targets {
                    for (idx, path) in info.paths.iter().enumerate() {
                        let suffix = if info.paths.len() > 1 {
                            format!("Path{idx}")
                        } else {
                            String::new()
                        };
                        let alias = format!(
                            "_included{target}ResourcesReferencedBy{}{suffix}",
                            camelize(info.name)
                        );
                        stages.push(doc! {"$lookup": {
                            "from": collection_name(target),
                            "localField": format!("{}.reference__id", strip_markers(path.path)),
                            "foreignField": "_id",
                            "as": alias,
                        }});
                    }
                }
            }
        }

        for directive in &options.rev_includes {
            let params: Vec<&SearchParamInfo> = match directive {
                IncludeDirective::Wildcard => params_targeting(resource),
                IncludeDirective::Named {
                    resource: source,
                    param,
                    ..
                } => match param_info(source, param) {
                    Some(info) if info.kind == ParamKind::Reference => vec![info],
                    _ => {
                        return Err(SearchError::InvalidValue {
                            name: format!("_revinclude={source}:{param}"),
                        });
                    }
                },
            };

            for info in params {
                if !is_resource_type(info.resource) {
                    continue;
                }
                for (idx, path) in info.paths.iter().enumerate() {
                    let suffix = if info.paths.len() > 1 {
                        format!("Path{idx}")
                    } else {
                        String::new()
                    };
                    let alias = format!(
                        "_revIncluded{}ResourcesReferencing{}{suffix}",
                        info.resource,
                        camelize(info.name)
                    );
                    stages.push(doc! {"$lookup": {
                        "from": collection_name(info.resource),
                        "localField": "_id",
                        "foreignField": format!("{}.reference__id", strip_markers(path.path)),
                        "as": alias,
                    }});
                }
            }
        }

        Ok(stages)
    }
}

/// `general-practitioner` -> `GeneralPractitioner`.
fn camelize(name: &str) -> String {
    name.split('-')
        .map(|piece| {
            let mut chars = piece.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Flushes the count cache; called at startup when the server is writable.
pub async fn flush_count_cache(db: &Database) -> Result<(), mongodb::error::Error> {
    db.collection::<Document>(COUNT_CACHE_COLLECTION)
        .delete_many(doc! {})
        .await?;
    Ok(())
}

/// Hash + count record stored in the cache collection.
pub fn count_cache_entry(canonical_query: &str, count: u32) -> Document {
    let mut hasher = Md5::new();
    hasher.update(canonical_query.as_bytes());
    doc! {"_id": format!("{:x}", hasher.finalize()), "count": Bson::Int64(count as i64)}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camelize_parameter_names() {
        assert_eq!(camelize("subject"), "Subject");
        assert_eq!(camelize("general-practitioner"), "GeneralPractitioner");
    }

    #[test]
    fn count_cache_key_is_md5_of_canonical_query() {
        let entry = count_cache_entry("Device?manufacturer=Acme", 1);
        // md5("Device?manufacturer=Acme")
        assert_eq!(
            entry.get_str("_id").unwrap(),
            format!("{:x}", Md5::digest(b"Device?manufacturer=Acme"))
        );
        assert_eq!(entry.get_i64("count").unwrap(), 1);
    }
}
