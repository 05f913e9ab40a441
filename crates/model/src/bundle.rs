//! Shallow bundle types.
//!
//! A `ShallowBundle` deserialises only the bundle scaffolding (entries,
//! requests, responses, links); entry resources stay opaque [`Resource`]
//! envelopes. This is the form the transaction/batch processor and the
//! search engine work with.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::ingest::ReferenceMap;
use crate::resource::Resource;
use crate::walk::{walk_resource, CollectReferences};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShallowBundle {
    #[serde(rename = "resourceType", skip_serializing_if = "String::is_empty", default)]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub meta: Option<Value>,

    #[serde(rename = "type", skip_serializing_if = "String::is_empty", default)]
    pub bundle_type: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total: Option<u32>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub entry: Vec<ShallowBundleEntry>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub link: Vec<BundleLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShallowBundleEntry {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resource: Option<Resource>,

    #[serde(rename = "fullUrl", skip_serializing_if = "String::is_empty", default)]
    pub full_url: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub search: Option<EntrySearch>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request: Option<EntryRequest>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response: Option<EntryResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntrySearch {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryRequest {
    #[serde(default)]
    pub method: String,

    #[serde(default)]
    pub url: String,

    #[serde(rename = "ifNoneMatch", skip_serializing_if = "Option::is_none", default)]
    pub if_none_match: Option<String>,

    #[serde(rename = "ifModifiedSince", skip_serializing_if = "Option::is_none", default)]
    pub if_modified_since: Option<String>,

    #[serde(rename = "ifMatch", skip_serializing_if = "Option::is_none", default)]
    pub if_match: Option<String>,

    #[serde(rename = "ifNoneExist", skip_serializing_if = "Option::is_none", default)]
    pub if_none_exist: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryResponse {
    #[serde(default)]
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub etag: Option<String>,

    #[serde(rename = "lastModified", skip_serializing_if = "Option::is_none", default)]
    pub last_modified: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub outcome: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

impl ShallowBundle {
    /// Serialises the bundle, stamping `resourceType` and a `meta` with the
    /// current time when absent.
    pub fn to_json_value(&self) -> ModelResult<Value> {
        let mut bundle = self.clone();
        bundle.resource_type = "Bundle".to_string();
        if bundle.meta.is_none() {
            bundle.meta = Some(serde_json::json!({
                "lastUpdated": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }));
        }
        serde_json::to_value(&bundle)
            .map_err(|e| ModelError::MalformedDocument(format!("bundle serialisation failed: {e}")))
    }

    /// Converts the bundle to a plain resource envelope (used for inner GET
    /// responses inside a bundle).
    pub fn to_resource(&self) -> ModelResult<Resource> {
        Resource::from_json_value(self.to_json_value()?)
    }

    /// Fans a reference-rewrite map out to every entry resource.
    pub fn set_transform_references_map(&mut self, map: &ReferenceMap) {
        for entry in &mut self.entry {
            if let Some(resource) = &mut entry.resource {
                resource.set_transform_references_map(map.clone());
            }
        }
    }

    /// Collects every reference string from all entry resources.
    pub fn all_references(&self) -> ModelResult<Vec<String>> {
        let mut collector = CollectReferences::new();
        for entry in &self.entry {
            if let Some(resource) = &entry.resource {
                walk_resource(resource.json(), &mut collector)?;
            }
        }
        Ok(collector.into_references())
    }
}
