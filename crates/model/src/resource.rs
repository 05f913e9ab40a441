//! The in-memory resource envelope.
//!
//! A [`Resource`] holds a parsed FHIR JSON body plus lazily derived identity
//! fields (`resourceType`, `id`, `meta.versionId`, `meta.lastUpdated`). The
//! body is canonicalised through the codec whenever it is stored or
//! rendered, so the on-the-wire shape is identical whether the resource was
//! just ingested or just loaded.

use bson::{Bson, Document};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::crypt::WhatToEncrypt;
use crate::egress::doc_to_json;
use crate::error::{ModelError, ModelResult};
use crate::ingest::{json_to_doc, ReferenceMap};

#[derive(Debug, Clone, Default)]
pub struct Resource {
    json: Value,
    resource_type: String,
    id: String,
    version_id: String,
    last_updated: String,

    /// Satellite resources attached by `_include`/`_revinclude` searches.
    search_includes: Vec<Resource>,

    id_override: Option<String>,
    version_id_override: Option<i64>,
    last_updated_override: Option<DateTime<Utc>>,
    transform_references_map: ReferenceMap,
    what_to_encrypt: WhatToEncrypt,
}

impl Resource {
    /// Parses a resource from raw JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> ModelResult<Resource> {
        let json: Value = serde_json::from_slice(bytes)
            .map_err(|e| ModelError::schema("", format!("malformed JSON: {e}")))?;
        Self::from_json_value(json)
    }

    /// Wraps an already-parsed JSON value.
    pub fn from_json_value(json: Value) -> ModelResult<Resource> {
        let resource_type = json
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::schema("", "JSON missing resourceType element"))?
            .to_string();
        let id = json
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let meta = json.get("meta");
        let version_id = meta
            .and_then(|m| m.get("versionId"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let last_updated = meta
            .and_then(|m| m.get("lastUpdated"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Resource {
            json,
            resource_type,
            id,
            version_id,
            last_updated,
            ..Default::default()
        })
    }

    /// Reconstructs a resource (and its search satellites) from a stored
    /// document.
    pub fn from_doc(doc: &Document) -> ModelResult<Resource> {
        let (json, included) = doc_to_json(doc)?;
        let mut resource = Self::from_json_bytes(json.as_bytes())?;
        for json in included {
            resource
                .search_includes
                .push(Self::from_json_bytes(json.as_bytes())?);
        }
        Ok(resource)
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn id(&self) -> &str {
        self.id_override.as_deref().unwrap_or(&self.id)
    }

    /// The version id as carried in `meta.versionId` (empty when absent).
    pub fn version_id(&self) -> String {
        match self.version_id_override {
            Some(v) => v.to_string(),
            None => self.version_id.clone(),
        }
    }

    /// `meta.lastUpdated` as text (empty when absent).
    pub fn last_updated(&self) -> String {
        match self.last_updated_override {
            Some(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => self.last_updated.clone(),
        }
    }

    /// Parsed `meta.lastUpdated`, if present and valid.
    pub fn last_updated_time(&self) -> Option<DateTime<Utc>> {
        if let Some(t) = self.last_updated_override {
            return Some(t);
        }
        DateTime::parse_from_rfc3339(&self.last_updated)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn search_includes(&self) -> &[Resource] {
        &self.search_includes
    }

    pub fn json(&self) -> &Value {
        &self.json
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id_override = Some(id.into());
    }

    pub fn set_version_id(&mut self, version_id: i64) {
        self.version_id_override = Some(version_id);
    }

    pub fn set_last_updated(&mut self, t: DateTime<Utc>) {
        self.last_updated_override = Some(t);
    }

    /// Reference rewrites applied by the bundle processor; takes effect on
    /// the next canonicalisation.
    pub fn set_transform_references_map(&mut self, map: ReferenceMap) {
        self.transform_references_map = map;
    }

    pub fn set_what_to_encrypt(&mut self, what: WhatToEncrypt) {
        self.what_to_encrypt = what;
    }

    /// Canonicalises the body for storage, applying any pending id, meta and
    /// reference overrides.
    pub fn to_doc(&self) -> ModelResult<Document> {
        let mut doc = json_to_doc(&self.json, &self.what_to_encrypt, &self.transform_references_map)?;

        if let Some(id) = &self.id_override {
            doc.remove("_id");
            let mut rebuilt = Document::new();
            rebuilt.insert("_id", Bson::String(id.clone()));
            rebuilt.extend(doc);
            doc = rebuilt;
        }

        if self.version_id_override.is_some() || self.last_updated_override.is_some() {
            let mut meta = match doc.get_document("meta") {
                Ok(existing) => existing.clone(),
                Err(_) => Document::new(),
            };
            if let Some(version) = self.version_id_override {
                set_first(&mut meta, "versionId", Bson::String(version.to_string()));
            }
            if let Some(t) = self.last_updated_override {
                meta.insert("lastUpdated", Bson::DateTime(t.into()));
            }

            if doc.contains_key("meta") {
                doc.insert("meta", meta);
            } else {
                // keep meta near the front, after _id and resourceType
                let mut rebuilt = Document::new();
                for (key, value) in doc.iter().take(2) {
                    rebuilt.insert(key.clone(), value.clone());
                }
                rebuilt.insert("meta", meta);
                for (key, value) in doc.iter().skip(2) {
                    rebuilt.insert(key.clone(), value.clone());
                }
                doc = rebuilt;
            }
        }

        Ok(doc)
    }

    /// Renders the response JSON via the canonical codec.
    pub fn to_json_string(&self) -> ModelResult<String> {
        let doc = self.to_doc()?;
        Ok(doc_to_json(&doc)?.0)
    }

    /// Renders the response body as a JSON value.
    pub fn to_json_value(&self) -> ModelResult<Value> {
        let json = self.to_json_string()?;
        serde_json::from_str(&json)
            .map_err(|e| ModelError::MalformedDocument(format!("re-parse failed: {e}")))
    }
}

/// Inserts a key at the front of a document, preserving the rest.
fn set_first(doc: &mut Document, key: &str, value: Bson) {
    if doc.contains_key(key) {
        doc.insert(key, value);
        return;
    }
    let mut rebuilt = Document::new();
    rebuilt.insert(key, value);
    rebuilt.extend(doc.clone());
    *doc = rebuilt;
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as _;
        let value = self.to_json_value().map_err(S::Error::custom)?;
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Resource::from_json_value(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn derives_identity_fields() {
        let resource = Resource::from_json_value(json!({
            "resourceType": "Patient",
            "id": "p1",
            "meta": {"versionId": "3", "lastUpdated": "2020-01-02T03:04:05Z"}
        }))
        .unwrap();
        assert_eq!(resource.resource_type(), "Patient");
        assert_eq!(resource.id(), "p1");
        assert_eq!(resource.version_id(), "3");
        assert!(resource.last_updated_time().is_some());
    }

    #[test]
    fn overrides_flow_into_the_stored_document() {
        let mut resource = Resource::from_json_value(json!({
            "resourceType": "Patient",
            "gender": "male"
        }))
        .unwrap();
        resource.set_id("abc123");
        resource.set_version_id(1);
        let when = Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap();
        resource.set_last_updated(when);

        let doc = resource.to_doc().unwrap();
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys[0], "_id");
        assert_eq!(doc.get_str("_id").unwrap(), "abc123");
        let meta = doc.get_document("meta").unwrap();
        assert_eq!(meta.get_str("versionId").unwrap(), "1");
        assert!(meta.get_datetime("lastUpdated").is_ok());
    }

    #[test]
    fn rendered_json_carries_meta() {
        let mut resource = Resource::from_json_value(json!({
            "resourceType": "Patient",
            "gender": "female"
        }))
        .unwrap();
        resource.set_id("x");
        resource.set_version_id(2);
        resource.set_last_updated(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());

        let rendered = resource.to_json_value().unwrap();
        assert_eq!(rendered["id"], "x");
        assert_eq!(rendered["meta"]["versionId"], "2");
        assert_eq!(rendered["gender"], "female");
    }

    #[test]
    fn missing_resource_type_is_rejected() {
        assert!(Resource::from_json_value(json!({"id": "nope"})).is_err());
    }

    #[test]
    fn from_doc_round_trip_preserves_body() {
        let original = Resource::from_json_value(json!({
            "resourceType": "Observation",
            "id": "o1",
            "status": "final",
            "subject": {"reference": "Patient/42"}
        }))
        .unwrap();
        let doc = original.to_doc().unwrap();
        let loaded = Resource::from_doc(&doc).unwrap();
        assert_eq!(loaded.id(), "o1");
        assert_eq!(loaded.to_json_value().unwrap(), original.to_json_value().unwrap());
    }
}
