//! Inbound canonicalisation: FHIR JSON to the stored BSON form.
//!
//! Transformations applied on the way in:
//!
//! - `id` becomes `_id` and is placed first; a pre-existing `_id` becomes
//!   `__id`
//! - every `reference` gains `reference__id`, `reference__type` and
//!   `reference__external` sibling fields for indexing (and is first
//!   rewritten through the transaction reference map, when given)
//! - decimals become `{__from, __to, __num, __strNum}` sub-documents
//! - dates and dateTimes become `{__from, __to, __strDate}`
//! - instants become native timestamps
//! - extension arrays `[{url, value...}]` become `[{url: {value...}}]` so
//!   extensions are addressable by URL
//! - Patient details are optionally encrypted

use std::collections::HashMap;

use bson::{Bson, Document};
use serde_json::Value;

use crate::crypt::{encrypt_document, WhatToEncrypt};
use crate::error::{ModelError, ModelResult};
use crate::literal::{parse_instant, DateLiteral, NumberLiteral};
use crate::position::Position;
use crate::registry;

pub const FIELD_STR_NUM: &str = "__strNum";
pub const FIELD_STR_DATE: &str = "__strDate";
pub const FIELD_NUM: &str = "__num";
pub const FIELD_FROM: &str = "__from";
pub const FIELD_TO: &str = "__to";

/// Map of reference rewrites supplied by the bundle processor.
pub type ReferenceMap = HashMap<String, String>;

/// Converts a parsed FHIR JSON resource into its stored BSON form.
pub fn json_to_doc(
    resource: &Value,
    what_to_encrypt: &WhatToEncrypt,
    refs_map: &ReferenceMap,
) -> ModelResult<Document> {
    let map = resource
        .as_object()
        .ok_or_else(|| ModelError::schema("", "resource is not a JSON object"))?;
    let resource_type = map
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::schema("", "missing resourceType"))?;

    let pos = Position::root(resource_type);
    let mut fields: Vec<(String, Bson)> = Vec::with_capacity(map.len() + 4);
    for (key, value) in map {
        convert_entry(&mut fields, &pos, key, value, refs_map)?;
    }

    let mut doc = assemble(fields);
    encrypt_document(&mut doc, resource_type, what_to_encrypt)?;
    Ok(doc)
}

/// Builds a Document from collected fields, hoisting `_id` to the front.
fn assemble(fields: Vec<(String, Bson)>) -> Document {
    let mut doc = Document::new();
    for (key, value) in fields.iter().filter(|(k, _)| k == "_id") {
        doc.insert(key.clone(), value.clone());
    }
    for (key, value) in fields {
        if key != "_id" {
            doc.insert(key, value);
        }
    }
    doc
}

fn convert_entry(
    output: &mut Vec<(String, Bson)>,
    pos: &Position,
    key: &str,
    value: &Value,
    refs_map: &ReferenceMap,
) -> ModelResult<()> {
    let next = pos.down_to(key, value)?;
    let mut converted = convert_value(&next, value, refs_map)?;

    let stored_key = match key {
        "id" => "_id",
        "_id" => "__id",
        other => other,
    };

    // the display and identifier fields of a Reference are left alone
    if pos.at_reference() && key == "reference" {
        let mut reference = value
            .as_str()
            .ok_or_else(|| ModelError::schema(next.path(), "reference is not a string"))?
            .to_string();
        if let Some(replacement) = refs_map.get(&reference) {
            reference = replacement.clone();
            converted = Bson::String(reference.clone());
        }

        output.push((stored_key.to_string(), converted));
        append_reference_index_fields(output, &next, &reference)?;
        return Ok(());
    }

    output.push((stored_key.to_string(), converted));
    Ok(())
}

/// Derives `reference__id` / `reference__type` / `reference__external` for a
/// reference string. Internal (`#`) references and in-bundle `urn:uuid:`
/// references get only the `reference__external` marker.
fn append_reference_index_fields(
    output: &mut Vec<(String, Bson)>,
    pos: &Position,
    reference: &str,
) -> ModelResult<()> {
    let segments: Vec<&str> = reference.split('/').collect();

    if segments.len() >= 2 {
        let (reference_id, type_name) = if segments[segments.len() - 2] == "_history" {
            // e.g. http://host/base/Patient/34/_history/3
            if segments.len() < 4 {
                return Err(ModelError::InvalidReference {
                    reference: reference.to_string(),
                });
            }
            (segments[segments.len() - 3], segments[segments.len() - 4])
        } else {
            // e.g. Patient/34 or http://host/base/Patient/34
            (segments[segments.len() - 1], segments[segments.len() - 2])
        };

        if !registry::is_reference_target(type_name) {
            return Err(ModelError::InvalidReference {
                reference: reference.to_string(),
            });
        }

        output.push(("reference__id".to_string(), Bson::String(reference_id.to_string())));
        output.push(("reference__type".to_string(), Bson::String(type_name.to_string())));
    } else if reference.starts_with('#') {
        // internal reference to a contained resource
    } else if reference.starts_with("urn:uuid:") && pos.path().starts_with("Bundle.") {
        // unprocessed in-bundle reference (e.g. a Bundle POSTed to /Bundle)
    } else {
        return Err(ModelError::InvalidReference {
            reference: reference.to_string(),
        });
    }

    let external = reference.starts_with("http");
    output.push(("reference__external".to_string(), Bson::Boolean(external)));
    Ok(())
}

fn convert_value(pos: &Position, value: &Value, refs_map: &ReferenceMap) -> ModelResult<Bson> {
    match value {
        Value::Object(map) => {
            let mut fields = Vec::with_capacity(map.len());
            for (key, value) in map {
                convert_entry(&mut fields, pos, key, value, refs_map)?;
            }
            Ok(Bson::Document(assemble(fields)))
        }
        Value::Array(items) => {
            if pos.at_extension() {
                return convert_extension_array(pos, items, refs_map);
            }
            let mut array = Vec::with_capacity(items.len());
            for item in items {
                let elem_pos = pos.into_array(item)?;
                array.push(convert_value(&elem_pos, item, refs_map)?);
            }
            Ok(Bson::Array(array))
        }
        Value::String(text) => {
            if pos.at_date() {
                let date = DateLiteral::parse(text).map_err(|_| ModelError::InvalidDate {
                    kind: "date",
                    path: pos.path().to_string(),
                    value: text.clone(),
                })?;
                let mut sub = Document::new();
                sub.insert(FIELD_FROM, Bson::DateTime(date.range_low_incl().into()));
                sub.insert(FIELD_TO, Bson::DateTime(date.range_high_excl().into()));
                sub.insert(FIELD_STR_DATE, text.clone());
                Ok(Bson::Document(sub))
            } else if pos.at_instant() {
                let instant = parse_instant(text).map_err(|_| ModelError::InvalidDate {
                    kind: "instant",
                    path: pos.path().to_string(),
                    value: text.clone(),
                })?;
                Ok(Bson::DateTime(instant.into()))
            } else {
                Ok(Bson::String(text.clone()))
            }
        }
        Value::Number(num) => convert_number(pos, &num.to_string()),
        Value::Bool(b) => Ok(Bson::Boolean(*b)),
        Value::Null => Ok(Bson::Null),
    }
}

/// Decimals keep their exact digits; the numeric form and an inflated
/// half-ulp range are stored alongside for querying.
fn convert_number(pos: &Position, text: &str) -> ModelResult<Bson> {
    if pos.at_decimal() {
        let literal = NumberLiteral::parse(text).map_err(|_| ModelError::InvalidNumber {
            path: pos.path().to_string(),
            value: text.to_string(),
        })?;

        let numeric = if text.contains('.') || text.contains(['e', 'E']) {
            Bson::Double(literal.value())
        } else {
            match text.parse::<i64>() {
                Ok(n) => int_bson(n),
                Err(_) => Bson::Double(literal.value()),
            }
        };

        let mut sub = Document::new();
        sub.insert(FIELD_FROM, Bson::Double(literal.range_low_incl()));
        sub.insert(FIELD_TO, Bson::Double(literal.range_high_excl()));
        sub.insert(FIELD_NUM, numeric);
        sub.insert(FIELD_STR_NUM, text.to_string());
        Ok(Bson::Document(sub))
    } else {
        if text.contains('.') {
            return Err(ModelError::InvalidNumber {
                path: pos.path().to_string(),
                value: text.to_string(),
            });
        }
        let n: i64 = text.parse().map_err(|_| ModelError::InvalidNumber {
            path: pos.path().to_string(),
            value: text.to_string(),
        })?;
        Ok(int_bson(n))
    }
}

fn int_bson(n: i64) -> Bson {
    match i32::try_from(n) {
        Ok(small) => Bson::Int32(small),
        Err(_) => Bson::Int64(n),
    }
}

/// Re-keys a flat extension array by URL: `[{url: U, valueX: ...}]` becomes
/// `[{U: {valueX: ...}}]`.
fn convert_extension_array(
    pos: &Position,
    items: &[Value],
    refs_map: &ReferenceMap,
) -> ModelResult<Bson> {
    let mut array = Vec::with_capacity(items.len());
    for item in items {
        let map = match item {
            Value::Object(map) => map,
            Value::Null => {
                array.push(Bson::Null);
                continue;
            }
            _ => {
                return Err(ModelError::schema(
                    pos.path(),
                    "extension array element is not an object",
                ));
            }
        };
        let url = map
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::schema(pos.path(), "extension has no url"))?;

        let mut fields = Vec::with_capacity(map.len());
        for (key, value) in map {
            if key == "url" {
                continue;
            }
            convert_entry(&mut fields, pos, key, value, refs_map)?;
        }

        let mut keyed = Document::new();
        keyed.insert(url.to_string(), Bson::Document(assemble(fields)));
        array.push(Bson::Document(keyed));
    }
    Ok(Bson::Array(array))
}
