//! Outbound rendering: stored BSON back to FHIR JSON.
//!
//! Strictly inverse to [`crate::ingest`]: `_id` becomes `id`, `__id` becomes
//! `_id`, decimal and date sub-documents collapse back to their original
//! text, extension arrays reflatten, and the derived `reference__*` index
//! fields disappear. Satellite documents attached by the search engine
//! (`_included*` / `_revIncluded*` arrays) are split off and returned
//! separately. Output is written directly into a text buffer so number
//! digits are never re-parsed.

use bson::{Bson, Document};
use chrono::SecondsFormat;

use crate::crypt::decrypt_document;
use crate::error::{ModelError, ModelResult};
use crate::ingest::{FIELD_STR_DATE, FIELD_STR_NUM};

/// Converts a stored document to JSON text, returning the JSON for any
/// attached included documents alongside.
pub fn doc_to_json(doc: &Document) -> ModelResult<(String, Vec<String>)> {
    let mut doc = doc.clone();
    decrypt_document(&mut doc)?;

    let included = extract_included(&doc)?;

    let mut out = String::with_capacity(256);
    write_document(&mut out, &doc)?;
    Ok((out, included))
}

fn is_included_key(key: &str) -> bool {
    key.starts_with("_included") || key.starts_with("_revIncluded")
}

fn extract_included(doc: &Document) -> ModelResult<Vec<String>> {
    let mut included = Vec::new();
    for (key, value) in doc {
        if !is_included_key(key) {
            continue;
        }
        let array = value.as_array().ok_or_else(|| {
            ModelError::MalformedDocument(format!("{key} is not an array"))
        })?;
        for item in array {
            let sub = item.as_document().ok_or_else(|| {
                ModelError::MalformedDocument(format!("{key} element is not a document"))
            })?;
            let (json, nested) = doc_to_json(sub)?;
            if !nested.is_empty() {
                return Err(ModelError::MalformedDocument(format!(
                    "unexpected nested includes under {key}"
                )));
            }
            included.push(json);
        }
    }
    Ok(included)
}

fn write_document(out: &mut String, doc: &Document) -> ModelResult<()> {
    // decimal and date sub-documents collapse to their preserved text
    if let Ok(text) = doc.get_str(FIELD_STR_NUM) {
        out.push_str(text);
        return Ok(());
    }
    if let Ok(text) = doc.get_str(FIELD_STR_DATE) {
        push_json_string(out, text);
        return Ok(());
    }

    out.push('{');
    let mut first = true;
    for (key, value) in doc {
        match key.as_str() {
            "reference__id" | "reference__type" | "reference__external" => continue,
            _ if is_included_key(key) => continue,
            _ if key.starts_with("_lookup") => continue,
            _ => {}
        }

        if !first {
            out.push(',');
        }
        first = false;

        let json_key = match key.as_str() {
            "_id" => "id",
            "__id" => "_id",
            other => other,
        };
        push_json_string(out, json_key);
        out.push(':');

        if key == "extension" || key == "modifierExtension" {
            write_extension_array(out, value)?;
        } else {
            write_value(out, value)?;
        }
    }
    out.push('}');
    Ok(())
}

fn write_value(out: &mut String, value: &Bson) -> ModelResult<()> {
    match value {
        Bson::Document(doc) => write_document(out, doc),
        Bson::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
            Ok(())
        }
        Bson::String(s) => {
            push_json_string(out, s);
            Ok(())
        }
        Bson::Boolean(b) => {
            out.push_str(if *b { "true" } else { "false" });
            Ok(())
        }
        Bson::Int32(n) => {
            out.push_str(&n.to_string());
            Ok(())
        }
        Bson::Int64(n) => {
            out.push_str(&n.to_string());
            Ok(())
        }
        Bson::Double(f) => {
            // only reachable for documents written by other tooling; stored
            // decimals always carry their text form
            let rendered = serde_json::Number::from_f64(*f)
                .map(|n| n.to_string())
                .ok_or_else(|| {
                    ModelError::MalformedDocument(format!("non-finite double {f}"))
                })?;
            out.push_str(&rendered);
            Ok(())
        }
        Bson::DateTime(dt) => {
            let text = dt
                .to_chrono()
                .to_rfc3339_opts(SecondsFormat::Millis, true);
            push_json_string(out, &text);
            Ok(())
        }
        Bson::Null => {
            out.push_str("null");
            Ok(())
        }
        other => Err(ModelError::MalformedDocument(format!(
            "unhandled BSON value of type {:?}",
            other.element_type()
        ))),
    }
}

/// Reverses the URL-keyed extension form back to `[{url, value...}]`.
fn write_extension_array(out: &mut String, value: &Bson) -> ModelResult<()> {
    let items = match value {
        Bson::Array(items) => items,
        Bson::Null => {
            out.push_str("null");
            return Ok(());
        }
        _ => {
            return Err(ModelError::MalformedDocument(
                "extension field is not an array".to_string(),
            ));
        }
    };

    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let keyed = item.as_document().ok_or_else(|| {
            ModelError::MalformedDocument("extension element is not a document".to_string())
        })?;
        if keyed.len() != 1 {
            return Err(ModelError::MalformedDocument(format!(
                "extension element has {} keys, expected 1",
                keyed.len()
            )));
        }
        let (url, inner) = keyed.iter().next().unwrap();
        let inner = inner.as_document().ok_or_else(|| {
            ModelError::MalformedDocument("extension value is not a document".to_string())
        })?;

        let mut flat = Document::new();
        flat.insert("url", Bson::String(url.clone()));
        for (key, value) in inner {
            flat.insert(key.clone(), value.clone());
        }
        write_document(out, &flat)?;
    }
    out.push(']');
    Ok(())
}

fn push_json_string(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::WhatToEncrypt;
    use crate::ingest::{json_to_doc, ReferenceMap};
    use serde_json::Value;

    fn round_trip(raw: &str) -> (Value, Value) {
        let original: Value = serde_json::from_str(raw).unwrap();
        let doc = json_to_doc(&original, &WhatToEncrypt::default(), &ReferenceMap::new()).unwrap();
        let (json, included) = doc_to_json(&doc).unwrap();
        assert!(included.is_empty());
        (original, serde_json::from_str(&json).unwrap())
    }

    #[test]
    fn patient_round_trips_losslessly() {
        let (original, output) = round_trip(
            r#"{
                "resourceType": "Patient",
                "id": "p1",
                "name": [{"given": ["Donald"], "family": "Duck"}],
                "identifier": [{"system": "urn:oid:0.1.2.3.4.5.6.7", "value": "123"}],
                "gender": "male",
                "birthDate": "1970-02-01",
                "active": true
            }"#,
        );
        assert_eq!(original, output);
    }

    #[test]
    fn decimal_digits_survive_round_trip() {
        let (original, output) = round_trip(
            r#"{
                "resourceType": "Observation",
                "valueQuantity": {"value": 185.00, "unit": "lbs"}
            }"#,
        );
        assert_eq!(original, output);
        assert_eq!(
            output["valueQuantity"]["value"].to_string(),
            "185.00"
        );
    }

    #[test]
    fn extensions_round_trip() {
        let (original, output) = round_trip(
            r#"{
                "resourceType": "Patient",
                "extension": [
                    {"url": "http://example.org/a", "valueString": "x"},
                    {"url": "http://example.org/b", "valueDecimal": 2.50}
                ]
            }"#,
        );
        assert_eq!(original, output);
    }

    #[test]
    fn references_round_trip_without_index_fields() {
        let (original, output) = round_trip(
            r#"{
                "resourceType": "Observation",
                "subject": {"reference": "Patient/42", "display": "John"}
            }"#,
        );
        assert_eq!(original, output);
    }

    #[test]
    fn primitive_extensions_round_trip() {
        let (original, output) = round_trip(
            r#"{
                "resourceType": "Patient",
                "birthDate": "1970",
                "_birthDate": {"extension": [{"url": "http://example.org/estimated", "valueBoolean": true}]}
            }"#,
        );
        assert_eq!(original, output);
    }

    #[test]
    fn included_documents_are_split_off() {
        let stored: Value = serde_json::from_str(
            r#"{"resourceType": "Condition", "id": "c1", "subject": {"reference": "Patient/42"}}"#,
        )
        .unwrap();
        let mut doc =
            json_to_doc(&stored, &WhatToEncrypt::default(), &ReferenceMap::new()).unwrap();

        let patient: Value =
            serde_json::from_str(r#"{"resourceType": "Patient", "id": "42"}"#).unwrap();
        let patient_doc =
            json_to_doc(&patient, &WhatToEncrypt::default(), &ReferenceMap::new()).unwrap();
        doc.insert(
            "_includedPatientResourcesReferencedBySubject",
            Bson::Array(vec![Bson::Document(patient_doc)]),
        );

        let (json, included) = doc_to_json(&doc).unwrap();
        let condition: Value = serde_json::from_str(&json).unwrap();
        assert!(condition.get("_includedPatientResourcesReferencedBySubject").is_none());
        assert_eq!(included.len(), 1);
        let included: Value = serde_json::from_str(&included[0]).unwrap();
        assert_eq!(included["id"], "42");
    }

    #[test]
    fn escapes_control_characters() {
        let mut out = String::new();
        push_json_string(&mut out, "a\"b\\c\nd");
        assert_eq!(out, r#""a\"b\\c\nd""#);
    }
}
