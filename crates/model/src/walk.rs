//! Visitor-driven traversal of a FHIR JSON document.
//!
//! The walker descends a parsed document, classifies every leaf through the
//! type registry, and invokes the matching visitor callback. Extension
//! arrays get a structural callback carrying the extension `url` before
//! their value fields are walked.

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::position::Position;

/// Callbacks invoked by [`walk_resource`] for each classified leaf.
///
/// All methods default to no-ops so a visitor only implements what it needs.
#[allow(unused_variables)]
pub trait FhirVisitor {
    fn string(&mut self, pos: &Position, value: &str) -> ModelResult<()> {
        Ok(())
    }
    fn date(&mut self, pos: &Position, value: &str) -> ModelResult<()> {
        Ok(())
    }
    fn instant(&mut self, pos: &Position, value: &str) -> ModelResult<()> {
        Ok(())
    }
    fn decimal(&mut self, pos: &Position, value: &str) -> ModelResult<()> {
        Ok(())
    }
    fn number(&mut self, pos: &Position, value: &str) -> ModelResult<()> {
        Ok(())
    }
    fn boolean(&mut self, pos: &Position, value: bool) -> ModelResult<()> {
        Ok(())
    }
    fn null(&mut self, pos: &Position) -> ModelResult<()> {
        Ok(())
    }

    /// Called once per extension array element with its `url`.
    fn extension(&mut self, pos: &Position, url: &str) -> ModelResult<()> {
        Ok(())
    }

    /// Called for the `reference` field of every Reference element.
    fn reference(&mut self, pos: &Position, value: &str) -> ModelResult<()> {
        Ok(())
    }
}

/// Walks a parsed resource, dispatching each leaf to `visitor`.
pub fn walk_resource(resource: &Value, visitor: &mut dyn FhirVisitor) -> ModelResult<()> {
    let map = resource
        .as_object()
        .ok_or_else(|| ModelError::schema("", "resource is not a JSON object"))?;
    let resource_type = map
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::schema("", "missing resourceType"))?;

    let pos = Position::root(resource_type);
    for (key, value) in map {
        walk_object_entry(visitor, &pos, key, value)?;
    }
    Ok(())
}

fn walk_object_entry(
    visitor: &mut dyn FhirVisitor,
    pos: &Position,
    key: &str,
    value: &Value,
) -> ModelResult<()> {
    let next = pos.down_to(key, value)?;
    walk_value(visitor, &next, value)?;

    if pos.at_reference() && key == "reference" {
        if let Some(text) = value.as_str() {
            visitor.reference(&next, text)?;
        }
    }
    Ok(())
}

fn walk_value(visitor: &mut dyn FhirVisitor, pos: &Position, value: &Value) -> ModelResult<()> {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                walk_object_entry(visitor, pos, key, value)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            if pos.at_extension() {
                return walk_extension_array(visitor, pos, items);
            }
            for item in items {
                let elem_pos = pos.into_array(item)?;
                walk_value(visitor, &elem_pos, item)?;
            }
            Ok(())
        }
        Value::String(text) => {
            if pos.at_date() {
                visitor.date(pos, text)
            } else if pos.at_instant() {
                visitor.instant(pos, text)
            } else {
                visitor.string(pos, text)
            }
        }
        Value::Number(num) => {
            let text = num.to_string();
            if pos.at_decimal() {
                visitor.decimal(pos, &text)
            } else {
                visitor.number(pos, &text)
            }
        }
        Value::Bool(b) => visitor.boolean(pos, *b),
        Value::Null => visitor.null(pos),
    }
}

fn walk_extension_array(
    visitor: &mut dyn FhirVisitor,
    pos: &Position,
    items: &[Value],
) -> ModelResult<()> {
    for item in items {
        let map = match item {
            Value::Object(map) => map,
            Value::Null => continue,
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
        visitor.extension(pos, url)?;

        for (key, value) in map {
            if key == "url" {
                continue;
            }
            walk_object_entry(visitor, pos, key, value)?;
        }
    }
    Ok(())
}

/// Visitor that gathers every reference string in a document.
#[derive(Default)]
pub struct CollectReferences {
    output: Vec<String>,
}

impl CollectReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_references(self) -> Vec<String> {
        self.output
    }
}

impl FhirVisitor for CollectReferences {
    fn reference(&mut self, _pos: &Position, value: &str) -> ModelResult<()> {
        self.output.push(value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_references() {
        let observation = json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "1234-5"}]},
            "subject": {"reference": "Patient/42", "display": "John Peters"},
            "context": {"reference": "Encounter/7"}
        });
        let mut collector = CollectReferences::new();
        walk_resource(&observation, &mut collector).unwrap();
        assert_eq!(
            collector.into_references(),
            vec!["Patient/42".to_string(), "Encounter/7".to_string()]
        );
    }

    #[test]
    fn classifies_leaves_by_registry_type() {
        #[derive(Default)]
        struct Tally {
            dates: usize,
            decimals: usize,
            extensions: Vec<String>,
        }
        impl FhirVisitor for Tally {
            fn date(&mut self, _pos: &Position, _v: &str) -> ModelResult<()> {
                self.dates += 1;
                Ok(())
            }
            fn decimal(&mut self, _pos: &Position, _v: &str) -> ModelResult<()> {
                self.decimals += 1;
                Ok(())
            }
            fn extension(&mut self, _pos: &Position, url: &str) -> ModelResult<()> {
                self.extensions.push(url.to_string());
                Ok(())
            }
        }

        let patient = json!({
            "resourceType": "Patient",
            "birthDate": "1970-02-01",
            "extension": [
                {"url": "http://example.org/weight", "valueDecimal": 71.5}
            ]
        });
        let mut tally = Tally::default();
        walk_resource(&patient, &mut tally).unwrap();
        assert_eq!(tally.dates, 1);
        assert_eq!(tally.decimals, 1);
        assert_eq!(tally.extensions, vec!["http://example.org/weight".to_string()]);
    }

    #[test]
    fn unknown_field_fails_structurally() {
        let bad = json!({"resourceType": "Patient", "nonsense": true});
        let mut collector = CollectReferences::new();
        assert!(walk_resource(&bad, &mut collector).is_err());
    }
}
