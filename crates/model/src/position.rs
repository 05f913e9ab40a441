//! Descent cursor shared by the walker and the two codec directions.

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::registry;

/// Tracks where in the type system a traversal currently is.
///
/// `element` is the registry context used for child lookups; `path` is the
/// document path, kept only for error messages. For contained and inline
/// resources the element switches to the nested `resourceType`; for arrays
/// of `Resource` that switch is deferred to array-element descent.
#[derive(Debug, Clone)]
pub struct Position {
    element: String,
    path: String,
    need_resource_type: bool,
}

impl Position {
    /// Root position for a resource of the given type.
    pub fn root(resource_type: &str) -> Self {
        Position {
            element: resource_type.to_string(),
            path: resource_type.to_string(),
            need_resource_type: false,
        }
    }

    pub fn at_reference(&self) -> bool {
        self.element == "Reference"
    }
    pub fn at_extension(&self) -> bool {
        self.element == "Extension"
    }
    pub fn at_decimal(&self) -> bool {
        self.element == "decimal"
    }
    pub fn at_date(&self) -> bool {
        self.element == "date" || self.element == "dateTime"
    }
    pub fn at_instant(&self) -> bool {
        self.element == "instant"
    }

    /// Dotted document path, for diagnostics.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registry element context.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Descends into an object key, classifying the child element.
    pub fn down_to(&self, key: &str, value: &Value) -> ModelResult<Position> {
        if self.need_resource_type {
            return Err(ModelError::schema(
                &self.path,
                "descended into an object before resolving its resource type",
            ));
        }

        let next_path = format!("{}.{}", self.path, key);

        // resourceType at a resource root is not part of the definitions
        if key == "resourceType" && !self.element.contains('.') {
            return Ok(Position {
                element: "string".to_string(),
                path: next_path,
                need_resource_type: false,
            });
        }

        // primitive-element sibling, e.g. "_birthDate"
        if key.starts_with('_') {
            return Ok(Position {
                element: "_".to_string(),
                path: next_path,
                need_resource_type: false,
            });
        }

        let lookup = format!("{}.{}", self.element, key);
        let declared = registry::element_type(&lookup).ok_or_else(|| {
            ModelError::schema(
                &self.path,
                format!("no type registered for element {lookup}"),
            )
        })?;

        // BackboneElement and Element extend the current context path;
        // every other type resets the context to the type name.
        let mut next_element = if declared == "BackboneElement" || declared == "Element" {
            lookup
        } else {
            declared.to_string()
        };

        let mut next_path = next_path;
        let mut need_resource_type = false;
        if next_element == "Resource" {
            match value {
                Value::Array(_) => need_resource_type = true,
                Value::Object(map) => {
                    let rt = map
                        .get("resourceType")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            ModelError::schema(
                                &next_path,
                                "nested resource is missing resourceType",
                            )
                        })?;
                    if registry::element_type(&format!("{rt}.id")).is_none() {
                        return Err(ModelError::schema(
                            &next_path,
                            format!("unknown contained resource type {rt}"),
                        ));
                    }
                    next_path = format!("{next_path}({rt})");
                    next_element = rt.to_string();
                }
                _ => {
                    return Err(ModelError::schema(
                        &next_path,
                        "nested resource is neither object nor array",
                    ));
                }
            }
        }

        Ok(Position {
            element: next_element,
            path: next_path,
            need_resource_type,
        })
    }

    /// Descends into an array element. Resolves a pending resource type by
    /// peeking at the element's `resourceType`.
    pub fn into_array(&self, value: &Value) -> ModelResult<Position> {
        let mut next_path = format!("{}.[]", self.path);
        let mut next_element = self.element.clone();

        if self.need_resource_type {
            let rt = value
                .as_object()
                .and_then(|map| map.get("resourceType"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ModelError::schema(&next_path, "array resource is missing resourceType")
                })?;
            if registry::element_type(&format!("{rt}.id")).is_none() {
                return Err(ModelError::schema(
                    &next_path,
                    format!("unknown resource type in array: {rt}"),
                ));
            }
            next_path = format!("{next_path}({rt})");
            next_element = rt.to_string();
        }

        Ok(Position {
            element: next_element,
            path: next_path,
            need_resource_type: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descends_through_backbone_elements() {
        let root = Position::root("Patient");
        let contact = root.down_to("contact", &json!([])).unwrap();
        assert_eq!(contact.element(), "Patient.contact");
        let name = contact.down_to("name", &json!({})).unwrap();
        assert_eq!(name.element(), "HumanName");
        let family = name.down_to("family", &json!("Smith")).unwrap();
        assert_eq!(family.element(), "string");
    }

    #[test]
    fn classifies_special_leaves() {
        let root = Position::root("Condition");
        assert!(root.down_to("onsetDateTime", &json!("2012")).unwrap().at_date());
        let subject = root.down_to("subject", &json!({})).unwrap();
        assert!(subject.at_reference());
        let quantity = Position::root("Observation")
            .down_to("valueQuantity", &json!({}))
            .unwrap();
        assert!(quantity.down_to("value", &json!(1.5)).unwrap().at_decimal());
    }

    #[test]
    fn resolves_inline_resource_types() {
        let root = Position::root("Bundle");
        let entry = root.down_to("entry", &json!([])).unwrap();
        let entry_elem = entry.into_array(&json!({})).unwrap();
        let resource = entry_elem
            .down_to("resource", &json!({"resourceType": "Patient"}))
            .unwrap();
        assert_eq!(resource.element(), "Patient");
    }

    #[test]
    fn unknown_element_is_schema_error() {
        let root = Position::root("Patient");
        let err = root.down_to("frobnicate", &json!(1)).unwrap_err();
        assert!(matches!(err, ModelError::Schema { .. }));
    }

    #[test]
    fn underscore_key_switches_to_synthetic_subtree() {
        let root = Position::root("Patient");
        let sibling = root.down_to("_birthDate", &json!({})).unwrap();
        assert_eq!(sibling.element(), "_");
        let ext = sibling.down_to("extension", &json!([])).unwrap();
        assert!(ext.at_extension());
    }
}
