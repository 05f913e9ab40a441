//! Search parameter registry.
//!
//! A static table mapping `(resource, parameter)` to the parameter's kind,
//! its document paths and, for references, its target types. Paths use a
//! `[]` prefix on segments that are arrays in the stored form; the compiler
//! folds those into `$elemMatch` anchors. Bundle parameters addressing the
//! first entry of a message bundle carry an inline prefix instead of a
//! lookup join.

/// The FHIR search parameter types supported by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Token,
    String,
    Number,
    Date,
    Reference,
    Quantity,
    Uri,
}

/// Datatype of one searched document path; drives the concrete translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    /// `system`/`code` pair inside a CodeableConcept's coding array.
    CodeableConcept,
    /// A bare Coding (`system`/`code`).
    Coding,
    /// `system`/`value` pair.
    Identifier,
    /// ContactPoint; token matches its `value`.
    ContactPoint,
    /// Plain `code`, `id` or `string` leaf matched as a token.
    Code,
    Boolean,
    /// Plain string leaf.
    String,
    HumanName,
    Address,
    /// Integer-valued leaf with half-ulp ranges.
    Number,
    /// A date/dateTime stored as `{__from, __to, __strDate}`.
    Date,
    /// A Period with `start`/`end` date sub-documents.
    Period,
    /// A native timestamp.
    Instant,
    Reference,
    Quantity,
    Uri,
}

/// One document path searched by a parameter.
#[derive(Debug, Clone, Copy)]
pub struct SearchPath {
    pub path: &'static str,
    pub datatype: PathType,
}

const fn path(path: &'static str, datatype: PathType) -> SearchPath {
    SearchPath { path, datatype }
}

/// A registered search parameter.
#[derive(Debug, Clone, Copy)]
pub struct SearchParamInfo {
    pub resource: &'static str,
    pub name: &'static str,
    pub kind: ParamKind,
    pub paths: &'static [SearchPath],
    /// Reference target types, when `kind` is `Reference`.
    pub targets: &'static [&'static str],
    /// For Bundle message-style parameters: the stored path of the first
    /// entry's resource, matched inline instead of via a join.
    pub inline_prefix: Option<&'static str>,
}

const fn param(
    resource: &'static str,
    name: &'static str,
    kind: ParamKind,
    paths: &'static [SearchPath],
) -> SearchParamInfo {
    SearchParamInfo {
        resource,
        name,
        kind,
        paths,
        targets: &[],
        inline_prefix: None,
    }
}

const fn reference(
    resource: &'static str,
    name: &'static str,
    paths: &'static [SearchPath],
    targets: &'static [&'static str],
) -> SearchParamInfo {
    SearchParamInfo {
        resource,
        name,
        kind: ParamKind::Reference,
        paths,
        targets,
        inline_prefix: None,
    }
}

use ParamKind as K;
use PathType as T;

/// Sorted by `(resource, name)` for binary search.
static PARAMS: &[SearchParamInfo] = &[
    reference("AuditEvent", "agent", &[path("[]agent.reference", T::Reference)], &["Practitioner", "Organization", "Device", "Patient"]),
    param("AuditEvent", "date", K::Date, &[path("recorded", T::Instant)]),
    reference("AuditEvent", "entity", &[path("[]entity.reference", T::Reference)], &["Patient", "Practitioner", "Device"]),
    param("AuditEvent", "outcome", K::Token, &[path("outcome", T::Code)]),
    reference("AuditEvent", "patient", &[path("[]agent.reference", T::Reference), path("[]entity.reference", T::Reference)], &["Patient"]),
    param("AuditEvent", "type", K::Token, &[path("type", T::Coding)]),
    param("AuditEvent", "user", K::Token, &[path("[]agent.userId", T::Identifier)]),
    param("Bundle", "identifier", K::Token, &[path("identifier", T::Identifier)]),
    SearchParamInfo {
        resource: "Bundle",
        name: "message",
        kind: ParamKind::Reference,
        paths: &[],
        targets: &["MessageHeader"],
        inline_prefix: Some("entry.0.resource"),
    },
    param("Bundle", "type", K::Token, &[path("type", T::Code)]),
    reference("Condition", "asserter", &[path("asserter", T::Reference)], &["Practitioner", "Patient"]),
    param("Condition", "category", K::Token, &[path("[]category.[]coding", T::CodeableConcept)]),
    param("Condition", "clinical-status", K::Token, &[path("clinicalStatus", T::Code)]),
    param("Condition", "code", K::Token, &[path("code.[]coding", T::CodeableConcept)]),
    reference("Condition", "context", &[path("context", T::Reference)], &["Encounter"]),
    reference("Condition", "encounter", &[path("context", T::Reference)], &["Encounter"]),
    param("Condition", "evidence", K::Token, &[path("[]evidence.[]code.[]coding", T::CodeableConcept)]),
    param("Condition", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    param("Condition", "onset-date", K::Date, &[path("onsetDateTime", T::Date), path("onsetPeriod", T::Period)]),
    reference("Condition", "patient", &[path("subject", T::Reference)], &["Patient"]),
    param("Condition", "severity", K::Token, &[path("severity.[]coding", T::CodeableConcept)]),
    reference("Condition", "subject", &[path("subject", T::Reference)], &["Patient"]),
    param("Device", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    param("Device", "manufacturer", K::String, &[path("manufacturer", T::String)]),
    param("Device", "model", K::String, &[path("model", T::String)]),
    reference("Device", "patient", &[path("patient", T::Reference)], &["Patient"]),
    param("Device", "status", K::Token, &[path("status", T::Code)]),
    param("Device", "type", K::Token, &[path("type.[]coding", T::CodeableConcept)]),
    param("Device", "udi-di", K::String, &[path("udi.deviceIdentifier", T::String)]),
    param("Device", "url", K::Uri, &[path("url", T::Uri)]),
    param("Encounter", "class", K::Token, &[path("class", T::Coding)]),
    param("Encounter", "date", K::Date, &[path("period", T::Period)]),
    reference("Encounter", "diagnosis", &[path("[]diagnosis.condition", T::Reference)], &["Condition"]),
    param("Encounter", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    reference("Encounter", "location", &[path("[]location.location", T::Reference)], &["Location"]),
    reference("Encounter", "participant", &[path("[]participant.individual", T::Reference)], &["Practitioner"]),
    reference("Encounter", "patient", &[path("subject", T::Reference)], &["Patient"]),
    reference("Encounter", "practitioner", &[path("[]participant.individual", T::Reference)], &["Practitioner"]),
    param("Encounter", "status", K::Token, &[path("status", T::Code)]),
    reference("Encounter", "subject", &[path("subject", T::Reference)], &["Patient"]),
    param("Encounter", "type", K::Token, &[path("[]type.[]coding", T::CodeableConcept)]),
    param("ImagingStudy", "accession", K::Token, &[path("accession", T::Identifier)]),
    reference("ImagingStudy", "basedon", &[path("[]basedOn", T::Reference)], &["Patient"]),
    param("ImagingStudy", "bodysite", K::Token, &[path("[]series.bodySite", T::Coding)]),
    reference("ImagingStudy", "context", &[path("context", T::Reference)], &["Encounter"]),
    param("ImagingStudy", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    param("ImagingStudy", "modality", K::Token, &[path("[]series.modality", T::Coding)]),
    reference("ImagingStudy", "patient", &[path("patient", T::Reference)], &["Patient"]),
    param("ImagingStudy", "started", K::Date, &[path("started", T::Date)]),
    param("ImagingStudy", "study", K::Uri, &[path("uid", T::Uri)]),
    param("Immunization", "date", K::Date, &[path("date", T::Date)]),
    param("Immunization", "dose-sequence", K::Number, &[path("[]vaccinationProtocol.doseSequence", T::Number)]),
    param("Immunization", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    param("Immunization", "lot-number", K::String, &[path("lotNumber", T::String)]),
    reference("Immunization", "manufacturer", &[path("manufacturer", T::Reference)], &["Organization"]),
    param("Immunization", "notgiven", K::Token, &[path("notGiven", T::Boolean)]),
    reference("Immunization", "patient", &[path("patient", T::Reference)], &["Patient"]),
    reference("Immunization", "practitioner", &[path("[]practitioner.actor", T::Reference)], &["Practitioner"]),
    param("Immunization", "status", K::Token, &[path("status", T::Code)]),
    param("Immunization", "vaccine-code", K::Token, &[path("vaccineCode.[]coding", T::CodeableConcept)]),
    reference("MessageHeader", "author", &[path("author", T::Reference)], &["Practitioner"]),
    param("MessageHeader", "destination-uri", K::Uri, &[path("[]destination.endpoint", T::Uri)]),
    param("MessageHeader", "event", K::Token, &[path("event", T::Coding)]),
    reference("MessageHeader", "sender", &[path("sender", T::Reference)], &["Practitioner", "Organization"]),
    param("MessageHeader", "source-uri", K::Uri, &[path("source.endpoint", T::Uri)]),
    param("MessageHeader", "timestamp", K::Date, &[path("timestamp", T::Instant)]),
    param("Observation", "category", K::Token, &[path("[]category.[]coding", T::CodeableConcept)]),
    param("Observation", "code", K::Token, &[path("code.[]coding", T::CodeableConcept)]),
    reference("Observation", "context", &[path("context", T::Reference)], &["Encounter"]),
    param("Observation", "date", K::Date, &[path("effectiveDateTime", T::Date), path("effectivePeriod", T::Period)]),
    reference("Observation", "device", &[path("device", T::Reference)], &["Device"]),
    reference("Observation", "encounter", &[path("context", T::Reference)], &["Encounter"]),
    param("Observation", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    reference("Observation", "patient", &[path("subject", T::Reference)], &["Patient"]),
    reference("Observation", "performer", &[path("[]performer", T::Reference)], &["Practitioner", "Organization", "Patient"]),
    param("Observation", "status", K::Token, &[path("status", T::Code)]),
    reference("Observation", "subject", &[path("subject", T::Reference)], &["Patient", "Device"]),
    param("Observation", "value-quantity", K::Quantity, &[path("valueQuantity", T::Quantity)]),
    param("Organization", "active", K::Token, &[path("active", T::Boolean)]),
    param("Organization", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    param("Organization", "name", K::String, &[path("name", T::String)]),
    param("Patient", "active", K::Token, &[path("active", T::Boolean)]),
    param("Patient", "address", K::String, &[path("[]address", T::Address)]),
    param("Patient", "address-city", K::String, &[path("[]address.city", T::String)]),
    param("Patient", "address-country", K::String, &[path("[]address.country", T::String)]),
    param("Patient", "address-postalcode", K::String, &[path("[]address.postalCode", T::String)]),
    param("Patient", "address-state", K::String, &[path("[]address.state", T::String)]),
    param("Patient", "birthdate", K::Date, &[path("birthDate", T::Date)]),
    param("Patient", "family", K::String, &[path("[]name.family", T::String)]),
    param("Patient", "gender", K::Token, &[path("gender", T::Code)]),
    reference("Patient", "general-practitioner", &[path("[]generalPractitioner", T::Reference)], &["Practitioner", "Organization"]),
    param("Patient", "given", K::String, &[path("[]name.[]given", T::String)]),
    param("Patient", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    param("Patient", "name", K::String, &[path("[]name", T::HumanName)]),
    reference("Patient", "organization", &[path("managingOrganization", T::Reference)], &["Organization"]),
    param("Patient", "telecom", K::Token, &[path("[]telecom", T::ContactPoint)]),
    param("Practitioner", "active", K::Token, &[path("active", T::Boolean)]),
    param("Practitioner", "address", K::String, &[path("[]address", T::Address)]),
    param("Practitioner", "family", K::String, &[path("[]name.family", T::String)]),
    param("Practitioner", "gender", K::Token, &[path("gender", T::Code)]),
    param("Practitioner", "given", K::String, &[path("[]name.[]given", T::String)]),
    param("Practitioner", "identifier", K::Token, &[path("[]identifier", T::Identifier)]),
    param("Practitioner", "name", K::String, &[path("[]name", T::HumanName)]),
    reference("Provenance", "agent", &[path("[]agent.whoReference", T::Reference)], &["Practitioner", "Patient", "Device", "Organization"]),
    reference("Provenance", "patient", &[path("[]target", T::Reference)], &["Patient"]),
    param("Provenance", "recorded", K::Date, &[path("recorded", T::Instant)]),
    reference("Provenance", "target", &[path("[]target", T::Reference)], &["Patient", "Observation", "Condition", "Encounter"]),
    param("Subscription", "criteria", K::String, &[path("criteria", T::String)]),
    param("Subscription", "payload", K::String, &[path("channel.payload", T::String)]),
    param("Subscription", "status", K::Token, &[path("status", T::Code)]),
    param("Subscription", "type", K::Token, &[path("channel.type", T::Code)]),
    param("Subscription", "url", K::Uri, &[path("channel.endpoint", T::Uri)]),
];

/// Looks up a parameter for a resource type.
pub fn param_info(resource: &str, name: &str) -> Option<&'static SearchParamInfo> {
    PARAMS
        .binary_search_by(|p| (p.resource, p.name).cmp(&(resource, name)))
        .ok()
        .map(|idx| &PARAMS[idx])
}

/// All reference parameters declared on a resource type (for `_include=*`).
pub fn reference_params(resource: &str) -> Vec<&'static SearchParamInfo> {
    PARAMS
        .iter()
        .filter(|p| p.resource == resource && p.kind == ParamKind::Reference && p.inline_prefix.is_none())
        .collect()
}

/// All reference parameters anywhere that can target `target_type` (for
/// `_revinclude=*`).
pub fn params_targeting(target_type: &str) -> Vec<&'static SearchParamInfo> {
    PARAMS
        .iter()
        .filter(|p| {
            p.kind == ParamKind::Reference
                && p.inline_prefix.is_none()
                && p.targets.contains(&target_type)
        })
        .collect()
}

/// Strips the `[]` array markers off a registry path, yielding the plain
/// dotted document path.
pub fn strip_markers(path: &str) -> String {
    path.split('.')
        .map(|segment| segment.strip_prefix("[]").unwrap_or(segment))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        let mut prev: Option<(&str, &str)> = None;
        for p in PARAMS {
            let key = (p.resource, p.name);
            if let Some(prev) = prev {
                assert!(prev < key, "params table out of order at {key:?}");
            }
            prev = Some(key);
        }
    }

    #[test]
    fn lookups_resolve() {
        let info = param_info("Condition", "patient").unwrap();
        assert_eq!(info.kind, ParamKind::Reference);
        assert_eq!(info.targets, &["Patient"]);
        assert_eq!(info.paths[0].path, "subject");

        assert!(param_info("Condition", "abatement").is_none());
        assert!(param_info("NoSuchResource", "code").is_none());
    }

    #[test]
    fn bundle_message_is_inline() {
        let info = param_info("Bundle", "message").unwrap();
        assert_eq!(info.inline_prefix, Some("entry.0.resource"));
        assert_eq!(info.targets, &["MessageHeader"]);
    }

    #[test]
    fn reverse_target_scan_finds_referrers() {
        let targeting_patient = params_targeting("Patient");
        assert!(targeting_patient
            .iter()
            .any(|p| p.resource == "Condition" && p.name == "subject"));
        assert!(targeting_patient
            .iter()
            .any(|p| p.resource == "AuditEvent" && p.name == "patient"));
    }

    #[test]
    fn marker_stripping() {
        assert_eq!(strip_markers("[]agent.reference"), "agent.reference");
        assert_eq!(strip_markers("code.[]coding"), "code.coding");
        assert_eq!(strip_markers("subject"), "subject");
    }
}
