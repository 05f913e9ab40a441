//! Static FHIR type registry.
//!
//! A process-wide read-only mapping from a dotted element path (for example
//! `Patient.name.given`) to its FHIR type name (`string`, `date`,
//! `Reference`, `BackboneElement`, ...). The table is embedded at build time
//! from the STU3 definitions; the walker consults it once per JSON field
//! descent. A path with no entry is a structural error in the document.

mod table;

use table::FHIR_TYPES;

/// Synthetic entries supporting primitive-element siblings (keys starting
/// with `_`) which are not part of the published definitions.
static SYNTHETIC_TYPES: &[(&str, &str)] = &[
    ("_.extension", "Extension"),
    ("_.id", "string"),
    ("_.modifierExtension", "Extension"),
];

/// Looks up the declared type for a dotted element path.
pub fn element_type(path: &str) -> Option<&'static str> {
    if let Ok(idx) = FHIR_TYPES.binary_search_by(|(p, _)| (*p).cmp(path)) {
        return Some(FHIR_TYPES[idx].1);
    }
    SYNTHETIC_TYPES
        .binary_search_by(|(p, _)| (*p).cmp(path))
        .ok()
        .map(|idx| SYNTHETIC_TYPES[idx].1)
}

/// Returns true if `name` is a resource type known to the registry.
///
/// Anything with an `id` element at the top level is a resource; data types
/// are only reachable through resource elements.
pub fn is_resource_type(name: &str) -> bool {
    // data types also carry ".id" entries, so gate on the known resource list
    RESOURCE_TYPES.binary_search(&name).is_ok()
}

/// Every resource type the server stores. Collections are pre-created for
/// each of these at startup so transactions never create collections.
pub static RESOURCE_TYPES: &[&str] = &[
    "AuditEvent",
    "Bundle",
    "Condition",
    "Device",
    "Encounter",
    "ImagingStudy",
    "Immunization",
    "MessageHeader",
    "Observation",
    "OperationOutcome",
    "Organization",
    "Patient",
    "Practitioner",
    "Provenance",
    "Subscription",
];

/// True when `name` is a valid STU3 resource type and may therefore appear
/// as the type segment of a reference. Broader than [`RESOURCE_TYPES`]:
/// references to types this server does not store are still structurally
/// valid.
pub fn is_reference_target(name: &str) -> bool {
    ALL_STU3_RESOURCE_NAMES.binary_search(&name).is_ok()
}

/// The complete STU3 resource-name list, used to validate reference types.
static ALL_STU3_RESOURCE_NAMES: &[&str] = &[
    "Account", "ActivityDefinition", "AdverseEvent", "AllergyIntolerance",
    "Appointment", "AppointmentResponse", "AuditEvent", "Basic", "Binary",
    "BodySite", "Bundle", "CapabilityStatement", "CarePlan", "CareTeam",
    "ChargeItem", "Claim", "ClaimResponse", "ClinicalImpression", "CodeSystem",
    "Communication", "CommunicationRequest", "CompartmentDefinition",
    "Composition", "ConceptMap", "Condition", "Consent", "Contract",
    "Coverage", "DataElement", "DetectedIssue", "Device", "DeviceComponent",
    "DeviceMetric", "DeviceRequest", "DeviceUseStatement", "DiagnosticReport",
    "DocumentManifest", "DocumentReference", "EligibilityRequest",
    "EligibilityResponse", "Encounter", "Endpoint", "EnrollmentRequest",
    "EnrollmentResponse", "EpisodeOfCare", "ExpansionProfile",
    "ExplanationOfBenefit", "FamilyMemberHistory", "Flag", "Goal",
    "GraphDefinition", "Group", "GuidanceResponse", "HealthcareService",
    "ImagingManifest", "ImagingStudy", "Immunization",
    "ImmunizationRecommendation", "ImplementationGuide", "Library", "Linkage",
    "List", "Location", "Measure", "MeasureReport", "Media", "Medication",
    "MedicationAdministration", "MedicationDispense", "MedicationRequest",
    "MedicationStatement", "MessageDefinition", "MessageHeader",
    "NamingSystem", "NutritionOrder", "Observation", "OperationDefinition",
    "OperationOutcome", "Organization", "Parameters", "Patient",
    "PaymentNotice", "PaymentReconciliation", "Person", "PlanDefinition",
    "Practitioner", "PractitionerRole", "Procedure", "ProcedureRequest",
    "ProcessRequest", "ProcessResponse", "Provenance", "Questionnaire",
    "QuestionnaireResponse", "ReferralRequest", "RelatedPerson",
    "RequestGroup", "ResearchStudy", "ResearchSubject", "RiskAssessment",
    "Schedule", "SearchParameter", "Sequence", "ServiceDefinition", "Slot",
    "Specimen", "StructureDefinition", "StructureMap", "Subscription",
    "Substance", "SupplyDelivery", "SupplyRequest", "Task", "TestReport",
    "TestScript", "ValueSet", "VisionPrescription",
];

/// Collection name for a resource type's current versions: the pluralised,
/// lower-cased type name (`Patient` -> `patients`, `ImagingStudy` ->
/// `imagingstudies`).
pub fn collection_name(resource_type: &str) -> String {
    let lower = resource_type.to_lowercase();
    if let Some(stem) = lower.strip_suffix('y') {
        format!("{stem}ies")
    } else if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") || lower.ends_with('x') || lower.ends_with('z') {
        format!("{lower}es")
    } else {
        format!("{lower}s")
    }
}

/// Collection name for a resource type's previous versions.
pub fn previous_collection_name(resource_type: &str) -> String {
    format!("{}_prev", collection_name(resource_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_paths_resolve() {
        assert_eq!(element_type("Patient.name"), Some("HumanName"));
        assert_eq!(element_type("HumanName.given"), Some("string"));
        assert_eq!(element_type("Patient.birthDate"), Some("date"));
        assert_eq!(element_type("Observation.valueQuantity"), Some("Quantity"));
        assert_eq!(element_type("Quantity.value"), Some("decimal"));
        assert_eq!(element_type("Meta.lastUpdated"), Some("instant"));
        assert_eq!(element_type("Bundle.entry.resource"), Some("Resource"));
        assert_eq!(element_type("Patient.contact"), Some("BackboneElement"));
    }

    #[test]
    fn synthetic_underscore_subtree() {
        assert_eq!(element_type("_.id"), Some("string"));
        assert_eq!(element_type("_.extension"), Some("Extension"));
    }

    #[test]
    fn unknown_path_is_none() {
        assert_eq!(element_type("Patient.bogus"), None);
        assert_eq!(element_type("NotAType.id"), None);
    }

    #[test]
    fn collection_names_pluralise() {
        assert_eq!(collection_name("Patient"), "patients");
        assert_eq!(collection_name("ImagingStudy"), "imagingstudies");
        assert_eq!(collection_name("AuditEvent"), "auditevents");
        assert_eq!(previous_collection_name("Patient"), "patients_prev");
    }

    #[test]
    fn reference_targets_cover_all_of_stu3() {
        assert!(is_reference_target("Location"));
        assert!(is_reference_target("RelatedPerson"));
        assert!(!is_reference_target("NotAResource"));
        let mut sorted = ALL_STU3_RESOURCE_NAMES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, ALL_STU3_RESOURCE_NAMES);
    }

    #[test]
    fn resource_type_listing() {
        assert!(is_resource_type("Patient"));
        assert!(is_resource_type("Bundle"));
        assert!(!is_resource_type("HumanName"));
        // table must be sorted for the binary search
        let mut sorted = RESOURCE_TYPES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESOURCE_TYPES);
    }
}
