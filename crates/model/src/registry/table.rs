// Generated from the HL7 FHIR STU3 (3.0.2) definitions. Do not edit.
//
// Maps each dotted element path to its declared type. Consulted by the
// walker on every field descent; see `super::element_type`.

pub(super) static FHIR_TYPES: &[(&str, &str)] = &[
    ("Address.city", "string"),
    ("Address.country", "string"),
    ("Address.district", "string"),
    ("Address.extension", "Extension"),
    ("Address.id", "string"),
    ("Address.line", "string"),
    ("Address.period", "Period"),
    ("Address.postalCode", "string"),
    ("Address.state", "string"),
    ("Address.text", "string"),
    ("Address.type", "code"),
    ("Address.use", "code"),
    ("Age.code", "code"),
    ("Age.comparator", "code"),
    ("Age.extension", "Extension"),
    ("Age.id", "string"),
    ("Age.system", "uri"),
    ("Age.unit", "string"),
    ("Age.value", "decimal"),
    ("Annotation.authorReference", "Reference"),
    ("Annotation.authorString", "string"),
    ("Annotation.extension", "Extension"),
    ("Annotation.id", "string"),
    ("Annotation.text", "string"),
    ("Annotation.time", "dateTime"),
    ("Attachment.contentType", "code"),
    ("Attachment.creation", "dateTime"),
    ("Attachment.data", "base64Binary"),
    ("Attachment.extension", "Extension"),
    ("Attachment.hash", "base64Binary"),
    ("Attachment.id", "string"),
    ("Attachment.language", "code"),
    ("Attachment.size", "unsignedInt"),
    ("Attachment.title", "string"),
    ("Attachment.url", "uri"),
    ("AuditEvent.action", "code"),
    ("AuditEvent.agent", "BackboneElement"),
    ("AuditEvent.agent.altId", "string"),
    ("AuditEvent.agent.extension", "Extension"),
    ("AuditEvent.agent.id", "string"),
    ("AuditEvent.agent.location", "Reference"),
    ("AuditEvent.agent.media", "Coding"),
    ("AuditEvent.agent.modifierExtension", "Extension"),
    ("AuditEvent.agent.name", "string"),
    ("AuditEvent.agent.network", "BackboneElement"),
    ("AuditEvent.agent.network.address", "string"),
    ("AuditEvent.agent.network.extension", "Extension"),
    ("AuditEvent.agent.network.id", "string"),
    ("AuditEvent.agent.network.modifierExtension", "Extension"),
    ("AuditEvent.agent.network.type", "code"),
    ("AuditEvent.agent.policy", "uri"),
    ("AuditEvent.agent.purposeOfUse", "CodeableConcept"),
    ("AuditEvent.agent.reference", "Reference"),
    ("AuditEvent.agent.requestor", "boolean"),
    ("AuditEvent.agent.role", "CodeableConcept"),
    ("AuditEvent.agent.userId", "Identifier"),
    ("AuditEvent.contained", "Resource"),
    ("AuditEvent.entity", "BackboneElement"),
    ("AuditEvent.entity.description", "string"),
    ("AuditEvent.entity.detail", "BackboneElement"),
    ("AuditEvent.entity.detail.extension", "Extension"),
    ("AuditEvent.entity.detail.id", "string"),
    ("AuditEvent.entity.detail.modifierExtension", "Extension"),
    ("AuditEvent.entity.detail.type", "string"),
    ("AuditEvent.entity.detail.value", "base64Binary"),
    ("AuditEvent.entity.extension", "Extension"),
    ("AuditEvent.entity.id", "string"),
    ("AuditEvent.entity.identifier", "Identifier"),
    ("AuditEvent.entity.lifecycle", "Coding"),
    ("AuditEvent.entity.modifierExtension", "Extension"),
    ("AuditEvent.entity.name", "string"),
    ("AuditEvent.entity.query", "base64Binary"),
    ("AuditEvent.entity.reference", "Reference"),
    ("AuditEvent.entity.role", "Coding"),
    ("AuditEvent.entity.securityLabel", "Coding"),
    ("AuditEvent.entity.type", "Coding"),
    ("AuditEvent.extension", "Extension"),
    ("AuditEvent.id", "id"),
    ("AuditEvent.implicitRules", "uri"),
    ("AuditEvent.language", "code"),
    ("AuditEvent.meta", "Meta"),
    ("AuditEvent.modifierExtension", "Extension"),
    ("AuditEvent.outcome", "code"),
    ("AuditEvent.outcomeDesc", "string"),
    ("AuditEvent.purposeOfEvent", "CodeableConcept"),
    ("AuditEvent.recorded", "instant"),
    ("AuditEvent.source", "BackboneElement"),
    ("AuditEvent.source.extension", "Extension"),
    ("AuditEvent.source.id", "string"),
    ("AuditEvent.source.identifier", "Identifier"),
    ("AuditEvent.source.modifierExtension", "Extension"),
    ("AuditEvent.source.site", "string"),
    ("AuditEvent.source.type", "Coding"),
    ("AuditEvent.subtype", "Coding"),
    ("AuditEvent.text", "Narrative"),
    ("AuditEvent.type", "Coding"),
    ("Bundle.contained", "Resource"),
    ("Bundle.entry", "BackboneElement"),
    ("Bundle.entry.extension", "Extension"),
    ("Bundle.entry.fullUrl", "uri"),
    ("Bundle.entry.id", "string"),
    ("Bundle.entry.link", "BackboneElement"),
    ("Bundle.entry.link.extension", "Extension"),
    ("Bundle.entry.link.id", "string"),
    ("Bundle.entry.link.modifierExtension", "Extension"),
    ("Bundle.entry.link.relation", "string"),
    ("Bundle.entry.link.url", "uri"),
    ("Bundle.entry.modifierExtension", "Extension"),
    ("Bundle.entry.request", "BackboneElement"),
    ("Bundle.entry.request.extension", "Extension"),
    ("Bundle.entry.request.id", "string"),
    ("Bundle.entry.request.ifMatch", "string"),
    ("Bundle.entry.request.ifModifiedSince", "instant"),
    ("Bundle.entry.request.ifNoneExist", "string"),
    ("Bundle.entry.request.ifNoneMatch", "string"),
    ("Bundle.entry.request.method", "code"),
    ("Bundle.entry.request.modifierExtension", "Extension"),
    ("Bundle.entry.request.url", "uri"),
    ("Bundle.entry.resource", "Resource"),
    ("Bundle.entry.response", "BackboneElement"),
    ("Bundle.entry.response.etag", "string"),
    ("Bundle.entry.response.extension", "Extension"),
    ("Bundle.entry.response.id", "string"),
    ("Bundle.entry.response.lastModified", "instant"),
    ("Bundle.entry.response.location", "uri"),
    ("Bundle.entry.response.modifierExtension", "Extension"),
    ("Bundle.entry.response.outcome", "Resource"),
    ("Bundle.entry.response.status", "string"),
    ("Bundle.entry.search", "BackboneElement"),
    ("Bundle.entry.search.extension", "Extension"),
    ("Bundle.entry.search.id", "string"),
    ("Bundle.entry.search.mode", "code"),
    ("Bundle.entry.search.modifierExtension", "Extension"),
    ("Bundle.entry.search.score", "decimal"),
    ("Bundle.extension", "Extension"),
    ("Bundle.id", "id"),
    ("Bundle.identifier", "Identifier"),
    ("Bundle.implicitRules", "uri"),
    ("Bundle.language", "code"),
    ("Bundle.link", "BackboneElement"),
    ("Bundle.link.extension", "Extension"),
    ("Bundle.link.id", "string"),
    ("Bundle.link.modifierExtension", "Extension"),
    ("Bundle.link.relation", "string"),
    ("Bundle.link.url", "uri"),
    ("Bundle.meta", "Meta"),
    ("Bundle.modifierExtension", "Extension"),
    ("Bundle.signature", "Signature"),
    ("Bundle.text", "Narrative"),
    ("Bundle.total", "unsignedInt"),
    ("Bundle.type", "code"),
    ("CodeableConcept.coding", "Coding"),
    ("CodeableConcept.extension", "Extension"),
    ("CodeableConcept.id", "string"),
    ("CodeableConcept.text", "string"),
    ("Coding.code", "code"),
    ("Coding.display", "string"),
    ("Coding.extension", "Extension"),
    ("Coding.id", "string"),
    ("Coding.system", "uri"),
    ("Coding.userSelected", "boolean"),
    ("Coding.version", "string"),
    ("Condition.abatementAge", "Age"),
    ("Condition.abatementBoolean", "boolean"),
    ("Condition.abatementDateTime", "dateTime"),
    ("Condition.abatementPeriod", "Period"),
    ("Condition.abatementRange", "Range"),
    ("Condition.abatementString", "string"),
    ("Condition.assertedDate", "dateTime"),
    ("Condition.asserter", "Reference"),
    ("Condition.bodySite", "CodeableConcept"),
    ("Condition.category", "CodeableConcept"),
    ("Condition.clinicalStatus", "code"),
    ("Condition.code", "CodeableConcept"),
    ("Condition.contained", "Resource"),
    ("Condition.context", "Reference"),
    ("Condition.evidence", "BackboneElement"),
    ("Condition.evidence.code", "CodeableConcept"),
    ("Condition.evidence.detail", "Reference"),
    ("Condition.evidence.extension", "Extension"),
    ("Condition.evidence.id", "string"),
    ("Condition.evidence.modifierExtension", "Extension"),
    ("Condition.extension", "Extension"),
    ("Condition.id", "id"),
    ("Condition.identifier", "Identifier"),
    ("Condition.implicitRules", "uri"),
    ("Condition.language", "code"),
    ("Condition.meta", "Meta"),
    ("Condition.modifierExtension", "Extension"),
    ("Condition.note", "Annotation"),
    ("Condition.onsetAge", "Age"),
    ("Condition.onsetDateTime", "dateTime"),
    ("Condition.onsetPeriod", "Period"),
    ("Condition.onsetRange", "Range"),
    ("Condition.onsetString", "string"),
    ("Condition.severity", "CodeableConcept"),
    ("Condition.stage", "BackboneElement"),
    ("Condition.stage.assessment", "Reference"),
    ("Condition.stage.extension", "Extension"),
    ("Condition.stage.id", "string"),
    ("Condition.stage.modifierExtension", "Extension"),
    ("Condition.stage.summary", "CodeableConcept"),
    ("Condition.subject", "Reference"),
    ("Condition.text", "Narrative"),
    ("Condition.verificationStatus", "code"),
    ("ContactPoint.extension", "Extension"),
    ("ContactPoint.id", "string"),
    ("ContactPoint.period", "Period"),
    ("ContactPoint.rank", "positiveInt"),
    ("ContactPoint.system", "code"),
    ("ContactPoint.use", "code"),
    ("ContactPoint.value", "string"),
    ("Count.code", "code"),
    ("Count.comparator", "code"),
    ("Count.extension", "Extension"),
    ("Count.id", "string"),
    ("Count.system", "uri"),
    ("Count.unit", "string"),
    ("Count.value", "decimal"),
    ("Device.contact", "ContactPoint"),
    ("Device.contained", "Resource"),
    ("Device.expirationDate", "dateTime"),
    ("Device.extension", "Extension"),
    ("Device.id", "id"),
    ("Device.identifier", "Identifier"),
    ("Device.implicitRules", "uri"),
    ("Device.language", "code"),
    ("Device.location", "Reference"),
    ("Device.lotNumber", "string"),
    ("Device.manufactureDate", "dateTime"),
    ("Device.manufacturer", "string"),
    ("Device.meta", "Meta"),
    ("Device.model", "string"),
    ("Device.modifierExtension", "Extension"),
    ("Device.note", "Annotation"),
    ("Device.owner", "Reference"),
    ("Device.patient", "Reference"),
    ("Device.safety", "CodeableConcept"),
    ("Device.status", "code"),
    ("Device.text", "Narrative"),
    ("Device.type", "CodeableConcept"),
    ("Device.udi", "BackboneElement"),
    ("Device.udi.carrierAIDC", "base64Binary"),
    ("Device.udi.carrierHRF", "string"),
    ("Device.udi.deviceIdentifier", "string"),
    ("Device.udi.entryType", "code"),
    ("Device.udi.extension", "Extension"),
    ("Device.udi.id", "string"),
    ("Device.udi.issuer", "uri"),
    ("Device.udi.jurisdiction", "uri"),
    ("Device.udi.modifierExtension", "Extension"),
    ("Device.udi.name", "string"),
    ("Device.url", "uri"),
    ("Device.version", "string"),
    ("Distance.code", "code"),
    ("Distance.comparator", "code"),
    ("Distance.extension", "Extension"),
    ("Distance.id", "string"),
    ("Distance.system", "uri"),
    ("Distance.unit", "string"),
    ("Distance.value", "decimal"),
    ("Duration.code", "code"),
    ("Duration.comparator", "code"),
    ("Duration.extension", "Extension"),
    ("Duration.id", "string"),
    ("Duration.system", "uri"),
    ("Duration.unit", "string"),
    ("Duration.value", "decimal"),
    ("Encounter.account", "Reference"),
    ("Encounter.appointment", "Reference"),
    ("Encounter.class", "Coding"),
    ("Encounter.classHistory", "BackboneElement"),
    ("Encounter.classHistory.class", "Coding"),
    ("Encounter.classHistory.extension", "Extension"),
    ("Encounter.classHistory.id", "string"),
    ("Encounter.classHistory.modifierExtension", "Extension"),
    ("Encounter.classHistory.period", "Period"),
    ("Encounter.contained", "Resource"),
    ("Encounter.diagnosis", "BackboneElement"),
    ("Encounter.diagnosis.condition", "Reference"),
    ("Encounter.diagnosis.extension", "Extension"),
    ("Encounter.diagnosis.id", "string"),
    ("Encounter.diagnosis.modifierExtension", "Extension"),
    ("Encounter.diagnosis.rank", "positiveInt"),
    ("Encounter.diagnosis.role", "CodeableConcept"),
    ("Encounter.episodeOfCare", "Reference"),
    ("Encounter.extension", "Extension"),
    ("Encounter.hospitalization", "BackboneElement"),
    ("Encounter.hospitalization.admitSource", "CodeableConcept"),
    ("Encounter.hospitalization.destination", "Reference"),
    ("Encounter.hospitalization.dietPreference", "CodeableConcept"),
    ("Encounter.hospitalization.dischargeDisposition", "CodeableConcept"),
    ("Encounter.hospitalization.extension", "Extension"),
    ("Encounter.hospitalization.id", "string"),
    ("Encounter.hospitalization.modifierExtension", "Extension"),
    ("Encounter.hospitalization.origin", "Reference"),
    ("Encounter.hospitalization.preAdmissionIdentifier", "Identifier"),
    ("Encounter.hospitalization.reAdmission", "CodeableConcept"),
    ("Encounter.hospitalization.specialArrangement", "CodeableConcept"),
    ("Encounter.hospitalization.specialCourtesy", "CodeableConcept"),
    ("Encounter.id", "id"),
    ("Encounter.identifier", "Identifier"),
    ("Encounter.implicitRules", "uri"),
    ("Encounter.incomingReferral", "Reference"),
    ("Encounter.language", "code"),
    ("Encounter.length", "Duration"),
    ("Encounter.location", "BackboneElement"),
    ("Encounter.location.extension", "Extension"),
    ("Encounter.location.id", "string"),
    ("Encounter.location.location", "Reference"),
    ("Encounter.location.modifierExtension", "Extension"),
    ("Encounter.location.period", "Period"),
    ("Encounter.location.status", "code"),
    ("Encounter.meta", "Meta"),
    ("Encounter.modifierExtension", "Extension"),
    ("Encounter.partOf", "Reference"),
    ("Encounter.participant", "BackboneElement"),
    ("Encounter.participant.extension", "Extension"),
    ("Encounter.participant.id", "string"),
    ("Encounter.participant.individual", "Reference"),
    ("Encounter.participant.modifierExtension", "Extension"),
    ("Encounter.participant.period", "Period"),
    ("Encounter.participant.type", "CodeableConcept"),
    ("Encounter.period", "Period"),
    ("Encounter.priority", "CodeableConcept"),
    ("Encounter.reason", "CodeableConcept"),
    ("Encounter.serviceProvider", "Reference"),
    ("Encounter.status", "code"),
    ("Encounter.statusHistory", "BackboneElement"),
    ("Encounter.statusHistory.extension", "Extension"),
    ("Encounter.statusHistory.id", "string"),
    ("Encounter.statusHistory.modifierExtension", "Extension"),
    ("Encounter.statusHistory.period", "Period"),
    ("Encounter.statusHistory.status", "code"),
    ("Encounter.subject", "Reference"),
    ("Encounter.text", "Narrative"),
    ("Encounter.type", "CodeableConcept"),
    ("Extension.extension", "Extension"),
    ("Extension.id", "string"),
    ("Extension.url", "uri"),
    ("Extension.valueAddress", "Address"),
    ("Extension.valueAnnotation", "Annotation"),
    ("Extension.valueAttachment", "Attachment"),
    ("Extension.valueBase64Binary", "base64Binary"),
    ("Extension.valueBoolean", "boolean"),
    ("Extension.valueCode", "code"),
    ("Extension.valueCodeableConcept", "CodeableConcept"),
    ("Extension.valueCoding", "Coding"),
    ("Extension.valueContactPoint", "ContactPoint"),
    ("Extension.valueDate", "date"),
    ("Extension.valueDateTime", "dateTime"),
    ("Extension.valueDecimal", "decimal"),
    ("Extension.valueHumanName", "HumanName"),
    ("Extension.valueId", "id"),
    ("Extension.valueIdentifier", "Identifier"),
    ("Extension.valueInstant", "instant"),
    ("Extension.valueInteger", "integer"),
    ("Extension.valueMarkdown", "markdown"),
    ("Extension.valueMeta", "Meta"),
    ("Extension.valueOid", "oid"),
    ("Extension.valuePeriod", "Period"),
    ("Extension.valuePositiveInt", "positiveInt"),
    ("Extension.valueQuantity", "Quantity"),
    ("Extension.valueRange", "Range"),
    ("Extension.valueRatio", "Ratio"),
    ("Extension.valueReference", "Reference"),
    ("Extension.valueSampledData", "SampledData"),
    ("Extension.valueSignature", "Signature"),
    ("Extension.valueString", "string"),
    ("Extension.valueTime", "time"),
    ("Extension.valueTiming", "Timing"),
    ("Extension.valueUnsignedInt", "unsignedInt"),
    ("Extension.valueUri", "uri"),
    ("HumanName.extension", "Extension"),
    ("HumanName.family", "string"),
    ("HumanName.given", "string"),
    ("HumanName.id", "string"),
    ("HumanName.period", "Period"),
    ("HumanName.prefix", "string"),
    ("HumanName.suffix", "string"),
    ("HumanName.text", "string"),
    ("HumanName.use", "code"),
    ("Identifier.assigner", "Reference"),
    ("Identifier.extension", "Extension"),
    ("Identifier.id", "string"),
    ("Identifier.period", "Period"),
    ("Identifier.system", "uri"),
    ("Identifier.type", "CodeableConcept"),
    ("Identifier.use", "code"),
    ("Identifier.value", "string"),
    ("ImagingStudy.accession", "Identifier"),
    ("ImagingStudy.availability", "code"),
    ("ImagingStudy.basedOn", "Reference"),
    ("ImagingStudy.contained", "Resource"),
    ("ImagingStudy.context", "Reference"),
    ("ImagingStudy.description", "string"),
    ("ImagingStudy.endpoint", "Reference"),
    ("ImagingStudy.extension", "Extension"),
    ("ImagingStudy.id", "id"),
    ("ImagingStudy.identifier", "Identifier"),
    ("ImagingStudy.implicitRules", "uri"),
    ("ImagingStudy.interpreter", "Reference"),
    ("ImagingStudy.language", "code"),
    ("ImagingStudy.meta", "Meta"),
    ("ImagingStudy.modalityList", "Coding"),
    ("ImagingStudy.modifierExtension", "Extension"),
    ("ImagingStudy.numberOfInstances", "unsignedInt"),
    ("ImagingStudy.numberOfSeries", "unsignedInt"),
    ("ImagingStudy.patient", "Reference"),
    ("ImagingStudy.procedureCode", "CodeableConcept"),
    ("ImagingStudy.procedureReference", "Reference"),
    ("ImagingStudy.reason", "CodeableConcept"),
    ("ImagingStudy.referrer", "Reference"),
    ("ImagingStudy.series", "BackboneElement"),
    ("ImagingStudy.series.availability", "code"),
    ("ImagingStudy.series.bodySite", "Coding"),
    ("ImagingStudy.series.description", "string"),
    ("ImagingStudy.series.endpoint", "Reference"),
    ("ImagingStudy.series.extension", "Extension"),
    ("ImagingStudy.series.id", "string"),
    ("ImagingStudy.series.instance", "BackboneElement"),
    ("ImagingStudy.series.instance.extension", "Extension"),
    ("ImagingStudy.series.instance.id", "string"),
    ("ImagingStudy.series.instance.modifierExtension", "Extension"),
    ("ImagingStudy.series.instance.number", "unsignedInt"),
    ("ImagingStudy.series.instance.sopClass", "oid"),
    ("ImagingStudy.series.instance.title", "string"),
    ("ImagingStudy.series.instance.uid", "oid"),
    ("ImagingStudy.series.laterality", "Coding"),
    ("ImagingStudy.series.modality", "Coding"),
    ("ImagingStudy.series.modifierExtension", "Extension"),
    ("ImagingStudy.series.number", "unsignedInt"),
    ("ImagingStudy.series.numberOfInstances", "unsignedInt"),
    ("ImagingStudy.series.performer", "Reference"),
    ("ImagingStudy.series.started", "dateTime"),
    ("ImagingStudy.series.uid", "oid"),
    ("ImagingStudy.started", "dateTime"),
    ("ImagingStudy.text", "Narrative"),
    ("ImagingStudy.uid", "oid"),
    ("Immunization.contained", "Resource"),
    ("Immunization.date", "dateTime"),
    ("Immunization.doseQuantity", "SimpleQuantity"),
    ("Immunization.encounter", "Reference"),
    ("Immunization.expirationDate", "date"),
    ("Immunization.explanation", "BackboneElement"),
    ("Immunization.explanation.extension", "Extension"),
    ("Immunization.explanation.id", "string"),
    ("Immunization.explanation.modifierExtension", "Extension"),
    ("Immunization.explanation.reason", "CodeableConcept"),
    ("Immunization.explanation.reasonNotGiven", "CodeableConcept"),
    ("Immunization.extension", "Extension"),
    ("Immunization.id", "id"),
    ("Immunization.identifier", "Identifier"),
    ("Immunization.implicitRules", "uri"),
    ("Immunization.language", "code"),
    ("Immunization.location", "Reference"),
    ("Immunization.lotNumber", "string"),
    ("Immunization.manufacturer", "Reference"),
    ("Immunization.meta", "Meta"),
    ("Immunization.modifierExtension", "Extension"),
    ("Immunization.notGiven", "boolean"),
    ("Immunization.note", "Annotation"),
    ("Immunization.patient", "Reference"),
    ("Immunization.practitioner", "BackboneElement"),
    ("Immunization.practitioner.actor", "Reference"),
    ("Immunization.practitioner.extension", "Extension"),
    ("Immunization.practitioner.id", "string"),
    ("Immunization.practitioner.modifierExtension", "Extension"),
    ("Immunization.practitioner.role", "CodeableConcept"),
    ("Immunization.primarySource", "boolean"),
    ("Immunization.reaction", "BackboneElement"),
    ("Immunization.reaction.date", "dateTime"),
    ("Immunization.reaction.detail", "Reference"),
    ("Immunization.reaction.extension", "Extension"),
    ("Immunization.reaction.id", "string"),
    ("Immunization.reaction.modifierExtension", "Extension"),
    ("Immunization.reaction.reported", "boolean"),
    ("Immunization.reportOrigin", "CodeableConcept"),
    ("Immunization.route", "CodeableConcept"),
    ("Immunization.site", "CodeableConcept"),
    ("Immunization.status", "code"),
    ("Immunization.text", "Narrative"),
    ("Immunization.vaccinationProtocol", "BackboneElement"),
    ("Immunization.vaccinationProtocol.authority", "Reference"),
    ("Immunization.vaccinationProtocol.description", "string"),
    ("Immunization.vaccinationProtocol.doseSequence", "positiveInt"),
    ("Immunization.vaccinationProtocol.doseStatus", "CodeableConcept"),
    ("Immunization.vaccinationProtocol.doseStatusReason", "CodeableConcept"),
    ("Immunization.vaccinationProtocol.extension", "Extension"),
    ("Immunization.vaccinationProtocol.id", "string"),
    ("Immunization.vaccinationProtocol.modifierExtension", "Extension"),
    ("Immunization.vaccinationProtocol.series", "string"),
    ("Immunization.vaccinationProtocol.seriesDoses", "positiveInt"),
    ("Immunization.vaccinationProtocol.targetDisease", "CodeableConcept"),
    ("Immunization.vaccineCode", "CodeableConcept"),
    ("MessageHeader.author", "Reference"),
    ("MessageHeader.contained", "Resource"),
    ("MessageHeader.destination", "BackboneElement"),
    ("MessageHeader.destination.endpoint", "uri"),
    ("MessageHeader.destination.extension", "Extension"),
    ("MessageHeader.destination.id", "string"),
    ("MessageHeader.destination.modifierExtension", "Extension"),
    ("MessageHeader.destination.name", "string"),
    ("MessageHeader.destination.target", "Reference"),
    ("MessageHeader.enterer", "Reference"),
    ("MessageHeader.event", "Coding"),
    ("MessageHeader.extension", "Extension"),
    ("MessageHeader.focus", "Reference"),
    ("MessageHeader.id", "id"),
    ("MessageHeader.implicitRules", "uri"),
    ("MessageHeader.language", "code"),
    ("MessageHeader.meta", "Meta"),
    ("MessageHeader.modifierExtension", "Extension"),
    ("MessageHeader.reason", "CodeableConcept"),
    ("MessageHeader.receiver", "Reference"),
    ("MessageHeader.response", "BackboneElement"),
    ("MessageHeader.response.code", "code"),
    ("MessageHeader.response.details", "Reference"),
    ("MessageHeader.response.extension", "Extension"),
    ("MessageHeader.response.id", "string"),
    ("MessageHeader.response.identifier", "id"),
    ("MessageHeader.response.modifierExtension", "Extension"),
    ("MessageHeader.responsible", "Reference"),
    ("MessageHeader.sender", "Reference"),
    ("MessageHeader.source", "BackboneElement"),
    ("MessageHeader.source.contact", "ContactPoint"),
    ("MessageHeader.source.endpoint", "uri"),
    ("MessageHeader.source.extension", "Extension"),
    ("MessageHeader.source.id", "string"),
    ("MessageHeader.source.modifierExtension", "Extension"),
    ("MessageHeader.source.name", "string"),
    ("MessageHeader.source.software", "string"),
    ("MessageHeader.source.version", "string"),
    ("MessageHeader.text", "Narrative"),
    ("MessageHeader.timestamp", "instant"),
    ("Meta.extension", "Extension"),
    ("Meta.id", "string"),
    ("Meta.lastUpdated", "instant"),
    ("Meta.profile", "uri"),
    ("Meta.security", "Coding"),
    ("Meta.tag", "Coding"),
    ("Meta.versionId", "id"),
    ("Money.code", "code"),
    ("Money.comparator", "code"),
    ("Money.extension", "Extension"),
    ("Money.id", "string"),
    ("Money.system", "uri"),
    ("Money.unit", "string"),
    ("Money.value", "decimal"),
    ("Narrative.div", "xhtml"),
    ("Narrative.extension", "Extension"),
    ("Narrative.id", "string"),
    ("Narrative.status", "code"),
    ("Observation.basedOn", "Reference"),
    ("Observation.bodySite", "CodeableConcept"),
    ("Observation.category", "CodeableConcept"),
    ("Observation.code", "CodeableConcept"),
    ("Observation.comment", "string"),
    ("Observation.component", "BackboneElement"),
    ("Observation.component.code", "CodeableConcept"),
    ("Observation.component.dataAbsentReason", "CodeableConcept"),
    ("Observation.component.extension", "Extension"),
    ("Observation.component.id", "string"),
    ("Observation.component.interpretation", "CodeableConcept"),
    ("Observation.component.modifierExtension", "Extension"),
    ("Observation.component.referenceRange", "BackboneElement"),
    ("Observation.component.referenceRange.age", "Range"),
    ("Observation.component.referenceRange.appliesTo", "CodeableConcept"),
    ("Observation.component.referenceRange.extension", "Extension"),
    ("Observation.component.referenceRange.high", "SimpleQuantity"),
    ("Observation.component.referenceRange.id", "string"),
    ("Observation.component.referenceRange.low", "SimpleQuantity"),
    ("Observation.component.referenceRange.modifierExtension", "Extension"),
    ("Observation.component.referenceRange.text", "string"),
    ("Observation.component.referenceRange.type", "CodeableConcept"),
    ("Observation.component.valueAttachment", "Attachment"),
    ("Observation.component.valueCodeableConcept", "CodeableConcept"),
    ("Observation.component.valueDateTime", "dateTime"),
    ("Observation.component.valuePeriod", "Period"),
    ("Observation.component.valueQuantity", "Quantity"),
    ("Observation.component.valueRange", "Range"),
    ("Observation.component.valueRatio", "Ratio"),
    ("Observation.component.valueSampledData", "SampledData"),
    ("Observation.component.valueString", "string"),
    ("Observation.component.valueTime", "time"),
    ("Observation.contained", "Resource"),
    ("Observation.context", "Reference"),
    ("Observation.dataAbsentReason", "CodeableConcept"),
    ("Observation.device", "Reference"),
    ("Observation.effectiveDateTime", "dateTime"),
    ("Observation.effectivePeriod", "Period"),
    ("Observation.extension", "Extension"),
    ("Observation.id", "id"),
    ("Observation.identifier", "Identifier"),
    ("Observation.implicitRules", "uri"),
    ("Observation.interpretation", "CodeableConcept"),
    ("Observation.issued", "instant"),
    ("Observation.language", "code"),
    ("Observation.meta", "Meta"),
    ("Observation.method", "CodeableConcept"),
    ("Observation.modifierExtension", "Extension"),
    ("Observation.performer", "Reference"),
    ("Observation.referenceRange", "BackboneElement"),
    ("Observation.referenceRange.age", "Range"),
    ("Observation.referenceRange.appliesTo", "CodeableConcept"),
    ("Observation.referenceRange.extension", "Extension"),
    ("Observation.referenceRange.high", "SimpleQuantity"),
    ("Observation.referenceRange.id", "string"),
    ("Observation.referenceRange.low", "SimpleQuantity"),
    ("Observation.referenceRange.modifierExtension", "Extension"),
    ("Observation.referenceRange.text", "string"),
    ("Observation.referenceRange.type", "CodeableConcept"),
    ("Observation.related", "BackboneElement"),
    ("Observation.related.extension", "Extension"),
    ("Observation.related.id", "string"),
    ("Observation.related.modifierExtension", "Extension"),
    ("Observation.related.target", "Reference"),
    ("Observation.related.type", "code"),
    ("Observation.specimen", "Reference"),
    ("Observation.status", "code"),
    ("Observation.subject", "Reference"),
    ("Observation.text", "Narrative"),
    ("Observation.valueAttachment", "Attachment"),
    ("Observation.valueBoolean", "boolean"),
    ("Observation.valueCodeableConcept", "CodeableConcept"),
    ("Observation.valueDateTime", "dateTime"),
    ("Observation.valuePeriod", "Period"),
    ("Observation.valueQuantity", "Quantity"),
    ("Observation.valueRange", "Range"),
    ("Observation.valueRatio", "Ratio"),
    ("Observation.valueSampledData", "SampledData"),
    ("Observation.valueString", "string"),
    ("Observation.valueTime", "time"),
    ("OperationOutcome.contained", "Resource"),
    ("OperationOutcome.extension", "Extension"),
    ("OperationOutcome.id", "id"),
    ("OperationOutcome.implicitRules", "uri"),
    ("OperationOutcome.issue", "BackboneElement"),
    ("OperationOutcome.issue.code", "code"),
    ("OperationOutcome.issue.details", "CodeableConcept"),
    ("OperationOutcome.issue.diagnostics", "string"),
    ("OperationOutcome.issue.expression", "string"),
    ("OperationOutcome.issue.extension", "Extension"),
    ("OperationOutcome.issue.id", "string"),
    ("OperationOutcome.issue.location", "string"),
    ("OperationOutcome.issue.modifierExtension", "Extension"),
    ("OperationOutcome.issue.severity", "code"),
    ("OperationOutcome.language", "code"),
    ("OperationOutcome.meta", "Meta"),
    ("OperationOutcome.modifierExtension", "Extension"),
    ("OperationOutcome.text", "Narrative"),
    ("Organization.active", "boolean"),
    ("Organization.address", "Address"),
    ("Organization.alias", "string"),
    ("Organization.contact", "BackboneElement"),
    ("Organization.contact.address", "Address"),
    ("Organization.contact.extension", "Extension"),
    ("Organization.contact.id", "string"),
    ("Organization.contact.modifierExtension", "Extension"),
    ("Organization.contact.name", "HumanName"),
    ("Organization.contact.purpose", "CodeableConcept"),
    ("Organization.contact.telecom", "ContactPoint"),
    ("Organization.contained", "Resource"),
    ("Organization.endpoint", "Reference"),
    ("Organization.extension", "Extension"),
    ("Organization.id", "id"),
    ("Organization.identifier", "Identifier"),
    ("Organization.implicitRules", "uri"),
    ("Organization.language", "code"),
    ("Organization.meta", "Meta"),
    ("Organization.modifierExtension", "Extension"),
    ("Organization.name", "string"),
    ("Organization.partOf", "Reference"),
    ("Organization.telecom", "ContactPoint"),
    ("Organization.text", "Narrative"),
    ("Organization.type", "CodeableConcept"),
    ("Patient.active", "boolean"),
    ("Patient.address", "Address"),
    ("Patient.animal", "BackboneElement"),
    ("Patient.animal.breed", "CodeableConcept"),
    ("Patient.animal.extension", "Extension"),
    ("Patient.animal.genderStatus", "CodeableConcept"),
    ("Patient.animal.id", "string"),
    ("Patient.animal.modifierExtension", "Extension"),
    ("Patient.animal.species", "CodeableConcept"),
    ("Patient.birthDate", "date"),
    ("Patient.communication", "BackboneElement"),
    ("Patient.communication.extension", "Extension"),
    ("Patient.communication.id", "string"),
    ("Patient.communication.language", "CodeableConcept"),
    ("Patient.communication.modifierExtension", "Extension"),
    ("Patient.communication.preferred", "boolean"),
    ("Patient.contact", "BackboneElement"),
    ("Patient.contact.address", "Address"),
    ("Patient.contact.extension", "Extension"),
    ("Patient.contact.gender", "code"),
    ("Patient.contact.id", "string"),
    ("Patient.contact.modifierExtension", "Extension"),
    ("Patient.contact.name", "HumanName"),
    ("Patient.contact.organization", "Reference"),
    ("Patient.contact.period", "Period"),
    ("Patient.contact.relationship", "CodeableConcept"),
    ("Patient.contact.telecom", "ContactPoint"),
    ("Patient.contained", "Resource"),
    ("Patient.deceasedBoolean", "boolean"),
    ("Patient.deceasedDateTime", "dateTime"),
    ("Patient.extension", "Extension"),
    ("Patient.gender", "code"),
    ("Patient.generalPractitioner", "Reference"),
    ("Patient.id", "id"),
    ("Patient.identifier", "Identifier"),
    ("Patient.implicitRules", "uri"),
    ("Patient.language", "code"),
    ("Patient.link", "BackboneElement"),
    ("Patient.link.extension", "Extension"),
    ("Patient.link.id", "string"),
    ("Patient.link.modifierExtension", "Extension"),
    ("Patient.link.other", "Reference"),
    ("Patient.link.type", "code"),
    ("Patient.managingOrganization", "Reference"),
    ("Patient.maritalStatus", "CodeableConcept"),
    ("Patient.meta", "Meta"),
    ("Patient.modifierExtension", "Extension"),
    ("Patient.multipleBirthBoolean", "boolean"),
    ("Patient.multipleBirthInteger", "integer"),
    ("Patient.name", "HumanName"),
    ("Patient.photo", "Attachment"),
    ("Patient.telecom", "ContactPoint"),
    ("Patient.text", "Narrative"),
    ("Period.end", "dateTime"),
    ("Period.extension", "Extension"),
    ("Period.id", "string"),
    ("Period.start", "dateTime"),
    ("Practitioner.active", "boolean"),
    ("Practitioner.address", "Address"),
    ("Practitioner.birthDate", "date"),
    ("Practitioner.communication", "CodeableConcept"),
    ("Practitioner.contained", "Resource"),
    ("Practitioner.extension", "Extension"),
    ("Practitioner.gender", "code"),
    ("Practitioner.id", "id"),
    ("Practitioner.identifier", "Identifier"),
    ("Practitioner.implicitRules", "uri"),
    ("Practitioner.language", "code"),
    ("Practitioner.meta", "Meta"),
    ("Practitioner.modifierExtension", "Extension"),
    ("Practitioner.name", "HumanName"),
    ("Practitioner.photo", "Attachment"),
    ("Practitioner.qualification", "BackboneElement"),
    ("Practitioner.qualification.code", "CodeableConcept"),
    ("Practitioner.qualification.extension", "Extension"),
    ("Practitioner.qualification.id", "string"),
    ("Practitioner.qualification.identifier", "Identifier"),
    ("Practitioner.qualification.issuer", "Reference"),
    ("Practitioner.qualification.modifierExtension", "Extension"),
    ("Practitioner.qualification.period", "Period"),
    ("Practitioner.telecom", "ContactPoint"),
    ("Practitioner.text", "Narrative"),
    ("Provenance.activity", "Coding"),
    ("Provenance.agent", "BackboneElement"),
    ("Provenance.agent.extension", "Extension"),
    ("Provenance.agent.id", "string"),
    ("Provenance.agent.modifierExtension", "Extension"),
    ("Provenance.agent.onBehalfOfReference", "Reference"),
    ("Provenance.agent.onBehalfOfUri", "uri"),
    ("Provenance.agent.relatedAgentType", "CodeableConcept"),
    ("Provenance.agent.role", "Coding"),
    ("Provenance.agent.whoReference", "Reference"),
    ("Provenance.agent.whoUri", "uri"),
    ("Provenance.contained", "Resource"),
    ("Provenance.entity", "BackboneElement"),
    ("Provenance.entity.agent", "BackboneElement"),
    ("Provenance.entity.agent.extension", "Extension"),
    ("Provenance.entity.agent.id", "string"),
    ("Provenance.entity.agent.modifierExtension", "Extension"),
    ("Provenance.entity.agent.onBehalfOfReference", "Reference"),
    ("Provenance.entity.agent.onBehalfOfUri", "uri"),
    ("Provenance.entity.agent.relatedAgentType", "CodeableConcept"),
    ("Provenance.entity.agent.role", "Coding"),
    ("Provenance.entity.agent.whoReference", "Reference"),
    ("Provenance.entity.agent.whoUri", "uri"),
    ("Provenance.entity.extension", "Extension"),
    ("Provenance.entity.id", "string"),
    ("Provenance.entity.modifierExtension", "Extension"),
    ("Provenance.entity.role", "code"),
    ("Provenance.entity.whatIdentifier", "Identifier"),
    ("Provenance.entity.whatReference", "Reference"),
    ("Provenance.entity.whatUri", "uri"),
    ("Provenance.extension", "Extension"),
    ("Provenance.id", "id"),
    ("Provenance.implicitRules", "uri"),
    ("Provenance.language", "code"),
    ("Provenance.location", "Reference"),
    ("Provenance.meta", "Meta"),
    ("Provenance.modifierExtension", "Extension"),
    ("Provenance.period", "Period"),
    ("Provenance.policy", "uri"),
    ("Provenance.reason", "Coding"),
    ("Provenance.recorded", "instant"),
    ("Provenance.signature", "Signature"),
    ("Provenance.target", "Reference"),
    ("Provenance.text", "Narrative"),
    ("Quantity.code", "code"),
    ("Quantity.comparator", "code"),
    ("Quantity.extension", "Extension"),
    ("Quantity.id", "string"),
    ("Quantity.system", "uri"),
    ("Quantity.unit", "string"),
    ("Quantity.value", "decimal"),
    ("Range.extension", "Extension"),
    ("Range.high", "SimpleQuantity"),
    ("Range.id", "string"),
    ("Range.low", "SimpleQuantity"),
    ("Ratio.denominator", "Quantity"),
    ("Ratio.extension", "Extension"),
    ("Ratio.id", "string"),
    ("Ratio.numerator", "Quantity"),
    ("Reference.display", "string"),
    ("Reference.extension", "Extension"),
    ("Reference.id", "string"),
    ("Reference.identifier", "Identifier"),
    ("Reference.reference", "string"),
    ("SampledData.data", "string"),
    ("SampledData.dimensions", "positiveInt"),
    ("SampledData.extension", "Extension"),
    ("SampledData.factor", "decimal"),
    ("SampledData.id", "string"),
    ("SampledData.lowerLimit", "decimal"),
    ("SampledData.origin", "SimpleQuantity"),
    ("SampledData.period", "decimal"),
    ("SampledData.upperLimit", "decimal"),
    ("Signature.blob", "base64Binary"),
    ("Signature.contentType", "code"),
    ("Signature.extension", "Extension"),
    ("Signature.id", "string"),
    ("Signature.onBehalfOfReference", "Reference"),
    ("Signature.onBehalfOfUri", "uri"),
    ("Signature.type", "Coding"),
    ("Signature.when", "instant"),
    ("Signature.whoReference", "Reference"),
    ("Signature.whoUri", "uri"),
    ("SimpleQuantity.code", "code"),
    ("SimpleQuantity.comparator", "code"),
    ("SimpleQuantity.extension", "Extension"),
    ("SimpleQuantity.id", "string"),
    ("SimpleQuantity.system", "uri"),
    ("SimpleQuantity.unit", "string"),
    ("SimpleQuantity.value", "decimal"),
    ("Subscription.channel", "BackboneElement"),
    ("Subscription.channel.endpoint", "uri"),
    ("Subscription.channel.extension", "Extension"),
    ("Subscription.channel.header", "string"),
    ("Subscription.channel.id", "string"),
    ("Subscription.channel.modifierExtension", "Extension"),
    ("Subscription.channel.payload", "string"),
    ("Subscription.channel.type", "code"),
    ("Subscription.contact", "ContactPoint"),
    ("Subscription.contained", "Resource"),
    ("Subscription.criteria", "string"),
    ("Subscription.end", "instant"),
    ("Subscription.error", "string"),
    ("Subscription.extension", "Extension"),
    ("Subscription.id", "id"),
    ("Subscription.implicitRules", "uri"),
    ("Subscription.language", "code"),
    ("Subscription.meta", "Meta"),
    ("Subscription.modifierExtension", "Extension"),
    ("Subscription.reason", "string"),
    ("Subscription.status", "code"),
    ("Subscription.tag", "Coding"),
    ("Subscription.text", "Narrative"),
    ("Timing.code", "CodeableConcept"),
    ("Timing.event", "dateTime"),
    ("Timing.extension", "Extension"),
    ("Timing.id", "string"),
    ("Timing.repeat", "Element"),
    ("Timing.repeat.boundsDuration", "Duration"),
    ("Timing.repeat.boundsPeriod", "Period"),
    ("Timing.repeat.boundsRange", "Range"),
    ("Timing.repeat.count", "integer"),
    ("Timing.repeat.countMax", "integer"),
    ("Timing.repeat.dayOfWeek", "code"),
    ("Timing.repeat.duration", "decimal"),
    ("Timing.repeat.durationMax", "decimal"),
    ("Timing.repeat.durationUnit", "code"),
    ("Timing.repeat.frequency", "integer"),
    ("Timing.repeat.frequencyMax", "integer"),
    ("Timing.repeat.offset", "unsignedInt"),
    ("Timing.repeat.period", "decimal"),
    ("Timing.repeat.periodMax", "decimal"),
    ("Timing.repeat.periodUnit", "code"),
    ("Timing.repeat.timeOfDay", "time"),
    ("Timing.repeat.when", "code"),
];
