//! Request binding: content negotiation, body parsing, version headers.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use meridian_model::{Resource, WhatToEncrypt};

use crate::error::{RestError, RestResult};

/// Parses the request body into a resource envelope, enforcing the JSON
/// content types. XML is handled by an external converter and is rejected
/// here.
pub fn fhir_bind(headers: &HeaderMap, body: &[u8], encrypt: &WhatToEncrypt) -> RestResult<Resource> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim();

    match content_type {
        "" | "application/fhir+json" | "application/json" | "application/json+fhir"
        | "application/octet-stream" => {}
        "application/fhir+xml" | "application/xml" | "text/xml" => {
            return Err(RestError::NotAcceptable);
        }
        other => {
            return Err(RestError::Structure(format!(
                "unsupported Content-Type: {other}"
            )));
        }
    }

    let mut resource =
        Resource::from_json_bytes(body).map_err(|e| RestError::Structure(e.to_string()))?;
    resource.set_what_to_encrypt(*encrypt);
    Ok(resource)
}

/// As [`fhir_bind`], additionally checking the body's type against the URL.
pub fn fhir_bind_expecting(
    headers: &HeaderMap,
    body: &[u8],
    expected_type: &str,
    encrypt: &WhatToEncrypt,
) -> RestResult<Resource> {
    let resource = fhir_bind(headers, body, encrypt)?;
    if resource.resource_type() != expected_type {
        return Err(RestError::Structure(format!(
            "resourceType in body ({}) does not match URL ({})",
            resource.resource_type(),
            expected_type
        )));
    }
    Ok(resource)
}

/// Rejects requests that can only accept XML while XML is disabled.
pub fn check_accept(headers: &HeaderMap) -> RestResult<()> {
    let accept = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if accept.is_empty() {
        return Ok(());
    }
    let wants_json = accept.contains("json") || accept.contains("*/*") || accept.contains("*");
    let wants_xml = accept.contains("xml");
    if wants_xml && !wants_json {
        return Err(RestError::NotAcceptable);
    }
    Ok(())
}

/// The `Db` header value selecting a non-default database.
pub fn db_header(headers: &HeaderMap) -> &str {
    headers
        .get("Db")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// `Prefer: return=minimal` strips response bodies on writes.
pub fn prefer_minimal(headers: &HeaderMap) -> bool {
    headers
        .get("Prefer")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("return=minimal"))
        .unwrap_or(false)
}

/// Parses a weak ETag (`W/"3"`) into the version id it carries.
pub fn etag_to_version_id(etag: &str) -> RestResult<i64> {
    let trimmed = etag.trim();
    let inner = trimmed
        .strip_prefix("W/\"")
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| RestError::Structure(format!("couldn't parse ETag: {etag}")))?;
    inner
        .parse()
        .map_err(|_| RestError::Structure(format!("ETag versionId is not an integer: {etag}")))
}

/// Formats an instant as an HTTP date for `Last-Modified`.
pub fn http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use chrono::TimeZone;

    #[test]
    fn etag_parsing() {
        assert_eq!(etag_to_version_id("W/\"3\"").unwrap(), 3);
        assert_eq!(etag_to_version_id(" W/\"12\" ").unwrap(), 12);
        assert!(etag_to_version_id("\"3\"").is_err());
        assert!(etag_to_version_id("W/\"abc\"").is_err());
    }

    #[test]
    fn binds_json_bodies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/fhir+json".parse().unwrap());
        let resource = fhir_bind_expecting(
            &headers,
            br#"{"resourceType": "Patient"}"#,
            "Patient",
            &WhatToEncrypt::default(),
        )
        .unwrap();
        assert_eq!(resource.resource_type(), "Patient");
    }

    #[test]
    fn rejects_type_mismatch() {
        let headers = HeaderMap::new();
        let err = fhir_bind_expecting(
            &headers,
            br#"{"resourceType": "Observation"}"#,
            "Patient",
            &WhatToEncrypt::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RestError::Structure(_)));
    }

    #[test]
    fn rejects_xml_content() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/fhir+xml".parse().unwrap());
        let err = fhir_bind(&headers, b"<Patient/>", &WhatToEncrypt::default()).unwrap_err();
        assert!(matches!(err, RestError::NotAcceptable));
    }

    #[test]
    fn accept_xml_only_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "application/xml".parse().unwrap());
        assert!(check_accept(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "application/fhir+json".parse().unwrap());
        assert!(check_accept(&headers).is_ok());
    }

    #[test]
    fn http_date_format() {
        let t = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(http_date(t), "Mon, 02 Jan 2006 15:04:05 GMT");
    }
}
