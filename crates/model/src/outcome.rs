//! OperationOutcome construction helpers.

use serde_json::{json, Value};

/// Builds an OperationOutcome with a single issue.
pub fn operation_outcome(severity: &str, code: &str, diagnostics: &str) -> Value {
    json!({
        "resourceType": "OperationOutcome",
        "issue": [{
            "severity": severity,
            "code": code,
            "diagnostics": diagnostics,
        }]
    })
}

/// A fatal outcome, as attached to error responses.
pub fn fatal_outcome(code: &str, diagnostics: &str) -> Value {
    operation_outcome("fatal", code, diagnostics)
}

/// An error outcome, as embedded in failed bundle entries.
pub fn error_outcome(code: &str, diagnostics: &str) -> Value {
    operation_outcome("error", code, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_shape() {
        let outcome = fatal_outcome("structure", "bad JSON");
        assert_eq!(outcome["resourceType"], "OperationOutcome");
        assert_eq!(outcome["issue"][0]["severity"], "fatal");
        assert_eq!(outcome["issue"][0]["code"], "structure");
        assert_eq!(outcome["issue"][0]["diagnostics"], "bad JSON");
    }
}
