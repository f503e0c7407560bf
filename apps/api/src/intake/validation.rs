use serde::{Deserialize, Serialize};

use crate::models::candidate::{StructuredCandidateRecord, REQUIRED_FIELDS};

/// Outcome of the validation gate. Not an error: a failing record is
/// returned to the caller alongside the list of gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidationResult {
    pub passed: bool,
    pub missing: Vec<String>,
}

/// Checks every required field in one pass.
///
/// A field is missing when it is empty or whitespace-only; extraction fields
/// are never absent from the record. `missing` follows the order of
/// `REQUIRED_FIELDS`.
pub fn validate_record(record: &StructuredCandidateRecord) -> FieldValidationResult {
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|name| {
            record
                .field(name)
                .map_or(true, |value| value.trim().is_empty())
        })
        .map(|name| name.to_string())
        .collect();

    FieldValidationResult {
        passed: missing.is_empty(),
        missing,
    }
}
