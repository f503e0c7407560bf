use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const FULL_NAME: &str = "Full Name";
pub const EMAIL: &str = "Email";
pub const PHONE: &str = "Phone";
pub const POSITION_APPLIED: &str = "Position Applied";
pub const YEARS_OF_EXPERIENCE: &str = "Years of Experience";
pub const SKILLS: &str = "Skills";
pub const AVAILABILITY: &str = "Availability";
pub const PREFERRED_LOCATION: &str = "Preferred Location";

/// Fields that must be non-empty before a record may be stored.
/// `Preferred Location` is deliberately absent.
pub const REQUIRED_FIELDS: [&str; 7] = [
    FULL_NAME,
    EMAIL,
    PHONE,
    POSITION_APPLIED,
    YEARS_OF_EXPERIENCE,
    SKILLS,
    AVAILABILITY,
];

/// Status written into records forwarded to the spreadsheet.
pub const SHEET_STATUS_APPLIED: &str = "Applied";

/// Fielded candidate data produced by the structuring step.
///
/// Serializes as a flat `{"Full Name": "...", ...}` object. Extraction fields
/// default to the empty string so an absent key and a null value look the
/// same; job-context fields only appear once the intake pipeline sets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredCandidateRecord {
    #[serde(rename = "Full Name", default)]
    pub full_name: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "Phone", default)]
    pub phone: String,
    #[serde(rename = "Position Applied", default)]
    pub position_applied: String,
    #[serde(rename = "Years of Experience", default)]
    pub years_of_experience: String,
    #[serde(rename = "Skills", default)]
    pub skills: String,
    #[serde(rename = "Preferred Location", default)]
    pub preferred_location: String,
    #[serde(rename = "Availability", default)]
    pub availability: String,

    #[serde(rename = "Company", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "Job ID", default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "Applied Date", default, skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<String>,

    /// Anything else the model returned. Kept so the spreadsheet sees it.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl StructuredCandidateRecord {
    /// Looks up a value by its serialized field name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            FULL_NAME => &self.full_name,
            EMAIL => &self.email,
            PHONE => &self.phone,
            POSITION_APPLIED => &self.position_applied,
            YEARS_OF_EXPERIENCE => &self.years_of_experience,
            SKILLS => &self.skills,
            PREFERRED_LOCATION => &self.preferred_location,
            AVAILABILITY => &self.availability,
            "Company" => return self.company.as_deref(),
            "Job ID" => return self.job_id.as_deref(),
            "Status" => return self.status.as_deref(),
            "Applied Date" => return self.applied_date.as_deref(),
            other => return self.extra.get(other).map(String::as_str),
        };
        Some(value.as_str())
    }

    /// Copy of the record as sent to the spreadsheet: `Status` defaults to `Applied`.
    pub fn for_sheet(&self) -> Self {
        let mut copy = self.clone();
        copy.status.get_or_insert_with(|| SHEET_STATUS_APPLIED.to_string());
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_sheet_column_names() {
        let record = StructuredCandidateRecord {
            full_name: "Ada Lovelace".to_string(),
            skills: "Rust, Go".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Full Name"], "Ada Lovelace");
        assert_eq!(json["Skills"], "Rust, Go");
        // Empty extraction fields are present, job context is not
        assert_eq!(json["Email"], "");
        assert!(json.get("Company").is_none());
        assert!(json.get("Status").is_none());
    }

    #[test]
    fn test_unknown_fields_land_in_extra() {
        let json = serde_json::json!({
            "Full Name": "Grace Hopper",
            "LinkedIn": "linkedin.com/in/grace"
        });
        let record: StructuredCandidateRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.full_name, "Grace Hopper");
        assert_eq!(record.extra.get("LinkedIn").unwrap(), "linkedin.com/in/grace");
        assert_eq!(record.field("LinkedIn"), Some("linkedin.com/in/grace"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["LinkedIn"], "linkedin.com/in/grace");
    }

    #[test]
    fn test_for_sheet_defaults_status_without_overwriting() {
        let record = StructuredCandidateRecord::default();
        assert_eq!(record.for_sheet().status.as_deref(), Some("Applied"));

        let shortlisted = StructuredCandidateRecord {
            status: Some("Shortlisted".to_string()),
            ..Default::default()
        };
        assert_eq!(shortlisted.for_sheet().status.as_deref(), Some("Shortlisted"));
    }

    #[test]
    fn test_field_lookup_covers_required_fields() {
        let record = StructuredCandidateRecord::default();
        for name in REQUIRED_FIELDS {
            assert_eq!(record.field(name), Some(""), "{name} should resolve");
        }
    }
}
