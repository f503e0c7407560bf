use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Comparison understood by the Apps Script filter endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "contains")]
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    /// Coerces free text the way the filter form does: a `.` means float,
    /// otherwise try an integer, and fall back to the text itself.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        let parsed = if trimmed.contains('.') {
            trimmed.parse::<f64>().ok().map(FilterValue::Float)
        } else {
            trimmed.parse::<i64>().ok().map(FilterValue::Int)
        };
        parsed.unwrap_or_else(|| FilterValue::Text(raw.to_string()))
    }
}

/// One row of the filter builder, as typed by a recruiter.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

/// Column → operator → value. Serializes to the JSON the sheet expects in
/// its `filters` query parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, BTreeMap<FilterOperator, FilterValue>>);

impl FilterSet {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds a condition. Blank columns or values are ignored; a repeated
    /// column/operator pair keeps the last value.
    pub fn push(&mut self, condition: &FilterCondition) {
        let column = condition.column.trim();
        if column.is_empty() || condition.value.trim().is_empty() {
            return;
        }
        self.0
            .entry(column.to_string())
            .or_default()
            .insert(condition.operator, FilterValue::coerce(&condition.value));
    }

    /// Folds builder rows into the set.
    pub fn extend<'a>(&mut self, conditions: impl IntoIterator<Item = &'a FilterCondition>) {
        for condition in conditions {
            self.push(condition);
        }
    }

    pub fn to_query_value(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(column: &str, operator: FilterOperator, value: &str) -> FilterCondition {
        FilterCondition {
            column: column.to_string(),
            operator,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_coerce_numbers_and_text() {
        assert_eq!(FilterValue::coerce("5"), FilterValue::Int(5));
        assert_eq!(FilterValue::coerce("2.5"), FilterValue::Float(2.5));
        assert_eq!(FilterValue::coerce("Berlin"), FilterValue::Text("Berlin".to_string()));
        assert_eq!(FilterValue::coerce("v1.2.3"), FilterValue::Text("v1.2.3".to_string()));
    }

    #[test]
    fn test_same_column_merges_operators() {
        let mut filters = FilterSet::new();
        filters.extend(&[
            condition("Years of Experience", FilterOperator::Ge, "3"),
            condition("Years of Experience", FilterOperator::Lt, "10"),
            condition("Skills", FilterOperator::Contains, "Rust"),
        ]);

        let json: serde_json::Value = serde_json::from_str(&filters.to_query_value().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Years of Experience": {">=": 3, "<": 10},
                "Skills": {"contains": "Rust"}
            })
        );
    }

    #[test]
    fn test_blank_conditions_are_skipped() {
        let mut filters = FilterSet::new();
        filters.push(&condition("", FilterOperator::Eq, "x"));
        filters.push(&condition("Skills", FilterOperator::Eq, "  "));
        assert!(filters.is_empty());
    }

    #[test]
    fn test_deserializes_from_sheet_json() {
        let filters: FilterSet = serde_json::from_value(serde_json::json!({
            "Status": {"=": "Applied", "!=": "Rejected"}
        }))
        .unwrap();
        assert!(!filters.is_empty());
        let round_trip: serde_json::Value =
            serde_json::from_str(&filters.to_query_value().unwrap()).unwrap();
        assert_eq!(round_trip["Status"]["="], "Applied");
    }
}
