//! Query engine — search, filter, and sort over a record snapshot.
//!
//! [`evaluate`] is a pure function of `(records, spec)`: no side effects, no
//! hidden state, and deterministic output — the same inputs always produce
//! the same ordered result. The host recomputes it on every user-visible
//! change to search text, filters, or sort, which is acceptable at the
//! working-set sizes the accumulator's flush thresholds imply.

use crate::types::{FieldKey, FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Comparison operator for a [`FieldFilter`]. All comparisons run on the
/// lower-cased string forms of both operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

impl std::str::FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(FilterOperator::Contains),
            "equals" => Ok(FilterOperator::Equals),
            "starts_with" => Ok(FilterOperator::StartsWith),
            "ends_with" => Ok(FilterOperator::EndsWith),
            _ => Err(format!("unknown filter operator: {}", s)),
        }
    }
}

/// Sort direction for the final stage of [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One structured predicate; all filters in a spec must hold (logical AND).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: FieldKey,
    pub operator: FilterOperator,
    pub value: String,
}

impl FieldFilter {
    fn matches(&self, record: &Record) -> bool {
        let field_value = record.field(self.field).to_string().to_lowercase();
        let filter_value = self.value.to_lowercase();
        match self.operator {
            FilterOperator::Contains => field_value.contains(&filter_value),
            FilterOperator::Equals => field_value == filter_value,
            FilterOperator::StartsWith => field_value.starts_with(&filter_value),
            FilterOperator::EndsWith => field_value.ends_with(&filter_value),
        }
    }
}

/// The full description of one query evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub search_text: String,
    pub filters: Vec<FieldFilter>,
    pub sort_field: FieldKey,
    pub sort_direction: SortDirection,
}

impl Default for QuerySpec {
    /// Matches the viewer's initial state: everything, newest first.
    fn default() -> Self {
        Self {
            search_text: String::new(),
            filters: Vec::new(),
            sort_field: FieldKey::Time,
            sort_direction: SortDirection::Desc,
        }
    }
}

/// Evaluate a query spec against a record snapshot.
///
/// Three stages:
/// 1. full-text: a record survives if the search text is empty or is
///    case-insensitively contained in the joined messages, the
///    `"file:line"` string, or the function name;
/// 2. field filters: every filter must hold, compared on lower-cased
///    string forms;
/// 3. stable sort on the sort field — numeric when both operands are
///    numeric, lexical otherwise, negated for `Desc`.
///
/// Returns borrowed records; the caller owns the snapshot.
pub fn evaluate<'a>(records: &'a [Record], spec: &QuerySpec) -> Vec<&'a Record> {
    let search = if spec.search_text.trim().is_empty() {
        None
    } else {
        Some(spec.search_text.to_lowercase())
    };

    let mut result: Vec<&Record> = records
        .iter()
        .filter(|record| match &search {
            None => true,
            Some(needle) => {
                record.joined_messages().to_lowercase().contains(needle)
                    || format!("{}:{}", record.file, record.line)
                        .to_lowercase()
                        .contains(needle)
                    || record.function.to_lowercase().contains(needle)
            }
        })
        .filter(|record| spec.filters.iter().all(|f| f.matches(record)))
        .collect();

    result.sort_by(|a, b| {
        let ordering = compare_field(a, b, spec.sort_field);
        match spec.sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    result
}

/// Comparator for the sort stage.
///
/// Numeric difference when both operands are numeric, lexical comparison
/// when both are text, stringified lexical comparison otherwise. With the
/// closed [`FieldKey`] schema every field resolves, so there is no
/// missing-operand case to report; mixed types can only arise if the schema
/// grows, and then fall back to string comparison.
fn compare_field(a: &Record, b: &Record, field: FieldKey) -> Ordering {
    match (a.field(field), b.field(field)) {
        (FieldValue::Int(x), FieldValue::Int(y)) => x.cmp(&y),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(&y),
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

/// Distinct non-empty string values the field takes across `records`,
/// sorted — used for filter-value completion.
pub fn field_suggestions(records: &[Record], field: FieldKey) -> Vec<String> {
    let values: BTreeSet<String> = records
        .iter()
        .map(|r| r.field(field).to_string())
        .filter(|v| !v.is_empty())
        .collect();
    values.into_iter().collect()
}
