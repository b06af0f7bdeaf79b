//! Highlight rules — whole-record display styling.
//!
//! Unlike the level and pattern classifiers, which color a single chip, a
//! highlight rule inspects any one record field with a comparison operator
//! and, when it matches, supplies a style for the whole rendered row. Rules
//! are evaluated in collection order over the enabled subset; the first
//! match wins.
//!
//! Matching here is case-sensitive, matching the editor semantics these
//! rules are written under; the query engine's lower-cased filters are a
//! separate concern.

use crate::types::{FieldKey, Record};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Comparison applied by a [`HighlightCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    /// Unanchored regex search; malformed patterns never match
    Regex,
}

/// A single-field predicate over a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightCondition {
    pub field: FieldKey,
    pub operator: ConditionOperator,
    pub value: String,
}

impl HighlightCondition {
    /// Evaluate this condition against a record.
    pub fn matches(&self, record: &Record) -> bool {
        let field_value = record.field(self.field).to_string();
        match self.operator {
            ConditionOperator::Equals => field_value == self.value,
            ConditionOperator::Contains => field_value.contains(&self.value),
            ConditionOperator::StartsWith => field_value.starts_with(&self.value),
            ConditionOperator::EndsWith => field_value.ends_with(&self.value),
            ConditionOperator::Regex => Regex::new(&self.value)
                .map(|re| re.is_match(&field_value))
                .unwrap_or(false),
        }
    }
}

/// Display attributes contributed by a matching rule. All optional; absent
/// attributes leave the consumer's defaults in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<String>,
}

/// One user-defined highlight rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub id: String,
    pub name: String,
    pub condition: HighlightCondition,
    pub style: HighlightStyle,
    pub enabled: bool,
}

impl HighlightRule {
    /// Fresh, enabled rule matching nothing useful yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            condition: HighlightCondition {
                field: FieldKey::Role,
                operator: ConditionOperator::Equals,
                value: String::new(),
            },
            style: HighlightStyle {
                color: Some("#000000".to_string()),
                ..HighlightStyle::default()
            },
            enabled: true,
        }
    }

    /// Human-readable problems with this rule; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("rule name must not be empty".to_string());
        }
        if self.condition.value.trim().is_empty() {
            errors.push("condition value must not be empty".to_string());
        }
        if self.condition.operator == ConditionOperator::Regex
            && Regex::new(&self.condition.value).is_err()
        {
            errors.push(format!("invalid regex: {}", self.condition.value));
        }

        errors
    }
}

/// Style of the first enabled rule that matches, if any.
pub fn apply_highlight_rules<'a>(
    record: &Record,
    rules: &'a [HighlightRule],
) -> Option<&'a HighlightStyle> {
    rules
        .iter()
        .filter(|r| r.enabled)
        .find(|r| r.condition.matches(record))
        .map(|r| &r.style)
}
