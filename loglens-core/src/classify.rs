//! Classifiers — per-record display attributes derived from rule sets.
//!
//! Both classifiers are pure lookups over borrowed rule collections: they
//! never mutate a record or a rule set, and they never fail. Pattern
//! matching is a single generic first-match-in-priority-order walk shared by
//! role and tag annotation.

use crate::rules::{LevelRuleSet, PatternRuleSet};
use crate::types::{builtin_level_color, builtin_level_name};

/// Display name and color for a severity level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelStyle {
    pub name: String,
    pub color: String,
}

/// Map a numeric severity to its display name and color.
///
/// Uses the first enabled rule set (by invariant at most one exists). When
/// no set is enabled, or the enabled set has no mapping for `level`, the
/// built-in table applies. Duplicate levels inside a mapping list resolve
/// to the first mapping in list order.
pub fn classify_level(level: i64, rule_sets: &[LevelRuleSet]) -> LevelStyle {
    if let Some(active) = rule_sets.iter().find(|r| r.enabled) {
        if let Some(mapping) = active.mappings.iter().find(|m| m.level == level) {
            return LevelStyle {
                name: mapping.name.clone(),
                color: mapping.color.clone(),
            };
        }
    }
    LevelStyle {
        name: builtin_level_name(level).to_string(),
        color: builtin_level_color(level).to_string(),
    }
}

/// Map a free-text field value to a display color.
///
/// Walks enabled rule sets in collection order and mappings in list order,
/// returning the color of the first match. An empty value matches nothing;
/// no match yields `None` and the consumer falls back to a neutral default.
pub fn classify_pattern<'a>(value: &str, rule_sets: &'a [PatternRuleSet]) -> Option<&'a str> {
    rule_sets
        .iter()
        .filter(|r| r.enabled)
        .flat_map(|r| r.mappings.iter())
        .find(|m| m.matches(value))
        .map(|m| m.color.as_str())
}
