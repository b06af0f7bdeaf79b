//! Classification rule sets
//!
//! Two rule families parameterize record display:
//!
//! - [`LevelRuleSet`] maps numeric severities to display names and colors.
//!   Across the whole collection **at most one** level rule set may be
//!   enabled; the mutation operation in
//!   [`RuleSettings`](crate::settings::RuleSettings) enforces this, rule
//!   sets themselves only carry the flag.
//! - [`PatternRuleSet`] maps a free-text field (role or label) to a color via
//!   ordered literal/regex patterns. Any number of pattern rule sets may be
//!   enabled at once; evaluation follows collection order.
//!
//! Rule sets are user-edited data, so each kind exposes `validate()`
//! returning human-readable problems rather than failing construction.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// ============================================
// Level rules
// ============================================

/// One severity mapping inside a [`LevelRuleSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelMapping {
    /// Numeric severity this mapping applies to
    pub level: i64,
    /// Display name (e.g. "WARNING")
    pub name: String,
    /// Display color, hex string
    pub color: String,
}

/// A named, orderable list of severity mappings.
///
/// Duplicate `level` values inside `mappings` are tolerated at runtime;
/// the first mapping in list order wins. `validate` reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRuleSet {
    pub id: String,
    pub name: String,
    pub mappings: Vec<LevelMapping>,
    pub enabled: bool,
}

impl LevelRuleSet {
    /// Fresh, disabled rule set with a starter mapping list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            mappings: vec![
                LevelMapping {
                    level: 0,
                    name: "TRACE".to_string(),
                    color: "#9e9e9e".to_string(),
                },
                LevelMapping {
                    level: 1,
                    name: "DEBUG".to_string(),
                    color: "#2196f3".to_string(),
                },
            ],
            enabled: false,
        }
    }

    /// Human-readable problems with this rule set; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("rule name must not be empty".to_string());
        }
        if self.mappings.is_empty() {
            errors.push("at least one level mapping is required".to_string());
        }

        let mut seen = HashSet::new();
        for mapping in &self.mappings {
            if !seen.insert(mapping.level) {
                errors.push(format!("duplicate level {}", mapping.level));
            }
            if mapping.name.trim().is_empty() {
                errors.push("level name must not be empty".to_string());
            }
            if mapping.color.is_empty() {
                errors.push("level color must not be empty".to_string());
            }
        }

        errors
    }
}

// ============================================
// Pattern rules
// ============================================

/// How a [`PatternMapping`] pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Case-sensitive substring containment
    Literal,
    /// Unanchored regex search; a malformed pattern never matches
    Regex,
}

/// One pattern-to-color mapping inside a [`PatternRuleSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMapping {
    pub pattern: String,
    pub kind: PatternKind,
    pub color: String,
}

impl PatternMapping {
    /// Test this mapping against a field value.
    ///
    /// An empty value matches nothing; a malformed regex behaves as absent.
    pub fn matches(&self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        match self.kind {
            PatternKind::Literal => value.contains(&self.pattern),
            PatternKind::Regex => Regex::new(&self.pattern)
                .map(|re| re.is_match(value))
                .unwrap_or(false),
        }
    }
}

/// A named, orderable list of pattern mappings, used for both role and tag
/// annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRuleSet {
    pub id: String,
    pub name: String,
    pub mappings: Vec<PatternMapping>,
    pub enabled: bool,
}

impl PatternRuleSet {
    /// Fresh, enabled rule set with one blank mapping to edit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            mappings: vec![PatternMapping {
                pattern: String::new(),
                kind: PatternKind::Literal,
                color: "#000000".to_string(),
            }],
            enabled: true,
        }
    }

    /// Human-readable problems with this rule set; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("rule name must not be empty".to_string());
        }
        if self.mappings.is_empty() {
            errors.push("at least one pattern mapping is required".to_string());
        }

        for mapping in &self.mappings {
            if mapping.pattern.trim().is_empty() {
                errors.push("pattern must not be empty".to_string());
            }
            if mapping.kind == PatternKind::Regex && Regex::new(&mapping.pattern).is_err() {
                errors.push(format!("invalid regex: {}", mapping.pattern));
            }
            if mapping.color.is_empty() {
                errors.push("pattern color must not be empty".to_string());
            }
        }

        errors
    }
}

// ============================================
// Built-in defaults
// ============================================

/// Default severity rule set, installed when the store holds nothing.
pub fn default_level_rules() -> Vec<LevelRuleSet> {
    vec![LevelRuleSet {
        id: "default-levels".to_string(),
        name: "Default levels".to_string(),
        enabled: true,
        mappings: vec![
            LevelMapping {
                level: 0,
                name: "TRACE".to_string(),
                color: "#9e9e9e".to_string(),
            },
            LevelMapping {
                level: 1,
                name: "DEBUG".to_string(),
                color: "#2196f3".to_string(),
            },
            LevelMapping {
                level: 2,
                name: "WARNING".to_string(),
                color: "#ff9800".to_string(),
            },
            LevelMapping {
                level: 3,
                name: "ERROR".to_string(),
                color: "#f44336".to_string(),
            },
            LevelMapping {
                level: 4,
                name: "CRITICAL".to_string(),
                color: "#d32f2f".to_string(),
            },
        ],
    }]
}

/// Default role rule set.
pub fn default_role_rules() -> Vec<PatternRuleSet> {
    vec![PatternRuleSet {
        id: "default-roles".to_string(),
        name: "Default roles".to_string(),
        enabled: true,
        mappings: vec![
            PatternMapping {
                pattern: "admin".to_string(),
                kind: PatternKind::Literal,
                color: "#ff5722".to_string(),
            },
            PatternMapping {
                pattern: "user".to_string(),
                kind: PatternKind::Literal,
                color: "#4caf50".to_string(),
            },
            PatternMapping {
                pattern: "system".to_string(),
                kind: PatternKind::Literal,
                color: "#673ab7".to_string(),
            },
        ],
    }]
}

/// Default tag rule set.
pub fn default_tag_rules() -> Vec<PatternRuleSet> {
    vec![PatternRuleSet {
        id: "default-tags".to_string(),
        name: "Default tags".to_string(),
        enabled: true,
        mappings: vec![
            PatternMapping {
                pattern: "important".to_string(),
                kind: PatternKind::Literal,
                color: "#ffeb3b".to_string(),
            },
            PatternMapping {
                pattern: "notification".to_string(),
                kind: PatternKind::Literal,
                color: "#00bcd4".to_string(),
            },
            PatternMapping {
                pattern: "security".to_string(),
                kind: PatternKind::Literal,
                color: "#e91e63".to_string(),
            },
        ],
    }]
}
