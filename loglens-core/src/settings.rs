//! Rule configuration lifecycle.
//!
//! [`RuleSettings`] owns every user-editable rule collection plus the
//! dark-mode preference, persisting each category under its own Store key
//! as a JSON string. Two lifecycle rules matter:
//!
//! - **Load before save.** Mutations made before [`RuleSettings::load`] has
//!   completed apply in memory but are *not* written back, so transient
//!   defaults can never clobber saved configuration during the startup
//!   window.
//! - **Empty means absent.** A persisted category that deserializes to an
//!   empty array counts as "no saved configuration" and the built-in
//!   defaults are installed instead.
//!
//! Level-rule exclusivity is enforced here as an atomic operation on the
//! collection ("enable this id" disables every other id in the same step),
//! not as independent boolean flips.

use crate::highlight::HighlightRule;
use crate::rules::{
    default_level_rules, default_role_rules, default_tag_rules, LevelRuleSet, PatternRuleSet,
};
use crate::store::Store;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const LEVEL_RULES_KEY: &str = "level_rules";
pub const ROLE_RULES_KEY: &str = "role_rules";
pub const TAG_RULES_KEY: &str = "tag_rules";
pub const HIGHLIGHT_RULES_KEY: &str = "highlight_rules";
pub const DARK_MODE_KEY: &str = "dark_mode";

/// The full user-editable rule configuration.
#[derive(Debug, Clone)]
pub struct RuleSettings {
    pub level_rules: Vec<LevelRuleSet>,
    pub role_rules: Vec<PatternRuleSet>,
    pub tag_rules: Vec<PatternRuleSet>,
    pub highlight_rules: Vec<HighlightRule>,
    pub dark_mode: bool,
    /// Save-on-change gate: false until `load` has completed end to end.
    loaded: bool,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self::defaults()
    }
}

impl RuleSettings {
    /// Built-in defaults, with saving still gated off.
    pub fn defaults() -> Self {
        Self {
            level_rules: default_level_rules(),
            role_rules: default_role_rules(),
            tag_rules: default_tag_rules(),
            highlight_rules: Vec::new(),
            dark_mode: false,
            loaded: false,
        }
    }

    /// Load every category from the Store, then open the save gate.
    ///
    /// Never fails: a category that is absent, empty, or unreadable falls
    /// back to its defaults (with a warning for the unreadable case).
    pub async fn load<S: Store>(store: &S) -> Self {
        let mut settings = Self::defaults();

        if let Some(rules) = load_category::<LevelRuleSet, S>(store, LEVEL_RULES_KEY).await {
            settings.level_rules = rules;
        }
        if let Some(rules) = load_category::<PatternRuleSet, S>(store, ROLE_RULES_KEY).await {
            settings.role_rules = rules;
        }
        if let Some(rules) = load_category::<PatternRuleSet, S>(store, TAG_RULES_KEY).await {
            settings.tag_rules = rules;
        }
        if let Some(rules) = load_category::<HighlightRule, S>(store, HIGHLIGHT_RULES_KEY).await {
            settings.highlight_rules = rules;
        }
        if let Some(value) = load_value(store, DARK_MODE_KEY).await {
            settings.dark_mode = value == "true";
        }

        settings.loaded = true;
        settings
    }

    /// Whether the initial load has completed and saves are allowed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // ----------------------------------------
    // Level rules (mutually exclusive enable)
    // ----------------------------------------

    /// Enable one level rule set, atomically disabling all others.
    ///
    /// Returns `false` and changes nothing when the id is unknown.
    pub async fn enable_level_rule<S: Store>(&mut self, store: &S, id: &str) -> bool {
        if !self.level_rules.iter().any(|r| r.id == id) {
            return false;
        }
        for rule in &mut self.level_rules {
            rule.enabled = rule.id == id;
        }
        self.persist(store, LEVEL_RULES_KEY, &self.level_rules)
            .await;
        true
    }

    /// Disable a level rule set; the built-in table applies until another
    /// set is enabled.
    pub async fn disable_level_rule<S: Store>(&mut self, store: &S, id: &str) -> bool {
        let Some(rule) = self.level_rules.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        rule.enabled = false;
        self.persist(store, LEVEL_RULES_KEY, &self.level_rules)
            .await;
        true
    }

    /// Replace the whole level-rule collection (editor save). Enforces the
    /// exclusivity invariant by keeping only the first enabled set enabled.
    pub async fn replace_level_rules<S: Store>(&mut self, store: &S, mut rules: Vec<LevelRuleSet>) {
        let mut seen_enabled = false;
        for rule in &mut rules {
            if rule.enabled {
                if seen_enabled {
                    rule.enabled = false;
                } else {
                    seen_enabled = true;
                }
            }
        }
        self.level_rules = rules;
        self.persist(store, LEVEL_RULES_KEY, &self.level_rules)
            .await;
    }

    // ----------------------------------------
    // Pattern and highlight rules (independent enable)
    // ----------------------------------------

    pub async fn set_role_rule_enabled<S: Store>(
        &mut self,
        store: &S,
        id: &str,
        enabled: bool,
    ) -> bool {
        let Some(rule) = self.role_rules.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        rule.enabled = enabled;
        self.persist(store, ROLE_RULES_KEY, &self.role_rules)
            .await;
        true
    }

    pub async fn set_tag_rule_enabled<S: Store>(
        &mut self,
        store: &S,
        id: &str,
        enabled: bool,
    ) -> bool {
        let Some(rule) = self.tag_rules.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        rule.enabled = enabled;
        self.persist(store, TAG_RULES_KEY, &self.tag_rules)
            .await;
        true
    }

    pub async fn set_highlight_rule_enabled<S: Store>(
        &mut self,
        store: &S,
        id: &str,
        enabled: bool,
    ) -> bool {
        let Some(rule) = self.highlight_rules.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        rule.enabled = enabled;
        self.persist(store, HIGHLIGHT_RULES_KEY, &self.highlight_rules)
            .await;
        true
    }

    pub async fn replace_role_rules<S: Store>(&mut self, store: &S, rules: Vec<PatternRuleSet>) {
        self.role_rules = rules;
        self.persist(store, ROLE_RULES_KEY, &self.role_rules)
            .await;
    }

    pub async fn replace_tag_rules<S: Store>(&mut self, store: &S, rules: Vec<PatternRuleSet>) {
        self.tag_rules = rules;
        self.persist(store, TAG_RULES_KEY, &self.tag_rules)
            .await;
    }

    pub async fn replace_highlight_rules<S: Store>(&mut self, store: &S, rules: Vec<HighlightRule>) {
        self.highlight_rules = rules;
        self.persist(store, HIGHLIGHT_RULES_KEY, &self.highlight_rules)
            .await;
    }

    // ----------------------------------------
    // Preferences
    // ----------------------------------------

    pub async fn set_dark_mode<S: Store>(&mut self, store: &S, dark_mode: bool) {
        self.dark_mode = dark_mode;
        if !self.loaded {
            return;
        }
        let value = if dark_mode { "true" } else { "false" };
        if let Err(e) = store.save(DARK_MODE_KEY, value).await {
            tracing::warn!(error = %e, key = DARK_MODE_KEY, "Failed to save setting");
        }
    }

    /// Persist one category as a JSON string, honoring the load gate.
    /// Failures are logged and otherwise ignored; the in-memory state is
    /// already updated and the next change will retry.
    async fn persist<S: Store, T: Serialize>(&self, store: &S, key: &str, value: &T) {
        if !self.loaded {
            return;
        }
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, key, "Failed to serialize setting");
                return;
            }
        };
        if let Err(e) = store.save(key, &json).await {
            tracing::warn!(error = %e, key, "Failed to save setting");
        }
    }
}

/// Load one rule category. `None` means "use defaults": key absent, value
/// empty, an empty persisted array, or an unreadable value.
async fn load_category<T: DeserializeOwned, S: Store>(store: &S, key: &str) -> Option<Vec<T>> {
    let raw = load_value(store, key).await?;
    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(rules) if rules.is_empty() => None,
        Ok(rules) => Some(rules),
        Err(e) => {
            tracing::warn!(error = %e, key, "Ignoring unreadable saved rules");
            None
        }
    }
}

async fn load_value<S: Store>(store: &S, key: &str) -> Option<String> {
    match store.load(key).await {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, key, "Failed to load setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_load_installs_defaults_on_empty_store() {
        let store = MemoryStore::new();
        let settings = RuleSettings::load(&store).await;

        assert!(settings.is_loaded());
        assert_eq!(settings.level_rules[0].id, "default-levels");
        assert_eq!(settings.role_rules[0].id, "default-roles");
        assert!(!settings.dark_mode);
    }

    #[tokio::test]
    async fn test_empty_persisted_array_treated_as_absent() {
        let store = MemoryStore::new();
        store.save(LEVEL_RULES_KEY, "[]").await.unwrap();

        let settings = RuleSettings::load(&store).await;
        assert_eq!(settings.level_rules, default_level_rules());
    }

    #[tokio::test]
    async fn test_unreadable_category_falls_back_to_defaults() {
        let store = MemoryStore::new();
        store.save(TAG_RULES_KEY, "{broken").await.unwrap();

        let settings = RuleSettings::load(&store).await;
        assert_eq!(settings.tag_rules, default_tag_rules());
    }

    #[tokio::test]
    async fn test_saved_rules_round_trip() {
        let store = MemoryStore::new();
        let mut settings = RuleSettings::load(&store).await;

        let mut custom = LevelRuleSet::new("custom");
        custom.enabled = true;
        let custom_id = custom.id.clone();
        settings
            .replace_level_rules(&store, vec![custom, LevelRuleSet::new("other")])
            .await;

        let reloaded = RuleSettings::load(&store).await;
        assert_eq!(reloaded.level_rules.len(), 2);
        assert_eq!(reloaded.level_rules[0].id, custom_id);
        assert!(reloaded.level_rules[0].enabled);
    }

    #[tokio::test]
    async fn test_enable_level_rule_is_exclusive() {
        let store = MemoryStore::new();
        let mut settings = RuleSettings::load(&store).await;

        let second = LevelRuleSet::new("second");
        let second_id = second.id.clone();
        settings.level_rules.push(second);

        assert!(settings.enable_level_rule(&store, &second_id).await);
        let enabled: Vec<&str> = settings
            .level_rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(enabled, vec![second_id.as_str()]);
    }

    #[tokio::test]
    async fn test_enable_unknown_id_changes_nothing() {
        let store = MemoryStore::new();
        let mut settings = RuleSettings::load(&store).await;
        let before = settings.level_rules.clone();

        assert!(!settings.enable_level_rule(&store, "no-such-id").await);
        assert_eq!(settings.level_rules, before);
    }

    #[tokio::test]
    async fn test_disable_active_rule_leaves_none_enabled() {
        let store = MemoryStore::new();
        let mut settings = RuleSettings::load(&store).await;

        assert!(settings.disable_level_rule(&store, "default-levels").await);
        assert!(settings.level_rules.iter().all(|r| !r.enabled));
    }

    #[tokio::test]
    async fn test_replace_level_rules_keeps_single_enabled() {
        let store = MemoryStore::new();
        let mut settings = RuleSettings::load(&store).await;

        let mut a = LevelRuleSet::new("a");
        a.enabled = true;
        let mut b = LevelRuleSet::new("b");
        b.enabled = true;
        let a_id = a.id.clone();

        settings.replace_level_rules(&store, vec![a, b]).await;
        let enabled: Vec<&str> = settings
            .level_rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(enabled, vec![a_id.as_str()]);
    }

    #[tokio::test]
    async fn test_mutations_before_load_are_not_persisted() {
        let store = MemoryStore::new();
        let mut settings = RuleSettings::defaults();
        assert!(!settings.is_loaded());

        settings.set_dark_mode(&store, true).await;
        settings
            .set_role_rule_enabled(&store, "default-roles", false)
            .await;

        // In-memory state changed, the Store did not
        assert!(settings.dark_mode);
        assert_eq!(store.load(DARK_MODE_KEY).await.unwrap(), None);
        assert_eq!(store.load(ROLE_RULES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dark_mode_round_trip() {
        let store = MemoryStore::new();
        let mut settings = RuleSettings::load(&store).await;

        settings.set_dark_mode(&store, true).await;
        let reloaded = RuleSettings::load(&store).await;
        assert!(reloaded.dark_mode);
    }
}
