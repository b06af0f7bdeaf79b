//! End-to-end tests over the ingest-to-persistence pipeline: normalization,
//! accumulation, flush triggers, settings lifecycle, and the filesystem
//! store working together.

use loglens_core::accumulator::Accumulator;
use loglens_core::classify::{classify_level, classify_pattern};
use loglens_core::logging;
use loglens_core::normalize::normalize;
use loglens_core::query::{evaluate, FieldFilter, FilterOperator, QuerySpec, SortDirection};
use loglens_core::rules::{default_role_rules, LevelMapping, LevelRuleSet};
use loglens_core::settings::{RuleSettings, DARK_MODE_KEY, LEVEL_RULES_KEY};
use loglens_core::store::{FsStore, MemoryStore, Store};
use loglens_core::types::FieldKey;
use tempfile::TempDir;

fn payload(i: usize) -> String {
    format!(
        r#"{{"role":"user","label":"raw","level":1,"line":{},"messages":["event {}"]}}"#,
        i, i
    )
}

#[tokio::test]
async fn test_hundredth_append_flushes_exactly_once() {
    logging::init_test();
    let store = MemoryStore::new();
    let mut acc = Accumulator::new(store);

    for i in 0..99 {
        assert!(!acc.append(normalize(&payload(i))));
    }
    assert!(acc.append(normalize(&payload(99))), "100th append must arm the flush");
    assert!(acc.flush().await);

    // One save, carrying the full 100-record snapshot
    assert_eq!(acc.store().batch_save_sizes(), vec![100]);

    // The 101st append does not re-fire the size trigger
    assert!(!acc.append(normalize(&payload(100))));
    assert_eq!(acc.store().batch_save_count(), 1);
}

#[tokio::test]
async fn test_flush_writes_total_state_not_a_delta() {
    let store = MemoryStore::new();
    let mut acc = Accumulator::with_threshold(store, 3);

    for i in 0..3 {
        acc.append(normalize(&payload(i)));
    }
    acc.flush().await;
    for i in 3..6 {
        acc.append(normalize(&payload(i)));
    }
    acc.flush().await;

    // Second flush persisted all six records, superseding the first batch
    assert_eq!(acc.store().batch_save_sizes(), vec![3, 6]);
    assert_eq!(acc.store().load_batch().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_clear_empties_memory_even_when_store_fails() {
    let store = MemoryStore::new();
    let mut acc = Accumulator::new(store);

    acc.append(normalize(&payload(0)));
    acc.flush().await;

    acc.store().fail_batch_clears(true);
    assert!(!acc.clear().await);
    assert!(acc.is_empty());

    // The persisted batch survives and is visible again after hydrate
    acc.store().fail_batch_clears(false);
    let loaded = acc.hydrate().await.unwrap();
    assert_eq!(loaded, 1);
}

#[tokio::test]
async fn test_fs_store_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let mut acc = Accumulator::with_threshold(FsStore::new(dir.path()), 2);
        acc.append(normalize(&payload(0)));
        acc.append(normalize(&payload(1)));
        assert!(acc.flush().await);
    }

    // A fresh accumulator over the same directory sees the batch
    let mut acc = Accumulator::new(FsStore::new(dir.path()));
    assert_eq!(acc.hydrate().await.unwrap(), 2);
    assert_eq!(acc.snapshot()[1].line, 1);
    assert_eq!(acc.snapshot()[1].messages, vec!["event 1".to_string()]);
}

#[tokio::test]
async fn test_settings_mutations_before_load_never_persist() {
    let store = MemoryStore::new();

    let mut unloaded = RuleSettings::defaults();
    unloaded.set_dark_mode(&store, true).await;
    unloaded
        .replace_level_rules(&store, vec![LevelRuleSet::new("stray")])
        .await;

    assert_eq!(store.load(DARK_MODE_KEY).await.unwrap(), None);
    assert_eq!(store.load(LEVEL_RULES_KEY).await.unwrap(), None);

    // After load the same mutations do persist
    let mut loaded = RuleSettings::load(&store).await;
    loaded.set_dark_mode(&store, true).await;
    assert_eq!(
        store.load(DARK_MODE_KEY).await.unwrap().as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn test_settings_lifecycle_through_fs_store() {
    let dir = TempDir::new().unwrap();
    let store = FsStore::new(dir.path());

    let mut settings = RuleSettings::load(&store).await;
    let mut custom = LevelRuleSet::new("quiet");
    custom.mappings = vec![LevelMapping {
        level: 0,
        name: "NOISE".to_string(),
        color: "#555555".to_string(),
    }];
    custom.enabled = true;
    let custom_id = custom.id.clone();
    settings
        .replace_level_rules(&store, vec![custom, LevelRuleSet::new("spare")])
        .await;
    settings.set_dark_mode(&store, true).await;

    let reloaded = RuleSettings::load(&store).await;
    assert!(reloaded.dark_mode);
    assert_eq!(reloaded.level_rules[0].id, custom_id);

    // The enabled custom set drives classification; unknown levels still
    // fall through to the builtin table
    let style = classify_level(0, &reloaded.level_rules);
    assert_eq!(style.name, "NOISE");
    let style = classify_level(3, &reloaded.level_rules);
    assert_eq!(style.name, "ERROR");
}

#[tokio::test]
async fn test_enable_level_rule_persists_exclusivity() {
    let store = MemoryStore::new();
    let mut settings = RuleSettings::load(&store).await;

    let second = LevelRuleSet::new("alt");
    let second_id = second.id.clone();
    settings.level_rules.push(second);
    settings.enable_level_rule(&store, &second_id).await;

    let reloaded = RuleSettings::load(&store).await;
    let enabled: Vec<&str> = reloaded
        .level_rules
        .iter()
        .filter(|r| r.enabled)
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(enabled, vec![second_id.as_str()]);
}

#[tokio::test]
async fn test_query_over_hydrated_records() {
    let dir = TempDir::new().unwrap();

    {
        let mut acc = Accumulator::new(FsStore::new(dir.path()));
        acc.append(normalize(
            r#"{"role":"admin","level":3,"time":2,"messages":["denied"]}"#,
        ));
        acc.append(normalize(
            r#"{"role":"user","level":1,"time":1,"messages":["ok"]}"#,
        ));
        acc.flush().await;
    }

    let mut acc = Accumulator::new(FsStore::new(dir.path()));
    acc.hydrate().await.unwrap();

    let spec = QuerySpec {
        search_text: String::new(),
        filters: vec![FieldFilter {
            field: FieldKey::Role,
            operator: FilterOperator::Equals,
            value: "admin".to_string(),
        }],
        sort_field: FieldKey::Level,
        sort_direction: SortDirection::Desc,
    };
    let result = evaluate(acc.snapshot(), &spec);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].joined_messages(), "denied");

    // Pattern classification applies to the hydrated records too
    let rules = default_role_rules();
    let color = classify_pattern(&result[0].role, &rules);
    assert_eq!(color, Some("#ff5722"));
}

#[tokio::test]
async fn test_malformed_payloads_still_reach_the_store() {
    let store = MemoryStore::new();
    let mut acc = Accumulator::with_threshold(store, 2);

    acc.append(normalize("plain text line"));
    acc.append(normalize(r#"{"level":2,"messages":["fine"]}"#));
    assert!(acc.flush().await);

    let batch = acc.store().load_batch().await.unwrap();
    assert_eq!(batch.len(), 2);
    assert!(batch[0].contains("plain text line"));
    assert!(batch[0].contains("\"label\":\"raw\""));
}
