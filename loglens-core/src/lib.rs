//! # loglens-core
//!
//! Core library for loglens - a structured log viewer engine.
//!
//! This library provides:
//! - Record normalization from raw ingest payloads
//! - Level and pattern classifiers driven by user-editable rule sets
//! - A query engine (full-text search, field filters, typed sort)
//! - A stream accumulator with size and interval flush triggers
//! - Persistence and ingest boundaries as traits ([`Store`], [`Transport`])
//!
//! ## Architecture
//!
//! Payloads flow one way:
//! - **Transport:** receives raw payloads and forwards them verbatim
//! - **Normalizer:** turns any payload into a well-formed [`Record`]
//! - **Accumulator:** owns the append-only sequence and flushes it to the Store
//! - **Classifiers / queries:** pure reads over the accumulator's snapshot
//!
//! ## Example
//!
//! ```rust,no_run
//! use loglens_core::{normalize, Accumulator, FsStore, QuerySpec};
//!
//! # async fn run() {
//! let store = FsStore::new("/tmp/loglens");
//! let mut acc = Accumulator::new(store);
//!
//! if acc.append(normalize(r#"{"level":1,"messages":["hello"]}"#)) {
//!     acc.flush().await;
//! }
//!
//! let visible = loglens_core::query::evaluate(acc.snapshot(), &QuerySpec::default());
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use accumulator::{Accumulator, FlushStats, DEFAULT_FLUSH_THRESHOLD};
pub use classify::{classify_level, classify_pattern, LevelStyle};
pub use config::Config;
pub use error::{Error, Result};
pub use highlight::{apply_highlight_rules, HighlightRule, HighlightStyle};
pub use normalize::normalize;
pub use query::{evaluate, field_suggestions, FieldFilter, QuerySpec, SortDirection};
pub use rules::{LevelRuleSet, PatternRuleSet};
pub use settings::RuleSettings;
pub use store::{FsStore, MemoryStore, Store};
pub use transport::{RawPayloadSender, Transport};
pub use types::*;

// Public modules
pub mod accumulator;
pub mod classify;
pub mod config;
pub mod error;
pub mod highlight;
pub mod logging;
pub mod normalize;
pub mod query;
pub mod rules;
pub mod settings;
pub mod store;
pub mod transport;
pub mod types;
