//! Translation Archive
//!
//! 모드별 소스 스냅샷과 번역 메모리, 증분 비교 엔진

pub mod deep_search;
pub mod diff;
pub mod hasher;
pub mod import;
pub mod keys;
pub mod store;
pub mod update;

pub use deep_search::DeepSearchResolver;
pub use diff::{DiffEngine, DiffPlan, DiffSummary, EntryStatus, MergedSet};
pub use hasher::snapshot_hash;
pub use import::{import_existing_translations, ImportReport, TranslationFile};
pub use keys::{normalize, KeyResolver, ResolveStrategy};
pub use store::ArchiveStore;
pub use update::{run_incremental_update, Translator, UpdateOutcome};
