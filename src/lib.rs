//! Localization Archive - 번역 아카이브 라이브러리
//!
//! 모드 로컬라이제이션의 모든 소스 버전과 번역을 SQLite에 보관하고,
//! 재스캔 시 새/변경/동일 항목을 구분해 변경분만 다시 번역하도록 돕습니다.
//! 파일 파싱, 번역 호출, 파일 쓰기는 외부 협력자가 담당합니다.

pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use archive::{
    import_existing_translations, run_incremental_update, ArchiveStore, DiffEngine, Translator,
};
pub use config::ArchiveConfig;
pub use error::{ArchiveError, ArchiveResult, ErrorPayload};
pub use models::{ArchivedEntry, FileResults, KeyInfo, SourceFile, TranslationUpdate};
