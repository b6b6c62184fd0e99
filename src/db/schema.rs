//! Database Schema
//!
//! 아카이브 SQLite 테이블 스키마 정의

/// 연결 직후 적용하는 PRAGMA (busy_timeout은 설정값으로 별도 적용)
pub const CONNECTION_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;
"#;

/// 데이터베이스 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 모드 테이블 (name이 중복 판정 기준)
CREATE TABLE IF NOT EXISTS mods (
    mod_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    last_updated INTEGER NOT NULL
);

-- 외부 시스템 별칭 (조회 보조용, 권위 없음)
CREATE TABLE IF NOT EXISTS mod_identities (
    identity_id INTEGER PRIMARY KEY AUTOINCREMENT,
    mod_id INTEGER NOT NULL,
    remote_file_id TEXT NOT NULL UNIQUE,
    FOREIGN KEY (mod_id) REFERENCES mods(mod_id)
);

-- 소스 스냅샷 (snapshot_hash는 모드와 무관하게 전역 유일)
CREATE TABLE IF NOT EXISTS source_versions (
    version_id INTEGER PRIMARY KEY AUTOINCREMENT,
    mod_id INTEGER NOT NULL,
    snapshot_hash TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (mod_id) REFERENCES mods(mod_id)
);

CREATE INDEX IF NOT EXISTS idx_versions_mod ON source_versions(mod_id, created_at);

-- 소스 항목
CREATE TABLE IF NOT EXISTS source_entries (
    source_entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL,
    entry_key TEXT NOT NULL,
    source_text TEXT NOT NULL,
    file_path TEXT DEFAULT '',
    UNIQUE(version_id, file_path, entry_key),
    FOREIGN KEY (version_id) REFERENCES source_versions(version_id)
);

-- 번역 항목
CREATE TABLE IF NOT EXISTS translated_entries (
    translated_entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_entry_id INTEGER NOT NULL,
    language_code TEXT NOT NULL,
    translated_text TEXT NOT NULL,
    last_translated_at INTEGER NOT NULL,
    UNIQUE(source_entry_id, language_code),
    FOREIGN KEY (source_entry_id) REFERENCES source_entries(source_entry_id)
);

CREATE INDEX IF NOT EXISTS idx_translated_lang ON translated_entries(language_code);
"#;

/// file_path 컬럼이 생기기 전의 source_entries (마이그레이션 테스트용)
#[cfg(test)]
pub const LEGACY_SOURCE_ENTRIES: &str = r#"
CREATE TABLE source_entries (
    source_entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL,
    entry_key TEXT NOT NULL,
    source_text TEXT NOT NULL,
    UNIQUE(version_id, entry_key)
);
"#;
