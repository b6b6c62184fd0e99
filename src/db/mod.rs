//! Database Module
//!
//! SQLite 아카이브 관리. 모든 SQL은 이 모듈에만 존재합니다.

mod schema;

use std::path::Path;
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::archive::hasher::{short_hash, snapshot_hash};
use crate::archive::keys::{normalize, EntryLookup, FileScope, KeyMatch};
use crate::error::ArchiveError;
use crate::models::{LanguageStat, ModRecord, SourceFile, VersionRecord, VersionSummary};

/// 현재 버전의 소스 항목 행
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntryRow {
    pub source_entry_id: i64,
    pub entry_key: String,
    pub source_text: String,
}

/// 번역 upsert 한 건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUpsert {
    pub source_entry_id: i64,
    pub translated_text: String,
}

/// create_source_version 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub version_id: i64,
    /// false면 같은 해시의 기존 버전을 재사용
    pub created: bool,
    pub entries_written: usize,
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 데이터베이스 래퍼
pub struct Database {
    conn: Connection,
}

impl Database {
    /// 새 데이터베이스 연결 생성 (WAL + busy_timeout)
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.configure(busy_timeout)?;
        Ok(db)
    }

    /// 메모리 DB (테스트/일회성 비교용)
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.configure(Duration::from_millis(0))?;
        Ok(db)
    }

    fn configure(&self, busy_timeout: Duration) -> Result<(), rusqlite::Error> {
        // journal_mode는 결과 행을 반환하므로 execute_batch로 처리
        self.conn.execute_batch(schema::CONNECTION_PRAGMAS)?;
        self.conn.busy_timeout(busy_timeout)?;
        debug!(busy_timeout_ms = busy_timeout.as_millis() as u64, "SQLite pragmas configured (WAL)");
        Ok(())
    }

    /// 데이터베이스 스키마 초기화 및 레거시 컬럼 보강
    pub fn initialize(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        self.migrate_legacy_columns()?;
        Ok(())
    }

    fn migrate_legacy_columns(&self) -> Result<(), rusqlite::Error> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(source_entries)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        if !columns.iter().any(|c| c == "file_path") {
            self.conn
                .execute("ALTER TABLE source_entries ADD COLUMN file_path TEXT DEFAULT ''", [])?;
            info!("Migrated legacy source_entries: added file_path column");
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// 쓰기 트랜잭션 시작 (IMMEDIATE: 시작 시점에 쓰기 락 획득, busy_timeout 동안 대기)
    fn begin_write(&self) -> Result<Transaction<'_>, rusqlite::Error> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
    }

    // ---- mods ----

    pub fn get_mod_by_name(&self, name: &str) -> Result<Option<ModRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT mod_id, name, last_updated FROM mods WHERE name = ?1",
                [name],
                |row| {
                    Ok(ModRecord {
                        mod_id: row.get(0)?,
                        name: row.get(1)?,
                        last_updated: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn find_mod_by_remote_id(&self, remote_id: &str) -> Result<Option<ModRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT m.mod_id, m.name, m.last_updated
                 FROM mod_identities i JOIN mods m ON i.mod_id = m.mod_id
                 WHERE i.remote_file_id = ?1",
                [remote_id],
                |row| {
                    Ok(ModRecord {
                        mod_id: row.get(0)?,
                        name: row.get(1)?,
                        last_updated: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    /// 이름으로 모드 조회, 없으면 생성 (remote_id는 생성 시에만 별칭으로 연결)
    pub fn get_or_create_mod(&self, name: &str, remote_id: Option<&str>) -> Result<i64, rusqlite::Error> {
        if let Some(existing) = self.get_mod_by_name(name)? {
            return Ok(existing.mod_id);
        }

        let tx = self.begin_write()?;
        // 다른 연결이 먼저 만들었을 수 있으므로 OR IGNORE 후 재조회
        tx.execute(
            "INSERT OR IGNORE INTO mods (name, last_updated) VALUES (?1, ?2)",
            params![name, now_millis()],
        )?;
        let mod_id: i64 = tx.query_row("SELECT mod_id FROM mods WHERE name = ?1", [name], |row| {
            row.get(0)
        })?;

        if let Some(remote_id) = remote_id.filter(|r| !r.trim().is_empty()) {
            tx.execute(
                "INSERT OR IGNORE INTO mod_identities (mod_id, remote_file_id) VALUES (?1, ?2)",
                params![mod_id, remote_id],
            )?;
        }

        tx.commit()?;
        debug!(mod_id, name, "mod entry ready");
        Ok(mod_id)
    }

    // ---- versions ----

    pub fn find_version_by_hash(&self, snapshot_hash: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT version_id FROM source_versions WHERE snapshot_hash = ?1",
                [snapshot_hash],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn latest_version(&self, mod_id: i64) -> Result<Option<VersionRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT version_id, mod_id, snapshot_hash, created_at FROM source_versions
                 WHERE mod_id = ?1 ORDER BY created_at DESC, version_id DESC LIMIT 1",
                [mod_id],
                version_from_row,
            )
            .optional()
    }

    /// 소스 스냅샷 생성. 같은 해시가 이미 있으면 (모드와 무관하게) 그 버전을 반환
    pub fn create_source_version(
        &self,
        mod_id: i64,
        files: &[SourceFile],
    ) -> Result<SnapshotOutcome, rusqlite::Error> {
        let hash = snapshot_hash(files);

        if let Some(version_id) = self.find_version_by_hash(&hash)? {
            info!(hash = short_hash(&hash), version_id, "source version already exists");
            return Ok(SnapshotOutcome {
                version_id,
                created: false,
                entries_written: 0,
            });
        }

        let tx = self.begin_write()?;

        // 락 대기 중 다른 연결이 같은 스냅샷을 만들었을 수 있음
        let raced: Option<i64> = tx
            .query_row(
                "SELECT version_id FROM source_versions WHERE snapshot_hash = ?1",
                [&hash],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(version_id) = raced {
            return Ok(SnapshotOutcome {
                version_id,
                created: false,
                entries_written: 0,
            });
        }

        let now = now_millis();
        tx.execute(
            "INSERT INTO source_versions (mod_id, snapshot_hash, created_at) VALUES (?1, ?2, ?3)",
            params![mod_id, &hash, now],
        )?;
        let version_id = tx.last_insert_rowid();

        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO source_entries (version_id, entry_key, source_text, file_path)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for file in files {
                for (key_info, text) in file.key_map.iter().zip(&file.texts_to_translate) {
                    written += stmt.execute(params![
                        version_id,
                        normalize(&key_info.key_part),
                        text,
                        &file.filename
                    ])?;
                }
            }
        }

        tx.execute(
            "UPDATE mods SET last_updated = ?1 WHERE mod_id = ?2",
            params![now, mod_id],
        )?;
        tx.commit()?;

        info!(version_id, mod_id, hash = short_hash(&hash), "created source version");
        info!(count = written, version_id, "archived source entries");
        Ok(SnapshotOutcome {
            version_id,
            created: true,
            entries_written: written,
        })
    }

    pub fn list_versions(&self, mod_id: i64) -> Result<Vec<VersionSummary>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT version_id, mod_id, snapshot_hash, created_at FROM source_versions
             WHERE mod_id = ?1 ORDER BY created_at DESC, version_id DESC",
        )?;
        let versions = stmt
            .query_map([mod_id], version_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut count_stmt = self
            .conn
            .prepare("SELECT count(*) FROM source_entries WHERE version_id = ?1")?;
        let mut files_stmt = self.conn.prepare(
            "SELECT DISTINCT COALESCE(file_path, '') FROM source_entries
             WHERE version_id = ?1 ORDER BY 1",
        )?;

        let mut out = Vec::with_capacity(versions.len());
        for version in versions {
            let entry_count: i64 = count_stmt.query_row([version.version_id], |row| row.get(0))?;
            let files = files_stmt
                .query_map([version.version_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            out.push(VersionSummary {
                version,
                entry_count: entry_count as usize,
                files,
            });
        }
        Ok(out)
    }

    pub fn translation_stats(&self, version_id: i64) -> Result<Vec<LanguageStat>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT t.language_code, count(*)
             FROM translated_entries t
             JOIN source_entries s ON t.source_entry_id = s.source_entry_id
             WHERE s.version_id = ?1
             GROUP BY t.language_code ORDER BY t.language_code",
        )?;
        let iter = stmt.query_map([version_id], |row| {
            let translated: i64 = row.get(1)?;
            Ok(LanguageStat {
                language_code: row.get(0)?,
                translated: translated as usize,
            })
        })?;
        iter.collect()
    }

    // ---- entries ----

    pub fn source_entries_for_file(
        &self,
        version_id: i64,
        file_path: &str,
    ) -> Result<Vec<SourceEntryRow>, rusqlite::Error> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT source_entry_id, entry_key, source_text FROM source_entries
             WHERE version_id = ?1 AND file_path = ?2 ORDER BY source_entry_id",
        )?;
        let iter = stmt.query_map(params![version_id, file_path], |row| {
            Ok(SourceEntryRow {
                source_entry_id: row.get(0)?,
                entry_key: row.get(1)?,
                source_text: row.get(2)?,
            })
        })?;
        iter.collect()
    }

    /// 모드의 모든 버전에서 (file_path, language)에 해당하는 번역을 오래된 순으로 조회
    pub fn translation_history_for_file(
        &self,
        mod_id: i64,
        file_path: &str,
        language: &str,
    ) -> Result<Vec<(String, String)>, rusqlite::Error> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT s.entry_key, t.translated_text
             FROM translated_entries t
             JOIN source_entries s ON t.source_entry_id = s.source_entry_id
             JOIN source_versions v ON s.version_id = v.version_id
             WHERE v.mod_id = ?1 AND s.file_path = ?2 AND t.language_code = ?3
             ORDER BY t.last_translated_at ASC, t.translated_entry_id ASC",
        )?;
        let iter = stmt.query_map(params![mod_id, file_path, language], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        iter.collect()
    }

    /// 조회 조건 하나로 소스 항목 ID 검색. 첫 번째 일치 항목 반환
    pub fn find_source_entry(
        &self,
        version_id: i64,
        lookup: &EntryLookup,
    ) -> Result<Option<i64>, rusqlite::Error> {
        let (key_clause, key_param) = match &lookup.key {
            KeyMatch::Exact(key) => ("entry_key = ?2", key.clone()),
            KeyMatch::AnyRevisionOf(base) => {
                ("substr(entry_key, 1, length(?2)) = ?2", format!("{}:", base))
            }
        };
        let file_clause = match &lookup.file {
            FileScope::Exact(_) => "file_path = ?3",
            FileScope::Legacy => "(file_path = '' OR file_path IS NULL)",
            FileScope::ExactOrLegacy(_) => "(file_path = ?3 OR file_path = '' OR file_path IS NULL)",
        };
        let file_param = match &lookup.file {
            FileScope::Exact(f) | FileScope::ExactOrLegacy(f) => f.as_str(),
            FileScope::Legacy => "",
        };

        // ?3은 정렬식에서 항상 참조되므로 파라미터 개수가 고정됨
        let sql = format!(
            "SELECT source_entry_id, entry_key FROM source_entries
             WHERE version_id = ?1 AND {} AND {}
             ORDER BY (file_path = ?3) DESC, source_entry_id ASC",
            key_clause, file_clause
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params![version_id, key_param, file_param])?;
        while let Some(row) = rows.next()? {
            let entry_key: String = row.get(1)?;
            if lookup.key.matches(&entry_key) {
                return Ok(Some(row.get(0)?));
            }
        }
        Ok(None)
    }

    /// 번역 upsert (하나의 트랜잭션)
    pub fn upsert_translations(
        &self,
        language: &str,
        rows: &[TranslationUpsert],
    ) -> Result<usize, rusqlite::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let tx = self.begin_write()?;
        let now = now_millis();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO translated_entries
                     (source_entry_id, language_code, translated_text, last_translated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(source_entry_id, language_code) DO UPDATE SET
                     translated_text = excluded.translated_text,
                     last_translated_at = excluded.last_translated_at",
            )?;
            for row in rows {
                stmt.execute(params![row.source_entry_id, language, &row.translated_text, now])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    // ---- backup ----

    /// 현재 아카이브를 파일로 내보내기
    pub fn export_to_file(&self, out_path: &Path) -> Result<(), ArchiveError> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out_conn = Connection::open(out_path)?;
        out_conn.execute_batch(schema::CREATE_SCHEMA)?;

        let backup = Backup::new(&self.conn, &mut out_conn)?;
        backup.run_to_completion(5, Duration::from_millis(10), None)?;
        Ok(())
    }

    /// 파일(스켈레톤 아카이브 등)을 현재 아카이브로 가져오기 (현재 내용을 덮어씀)
    pub fn import_from_file(&mut self, in_path: &Path) -> Result<(), ArchiveError> {
        if !in_path.exists() {
            return Err(ArchiveError::InvalidInput(format!(
                "archive file not found: {}",
                in_path.display()
            )));
        }
        let in_conn = Connection::open(in_path)?;

        let backup = Backup::new(&in_conn, &mut self.conn)?;
        backup.run_to_completion(5, Duration::from_millis(10), None)?;
        drop(backup);

        // 오래된 스켈레톤일 수 있으므로 스키마 보강
        self.initialize()?;
        Ok(())
    }
}

fn version_from_row(row: &rusqlite::Row<'_>) -> Result<VersionRecord, rusqlite::Error> {
    Ok(VersionRecord {
        version_id: row.get(0)?,
        mod_id: row.get(1)?,
        snapshot_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}
