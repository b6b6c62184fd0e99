//! Archive Store
//!
//! 아카이브 읽기/쓰기의 단일 진입점. 전역 인스턴스 없이 핸들을 명시적으로 넘겨 사용합니다.
//!
//! - 첫 호출에서 DB를 열고(lazy), 실패하면 "준비 안 됨" 상태로 남아 다음 호출에서 재시도
//! - `close()` 이후의 호출은 [`ArchiveError::StoreClosed`]
//! - 같은 파일에 핸들을 여러 개 열면 WAL 덕분에 읽기는 막히지 않고 쓰기는 하나씩 진행

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::archive::deep_search::{basename, DeepSearchResolver};
use crate::archive::keys::{normalize, KeyResolver};
use crate::config::ArchiveConfig;
use crate::db::{Database, SnapshotOutcome, TranslationUpsert};
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{
    ArchiveReport, ArchivedEntry, FileResults, LanguageStat, ModRecord, SourceFile,
    TranslationUpdate, UnresolvedKey, VersionRecord, VersionSummary,
};

/// 파일 이름 -> 위치별 번역 (None은 건너뜀)
pub(crate) type AlignedResults = BTreeMap<String, Vec<Option<String>>>;

enum StoreState {
    NotReady,
    Ready(Database),
    Closed,
}

/// 아카이브 핸들
pub struct ArchiveStore {
    config: ArchiveConfig,
    state: Mutex<StoreState>,
}

impl ArchiveStore {
    /// 핸들 생성. 실제 연결은 첫 작업에서 열립니다
    pub fn new(config: ArchiveConfig) -> Self {
        Self {
            config,
            state: Mutex::new(StoreState::NotReady),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(ArchiveConfig::with_db_path(path.as_ref()))
    }

    /// 메모리 아카이브 (핸들 하나에서만 보임)
    pub fn in_memory() -> Self {
        Self::open(":memory:")
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    fn lock(&self) -> ArchiveResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|e| ArchiveError::LockPoisoned(e.to_string()))
    }

    fn connect(&self) -> ArchiveResult<Database> {
        let path = &self.config.db_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let unavailable = |source| ArchiveError::StoreUnavailable {
            path: path.clone(),
            source,
        };
        let db = Database::open(path, self.config.busy_timeout()).map_err(unavailable)?;
        db.initialize().map_err(unavailable)?;

        info!(path = %path.display(), "archive connected");
        Ok(db)
    }

    /// 연결을 보장한 뒤 작업 실행
    fn with_db<T>(&self, f: impl FnOnce(&mut Database) -> ArchiveResult<T>) -> ArchiveResult<T> {
        let mut state = self.lock()?;
        if matches!(*state, StoreState::NotReady) {
            *state = StoreState::Ready(self.connect()?);
        }
        match &mut *state {
            StoreState::Ready(db) => f(db),
            _ => Err(ArchiveError::StoreClosed),
        }
    }

    /// 연결이 열려 있는지 여부 (열기를 시도하지 않음)
    pub fn is_ready(&self) -> bool {
        self.lock()
            .map(|state| matches!(*state, StoreState::Ready(_)))
            .unwrap_or(false)
    }

    /// 연결 해제
    pub fn close(&self) -> ArchiveResult<()> {
        let mut state = self.lock()?;
        if let StoreState::Ready(_) = std::mem::replace(&mut *state, StoreState::Closed) {
            info!(path = %self.config.db_path.display(), "archive connection closed");
        }
        Ok(())
    }

    // ---- mods / versions ----

    /// 이름으로 모드를 찾거나 생성 (이름이 중복 판정 기준, remote_id는 별칭)
    pub fn get_or_create_mod(&self, name: &str, remote_id: Option<&str>) -> ArchiveResult<i64> {
        if name.trim().is_empty() {
            return Err(ArchiveError::InvalidInput("mod name must not be empty".into()));
        }
        self.with_db(|db| Ok(db.get_or_create_mod(name, remote_id)?))
    }

    pub fn get_mod(&self, name: &str) -> ArchiveResult<Option<ModRecord>> {
        self.with_db(|db| Ok(db.get_mod_by_name(name)?))
    }

    /// 별칭으로 모드 조회 (보조용. 이름이 권위)
    pub fn find_mod_by_remote_id(&self, remote_id: &str) -> ArchiveResult<Option<ModRecord>> {
        self.with_db(|db| Ok(db.find_mod_by_remote_id(remote_id)?))
    }

    pub fn latest_version(&self, mod_name: &str) -> ArchiveResult<Option<VersionRecord>> {
        self.with_db(|db| {
            let Some(record) = db.get_mod_by_name(mod_name)? else {
                return Ok(None);
            };
            Ok(db.latest_version(record.mod_id)?)
        })
    }

    /// 소스 스냅샷 생성 (같은 내용이면 기존 version_id)
    pub fn create_source_version(&self, mod_id: i64, files: &[SourceFile]) -> ArchiveResult<i64> {
        Ok(self.snapshot(mod_id, files)?.version_id)
    }

    /// create_source_version과 같지만 새로 만들었는지 여부도 반환
    pub fn snapshot(&self, mod_id: i64, files: &[SourceFile]) -> ArchiveResult<SnapshotOutcome> {
        for file in files.iter().filter(|f| f.is_misaligned()) {
            warn!(
                filename = %file.filename,
                keys = file.key_map.len(),
                texts = file.texts_to_translate.len(),
                "key_map and texts differ in length; extra items are ignored"
            );
        }
        self.with_db(|db| Ok(db.create_source_version(mod_id, files)?))
    }

    pub fn list_versions(&self, mod_name: &str) -> ArchiveResult<Vec<VersionSummary>> {
        self.with_db(|db| match db.get_mod_by_name(mod_name)? {
            Some(record) => Ok(db.list_versions(record.mod_id)?),
            None => Ok(Vec::new()),
        })
    }

    pub fn translation_stats(&self, version_id: i64) -> ArchiveResult<Vec<LanguageStat>> {
        self.with_db(|db| Ok(db.translation_stats(version_id)?))
    }

    // ---- translations ----

    /// 번역 결과를 해당 버전의 소스 항목에 바인딩해 upsert
    ///
    /// `results`의 각 번역문 목록은 같은 이름의 소스 파일 key_map 순서를 따릅니다.
    /// 키를 찾지 못한 항목은 건너뛰고 리포트에 남깁니다.
    pub fn archive_translated_results(
        &self,
        version_id: i64,
        results: &FileResults,
        files: &[SourceFile],
        language: &str,
    ) -> ArchiveResult<ArchiveReport> {
        let aligned: AlignedResults = results
            .iter()
            .map(|(filename, texts)| {
                (filename.clone(), texts.iter().cloned().map(Some).collect())
            })
            .collect();
        self.archive_aligned(version_id, &aligned, files, language)
    }

    pub(crate) fn archive_aligned(
        &self,
        version_id: i64,
        results: &AlignedResults,
        files: &[SourceFile],
        language: &str,
    ) -> ArchiveResult<ArchiveReport> {
        self.with_db(|db| {
            let resolver = KeyResolver::new(db);
            let mut report = ArchiveReport::default();
            let mut upserts = Vec::new();

            for (filename, translated) in results {
                if translated.is_empty() {
                    continue;
                }
                let Some(file) = files.iter().find(|f| &f.filename == filename) else {
                    warn!(filename = %filename, "translation results for unknown file");
                    report.unknown_files.push(filename.clone());
                    continue;
                };
                if translated.len() != file.key_map.len() {
                    warn!(
                        filename = %filename,
                        keys = file.key_map.len(),
                        translations = translated.len(),
                        "translation count differs from key count"
                    );
                }

                for (key_info, text) in file.key_map.iter().zip(translated) {
                    let Some(text) = text else { continue };
                    match resolver.resolve(version_id, filename, &key_info.key_part)? {
                        Some(found) => upserts.push(TranslationUpsert {
                            source_entry_id: found.source_entry_id,
                            translated_text: text.clone(),
                        }),
                        None => report.unresolved.push(UnresolvedKey {
                            filename: filename.clone(),
                            key: normalize(&key_info.key_part),
                        }),
                    }
                }
            }

            report.archived = db.upsert_translations(language, &upserts)?;
            if report.skipped() > 0 {
                warn!(
                    skipped = report.skipped(),
                    version_id, language, "translations dropped: source entries not found"
                );
            }
            info!(count = report.archived, language, "archived translations");
            Ok(report)
        })
    }

    /// 에디터 직접 수정 반영. 최신 버전에서 정확한 (file_path, key)만 갱신
    ///
    /// 반환값은 upsert된 행 수. 모드/버전/키가 없으면 해당 항목은 무시됩니다.
    pub fn update_translations(
        &self,
        mod_name: &str,
        file_path: &str,
        entries: &[TranslationUpdate],
        language: &str,
    ) -> ArchiveResult<usize> {
        self.with_db(|db| {
            let Some(record) = db.get_mod_by_name(mod_name)? else {
                return Ok(0);
            };
            let Some(version) = db.latest_version(record.mod_id)? else {
                return Ok(0);
            };

            let filename = basename(file_path);
            let by_key: BTreeMap<String, i64> = db
                .source_entries_for_file(version.version_id, filename)?
                .into_iter()
                .map(|row| (row.entry_key, row.source_entry_id))
                .collect();

            let upserts: Vec<TranslationUpsert> = entries
                .iter()
                .filter_map(|entry| {
                    by_key.get(&entry.key).map(|id| TranslationUpsert {
                        source_entry_id: *id,
                        translated_text: entry.translation.clone(),
                    })
                })
                .collect();

            Ok(db.upsert_translations(language, &upserts)?)
        })
    }

    /// 최신 버전의 파일 항목 + 과거 모든 버전에서 찾은 번역
    pub fn get_entries(
        &self,
        mod_name: &str,
        file_path: &str,
        language: &str,
    ) -> ArchiveResult<Vec<ArchivedEntry>> {
        self.with_db(|db| Ok(DeepSearchResolver::new(db).get_entries(mod_name, file_path, language)?))
    }

    /// 설정의 기본 언어(`default_language`)로 get_entries
    pub fn get_entries_in_default_language(
        &self,
        mod_name: &str,
        file_path: &str,
    ) -> ArchiveResult<Vec<ArchivedEntry>> {
        self.get_entries(mod_name, file_path, &self.config.default_language)
    }

    // ---- backup ----

    pub fn export_to_file(&self, out_path: &Path) -> ArchiveResult<()> {
        self.with_db(|db| db.export_to_file(out_path))
    }

    /// 스켈레톤 아카이브 등을 가져와 현재 내용을 덮어씀
    pub fn import_from_file(&self, in_path: &Path) -> ArchiveResult<()> {
        self.with_db(|db| db.import_from_file(in_path))
    }
}

impl Drop for ArchiveStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
