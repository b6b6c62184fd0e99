//! Incremental Update
//!
//! 비교 → dirty 항목만 번역 → 병합 → 전체 상태 아카이브

use serde::Serialize;
use tracing::info;

use crate::archive::diff::{DiffEngine, DiffSummary, MergedFile, TranslationRequest};
use crate::archive::store::ArchiveStore;
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{ArchiveReport, FileResults, SourceFile};

/// 번역 디스패치 협력자
///
/// 요청 파일마다 같은 순서의 번역문 목록을 돌려줘야 합니다. 일부만 돌아와도 됩니다.
pub trait Translator {
    fn translate(
        &self,
        requests: &[TranslationRequest],
        language: &str,
    ) -> Result<FileResults, Box<dyn std::error::Error + Send + Sync>>;
}

impl<F> Translator for F
where
    F: Fn(&[TranslationRequest], &str) -> Result<FileResults, Box<dyn std::error::Error + Send + Sync>>,
{
    fn translate(
        &self,
        requests: &[TranslationRequest],
        language: &str,
    ) -> Result<FileResults, Box<dyn std::error::Error + Send + Sync>> {
        self(requests, language)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub summary: DiffSummary,
    pub version_id: i64,
    pub archive: ArchiveReport,
    /// 파일 작성 협력자에게 넘길 전체 병합 결과
    pub files: Vec<MergedFile>,
    /// 번역 결과가 돌아오지 않은 dirty 항목 수
    pub missing: usize,
}

impl UpdateOutcome {
    pub fn history_description(&self) -> String {
        format!(
            "Build incremental update. {} new, {} changed, {} reused lines.",
            self.summary.new, self.summary.changed, self.summary.unchanged
        )
    }
}

/// 증분 번역 실행
///
/// dirty 항목이 없으면 번역기를 호출하지 않습니다. 어느 경우든 전체 병합 상태를
/// 스냅샷으로 아카이브합니다(내용이 같으면 기존 버전이 재사용됨).
pub fn run_incremental_update(
    store: &ArchiveStore,
    mod_name: &str,
    remote_id: Option<&str>,
    files: &[SourceFile],
    language: &str,
    translator: &dyn Translator,
) -> ArchiveResult<UpdateOutcome> {
    if files.is_empty() {
        return Err(ArchiveError::InvalidInput("no source files to update".into()));
    }

    let plan = DiffEngine::new(store).plan(mod_name, files, language)?;
    let summary = plan.summary;

    let results = if plan.is_up_to_date() {
        FileResults::new()
    } else {
        let requests = plan.translation_requests();
        info!(
            files = requests.len(),
            items = summary.dirty(),
            "translating incrementally"
        );
        translator
            .translate(&requests, language)
            .map_err(ArchiveError::Translation)?
    };

    let merged = plan.merge(&results);
    let (version_id, archive) = merged.archive(store, remote_id)?;

    let outcome = UpdateOutcome {
        summary,
        version_id,
        archive,
        missing: merged.missing,
        files: merged.files,
    };
    info!(version_id, "{}", outcome.history_description());
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn echo_upper(
        requests: &[TranslationRequest],
        _language: &str,
    ) -> Result<FileResults, Box<dyn std::error::Error + Send + Sync>> {
        Ok(requests
            .iter()
            .map(|r| (r.filename.clone(), r.texts.iter().map(|t| t.to_uppercase()).collect()))
            .collect())
    }

    #[test]
    fn test_first_run_translates_everything() {
        let store = ArchiveStore::in_memory();
        let files = vec![SourceFile::new("a.yml").entry("k1", "hello").entry("k2", "bye")];

        let outcome =
            run_incremental_update(&store, "Alpha", Some("42"), &files, "en-US", &echo_upper).unwrap();

        assert_eq!(outcome.summary.new, 2);
        assert_eq!(outcome.archive.archived, 2);
        assert_eq!(outcome.files[0].output_texts(), vec!["HELLO", "BYE"]);
        assert_eq!(store.find_mod_by_remote_id("42").unwrap().unwrap().name, "Alpha");
    }

    #[test]
    fn test_up_to_date_skips_translator() {
        let store = ArchiveStore::in_memory();
        let files = vec![SourceFile::new("a.yml").entry("k1", "hello")];
        let first = run_incremental_update(&store, "Alpha", None, &files, "en-US", &echo_upper).unwrap();

        let calls = Cell::new(0);
        let counting = |requests: &[TranslationRequest], language: &str| {
            calls.set(calls.get() + 1);
            echo_upper(requests, language)
        };
        let second = run_incremental_update(&store, "Alpha", None, &files, "en-US", &counting).unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(second.summary.unchanged, 1);
        assert_eq!(second.version_id, first.version_id);
        assert_eq!(second.files[0].output_texts(), vec!["HELLO"]);
    }

    #[test]
    fn test_translator_error_propagates_without_writes() {
        let store = ArchiveStore::in_memory();
        let files = vec![SourceFile::new("a.yml").entry("k1", "hello")];
        let failing = |_: &[TranslationRequest], _: &str| -> Result<FileResults, Box<dyn std::error::Error + Send + Sync>> {
            Err("provider offline".into())
        };

        let err = run_incremental_update(&store, "Alpha", None, &files, "en-US", &failing).unwrap_err();
        assert_eq!(err.code(), "TRANSLATION_ERROR");
        assert!(store.get_mod("Alpha").unwrap().is_none());
    }

    #[test]
    fn test_changed_line_without_translation_drops_stale_translation() {
        let store = ArchiveStore::in_memory();
        let v1 = vec![SourceFile::new("a.yml").entry("k1", "Hello")];
        let to_chinese = |requests: &[TranslationRequest], _: &str| -> Result<FileResults, Box<dyn std::error::Error + Send + Sync>> {
            Ok(requests
                .iter()
                .map(|r| (r.filename.clone(), vec!["你好".to_string()]))
                .collect())
        };
        run_incremental_update(&store, "Alpha", None, &v1, "zh-CN", &to_chinese).unwrap();

        // 원문이 바뀌었는데 번역이 돌아오지 않음
        let v2 = vec![SourceFile::new("a.yml").entry("k1", "Goodbye")];
        let nothing = |_: &[TranslationRequest], _: &str| -> Result<FileResults, Box<dyn std::error::Error + Send + Sync>> {
            Ok(FileResults::new())
        };
        let outcome = run_incremental_update(&store, "Alpha", None, &v2, "zh-CN", &nothing).unwrap();
        assert_eq!(outcome.summary.changed, 1);
        assert_eq!(outcome.missing, 1);
        assert_eq!(outcome.files[0].output_texts(), vec!["Goodbye"]);

        let entries = store.get_entries("Alpha", "a.yml", "zh-CN").unwrap();
        assert_eq!(entries[0].original, "Goodbye");
        assert_eq!(entries[0].translation.as_deref(), Some("Goodbye"));

        let plan = DiffEngine::new(&store).plan("Alpha", &v2, "zh-CN").unwrap();
        let entry = &plan.file("a.yml").unwrap().entries[0];
        assert_ne!(entry.translation.as_deref(), Some("你好"));
    }

    #[test]
    fn test_empty_input_rejected() {
        let store = ArchiveStore::in_memory();
        let result = run_incremental_update(&store, "Alpha", None, &[], "en-US", &echo_upper);
        assert!(matches!(result, Err(ArchiveError::InvalidInput(_))));
    }
}
