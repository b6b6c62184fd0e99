//! Diff Engine
//!
//! 새로 파싱한 소스 항목을 직전 아카이브 스냅샷과 비교해 new / changed / unchanged로 분류합니다.
//! dirty(new + changed) 항목만 번역으로 보내고, 돌아온 결과를 전체 목록에 합친 뒤
//! 전체 상태를 새 스냅샷으로 아카이브합니다.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::archive::keys::normalize;
use crate::archive::store::{AlignedResults, ArchiveStore};
use crate::error::ArchiveResult;
use crate::models::{ArchiveReport, ArchivedEntry, FileResults, KeyInfo, SourceFile};

/// 항목 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    New,
    Changed,
    Unchanged,
}

impl EntryStatus {
    pub fn is_dirty(self) -> bool {
        !matches!(self, EntryStatus::Unchanged)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub total: usize,
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    fn record(&mut self, status: EntryStatus) {
        self.total += 1;
        match status {
            EntryStatus::New => self.new += 1,
            EntryStatus::Changed => self.changed += 1,
            EntryStatus::Unchanged => self.unchanged += 1,
        }
    }

    pub fn dirty(&self) -> usize {
        self.new + self.changed
    }
}

/// 분류된 항목 (unchanged면 이전 번역을 그대로 가짐)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedEntry {
    pub key: String,
    pub source: String,
    pub line_num: Option<u32>,
    pub status: EntryStatus,
    pub translation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePlan {
    pub filename: String,
    pub entries: Vec<PlannedEntry>,
    /// 전체 항목 목록에서 dirty 항목의 위치
    pub dirty_indices: Vec<usize>,
}

impl FilePlan {
    /// 번역이 필요한 원문 (파일 내 순서)
    pub fn dirty_texts(&self) -> Vec<String> {
        self.dirty_indices
            .iter()
            .map(|&i| self.entries[i].source.clone())
            .collect()
    }

    pub fn keys_with(&self, status: EntryStatus) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.key.as_str())
            .collect()
    }
}

/// 번역 디스패치 협력자에게 넘기는 요청 (파일 하나)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRequest {
    pub filename: String,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffPlan {
    pub mod_name: String,
    pub language: String,
    pub files: Vec<FilePlan>,
    pub summary: DiffSummary,
}

impl DiffPlan {
    pub fn is_up_to_date(&self) -> bool {
        self.summary.dirty() == 0
    }

    pub fn file(&self, filename: &str) -> Option<&FilePlan> {
        self.files.iter().find(|f| f.filename == filename)
    }

    /// dirty 항목이 있는 파일만
    pub fn translation_requests(&self) -> Vec<TranslationRequest> {
        self.files
            .iter()
            .filter(|f| !f.dirty_indices.is_empty())
            .map(|f| TranslationRequest {
                filename: f.filename.clone(),
                texts: f.dirty_texts(),
            })
            .collect()
    }

    /// 번역 결과(dirty 항목만, 요청 순서)를 전체 목록에 합침
    ///
    /// 결과가 모자라면 남은 dirty 항목은 번역 없이 남고 `missing`에 집계됩니다.
    pub fn merge(self, results: &FileResults) -> MergedSet {
        let mut missing = 0usize;
        let files = self
            .files
            .into_iter()
            .map(|plan| {
                let translated = results.get(&plan.filename).map(Vec::as_slice).unwrap_or(&[]);
                let mut entries: Vec<MergedEntry> = plan
                    .entries
                    .into_iter()
                    .map(|e| MergedEntry {
                        key: e.key,
                        source: e.source,
                        line_num: e.line_num,
                        translation: if e.status.is_dirty() { None } else { e.translation },
                    })
                    .collect();

                for (pos, &index) in plan.dirty_indices.iter().enumerate() {
                    match translated.get(pos) {
                        Some(text) => entries[index].translation = Some(text.clone()),
                        None => missing += 1,
                    }
                }

                MergedFile {
                    filename: plan.filename,
                    entries,
                }
            })
            .collect();

        MergedSet {
            mod_name: self.mod_name,
            language: self.language,
            files,
            missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedEntry {
    pub key: String,
    pub source: String,
    pub line_num: Option<u32>,
    pub translation: Option<String>,
}

impl MergedEntry {
    /// 파일 작성 협력자에게 넘기는 텍스트 (번역이 없으면 원문)
    pub fn output_text(&self) -> &str {
        self.translation.as_deref().unwrap_or(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedFile {
    pub filename: String,
    pub entries: Vec<MergedEntry>,
}

impl MergedFile {
    pub fn output_texts(&self) -> Vec<&str> {
        self.entries.iter().map(MergedEntry::output_text).collect()
    }
}

/// 전체 병합 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedSet {
    pub mod_name: String,
    pub language: String,
    pub files: Vec<MergedFile>,
    /// 번역 결과가 돌아오지 않은 dirty 항목 수
    pub missing: usize,
}

impl MergedSet {
    /// 새 스냅샷용 소스 파일 (전체 항목)
    pub fn source_files(&self) -> Vec<SourceFile> {
        self.files
            .iter()
            .map(|f| SourceFile {
                filename: f.filename.clone(),
                key_map: f
                    .entries
                    .iter()
                    .map(|e| KeyInfo {
                        key_part: e.key.clone(),
                        line_num: e.line_num,
                    })
                    .collect(),
                texts_to_translate: f.entries.iter().map(|e| e.source.clone()).collect(),
            })
            .collect()
    }

    /// 위치별 출력 텍스트 (번역이 없으면 원문)
    fn aligned_translations(&self) -> AlignedResults {
        self.files
            .iter()
            .map(|f| {
                (
                    f.filename.clone(),
                    f.entries
                        .iter()
                        .map(|e| Some(e.output_text().to_string()))
                        .collect(),
                )
            })
            .collect()
    }

    /// 전체 병합 상태를 새 스냅샷으로 아카이브
    ///
    /// 번역이 돌아오지 않은 항목은 원문을 번역으로 기록합니다. 그래야 바뀐 원문에
    /// 이전 원문의 번역이 딸려 오지 않습니다.
    pub fn archive(
        &self,
        store: &ArchiveStore,
        remote_id: Option<&str>,
    ) -> ArchiveResult<(i64, ArchiveReport)> {
        let mod_id = store.get_or_create_mod(&self.mod_name, remote_id)?;
        let files = self.source_files();
        let version_id = store.create_source_version(mod_id, &files)?;
        let report =
            store.archive_aligned(version_id, &self.aligned_translations(), &files, &self.language)?;
        Ok((version_id, report))
    }
}

/// 비교 엔진
pub struct DiffEngine<'a> {
    store: &'a ArchiveStore,
}

impl<'a> DiffEngine<'a> {
    pub fn new(store: &'a ArchiveStore) -> Self {
        Self { store }
    }

    /// 파일별로 직전 스냅샷과 비교 (dry run: 아무것도 쓰지 않음)
    pub fn plan(&self, mod_name: &str, files: &[SourceFile], language: &str) -> ArchiveResult<DiffPlan> {
        let mut summary = DiffSummary::default();
        let mut plans = Vec::with_capacity(files.len());

        for file in files {
            let history = self.store.get_entries(mod_name, &file.filename, language)?;
            let plan = classify_file(file, &history, &mut summary);
            plans.push(plan);
        }

        info!(
            mod_name,
            language,
            total = summary.total,
            new = summary.new,
            changed = summary.changed,
            unchanged = summary.unchanged,
            "diff planned"
        );

        Ok(DiffPlan {
            mod_name: mod_name.to_string(),
            language: language.to_string(),
            files: plans,
            summary,
        })
    }
}

/// 한 파일의 항목을 이력과 비교해 분류
pub fn classify_file(file: &SourceFile, history: &[ArchivedEntry], summary: &mut DiffSummary) -> FilePlan {
    let history: HashMap<&str, &ArchivedEntry> =
        history.iter().map(|e| (e.key.as_str(), e)).collect();

    let mut entries = Vec::with_capacity(file.key_map.len());
    let mut dirty_indices = Vec::new();

    for (key_info, source) in file.key_map.iter().zip(&file.texts_to_translate) {
        let key = normalize(&key_info.key_part);
        let (status, translation) = match history.get(key.as_str()) {
            None => (EntryStatus::New, None),
            Some(hist) if hist.original != *source => (EntryStatus::Changed, None),
            Some(hist) => (EntryStatus::Unchanged, hist.translation.clone()),
        };

        summary.record(status);
        if status.is_dirty() {
            dirty_indices.push(entries.len());
        }
        entries.push(PlannedEntry {
            key,
            source: source.clone(),
            line_num: key_info.line_num,
            status,
            translation,
        });
    }

    FilePlan {
        filename: file.filename.clone(),
        entries,
        dirty_indices,
    }
}
