use loc_archive::archive::diff::{EntryStatus, TranslationRequest};
use loc_archive::models::{ArchivedEntry, FileResults, SourceFile};
use loc_archive::{run_incremental_update, ArchiveStore, DiffEngine};

fn archived(key: &str, original: &str, translation: &str) -> ArchivedEntry {
    ArchivedEntry {
        key: key.to_string(),
        original: original.to_string(),
        translation: Some(translation.to_string()),
    }
}

#[test]
fn test_alpha_incremental_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArchiveStore::open(dir.path().join("mods_cache.sqlite"));

    // V1: k1 만 있는 상태를 아카이브하고 번역
    let v1_files = vec![SourceFile::new("a.yml").entry("k1", "Hello")];
    let mod_id = store.get_or_create_mod("Alpha", None).unwrap();
    let v1 = store.create_source_version(mod_id, &v1_files).unwrap();
    let mut v1_results = FileResults::new();
    v1_results.insert("a.yml".to_string(), vec!["你好".to_string()]);
    let report = store
        .archive_translated_results(v1, &v1_results, &v1_files, "zh-CN")
        .unwrap();
    assert_eq!(report.archived, 1);

    // 재파싱: k2 추가
    let v2_files = vec![SourceFile::new("a.yml").entry("k1", "Hello").entry("k2", "Bye")];
    let plan = DiffEngine::new(&store).plan("Alpha", &v2_files, "zh-CN").unwrap();
    let file = plan.file("a.yml").unwrap();
    assert_eq!(file.keys_with(EntryStatus::New), vec!["k2"]);
    assert!(file.keys_with(EntryStatus::Changed).is_empty());
    assert_eq!(file.keys_with(EntryStatus::Unchanged), vec!["k1"]);

    // k2 만 번역됨
    let translate_delta = |requests: &[TranslationRequest], _: &str| -> Result<FileResults, Box<dyn std::error::Error + Send + Sync>> {
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].texts, vec!["Bye".to_string()]);
        let mut results = FileResults::new();
        results.insert("a.yml".to_string(), vec!["再见".to_string()]);
        Ok(results)
    };
    let outcome =
        run_incremental_update(&store, "Alpha", None, &v2_files, "zh-CN", &translate_delta).unwrap();

    assert_eq!(outcome.summary.new, 1);
    assert_eq!(outcome.summary.unchanged, 1);
    assert_ne!(outcome.version_id, v1);
    assert_eq!(outcome.files[0].output_texts(), vec!["你好", "再见"]);

    let entries = store.get_entries("Alpha", "a.yml", "zh-CN").unwrap();
    assert_eq!(
        entries,
        vec![archived("k1", "Hello", "你好"), archived("k2", "Bye", "再见")]
    );

    // 새 버전에도 전체 상태(두 항목)가 기록됨
    let versions = store.list_versions("Alpha").unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version.version_id, outcome.version_id);
    assert_eq!(versions[0].entry_count, 2);
}

#[test]
fn test_archive_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mods_cache.sqlite");
    let files = vec![SourceFile::new("a.yml").entry("k1", "Hello")];

    let version_id = {
        let store = ArchiveStore::open(&path);
        let mod_id = store.get_or_create_mod("Alpha", Some("3001")).unwrap();
        let version_id = store.create_source_version(mod_id, &files).unwrap();
        store.close().unwrap();
        version_id
    };

    let store = ArchiveStore::open(&path);
    let mod_id = store.get_or_create_mod("Alpha", None).unwrap();
    assert_eq!(store.create_source_version(mod_id, &files).unwrap(), version_id);
    assert_eq!(store.find_mod_by_remote_id("3001").unwrap().unwrap().mod_id, mod_id);
}
