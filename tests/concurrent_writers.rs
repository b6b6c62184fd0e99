use std::sync::{Arc, Barrier};
use std::thread;

use loc_archive::models::{FileResults, SourceFile};
use loc_archive::{ArchiveConfig, ArchiveStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn files() -> Vec<SourceFile> {
    vec![SourceFile::new("a.yml")
        .entry("k1", "Hello")
        .entry("k2", "Bye")
        .entry("k3", "Again")]
}

#[test]
fn test_parallel_handles_share_one_snapshot_and_row_per_language() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = ArchiveConfig::with_db_path(dir.path().join("mods_cache.sqlite"));

    // 스키마를 먼저 만들어 둠
    let setup = ArchiveStore::new(config.clone());
    let mod_id = setup.get_or_create_mod("Alpha", None).unwrap();

    let workers = 6;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let config = config.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                // 워커마다 자기 핸들(연결)을 사용
                let store = ArchiveStore::new(config);
                barrier.wait();

                let version_id = store.create_source_version(mod_id, &files()).unwrap();
                let mut results = FileResults::new();
                results.insert(
                    "a.yml".to_string(),
                    vec![format!("你好{}", worker), format!("再见{}", worker), format!("又{}", worker)],
                );
                let report = store
                    .archive_translated_results(version_id, &results, &files(), "zh-CN")
                    .unwrap();
                assert_eq!(report.archived, 3);

                // 쓰기 중에도 읽기는 가능
                let entries = store.get_entries("Alpha", "a.yml", "zh-CN").unwrap();
                assert_eq!(entries.len(), 3);
                version_id
            })
        })
        .collect();

    let versions: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(versions.windows(2).all(|w| w[0] == w[1]));

    let summaries = setup.list_versions("Alpha").unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].entry_count, 3);

    // (source_entry_id, language_code) 당 한 행
    let stats = setup.translation_stats(versions[0]).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].translated, 3);

    let entries = setup.get_entries("Alpha", "a.yml", "zh-CN").unwrap();
    assert!(entries
        .iter()
        .all(|e| e.translation.as_deref().map_or(false, |t| !t.is_empty())));
}
