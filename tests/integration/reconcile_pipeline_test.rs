// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde_json::json;
use versionwatch::application::use_cases::reconcile_use_case::ReconcileUseCase;
use versionwatch::domain::models::version::Version;
use versionwatch::domain::repositories::storage_repository::StorageRepository;
use versionwatch::infrastructure::archive::DirectoryArchiveProvider;
use versionwatch::infrastructure::metadata;
use versionwatch::infrastructure::storage::LocalStorage;
use versionwatch::utils::errors::ReconcileError;

use super::support::{at, options};

fn version(id: &str, page_id: &str, date: DateTime<Utc>) -> Version {
    serde_json::from_value(json!({
        "id": id,
        "page_id": page_id,
        "site_id": "s1",
        "date": date,
        "has_content": true,
    }))
    .unwrap()
}

fn archive_file(dir: &Path, name: &str, body: &str, modified: DateTime<Utc>) {
    std::fs::create_dir_all(dir).unwrap();
    let file_path = dir.join(name);
    std::fs::write(&file_path, body).unwrap();
    let file = std::fs::File::options().write(true).open(&file_path).unwrap();
    file.set_modified(SystemTime::from(modified)).unwrap();
}

fn page_context_lines() -> String {
    let mut out = String::new();
    for page_id in ["p1", "p2"] {
        let line = json!({
            "site": { "id": "s1", "name": "EPA - epa.gov", "url": "https://epa.gov" },
            "page": { "id": page_id, "site_id": "s1", "url": format!("https://epa.gov/{}", page_id) }
        });
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}

#[tokio::test]
async fn test_reconcile_run_binds_matches_and_fails_incomplete_pages() {
    let output = tempfile::tempdir().unwrap();
    let options = options("http://localhost/api/", output.path(), &[("mode", "reconcile")]);

    // p1：10:40 的条目离两个版本都超过阈值，11:15 的版本无法匹配
    let versions = vec![
        version("v1", "p1", at(1, 10, 2)),
        version("v2", "p1", at(1, 11, 15)),
        version("w1", "p2", at(1, 10, 0)),
    ];
    metadata::write_versions(&options.metadata_path, &versions).await.unwrap();
    std::fs::write(
        options.metadata_path.with_file_name("pages.jsonl"),
        page_context_lines(),
    )
    .unwrap();

    archive_file(&options.archive_dir.join("p1"), "a.html", "first", at(1, 10, 0));
    archive_file(&options.archive_dir.join("p1"), "b.html", "second", at(1, 10, 40));
    archive_file(&options.archive_dir.join("p2"), "x.html", "only", at(1, 10, 5));

    let storage: Arc<dyn StorageRepository> = Arc::new(LocalStorage::new(&options.output_dir));
    let provider = Arc::new(DirectoryArchiveProvider::new(&options.archive_dir));
    let use_case = ReconcileUseCase::new(provider, storage, &options);

    let outcome = use_case.run(at(20, 0, 0)).await.unwrap();

    assert_eq!(outcome.run.pages.len(), 1);
    assert_eq!(outcome.run.pages[0].page_id, "p2");
    match &outcome.run.failures[..] {
        [ReconcileError::UnmatchedVersions { page_id, version_ids }] => {
            assert_eq!(page_id, "p1");
            assert_eq!(version_ids, &vec!["v2".to_string()]);
        }
        other => panic!("expected one unmatched-versions failure, got {:?}", other),
    }
    assert_eq!(use_case.summary().failure_count(), 1);

    let reconciled = metadata::read_versions(&outcome.metadata_path).await.unwrap();
    let by_id = |id: &str| reconciled.iter().find(|v| v.id == id).unwrap().clone();
    assert!(by_id("v1").file_path.is_none());
    assert!(by_id("v2").file_path.is_none());
    let w1 = by_id("w1");
    assert_eq!(w1.content_length, Some(4));
    assert!(w1.file_path.unwrap().ends_with("w1.html"));
    assert_eq!(
        std::fs::read_to_string(output.path().join("s1/p2/w1.html")).unwrap(),
        "only"
    );

    assert_eq!(outcome.report.total_rows(), 2);
}

#[tokio::test]
async fn test_missing_metadata_is_an_error() {
    let output = tempfile::tempdir().unwrap();
    let options = options("http://localhost/api/", output.path(), &[("mode", "reconcile")]);
    let storage: Arc<dyn StorageRepository> = Arc::new(LocalStorage::new(&options.output_dir));
    let provider = Arc::new(DirectoryArchiveProvider::new(&options.archive_dir));

    let result = ReconcileUseCase::new(provider, storage, &options)
        .run(at(20, 0, 0))
        .await;

    assert!(result.is_err());
}
