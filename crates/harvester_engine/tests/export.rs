use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use harvester_core::OwnerRank;
use harvester_engine::{
    list_artifacts, merge_artifacts, read_repo_table, write_h_index_table, write_repo_table,
    ExportError, H_INDEX_FILENAME, REPO_TABLE_FILENAME,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn node(name: &str, stars: u64, language: Option<&str>, is_fork: bool) -> serde_json::Value {
    json!({
        "nameWithOwner": name,
        "createdAt": "2013-04-05T06:07:08Z",
        "forkCount": 2,
        "isFork": is_fork,
        "updatedAt": "2019-01-02T03:04:05Z",
        "primaryLanguage": language.map(|name| json!({ "name": name })),
        "stargazers": { "totalCount": stars },
        "watchers": { "totalCount": 5 }
    })
}

/// Writes an artifact and pins its modification time `age` seconds after a
/// fixed origin, so precedence does not depend on the clock.
fn artifact(dir: &Path, name: &str, nodes: serde_json::Value, age: u64) {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(&nodes).unwrap()).unwrap();
    let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000 + age);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

#[test]
fn lists_only_artifacts_oldest_first() {
    let temp = TempDir::new().unwrap();
    artifact(temp.path(), "repos.stars=2.json", json!([]), 20);
    artifact(temp.path(), "repos.stars=1.json", json!([]), 10);
    artifact(temp.path(), "notes.json", json!([]), 0);
    fs::write(temp.path().join(REPO_TABLE_FILENAME), "repo\n").unwrap();

    let names: Vec<String> = list_artifacts(temp.path())
        .unwrap()
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["repos.stars=1.json", "repos.stars=2.json"]);
}

#[test]
fn newest_artifact_wins_for_duplicate_repositories() {
    let temp = TempDir::new().unwrap();
    artifact(
        temp.path(),
        "repos.stars=10..20.json",
        json!([node("a/old", 12, None, false), node("b/x", 15, Some("Go"), false)]),
        10,
    );
    artifact(
        temp.path(),
        "repos.stars=12.json",
        json!([node("a/old", 13, Some("Rust"), true)]),
        20,
    );

    let rows = merge_artifacts(temp.path()).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].repo, "b/x");
    assert_eq!(rows[1].repo, "a/old");
    assert_eq!(rows[1].stars, 13);
    assert_eq!(rows[1].language, "Rust");
    assert!(rows[1].is_fork);
}

#[test]
fn rows_sort_by_stars_then_name() {
    let temp = TempDir::new().unwrap();
    artifact(
        temp.path(),
        "repos.stars=1..100.json",
        json!([
            node("zed/z", 7, None, false),
            node("amy/a", 7, None, false),
            node("max/m", 90, None, false),
            null
        ]),
        0,
    );

    let names: Vec<String> = merge_artifacts(temp.path())
        .unwrap()
        .into_iter()
        .map(|row| row.repo)
        .collect();

    assert_eq!(names, vec!["max/m", "amy/a", "zed/z"]);
}

#[test]
fn empty_object_and_null_entries_are_skipped() {
    let temp = TempDir::new().unwrap();
    artifact(
        temp.path(),
        "repos.stars=2.json",
        json!([node("a/b", 2, None, false), {}, null, node("c/d", 2, Some("Go"), false)]),
        0,
    );

    let names: Vec<String> = merge_artifacts(temp.path())
        .unwrap()
        .into_iter()
        .map(|row| row.repo)
        .collect();

    assert_eq!(names, vec!["a/b", "c/d"]);
}

#[test]
fn incomplete_record_is_still_an_error() {
    let temp = TempDir::new().unwrap();
    artifact(
        temp.path(),
        "repos.stars=2.json",
        json!([{ "nameWithOwner": "a/b" }]),
        0,
    );

    assert!(matches!(
        merge_artifacts(temp.path()),
        Err(ExportError::Artifact { .. })
    ));
}

#[test]
fn malformed_artifact_names_its_path() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("repos.stars=4.json"), "{ nope").unwrap();

    match merge_artifacts(temp.path()).unwrap_err() {
        ExportError::Artifact { path, .. } => {
            assert_eq!(path.file_name().unwrap(), "repos.stars=4.json")
        }
        other => panic!("expected artifact error, got {other:?}"),
    }
}

#[test]
fn repo_table_has_expected_columns() {
    let temp = TempDir::new().unwrap();
    artifact(
        temp.path(),
        "repos.stars=3.json",
        json!([node("o/fork", 3, Some("C"), true), node("o/plain", 3, None, false)]),
        0,
    );
    let rows = merge_artifacts(temp.path()).unwrap();
    let path = temp.path().join(REPO_TABLE_FILENAME);

    write_repo_table(&path, &rows).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "repo,stars,created,updated,language,watchers,forks,isFork",
            "o/fork,3,2013-04-05T06:07:08Z,2019-01-02T03:04:05Z,C,5,2,1",
            "o/plain,3,2013-04-05T06:07:08Z,2019-01-02T03:04:05Z,,5,2,",
        ]
    );
    assert_eq!(read_repo_table(&path).unwrap(), rows);
}

#[test]
fn empty_repo_table_keeps_header() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(REPO_TABLE_FILENAME);

    write_repo_table(&path, &[]).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "repo,stars,created,updated,language,watchers,forks,isFork\n"
    );
    assert!(read_repo_table(&path).unwrap().is_empty());
}

#[test]
fn h_index_table_filters_by_minimum() {
    let temp = TempDir::new().unwrap();
    let mut nodes = Vec::new();
    for (i, stars) in [10, 9, 8, 7, 6, 5].into_iter().enumerate() {
        nodes.push(node(&format!("big/r{i}"), stars, None, false));
    }
    for (i, stars) in [3, 3, 3].into_iter().enumerate() {
        nodes.push(node(&format!("small/r{i}"), stars, None, false));
    }
    artifact(temp.path(), "repos.stars=1..10.json", json!(nodes), 0);
    let rows = merge_artifacts(temp.path()).unwrap();
    let path = temp.path().join(H_INDEX_FILENAME);

    let ranks = write_h_index_table(&path, &rows, 5).unwrap();

    assert_eq!(
        ranks,
        vec![OwnerRank {
            h_index: 5,
            user: "big".to_string()
        }]
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), "h_index,user\n5,big\n");

    let all = write_h_index_table(&path, &rows, 0).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].h_index, 3);
}
