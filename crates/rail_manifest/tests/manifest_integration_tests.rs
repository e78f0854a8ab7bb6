//! Integration tests for manifest loading from a project layout.

use std::fs;
use tempfile::tempdir;

use rail_manifest::{ManifestError, ManifestStore, MANIFEST_DIR, RAILWAY_FILE};

/// A project with a full manifest directory resolves every mapped station.
#[test]
fn test_project_manifest_layout() {
    let temp = tempdir().unwrap();
    let manifest_dir = temp.path().join(MANIFEST_DIR);
    fs::create_dir_all(&manifest_dir).unwrap();

    fs::write(
        manifest_dir.join(RAILWAY_FILE),
        r#"{
            "railwayId": 12,
            "stations": { "1": "intro.json", "2": "physics.json" }
        }"#,
    )
    .unwrap();
    fs::write(
        manifest_dir.join("intro.json"),
        r#"{
            "name": "Intro",
            "id": 1,
            "tests": [{ "type": "unity", "command": "test:Intro.Passes", "args": [], "shell": false }]
        }"#,
    )
    .unwrap();
    fs::write(
        manifest_dir.join("physics.json"),
        r#"{
            "name": "Physics",
            "id": 2,
            "prepare": [{ "command": "setup.sh", "background": true }],
            "tests": [{ "type": "unity", "command": "group:Physics", "args": ["--fast"], "shell": true }]
        }"#,
    )
    .unwrap();

    let store = ManifestStore::for_project(temp.path());
    let railway = store.get_railway().unwrap();
    assert_eq!(railway.railway_id, 12);
    assert_eq!(railway.station_count(), 2);

    let intro = store.get_station(1).unwrap();
    assert_eq!(intro.single_test().unwrap().command, "test:Intro.Passes");

    let physics = store.get_station(2).unwrap();
    let prepare = physics.prepare.unwrap();
    assert!(prepare[0].background);
    assert!(physics.tests[0].shell);
    assert_eq!(physics.tests[0].args, vec!["--fast".to_string()]);
}

/// A mapped station whose file is missing reports `NotFound`.
#[test]
fn test_mapped_station_file_missing() {
    let temp = tempdir().unwrap();
    let store = ManifestStore::new(temp.path());
    fs::write(
        temp.path().join(RAILWAY_FILE),
        r#"{"railwayId": 1, "stations": {"1": "gone.json"}}"#,
    )
    .unwrap();

    assert!(matches!(store.load_station(1), Err(ManifestError::NotFound(_))));
    assert!(store.get_station(1).is_none());
}
