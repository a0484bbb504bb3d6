//! Durable queue behavior: persistence across store instances, drain
//! idempotence, and scheduling.

mod support;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use sheetforge::binding::MemoryAssetStore;
use sheetforge::jobs::{FileJobStore, JobProcessor, JobRequest, JobStore, TickOutcome};
use sheetforge::{SheetMode, StoreError};
use std::fs;
use tempfile::TempDir;

fn request(container: &str, asset: &str) -> JobRequest {
    JobRequest {
        sheet_id: "book".into(),
        sheet_name: "Monster".into(),
        record_type: "data::Monster".into(),
        container_type: container.into(),
        asset_path: asset.into(),
        payload: r#"[{"Hp": 3, "Name": "Bat", "Tags": []}]"#.into(),
        mode: SheetMode::Table,
    }
}

fn store(dir: &TempDir) -> FileJobStore {
    FileJobStore::new(dir.path().join("state").join("jobs.json"))
}

#[test]
fn jobs_survive_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let mut first = store(&dir);
    first.enqueue(request("data::Monsters", "a.asset")).unwrap();
    first.enqueue(request("data::Monsters", "b.asset")).unwrap();

    let reopened = store(&dir);
    let jobs = reopened.read_all().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].asset_path(), "a.asset");
    assert!(jobs[0].enqueued_at() < jobs[1].enqueued_at());
}

#[test]
fn same_instant_enqueues_get_distinct_identities() {
    let dir = TempDir::new().unwrap();
    let mut store = store(&dir);
    let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let a = store.enqueue_at(request("data::Monsters", "a.asset"), now).unwrap();
    let b = store.enqueue_at(request("data::Monsters", "b.asset"), now).unwrap();
    assert_ne!(a.id(), b.id());

    assert_eq!(store.remove(&[a.id()]).unwrap(), 1);
    let left = store.read_all().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id(), b.id());
}

#[test]
fn empty_and_missing_files_hold_no_jobs() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    assert!(!store.has_jobs().unwrap());

    fs::create_dir_all(dir.path().join("state")).unwrap();
    fs::write(dir.path().join("state/jobs.json"), "").unwrap();
    assert!(store.read_all().unwrap().is_empty());
}

#[test]
fn corrupt_store_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("state")).unwrap();
    fs::write(dir.path().join("state/jobs.json"), "{not json").unwrap();
    assert_matches!(store(&dir).read_all(), Err(StoreError::Corrupt { .. }));
}

#[test]
fn draining_empty_store_does_nothing() {
    let dir = TempDir::new().unwrap();
    let mut processor = JobProcessor::new(store(&dir));
    let mut assets = MemoryAssetStore::new();

    let report = processor.drain(&support::registry(), &mut assets).unwrap();
    assert!(report.is_empty());
    assert_eq!(assets.refresh_count(), 0);
    assert!(!dir.path().join("state/jobs.json").exists());
}

#[test]
fn successful_drain_empties_the_store() {
    let dir = TempDir::new().unwrap();
    let mut processor = JobProcessor::new(store(&dir));
    processor.store_mut().enqueue(request("data::Monsters", "a.asset")).unwrap();
    processor.store_mut().enqueue(request("data::Monsters", "b.asset")).unwrap();
    let mut assets = MemoryAssetStore::new();

    let report = processor.drain(&support::registry(), &mut assets).unwrap();
    assert_eq!(report.bound.len(), 2);
    assert!(report.failed.is_empty());
    assert!(!store(&dir).has_jobs().unwrap());
    assert_eq!(assets.len(), 2);

    let again = processor.drain(&support::registry(), &mut assets).unwrap();
    assert!(again.is_empty());
}

#[test]
fn one_failure_does_not_keep_either_job() {
    let dir = TempDir::new().unwrap();
    let mut processor = JobProcessor::new(store(&dir));
    processor.store_mut().enqueue(request("data::Ghosts", "g.asset")).unwrap();
    processor.store_mut().enqueue(request("data::Monsters", "m.asset")).unwrap();
    let mut assets = MemoryAssetStore::new();

    let report = processor.drain(&support::registry(), &mut assets).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].job.container_type, "data::Ghosts");
    assert_eq!(report.bound.len(), 1);
    assert!(assets.get("m.asset").is_some());
    assert!(!store(&dir).has_jobs().unwrap());
}

#[test]
fn mismatched_payload_fails_only_its_job() {
    let dir = TempDir::new().unwrap();
    let mut processor = JobProcessor::new(store(&dir));
    let mut bad = request("data::Monsters", "bad.asset");
    bad.payload = r#"{"Hp": 1}"#.into();
    processor.store_mut().enqueue(bad).unwrap();
    processor.store_mut().enqueue(request("data::Monsters", "ok.asset")).unwrap();
    let mut assets = MemoryAssetStore::new();

    let report = processor.drain(&support::registry(), &mut assets).unwrap();
    assert_matches!(report.failed[0].error, sheetforge::BindError::Payload { .. });
    assert_eq!(report.bound[0].1.asset_path, "ok.asset");
}

#[test]
fn repeated_requests_schedule_a_single_pass() {
    let dir = TempDir::new().unwrap();
    let mut processor = JobProcessor::new(store(&dir));
    processor.store_mut().enqueue(request("data::Monsters", "a.asset")).unwrap();
    let types = support::registry();
    let mut assets = MemoryAssetStore::new();

    assert!(processor.request_processing());
    assert!(!processor.request_processing());
    assert_matches!(processor.tick(&types, &mut assets), Ok(TickOutcome::Drained(_)));
    assert_matches!(processor.tick(&types, &mut assets), Ok(TickOutcome::Idle));
    assert_eq!(assets.refresh_count(), 1);
}

#[test]
fn unstable_environment_postpones_the_pass() {
    let dir = TempDir::new().unwrap();
    let mut processor = JobProcessor::new(store(&dir));
    processor.store_mut().enqueue(request("data::Monsters", "a.asset")).unwrap();
    let mut types = support::registry();
    types.set_stable(false);
    let mut assets = MemoryAssetStore::new();

    processor.request_processing();
    for _ in 0..3 {
        assert_matches!(processor.tick(&types, &mut assets), Ok(TickOutcome::Deferred));
    }
    assert!(store(&dir).has_jobs().unwrap());

    types.set_stable(true);
    assert_matches!(processor.tick(&types, &mut assets), Ok(TickOutcome::Drained(_)));
    assert!(!store(&dir).has_jobs().unwrap());
}
