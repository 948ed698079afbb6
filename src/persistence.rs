use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::errors::{Result, SnapshotFault, StampError};
use crate::state::stamps::{StampSet, StampStore};

/// Load the stamp set persisted at `path`.
///
/// A missing or zero-length file yields an empty set. Anything else that
/// cannot be read or parsed is an error; the caller must not start serving
/// with a partial store.
pub fn load_snapshot(path: &Path) -> Result<StampSet> {
    let load_err = |source: SnapshotFault| StampError::PersistenceLoad {
        path: path.to_path_buf(),
        source,
    };

    let data = match fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("No snapshot found at startup (path = {})", path.display());
            return Ok(StampSet::new());
        }
        Err(e) => return Err(load_err(e.into())),
    };

    if data.is_empty() {
        tracing::info!("Snapshot file is empty (path = {})", path.display());
        return Ok(StampSet::new());
    }

    // `null` is what an unset map was written as.
    let stamps = serde_json::from_slice::<Option<StampSet>>(&data)
        .map_err(|e| load_err(e.into()))?
        .unwrap_or_default();

    tracing::info!(
        "Loaded snapshot: {} days, {} stamps",
        stamps.len(),
        stamps.values().map(|d| d.len()).sum::<usize>()
    );
    Ok(stamps)
}

/// Write `snapshot` to `path`, replacing any previous content.
///
/// The bytes go to a uniquely named temporary file next to `path` which is
/// then renamed over it, so a crash mid-write leaves the old snapshot intact
/// and concurrent saves never share a temporary file.
pub fn save_snapshot(path: &Path, snapshot: &StampSet) -> Result<()> {
    let save_err = |source: SnapshotFault| StampError::PersistenceSave {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(snapshot).map_err(|e| save_err(e.into()))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| save_err(e.into()))?;
    tmp.write_all(&json)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| save_err(e.into()))?;
    // An unpersisted temp file is removed when dropped.
    tmp.persist(path).map_err(|e| save_err(e.error.into()))?;

    tracing::info!("Snapshot saved: {} days", snapshot.len());
    Ok(())
}

/// Snapshot the live store and write it out. The read lock is released
/// before any file I/O.
pub fn save_store(path: &Path, store: &StampStore) -> Result<()> {
    let snapshot = store.snapshot()?;
    save_snapshot(path, &snapshot)
}

/// Background task that periodically checkpoints the store.
///
/// Returns once `stop` flips to `true` (or its sender is dropped). A save
/// already in progress is always completed first, so awaiting the task
/// guarantees no checkpoint lands after the caller's own save.
pub async fn autosave_loop(
    path: PathBuf,
    store: StampStore,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = sleep(every) => {}
            _ = stop.wait_for(|stopped| *stopped) => break,
        }

        let path = path.clone();
        let store = store.clone();
        let saved = tokio::task::spawn_blocking(move || save_store(&path, &store)).await;
        match saved {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Autosave failed: {e}"),
            Err(e) => tracing::warn!("Autosave task panicked: {e}"),
        }
    }
    tracing::debug!("Autosave loop stopped");
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::state::stamps::{DayEntries, StampContent};

    fn sample() -> StampSet {
        let mut set = StampSet::new();
        let mut jan10 = DayEntries::new();
        jan10.insert("09:00".into(), StampContent::new("9:00", "9:30"));
        jan10.insert("14:05".into(), StampContent::new("", ""));
        let mut jan11 = DayEntries::new();
        jan11.insert("23:59".into(), StampContent::new("late", "later"));
        set.insert("2024-01-10".into(), jan10);
        set.insert("2024-01-11".into(), jan11);
        set
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let stamps = load_snapshot(&dir.path().join("db")).unwrap();
        assert!(stamps.is_empty());
    }

    #[test]
    fn empty_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        fs::write(&path, b"").unwrap();
        assert!(load_snapshot(&path).unwrap().is_empty());
    }

    #[test]
    fn null_document_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        fs::write(&path, b"null").unwrap();
        assert!(load_snapshot(&path).unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        fs::write(&path, br#"{"2024-01-10": {"09:00": {"start:": 5"#).unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(
            err,
            StampError::PersistenceLoad {
                source: SnapshotFault::Json(_),
                ..
            }
        ));
    }

    #[test]
    fn wrong_shape_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        fs::write(&path, br#"["2024-01-10"]"#).unwrap();
        assert!(load_snapshot(&path).is_err());
    }

    #[test]
    fn directory_in_place_of_file_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_snapshot(dir.path()),
            Err(StampError::PersistenceLoad {
                source: SnapshotFault::Io(_),
                ..
            })
        ));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");

        save_snapshot(&path, &sample()).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), sample());

        save_snapshot(&path, &StampSet::new()).unwrap();
        assert!(load_snapshot(&path).unwrap().is_empty());
    }

    #[test]
    fn loads_legacy_compact_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        fs::write(
            &path,
            r#"{"2024-01-10":{"09:00":{"start:":"9:00","finish":"9:30"}}}"#,
        )
        .unwrap();

        let stamps = load_snapshot(&path).unwrap();
        assert_eq!(
            stamps["2024-01-10"]["09:00"],
            StampContent::new("9:00", "9:30")
        );
    }

    #[test]
    fn save_keeps_legacy_field_name_and_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        fs::write(&path, "x".repeat(4096)).unwrap();

        save_snapshot(&path, &sample()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"start:\""));
        assert!(!text.contains("xxxxxxxxxx"));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("db")]);
    }

    #[test]
    fn save_into_missing_directory_is_a_save_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("db");
        assert!(matches!(
            save_snapshot(&path, &sample()),
            Err(StampError::PersistenceSave { .. })
        ));
    }

    #[test]
    fn save_store_writes_live_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        let store = StampStore::new();
        store
            .record("2024-05-05".into(), "07:07".into(), StampContent::new("a", "b"))
            .unwrap();

        save_store(&path, &store).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), store.snapshot().unwrap());
    }

    #[test]
    fn racing_saves_on_one_path_all_succeed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");

        let big = StampStore::new();
        for i in 0..2000 {
            big.record(
                "2024-07-01".into(),
                format!("{:02}:{:02}", i / 60 % 24, i % 60),
                StampContent::new(i.to_string(), "x".repeat(32)),
            )
            .unwrap();
        }
        let small = StampStore::new();
        small
            .record("2024-07-02".into(), "08:00".into(), StampContent::new("a", "b"))
            .unwrap();

        for _ in 0..50 {
            let handles: Vec<_> = [big.clone(), small.clone()]
                .into_iter()
                .map(|store| {
                    let path = path.clone();
                    std::thread::spawn(move || save_store(&path, &store))
                })
                .collect();
            for h in handles {
                h.join().unwrap().unwrap();
            }

            let loaded = load_snapshot(&path).unwrap();
            assert!(
                loaded == big.snapshot().unwrap() || loaded == small.snapshot().unwrap()
            );
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn autosave_writes_periodically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        let store = StampStore::new();
        store
            .record("d".into(), "s".into(), StampContent::new("a", "b"))
            .unwrap();

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(autosave_loop(
            path.clone(),
            store.clone(),
            Duration::from_millis(20),
            stop_rx,
        ));
        for _ in 0..250 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if path.exists() {
                break;
            }
        }
        stop_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(load_snapshot(&path).unwrap(), store.snapshot().unwrap());
    }

    #[tokio::test]
    async fn stopped_autosave_never_writes_again() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(autosave_loop(
            path.clone(),
            StampStore::new(),
            Duration::from_millis(10),
            stop_rx,
        ));

        tokio::time::sleep(Duration::from_millis(35)).await;
        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("autosave did not stop")
            .unwrap();

        let final_store = StampStore::new();
        final_store
            .record("2024-08-01".into(), "18:00".into(), StampContent::new("a", "b"))
            .unwrap();
        save_store(&path, &final_store).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(load_snapshot(&path).unwrap(), final_store.snapshot().unwrap());
    }
}
