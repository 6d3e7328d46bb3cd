//! JSON persistence helpers: atomic writes and tolerant cache reads.
//!
//! Every state file the pipeline rewrites goes through [`write_json_atomic`]:
//! serialize to a sibling temp path, flush and sync, then rename over the
//! target. A crash mid-write leaves the prior version intact. Reads of
//! pipeline-owned caches go through [`read_json_or_default`], which treats a
//! missing or corrupt file as an empty default with a logged warning.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Hard cap applied to cache reads. Anything larger is treated as corrupt.
pub const MAX_CACHE_BYTES: u64 = 10 * 1024 * 1024;

/// Serialize `value` to pretty JSON and atomically replace `path` with it.
///
/// The temp file lives next to the target so the rename never crosses a
/// filesystem boundary. On any failure the temp file is removed and the
/// caller sees [`Error::AtomicWrite`]; the target is untouched.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &payload)
}

/// Atomically replace `path` with `payload`.
pub fn write_bytes_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::atomic_write(path, format!("create parent dir: {e}")))?;
    }

    let tmp = temp_sibling(path);
    let result = (|| -> Result<()> {
        let mut file =
            File::create(&tmp).map_err(|e| Error::atomic_write(path, format!("create temp: {e}")))?;
        file.write_all(payload)
            .map_err(|e| Error::atomic_write(path, format!("write temp: {e}")))?;
        file.sync_all()
            .map_err(|e| Error::atomic_write(path, format!("sync temp: {e}")))?;
        fs::rename(&tmp, path)
            .map_err(|e| Error::atomic_write(path, format!("replace: {e}")))?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Read and deserialize `path`, degrading to `T::default()` on a missing,
/// oversized, or unparseable file. Corruption is logged, never fatal.
pub fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match read_json_strict(path) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(err) => {
            warn!(path = %path.display(), %err, "cache unreadable, using empty default");
            T::default()
        }
    }
}

/// Read and deserialize `path`. Returns `Ok(None)` when the file does not
/// exist and an error for oversized or unparseable content.
pub fn read_json_strict<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if meta.len() > MAX_CACHE_BYTES {
        return Err(Error::cache_corruption(
            path,
            format!("{} bytes exceeds {MAX_CACHE_BYTES}-byte cap", meta.len()),
        ));
    }
    let raw = fs::read(path)?;
    let value = serde_json::from_slice(&raw)
        .map_err(|e| Error::cache_corruption(path, e.to_string()))?;
    Ok(Some(value))
}

fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    name.push_str(".tmp");
    match path.parent() {
        Some(parent) => parent.join(name),
        None => std::path::PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        entries: BTreeMap<String, u32>,
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut sample = Sample::default();
        sample.entries.insert("fema_bric".to_string(), 3);
        write_json_atomic(&path, &sample).unwrap();

        let loaded: Sample = read_json_or_default(&path);
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let loaded: Sample = read_json_or_default(&dir.path().join("absent.json"));
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_corrupt_file_is_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{not json").unwrap();

        let loaded: Sample = read_json_or_default(&path);
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_mid_write_failure_leaves_prior_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut first = Sample::default();
        first.entries.insert("prior".to_string(), 1);
        write_json_atomic(&path, &first).unwrap();

        // Inject a failure before the replace step: a directory squatting on
        // the temp sibling makes the temp create fail.
        fs::create_dir(temp_sibling(&path)).unwrap();

        let mut second = Sample::default();
        second.entries.insert("next".to_string(), 2);
        let err = write_json_atomic(&path, &second).unwrap_err();
        assert!(matches!(err, Error::AtomicWrite { .. }));

        // The prior version is untouched.
        let loaded: Sample = read_json_or_default(&path);
        assert_eq!(loaded, first);
    }

    #[test]
    fn test_replace_step_failure_cleans_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        // Force the rename itself to fail: the target is a non-empty
        // directory, which rename refuses to clobber.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), b"x").unwrap();

        let mut sample = Sample::default();
        sample.entries.insert("next".to_string(), 2);
        let err = write_json_atomic(&path, &sample).unwrap_err();
        assert!(matches!(err, Error::AtomicWrite { .. }));
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.json");
        fs::write(&path, vec![b' '; (MAX_CACHE_BYTES + 1) as usize]).unwrap();

        let err = read_json_strict::<Sample>(&path).unwrap_err();
        assert!(matches!(err, Error::CacheCorruption { .. }));
    }
}
