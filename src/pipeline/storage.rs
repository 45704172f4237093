// Derived asset storage
//
// Bytes are staged under .casefile/staging, fsynced, then hard-linked into
// .casefile/derived under a fresh name. The link fails instead of clobbering
// when the name is taken, so concurrent commits never overwrite each other.
// Records are written only after the final file exists; anything left behind
// by a crash in between is picked up by sweep_orphans.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use walkdir::WalkDir;

use crate::constants::{
    CASEFILE_FOLDER, DERIVED_EXTENSION, DERIVED_FOLDER, DERIVED_NAME_ATTEMPTS, DERIVED_PREFIX,
    DERIVED_SUFFIX_BYTES, PATH_DB_SEPARATOR, STAGING_EXTENSION, STAGING_FOLDER,
};
use crate::error::{MediaError, Result};

const MAX_STEM_CHARS: usize = 64;
const FALLBACK_STEM: &str = "image";

pub fn derived_dir(library_root: &Path) -> PathBuf {
    library_root.join(CASEFILE_FOLDER).join(DERIVED_FOLDER)
}

pub fn staging_dir(library_root: &Path) -> PathBuf {
    library_root.join(CASEFILE_FOLDER).join(STAGING_FOLDER)
}

/// Library-relative path as stored in records
fn derived_relative_path(name: &str) -> String {
    format!(
        "{}{sep}{}{sep}{}",
        CASEFILE_FOLDER,
        DERIVED_FOLDER,
        name,
        sep = PATH_DB_SEPARATOR
    )
}

fn random_suffix() -> String {
    let mut bytes = [0u8; DERIVED_SUFFIX_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn is_timestamp(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_suffix(s: &str) -> bool {
    s.len() == DERIVED_SUFFIX_BYTES * 2 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Strip any number of `edited_<ts>_<hex>_` layers so edits of edits keep
/// the original stem instead of growing the name.
fn base_stem(stem: &str) -> &str {
    let mut current = stem;
    while let Some(rest) = current.strip_prefix(DERIVED_PREFIX) {
        let mut parts = rest.splitn(3, '_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ts), Some(suffix), Some(tail)) if is_timestamp(ts) && is_suffix(suffix) => {
                current = tail;
            }
            _ => break,
        }
    }
    current
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_STEM_CHARS)
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `edited_<utc timestamp>_<suffix>_<source stem>.jpg`
pub fn derived_file_name(source_path: &str, now: DateTime<Utc>, suffix: &str) -> String {
    let stem = Path::new(source_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(FALLBACK_STEM);
    format!(
        "{}{}_{}_{}.{}",
        DERIVED_PREFIX,
        now.format("%Y%m%d%H%M%S%3f"),
        suffix,
        sanitize_stem(base_stem(stem)),
        DERIVED_EXTENSION
    )
}

/// A derived file that reached its final location.
#[derive(Debug, Clone)]
pub struct PersistedFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
}

fn write_staged(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn sync_dir(dir: &Path) {
    // Not supported on every platform; the file itself is already synced.
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        log::debug!("Directory sync skipped for {}: {}", dir.display(), e);
    }
}

/// Move a staged file to `target` without replacing an existing file.
/// Returns Ok(false) when the name is already taken.
fn place_no_clobber(staged: &Path, target: &Path) -> io::Result<bool> {
    match fs::hard_link(staged, target) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(staged) {
                log::warn!("Failed to remove staged file {}: {}", staged.display(), e);
            }
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => {
            // Filesystems without hard links: best-effort check then rename.
            log::debug!("Hard link unavailable ({}), falling back to rename", e);
            if target.exists() {
                return Ok(false);
            }
            fs::rename(staged, target)?;
            Ok(true)
        }
    }
}

/// Write `bytes` as a new derived asset for `source_path`.
pub fn persist_derived(library_root: &Path, source_path: &str, bytes: &[u8]) -> Result<PersistedFile> {
    let staging = staging_dir(library_root);
    let derived = derived_dir(library_root);
    fs::create_dir_all(&staging)?;
    fs::create_dir_all(&derived)?;

    let staged = staging.join(format!("{}.{}", uuid::Uuid::new_v4(), STAGING_EXTENSION));
    if let Err(e) = write_staged(&staged, bytes) {
        let _ = fs::remove_file(&staged);
        return Err(e.into());
    }

    for _ in 0..DERIVED_NAME_ATTEMPTS {
        let name = derived_file_name(source_path, Utc::now(), &random_suffix());
        let target = derived.join(&name);
        match place_no_clobber(&staged, &target) {
            Ok(true) => {
                sync_dir(&derived);
                log::debug!("Persisted derived file {}", target.display());
                return Ok(PersistedFile {
                    relative_path: derived_relative_path(&name),
                    absolute_path: target,
                    size_bytes: bytes.len() as u64,
                });
            }
            Ok(false) => continue,
            Err(e) => {
                let _ = fs::remove_file(&staged);
                return Err(e.into());
            }
        }
    }

    let _ = fs::remove_file(&staged);
    Err(MediaError::Other(format!(
        "Could not find a free derived file name after {} attempts",
        DERIVED_NAME_ATTEMPTS
    )))
}

/// Remove a persisted file whose record was never written.
pub fn remove_persisted(file: &PersistedFile) {
    if let Err(e) = fs::remove_file(&file.absolute_path) {
        log::warn!(
            "Failed to remove unreferenced derived file {}: {}",
            file.absolute_path.display(),
            e
        );
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub staging_removed: usize,
    pub orphans_removed: usize,
    pub bytes_reclaimed: u64,
    pub removed: Vec<String>,
    pub dry_run: bool,
}

fn file_age(meta: &fs::Metadata, now: SystemTime) -> Duration {
    meta.modified()
        .ok()
        .and_then(|m| now.duration_since(m).ok())
        .unwrap_or(Duration::ZERO)
}

/// Delete staging leftovers and derived files no record references.
/// Files younger than `grace` are skipped: a commit may still be between
/// placing its file and writing its record.
pub fn sweep_orphans(
    library_root: &Path,
    referenced: &HashSet<String>,
    grace: Duration,
    dry_run: bool,
) -> Result<SweepReport> {
    let mut report = SweepReport { dry_run, ..Default::default() };
    let now = SystemTime::now();

    let dirs = [(staging_dir(library_root), true), (derived_dir(library_root), false)];
    for (dir, is_staging) in dirs {
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| MediaError::Other(format!("Sweep walk failed: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_staging && referenced.contains(&derived_relative_path(&name)) {
                continue;
            }
            let meta = entry.metadata().map_err(|e| MediaError::Other(e.to_string()))?;
            if file_age(&meta, now) < grace {
                continue;
            }

            let relative = if is_staging {
                format!("{}{sep}{}{sep}{}", CASEFILE_FOLDER, STAGING_FOLDER, name, sep = PATH_DB_SEPARATOR)
            } else {
                derived_relative_path(&name)
            };

            if !dry_run {
                if let Err(e) = fs::remove_file(entry.path()) {
                    log::warn!("Sweep could not remove {}: {}", relative, e);
                    continue;
                }
            }
            log::info!("Sweep {} {}", if dry_run { "would remove" } else { "removed" }, relative);

            if is_staging {
                report.staging_removed += 1;
            } else {
                report.orphans_removed += 1;
            }
            report.bytes_reclaimed += meta.len();
            report.removed.push(relative);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_derived_file_name_shape() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).unwrap();
        let name = derived_file_name("originals/2024/03/front door.PNG", now, "0a1b2c3d");
        assert_eq!(name, "edited_20240309140506000_0a1b2c3d_front_door.jpg");
    }

    #[test]
    fn test_edit_of_edit_keeps_original_stem() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).unwrap();
        let first = derived_file_name("originals/kitchen.jpg", now, "00000001");
        let second = derived_file_name(&derived_relative_path(&first), now, "00000002");
        assert_eq!(second, "edited_20240309140506000_00000002_kitchen.jpg");
    }

    #[test]
    fn test_unusual_stems() {
        assert_eq!(sanitize_stem("../.."), "image");
        assert_eq!(sanitize_stem("a/b c"), "a_b_c");
        assert_eq!(base_stem("edited_notastamp"), "edited_notastamp");
    }

    #[test]
    fn test_persist_leaves_no_staging() {
        let tmp = TempDir::new().unwrap();
        let file = persist_derived(tmp.path(), "originals/a.png", b"jpeg bytes").unwrap();

        assert!(file.absolute_path.exists());
        assert!(file.relative_path.starts_with(".casefile/derived/edited_"));
        assert_eq!(fs::read(&file.absolute_path).unwrap(), b"jpeg bytes");
        assert_eq!(fs::read_dir(staging_dir(tmp.path())).unwrap().count(), 0);
    }

    #[test]
    fn test_persist_never_reuses_a_name() {
        let tmp = TempDir::new().unwrap();
        let a = persist_derived(tmp.path(), "originals/a.png", b"one").unwrap();
        let b = persist_derived(tmp.path(), "originals/a.png", b"two").unwrap();
        assert_ne!(a.relative_path, b.relative_path);
        assert_eq!(fs::read(&a.absolute_path).unwrap(), b"one");
        assert_eq!(fs::read(&b.absolute_path).unwrap(), b"two");
    }

    #[test]
    fn test_remove_persisted() {
        let tmp = TempDir::new().unwrap();
        let file = persist_derived(tmp.path(), "a.png", b"x").unwrap();
        remove_persisted(&file);
        assert!(!file.absolute_path.exists());
    }

    #[test]
    fn test_sweep_removes_only_unreferenced() {
        let tmp = TempDir::new().unwrap();
        let kept = persist_derived(tmp.path(), "a.png", b"kept").unwrap();
        let orphan = persist_derived(tmp.path(), "a.png", b"orphan").unwrap();
        fs::write(staging_dir(tmp.path()).join("dead.part"), b"partial").unwrap();

        let referenced: HashSet<String> = [kept.relative_path.clone()].into_iter().collect();

        let dry = sweep_orphans(tmp.path(), &referenced, Duration::ZERO, true).unwrap();
        assert_eq!(dry.orphans_removed, 1);
        assert!(orphan.absolute_path.exists());

        let report = sweep_orphans(tmp.path(), &referenced, Duration::ZERO, false).unwrap();
        assert_eq!(report.orphans_removed, 1);
        assert_eq!(report.staging_removed, 1);
        assert_eq!(report.bytes_reclaimed, 6 + 7);
        assert!(kept.absolute_path.exists());
        assert!(!orphan.absolute_path.exists());
    }

    #[test]
    fn test_sweep_respects_grace_period() {
        let tmp = TempDir::new().unwrap();
        let fresh = persist_derived(tmp.path(), "a.png", b"fresh").unwrap();
        let report = sweep_orphans(tmp.path(), &HashSet::new(), Duration::from_secs(600), false).unwrap();
        assert_eq!(report.orphans_removed, 0);
        assert!(fresh.absolute_path.exists());
    }
}
