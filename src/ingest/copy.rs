// File copy operations for import

use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};

use crate::constants::PATH_DB_SEPARATOR;
use crate::error::{MediaError, Result};
use crate::hash::compute_full_hash;

/// Copy a file into the originals folder under `YYYY/MM` (from its modified
/// time). Returns the absolute destination path.
pub fn copy_file_to_originals(source: &Path, originals_dir: &Path) -> Result<PathBuf> {
    let modified = fs::metadata(source).and_then(|m| m.modified()).ok();

    let date_folder = match modified {
        Some(modified) => {
            let datetime: chrono::DateTime<Utc> = modified.into();
            format!("{}/{:02}", datetime.year(), datetime.month())
        }
        None => "unknown".to_string(),
    };

    let dest_dir = originals_dir.join(&date_folder);
    fs::create_dir_all(&dest_dir)?;

    let filename = source
        .file_name()
        .ok_or_else(|| MediaError::InvalidPath(format!("No filename: {}", source.display())))?;

    let mut dest_path = dest_dir.join(filename);
    if dest_path.exists() {
        dest_path = generate_unique_path(&dest_path)?;
    }

    copy_with_verify(source, &dest_path)?;
    Ok(dest_path)
}

/// Path relative to `library_root` using the stored separator.
pub fn library_relative(library_root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(library_root).map_err(|_| {
        MediaError::InvalidPath(format!("{} is outside the library", path.display()))
    })?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Ok(parts.join(&PATH_DB_SEPARATOR.to_string()))
}

/// Generate a unique path by appending a number
fn generate_unique_path(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    for i in 1..1000 {
        let new_name = if ext.is_empty() {
            format!("{}_{}", stem, i)
        } else {
            format!("{}_{}.{}", stem, i, ext)
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
    }

    Err(MediaError::Other("Could not generate unique filename".to_string()))
}

/// Copy file with read-back verification (size and content hash)
fn copy_with_verify(source: &Path, dest: &Path) -> Result<()> {
    let mut reader = BufReader::new(fs::File::open(source)?);
    let mut dest_file = fs::OpenOptions::new().write(true).create_new(true).open(dest)?;
    {
        let mut writer = BufWriter::new(&mut dest_file);
        if let Err(e) = io::copy(&mut reader, &mut writer).and_then(|_| writer.flush()) {
            drop(writer);
            let _ = fs::remove_file(dest);
            return Err(e.into());
        }
    }
    dest_file.sync_all()?;

    let source_size = fs::metadata(source)?.len();
    let dest_size = fs::metadata(dest)?.len();
    if source_size != dest_size {
        let _ = fs::remove_file(dest);
        return Err(MediaError::Other(format!(
            "Verification failed: size mismatch ({} vs {})",
            source_size, dest_size
        )));
    }

    if compute_full_hash(source)? != compute_full_hash(dest)? {
        let _ = fs::remove_file(dest);
        return Err(MediaError::Hash("Verification failed: content mismatch".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dates_and_dedupes_names() {
        let src_dir = TempDir::new().unwrap();
        let lib = TempDir::new().unwrap();
        let source = src_dir.path().join("door.jpg");
        fs::write(&source, b"not really a jpeg").unwrap();
        let originals = lib.path().join("originals");

        let first = copy_file_to_originals(&source, &originals).unwrap();
        let second = copy_file_to_originals(&source, &originals).unwrap();

        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "door_1.jpg");
        assert_eq!(fs::read(&second).unwrap(), b"not really a jpeg");

        let rel = library_relative(lib.path(), &first).unwrap();
        assert!(rel.starts_with("originals/"));
        assert!(rel.ends_with("/door.jpg"));
        assert_eq!(rel.split('/').count(), 4);
    }

    #[test]
    fn test_relative_outside_library() {
        let lib = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        assert!(library_relative(lib.path(), other.path()).is_err());
    }
}
