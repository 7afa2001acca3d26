//! Sibling-temp-file writes.
//!
//! A write is staged to `<file_name>.new` next to the destination and then
//! renamed over it. Staging and committing are separate so several files can
//! be staged before any of them replaces its destination.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A fully written temp file waiting to replace `dest`.
#[derive(Debug)]
#[must_use = "a staged file is left behind unless committed or discarded"]
pub struct Staged {
    tmp: PathBuf,
    dest: PathBuf,
}

impl Staged {
    pub fn commit(self) -> io::Result<()> {
        let renamed = fs::rename(&self.tmp, &self.dest);
        if renamed.is_err() {
            let _ = fs::remove_file(&self.tmp);
        }
        renamed
    }

    pub fn discard(self) {
        let _ = fs::remove_file(&self.tmp);
    }
}

/// `state.json` stages to `state.json.new`, so files sharing a stem never
/// share a temp file.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".new");
    path.with_file_name(name)
}

/// Write and sync the temp file for `path`, creating the parent directory on
/// first use.
pub fn stage(path: &Path, bytes: &[u8]) -> io::Result<Staged> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let tmp = temp_path(path);
    let written = fs::File::create(&tmp).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(Staged {
        tmp,
        dest: path.to_path_buf(),
    })
}

/// Replace `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    stage(path, bytes)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/file.json");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn files_sharing_a_stem_keep_their_own_contents() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("state.json");
        let snap = dir.path().join("state.snap");

        let a = stage(&json, b"json").unwrap();
        let b = stage(&snap, b"snap").unwrap();
        a.commit().unwrap();
        b.commit().unwrap();

        assert_eq!(fs::read(&json).unwrap(), b"json");
        assert_eq!(fs::read(&snap).unwrap(), b"snap");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".new")), "{names:?}");
    }

    #[test]
    fn failed_commit_removes_the_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("occupied");
        fs::create_dir_all(path.join("child")).unwrap();
        assert!(write_atomic(&path, b"state").is_err());
        assert!(path.is_dir());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn discarded_stage_leaves_destination_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        write_atomic(&path, b"old").unwrap();
        stage(&path, b"new").unwrap().discard();
        assert_eq!(fs::read(&path).unwrap(), b"old");
        assert!(!temp_path(&path).exists());
    }
}
