//! File-system primitives used by [`DocumentStore`](super::DocumentStore).
//!
//! The store never touches `std::fs` directly; it goes through [`FileBackend`]
//! so that tests can substitute a backend that fails on demand.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fs2::FileExt;

/// A regular file discovered while walking the store root.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Synchronous file operations needed by the document store.
pub trait FileBackend: Send + Sync {
    /// Read a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace (or create) `path` so that readers see either the old or the new content.
    fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Move `from` to `to`; fails with `AlreadyExists` instead of overwriting.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file. A missing file is not an error.
    fn remove(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Size and modification time of a single file.
    fn stat(&self, path: &Path) -> io::Result<FileEntry>;

    /// Every regular file below `root`, skipping hidden entries.
    fn walk(&self, root: &Path) -> io::Result<Vec<FileEntry>>;

    /// Names of the non-hidden directories directly under `root`.
    fn list_dirs(&self, root: &Path) -> io::Result<Vec<String>>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Backend over the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(true)
}

impl LocalFs {
    /// Replace `path` with whatever `fill` writes into a hidden temp file.
    ///
    /// An existing destination is locked while it is replaced; a new one is
    /// not created until the rename. On any error the temp file is removed
    /// and `path` is left as it was.
    pub fn write_with<F>(&self, path: &Path, fill: F) -> io::Result<()>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let lock_file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => {
                file.lock_exclusive()?;
                Some(file)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("quest.yml");
        let mut counter = 0u32;
        let (tmp_path, mut tmp) = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(tmp) => break (candidate, tmp),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        };

        let written = fill(&mut tmp).and_then(|()| tmp.sync_all());
        drop(tmp);
        if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        drop(lock_file);
        Ok(())
    }

    fn walk_into(&self, dir: &Path, out: &mut Vec<FileEntry>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if is_hidden(&entry.file_name()) {
                continue;
            }
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                self.walk_into(&path, out)?;
            } else if file_type.is_file() {
                let meta = entry.metadata()?;
                out.push(FileEntry {
                    path,
                    size: meta.len(),
                    modified: meta.modified().ok(),
                });
            }
        }
        Ok(())
    }
}

impl FileBackend for LocalFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.write_with(path, |file| {
            file.write_all(contents.as_bytes())?;
            file.flush()
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn stat(&self, path: &Path) -> io::Result<FileEntry> {
        let meta = fs::metadata(path)?;
        Ok(FileEntry {
            path: path.to_path_buf(),
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<FileEntry>> {
        let mut out = Vec::new();
        if root.is_dir() {
            self.walk_into(root, &mut out)?;
        }
        Ok(out)
    }

    fn list_dirs(&self, root: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        if !root.is_dir() {
            return Ok(names);
        }
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if is_hidden(&entry.file_name()) || !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}
