//! Polling directory watch — snapshot diffing, no inotify.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Watches a directory by comparing listing snapshots.
///
/// Each [`DirWatcher::poll`] yields the names that appeared since the last
/// poll, in sorted order, as one finite batch. Hidden files (leading dot)
/// and subdirectories are ignored. Names never seen to disappear are not
/// reported again, and nothing is ever deleted — files accumulate.
pub struct DirWatcher {
    dir: PathBuf,
    seen: HashSet<String>,
}

impl DirWatcher {
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        let seen = snapshot(dir)?;
        tracing::info!(dir = %dir.display(), initial = seen.len(), "watching directory");
        Ok(Self {
            dir: dir.to_path_buf(),
            seen,
        })
    }

    /// Take a fresh snapshot and return the newly added file names.
    pub fn poll(&mut self) -> std::io::Result<Vec<String>> {
        let current = snapshot(&self.dir)?;
        let mut added: Vec<String> = current.difference(&self.seen).cloned().collect();
        added.sort();
        self.seen = current;
        Ok(added)
    }
}

fn snapshot(dir: &Path) -> std::io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.insert(name.to_string());
            }
        }
    }
    Ok(names)
}
