use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::ArchConfig;
use crate::error::ArchError;

/// A filesystem node: a directory or an eligible source/header file.
///
/// Created once by [`scan`] and never mutated afterward — owned by the
/// [`FsIndex`] that produced it.
#[derive(Debug, Clone)]
pub struct FsEntry {
    pub id: u32,
    pub name: String,
    pub full_path: PathBuf,
    pub is_dir: bool,
    /// Ids of direct children, in scan order. Empty for files.
    pub children: Vec<u32>,
}

/// The full filesystem model produced by a scan: every entry plus two
/// lookup indexes (`spec.md` §3's `FSIndex`).
///
/// Ids are dense, starting at 0, in depth-first preorder; `root` is always 0.
pub struct FsIndex {
    pub root: u32,
    by_id: Vec<FsEntry>,
    by_path: HashMap<PathBuf, u32>,
}

impl FsIndex {
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn entry(&self, id: u32) -> &FsEntry {
        &self.by_id[id as usize]
    }

    pub fn full_path(&self, id: u32) -> &Path {
        &self.by_id[id as usize].full_path
    }

    /// Returns the id of the entry at `path`, or `None` if `path` is not under
    /// the scanned tree. Uses canonical-path equality.
    pub fn id_by_path(&self, path: &Path) -> Option<u32> {
        let canonical = std::fs::canonicalize(path).ok()?;
        self.by_path.get(&canonical).copied()
    }

    /// All descendant ids of `id`, inclusive, in preorder.
    pub fn descendants(&self, id: u32) -> Vec<u32> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: u32, out: &mut Vec<u32>) {
        out.push(id);
        for &child in &self.by_id[id as usize].children {
            self.collect_descendants(child, out);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FsEntry> {
        self.by_id.iter()
    }
}

struct Builder {
    entries: Vec<FsEntry>,
    by_path: HashMap<PathBuf, u32>,
    next_id: u32,
}

impl Builder {
    fn add(&mut self, name: String, full_path: PathBuf, is_dir: bool, parent: Option<u32>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(FsEntry {
            id,
            name,
            full_path: full_path.clone(),
            is_dir,
            children: Vec::new(),
        });
        self.by_path.insert(full_path, id);
        if let Some(parent_id) = parent {
            self.entries[parent_id as usize].children.push(id);
        }
        id
    }
}

/// Scan `base_dir` into a full [`FsIndex`] (`spec.md` §4.A's `scan(root) -> FSIndex`).
///
/// Scan order is depth-first preorder with directory entries sorted
/// alphabetically for reproducibility (`spec.md` §4.A recommends this). An
/// entry is eligible iff it is a directory, or its lowercased name ends in
/// one of `config`'s extensions, and its path contains none of `config`'s
/// exclusion substrings; excluded directories are neither indexed nor
/// descended into.
///
/// An I/O failure on `base_dir` itself is fatal; failures reading a
/// subdirectory are logged and that subtree is skipped.
pub fn scan(base_dir: &Path, config: &ArchConfig) -> Result<FsIndex, ArchError> {
    let canonical_root = std::fs::canonicalize(base_dir).map_err(|source| ArchError::ScanRootIo {
        path: base_dir.to_path_buf(),
        source,
    })?;

    if !canonical_root.is_dir() {
        return Err(ArchError::ScanRootIo {
            path: base_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "base directory is not a directory"),
        });
    }

    let mut builder = Builder {
        entries: Vec::new(),
        by_path: HashMap::new(),
        next_id: 0,
    };

    let root_name = canonical_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| canonical_root.to_string_lossy().into_owned());
    let root_id = builder.add(root_name, canonical_root.clone(), true, None);

    walk_directory(&canonical_root, root_id, &mut builder, config);

    tracing::info!(file_count = builder.entries.len(), "filesystem scan complete");

    Ok(FsIndex {
        root: root_id,
        by_id: builder.entries,
        by_path: builder.by_path,
    })
}

fn walk_directory(dir: &Path, parent_id: u32, builder: &mut Builder, config: &ArchConfig) {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(err) => {
            tracing::warn!(path = %dir.display(), error = %err, "skipping unreadable directory");
            return;
        }
    };

    let mut entries: Vec<_> = read_dir.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);

        if !is_eligible(&path, is_dir, config) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let canonical = std::fs::canonicalize(&path).unwrap_or(path.clone());
        let id = builder.add(name, canonical, is_dir, Some(parent_id));

        if is_dir {
            walk_directory(&path, id, builder, config);
        }
    }
}

fn is_eligible(path: &Path, is_dir: bool, config: &ArchConfig) -> bool {
    let path_str = path.to_string_lossy();
    if config.is_excluded(&path_str) {
        return false;
    }

    if is_dir {
        return true;
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    config.matches_extension(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn ids_are_dense_and_indexes_agree() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a.h"), "");
        write(&dir.path().join("sub/b.cpp"), "");
        write(&dir.path().join("ignore.txt"), "");

        let config = ArchConfig::default();
        let index = scan(dir.path(), &config).unwrap();

        for (i, entry) in index.iter().enumerate() {
            assert_eq!(entry.id, i as u32);
            assert_eq!(index.id_by_path(&entry.full_path), Some(entry.id));
        }
    }

    #[test]
    fn excludes_build_dir_and_non_source_files() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("build/generated.cpp"), "");
        write(&dir.path().join("README.md"), "");
        write(&dir.path().join("src/main.cpp"), "");

        let config = ArchConfig::default();
        let index = scan(dir.path(), &config).unwrap();

        let names: Vec<_> = index.iter().map(|e| e.name.as_str()).collect();
        assert!(!names.contains(&"generated.cpp"));
        assert!(!names.contains(&"README.md"));
        assert!(names.contains(&"main.cpp"));
    }

    #[test]
    fn descendants_is_preorder_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a/x.h"), "");
        write(&dir.path().join("a/b/y.h"), "");

        let config = ArchConfig::default();
        let index = scan(dir.path(), &config).unwrap();

        let a_id = index
            .iter()
            .find(|e| e.name == "a")
            .map(|e| e.id)
            .unwrap();
        let desc = index.descendants(a_id);
        assert_eq!(desc[0], a_id);
        assert_eq!(desc.len(), 4); // a, x.h, b, y.h
    }

    #[test]
    fn scan_of_nonexistent_root_is_fatal() {
        let config = ArchConfig::default();
        let result = scan(Path::new("/no/such/path/hopefully"), &config);
        assert!(result.is_err());
    }
}
