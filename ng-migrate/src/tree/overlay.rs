//! Staged tree over an on-disk directory or an in-memory fixture.
//!
//! Writes land in an overlay map and never touch the base until
//! [`OverlayTree::persist`] is called, so a failed run can simply be dropped.

use super::{normalize, DirEntries, Tree};
use crate::error::TreeError;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Directories never indexed from disk.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist", ".angular"];

#[derive(Debug, Clone)]
enum BaseFile {
    /// Content lives at `root/<path>` and is read on demand.
    Disk,
    Memory(Vec<u8>),
}

#[derive(Debug, Clone)]
enum Staged {
    File(Vec<u8>),
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// One staged difference against the base.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
    pub original: Option<Vec<u8>>,
    pub content: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayTree {
    root: Option<PathBuf>,
    base: BTreeMap<String, BaseFile>,
    staged: BTreeMap<String, Staged>,
}

impl OverlayTree {
    /// An empty in-memory tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// An in-memory tree seeded with `(path, content)` pairs.
    pub fn from_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: AsRef<str>,
        C: Into<Vec<u8>>,
    {
        let base = files
            .into_iter()
            .map(|(p, c)| (normalize(p.as_ref()), BaseFile::Memory(c.into())))
            .collect();
        Self { root: None, base, staged: BTreeMap::new() }
    }

    /// Index every file under `root`, skipping [`SKIPPED_DIRS`].
    pub fn load(root: impl AsRef<Path>) -> Result<Self, TreeError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(TreeError::Io {
                path: root,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let mut base = BTreeMap::new();
        let walker = WalkDir::new(&root).into_iter().filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !SKIPPED_DIRS.iter().any(|d| e.file_name() == *d)
        });
        for entry in walker {
            let entry = entry.map_err(|e| TreeError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk loop")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&root) {
                base.insert(normalize(&rel.to_string_lossy()), BaseFile::Disk);
            }
        }
        debug!(root = %root.display(), files = base.len(), "indexed tree");

        Ok(Self { root: Some(root), base, staged: BTreeMap::new() })
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn read_base(&self, path: &str) -> Result<Option<Vec<u8>>, TreeError> {
        match self.base.get(path) {
            Some(BaseFile::Memory(bytes)) => Ok(Some(bytes.clone())),
            Some(BaseFile::Disk) => {
                let Some(root) = &self.root else {
                    return Ok(None);
                };
                let full = root.join(path);
                fs::read(&full)
                    .map(Some)
                    .map_err(|source| TreeError::Io { path: full, source })
            }
            None => Ok(None),
        }
    }

    /// Every file currently visible, in path order.
    pub fn files(&self) -> Vec<String> {
        let mut all: BTreeSet<&String> = self.base.keys().collect();
        for (path, entry) in &self.staged {
            match entry {
                Staged::File(_) => {
                    all.insert(path);
                }
                Staged::Deleted => {
                    all.remove(path);
                }
            }
        }
        all.into_iter().cloned().collect()
    }

    pub fn has_changes(&self) -> bool {
        !self.changes().is_empty()
    }

    /// Staged differences against the base, in path order. A file whose staged
    /// content equals the base content is not reported.
    pub fn changes(&self) -> Vec<FileChange> {
        let mut out = Vec::new();
        for (path, entry) in &self.staged {
            let original = self.read_base(path).ok().flatten();
            match (entry, original) {
                (Staged::File(content), None) => out.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Created,
                    original: None,
                    content: Some(content.clone()),
                }),
                (Staged::File(content), Some(original)) => {
                    if *content != original {
                        out.push(FileChange {
                            path: path.clone(),
                            kind: ChangeKind::Modified,
                            original: Some(original),
                            content: Some(content.clone()),
                        });
                    }
                }
                (Staged::Deleted, Some(original)) => out.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Deleted,
                    original: Some(original),
                    content: None,
                }),
                (Staged::Deleted, None) => {}
            }
        }
        out
    }

    /// Write staged changes through to the base (and to disk for a loaded
    /// tree). Returns the paths that changed.
    pub fn persist(&mut self) -> Result<Vec<String>, TreeError> {
        let changes = self.changes();
        for change in &changes {
            if let Some(root) = &self.root {
                let full = root.join(&change.path);
                match &change.content {
                    Some(content) => {
                        if let Some(parent) = full.parent() {
                            fs::create_dir_all(parent)
                                .map_err(|source| TreeError::Io { path: parent.to_path_buf(), source })?;
                        }
                        fs::write(&full, content)
                            .map_err(|source| TreeError::Io { path: full.clone(), source })?;
                    }
                    None => {
                        fs::remove_file(&full)
                            .map_err(|source| TreeError::Io { path: full.clone(), source })?;
                    }
                }
            }
        }

        for (path, entry) in std::mem::take(&mut self.staged) {
            match entry {
                Staged::File(content) => {
                    let base = if self.root.is_some() {
                        BaseFile::Disk
                    } else {
                        BaseFile::Memory(content)
                    };
                    self.base.insert(path, base);
                }
                Staged::Deleted => {
                    self.base.remove(&path);
                }
            }
        }

        Ok(changes.into_iter().map(|c| c.path).collect())
    }

    /// Drop every staged change.
    pub fn discard(&mut self) {
        self.staged.clear();
    }
}

impl Tree for OverlayTree {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, TreeError> {
        let path = normalize(path);
        match self.staged.get(&path) {
            Some(Staged::File(bytes)) => Ok(Some(bytes.clone())),
            Some(Staged::Deleted) => Ok(None),
            None => self.read_base(&path),
        }
    }

    fn exists(&self, path: &str) -> bool {
        let path = normalize(path);
        match self.staged.get(&path) {
            Some(Staged::File(_)) => true,
            Some(Staged::Deleted) => false,
            None => self.base.contains_key(&path),
        }
    }

    fn create(&mut self, path: &str, content: Vec<u8>) -> Result<(), TreeError> {
        if self.exists(path) {
            return Err(TreeError::AlreadyExists(normalize(path)));
        }
        self.staged.insert(normalize(path), Staged::File(content));
        Ok(())
    }

    fn overwrite(&mut self, path: &str, content: Vec<u8>) -> Result<(), TreeError> {
        if !self.exists(path) {
            return Err(TreeError::NotFound(normalize(path)));
        }
        self.staged.insert(normalize(path), Staged::File(content));
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), TreeError> {
        if !self.exists(path) {
            return Err(TreeError::NotFound(normalize(path)));
        }
        let path = normalize(path);
        if self.base.contains_key(&path) {
            self.staged.insert(path, Staged::Deleted);
        } else {
            self.staged.remove(&path);
        }
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), TreeError> {
        let content = self
            .read(from)?
            .ok_or_else(|| TreeError::NotFound(normalize(from)))?;
        if self.exists(to) {
            return Err(TreeError::AlreadyExists(normalize(to)));
        }
        self.delete(from)?;
        self.staged.insert(normalize(to), Staged::File(content));
        Ok(())
    }

    fn list_dir(&self, path: &str) -> DirEntries {
        let dir = normalize(path);
        let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir) };

        let mut files = BTreeSet::new();
        let mut dirs = BTreeSet::new();
        for file in self.files() {
            let Some(rest) = file.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((sub, _)) => {
                    dirs.insert(sub.to_string());
                }
                None => {
                    files.insert(rest.to_string());
                }
            }
        }

        DirEntries {
            files: files.into_iter().collect(),
            dirs: dirs.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;
    use tempfile::TempDir;

    fn fixture() -> OverlayTree {
        OverlayTree::from_files([
            ("src/app/app.component.ts", "export class AppComponent {}"),
            ("src/app/app.component.html", "<div></div>"),
            ("src/main.ts", "import './app/app.component';"),
        ])
    }

    #[test]
    fn test_read_through_overlay() {
        let mut tree = fixture();
        assert_eq!(tree.read_text("src/main.ts").unwrap().unwrap(), "import './app/app.component';");

        tree.overwrite("src/main.ts", b"changed".to_vec()).unwrap();
        assert_eq!(tree.read_text("./src/main.ts").unwrap().unwrap(), "changed");

        tree.delete("src/main.ts").unwrap();
        assert!(!tree.exists("src/main.ts"));
        assert!(tree.read("src/main.ts").unwrap().is_none());
    }

    #[test]
    fn test_create_and_rename() {
        let mut tree = fixture();
        assert!(tree.create("src/main.ts", Vec::new()).is_err());

        tree.create("src/new.ts", b"x".to_vec()).unwrap();
        tree.rename("src/new.ts", "src/renamed.ts").unwrap();
        assert!(!tree.exists("src/new.ts"));
        assert_eq!(tree.read("src/renamed.ts").unwrap().unwrap(), b"x");

        let changes = tree.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Created);
    }

    #[test]
    fn test_list_dir() {
        let tree = fixture();
        let root = tree.list_dir("");
        assert_eq!(root.dirs, vec!["src"]);
        assert!(root.files.is_empty());

        let src = tree.list_dir("src");
        assert_eq!(src.files, vec!["main.ts"]);
        assert_eq!(src.dirs, vec!["app"]);
    }

    #[test]
    fn test_unchanged_overwrite_is_not_a_change() {
        let mut tree = fixture();
        tree.overwrite("src/main.ts", b"import './app/app.component';".to_vec()).unwrap();
        assert!(!tree.has_changes());
    }

    #[test]
    fn test_commit_update_through_recorder() {
        let mut tree = fixture();
        let mut rec = tree.begin_update("src/app/app.component.html").unwrap();
        rec.replace(1, 3, "span").replace(7, 3, "span");
        tree.commit_update(rec).unwrap();
        assert_eq!(
            tree.read_text("src/app/app.component.html").unwrap().unwrap(),
            "<span></span>"
        );
    }

    #[test]
    fn test_commit_of_stale_recorder_fails() {
        let mut tree = fixture();
        let mut rec = tree.begin_update("src/app/app.component.html").unwrap();
        rec.replace(1, 3, "span");
        tree.overwrite("src/app/app.component.html", b"<p></p>".to_vec()).unwrap();

        let err = tree.commit_update(rec).unwrap_err();
        assert!(
            matches!(&err, MigrationError::StaleSnapshot { path } if path == "src/app/app.component.html"),
            "{}",
            err
        );
        assert!(err.is_fatal());
        assert_eq!(tree.read_text("src/app/app.component.html").unwrap().unwrap(), "<p></p>");
    }

    #[test]
    fn test_load_and_persist_on_disk() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "const a = 1;").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.d.ts"), "export {};").unwrap();

        let mut tree = OverlayTree::load(dir.path()).unwrap();
        assert_eq!(tree.files(), vec!["src/a.ts"]);

        tree.overwrite("src/a.ts", b"const a = 2;".to_vec()).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("src/a.ts")).unwrap(), "const a = 1;");

        let written = tree.persist().unwrap();
        assert_eq!(written, vec!["src/a.ts"]);
        assert_eq!(fs::read_to_string(dir.path().join("src/a.ts")).unwrap(), "const a = 2;");
        assert!(!tree.has_changes());
    }
}
