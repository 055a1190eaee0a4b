//! The source tree a migration runs against.
//!
//! Everything the engine reads or writes goes through [`Tree`]. Paths are
//! normalized, `/`-separated and relative to the tree root (`""` is the root).

pub mod overlay;
pub mod recorder;

pub use overlay::{ChangeKind, FileChange, OverlayTree};
pub use recorder::{EditOperation, InsertSide, UpdateRecorder};

use crate::error::{MigrationError, Result, TreeError};

/// Immediate children of a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntries {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

pub trait Tree {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, TreeError>;

    fn exists(&self, path: &str) -> bool;

    fn create(&mut self, path: &str, content: Vec<u8>) -> Result<(), TreeError>;

    fn overwrite(&mut self, path: &str, content: Vec<u8>) -> Result<(), TreeError>;

    fn delete(&mut self, path: &str) -> Result<(), TreeError>;

    fn rename(&mut self, from: &str, to: &str) -> Result<(), TreeError>;

    /// Names (not paths) of the files and directories directly under `path`.
    fn list_dir(&self, path: &str) -> DirEntries;

    fn read_text(&self, path: &str) -> Result<Option<String>, TreeError> {
        match self.read(path)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| TreeError::NotUtf8 { path: path.to_string() }),
            None => Ok(None),
        }
    }

    /// Open a recorder against the current content of `path`.
    fn begin_update(&self, path: &str) -> Result<UpdateRecorder> {
        let path = normalize(path);
        let text = self
            .read_text(&path)?
            .ok_or_else(|| TreeError::NotFound(path.clone()))?;
        Ok(UpdateRecorder::new(path, text))
    }

    /// Apply a recorder and replace the file content once.
    ///
    /// Fails with `StaleSnapshot` if the file changed since the recorder was
    /// opened.
    fn commit_update(&mut self, recorder: UpdateRecorder) -> Result<()> {
        if recorder.is_empty() {
            return Ok(());
        }
        let current = self
            .read_text(recorder.path())?
            .ok_or_else(|| TreeError::NotFound(recorder.path().to_string()))?;
        if current != recorder.snapshot() {
            return Err(MigrationError::StaleSnapshot { path: recorder.path().to_string() });
        }
        let updated = recorder.apply()?;
        if updated != current {
            self.overwrite(recorder.path(), updated.into_bytes())?;
        }
        Ok(())
    }
}

/// Normalize a tree path: `/` separators, no `.` segments, `..` folded,
/// no leading or trailing slash.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Join `rel` onto directory `dir` and normalize. An absolute `rel`
/// (leading `/`) is taken relative to the tree root.
pub fn join(dir: &str, rel: &str) -> String {
    if rel.starts_with('/') || dir.is_empty() {
        normalize(rel)
    } else {
        normalize(&format!("{}/{}", dir, rel))
    }
}

pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./src//app/../main.ts"), "src/main.ts");
        assert_eq!(normalize("/src/app/"), "src/app");
        assert_eq!(normalize("src\\app\\x.ts"), "src/app/x.ts");
        assert_eq!(normalize("."), "");
        assert_eq!(normalize("../outside.ts"), "outside.ts");
    }

    #[test]
    fn test_join_and_dirname() {
        assert_eq!(join("src/app", "./a.component.html"), "src/app/a.component.html");
        assert_eq!(join("src/app", "../shared/b.html"), "src/shared/b.html");
        assert_eq!(join("", "a.ts"), "a.ts");
        assert_eq!(join("src", "/root.ts"), "root.ts");
        assert_eq!(dirname("src/app/a.ts"), "src/app");
        assert_eq!(dirname("a.ts"), "");
        assert_eq!(basename("src/app/a.ts"), "a.ts");
    }
}
