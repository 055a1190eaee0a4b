//! The compiler's view of a [`Tree`]: file reads, existence checks and
//! directory walks, all answered from the tree including staged edits.

use super::SourceFile;
use crate::error::{MigrationError, TreeError};
use crate::tree::{join, normalize, Tree};

pub struct CompilerHost<'t, T: Tree + ?Sized> {
    tree: &'t T,
}

impl<'t, T: Tree + ?Sized> CompilerHost<'t, T> {
    pub fn new(tree: &'t T) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &'t T {
        self.tree
    }

    pub fn read_file(&self, path: &str) -> Result<Option<String>, TreeError> {
        self.tree.read_text(&normalize(path))
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.tree.exists(&normalize(path))
    }

    pub fn directory_exists(&self, path: &str) -> bool {
        let path = normalize(path);
        if path.is_empty() {
            return true;
        }
        let entries = self.tree.list_dir(&path);
        !entries.files.is_empty() || !entries.dirs.is_empty()
    }

    pub fn directories(&self, path: &str) -> Vec<String> {
        self.tree.list_dir(&normalize(path)).dirs
    }

    /// Every file below `dir`, as tree paths in sorted order.
    pub fn all_files(&self, dir: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![normalize(dir)];
        while let Some(current) = stack.pop() {
            let entries = self.tree.list_dir(&current);
            out.extend(entries.files.iter().map(|f| join(&current, f)));
            stack.extend(entries.dirs.iter().map(|d| join(&current, d)));
        }
        out.sort();
        out
    }

    /// Read and parse `path`. `Ok(None)` when the file does not exist.
    pub fn source_file(&self, path: &str) -> Result<Option<SourceFile>, MigrationError> {
        let path = normalize(path);
        match self.read_file(&path)? {
            Some(text) => SourceFile::parse(&path, text).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::OverlayTree;

    #[test]
    fn test_host_answers_from_tree() {
        let mut tree = OverlayTree::from_files([
            ("src/app/a.ts", "export const a = 1;"),
            ("src/b.ts", "export const b = 2;"),
        ]);
        tree.create("src/app/nested/c.ts", b"export {};".to_vec()).unwrap();

        let host = CompilerHost::new(&tree);
        assert!(host.file_exists("./src/b.ts"));
        assert!(host.directory_exists("src/app"));
        assert!(!host.directory_exists("src/missing"));
        assert_eq!(host.directories("src"), vec!["app"]);
        assert_eq!(
            host.all_files("src"),
            vec!["src/app/a.ts", "src/app/nested/c.ts", "src/b.ts"]
        );

        let file = host.source_file("src/b.ts").unwrap().unwrap();
        assert_eq!(file.path, "src/b.ts");
        assert!(host.source_file("src/none.ts").unwrap().is_none());
    }
}
