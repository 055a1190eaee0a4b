//! Module specifier resolution against the tree.

use super::host::CompilerHost;
use super::tsconfig::{ParsedConfig, PathMapping};
use crate::tree::{dirname, join, Tree};

const EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts"];
const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.d.ts"];

#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    base_url: Option<String>,
    paths: Vec<PathMapping>,
}

impl ModuleResolver {
    pub fn new(config: &ParsedConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            paths: config.sorted_paths().into_iter().cloned().collect(),
        }
    }

    /// Resolve `specifier` imported from `from` to a file in the tree.
    /// Package imports that no `paths` mapping covers resolve to `None`.
    pub fn resolve<T: Tree + ?Sized>(
        &self,
        host: &CompilerHost<'_, T>,
        from: &str,
        specifier: &str,
    ) -> Option<String> {
        if is_relative(specifier) {
            return probe(host, &join(dirname(from), specifier));
        }

        for mapping in &self.paths {
            if let Some(candidates) = mapping.candidates(specifier) {
                if let Some(found) = candidates.iter().find_map(|c| probe(host, c)) {
                    return Some(found);
                }
            }
        }

        self.base_url
            .as_deref()
            .and_then(|base| probe(host, &join(base, specifier)))
    }
}

pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

fn probe<T: Tree + ?Sized>(host: &CompilerHost<'_, T>, base: &str) -> Option<String> {
    if EXTENSIONS.iter().any(|ext| base.ends_with(ext)) && host.file_exists(base) {
        return Some(base.to_string());
    }
    if let Some(stem) = base.strip_suffix(".js") {
        if let Some(found) = probe(host, stem) {
            return Some(found);
        }
    }
    if let Some(found) = EXTENSIONS
        .iter()
        .map(|ext| format!("{}{}", base, ext))
        .find(|candidate| host.file_exists(candidate))
    {
        return Some(found);
    }
    INDEX_FILES
        .iter()
        .map(|index| join(base, index))
        .find(|candidate| host.file_exists(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::OverlayTree;

    fn tree() -> OverlayTree {
        OverlayTree::from_files([
            ("src/app/a.ts", ""),
            ("src/app/types.d.ts", ""),
            ("src/shared/index.ts", ""),
            ("libs/ui/src/public-api.ts", ""),
        ])
    }

    #[test]
    fn test_relative_resolution() {
        let tree = tree();
        let host = CompilerHost::new(&tree);
        let resolver = ModuleResolver::default();

        assert_eq!(resolver.resolve(&host, "src/main.ts", "./app/a").as_deref(), Some("src/app/a.ts"));
        assert_eq!(resolver.resolve(&host, "src/app/a.ts", "./a.js").as_deref(), Some("src/app/a.ts"));
        assert_eq!(resolver.resolve(&host, "src/app/a.ts", "./types").as_deref(), Some("src/app/types.d.ts"));
        assert_eq!(resolver.resolve(&host, "src/app/a.ts", "../shared").as_deref(), Some("src/shared/index.ts"));
        assert_eq!(resolver.resolve(&host, "src/app/a.ts", "@angular/core"), None);
    }

    #[test]
    fn test_paths_and_base_url() {
        let tree = tree();
        let host = CompilerHost::new(&tree);
        let resolver = ModuleResolver {
            base_url: Some("src".into()),
            paths: vec![PathMapping {
                pattern: "@ui".into(),
                substitutions: vec!["libs/ui/src/public-api.ts".into()],
            }],
        };

        assert_eq!(resolver.resolve(&host, "src/x.ts", "@ui").as_deref(), Some("libs/ui/src/public-api.ts"));
        assert_eq!(resolver.resolve(&host, "src/x.ts", "shared").as_deref(), Some("src/shared/index.ts"));
    }
}
