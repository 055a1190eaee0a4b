//! Angular workspace (`angular.json`) lookup of project tsconfig files.

use crate::error::ConfigurationError;
use crate::tree::{normalize, Tree};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

pub const WORKSPACE_FILES: &[&str] = &["angular.json", ".angular.json"];
const TARGETS: &[&str] = &["build", "test"];

/// tsconfig paths named by the `build` and `test` targets of every project,
/// from the target options and every named configuration. Paths that do not
/// exist in the tree are dropped.
pub fn tsconfig_paths<T: Tree + ?Sized>(tree: &T) -> Result<Vec<String>, ConfigurationError> {
    let Some(workspace_path) = WORKSPACE_FILES.iter().find(|p| tree.exists(p)) else {
        return Ok(Vec::new());
    };
    let text = tree
        .read_text(workspace_path)
        .map_err(|e| ConfigurationError::Invalid { path: workspace_path.to_string(), message: e.to_string() })?
        .unwrap_or_default();
    let workspace: Value = serde_json::from_str(&super::tsconfig::strip_jsonc(&text)).map_err(|e| {
        ConfigurationError::Invalid { path: workspace_path.to_string(), message: e.to_string() }
    })?;

    let mut found = BTreeSet::new();
    let projects = workspace.get("projects").and_then(Value::as_object);
    for (name, project) in projects.into_iter().flatten() {
        let targets = project
            .get("architect")
            .or_else(|| project.get("targets"))
            .and_then(Value::as_object);
        for (target_name, target) in targets.into_iter().flatten() {
            if !TARGETS.contains(&target_name.as_str()) {
                continue;
            }
            let options = target.get("options").into_iter();
            let configurations = target
                .get("configurations")
                .and_then(Value::as_object)
                .into_iter()
                .flat_map(|c| c.values());
            for opts in options.chain(configurations) {
                if let Some(ts_config) = opts.get("tsConfig").and_then(Value::as_str) {
                    let path = normalize(ts_config);
                    if tree.exists(&path) {
                        found.insert(path);
                    } else {
                        debug!(project = %name, target = %target_name, tsconfig = %path, "tsconfig not in tree");
                    }
                }
            }
        }
    }

    Ok(found.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::OverlayTree;

    #[test]
    fn test_collects_build_and_test_tsconfigs() {
        let tree = OverlayTree::from_files([
            (
                "angular.json",
                r#"{
                  "projects": {
                    "app": {
                      "architect": {
                        "build": {
                          "options": { "tsConfig": "tsconfig.app.json" },
                          "configurations": { "ci": { "tsConfig": "./tsconfig.ci.json" } }
                        },
                        "test": { "options": { "tsConfig": "tsconfig.spec.json" } },
                        "lint": { "options": { "tsConfig": "tsconfig.lint.json" } }
                      }
                    },
                    "lib": {
                      "targets": { "build": { "options": { "tsConfig": "projects/lib/tsconfig.lib.json" } } }
                    }
                  }
                }"#,
            ),
            ("tsconfig.app.json", "{}"),
            ("tsconfig.ci.json", "{}"),
            ("tsconfig.lint.json", "{}"),
            ("projects/lib/tsconfig.lib.json", "{}"),
        ]);

        let paths = tsconfig_paths(&tree).unwrap();
        assert_eq!(
            paths,
            vec!["projects/lib/tsconfig.lib.json", "tsconfig.app.json", "tsconfig.ci.json"]
        );
    }

    #[test]
    fn test_no_workspace_file() {
        let tree = OverlayTree::from_files([("tsconfig.json", "{}")]);
        assert!(tsconfig_paths(&tree).unwrap().is_empty());
    }
}
