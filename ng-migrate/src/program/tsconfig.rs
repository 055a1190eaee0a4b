//! `tsconfig.json` loading: comments, `extends` chains, file selection.

use super::host::CompilerHost;
use crate::error::ConfigurationError;
use crate::tree::{dirname, join, normalize, Tree};
use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const DEFAULT_EXCLUDE: &[&str] = &["node_modules", "bower_components", "jspm_packages"];
const SOURCE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Extends {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    extends: Option<Extends>,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    references: Option<Vec<RawReference>>,
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    base_url: Option<String>,
    paths: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct RawReference {
    path: String,
}

/// A `paths` mapping with substitutions already rooted in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub pattern: String,
    pub substitutions: Vec<String>,
}

impl PathMapping {
    /// Candidate tree paths for `specifier`, or `None` when the pattern does
    /// not apply. A `*` in the pattern captures and is spliced into each
    /// substitution.
    pub fn candidates(&self, specifier: &str) -> Option<Vec<String>> {
        let captured = match self.pattern.split_once('*') {
            Some((prefix, suffix)) => {
                if specifier.len() < prefix.len() + suffix.len()
                    || !specifier.starts_with(prefix)
                    || !specifier.ends_with(suffix)
                {
                    return None;
                }
                Some(&specifier[prefix.len()..specifier.len() - suffix.len()])
            }
            None if self.pattern == specifier => None,
            None => return None,
        };
        Some(
            self.substitutions
                .iter()
                .map(|s| match captured {
                    Some(c) => normalize(&s.replacen('*', c, 1)),
                    None => normalize(s),
                })
                .collect(),
        )
    }

    fn prefix_len(&self) -> usize {
        self.pattern.split('*').next().map_or(0, str::len)
    }
}

/// A fully resolved configuration. Every path is a tree path.
#[derive(Debug, Clone, Default)]
pub struct ParsedConfig {
    pub path: String,
    pub files: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub references: Vec<String>,
    pub base_url: Option<String>,
    pub paths: Vec<PathMapping>,
    /// Whether some config in the chain named `files` or `include`.
    selection_specified: bool,
}

impl ParsedConfig {
    /// Root files: explicit `files` plus every source file selected by
    /// `include` and not removed by `exclude`.
    pub fn root_files<T: Tree + ?Sized>(&self, host: &CompilerHost<'_, T>) -> Vec<String> {
        let mut roots: Vec<String> = self
            .files
            .iter()
            .filter(|f| host.file_exists(f))
            .cloned()
            .collect();

        let include: Vec<Pattern> = self.include.iter().filter_map(|p| compile(p)).collect();
        let exclude: Vec<Pattern> = self
            .exclude
            .iter()
            .flat_map(|p| [compile(p), compile(&format!("{}/**/*", p))])
            .flatten()
            .collect();

        if !include.is_empty() {
            for file in host.all_files("") {
                if !SOURCE_EXTENSIONS.iter().any(|ext| file.ends_with(ext)) {
                    continue;
                }
                if !include.iter().any(|p| p.matches_with(&file, match_options())) {
                    continue;
                }
                if exclude.iter().any(|p| p.matches_with(&file, match_options())) {
                    continue;
                }
                if !roots.contains(&file) {
                    roots.push(file);
                }
            }
        }
        roots
    }

    /// `paths` mappings ordered by longest literal prefix, as the compiler
    /// tries them.
    pub fn sorted_paths(&self) -> Vec<&PathMapping> {
        let mut sorted: Vec<&PathMapping> = self.paths.iter().collect();
        sorted.sort_by_key(|m| std::cmp::Reverse(m.prefix_len()));
        sorted
    }
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn compile(pattern: &str) -> Option<Pattern> {
    match Pattern::new(pattern) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(pattern, error = %e, "ignoring invalid tsconfig glob");
            None
        }
    }
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Root an include pattern at `dir`; a bare directory selects everything in it.
fn include_pattern(dir: &str, pattern: &str) -> String {
    let rooted = join(dir, pattern);
    let last = rooted.rsplit('/').next().unwrap_or_default();
    if !has_wildcard(last) && !SOURCE_EXTENSIONS.iter().any(|ext| last.ends_with(ext)) {
        if rooted.is_empty() {
            "**/*".to_string()
        } else {
            format!("{}/**/*", rooted)
        }
    } else {
        rooted
    }
}

/// Load `path`, following its `extends` chain.
pub fn load<T: Tree + ?Sized>(
    host: &CompilerHost<'_, T>,
    path: &str,
) -> Result<ParsedConfig, ConfigurationError> {
    let path = normalize(path);
    let mut chain = Vec::new();
    let mut config = load_inner(host, &path, &mut chain)?;

    let dir = dirname(&path);
    if !config.selection_specified {
        config.include = vec![include_pattern(dir, "**/*")];
    }
    if config.exclude.is_empty() {
        config.exclude = DEFAULT_EXCLUDE.iter().map(|p| join(dir, p)).collect();
    }
    Ok(config)
}

fn load_inner<T: Tree + ?Sized>(
    host: &CompilerHost<'_, T>,
    path: &str,
    chain: &mut Vec<String>,
) -> Result<ParsedConfig, ConfigurationError> {
    if chain.iter().any(|p| p == path) {
        return Err(ConfigurationError::CircularExtends(path.to_string()));
    }
    chain.push(path.to_string());

    let text = host
        .read_file(path)
        .map_err(|e| ConfigurationError::Invalid { path: path.to_string(), message: e.to_string() })?
        .ok_or_else(|| ConfigurationError::Missing(path.to_string()))?;
    let raw: RawConfig = serde_json::from_str(&strip_jsonc(&text)).map_err(|e| {
        ConfigurationError::Invalid { path: path.to_string(), message: e.to_string() }
    })?;
    let dir = dirname(path).to_string();

    let mut config = ParsedConfig::default();
    let parents = match &raw.extends {
        Some(Extends::One(p)) => vec![p.clone()],
        Some(Extends::Many(ps)) => ps.clone(),
        None => Vec::new(),
    };
    for parent in parents {
        match resolve_extends(host, &dir, &parent) {
            Some(parent_path) => {
                let base = load_inner(host, &parent_path, chain)?;
                inherit(&mut config, base);
            }
            None => warn!(config = path, extends = %parent, "cannot resolve extended tsconfig, ignoring"),
        }
    }

    if let Some(files) = &raw.files {
        config.files = files.iter().map(|f| join(&dir, f)).collect();
    }
    if let Some(include) = &raw.include {
        config.include = include.iter().map(|p| include_pattern(&dir, p)).collect();
    }
    if let Some(exclude) = &raw.exclude {
        config.exclude = exclude.iter().map(|p| join(&dir, p)).collect();
    }
    if raw.files.is_some() || raw.include.is_some() {
        config.selection_specified = true;
    }

    config.references = raw
        .references
        .unwrap_or_default()
        .into_iter()
        .map(|r| {
            let target = join(&dir, &r.path);
            if target.ends_with(".json") {
                target
            } else {
                join(&target, "tsconfig.json")
            }
        })
        .collect();

    if let Some(options) = raw.compiler_options {
        if let Some(base_url) = &options.base_url {
            config.base_url = Some(join(&dir, base_url));
        }
        if let Some(paths) = options.paths {
            let root = config.base_url.clone().unwrap_or_else(|| dir.clone());
            config.paths = paths
                .into_iter()
                .map(|(pattern, subs)| PathMapping {
                    pattern,
                    substitutions: subs.iter().map(|s| join(&root, s)).collect(),
                })
                .collect();
        }
    }

    config.path = path.to_string();
    chain.pop();
    debug!(config = path, files = config.files.len(), include = ?config.include, "loaded tsconfig");
    Ok(config)
}

fn inherit(config: &mut ParsedConfig, base: ParsedConfig) {
    if base.selection_specified {
        config.files = base.files;
        config.include = base.include;
        config.selection_specified = true;
    }
    if !base.exclude.is_empty() {
        config.exclude = base.exclude;
    }
    if base.base_url.is_some() {
        config.base_url = base.base_url;
    }
    if !base.paths.is_empty() {
        config.paths = base.paths;
    }
}

fn resolve_extends<T: Tree + ?Sized>(host: &CompilerHost<'_, T>, dir: &str, target: &str) -> Option<String> {
    if !(target.starts_with('.') || target.starts_with('/')) {
        return None;
    }
    let joined = join(dir, target);
    if host.file_exists(&joined) {
        return Some(joined);
    }
    let with_ext = format!("{}.json", joined);
    host.file_exists(&with_ext).then_some(with_ext)
}

/// Strip `//` and `/* */` comments and trailing commas so the text parses as
/// plain JSON. String contents are left untouched.
pub fn strip_jsonc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    remove_trailing_commas(&out)
}

fn remove_trailing_commas(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = bytes[i + 1..].iter().find(|b| !b.is_ascii_whitespace());
            if matches!(next, Some(b'}') | Some(b']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::OverlayTree;

    #[test]
    fn test_strip_jsonc() {
        let text = r#"{
            // comment
            "a": "http://x", /* block */
            "b": [1, 2,],
        }"#;
        let value: serde_json::Value = serde_json::from_str(&strip_jsonc(text)).unwrap();
        assert_eq!(value["a"], "http://x");
        assert_eq!(value["b"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_extends_inherits_include_and_paths() {
        let tree = OverlayTree::from_files([
            (
                "tsconfig.json",
                r#"{ "compilerOptions": { "baseUrl": "./", "paths": { "@lib/*": ["libs/*"] } }, "include": ["src"] }"#,
            ),
            ("projects/app/tsconfig.app.json", r#"{ "extends": "../../tsconfig.json", "files": ["src/main.ts"] }"#),
            ("projects/app/src/main.ts", ""),
            ("src/a.ts", ""),
        ]);
        let host = CompilerHost::new(&tree);

        let config = load(&host, "projects/app/tsconfig.app.json").unwrap();
        assert_eq!(config.files, vec!["projects/app/src/main.ts"]);
        assert_eq!(config.include, vec!["src/**/*"]);
        assert_eq!(config.base_url.as_deref(), Some(""));
        assert_eq!(config.paths[0].substitutions, vec!["libs/*"]);
        assert_eq!(
            config.root_files(&host),
            vec!["projects/app/src/main.ts", "src/a.ts"]
        );

        let base = load(&host, "tsconfig.json").unwrap();
        assert_eq!(base.root_files(&host), vec!["src/a.ts"]);
    }

    #[test]
    fn test_default_include_and_exclude() {
        let tree = OverlayTree::from_files([
            ("tsconfig.json", "{}"),
            ("src/app.ts", ""),
            ("src/app.spec.ts", ""),
            ("src/style.css", ""),
            ("node_modules/x/index.d.ts", ""),
        ]);
        let host = CompilerHost::new(&tree);
        let config = load(&host, "tsconfig.json").unwrap();
        assert_eq!(config.root_files(&host), vec!["src/app.spec.ts", "src/app.ts"]);
    }

    #[test]
    fn test_exclude_pattern() {
        let tree = OverlayTree::from_files([
            ("tsconfig.json", r#"{ "include": ["src/**/*.ts"], "exclude": ["src/**/*.spec.ts"] }"#),
            ("src/app.ts", ""),
            ("src/deep/app.spec.ts", ""),
        ]);
        let host = CompilerHost::new(&tree);
        let config = load(&host, "tsconfig.json").unwrap();
        assert_eq!(config.root_files(&host), vec!["src/app.ts"]);
    }

    #[test]
    fn test_missing_and_malformed_configs() {
        let tree = OverlayTree::from_files([("bad.json", "{ not json")]);
        let host = CompilerHost::new(&tree);
        assert!(matches!(load(&host, "nope.json"), Err(ConfigurationError::Missing(_))));
        assert!(matches!(load(&host, "bad.json"), Err(ConfigurationError::Invalid { .. })));
    }

    #[test]
    fn test_circular_extends() {
        let tree = OverlayTree::from_files([
            ("a.json", r#"{ "extends": "./b.json" }"#),
            ("b.json", r#"{ "extends": "./a" }"#),
        ]);
        let host = CompilerHost::new(&tree);
        assert!(matches!(load(&host, "a.json"), Err(ConfigurationError::CircularExtends(_))));
    }

    #[test]
    fn test_path_mapping_candidates() {
        let mapping = PathMapping {
            pattern: "@app/*".into(),
            substitutions: vec!["src/app/*".into()],
        };
        assert_eq!(mapping.candidates("@app/core/x"), Some(vec!["src/app/core/x".to_string()]));
        assert_eq!(mapping.candidates("@other/x"), None);

        let exact = PathMapping { pattern: "env".into(), substitutions: vec!["src/env.ts".into()] };
        assert_eq!(exact.candidates("env"), Some(vec!["src/env.ts".to_string()]));
    }

    #[test]
    fn test_references_point_at_tsconfig() {
        let tree = OverlayTree::from_files([
            ("tsconfig.json", r#"{ "files": [], "references": [{ "path": "./projects/lib" }, { "path": "./tsconfig.spec.json" }] }"#),
        ]);
        let host = CompilerHost::new(&tree);
        let config = load(&host, "tsconfig.json").unwrap();
        assert_eq!(config.references, vec!["projects/lib/tsconfig.json", "tsconfig.spec.json"]);
        assert!(config.root_files(&host).is_empty());
    }
}
