//! Compilation unit discovery.
//!
//! A [`Discovery`] is resolved once per run from explicit tsconfig paths or
//! the Angular workspace file. Every call to [`Discovery::discover`] re-reads
//! the tree, so each migration pass sees the edits committed by the previous
//! one.

pub mod host;
pub mod resolve;
pub mod tsconfig;
pub mod workspace;

use crate::error::{ConfigurationError, MigrationError, Result, TreeError};
use crate::semantic::imports::ImportTable;
use crate::semantic::scope::ScopeTree;
use crate::semantic::types::TypeResolver;
use crate::tree::{normalize, Tree};
use host::CompilerHost;
use once_cell::unsync::OnceCell;
use resolve::ModuleResolver;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::ops::Range;
use std::rc::Rc;
use swc_common::{BytePos, Span, Spanned};
use swc_ecma_ast::{EsVersion, Module, ModuleDecl, ModuleItem, Str};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax, TsSyntax};
use tracing::{debug, info, warn};
use tsconfig::ParsedConfig;

/// swc reserves position 0, so file text starts at this position.
const BASE_POS: u32 = 1;

/// A parsed TypeScript file with its text.
pub struct SourceFile {
    pub path: String,
    pub text: String,
    pub module: Module,
    imports: OnceCell<ImportTable>,
    scopes: OnceCell<ScopeTree>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile").field("path", &self.path).finish_non_exhaustive()
    }
}

impl SourceFile {
    pub fn parse(path: &str, text: String) -> Result<Self> {
        let syntax = Syntax::Typescript(TsSyntax {
            tsx: path.ends_with(".tsx"),
            decorators: true,
            dts: path.ends_with(".d.ts"),
            ..Default::default()
        });
        let end = BytePos(BASE_POS + text.len() as u32);
        let module = {
            let lexer = Lexer::new(
                syntax,
                EsVersion::EsNext,
                StringInput::new(&text, BytePos(BASE_POS), end),
                None,
            );
            let mut parser = Parser::new_from(lexer);
            parser.parse_module().map_err(|err| MigrationError::SourceParse {
                path: path.to_string(),
                message: format!(
                    "{:?} at offset {}",
                    err.kind(),
                    err.span().lo.0.saturating_sub(BASE_POS)
                ),
            })?
        };

        Ok(Self {
            path: path.to_string(),
            text,
            module,
            imports: OnceCell::new(),
            scopes: OnceCell::new(),
        })
    }

    pub fn is_declaration(&self) -> bool {
        self.path.ends_with(".d.ts")
    }

    /// File offset of an swc position.
    pub fn offset(&self, pos: BytePos) -> usize {
        (pos.0.saturating_sub(BASE_POS) as usize).min(self.text.len())
    }

    pub fn range(&self, span: Span) -> Range<usize> {
        self.offset(span.lo)..self.offset(span.hi)
    }

    pub fn snippet(&self, span: Span) -> &str {
        &self.text[self.range(span)]
    }

    /// Text between the quotes of a string literal.
    pub fn literal_value(&self, lit: &Str) -> &str {
        let raw = self.snippet(lit.span);
        if raw.len() >= 2 {
            &raw[1..raw.len() - 1]
        } else {
            raw
        }
    }

    pub fn imports(&self) -> &ImportTable {
        self.imports.get_or_init(|| ImportTable::scan(self))
    }

    pub fn scopes(&self) -> &ScopeTree {
        self.scopes.get_or_init(|| ScopeTree::build(&self.module))
    }

    /// Module specifiers of every import and re-export, in source order.
    pub fn module_specifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for item in &self.module.body {
            let ModuleItem::ModuleDecl(decl) = item else {
                continue;
            };
            let src = match decl {
                ModuleDecl::Import(import) => Some(&*import.src),
                ModuleDecl::ExportNamed(export) => export.src.as_deref(),
                ModuleDecl::ExportAll(export) => Some(&*export.src),
                _ => None,
            };
            if let Some(src) = src {
                out.push(self.literal_value(src));
            }
        }
        out
    }
}

/// A source file that could not be parsed, kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub path: String,
    pub reason: String,
}

/// Every in-tree file reachable from one configuration, parsed once.
#[derive(Debug, Default)]
pub struct Program {
    config: String,
    roots: Vec<String>,
    files: BTreeMap<String, SourceFile>,
    resolved: HashMap<(String, String), String>,
    skipped: Vec<SkippedSource>,
}

impl Program {
    pub fn build<T: Tree + ?Sized>(host: &CompilerHost<'_, T>, config: &ParsedConfig) -> Result<Self> {
        let resolver = ModuleResolver::new(config);
        let roots = config.root_files(host);

        let mut program = Program {
            config: config.path.clone(),
            roots: roots.clone(),
            ..Default::default()
        };
        let mut queue: VecDeque<String> = roots.into_iter().collect();
        let mut seen: HashSet<String> = queue.iter().cloned().collect();

        while let Some(path) = queue.pop_front() {
            let file = match host.source_file(&path) {
                Ok(Some(file)) => file,
                Ok(None) => continue,
                Err(MigrationError::SourceParse { path, message }) => {
                    warn!(%path, %message, "skipping unparsable source");
                    program.skipped.push(SkippedSource { path, reason: message });
                    continue;
                }
                Err(MigrationError::Tree(TreeError::NotUtf8 { path })) => {
                    warn!(%path, "skipping source that is not valid UTF-8");
                    program.skipped.push(SkippedSource { path, reason: "not valid UTF-8".to_string() });
                    continue;
                }
                Err(e) => return Err(e),
            };

            for specifier in file.module_specifiers() {
                if let Some(target) = resolver.resolve(host, &path, specifier) {
                    program
                        .resolved
                        .insert((path.clone(), specifier.to_string()), target.clone());
                    if seen.insert(target.clone()) {
                        queue.push_back(target);
                    }
                }
            }
            program.files.insert(path, file);
        }

        debug!(
            config = %program.config,
            roots = program.roots.len(),
            files = program.files.len(),
            "built program"
        );
        Ok(program)
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.files.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    pub fn skipped(&self) -> &[SkippedSource] {
        &self.skipped
    }

    /// The in-tree file an import in `from` resolved to, if any.
    pub fn resolve_import(&self, from: &str, specifier: &str) -> Option<&SourceFile> {
        self.resolved
            .get(&(from.to_string(), specifier.to_string()))
            .and_then(|target| self.files.get(target))
    }

    pub fn type_resolver(&self) -> TypeResolver<'_> {
        TypeResolver::new(self)
    }
}

/// One file to scan in a pass.
#[derive(Debug, Clone)]
pub struct DiscoveredUnit {
    pub path: String,
    pub program: Rc<Program>,
}

impl DiscoveredUnit {
    pub fn source(&self) -> Option<&SourceFile> {
        self.program.file(&self.path)
    }
}

/// The outcome of one discovery traversal.
#[derive(Debug, Default)]
pub struct Discovered {
    pub units: Vec<DiscoveredUnit>,
    pub skipped: Vec<SkippedSource>,
}

impl IntoIterator for Discovered {
    type Item = DiscoveredUnit;
    type IntoIter = std::vec::IntoIter<DiscoveredUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOptions {
    /// Explicit tsconfig paths. Empty means: ask the workspace file.
    pub tsconfigs: Vec<String>,
    /// Only emit files under this directory.
    pub path_filter: Option<String>,
    pub extension: String,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            tsconfigs: Vec::new(),
            path_filter: None,
            extension: ".ts".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Discovery {
    configs: Vec<String>,
    path_filter: Option<String>,
    extension: String,
}

impl Discovery {
    /// Locate the configurations to compile. Fails when there are none.
    pub fn resolve<T: Tree + ?Sized>(
        tree: &T,
        options: &ProjectOptions,
    ) -> std::result::Result<Self, ConfigurationError> {
        let configs = if options.tsconfigs.is_empty() {
            workspace::tsconfig_paths(tree)?
        } else {
            let mut configs = Vec::new();
            for path in &options.tsconfigs {
                let path = normalize(path);
                if !tree.exists(&path) {
                    return Err(ConfigurationError::Missing(path));
                }
                configs.push(path);
            }
            configs
        };

        if configs.is_empty() {
            return Err(ConfigurationError::NotFound);
        }
        debug!(configs = ?configs, "found tsconfig files");

        Ok(Self {
            configs,
            path_filter: options
                .path_filter
                .as_deref()
                .map(normalize)
                .filter(|p| !p.is_empty()),
            extension: options.extension.clone(),
        })
    }

    pub fn configs(&self) -> &[String] {
        &self.configs
    }

    fn accepts(&self, file: &SourceFile) -> bool {
        if file.is_declaration()
            || !file.path.ends_with(&self.extension)
            || file.path.split('/').any(|segment| segment == "node_modules")
        {
            return false;
        }
        match &self.path_filter {
            Some(prefix) => file.path == *prefix || file.path.starts_with(&format!("{}/", prefix)),
            None => true,
        }
    }

    /// Build one program per configuration (following project references)
    /// from the current tree and list the units to scan.
    pub fn discover<T: Tree + ?Sized>(&self, tree: &T) -> Result<Discovered> {
        let host = CompilerHost::new(tree);
        let mut discovered = Discovered::default();
        let mut emitted = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut pending: VecDeque<String> = self.configs.iter().cloned().collect();

        while let Some(config_path) = pending.pop_front() {
            if !visited.insert(config_path.clone()) {
                continue;
            }
            let config = tsconfig::load(&host, &config_path)?;
            for reference in &config.references {
                if host.file_exists(reference) {
                    pending.push_back(reference.clone());
                } else {
                    warn!(config = %config_path, reference = %reference, "referenced tsconfig not found");
                }
            }

            let program = Rc::new(Program::build(&host, &config)?);
            for skipped in program.skipped() {
                if !discovered.skipped.iter().any(|s| s.path == skipped.path) {
                    discovered.skipped.push(skipped.clone());
                }
            }
            for file in program.files() {
                if self.accepts(file) && emitted.insert(file.path.clone()) {
                    discovered.units.push(DiscoveredUnit {
                        path: file.path.clone(),
                        program: Rc::clone(&program),
                    });
                }
            }
        }

        info!(units = discovered.units.len(), skipped = discovered.skipped.len(), "discovered compilation units");
        Ok(discovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::OverlayTree;

    fn workspace() -> OverlayTree {
        OverlayTree::from_files([
            (
                "angular.json",
                r#"{ "projects": { "app": { "architect": {
                    "build": { "options": { "tsConfig": "tsconfig.app.json" } },
                    "test": { "options": { "tsConfig": "tsconfig.spec.json" } } } } } }"#,
            ),
            ("tsconfig.json", r#"{ "compilerOptions": { "baseUrl": "." } }"#),
            ("tsconfig.app.json", r#"{ "extends": "./tsconfig.json", "files": ["src/main.ts"] }"#),
            ("tsconfig.spec.json", r#"{ "extends": "./tsconfig.json", "include": ["src/**/*.spec.ts"] }"#),
            ("src/main.ts", "import { AppComponent } from './app/app.component';\n"),
            ("src/app/app.component.ts", "import { Helper } from '../lib/helper';\nexport class AppComponent {}\n"),
            ("src/app/app.component.spec.ts", "import { AppComponent } from './app.component';\n"),
            ("src/lib/helper.ts", "export class Helper {}\n"),
            ("src/lib/orphan.ts", "export const orphan = 1;\n"),
            ("src/typings.d.ts", "declare const x: number;\n"),
        ])
    }

    fn paths(discovered: &Discovered) -> Vec<&str> {
        discovered.units.iter().map(|u| u.path.as_str()).collect()
    }

    #[test]
    fn test_discovers_reachable_files_once() {
        let tree = workspace();
        let discovery = Discovery::resolve(&tree, &ProjectOptions::default()).unwrap();
        assert_eq!(discovery.configs(), ["tsconfig.app.json", "tsconfig.spec.json"]);

        let discovered = discovery.discover(&tree).unwrap();
        let mut found = paths(&discovered);
        found.sort();
        assert_eq!(
            found,
            vec![
                "src/app/app.component.spec.ts",
                "src/app/app.component.ts",
                "src/lib/helper.ts",
                "src/main.ts",
            ]
        );
    }

    #[test]
    fn test_path_filter_is_directory_aware() {
        let mut tree = workspace();
        tree.create("src/application.ts", b"export {};".to_vec()).unwrap();
        tree.overwrite(
            "src/main.ts",
            b"import './app/app.component';\nimport './application';\n".to_vec(),
        )
        .unwrap();

        let options = ProjectOptions {
            path_filter: Some("./src/app".into()),
            ..Default::default()
        };
        let discovered = Discovery::resolve(&tree, &options).unwrap().discover(&tree).unwrap();
        assert!(paths(&discovered).iter().all(|p| p.starts_with("src/app/")));
    }

    #[test]
    fn test_missing_configuration_is_an_error() {
        let tree = OverlayTree::from_files([("src/a.ts", "")]);
        assert!(matches!(
            Discovery::resolve(&tree, &ProjectOptions::default()),
            Err(ConfigurationError::NotFound)
        ));

        let explicit = ProjectOptions { tsconfigs: vec!["tsconfig.json".into()], ..Default::default() };
        assert!(matches!(
            Discovery::resolve(&tree, &explicit),
            Err(ConfigurationError::Missing(_))
        ));
    }

    #[test]
    fn test_unparsable_source_is_skipped() {
        let tree = OverlayTree::from_files([
            ("tsconfig.json", "{}"),
            ("src/ok.ts", "export const ok = 1;"),
            ("src/broken.ts", "export const = ;"),
        ]);
        let options = ProjectOptions { tsconfigs: vec!["tsconfig.json".into()], ..Default::default() };
        let discovered = Discovery::resolve(&tree, &options).unwrap().discover(&tree).unwrap();
        assert_eq!(paths(&discovered), vec!["src/ok.ts"]);
        assert_eq!(discovered.skipped.len(), 1);
        assert_eq!(discovered.skipped[0].path, "src/broken.ts");
    }

    #[test]
    fn test_non_utf8_source_is_skipped() {
        let tree = OverlayTree::from_files([
            ("tsconfig.json", b"{}".to_vec()),
            ("src/ok.ts", b"export const ok = 1;".to_vec()),
            ("src/latin1.ts", b"export const name = 'caf\xe9';".to_vec()),
        ]);
        let options = ProjectOptions { tsconfigs: vec!["tsconfig.json".into()], ..Default::default() };
        let discovered = Discovery::resolve(&tree, &options).unwrap().discover(&tree).unwrap();
        assert_eq!(paths(&discovered), vec!["src/ok.ts"]);
        assert_eq!(
            discovered.skipped,
            vec![SkippedSource { path: "src/latin1.ts".into(), reason: "not valid UTF-8".into() }]
        );
    }

    #[test]
    fn test_parse_error_reports_offset() {
        let Err(MigrationError::SourceParse { path, message }) =
            SourceFile::parse("src/broken.ts", "export const = ;".to_string())
        else {
            panic!("expected a parse error");
        };
        assert_eq!(path, "src/broken.ts");
        assert!(message.contains(" at offset "), "{}", message);
    }

    #[test]
    fn test_discovery_sees_committed_edits() {
        let mut tree = workspace();
        let discovery = Discovery::resolve(&tree, &ProjectOptions::default()).unwrap();
        let before = discovery.discover(&tree).unwrap();
        assert!(!paths(&before).contains(&"src/lib/orphan.ts"));

        tree.overwrite("src/main.ts", b"import './lib/orphan';\n".to_vec()).unwrap();
        let after = discovery.discover(&tree).unwrap();
        assert!(paths(&after).contains(&"src/lib/orphan.ts"));
    }

    #[test]
    fn test_source_file_offsets() {
        let file = SourceFile::parse("a.ts", "import { A } from 'pkg';".to_string()).unwrap();
        assert_eq!(file.module_specifiers(), vec!["pkg"]);
        let ModuleItem::ModuleDecl(ModuleDecl::Import(import)) = &file.module.body[0] else {
            panic!("expected an import");
        };
        assert_eq!(file.snippet(import.src.span), "'pkg'");
        assert_eq!(file.range(import.src.span), 18..23);
    }
}
