//! Import bookkeeping for one source file.
//!
//! Maps every local name introduced by an `import` declaration back to the
//! module and exported name it came from, so matchers can ask "is `W` in this
//! file really `Widget` from `@scope/lib`?" without re-walking the AST.

use crate::program::SourceFile;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;
use swc_ecma_ast::{ImportSpecifier, ModuleDecl, ModuleExportName, ModuleItem};

/// One named import specifier (`Imported` or `Imported as local`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedImport {
    pub imported: String,
    pub local: String,
    /// Byte range of the whole specifier text.
    pub range: Range<usize>,
    /// Byte range of the imported name.
    pub imported_range: Range<usize>,
    /// swc span of the local binding, for scope lookups.
    pub local_span: swc_common::Span,
    pub aliased: bool,
    pub type_only: bool,
}

impl NamedImport {
    /// The specifier as it would be written in source.
    pub fn to_source(&self) -> String {
        let prefix = if self.type_only { "type " } else { "" };
        if self.aliased {
            format!("{}{} as {}", prefix, self.imported, self.local)
        } else {
            format!("{}{}", prefix, self.imported)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub module: String,
    /// Byte range of the module string literal, quotes included.
    pub module_range: Range<usize>,
    /// Byte range of the whole declaration.
    pub range: Range<usize>,
    pub quote: char,
    pub type_only: bool,
    pub named: Vec<NamedImport>,
    pub default: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedSymbol {
    Named { module: String, imported: String },
    Default { module: String },
    Namespace { module: String },
}

#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    entries: Vec<ImportEntry>,
    local_aliases: HashMap<String, ImportedSymbol>,
}

impl ImportTable {
    pub fn scan(file: &SourceFile) -> Self {
        let mut table = ImportTable::default();

        for item in &file.module.body {
            let ModuleItem::ModuleDecl(ModuleDecl::Import(import)) = item else {
                continue;
            };
            let module = file.literal_value(&import.src).to_string();
            let quote = file.snippet(import.src.span).chars().next().unwrap_or('\'');
            let mut entry = ImportEntry {
                module: module.clone(),
                module_range: file.range(import.src.span),
                range: file.range(import.span),
                quote,
                type_only: import.type_only,
                named: Vec::new(),
                default: None,
                namespace: None,
            };

            for specifier in &import.specifiers {
                match specifier {
                    ImportSpecifier::Named(named) => {
                        let local = named.local.sym.to_string();
                        let (imported, imported_span) = match &named.imported {
                            Some(ModuleExportName::Ident(ident)) => (ident.sym.to_string(), ident.span),
                            Some(ModuleExportName::Str(s)) => (file.literal_value(s).to_string(), s.span),
                            None => (local.clone(), named.local.span),
                        };
                        table.local_aliases.insert(
                            local.clone(),
                            ImportedSymbol::Named { module: module.clone(), imported: imported.clone() },
                        );
                        entry.named.push(NamedImport {
                            aliased: named.imported.is_some(),
                            imported,
                            local,
                            range: file.range(named.span),
                            imported_range: file.range(imported_span),
                            local_span: named.local.span,
                            type_only: named.is_type_only,
                        });
                    }
                    ImportSpecifier::Default(default) => {
                        let local = default.local.sym.to_string();
                        table
                            .local_aliases
                            .insert(local.clone(), ImportedSymbol::Default { module: module.clone() });
                        entry.default = Some(local);
                    }
                    ImportSpecifier::Namespace(ns) => {
                        let local = ns.local.sym.to_string();
                        table
                            .local_aliases
                            .insert(local.clone(), ImportedSymbol::Namespace { module: module.clone() });
                        entry.namespace = Some(local);
                    }
                }
            }

            table.entries.push(entry);
        }

        table
    }

    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    /// What a local name was imported as, if it was imported at all.
    pub fn lookup(&self, local: &str) -> Option<&ImportedSymbol> {
        self.local_aliases.get(local)
    }

    /// Imports whose module specifier matches `module`.
    pub fn from_module<'a>(&'a self, module: &'a Regex) -> impl Iterator<Item = &'a ImportEntry> + 'a {
        self.entries.iter().filter(move |e| module.is_match(&e.module))
    }

    /// True if some import matches `module` and, when `symbols` is not empty,
    /// names at least one of them.
    pub fn has_import(&self, module: &Regex, symbols: &[String]) -> bool {
        self.from_module(module).any(|entry| {
            symbols.is_empty()
                || entry
                    .named
                    .iter()
                    .any(|n| symbols.iter().any(|s| *s == n.imported))
        })
    }
}
