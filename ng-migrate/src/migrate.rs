//! Runs a migration over a tree: discover, then one scan/record/commit pass
//! per catalog.

use crate::catalog::{Catalog, Instruction, Migration, PatternReplacement, SymbolRename, TypeBasedPropertyRewrite};
use crate::error::{MigrationError, Result, TreeError};
use crate::markup::{self, Template};
use crate::matchers::locate_templates;
use crate::program::{Discovery, Program, ProjectOptions, SkippedSource, SourceFile};
use crate::rewrite::markup::{applies_to_component, rewrite_template};
use crate::rewrite::members::rewrite_members;
use crate::rewrite::patterns::replace_patterns;
use crate::rewrite::symbols::rename_symbols;
use crate::rewrite::{Edits, TemplateSource};
use crate::tree::{Tree, UpdateRecorder};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// A template that was not rewritten in some pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTemplate {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub name: String,
    /// Recorded edit operations committed by this pass.
    pub edits: usize,
    /// Files whose content changed in this pass.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migration: String,
    pub files_scanned: usize,
    pub files_modified: Vec<String>,
    pub catalogs: Vec<CatalogReport>,
    pub skipped_templates: Vec<SkippedTemplate>,
    pub skipped_sources: Vec<SkippedSource>,
}

impl MigrationReport {
    pub fn total_edits(&self) -> usize {
        self.catalogs.iter().map(|c| c.edits).sum()
    }

    fn skip_template(&mut self, path: &str, reason: String) {
        if !self.skipped_templates.iter().any(|s| s.path == path && s.reason == reason) {
            self.skipped_templates.push(SkippedTemplate { path: path.to_string(), reason });
        }
    }
}

pub struct Migrator<'m> {
    migration: &'m Migration,
    options: ProjectOptions,
}

impl<'m> Migrator<'m> {
    pub fn new(migration: &'m Migration, options: ProjectOptions) -> Self {
        Self { migration, options }
    }

    /// Run every catalog in order. Each catalog sees the tree as committed by
    /// the previous one. Fatal errors abort the run with the tree partially
    /// updated; callers stage on an overlay and discard it on error.
    pub fn run<T: Tree + ?Sized>(&self, tree: &mut T) -> Result<MigrationReport> {
        let discovery = Discovery::resolve(&*tree, &self.options)?;
        let mut report = MigrationReport { migration: self.migration.name.clone(), ..Default::default() };
        let mut scanned = BTreeSet::new();
        let mut modified = BTreeSet::new();

        for catalog in &self.migration.catalogs {
            info!(migration = %self.migration.name, catalog = %catalog.name, "running catalog");
            let discovered = discovery.discover(&*tree)?;
            for skipped in discovered.skipped {
                if !report.skipped_sources.contains(&skipped) {
                    report.skipped_sources.push(skipped);
                }
            }

            let mut pass = Pass::new(catalog);
            for unit in &discovered.units {
                let Some(file) = unit.source() else {
                    continue;
                };
                scanned.insert(unit.path.clone());
                pass.scan(&*tree, &unit.program, file, &mut report)?;
            }

            let catalog_report = pass.commit(&mut *tree)?;
            info!(
                catalog = %catalog.name,
                edits = catalog_report.edits,
                files = catalog_report.files.len(),
                "catalog committed"
            );
            modified.extend(catalog_report.files.iter().cloned());
            report.catalogs.push(catalog_report);
        }

        report.files_scanned = scanned.len();
        report.files_modified = modified.into_iter().collect();
        Ok(report)
    }
}

/// Run several migrations one after another over the same tree.
pub fn run_migrations<T: Tree + ?Sized>(
    tree: &mut T,
    migrations: &[Migration],
    options: &ProjectOptions,
) -> Result<Vec<MigrationReport>> {
    let mut reports = Vec::with_capacity(migrations.len());
    for migration in migrations {
        reports.push(Migrator::new(migration, options.clone()).run(&mut *tree)?);
    }
    Ok(reports)
}

/// State of one catalog pass.
struct Pass<'c> {
    catalog: &'c Catalog,
    symbols: Vec<&'c SymbolRename>,
    members: Vec<&'c TypeBasedPropertyRewrite>,
    patterns: Vec<&'c PatternReplacement>,
    markup: Vec<(usize, &'c Instruction)>,
    recorders: BTreeMap<String, UpdateRecorder>,
    /// Parsed external templates; `None` once a template was found broken
    /// or missing.
    templates: HashMap<String, Option<(String, Template)>>,
    /// (template path, instruction index) pairs already applied.
    applied: HashSet<(String, usize)>,
}

impl<'c> Pass<'c> {
    fn new(catalog: &'c Catalog) -> Self {
        let mut pass = Pass {
            catalog,
            symbols: Vec::new(),
            members: Vec::new(),
            patterns: Vec::new(),
            markup: Vec::new(),
            recorders: BTreeMap::new(),
            templates: HashMap::new(),
            applied: HashSet::new(),
        };
        for (index, instruction) in catalog.instructions.iter().enumerate() {
            match instruction {
                Instruction::SymbolRename(rename) => pass.symbols.push(rename),
                Instruction::TypeBasedPropertyRewrite(rewrite) => pass.members.push(rewrite),
                Instruction::PatternReplacement(patterns) => pass.patterns.push(patterns),
                other => pass.markup.push((index, other)),
            }
        }
        pass
    }

    fn scan<T: Tree + ?Sized>(
        &mut self,
        tree: &T,
        program: &Program,
        file: &SourceFile,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let mut edits = Edits::new();
        if !self.symbols.is_empty() {
            edits.extend(rename_symbols(file, &self.symbols));
        }
        if !self.members.is_empty() {
            edits.extend(rewrite_members(file, &program.type_resolver(), &self.members));
        }
        if !self.patterns.is_empty() {
            edits.extend(replace_patterns(file, &self.patterns));
        }
        if !self.markup.is_empty() {
            self.scan_templates(tree, file, &mut edits, report)?;
        }
        if !edits.is_empty() {
            debug!(path = %file.path, edits = edits.len(), catalog = %self.catalog.name, "recording edits");
            self.record(tree, &file.path, edits)?;
        }
        Ok(())
    }

    fn scan_templates<T: Tree + ?Sized>(
        &mut self,
        tree: &T,
        file: &SourceFile,
        edits: &mut Edits,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let templates = locate_templates(file);
        if templates.is_empty() {
            return Ok(());
        }
        let applicable: Vec<(usize, &'c Instruction)> = self
            .markup
            .iter()
            .copied()
            .filter(|(_, instruction)| applies_to_component(instruction, file))
            .collect();
        if applicable.is_empty() {
            return Ok(());
        }
        let instructions: Vec<&Instruction> = applicable.iter().map(|(_, i)| *i).collect();

        for inline in &templates.inline {
            match markup::parse(&inline.text) {
                Ok(template) => {
                    let source = TemplateSource { template: &template, text: &inline.text, offset: inline.offset };
                    edits.extend(rewrite_template(&source, &instructions));
                }
                Err(source) => {
                    let err = MigrationError::MarkupParse { path: file.path.clone(), source };
                    warn!(error = %err, "skipping inline template");
                    report.skip_template(&file.path, err.to_string());
                }
            }
        }

        for path in &templates.external {
            let pending: Vec<&Instruction> = applicable
                .iter()
                .filter(|(index, _)| self.applied.insert((path.clone(), *index)))
                .map(|(_, i)| *i)
                .collect();
            if pending.is_empty() {
                continue;
            }
            let template_edits = match self.external_template(tree, path, &file.path, report)? {
                Some((text, template)) => {
                    let source = TemplateSource { template, text, offset: 0 };
                    rewrite_template(&source, &pending)
                }
                None => continue,
            };
            if !template_edits.is_empty() {
                self.record(tree, path, template_edits)?;
            }
        }
        Ok(())
    }

    fn external_template<T: Tree + ?Sized>(
        &mut self,
        tree: &T,
        path: &str,
        component: &str,
        report: &mut MigrationReport,
    ) -> Result<Option<(&str, &Template)>> {
        if !self.templates.contains_key(path) {
            let parsed = match tree.read_text(path) {
                Err(TreeError::NotUtf8 { .. }) => {
                    warn!(template = %path, component = %component, "external template is not valid UTF-8");
                    report.skip_template(path, "template is not valid UTF-8".to_string());
                    None
                }
                Err(e) => return Err(e.into()),
                Ok(None) => {
                    warn!(template = %path, component = %component, "external template not found");
                    report.skip_template(path, "template not found".to_string());
                    None
                }
                Ok(Some(text)) => match markup::parse(&text) {
                    Ok(template) => Some((text, template)),
                    Err(source) => {
                        let err = MigrationError::MarkupParse { path: path.to_string(), source };
                        warn!(error = %err, "skipping external template");
                        report.skip_template(path, err.to_string());
                        None
                    }
                },
            };
            self.templates.insert(path.to_string(), parsed);
        }
        Ok(self
            .templates
            .get(path)
            .and_then(|parsed| parsed.as_ref())
            .map(|(text, template)| (text.as_str(), template)))
    }

    fn record<T: Tree + ?Sized>(&mut self, tree: &T, path: &str, edits: Edits) -> Result<()> {
        let recorder = match self.recorders.entry(path.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(tree.begin_update(path)?),
        };
        edits.record_into(recorder);
        Ok(())
    }

    /// Commit every recorder in path order.
    fn commit<T: Tree + ?Sized>(self, tree: &mut T) -> Result<CatalogReport> {
        let mut report = CatalogReport { name: self.catalog.name.clone(), ..Default::default() };
        for (path, recorder) in self.recorders {
            report.edits += recorder.len();
            let before = recorder.snapshot().to_string();
            tree.commit_update(recorder)?;
            if tree.read_text(&path)?.as_deref() != Some(before.as_str()) {
                report.files.push(path);
            }
        }
        Ok(report)
    }
}
