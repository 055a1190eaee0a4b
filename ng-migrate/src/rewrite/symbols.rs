//! Symbol renames: import specifiers, module specifiers and every reference
//! bound to a renamed import.

use super::Edits;
use crate::catalog::SymbolRename;
use crate::matchers::references_to;
use crate::program::SourceFile;
use crate::semantic::{ImportEntry, NamedImport};
use regex::NoExpand;
use tracing::debug;

/// What happens to one import declaration.
#[derive(Default)]
struct ImportPlan {
    /// Specifier index to new imported name, renamed where it stands.
    in_place: Vec<(usize, String)>,
    /// New imports split off the declaration: target module and moved
    /// specifiers with their new names.
    moved: Vec<(String, Vec<(usize, String)>)>,
    module: Option<String>,
}

impl ImportPlan {
    fn renamed(&self) -> impl Iterator<Item = &(usize, String)> {
        self.in_place
            .iter()
            .chain(self.moved.iter().flat_map(|(_, specs)| specs.iter()))
    }

    fn is_moved(&self, index: usize) -> bool {
        self.moved.iter().any(|(_, specs)| specs.iter().any(|(i, _)| *i == index))
    }
}

/// Apply every symbol rename of a catalog to `file`. Instructions claim
/// specifiers in catalog order; a specifier is renamed at most once.
pub fn rename_symbols(file: &SourceFile, instructions: &[&SymbolRename]) -> Edits {
    let mut edits = Edits::new();
    for entry in file.imports().entries() {
        let plan = plan_import(entry, instructions);
        if plan.in_place.is_empty() && plan.moved.is_empty() {
            continue;
        }
        debug!(path = %file.path, module = %entry.module, "renaming imported symbols");
        emit_import(file, entry, &plan, &mut edits);

        for (index, new_name) in plan.renamed() {
            let named = &entry.named[*index];
            if named.aliased {
                continue;
            }
            for range in references_to(file, named) {
                edits.replace(range.start, range.len(), new_name.as_str());
            }
        }
    }
    edits
}

fn plan_import(entry: &ImportEntry, instructions: &[&SymbolRename]) -> ImportPlan {
    let mut plan = ImportPlan::default();
    let mut claimed = vec![false; entry.named.len()];

    for instruction in instructions {
        if !instruction.module.is_match(&entry.module) {
            continue;
        }
        let matches: Vec<(usize, String)> = instruction
            .symbol_renamings
            .iter()
            .filter_map(|rename| {
                entry
                    .named
                    .iter()
                    .enumerate()
                    .find(|(i, n)| !claimed[*i] && n.imported == rename.replace)
                    .map(|(i, _)| (i, rename.replace_with.clone()))
            })
            .collect();
        if matches.is_empty() {
            continue;
        }
        for (i, _) in &matches {
            claimed[*i] = true;
        }

        let barrel = instruction.barrel_modules.iter().any(|b| *b == entry.module);
        let others = entry.named.len() - matches.len();
        match &instruction.to_module {
            Some(to_module) if !barrel && entry.named.len() > 1 && others > 0 => {
                plan.moved.push((to_module.clone(), matches));
            }
            Some(to_module) if !barrel => {
                if plan.module.is_none() {
                    let moved = instruction
                        .module
                        .replace(&entry.module, NoExpand(to_module.as_str()))
                        .into_owned();
                    plan.module = Some(moved);
                }
                plan.in_place.extend(matches);
            }
            _ => plan.in_place.extend(matches),
        }
    }
    plan
}

fn specifier_source(named: &NamedImport, imported: &str) -> String {
    NamedImport { imported: imported.to_string(), ..named.clone() }.to_source()
}

fn emit_import(file: &SourceFile, entry: &ImportEntry, plan: &ImportPlan, edits: &mut Edits) {
    if plan.moved.is_empty() {
        for (index, new_name) in &plan.in_place {
            let range = &entry.named[*index].imported_range;
            edits.replace(range.start, range.len(), new_name.as_str());
        }
        if let Some(module) = &plan.module {
            let range = &entry.module_range;
            edits.replace(range.start, range.len(), format!("{q}{}{q}", module, q = entry.quote));
        }
        return;
    }

    let text = &file.text;
    let mut end = entry.range.end;
    if text[end..].starts_with(';') {
        end += 1;
    }
    let semicolon = if text[..end].ends_with(';') { ";" } else { "" };
    let keyword = if entry.type_only { "import type" } else { "import" };

    let new_imports: Vec<String> = plan
        .moved
        .iter()
        .map(|(module, specs)| {
            let names: Vec<String> = specs
                .iter()
                .map(|(i, new_name)| specifier_source(&entry.named[*i], new_name))
                .collect();
            format!(
                "{} {{ {} }} from {q}{}{q}{}",
                keyword,
                names.join(", "),
                module,
                semicolon,
                q = entry.quote
            )
        })
        .collect();

    let kept: Vec<String> = entry
        .named
        .iter()
        .enumerate()
        .filter(|(i, _)| !plan.is_moved(*i))
        .map(|(i, named)| match plan.in_place.iter().find(|(j, _)| *j == i) {
            Some((_, new_name)) => specifier_source(named, new_name),
            None => text[named.range.clone()].to_string(),
        })
        .collect();

    if kept.is_empty() && entry.default.is_none() && entry.namespace.is_none() {
        edits.replace(entry.range.start, end - entry.range.start, new_imports.join("\n"));
        return;
    }

    let first = entry.named[0].range.start;
    let last = entry.named[entry.named.len() - 1].range.end;
    edits.replace(first, last - first, kept.join(", "));
    edits.insert_left(end, format!("\n{}", new_imports.join("\n")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Pattern, Rename};
    use crate::tree::UpdateRecorder;

    fn instruction(module: &str, to_module: Option<&str>, renames: &[(&str, &str)]) -> SymbolRename {
        SymbolRename {
            module: Pattern::new(module).unwrap(),
            to_module: to_module.map(str::to_string),
            barrel_modules: vec!["@scope/lib".to_string()],
            symbol_renamings: renames.iter().map(|(a, b)| Rename::new(a, b)).collect(),
        }
    }

    fn run(source: &str, instructions: &[SymbolRename]) -> String {
        let file = SourceFile::parse("src/a.ts", source.to_string()).unwrap();
        let refs: Vec<&SymbolRename> = instructions.iter().collect();
        let mut recorder = UpdateRecorder::new("src/a.ts", source);
        rename_symbols(&file, &refs).record_into(&mut recorder);
        recorder.apply().unwrap()
    }

    #[test]
    fn test_rename_in_place_with_references() {
        let source = "import { OldWidget } from 'pkg/old';\n\
                      class OldWidgetHost {}\n\
                      const w: OldWidget = new OldWidget();\n\
                      function f() { const OldWidget = 1; return OldWidget; }\n";
        let out = run(source, &[instruction("pkg/old", None, &[("OldWidget", "NewWidget")])]);
        assert_eq!(
            out,
            "import { NewWidget } from 'pkg/old';\n\
             class OldWidgetHost {}\n\
             const w: NewWidget = new NewWidget();\n\
             function f() { const OldWidget = 1; return OldWidget; }\n"
        );
    }

    #[test]
    fn test_aliased_import_renames_only_imported_name() {
        let source = "import { OldWidget as W } from \"pkg/old\";\nconst w = new W();\n";
        let out = run(source, &[instruction("pkg/old", None, &[("OldWidget", "NewWidget")])]);
        assert_eq!(out, "import { NewWidget as W } from \"pkg/old\";\nconst w = new W();\n");
    }

    #[test]
    fn test_whole_import_moves_to_new_module() {
        let source = "import { SiTabsModule } from \"@scope/lib/tabs\";\n@NgModule({ imports: [SiTabsModule] })\nexport class M {}\n";
        let out = run(
            source,
            &[instruction(r"@scope/lib(/tabs)?", Some("@scope/lib/tabs-legacy"), &[("SiTabsModule", "SiTabsLegacyModule")])],
        );
        assert_eq!(
            out,
            "import { SiTabsLegacyModule } from \"@scope/lib/tabs-legacy\";\n@NgModule({ imports: [SiTabsLegacyModule] })\nexport class M {}\n"
        );
    }

    #[test]
    fn test_import_split_keeps_other_specifiers() {
        let source = "import { SiTabComponent, SiOther } from '@scope/lib/tabs';\nlet t: SiTabComponent;\n";
        let out = run(
            source,
            &[instruction(r"@scope/lib(/tabs)?", Some("@scope/lib/tabs-legacy"), &[("SiTabComponent", "SiTabLegacyComponent")])],
        );
        assert_eq!(
            out,
            "import { SiOther } from '@scope/lib/tabs';\nimport { SiTabLegacyComponent } from '@scope/lib/tabs-legacy';\nlet t: SiTabLegacyComponent;\n"
        );
    }

    #[test]
    fn test_barrel_imports_never_move() {
        let source = "import { SiTabComponent, SiOther } from '@scope/lib';\n";
        let out = run(
            source,
            &[instruction(r"@scope/lib(/tabs)?", Some("@scope/lib/tabs-legacy"), &[("SiTabComponent", "SiTabLegacyComponent")])],
        );
        assert_eq!(out, "import { SiTabLegacyComponent, SiOther } from '@scope/lib';\n");
    }

    #[test]
    fn test_unmatched_module_is_untouched() {
        let source = "import { OldWidget } from 'elsewhere';\nnew OldWidget();\n";
        let out = run(source, &[instruction("^pkg/old$", None, &[("OldWidget", "NewWidget")])]);
        assert_eq!(out, source);
    }

    #[test]
    fn test_two_instructions_split_everything() {
        let source = "import { A, B } from 'pkg/x';\n";
        let out = run(
            source,
            &[
                instruction("pkg/x", Some("pkg/a"), &[("A", "A2")]),
                instruction("pkg/x", Some("pkg/b"), &[("B", "B2")]),
            ],
        );
        assert_eq!(out, "import { A2 } from 'pkg/a';\nimport { B2 } from 'pkg/b';\n");
    }
}
