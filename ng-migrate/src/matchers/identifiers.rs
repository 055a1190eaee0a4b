//! References to an import binding, resolved through the scope tree so a
//! local declaration with the same name is never mistaken for the import.

use crate::program::SourceFile;
use crate::semantic::{NamedImport, ScopeTree};
use std::ops::Range;
use swc_common::Span;
use swc_ecma_ast::{
    BreakStmt, ContinueStmt, ExportSpecifier, Ident, ImportDecl, LabeledStmt, NamedExport,
    TsEnumMember, TsGetterSignature, TsMethodSignature, TsModuleDecl, TsPropertySignature,
    TsSetterSignature,
};
use swc_ecma_visit::{Visit, VisitWith};

/// Byte ranges of every identifier in `file` that refers to the local binding
/// introduced by `import`. The import specifier itself is not included.
pub fn references_to(file: &SourceFile, import: &NamedImport) -> Vec<Range<usize>> {
    let mut finder = ReferenceFinder {
        file,
        scopes: file.scopes(),
        local: &import.local,
        decl: import.local_span,
        found: Vec::new(),
    };
    file.module.visit_with(&mut finder);
    finder.found
}

struct ReferenceFinder<'a> {
    file: &'a SourceFile,
    scopes: &'a ScopeTree,
    local: &'a str,
    decl: Span,
    found: Vec<Range<usize>>,
}

impl Visit for ReferenceFinder<'_> {
    fn visit_ident(&mut self, ident: &Ident) {
        if &*ident.sym == self.local && ident.span != self.decl && self.scopes.refers_to(ident, self.decl) {
            self.found.push(self.file.range(ident.span));
        }
    }

    fn visit_import_decl(&mut self, _: &ImportDecl) {}

    fn visit_named_export(&mut self, export: &NamedExport) {
        // `export { X } from '...'` names another module's binding
        if export.src.is_some() {
            return;
        }
        for specifier in &export.specifiers {
            if let ExportSpecifier::Named(named) = specifier {
                named.orig.visit_with(self);
            }
        }
    }

    fn visit_labeled_stmt(&mut self, stmt: &LabeledStmt) {
        stmt.body.visit_with(self);
    }

    fn visit_break_stmt(&mut self, _: &BreakStmt) {}

    fn visit_continue_stmt(&mut self, _: &ContinueStmt) {}

    fn visit_ts_property_signature(&mut self, sig: &TsPropertySignature) {
        if sig.computed {
            sig.key.visit_with(self);
        }
        sig.type_ann.visit_with(self);
    }

    fn visit_ts_method_signature(&mut self, sig: &TsMethodSignature) {
        if sig.computed {
            sig.key.visit_with(self);
        }
        sig.type_params.visit_with(self);
        sig.params.visit_with(self);
        sig.type_ann.visit_with(self);
    }

    fn visit_ts_getter_signature(&mut self, sig: &TsGetterSignature) {
        if sig.computed {
            sig.key.visit_with(self);
        }
        sig.type_ann.visit_with(self);
    }

    fn visit_ts_setter_signature(&mut self, sig: &TsSetterSignature) {
        if sig.computed {
            sig.key.visit_with(self);
        }
        sig.param.visit_with(self);
    }

    fn visit_ts_enum_member(&mut self, member: &TsEnumMember) {
        member.init.visit_with(self);
    }

    fn visit_ts_module_decl(&mut self, decl: &TsModuleDecl) {
        decl.body.visit_with(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn references(source: &str, imported: &str) -> Vec<String> {
        let file = SourceFile::parse("a.ts", source.to_string()).unwrap();
        let import = file
            .imports()
            .entries()
            .iter()
            .flat_map(|e| e.named.iter())
            .find(|n| n.imported == imported)
            .cloned()
            .unwrap();
        references_to(&file, &import)
            .into_iter()
            .map(|r| format!("{}@{}", &source[r.clone()], r.start))
            .collect()
    }

    #[test]
    fn test_shadowing_declarations_are_not_references() {
        let source = r#"import { OldWidget } from 'pkg/old';
const a: OldWidget = new OldWidget();
function f(OldWidget: string) { return OldWidget; }
class C { OldWidget = 1; m() { return this.OldWidget; } }
{ const OldWidget = 2; console.log(OldWidget); }
export { OldWidget };
"#;
        let found = references(source, "OldWidget");
        assert_eq!(found.len(), 3, "{:?}", found);
        let first_line = source.find('\n').unwrap();
        assert!(found.iter().all(|r| {
            let at: usize = r.split('@').nth(1).unwrap().parse().unwrap();
            at > first_line && (at < source.find("function").unwrap() || at > source.find("export {").unwrap())
        }));
    }

    #[test]
    fn test_type_positions_and_skipped_names() {
        let source = r#"import { Widget as W } from 'pkg';
interface Holder { W: W; [W.key]: string; }
enum E { W = 1 }
outer: for (const x of []) { break outer; }
export { W as Widget2 } from 'other';
type T = Array<W>;
"#;
        let found = references(source, "Widget");
        let names: Vec<_> = found.iter().map(|r| r.split('@').next().unwrap()).collect();
        assert_eq!(names, vec!["W", "W", "W"]);
    }
}
