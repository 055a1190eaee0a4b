//! Lexical scopes of a module, used to tell whether an identifier refers to
//! an import binding or to a local declaration that shadows it.
//!
//! Scopes are recorded as byte ranges. Because ranges nest, the innermost
//! scope around a position is the last one recorded that contains it.

use std::collections::HashMap;
use swc_common::{BytePos, Span};
use swc_ecma_ast::{
    ArrowExpr, BlockStmt, CatchClause, ClassDecl, ClassExpr, Constructor, FnDecl, FnExpr,
    ForInStmt, ForOfStmt, ForStmt, Function, Ident, ImportDecl, ImportSpecifier, Module,
    ObjectPatProp, ParamOrTsParamProp, Pat, TsEnumDecl, TsInterfaceDecl, TsModuleDecl,
    TsModuleName, TsParamPropParam, TsTypeAliasDecl, VarDecl, VarDeclKind,
};
use swc_ecma_visit::{Visit, VisitWith};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Import,
    Var,
    Lexical,
    Function,
    Class,
    Param,
    Type,
    Enum,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    /// Span of the declaring identifier.
    pub span: Span,
    pub kind: BindingKind,
}

#[derive(Debug)]
struct Scope {
    parent: Option<usize>,
    lo: BytePos,
    hi: BytePos,
    function_scope: bool,
    bindings: HashMap<String, Binding>,
}

impl Scope {
    fn contains(&self, pos: BytePos) -> bool {
        self.lo <= pos && pos < self.hi
    }
}

#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn build(module: &Module) -> Self {
        let mut builder = ScopeBuilder {
            scopes: vec![Scope {
                parent: None,
                lo: BytePos(0),
                hi: BytePos(u32::MAX),
                function_scope: true,
                bindings: HashMap::new(),
            }],
            stack: vec![0],
        };
        module.visit_with(&mut builder);
        Self { scopes: builder.scopes }
    }

    /// The declaration `name` refers to at `pos`, if it is declared anywhere
    /// in an enclosing scope.
    pub fn resolve(&self, name: &str, pos: BytePos) -> Option<&Binding> {
        let mut current = self.innermost(pos);
        loop {
            let scope = &self.scopes[current];
            if let Some(binding) = scope.bindings.get(name) {
                return Some(binding);
            }
            current = scope.parent?;
        }
    }

    /// True when `ident` resolves to exactly the binding declared at `decl`.
    pub fn refers_to(&self, ident: &Ident, decl: Span) -> bool {
        self.resolve(&ident.sym, ident.span.lo)
            .is_some_and(|b| b.span == decl)
    }

    fn innermost(&self, pos: BytePos) -> usize {
        self.scopes
            .iter()
            .rposition(|s| s.contains(pos))
            .unwrap_or(0)
    }
}

struct ScopeBuilder {
    scopes: Vec<Scope>,
    stack: Vec<usize>,
}

impl ScopeBuilder {
    fn current(&self) -> usize {
        self.stack.last().copied().unwrap_or(0)
    }

    fn enter(&mut self, span: Span, function_scope: bool) {
        let parent = self.current();
        self.scopes.push(Scope {
            parent: Some(parent),
            lo: span.lo,
            hi: span.hi,
            function_scope,
            bindings: HashMap::new(),
        });
        self.stack.push(self.scopes.len() - 1);
    }

    fn exit(&mut self) {
        self.stack.pop();
    }

    fn declare_in(&mut self, scope: usize, ident: &Ident, kind: BindingKind) {
        self.scopes[scope].bindings.insert(
            ident.sym.to_string(),
            Binding { name: ident.sym.to_string(), span: ident.span, kind },
        );
    }

    fn declare(&mut self, ident: &Ident, kind: BindingKind) {
        let scope = self.current();
        self.declare_in(scope, ident, kind);
    }

    fn declare_pat(&mut self, pat: &Pat, kind: BindingKind) {
        let mut idents = Vec::new();
        pat_idents(pat, &mut idents);
        for ident in idents {
            self.declare(ident, kind);
        }
    }

    /// `var` declarations belong to the nearest function scope.
    fn declare_var(&mut self, pat: &Pat) {
        let scope = self
            .stack
            .iter()
            .rev()
            .copied()
            .find(|&idx| self.scopes[idx].function_scope)
            .unwrap_or(0);
        let mut idents = Vec::new();
        pat_idents(pat, &mut idents);
        for ident in idents {
            self.declare_in(scope, ident, BindingKind::Var);
        }
    }
}

/// Binding identifiers introduced by a pattern.
pub fn pat_idents<'a>(pat: &'a Pat, out: &mut Vec<&'a Ident>) {
    match pat {
        Pat::Ident(binding) => out.push(&binding.id),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pat_idents(elem, out);
            }
        }
        Pat::Rest(rest) => pat_idents(&rest.arg, out),
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => pat_idents(&kv.value, out),
                    ObjectPatProp::Assign(assign) => out.push(&assign.key.id),
                    ObjectPatProp::Rest(rest) => pat_idents(&rest.arg, out),
                }
            }
        }
        Pat::Assign(assign) => pat_idents(&assign.left, out),
        _ => {}
    }
}

impl Visit for ScopeBuilder {
    fn visit_import_decl(&mut self, import: &ImportDecl) {
        for specifier in &import.specifiers {
            let local = match specifier {
                ImportSpecifier::Named(named) => &named.local,
                ImportSpecifier::Default(default) => &default.local,
                ImportSpecifier::Namespace(ns) => &ns.local,
            };
            self.declare(local, BindingKind::Import);
        }
    }

    fn visit_fn_decl(&mut self, decl: &FnDecl) {
        self.declare(&decl.ident, BindingKind::Function);
        decl.function.visit_with(self);
    }

    fn visit_fn_expr(&mut self, expr: &FnExpr) {
        self.enter(expr.function.span, true);
        if let Some(ident) = &expr.ident {
            self.declare(ident, BindingKind::Function);
        }
        expr.function.visit_with(self);
        self.exit();
    }

    fn visit_function(&mut self, function: &Function) {
        self.enter(function.span, true);
        for param in &function.params {
            self.declare_pat(&param.pat, BindingKind::Param);
        }
        function.visit_children_with(self);
        self.exit();
    }

    fn visit_constructor(&mut self, ctor: &Constructor) {
        self.enter(ctor.span, true);
        for param in &ctor.params {
            match param {
                ParamOrTsParamProp::Param(param) => self.declare_pat(&param.pat, BindingKind::Param),
                ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                    TsParamPropParam::Ident(binding) => self.declare(&binding.id, BindingKind::Param),
                    TsParamPropParam::Assign(assign) => self.declare_pat(&assign.left, BindingKind::Param),
                },
            }
        }
        ctor.visit_children_with(self);
        self.exit();
    }

    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        self.enter(arrow.span, true);
        for param in &arrow.params {
            self.declare_pat(param, BindingKind::Param);
        }
        arrow.visit_children_with(self);
        self.exit();
    }

    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        self.declare(&decl.ident, BindingKind::Class);
        self.enter(decl.class.span, false);
        decl.class.visit_with(self);
        self.exit();
    }

    fn visit_class_expr(&mut self, expr: &ClassExpr) {
        self.enter(expr.class.span, false);
        if let Some(ident) = &expr.ident {
            self.declare(ident, BindingKind::Class);
        }
        expr.class.visit_with(self);
        self.exit();
    }

    fn visit_block_stmt(&mut self, block: &BlockStmt) {
        self.enter(block.span, false);
        block.visit_children_with(self);
        self.exit();
    }

    fn visit_for_stmt(&mut self, stmt: &ForStmt) {
        self.enter(stmt.span, false);
        stmt.visit_children_with(self);
        self.exit();
    }

    fn visit_for_in_stmt(&mut self, stmt: &ForInStmt) {
        self.enter(stmt.span, false);
        stmt.visit_children_with(self);
        self.exit();
    }

    fn visit_for_of_stmt(&mut self, stmt: &ForOfStmt) {
        self.enter(stmt.span, false);
        stmt.visit_children_with(self);
        self.exit();
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        self.enter(clause.span, false);
        if let Some(param) = &clause.param {
            self.declare_pat(param, BindingKind::Lexical);
        }
        clause.visit_children_with(self);
        self.exit();
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        for declarator in &decl.decls {
            if decl.kind == VarDeclKind::Var {
                self.declare_var(&declarator.name);
            } else {
                self.declare_pat(&declarator.name, BindingKind::Lexical);
            }
        }
        decl.visit_children_with(self);
    }

    fn visit_ts_interface_decl(&mut self, decl: &TsInterfaceDecl) {
        self.declare(&decl.id, BindingKind::Type);
        decl.visit_children_with(self);
    }

    fn visit_ts_type_alias_decl(&mut self, decl: &TsTypeAliasDecl) {
        self.declare(&decl.id, BindingKind::Type);
        decl.visit_children_with(self);
    }

    fn visit_ts_enum_decl(&mut self, decl: &TsEnumDecl) {
        self.declare(&decl.id, BindingKind::Enum);
        decl.visit_children_with(self);
    }

    fn visit_ts_module_decl(&mut self, decl: &TsModuleDecl) {
        if let TsModuleName::Ident(ident) = &decl.id {
            self.declare(ident, BindingKind::Namespace);
        }
        self.enter(decl.span, true);
        decl.visit_children_with(self);
        self.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::SourceFile;
    use swc_ecma_visit::Visit;

    /// Collects every `Ident` named `name`, with whether it resolves to an import.
    struct Probe<'a> {
        name: &'a str,
        scopes: &'a ScopeTree,
        found: Vec<(u32, Option<BindingKind>)>,
    }

    impl Visit for Probe<'_> {
        fn visit_ident(&mut self, ident: &Ident) {
            if &*ident.sym == self.name {
                let kind = self.scopes.resolve(self.name, ident.span.lo).map(|b| b.kind);
                self.found.push((ident.span.lo.0, kind));
            }
        }
    }

    fn kinds(source: &str, name: &str) -> Vec<Option<BindingKind>> {
        let file = SourceFile::parse("a.ts", source.to_string()).unwrap();
        let mut probe = Probe { name, scopes: file.scopes(), found: Vec::new() };
        file.module.visit_with(&mut probe);
        probe.found.into_iter().map(|(_, k)| k).collect()
    }

    #[test]
    fn test_import_binding_resolves_at_module_level() {
        let found = kinds("import { Widget } from 'pkg';\nconst w: Widget = new Widget();\n", "Widget");
        assert_eq!(found, vec![Some(BindingKind::Import); 3]);
    }

    #[test]
    fn test_shadowing_in_function_and_block() {
        let source = "import { Widget } from 'pkg';
function make(Widget: number) { return Widget; }
{ const Widget = 1; console.log(Widget); }
new Widget();
";
        assert_eq!(
            kinds(source, "Widget"),
            vec![
                Some(BindingKind::Import),
                Some(BindingKind::Param),
                Some(BindingKind::Param),
                Some(BindingKind::Lexical),
                Some(BindingKind::Lexical),
                Some(BindingKind::Import),
            ]
        );
    }

    #[test]
    fn test_var_hoists_to_function_scope() {
        let source = "import { x } from 'pkg';
function f() { if (true) { var x = 1; } return x; }
";
        let found = kinds(source, "x");
        assert_eq!(found[0], Some(BindingKind::Import));
        assert_eq!(found[1], Some(BindingKind::Var));
        assert_eq!(found[2], Some(BindingKind::Var));
    }

    #[test]
    fn test_arrow_and_catch_params() {
        let source = "import { e } from 'pkg';
const f = (e) => e;
try {} catch (e) { e; }
e;
";
        let found = kinds(source, "e");
        assert_eq!(
            found,
            vec![
                Some(BindingKind::Import),
                Some(BindingKind::Param),
                Some(BindingKind::Param),
                Some(BindingKind::Lexical),
                Some(BindingKind::Lexical),
                Some(BindingKind::Import),
            ]
        );
    }

    #[test]
    fn test_local_class_shadows_in_module() {
        let source = "class Widget {}\nnew Widget();\n";
        assert_eq!(kinds(source, "Widget"), vec![Some(BindingKind::Class); 2]);
    }
}
