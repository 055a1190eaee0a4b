//! Static receiver types, as far as declarations in the program reveal them.
//!
//! This is not a type checker. It follows annotations, constructor calls,
//! Angular DI and signal helpers, class members (through `extends`) and import
//! aliases, which is enough to answer "is this receiver a `Foo`?" for member
//! rewrites. Anything it cannot see through resolves to `None`.

use super::scope::BindingKind;
use super::imports::ImportedSymbol;
use crate::program::{Program, SourceFile};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use swc_common::{BytePos, Span};
use swc_ecma_ast::{
    BindingIdent, Callee, Class, ClassDecl, ClassExpr, ClassMember, Decl, DefaultDecl, Expr,
    ExprOrSpread, ExportSpecifier, Ident, MemberExpr, MemberProp, MethodKind, ModuleDecl,
    ModuleExportName, ModuleItem, OptChainBase, ParamOrTsParamProp, Pat, PropName, Stmt,
    TsEntityName, TsInterfaceDecl, TsKeywordTypeKind, TsParamPropParam, TsType, TsTypeAliasDecl,
    TsTypeElement, TsTypeParamInstantiation, TsUnionOrIntersectionType, VarDeclarator,
};
use swc_ecma_visit::{Visit, VisitWith};

const MAX_DEPTH: usize = 24;

/// Types whose call yields their first type argument.
pub const SIGNAL_TYPES: &[&str] = &[
    "Signal",
    "WritableSignal",
    "InputSignal",
    "InputSignalWithTransform",
    "ModelSignal",
];

/// A named type. `file` is the declaring file when the declaration is part of
/// the program; external types carry only their exported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub name: String,
    pub file: Option<String>,
    pub args: Vec<ResolvedType>,
}

impl ResolvedType {
    pub fn external(name: impl Into<String>) -> Self {
        Self { name: name.into(), file: None, args: Vec::new() }
    }

    fn declared(name: impl Into<String>, file: &SourceFile) -> Self {
        Self { name: name.into(), file: Some(file.path.clone()), args: Vec::new() }
    }

    fn with_args(mut self, args: Vec<ResolvedType>) -> Self {
        if !args.is_empty() {
            self.args = args;
        }
        self
    }

    fn signal_of(inner: ResolvedType) -> Self {
        Self { name: "Signal".to_string(), file: None, args: vec![inner] }
    }
}

#[derive(Clone, Copy)]
enum TypeDecl<'p> {
    Class(&'p Class),
    Interface(&'p TsInterfaceDecl),
    Alias(&'p TsTypeAliasDecl),
    Enum,
}

/// What a local binding was declared with.
#[derive(Debug, Clone)]
enum Declared {
    Typed(Box<TsType>),
    Init(Box<Expr>),
}

pub struct TypeResolver<'p> {
    program: &'p Program,
    bindings: RefCell<HashMap<(String, u32), Option<ResolvedType>>>,
    classes: RefCell<HashMap<String, Rc<Vec<(Span, String)>>>>,
}

impl<'p> TypeResolver<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            bindings: RefCell::new(HashMap::new()),
            classes: RefCell::new(HashMap::new()),
        }
    }

    /// Static type of `expr`, an expression inside the file at `path`.
    pub fn type_of_expr(&self, path: &str, expr: &Expr) -> Option<ResolvedType> {
        let file = self.program.file(path)?;
        self.expr_type(file, expr, 0)
    }

    fn expr_type(&self, file: &'p SourceFile, expr: &Expr, depth: usize) -> Option<ResolvedType> {
        if depth > MAX_DEPTH {
            return None;
        }
        let depth = depth + 1;
        match expr {
            Expr::Paren(paren) => self.expr_type(file, &paren.expr, depth),
            Expr::TsNonNull(non_null) => self.expr_type(file, &non_null.expr, depth),
            Expr::TsSatisfies(satisfies) => self.expr_type(file, &satisfies.expr, depth),
            Expr::TsConstAssertion(assertion) => self.expr_type(file, &assertion.expr, depth),
            Expr::TsAs(as_expr) => self.ts_type(file, &as_expr.type_ann, depth),
            Expr::TsTypeAssertion(assertion) => self.ts_type(file, &assertion.type_ann, depth),
            Expr::This(this) => self.enclosing_class(file, this.span.lo),
            Expr::Ident(ident) => self.ident_type(file, ident, depth),
            Expr::Member(member) => self.member_expr_type(file, member, depth),
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(member) => self.member_expr_type(file, member, depth),
                OptChainBase::Call(call) => {
                    self.call_type(file, &call.callee, &call.args, call.type_args.as_deref(), depth)
                }
            },
            Expr::Call(call) => match &call.callee {
                Callee::Expr(callee) => {
                    self.call_type(file, callee, &call.args, call.type_args.as_deref(), depth)
                }
                _ => None,
            },
            Expr::New(new) => match &*new.callee {
                Expr::Ident(ident) => {
                    let args = self.type_args(file, new.type_args.as_deref(), depth);
                    Some(self.named_type(file, &ident.sym, ident.span.lo, depth)?.with_args(args))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn member_expr_type(&self, file: &'p SourceFile, member: &MemberExpr, depth: usize) -> Option<ResolvedType> {
        let MemberProp::Ident(prop) = &member.prop else {
            return None;
        };
        let receiver = self.expr_type(file, &member.obj, depth)?;
        self.member_type(&receiver, &prop.sym, depth)
    }

    fn call_type(
        &self,
        file: &'p SourceFile,
        callee: &Expr,
        args: &[ExprOrSpread],
        type_args: Option<&TsTypeParamInstantiation>,
        depth: usize,
    ) -> Option<ResolvedType> {
        let first_type_arg = || {
            type_args
                .and_then(|t| t.params.first())
                .and_then(|t| self.ts_type(file, t, depth))
        };
        let first_arg_as_type = || match args.first().map(|a| &*a.expr) {
            Some(Expr::Ident(ident)) => self.named_type(file, &ident.sym, ident.span.lo, depth),
            _ => None,
        };

        match callee_name(callee).as_deref() {
            Some("inject") => return first_type_arg().or_else(first_arg_as_type),
            Some("viewChild" | "viewChild.required" | "contentChild" | "contentChild.required") => {
                return first_type_arg().or_else(first_arg_as_type).map(ResolvedType::signal_of);
            }
            Some("input" | "input.required" | "model" | "model.required" | "signal" | "computed") => {
                let inner = first_type_arg().or_else(|| {
                    args.first()
                        .and_then(|a| self.expr_type(file, &a.expr, depth))
                });
                return inner.map(ResolvedType::signal_of);
            }
            _ => {}
        }

        if let Expr::Member(member) = callee {
            if let MemberProp::Ident(method) = &member.prop {
                if let Some(receiver) = self.expr_type(file, &member.obj, depth) {
                    if let Some(ret) = self.method_return_type(&receiver, &method.sym, depth) {
                        return Some(ret);
                    }
                }
            }
        }

        let called = self.expr_type(file, callee, depth)?;
        if SIGNAL_TYPES.contains(&called.name.as_str()) {
            called.args.into_iter().next()
        } else {
            None
        }
    }

    fn type_args(
        &self,
        file: &'p SourceFile,
        args: Option<&TsTypeParamInstantiation>,
        depth: usize,
    ) -> Vec<ResolvedType> {
        args.map(|a| {
            a.params
                .iter()
                .filter_map(|t| self.ts_type(file, t, depth))
                .collect()
        })
        .unwrap_or_default()
    }

    fn ident_type(&self, file: &'p SourceFile, ident: &Ident, depth: usize) -> Option<ResolvedType> {
        let binding = file.scopes().resolve(&ident.sym, ident.span.lo)?;
        if !matches!(binding.kind, BindingKind::Var | BindingKind::Lexical | BindingKind::Param) {
            return None;
        }

        let key = (file.path.clone(), binding.span.lo.0);
        if let Some(cached) = self.bindings.borrow().get(&key) {
            return cached.clone();
        }
        // a self-referencing initializer resolves to nothing
        self.bindings.borrow_mut().insert(key.clone(), None);

        let resolved = match find_declared(file, binding.span.lo)? {
            Declared::Typed(ty) => self.ts_type(file, &ty, depth),
            Declared::Init(init) => self.expr_type(file, &init, depth),
        };
        self.bindings.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    /// Resolve an annotation. Unions with `null`/`undefined` narrow to their
    /// only other member.
    fn ts_type(&self, file: &'p SourceFile, ty: &TsType, depth: usize) -> Option<ResolvedType> {
        if depth > MAX_DEPTH {
            return None;
        }
        let depth = depth + 1;
        match ty {
            TsType::TsTypeRef(reference) => {
                let args = self.type_args(file, reference.type_params.as_deref(), depth);
                let resolved = match &reference.type_name {
                    TsEntityName::Ident(ident) => self.named_type(file, &ident.sym, ident.span.lo, depth)?,
                    TsEntityName::TsQualifiedName(qualified) => ResolvedType::external(qualified.right.sym.to_string()),
                    #[allow(unreachable_patterns)]
                    _ => return None,
                };
                Some(resolved.with_args(args))
            }
            TsType::TsParenthesizedType(paren) => self.ts_type(file, &paren.type_ann, depth),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(union)) => {
                let mut named = union.types.iter().filter(|t| !is_nullish(t));
                match (named.next(), named.next()) {
                    (Some(only), None) => self.ts_type(file, only, depth),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Resolve a type name used at `pos` in `file`.
    fn named_type(&self, file: &'p SourceFile, name: &str, pos: BytePos, depth: usize) -> Option<ResolvedType> {
        if depth > MAX_DEPTH {
            return None;
        }
        if let Some(binding) = file.scopes().resolve(name, pos) {
            if binding.kind == BindingKind::Import {
                return match file.imports().lookup(name) {
                    Some(ImportedSymbol::Named { module, imported }) => {
                        Some(self.imported_type(file, module, imported, depth + 1))
                    }
                    _ => Some(ResolvedType::external(name)),
                };
            }
        }
        match find_type_decl(file, name) {
            Some(TypeDecl::Alias(alias)) => self.ts_type(file, &alias.type_ann, depth + 1),
            Some(_) => Some(ResolvedType::declared(name, file)),
            None => Some(ResolvedType::external(name)),
        }
    }

    /// The type exported as `name` from `specifier`, seen from `file`.
    fn imported_type(&self, file: &'p SourceFile, specifier: &str, name: &str, depth: usize) -> ResolvedType {
        match self.program.resolve_import(&file.path, specifier) {
            Some(target) => self
                .exported_type(target, name, depth)
                .unwrap_or_else(|| ResolvedType::external(name)),
            None => ResolvedType::external(name),
        }
    }

    fn exported_type(&self, file: &'p SourceFile, name: &str, depth: usize) -> Option<ResolvedType> {
        if depth > MAX_DEPTH {
            return None;
        }
        let depth = depth + 1;
        match find_type_decl(file, name) {
            Some(TypeDecl::Alias(alias)) => return self.ts_type(file, &alias.type_ann, depth),
            Some(_) => return Some(ResolvedType::declared(name, file)),
            None => {}
        }

        for item in &file.module.body {
            let ModuleItem::ModuleDecl(decl) = item else {
                continue;
            };
            match decl {
                ModuleDecl::ExportNamed(export) => {
                    for specifier in &export.specifiers {
                        let ExportSpecifier::Named(named) = specifier else {
                            continue;
                        };
                        let orig = export_name(file, &named.orig);
                        let exported = named.exported.as_ref().map(|e| export_name(file, e));
                        if exported.as_deref().unwrap_or(orig.as_str()) != name {
                            continue;
                        }
                        return Some(match &export.src {
                            Some(src) => self.imported_type(file, file.literal_value(src), &orig, depth),
                            None => match file.imports().lookup(&orig) {
                                Some(ImportedSymbol::Named { module, imported }) => {
                                    self.imported_type(file, module, imported, depth)
                                }
                                _ => ResolvedType::declared(orig, file),
                            },
                        });
                    }
                }
                ModuleDecl::ExportAll(export) => {
                    let specifier = file.literal_value(&export.src);
                    if let Some(target) = self.program.resolve_import(&file.path, specifier) {
                        if let Some(found) = self.exported_type(target, name, depth) {
                            return Some(found);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn enclosing_class(&self, file: &'p SourceFile, pos: BytePos) -> Option<ResolvedType> {
        let ranges = self.class_ranges(file);
        ranges
            .iter()
            .filter(|(span, _)| span.lo <= pos && pos < span.hi)
            .min_by_key(|(span, _)| span.hi.0 - span.lo.0)
            .map(|(_, name)| ResolvedType::declared(name.clone(), file))
    }

    fn class_ranges(&self, file: &SourceFile) -> Rc<Vec<(Span, String)>> {
        if let Some(found) = self.classes.borrow().get(&file.path) {
            return Rc::clone(found);
        }
        let mut collector = ClassRanges::default();
        file.module.visit_with(&mut collector);
        let ranges = Rc::new(collector.ranges);
        self.classes
            .borrow_mut()
            .insert(file.path.clone(), Rc::clone(&ranges));
        ranges
    }

    /// Type of property `member` on `ty`, following `extends`.
    pub fn member_type(&self, ty: &ResolvedType, member: &str, depth: usize) -> Option<ResolvedType> {
        if depth > MAX_DEPTH {
            return None;
        }
        let depth = depth + 1;
        let file = self.program.file(ty.file.as_deref()?)?;

        match find_type_decl(file, &ty.name)? {
            TypeDecl::Class(class) => {
                for m in &class.body {
                    match m {
                        ClassMember::ClassProp(prop) if prop_name_is(&prop.key, member) => {
                            if let Some(ann) = &prop.type_ann {
                                return self.ts_type(file, &ann.type_ann, depth);
                            }
                            if let Some(value) = &prop.value {
                                return self.expr_type(file, value, depth);
                            }
                            return None;
                        }
                        ClassMember::Method(method)
                            if method.kind == MethodKind::Getter && prop_name_is(&method.key, member) =>
                        {
                            let ann = method.function.return_type.as_ref()?;
                            return self.ts_type(file, &ann.type_ann, depth);
                        }
                        ClassMember::Constructor(ctor) => {
                            for param in &ctor.params {
                                let ParamOrTsParamProp::TsParamProp(prop) = param else {
                                    continue;
                                };
                                let binding = match &prop.param {
                                    TsParamPropParam::Ident(binding) => Some(binding),
                                    TsParamPropParam::Assign(assign) => match &*assign.left {
                                        Pat::Ident(binding) => Some(binding),
                                        _ => None,
                                    },
                                };
                                if let Some(binding) = binding.filter(|b| &*b.id.sym == member) {
                                    let ann = binding.type_ann.as_ref()?;
                                    return self.ts_type(file, &ann.type_ann, depth);
                                }
                            }
                        }
                        _ => {}
                    }
                }
                let parent = self.super_class(file, class, depth)?;
                self.member_type(&parent, member, depth)
            }
            TypeDecl::Interface(interface) => {
                if let Some(found) = self.type_element(file, &interface.body.body, member, depth) {
                    return Some(found);
                }
                interface.extends.iter().find_map(|parent| match &*parent.expr {
                    Expr::Ident(ident) => {
                        let parent = self.named_type(file, &ident.sym, ident.span.lo, depth)?;
                        self.member_type(&parent, member, depth)
                    }
                    _ => None,
                })
            }
            TypeDecl::Alias(alias) => match &*alias.type_ann {
                TsType::TsTypeLit(lit) => self.type_element(file, &lit.members, member, depth),
                _ => None,
            },
            TypeDecl::Enum => None,
        }
    }

    fn type_element(
        &self,
        file: &'p SourceFile,
        elements: &[TsTypeElement],
        member: &str,
        depth: usize,
    ) -> Option<ResolvedType> {
        for element in elements {
            let (key, computed, ann) = match element {
                TsTypeElement::TsPropertySignature(sig) => (&sig.key, sig.computed, &sig.type_ann),
                TsTypeElement::TsGetterSignature(sig) => (&sig.key, sig.computed, &sig.type_ann),
                _ => continue,
            };
            if !computed && expr_ident_is(key, member) {
                return ann.as_ref().and_then(|a| self.ts_type(file, &a.type_ann, depth));
            }
        }
        None
    }

    fn method_return_type(&self, ty: &ResolvedType, method: &str, depth: usize) -> Option<ResolvedType> {
        if depth > MAX_DEPTH {
            return None;
        }
        let depth = depth + 1;
        let file = self.program.file(ty.file.as_deref()?)?;

        match find_type_decl(file, &ty.name)? {
            TypeDecl::Class(class) => {
                for m in &class.body {
                    if let ClassMember::Method(m) = m {
                        if m.kind == MethodKind::Method && prop_name_is(&m.key, method) {
                            let ann = m.function.return_type.as_ref()?;
                            return self.ts_type(file, &ann.type_ann, depth);
                        }
                    }
                }
                let parent = self.super_class(file, class, depth)?;
                self.method_return_type(&parent, method, depth)
            }
            TypeDecl::Interface(interface) => {
                for element in &interface.body.body {
                    if let TsTypeElement::TsMethodSignature(sig) = element {
                        if !sig.computed && expr_ident_is(&sig.key, method) {
                            let ann = sig.type_ann.as_ref()?;
                            return self.ts_type(file, &ann.type_ann, depth);
                        }
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn super_class(&self, file: &'p SourceFile, class: &Class, depth: usize) -> Option<ResolvedType> {
        match class.super_class.as_deref()? {
            Expr::Ident(ident) => self.named_type(file, &ident.sym, ident.span.lo, depth),
            _ => None,
        }
    }
}

fn is_nullish(ty: &TsType) -> bool {
    matches!(
        ty,
        TsType::TsKeywordType(k)
            if matches!(k.kind, TsKeywordTypeKind::TsNullKeyword | TsKeywordTypeKind::TsUndefinedKeyword)
    )
}

fn prop_name_is(key: &PropName, name: &str) -> bool {
    matches!(key, PropName::Ident(ident) if &*ident.sym == name)
}

fn expr_ident_is(expr: &Expr, name: &str) -> bool {
    matches!(expr, Expr::Ident(ident) if &*ident.sym == name)
}

fn export_name(file: &SourceFile, name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => file.literal_value(s).to_string(),
        #[allow(unreachable_patterns)]
        _ => String::new(),
    }
}

/// `inject`, `viewChild.required`, ... for plain and one-level member callees.
fn callee_name(callee: &Expr) -> Option<String> {
    match callee {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Member(member) => match (&*member.obj, &member.prop) {
            (Expr::Ident(obj), MemberProp::Ident(prop)) => Some(format!("{}.{}", obj.sym, prop.sym)),
            _ => None,
        },
        _ => None,
    }
}

/// Top-level class, interface, type alias or enum named `name`.
fn find_type_decl<'p>(file: &'p SourceFile, name: &str) -> Option<TypeDecl<'p>> {
    for item in &file.module.body {
        let decl = match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => &export.decl,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => {
                if let DefaultDecl::Class(ClassExpr { ident: Some(ident), class, .. }) = &export.decl {
                    if &*ident.sym == name {
                        return Some(TypeDecl::Class(class));
                    }
                }
                continue;
            }
            _ => continue,
        };
        match decl {
            Decl::Class(ClassDecl { ident, class, .. }) if &*ident.sym == name => {
                return Some(TypeDecl::Class(class));
            }
            Decl::TsInterface(interface) if &*interface.id.sym == name => {
                return Some(TypeDecl::Interface(interface));
            }
            Decl::TsTypeAlias(alias) if &*alias.id.sym == name => return Some(TypeDecl::Alias(alias)),
            Decl::TsEnum(e) if &*e.id.sym == name => return Some(TypeDecl::Enum),
            _ => {}
        }
    }
    None
}

/// The annotation or initializer of the binding declared at `pos`.
fn find_declared(file: &SourceFile, pos: BytePos) -> Option<Declared> {
    let mut finder = DeclFinder { target: pos, found: None };
    file.module.visit_with(&mut finder);
    finder.found
}

struct DeclFinder {
    target: BytePos,
    found: Option<Declared>,
}

impl Visit for DeclFinder {
    fn visit_binding_ident(&mut self, binding: &BindingIdent) {
        if self.found.is_none() && binding.id.span.lo == self.target {
            if let Some(ann) = &binding.type_ann {
                self.found = Some(Declared::Typed(ann.type_ann.clone()));
            }
        }
    }

    fn visit_var_declarator(&mut self, declarator: &VarDeclarator) {
        declarator.visit_children_with(self);
        if self.found.is_some() {
            return;
        }
        if let Pat::Ident(binding) = &declarator.name {
            if binding.id.span.lo == self.target {
                if let Some(init) = &declarator.init {
                    self.found = Some(Declared::Init(init.clone()));
                }
            }
        }
    }
}

#[derive(Default)]
struct ClassRanges {
    ranges: Vec<(Span, String)>,
}

impl Visit for ClassRanges {
    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        self.ranges.push((decl.class.span, decl.ident.sym.to_string()));
        decl.visit_children_with(self);
    }

    fn visit_class_expr(&mut self, expr: &ClassExpr) {
        if let Some(ident) = &expr.ident {
            self.ranges.push((expr.class.span, ident.sym.to_string()));
        }
        expr.visit_children_with(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::host::CompilerHost;
    use crate::program::tsconfig;
    use crate::tree::OverlayTree;

    /// Types of every `recv.<member>` receiver in `path`, in source order.
    struct Receivers<'r, 'p> {
        resolver: &'r TypeResolver<'p>,
        path: &'r str,
        member: &'r str,
        found: Vec<Option<String>>,
    }

    impl Visit for Receivers<'_, '_> {
        fn visit_member_expr(&mut self, member: &MemberExpr) {
            if let MemberProp::Ident(prop) = &member.prop {
                if &*prop.sym == self.member {
                    let ty = self.resolver.type_of_expr(self.path, &member.obj);
                    self.found.push(ty.map(|t| t.name));
                }
            }
            member.visit_children_with(self);
        }
    }

    fn receiver_types(files: &[(&str, &str)], path: &str, member: &str) -> Vec<Option<String>> {
        let mut all: Vec<(&str, &str)> = vec![("tsconfig.json", "{}")];
        all.extend_from_slice(files);
        let tree = OverlayTree::from_files(all);
        let host = CompilerHost::new(&tree);
        let config = tsconfig::load(&host, "tsconfig.json").unwrap();
        let program = Program::build(&host, &config).unwrap();
        let resolver = program.type_resolver();
        let file = program.file(path).unwrap();
        let mut visitor = Receivers { resolver: &resolver, path, member, found: Vec::new() };
        file.module.visit_with(&mut visitor);
        visitor.found
    }

    #[test]
    fn test_annotations_new_and_inject() {
        let source = r#"
import { inject } from '@angular/core';
import { Container as C } from '@scope/lib';
export class Page {
  a: C | null = null;
  b = new C();
  c = inject(C);
  constructor(private d: C) {}
  run(e: C) {
    const f = this.c;
    return [this.a!.isXs, this.b.isXs, this.c.isXs, this.d.isXs, e.isXs, f.isXs];
  }
}
"#;
        let found = receiver_types(&[("src/page.ts", source)], "src/page.ts", "isXs");
        assert_eq!(found, vec![Some("Container".to_string()); 6]);
    }

    #[test]
    fn test_signal_queries_and_calls() {
        let source = r#"
import { viewChild, contentChild } from '@angular/core';
import { Container } from '@scope/lib';
export class Page {
  q = viewChild.required(Container);
  r = contentChild<Container>('ref');
  run() {
    return [this.q().isXs, this.r()?.isXs];
  }
}
"#;
        let found = receiver_types(&[("src/page.ts", source)], "src/page.ts", "isXs");
        assert_eq!(found, vec![Some("Container".to_string()); 2]);
    }

    #[test]
    fn test_member_chain_through_local_classes_and_extends() {
        let base = r#"
import { Container } from '@scope/lib';
export interface Holder { container: Container; }
export class Base { holder!: Holder; }
"#;
        let page = r#"
import { Base } from './base';
export class Page extends Base {
  run() { return this.holder.container.isXs; }
}
"#;
        let found = receiver_types(
            &[("src/base.ts", base), ("src/page.ts", page)],
            "src/page.ts",
            "isXs",
        );
        assert_eq!(found, vec![Some("Container".to_string())]);
    }

    #[test]
    fn test_reexported_alias_and_unknown_receivers() {
        let lib = "import { Container } from '@scope/lib';\nexport type Alias = Container;\n";
        let barrel = "export * from './lib';\n";
        let page = r#"
import { Alias } from './barrel';
declare const unknown: any;
function run(x: Alias, y: string) {
  return [x.isXs, unknown.isXs, y.isXs];
}
"#;
        let found = receiver_types(
            &[("src/lib.ts", lib), ("src/barrel.ts", barrel), ("src/page.ts", page)],
            "src/page.ts",
            "isXs",
        );
        assert_eq!(found, vec![Some("Container".to_string()), None, None]);
    }
}
