//! Property accesses whose receiver has one of a set of static types.

use crate::program::SourceFile;
use crate::semantic::TypeResolver;
use std::ops::Range;
use swc_common::Spanned;
use swc_ecma_ast::{MemberExpr, MemberProp};
use swc_ecma_visit::{Visit, VisitWith};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMatch {
    /// The whole access, receiver through property name.
    pub range: Range<usize>,
    pub receiver: Range<usize>,
    pub property: String,
    pub type_name: String,
}

impl PropertyMatch {
    pub fn contains(&self, other: &PropertyMatch) -> bool {
        self.range.start <= other.range.start
            && other.range.end <= self.range.end
            && self.range != other.range
    }
}

pub struct PropertyMatcher<'a, 'p> {
    pub resolver: &'a TypeResolver<'p>,
    pub type_names: &'a [String],
    pub properties: &'a [&'a str],
}

impl PropertyMatcher<'_, '_> {
    /// Every matching access in `file`, in source order. Matches nested
    /// inside another match's receiver are reported too.
    pub fn find(&self, file: &SourceFile) -> Vec<PropertyMatch> {
        let mut visitor = AccessVisitor { matcher: self, file, found: Vec::new() };
        file.module.visit_with(&mut visitor);
        visitor.found.sort_by_key(|m| (m.range.start, std::cmp::Reverse(m.range.end)));
        visitor.found
    }
}

struct AccessVisitor<'m, 'a, 'p> {
    matcher: &'m PropertyMatcher<'a, 'p>,
    file: &'m SourceFile,
    found: Vec<PropertyMatch>,
}

impl Visit for AccessVisitor<'_, '_, '_> {
    fn visit_member_expr(&mut self, member: &MemberExpr) {
        if let MemberProp::Ident(prop) = &member.prop {
            let property = &*prop.sym;
            if self.matcher.properties.contains(&property) {
                let ty = self.matcher.resolver.type_of_expr(&self.file.path, &member.obj);
                if let Some(ty) = ty.filter(|t| self.matcher.type_names.contains(&t.name)) {
                    self.found.push(PropertyMatch {
                        range: self.file.offset(member.span.lo)..self.file.offset(prop.span.hi),
                        receiver: self.file.range(member.obj.span()),
                        property: property.to_string(),
                        type_name: ty.name,
                    });
                }
            }
        }
        member.visit_children_with(self);
    }
}
