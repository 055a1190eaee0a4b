//! Finding the templates of `@Component` classes.

use crate::program::SourceFile;
use crate::tree::{dirname, join};
use swc_ecma_ast::{Callee, Decorator, Expr, Lit, Prop, PropName, PropOrSpread};
use swc_ecma_visit::{Visit, VisitWith};

/// A `template:` literal. `offset` is the file offset of the first byte
/// after the opening quote, so template spans plus `offset` are file spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineTemplate {
    pub offset: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentTemplates {
    pub inline: Vec<InlineTemplate>,
    /// `templateUrl:` values resolved against the component's directory.
    pub external: Vec<String>,
}

impl ComponentTemplates {
    pub fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.external.is_empty()
    }
}

pub fn locate_templates(file: &SourceFile) -> ComponentTemplates {
    let mut locator = Locator { file, found: ComponentTemplates::default() };
    file.module.visit_with(&mut locator);
    locator.found
}

struct Locator<'f> {
    file: &'f SourceFile,
    found: ComponentTemplates,
}

fn key_name<'a>(file: &'a SourceFile, key: &'a PropName) -> Option<&'a str> {
    match key {
        PropName::Ident(ident) => Some(&*ident.sym),
        PropName::Str(s) => Some(file.literal_value(s)),
        _ => None,
    }
}

impl Locator<'_> {
    fn component_metadata(&mut self, props: &[PropOrSpread]) {
        for prop in props {
            let PropOrSpread::Prop(prop) = prop else {
                continue;
            };
            let Prop::KeyValue(kv) = &**prop else {
                continue;
            };
            match (key_name(self.file, &kv.key), &*kv.value) {
                (Some("template"), Expr::Lit(Lit::Str(s))) => self.inline(s.span),
                (Some("template"), Expr::Tpl(tpl)) if tpl.exprs.is_empty() => self.inline(tpl.span),
                (Some("templateUrl"), Expr::Lit(Lit::Str(s))) => {
                    let url = self.file.literal_value(s);
                    self.found.external.push(join(dirname(&self.file.path), url));
                }
                _ => {}
            }
        }
    }

    fn inline(&mut self, span: swc_common::Span) {
        let range = self.file.range(span);
        if range.len() < 2 {
            return;
        }
        let offset = range.start + 1;
        let text = self.file.text[offset..range.end - 1].to_string();
        self.found.inline.push(InlineTemplate { offset, text });
    }
}

impl Visit for Locator<'_> {
    fn visit_decorator(&mut self, decorator: &Decorator) {
        if let Expr::Call(call) = &*decorator.expr {
            if let Callee::Expr(callee) = &call.callee {
                if matches!(&**callee, Expr::Ident(ident) if &*ident.sym == "Component") {
                    if let Some(Expr::Object(object)) = call.args.first().map(|a| &*a.expr) {
                        self.component_metadata(&object.props);
                    }
                    return;
                }
            }
        }
        decorator.visit_children_with(self);
    }
}
