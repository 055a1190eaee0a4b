//! Template rewrites: element, attribute and property renames, attribute
//! removal and class token rewrites.

use super::Edits;
use crate::catalog::{
    AttributeRename, ClassTokenRewrite, ElementRename, Instruction, PropertyMapping, PropertyRename,
    ReplaceWith, SymbolRemoval,
};
use crate::markup::{strip_binding, Attribute, Element, Template};
use crate::matchers::{attributes_named, class_tokens, elements_named, imports_from};
use crate::program::SourceFile;
use std::ops::Range;

/// A parsed template and where its text starts in the file being edited.
/// Inline templates sit inside a component file; external ones start at 0.
pub struct TemplateSource<'a> {
    pub template: &'a Template,
    pub text: &'a str,
    pub offset: usize,
}

impl TemplateSource<'_> {
    fn replace(&self, edits: &mut Edits, range: &Range<usize>, text: impl Into<String>) {
        edits.replace(self.offset + range.start, range.len(), text);
    }
}

/// Whether a markup instruction applies to templates of `component`. Only
/// property renames and removals carry a module; the rest always apply.
pub fn applies_to_component(instruction: &Instruction, component: &SourceFile) -> bool {
    let module = match instruction {
        Instruction::PropertyRename(rename) => rename.module.as_ref(),
        Instruction::SymbolRemoval(removal) => removal.module.as_ref(),
        _ => None,
    };
    module.map_or(true, |module| imports_from(component, module))
}

/// Apply every markup instruction in `instructions` to one template.
pub fn rewrite_template(source: &TemplateSource<'_>, instructions: &[&Instruction]) -> Edits {
    let mut edits = Edits::new();
    let mut class_rewrites = Vec::new();
    for instruction in instructions {
        match instruction {
            Instruction::ElementRename(rename) => rename_elements(source, rename, &mut edits),
            Instruction::AttributeRename(rename) => rename_attributes(source, rename, &mut edits),
            Instruction::PropertyRename(rename) => rename_properties(source, rename, &mut edits),
            Instruction::SymbolRemoval(removal) => remove_attributes(source, removal, &mut edits),
            Instruction::ClassTokenRewrite(rewrite) => class_rewrites.push(rewrite),
            _ => {}
        }
    }
    if !class_rewrites.is_empty() {
        rewrite_classes(source, &class_rewrites, &mut edits);
    }
    edits
}

fn rename_elements(source: &TemplateSource<'_>, rename: &ElementRename, edits: &mut Edits) {
    for element in elements_named(source.template, &rename.replace) {
        let mut start_tag = rename.replace_with.clone();
        for default in &rename.default_attributes {
            if !element.has_attr(&default.name) {
                start_tag.push_str(&format!(" {}=\"{}\"", default.name, default.value));
            }
        }
        source.replace(edits, &element.name_span, start_tag);
        if let Some(end) = &element.end_name_span {
            source.replace(edits, end, rename.replace_with.as_str());
        }
    }
}

/// Range of the bare name inside a possibly bracketed attribute name.
fn bare_name_range(attr: &Attribute) -> Range<usize> {
    let bare = attr.bare_name();
    let prefix = (attr.name.len() - bare.len()) / 2;
    let start = attr.name_span.start + prefix;
    start..start + bare.len()
}

fn rename_attributes(source: &TemplateSource<'_>, rename: &AttributeRename, edits: &mut Edits) {
    for found in attributes_named(source.template, &rename.replace) {
        source.replace(edits, &bare_name_range(found.attr), rename.replace_with.as_str());
    }
}

fn mapping_matches(mapping: &PropertyMapping, attr: &Attribute) -> bool {
    if strip_binding(&mapping.replace) != mapping.replace {
        return attr.name == mapping.replace;
    }
    attr.bare_name() == mapping.replace && attr.name.len() - mapping.replace.len() <= 2
}

fn rename_properties(source: &TemplateSource<'_>, rename: &PropertyRename, edits: &mut Edits) {
    for element in elements_named(source.template, &rename.element_selector) {
        for attr in &element.attrs {
            let Some(mapping) = rename.property_mappings.iter().find(|m| mapping_matches(m, attr)) else {
                continue;
            };
            let explicit = strip_binding(&mapping.replace) != mapping.replace;
            match &mapping.replace_with {
                ReplaceWith::One(name) if explicit => source.replace(edits, &attr.name_span, name.as_str()),
                ReplaceWith::One(name) => source.replace(edits, &bare_name_range(attr), name.as_str()),
                ReplaceWith::Many(names) => {
                    source.replace(edits, &attr.span, fan_out(attr, names));
                }
            }
        }
    }
}

/// One attribute per name, each keeping the binding brackets and the value.
fn fan_out(attr: &Attribute, names: &[String]) -> String {
    let bare = attr.bare_name();
    let prefix_len = (attr.name.len() - bare.len()) / 2;
    let prefix = &attr.name[..prefix_len];
    let suffix = &attr.name[attr.name.len() - prefix_len..];
    names
        .iter()
        .map(|name| match &attr.value {
            Some(value) => {
                let quote = value.quote.unwrap_or('"');
                format!("{prefix}{name}{suffix}={quote}{}{quote}", value.text)
            }
            None => format!("{prefix}{name}{suffix}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn remove_attributes(source: &TemplateSource<'_>, removal: &SymbolRemoval, edits: &mut Edits) {
    let elements = elements_named(source.template, &removal.element_selector);
    for element in elements {
        if let Some(required) = &removal.attribute_selector {
            if !element.attrs.iter().any(|a| a.bare_name() == required) {
                continue;
            }
        }
        for attr in element.attrs.iter().filter(|a| removal.names.iter().any(|n| n == a.bare_name())) {
            let start = leading_whitespace_start(source.text, element, attr);
            edits.remove(source.offset + start, attr.span.end - start);
        }
    }
}

/// Start of the whitespace run before `attr`, not reaching back past the tag
/// name.
fn leading_whitespace_start(text: &str, element: &Element, attr: &Attribute) -> usize {
    let floor = element.name_span.end;
    let before = &text[floor..attr.span.start];
    floor + before.trim_end().len()
}

fn rewrite_classes(source: &TemplateSource<'_>, rewrites: &[&ClassTokenRewrite], edits: &mut Edits) {
    for element in source.template.find_elements(|e| e.has_attr("class")) {
        let Some((attr, tokens)) = class_tokens(element) else {
            continue;
        };
        let mut removed: Vec<&str> = Vec::new();
        let mut added: Vec<&str> = Vec::new();
        for rewrite in rewrites.iter().filter(|r| r.applies_to(&tokens)) {
            removed.extend(rewrite.remove_classes.iter().map(String::as_str));
            for class in &rewrite.add_classes {
                if !added.contains(&class.as_str()) {
                    added.push(class.as_str());
                }
            }
        }
        if removed.is_empty() && added.is_empty() {
            continue;
        }

        let mut result: Vec<&str> = tokens.iter().copied().filter(|t| !removed.contains(t)).collect();
        for class in added {
            if !result.contains(&class) {
                result.push(class);
            }
        }
        let rewritten = result.join(" ");
        if rewritten != tokens.join(" ") {
            if let Some(value) = &attr.value {
                source.replace(edits, &value.span, rewritten);
            }
        }
    }
}
