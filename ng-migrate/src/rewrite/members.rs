//! Property accesses rewritten by the static type of their receiver.

use super::Edits;
use crate::catalog::{PropertyReplacement, TypeBasedPropertyRewrite};
use crate::matchers::{imports_from, PropertyMatch, PropertyMatcher};
use crate::program::SourceFile;
use crate::semantic::TypeResolver;
use std::ops::Range;
use tracing::debug;

struct Found<'i> {
    access: PropertyMatch,
    replacement: &'i PropertyReplacement,
}

pub fn rewrite_members(
    file: &SourceFile,
    resolver: &TypeResolver<'_>,
    instructions: &[&TypeBasedPropertyRewrite],
) -> Edits {
    let mut found: Vec<Found<'_>> = Vec::new();
    for instruction in instructions {
        if !imports_from(file, &instruction.module) {
            continue;
        }
        let properties: Vec<&str> =
            instruction.property_replacements.iter().map(|r| r.property.as_str()).collect();
        let matcher = PropertyMatcher { resolver, type_names: &instruction.type_names, properties: &properties };
        for access in matcher.find(file) {
            if found.iter().any(|f| f.access.range == access.range) {
                continue;
            }
            let Some(replacement) = instruction.property_replacements.iter().find(|r| r.property == access.property)
            else {
                continue;
            };
            found.push(Found { access, replacement });
        }
    }
    if found.is_empty() {
        return Edits::new();
    }
    found.sort_by_key(|f| (f.access.range.start, std::cmp::Reverse(f.access.range.end)));
    debug!(path = %file.path, matches = found.len(), "rewriting typed property accesses");

    let mut edits = Edits::new();
    for index in outermost(&found, 0..file.text.len()) {
        let access = &found[index].access;
        edits.replace(access.range.start, access.range.len(), render(&file.text, &found, index));
    }
    edits
}

/// Matches inside `within` that no other match inside `within` contains.
fn outermost(found: &[Found<'_>], within: Range<usize>) -> Vec<usize> {
    let mut picked = Vec::new();
    let mut end = within.start;
    for (index, f) in found.iter().enumerate() {
        let range = &f.access.range;
        if range.start >= end && range.end <= within.end && *range != within {
            picked.push(index);
            end = range.end;
        }
    }
    picked
}

/// Replacement text for one match, with nested matches in its receiver
/// already rewritten.
fn render(text: &str, found: &[Found<'_>], index: usize) -> String {
    let receiver = found[index].access.receiver.clone();
    let mut expression = String::new();
    let mut cursor = receiver.start;
    for child in outermost(found, receiver.clone()) {
        let range = &found[child].access.range;
        expression.push_str(&text[cursor..range.start]);
        expression.push_str(&render(text, found, child));
        cursor = range.end;
    }
    expression.push_str(&text[cursor..receiver.end]);
    found[index].replacement.expand(&expression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Pattern;
    use crate::program::{host::CompilerHost, tsconfig, Program};
    use crate::tree::{OverlayTree, UpdateRecorder};

    fn breakpoints() -> TypeBasedPropertyRewrite {
        TypeBasedPropertyRewrite {
            module: Pattern::new(r"@(siemens|simpl)/element-ng(/resize-observer)?").unwrap(),
            type_names: vec!["SiResponsiveContainerDirective".into()],
            property_replacements: ["isXs", "isSm"]
                .iter()
                .map(|p| PropertyReplacement {
                    property: p.to_string(),
                    replacement: format!("${{expression}}.{}()", p[2..].to_lowercase()),
                })
                .collect(),
        }
    }

    fn run(source: &str) -> String {
        let tree = OverlayTree::from_files([("tsconfig.json", "{}"), ("src/page.ts", source)]);
        let host = CompilerHost::new(&tree);
        let config = tsconfig::load(&host, "tsconfig.json").unwrap();
        let program = Program::build(&host, &config).unwrap();
        let resolver = program.type_resolver();
        let file = program.file("src/page.ts").unwrap();
        let instruction = breakpoints();
        let mut recorder = UpdateRecorder::new("src/page.ts", source);
        rewrite_members(file, &resolver, &[&instruction]).record_into(&mut recorder);
        recorder.apply().unwrap()
    }

    #[test]
    fn test_rewrites_typed_accesses_only() {
        let source = r#"import { SiResponsiveContainerDirective } from '@simpl/element-ng/resize-observer';
class Other { isXs = true; }
export class Page {
  container!: SiResponsiveContainerDirective;
  other = new Other();
  run() {
    return this.container.isXs || this.other.isXs || this.container?.isSm;
  }
}
"#;
        let out = run(source);
        assert!(out.contains("return this.container.xs() || this.other.isXs || this.container.sm();"), "{}", out);
    }

    #[test]
    fn test_without_import_nothing_changes() {
        let source = r#"class SiResponsiveContainerDirective { isXs = false; }
export class Page {
  container = new SiResponsiveContainerDirective();
  run() { return this.container.isXs; }
}
"#;
        assert_eq!(run(source), source);
    }

    #[test]
    fn test_outermost_picks_top_level_matches() {
        let replacement = PropertyReplacement { property: "p".into(), replacement: "${expression}.p()".into() };
        let found: Vec<Found<'_>> = [(0..10, 0..8), (2..6, 2..4), (12..15, 12..13)]
            .into_iter()
            .map(|(range, receiver)| Found {
                access: PropertyMatch { range, receiver, property: "p".into(), type_name: "T".into() },
                replacement: &replacement,
            })
            .collect();
        assert_eq!(outermost(&found, 0..20), vec![0, 2]);
        assert_eq!(outermost(&found, 0..8), vec![1]);
    }
}
