//! Reading catalogs from YAML or JSON documents.

use super::{Catalog, Instruction, ReplaceWith};
use crate::error::{MigrationError, Result, TreeError};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Guess the format from a file extension. Anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// Parse and validate one catalog document. `name` is used in errors.
pub fn parse_catalog(name: &str, text: &str, format: Format) -> Result<Catalog> {
    let catalog: Catalog = match format {
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| invalid(name, e))?,
        Format::Json => serde_json::from_str(text).map_err(|e| invalid(name, e))?,
    };
    validate(&catalog)?;
    debug!(catalog = %catalog.name, instructions = catalog.instructions.len(), "loaded catalog");
    Ok(catalog)
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = fs::read_to_string(path).map_err(|source| TreeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&path.display().to_string(), &text, Format::from_path(path))
}

fn invalid(name: &str, err: impl std::fmt::Display) -> MigrationError {
    MigrationError::Catalog { name: name.to_string(), message: err.to_string() }
}

/// Reject documents that parse but cannot mean anything useful.
pub fn validate(catalog: &Catalog) -> Result<()> {
    let fail = |index: usize, instruction: &Instruction, message: &str| {
        Err(invalid(
            &catalog.name,
            format!("instruction {} ({}): {}", index, instruction.kind(), message),
        ))
    };

    for (index, instruction) in catalog.instructions.iter().enumerate() {
        match instruction {
            Instruction::SymbolRename(rename) => {
                if rename.symbol_renamings.is_empty() {
                    return fail(index, instruction, "no symbolRenamings");
                }
                if rename.symbol_renamings.iter().any(|r| r.replace.is_empty() || r.replace_with.is_empty()) {
                    return fail(index, instruction, "empty symbol name");
                }
            }
            Instruction::ElementRename(rename) => {
                if rename.replace.is_empty() || rename.replace_with.is_empty() {
                    return fail(index, instruction, "empty element name");
                }
            }
            Instruction::AttributeRename(rename) => {
                if rename.replace.is_empty() || rename.replace_with.is_empty() {
                    return fail(index, instruction, "empty attribute name");
                }
            }
            Instruction::PropertyRename(rename) => {
                for mapping in &rename.property_mappings {
                    let empty = match &mapping.replace_with {
                        ReplaceWith::One(name) => name.is_empty(),
                        ReplaceWith::Many(names) => names.is_empty() || names.iter().any(String::is_empty),
                    };
                    if mapping.replace.is_empty() || empty {
                        return fail(index, instruction, "empty property mapping");
                    }
                }
            }
            Instruction::SymbolRemoval(removal) => {
                if removal.names.is_empty() {
                    return fail(index, instruction, "no names to remove");
                }
            }
            Instruction::ClassTokenRewrite(rewrite) => {
                if rewrite.required_classes.is_empty() {
                    return fail(index, instruction, "requiredClasses must not be empty");
                }
            }
            Instruction::PatternReplacement(replacement) => {
                if replacement.patterns.is_empty() {
                    return fail(index, instruction, "no patterns");
                }
            }
            Instruction::TypeBasedPropertyRewrite(rewrite) => {
                if rewrite.type_names.is_empty() || rewrite.property_replacements.is_empty() {
                    return fail(index, instruction, "typeNames and propertyReplacements are required");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
name: widgets
version: "2.0"
instructions:
  - kind: SymbolRename
    module: "pkg/old"
    toModule: "pkg/new"
    symbolRenamings:
      - { replace: OldWidget, replaceWith: NewWidget }
  - kind: ClassTokenRewrite
    requiredClasses: [btn, btn-circle, btn-xs]
    removeClasses: [btn-xs]
    addClasses: [btn-sm]
  - kind: PatternReplacement
    module: "pkg/modal"
    requiresSymbols: [ModalService]
    patterns:
      - pattern: '(\bshow\([^)]*,\s*\{[^}]*\b)(initialState)(\s*:)'
        replacement: '${1}inputValues${3}'
"#;

    #[test]
    fn test_parse_yaml_catalog() {
        let catalog = parse_catalog("widgets.yaml", YAML, Format::Yaml).unwrap();
        assert_eq!(catalog.name, "widgets");
        assert_eq!(catalog.version.as_deref(), Some("2.0"));
        assert_eq!(catalog.instructions.len(), 3);
        let Instruction::SymbolRename(rename) = &catalog.instructions[0] else {
            panic!("expected a symbol rename");
        };
        assert_eq!(rename.to_module.as_deref(), Some("pkg/new"));
        assert!(rename.barrel_modules.is_empty());
        let Instruction::ClassTokenRewrite(rewrite) = &catalog.instructions[1] else {
            panic!("expected a class rewrite");
        };
        assert!(rewrite.excluded_classes.is_empty());
    }

    #[test]
    fn test_unknown_kind_is_a_catalog_error() {
        let text = "name: broken\ninstructions:\n  - kind: Teleport\n";
        let err = parse_catalog("broken.yaml", text, Format::Yaml).unwrap_err();
        assert!(matches!(err, MigrationError::Catalog { ref name, .. } if name == "broken.yaml"));
    }

    #[test]
    fn test_validation_rejects_empty_requirements() {
        let text = r#"{"name": "c", "instructions": [
            {"kind": "ClassTokenRewrite", "requiredClasses": [], "addClasses": ["x"]}
        ]}"#;
        let err = parse_catalog("c.json", text, Format::Json).unwrap_err();
        assert!(err.to_string().contains("requiredClasses"));
    }

    #[test]
    fn test_load_catalog_from_disk_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"name": "attrs", "instructions": [
                {{"kind": "AttributeRename", "replace": "siOld", "replaceWith": "siNew"}}
            ]}}"#
        )
        .unwrap();

        assert_eq!(Format::from_path(&path), Format::Json);
        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.instructions[0].kind(), "AttributeRename");

        let missing = load_catalog(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, MigrationError::Tree(_)));
    }
}
