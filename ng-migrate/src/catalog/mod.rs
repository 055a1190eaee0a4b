//! Instruction catalogs: what a migration rewrites.
//!
//! Catalogs are plain data. They deserialize from YAML or JSON (see
//! [`load`]) and the built-in ones are assembled on demand by
//! [`builtin`], so every run gets its own immutable copy.

pub mod builtin;
pub mod load;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A regular expression that serializes as its source string.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl Deref for Pattern {
    type Target = Regex;

    fn deref(&self) -> &Regex {
        &self.0
    }
}

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Pattern::new(&source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> String {
        pattern.0.as_str().to_string()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.0.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

/// `replaceWith` is either one name or a fan-out list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplaceWith {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for ReplaceWith {
    fn from(name: &str) -> Self {
        ReplaceWith::One(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rename {
    pub replace: String,
    pub replace_with: String,
}

impl Rename {
    pub fn new(replace: &str, replace_with: &str) -> Self {
        Self { replace: replace.to_string(), replace_with: replace_with.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Instruction {
    SymbolRename(SymbolRename),
    ElementRename(ElementRename),
    AttributeRename(AttributeRename),
    PropertyRename(PropertyRename),
    SymbolRemoval(SymbolRemoval),
    ClassTokenRewrite(ClassTokenRewrite),
    PatternReplacement(PatternReplacement),
    TypeBasedPropertyRewrite(TypeBasedPropertyRewrite),
}

impl Instruction {
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::SymbolRename(_) => "SymbolRename",
            Instruction::ElementRename(_) => "ElementRename",
            Instruction::AttributeRename(_) => "AttributeRename",
            Instruction::PropertyRename(_) => "PropertyRename",
            Instruction::SymbolRemoval(_) => "SymbolRemoval",
            Instruction::ClassTokenRewrite(_) => "ClassTokenRewrite",
            Instruction::PatternReplacement(_) => "PatternReplacement",
            Instruction::TypeBasedPropertyRewrite(_) => "TypeBasedPropertyRewrite",
        }
    }

    /// True for instructions that edit template markup rather than source.
    pub fn is_markup(&self) -> bool {
        matches!(
            self,
            Instruction::ElementRename(_)
                | Instruction::AttributeRename(_)
                | Instruction::PropertyRename(_)
                | Instruction::SymbolRemoval(_)
                | Instruction::ClassTokenRewrite(_)
        )
    }
}

/// Renames exported symbols, optionally moving them to another module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRename {
    pub module: Pattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_module: Option<String>,
    /// Entry points that re-export everything; imports from them never move.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub barrel_modules: Vec<String>,
    pub symbol_renamings: Vec<Rename>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRename {
    pub replace: String,
    pub replace_with: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_attributes: Vec<DefaultAttribute>,
}

/// Renames an attribute (usually a directive selector) on any element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRename {
    pub replace: String,
    pub replace_with: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMapping {
    pub replace: String,
    pub replace_with: ReplaceWith,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRename {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<Pattern>,
    pub element_selector: String,
    pub property_mappings: Vec<PropertyMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRemoval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<Pattern>,
    pub element_selector: String,
    /// Only elements that also carry this attribute are touched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_selector: Option<String>,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTokenRewrite {
    pub required_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_classes: Vec<String>,
    #[serde(default)]
    pub remove_classes: Vec<String>,
    #[serde(default)]
    pub add_classes: Vec<String>,
}

impl ClassTokenRewrite {
    /// Whether this rewrite applies to an element with `classes`.
    pub fn applies_to(&self, classes: &[&str]) -> bool {
        self.required_classes.iter().all(|c| classes.contains(&c.as_str()))
            && !self.excluded_classes.iter().any(|c| classes.contains(&c.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: Pattern,
    /// Uses `${1}`-style group references.
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReplacement {
    pub module: Pattern,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_symbols: Vec<String>,
    pub patterns: Vec<PatternRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyReplacement {
    pub property: String,
    /// `${expression}` expands to the receiver text, `${property}` to the
    /// property name.
    pub replacement: String,
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(expression|property)\}").expect("placeholder regex is valid")
});

impl PropertyReplacement {
    /// Placeholders are expanded in one pass; substituted text is never
    /// expanded again.
    pub fn expand(&self, expression: &str) -> String {
        PLACEHOLDER
            .replace_all(&self.replacement, |caps: &Captures<'_>| match &caps[1] {
                "expression" => expression.to_string(),
                _ => self.property.clone(),
            })
            .into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBasedPropertyRewrite {
    pub module: Pattern,
    pub type_names: Vec<String>,
    pub property_replacements: Vec<PropertyReplacement>,
}

/// One pass of a migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub instructions: Vec<Instruction>,
}

impl Catalog {
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self { name: name.into(), version: None, instructions }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn has_markup(&self) -> bool {
        self.instructions.iter().any(Instruction::is_markup)
    }
}

/// Catalogs run in order; each one sees the edits of the previous ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Migration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub catalogs: Vec<Catalog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_rewrite_predicate() {
        let rewrite = ClassTokenRewrite {
            required_classes: vec!["btn".into(), "btn-circle".into()],
            excluded_classes: vec!["btn-lg".into()],
            remove_classes: vec![],
            add_classes: vec!["btn-lg".into()],
        };
        assert!(rewrite.applies_to(&["btn", "btn-circle", "btn-primary"]));
        assert!(!rewrite.applies_to(&["btn"]));
        assert!(!rewrite.applies_to(&["btn", "btn-circle", "btn-lg"]));
    }

    #[test]
    fn test_property_replacement_expansion() {
        let replacement = PropertyReplacement {
            property: "isXs".into(),
            replacement: "${expression}.xs() /* ${property} */".into(),
        };
        assert_eq!(replacement.expand("this.container"), "this.container.xs() /* isXs */");
    }

    #[test]
    fn test_expanded_receiver_is_not_expanded_again() {
        let replacement = PropertyReplacement {
            property: "isSm".into(),
            replacement: "${expression}.sm()".into(),
        };
        assert_eq!(
            replacement.expand("this.items[`${property}`]"),
            "this.items[`${property}`].sm()"
        );
    }

    #[test]
    fn test_instruction_round_trips_through_json() {
        let json = r#"{
            "kind": "PropertyRename",
            "elementSelector": "x-widget",
            "propertyMappings": [
                { "replace": "readonly", "replaceWith": "disabled" },
                { "replace": "size", "replaceWith": ["width", "height"] }
            ]
        }"#;
        let instruction: Instruction = serde_json::from_str(json).unwrap();
        let Instruction::PropertyRename(rename) = &instruction else {
            panic!("expected a property rename, got {:?}", instruction);
        };
        assert_eq!(rename.module, None);
        assert_eq!(rename.property_mappings[0].replace_with, ReplaceWith::from("disabled"));
        assert_eq!(
            rename.property_mappings[1].replace_with,
            ReplaceWith::Many(vec!["width".into(), "height".into()])
        );

        let back = serde_json::to_value(&instruction).unwrap();
        assert_eq!(back["kind"], "PropertyRename");
        assert!(back.get("module").is_none());
    }

    #[test]
    fn test_pattern_rejects_invalid_regex() {
        let result: Result<Pattern, _> = serde_json::from_str(r#""(unclosed""#);
        assert!(result.is_err());
        let ok: Pattern = serde_json::from_str(r#""@scope/lib(/modal)?""#).unwrap();
        assert!(ok.is_match("@scope/lib/modal"));
    }
}
