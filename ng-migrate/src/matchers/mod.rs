//! Locating rewrite targets.
//!
//! Matchers only report spans; turning a match into edits is the job of
//! [`crate::rewrite`].

pub mod elements;
pub mod identifiers;
pub mod imports;
pub mod properties;
pub mod templates;

pub use elements::{attributes_named, class_tokens, elements_named, AttributeMatch};
pub use identifiers::references_to;
pub use imports::{imports_from, imports_symbols};
pub use properties::{PropertyMatch, PropertyMatcher};
pub use templates::{locate_templates, ComponentTemplates, InlineTemplate};
