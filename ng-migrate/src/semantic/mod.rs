//! Read-only symbol and type information shared by every unit of a program.

pub mod imports;
pub mod scope;
pub mod types;

pub use imports::{ImportEntry, ImportTable, ImportedSymbol, NamedImport};
pub use scope::{Binding, BindingKind, ScopeTree};
pub use types::{ResolvedType, TypeResolver};
