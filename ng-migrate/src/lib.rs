pub mod catalog;
pub mod diff;
pub mod error;
pub mod markup;
pub mod matchers;
pub mod migrate;
pub mod program;
pub mod rewrite;
pub mod semantic;
pub mod state;
pub mod tree;


pub use catalog::{Catalog, Instruction, Migration};
pub use error::{MigrationError, Result};
pub use migrate::{run_migrations, MigrationReport, Migrator};
pub use program::ProjectOptions;
pub use tree::{OverlayTree, Tree, UpdateRecorder};
