use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to a [`crate::tree::Tree`].
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// No usable project configuration, or a configuration that cannot be read.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("could not find any tsconfig file, cannot run the migration")]
    NotFound,

    #[error("tsconfig {0} does not exist")]
    Missing(String),

    #[error("error parsing {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("circular 'extends' chain through {0}")]
    CircularExtends(String),
}

/// Two recorded edits contend for the same bytes of one file.
#[derive(Debug, Error)]
#[error("overlapping edits in {path}: {first} and {second}")]
pub struct OverlapError {
    pub path: String,
    pub first: String,
    pub second: String,
}

/// A template failed to parse; only that template is skipped.
#[derive(Debug, Clone, Error)]
#[error("{message} at offset {offset}")]
pub struct MarkupParseError {
    pub message: String,
    pub offset: usize,
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Overlap(#[from] OverlapError),

    #[error("edit offset {offset} is outside {path} or not on a character boundary")]
    InvalidOffset { path: String, offset: usize },

    #[error("{path} changed after its edits were recorded")]
    StaleSnapshot { path: String },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("invalid catalog {name}: {message}")]
    Catalog { name: String, message: String },

    #[error("failed to parse template in {path}: {source}")]
    MarkupParse {
        path: String,
        #[source]
        source: MarkupParseError,
    },

    #[error("failed to parse {path}: {message}")]
    SourceParse { path: String, message: String },
}

impl MigrationError {
    /// Local errors are logged and skipped; everything else aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MigrationError::MarkupParse { .. } | MigrationError::SourceParse { .. }
        )
    }
}

pub type Result<T, E = MigrationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_errors_are_not_fatal() {
        let markup = MigrationError::MarkupParse {
            path: "a.html".into(),
            source: MarkupParseError { message: "unexpected closing tag".into(), offset: 3 },
        };
        let source = MigrationError::SourceParse { path: "a.ts".into(), message: "eof".into() };
        assert!(!markup.is_fatal());
        assert!(!source.is_fatal());
        assert!(MigrationError::from(ConfigurationError::NotFound).is_fatal());
    }

    #[test]
    fn test_overlap_message_names_file() {
        let err = MigrationError::from(OverlapError {
            path: "src/app.ts".into(),
            first: "remove 3..7".into(),
            second: "remove 5..9".into(),
        });
        assert!(err.to_string().contains("src/app.ts"));
    }
}
