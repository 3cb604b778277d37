//! Fatal translation errors.
//!
//! Schema ambiguities, name collisions and tool-name overflow are handled in
//! place and never surface here; everything in this enum aborts the run
//! before any file is written.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("collaborator cycle detected: {}", .chain.join(" -> "))]
    CyclicCollaboration { chain: Vec<String> },

    #[error("unknown placeholder `${name}$` in {prompt} template")]
    UnknownPlaceholder { prompt: String, name: String },

    #[error("fixture `{fixture}` contains placeholder `${nested}$`")]
    NestedPlaceholder { fixture: String, nested: String },

    #[error("fixture file {}: {message}", .path.display())]
    FixtureFile { path: PathBuf, message: String },

    #[error("provisioning {what} failed")]
    Provisioning {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = TranslateError> = std::result::Result<T, E>;
