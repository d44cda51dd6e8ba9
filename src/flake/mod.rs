pub mod lock;
pub mod metadata;
pub mod resolve;

pub use lock::{InputRef, LockFile, LockNode, LockedRef};
pub use metadata::{DanglingInput, Edge, MetadataModel};
pub use resolve::{resolve, ResolveStrategy};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to read lock file {path}: {source}")]
    ReadLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lock data from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("lock data has no root node '{0}'")]
    MissingRoot(String),
    #[error("failed to run nix: {0}")]
    NixUnavailable(#[source] std::io::Error),
    #[error("nix flake metadata failed for {reference} ({status}): {stderr}")]
    NixCommand {
        reference: String,
        status: String,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, ResolutionError>;
