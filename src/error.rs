use thiserror::Error;

use crate::config::ConfigError;
use crate::flake::ResolutionError;
use crate::graph::RenderError;
use crate::lookup::LookupError;

#[derive(Debug, Error)]
pub enum FlakedotError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("version lookup error: {0}")]
    Lookup(#[from] LookupError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FlakedotError>;
