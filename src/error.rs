//! Error types for termdraw.
//!
//! - `DecodeError`: an image file could not be read or decoded
//! - `BackendError`: the terminal backend failed or refused to initialize
//! - `SpecError`: an animation was built with an unusable glyph or interval
//! - `ConfigError`: the configuration file could not be read or parsed
//! - `EngineError`: everything the engine facade can report

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
#[error("Failed to decode image {}: {source}", path.display())]
pub struct DecodeError {
    pub path: PathBuf,
    #[source]
    pub source: image::ImageError,
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize terminal: {0}")]
    Init(#[source] io::Error),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Terminal is not initialized")]
    NotInitialized,

    #[error("Input source is closed")]
    InputClosed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("Glyph {0:?} does not occupy exactly one terminal column")]
    InvalidGlyph(char),

    #[error("Frame interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Engine is not running")]
    NotRunning,

    #[error("Engine is already running")]
    AlreadyRunning,

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Terminal backend was lost by an earlier failed run")]
    BackendLost,
}

pub type Result<T> = std::result::Result<T, EngineError>;
