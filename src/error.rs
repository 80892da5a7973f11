//! Error types shared across the crate.
//!
//! Every adapter either returns a complete, validated chapter list or fails
//! with one of these variants; partial results are never returned.

use std::path::PathBuf;
use thiserror::Error;

use crate::assembly::Stage;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed source input to an adapter, with the offending record.
    #[error("parse error: {0}")]
    Parse(String),

    /// A CUE sheet track is missing a required field or carries an
    /// out-of-range timecode.
    #[error("malformed cue sheet: {0}")]
    MalformedCue(String),

    /// An adapter produced a non-monotonic chapter sequence. Never repaired
    /// silently; indicates an adapter bug or a corrupt source.
    #[error("chapter ordering violation at chapter {index}: {detail}")]
    Ordering { index: u32, detail: String },

    /// The duration probe could not measure a file.
    #[error("duration probe failed for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// The remote catalog could not be reached or returned garbage.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// An external tool invocation failed. The assembly pipeline aborts and
    /// earlier stage outputs are preserved for inspection.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// A command could not be spawned or exited non-zero.
    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
