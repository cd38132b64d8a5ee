use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced at the crate's fallible boundaries.
///
/// Drawing itself never fails: out-of-range coordinates, degenerate shapes and
/// idempotent fills are silent no-ops that return an empty edit list.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("pixel buffer has {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("canvas dimensions {width}x{height} are invalid")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid color {0:?}: expected \"transparent\", #rrggbb or #rrggbbaa")]
    InvalidColor(String),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("edit packet encoding failed: {0}")]
    Packet(#[from] bincode::Error),

    #[error("invalid edit packet: {0}")]
    InvalidPacket(String),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
