// splatbench-common/src/error.rs

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::format::{CompressionFormat, FileFormat};

/// Which side of a codec call a path is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Input,
    Output,
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::Input => f.write_str("input"),
            FileRole::Output => f.write_str("output"),
        }
    }
}

/// Failures of a single (asset, format) unit of work.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("input and output file names must be different: {name}")]
    NameCollision { name: String },

    #[error("{role} file {} must have extension .{expected}", .path.display())]
    FormatMismatch {
        path: PathBuf,
        role: FileRole,
        expected: FileFormat,
    },

    #[error("output file already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("input file does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("{format} codec failed for {} -> {}: {reason}", .input.display(), .output.display())]
    CodecInvocationFailed {
        format: CompressionFormat,
        input: PathBuf,
        output: PathBuf,
        reason: String,
    },

    #[error("corrupted stats file {}: {source}", .path.display())]
    CorruptStatsFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid statistic for key '{key}' in {}", .path.display())]
    InvalidStatsEntry { path: PathBuf, key: String },

    #[error("source must be a .tar file or a directory: {}", .0.display())]
    UnsupportedSource(PathBuf),

    /// Working file of a chunked-format call is on disk, left by an interrupted run.
    #[error("interrupted run left {} behind; restore or remove it before retrying", .0.display())]
    StaleIntermediate(PathBuf),

    #[error("no conversion from .{from} to .{to}")]
    UnsupportedConversion { from: FileFormat, to: FileFormat },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BenchError>;

impl BenchError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        BenchError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Attach the offending path to an `io::Result`.
pub trait IoContext<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| BenchError::io(path, e))
    }
}
