// splatbench-common/src/stats.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::CompressionFormat;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Location of a file inside a corpus root or an output archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    pub root: String,
    pub relative: String,
}

impl PathInfo {
    pub fn new(root: &Path, relative: &Path) -> Self {
        Self {
            root: absolute(root).to_string_lossy().into_owned(),
            relative: relative.to_string_lossy().into_owned(),
        }
    }
}

/// Where the three files of a round trip live relative to their corpus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoundTripPathInfo {
    pub input: Option<PathInfo>,
    pub compressed: Option<PathInfo>,
    pub decompressed: Option<PathInfo>,
}

/// Result of one compress/decompress round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionStatistics {
    pub original_size_mb: f64,
    pub compressed_size_mb: f64,
    pub compression_ratio: f64,
    pub compression_time_seconds: f64,
    pub decompression_time_seconds: f64,
    pub compression_format: CompressionFormat,
    pub input_file: PathBuf,
    pub compressed_file: PathBuf,
    pub decompressed_file: PathBuf,
    pub cpu_name: String,
    pub gpu_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path_info: Option<PathInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_path_info: Option<PathInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decompressed_path_info: Option<PathInfo>,
}

/// Raw measurements a `CompressionStatistics` is derived from.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub format: CompressionFormat,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub compression_time_seconds: f64,
    pub decompression_time_seconds: f64,
    pub input_file: PathBuf,
    pub compressed_file: PathBuf,
    pub decompressed_file: PathBuf,
    pub cpu_name: String,
    pub gpu_name: String,
    pub path_info: RoundTripPathInfo,
}

impl CompressionStatistics {
    /// The ratio comes from the byte counts, never from the rounded megabyte figures.
    /// `compressed_bytes` must be non-zero.
    pub fn from_measurement(m: Measurement) -> Self {
        Self {
            original_size_mb: m.original_bytes as f64 / BYTES_PER_MB,
            compressed_size_mb: m.compressed_bytes as f64 / BYTES_PER_MB,
            compression_ratio: m.original_bytes as f64 / m.compressed_bytes as f64,
            compression_time_seconds: m.compression_time_seconds,
            decompression_time_seconds: m.decompression_time_seconds,
            compression_format: m.format,
            input_file: absolute(&m.input_file),
            compressed_file: absolute(&m.compressed_file),
            decompressed_file: absolute(&m.decompressed_file),
            cpu_name: m.cpu_name,
            gpu_name: m.gpu_name,
            input_path_info: m.path_info.input,
            compressed_path_info: m.path_info.compressed,
            decompressed_path_info: m.path_info.decompressed,
        }
    }
}

impl fmt::Display for CompressionStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Original size: {:.2} MB", self.original_size_mb)?;
        writeln!(f, "Compressed size: {:.2} MB", self.compressed_size_mb)?;
        writeln!(f, "Compression ratio: {:.2}", self.compression_ratio)?;
        writeln!(f, "Compression time: {:.2} seconds", self.compression_time_seconds)?;
        writeln!(f, "Decompression time: {:.2} seconds", self.decompression_time_seconds)?;
        writeln!(f, "Compression format: {}", self.compression_format)?;
        writeln!(f, "Input file: {}", self.input_file.display())?;
        writeln!(f, "Compressed file: {}", self.compressed_file.display())?;
        writeln!(f, "Decompressed file: {}", self.decompressed_file.display())?;
        writeln!(f, "CPU name: {}", self.cpu_name)?;
        write!(f, "GPU name: {}", self.gpu_name)
    }
}

/// All statistics known for one asset, one entry per format.
pub type StatsRecord = BTreeMap<CompressionFormat, CompressionStatistics>;

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
