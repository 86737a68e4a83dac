// roundtrip/src/round_trip.rs

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use splatbench_common::common_config::CONFIG;
use splatbench_common::{
    BenchError, CompressionFormat, CompressionStatistics, Device, HostProbe, IoContext, Measurement, Result,
    RoundTripPathInfo, StatsStore, SystemProbe,
};

use crate::backend::{CodecBackend, ExternalBackend};
use crate::clock::{Clock, SystemClock};
use crate::codec::{CodecAdapter, CodecOptions};

/// One asset under one format.
#[derive(Debug, Clone)]
pub struct RoundTripRequest {
    pub input: PathBuf,
    pub format: CompressionFormat,
    /// Defaults to `<input dir>/<stem>.<format>`.
    pub compressed: Option<PathBuf>,
    /// Defaults to `<input dir>/<stem>_decompressed_<format>.ply`.
    pub decompressed: Option<PathBuf>,
    pub overwrite: bool,
    pub device: Device,
    pub path_info: RoundTripPathInfo,
}

impl RoundTripRequest {
    pub fn new(input: impl Into<PathBuf>, format: CompressionFormat) -> Self {
        Self {
            input: input.into(),
            format,
            compressed: None,
            decompressed: None,
            overwrite: false,
            device: Device::default(),
            path_info: RoundTripPathInfo::default(),
        }
    }
}

/// Resolved file locations of a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripPaths {
    pub compressed: PathBuf,
    pub decompressed: PathBuf,
    pub stats: PathBuf,
}

impl RoundTripPaths {
    pub fn resolve(request: &RoundTripRequest) -> Self {
        let input = &request.input;
        let format = request.format;
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (decompressed, stats) = match &request.decompressed {
            None => (
                input.with_file_name(format!("{stem}_decompressed_{format}.{}", format.spec().input.extension())),
                input.with_file_name(&CONFIG.default_stats_file_name),
            ),
            Some(decompressed) => {
                let decompressed_stem = decompressed
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (
                    decompressed.clone(),
                    decompressed.with_file_name(format!("{decompressed_stem}_compression_statistics.json")),
                )
            }
        };

        let compressed = request
            .compressed
            .clone()
            .unwrap_or_else(|| input.with_extension(format.name()));

        Self {
            compressed,
            decompressed,
            stats,
        }
    }
}

/// Compresses then decompresses one asset and records the outcome in its stats file.
pub struct RoundTripEngine {
    codec: CodecAdapter,
    probe: Box<dyn HostProbe>,
    clock: Box<dyn Clock>,
}

impl RoundTripEngine {
    pub fn new(backend: Box<dyn CodecBackend>, probe: Box<dyn HostProbe>, clock: Box<dyn Clock>) -> Self {
        Self {
            codec: CodecAdapter::new(backend),
            probe,
            clock,
        }
    }

    /// Real tools, real host probe, wall clock.
    pub fn from_config() -> Self {
        Self::new(Box::new(ExternalBackend::from_config()), Box::new(SystemProbe::new()), Box::new(SystemClock))
    }

    pub fn codec(&self) -> &CodecAdapter {
        &self.codec
    }

    pub fn run(&self, request: &RoundTripRequest) -> Result<CompressionStatistics> {
        let paths = RoundTripPaths::resolve(request);
        let format = request.format;
        let options = CodecOptions {
            overwrite: request.overwrite,
            device: request.device,
        };

        ensure_parent(&paths.decompressed)?;
        ensure_parent(&paths.compressed)?;

        info!("[roundtrip] {} {}", format, request.input.display());
        // both timings run from the same start, so the decompression time includes compression
        let start = self.clock.now();
        self.codec.compress(format, &request.input, &paths.compressed, options)?;
        let compressed_at = self.clock.now();
        self.codec.decompress(format, &paths.compressed, &paths.decompressed, options)?;
        let decompressed_at = self.clock.now();

        let original_bytes = file_size(&request.input)?;
        let compressed_bytes = file_size(&paths.compressed)?;
        if compressed_bytes == 0 {
            return Err(BenchError::CodecInvocationFailed {
                format,
                input: request.input.clone(),
                output: paths.compressed.clone(),
                reason: "codec produced an empty artifact".into(),
            });
        }

        let statistics = CompressionStatistics::from_measurement(Measurement {
            format,
            original_bytes,
            compressed_bytes,
            compression_time_seconds: compressed_at.saturating_duration_since(start).as_secs_f64(),
            decompression_time_seconds: decompressed_at.saturating_duration_since(start).as_secs_f64(),
            input_file: request.input.clone(),
            compressed_file: paths.compressed.clone(),
            decompressed_file: paths.decompressed.clone(),
            cpu_name: self.probe.cpu_name(),
            gpu_name: self.probe.gpu_name(),
            path_info: request.path_info.clone(),
        });

        StatsStore::merge(&paths.stats, format, &statistics, request.overwrite)?;
        debug!(
            "[roundtrip] {} ratio {:.2} recorded in {}",
            format,
            statistics.compression_ratio,
            paths.stats.display()
        );
        Ok(statistics)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).with_path(parent),
        _ => Ok(()),
    }
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path).with_path(path)?.len())
}
