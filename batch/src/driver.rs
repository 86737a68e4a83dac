// batch/src/driver.rs

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use roundtrip::{RoundTripEngine, RoundTripPaths, RoundTripRequest};
use splatbench_common::common_config::CONFIG;
use splatbench_common::{
    should_skip_unit, BenchError, CompressionFormat, Device, IoContext, PathInfo, Result, RoundTripPathInfo,
    StatsStore,
};

use crate::stager::{discover_assets, package, ArchiveFailure, IterationFilter, StagedTree, Stager};

/// Everything a batch run needs to know.
#[derive(Debug, Clone)]
pub struct BenchmarkRequest {
    /// Directory or `.tar` file. For streaming runs, a directory of tars.
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub formats: Vec<CompressionFormat>,
    pub iteration_filter: IterationFilter,
    pub overwrite: bool,
    pub device: Device,
    pub keep_extracted: bool,
}

/// An (asset, format) pair that did not make it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    pub asset: PathBuf,
    pub format: CompressionFormat,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub assets: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failures: Vec<UnitFailure>,
    /// Archives written by the run.
    pub archives: Vec<PathBuf>,
    /// Scene tars of a streaming run that could not be extracted or repacked.
    pub failed_archives: Vec<ArchiveFailure>,
}

/// Where a scene's files come from and where they are headed, for the stats path info.
struct Roots<'a> {
    staging: &'a Path,
    input: &'a Path,
    output: &'a Path,
}

pub struct BatchDriver {
    engine: RoundTripEngine,
}

impl BatchDriver {
    pub fn new(engine: RoundTripEngine) -> Self {
        Self { engine }
    }

    pub fn from_config() -> Self {
        Self::new(RoundTripEngine::from_config())
    }

    /// Stage the whole corpus, round-trip every asset, pack the staging tree into
    /// `output_dir/<corpus>.tar`.
    ///
    /// Only staging and packaging errors end the run; per-unit failures land in the report.
    pub fn run(&self, request: &BenchmarkRequest) -> Result<BatchReport> {
        if !request.source.exists() {
            return Err(BenchError::SourceMissing(request.source.clone()));
        }
        fs::create_dir_all(&request.output_dir).with_path(&request.output_dir)?;

        let stager = Stager::new(&request.output_dir, request.overwrite);
        let staging = stager.stage(&request.source)?;
        let staging_name = staging
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let final_tar = request.output_dir.join(format!("{staging_name}.tar"));

        let mut report = BatchReport::default();
        let roots = Roots {
            staging: &staging,
            input: &request.source,
            output: &final_tar,
        };
        self.process_tree(request, &roots, &mut report);

        info!("Creating final archive {}", final_tar.display());
        package(&staging, &final_tar)?;
        report.archives.push(final_tar);

        if !request.keep_extracted {
            info!("Removing staging directory {}", staging.display());
            fs::remove_dir_all(&staging).with_path(&staging)?;
        }

        log_summary(&report);
        Ok(report)
    }

    /// Nested corpus, one scene tar at a time. Only one scene is on disk at any moment.
    pub fn run_streaming(&self, request: &BenchmarkRequest) -> Result<BatchReport> {
        if !request.source.exists() {
            return Err(BenchError::SourceMissing(request.source.clone()));
        }
        fs::create_dir_all(&request.output_dir).with_path(&request.output_dir)?;

        let stager = Stager::new(&request.output_dir, request.overwrite);
        let mut report = BatchReport::default();
        let outcome = stager.stream_nested(&request.source, |tree: StagedTree<'_>| {
            let roots = Roots {
                staging: tree.root,
                input: tree.origin,
                output: tree.destination,
            };
            self.process_tree(request, &roots, &mut report);
            Ok(())
        })?;
        report.archives = outcome.written;
        report.failed_archives = outcome.failed;

        log_summary(&report);
        Ok(report)
    }

    fn process_tree(&self, request: &BenchmarkRequest, roots: &Roots<'_>, report: &mut BatchReport) {
        let assets = discover_assets(roots.staging, &CONFIG.asset_file_name, &request.iteration_filter);
        if !request.iteration_filter.is_empty() {
            info!(
                "Iteration filter {:?} kept {} scenes in {}",
                request.iteration_filter.patterns(),
                assets.len(),
                roots.staging.display()
            );
        }

        if assets.is_empty() {
            warn!("No {} files found in {}", CONFIG.asset_file_name, roots.staging.display());
            return;
        }
        report.assets += assets.len();

        let pb = ProgressBar::new(assets.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("[{bar:40.green/blue}] {pos}/{len} scenes ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏"),
        );
        pb.set_message("Processing scenes");
        for asset in &assets {
            self.process_scene(asset, request, roots, report);
            pb.inc(1);
        }
        pb.finish_with_message("Scenes processed");
    }

    /// Every requested format for one asset. Outputs go to `compressed/` and `decompressed/`
    /// beside the asset, statistics to the scene's stats file.
    fn process_scene(&self, asset: &Path, request: &BenchmarkRequest, roots: &Roots<'_>, report: &mut BatchReport) {
        let scene_dir = asset.parent().unwrap_or(roots.staging);
        let stats_file = CONFIG.scene_stats_path(scene_dir);
        let compressed_dir = scene_dir.join(&CONFIG.compressed_dir_name);
        let decompressed_dir = scene_dir.join(&CONFIG.decompressed_dir_name);
        let stem = asset
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        for &format in &request.formats {
            let compressed = compressed_dir.join(format!("{stem}.{format}"));
            let decompressed = decompressed_dir.join(format!("{stem}_{format}.{}", format.spec().input.extension()));

            if should_skip_unit(&compressed, request.overwrite) {
                info!("Skipping existing {}", compressed.display());
                report.skipped += 1;
                continue;
            }

            match self.round_trip(asset, format, &compressed, &decompressed, &stats_file, request, roots) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    error!("Failed to process format {} for {}: {}", format, asset.display(), e);
                    report.failures.push(UnitFailure {
                        asset: asset.to_path_buf(),
                        format,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn round_trip(
        &self,
        asset: &Path,
        format: CompressionFormat,
        compressed: &Path,
        decompressed: &Path,
        stats_file: &Path,
        request: &BenchmarkRequest,
        roots: &Roots<'_>,
    ) -> Result<()> {
        let relative = |p: &Path| p.strip_prefix(roots.staging).unwrap_or(p).to_path_buf();
        let round_trip = RoundTripRequest {
            input: asset.to_path_buf(),
            format,
            compressed: Some(compressed.to_path_buf()),
            decompressed: Some(decompressed.to_path_buf()),
            overwrite: request.overwrite,
            device: request.device,
            path_info: RoundTripPathInfo {
                input: Some(PathInfo::new(roots.input, &relative(asset))),
                compressed: Some(PathInfo::new(roots.output, &relative(compressed))),
                decompressed: Some(PathInfo::new(roots.output, &relative(decompressed))),
            },
        };
        let transient = RoundTripPaths::resolve(&round_trip).stats;
        self.engine.run(&round_trip)?;

        // the engine writes next to the decompressed file; fold that into the scene file
        if transient.exists() {
            StatsStore::absorb(stats_file, &transient, request.overwrite)?;
        }
        Ok(())
    }
}

fn log_summary(report: &BatchReport) {
    info!(
        "{} assets: {} round trips done, {} skipped, {} failed",
        report.assets,
        report.succeeded,
        report.skipped,
        report.failures.len()
    );
    for failure in &report.failures {
        warn!("  {} [{}]: {}", failure.asset.display(), failure.format, failure.message);
    }
    for failure in &report.failed_archives {
        warn!("  {}: {}", failure.archive.display(), failure.message);
    }
}
