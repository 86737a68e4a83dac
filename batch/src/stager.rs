// batch/src/stager.rs

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use splatbench_common::{is_tar_archive, BenchError, IoContext, Result};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Substrings an asset path must contain, any one of them. Empty keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationFilter(Vec<String>);

impl IterationFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(patterns.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    pub fn keeps(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.0.is_empty() || self.0.iter().any(|p| text.contains(p.as_str()))
    }
}

/// A scene tar that could not be streamed.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveFailure {
    pub archive: PathBuf,
    pub message: String,
}

/// What [`Stager::stream_nested`] did with the tars it found.
#[derive(Debug, Default)]
pub struct StreamOutcome {
    /// Archives written, in processing order.
    pub written: Vec<PathBuf>,
    pub failed: Vec<ArchiveFailure>,
}

/// One tree handed out by [`Stager::stream_nested`].
#[derive(Debug, Clone, Copy)]
pub struct StagedTree<'a> {
    /// Directory holding the extracted or copied files.
    pub root: &'a Path,
    /// Tar or directory the files came from.
    pub origin: &'a Path,
    /// Archive or directory the processed files end up in.
    pub destination: &'a Path,
}

/// Materializes a corpus on disk under `output_dir`. Owns what it creates there for the
/// duration of a batch run.
pub struct Stager {
    output_dir: PathBuf,
    overwrite: bool,
}

impl Stager {
    pub fn new(output_dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            overwrite,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Extract a `.tar` into `output_dir/<stem>` or copy a directory into `output_dir/<name>`.
    /// An existing staging directory is reused, or rebuilt when overwriting.
    pub fn stage(&self, source: &Path) -> Result<PathBuf> {
        if !source.exists() {
            return Err(BenchError::SourceMissing(source.to_path_buf()));
        }

        if source.is_file() && is_tar_archive(source) {
            let staging = self.output_dir.join(file_stem(source)?);
            if self.prepare(&staging)? {
                info!("Extracting {} to {}", source.display(), staging.display());
                fs::create_dir_all(&staging).with_path(&staging)?;
                extract_tar(source, &staging)?;
            }
            return Ok(staging);
        }

        if source.is_dir() {
            let name = source
                .file_name()
                .ok_or_else(|| BenchError::UnsupportedSource(source.to_path_buf()))?;
            let staging = self.output_dir.join(name);
            if self.prepare(&staging)? {
                info!("Copying {} to {}", source.display(), staging.display());
                copy_tree(source, &staging, |_| true)?;
            }
            return Ok(staging);
        }

        Err(BenchError::UnsupportedSource(source.to_path_buf()))
    }

    /// Returns whether `staging` has to be (re)populated.
    fn prepare(&self, staging: &Path) -> Result<bool> {
        if !staging.exists() {
            return Ok(true);
        }
        if self.overwrite {
            info!("Removing existing staging dir {}", staging.display());
            fs::remove_dir_all(staging).with_path(staging)?;
            return Ok(true);
        }
        info!("Skipping existing staging dir {}", staging.display());
        Ok(false)
    }

    /// Nested corpus: a directory of per-scene tars, possibly with loose assets beside them.
    ///
    /// Each tar is extracted into a temporary directory under `output_dir`, handed to
    /// `visit`, and repacked with its original layout to
    /// `output_dir/<source name>/<relative tar path>`. The temporary
    /// directory is removed whether or not `visit` succeeds. Loose files are copied to
    /// `output_dir/<source name>` and visited there once, after all tars.
    ///
    /// A tar that cannot be extracted or repacked is logged, recorded in the outcome and
    /// skipped; the remaining tars are still processed. Errors from `visit` are not fatal
    /// either: the caller decides per scene, and a failed visit still gets repackaged.
    pub fn stream_nested<F>(&self, source: &Path, mut visit: F) -> Result<StreamOutcome>
    where
        F: FnMut(StagedTree<'_>) -> Result<()>,
    {
        if !source.is_dir() {
            return Err(BenchError::UnsupportedSource(source.to_path_buf()));
        }
        let name = source
            .file_name()
            .ok_or_else(|| BenchError::UnsupportedSource(source.to_path_buf()))?;
        let destination_root = self.output_dir.join(name);
        fs::create_dir_all(&destination_root).with_path(&destination_root)?;

        let mut tars: Vec<PathBuf> = WalkDir::new(source)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_tar_archive(e.path()))
            .map(|e| e.into_path())
            .collect();
        tars.sort();

        let mut outcome = StreamOutcome::default();
        for tar_path in &tars {
            let relative = tar_path.strip_prefix(source).unwrap_or(tar_path);
            let destination = destination_root.join(relative);
            if destination.exists() && !self.overwrite {
                info!("Skipping existing archive {}", destination.display());
                continue;
            }

            match self.stream_one(tar_path, &destination, &mut visit) {
                Ok(()) => {
                    info!("Wrote {}", destination.display());
                    outcome.written.push(destination);
                }
                Err(e) => {
                    error!("Skipping archive {}: {}", tar_path.display(), e);
                    outcome.failed.push(ArchiveFailure {
                        archive: tar_path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let has_loose = WalkDir::new(source)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| e.file_type().is_file() && !is_tar_archive(e.path()));
        if has_loose {
            copy_tree(source, &destination_root, |p| !is_tar_archive(p))?;
            let tree = StagedTree {
                root: &destination_root,
                origin: source,
                destination: &destination_root,
            };
            if let Err(e) = visit(tree) {
                error!("Failed to process loose files of {}: {}", source.display(), e);
            }
        }

        Ok(outcome)
    }

    /// Extract, visit and repack one scene tar. The scratch directory goes away on return.
    fn stream_one<F>(&self, tar_path: &Path, destination: &Path, visit: &mut F) -> Result<()>
    where
        F: FnMut(StagedTree<'_>) -> Result<()>,
    {
        let scratch = TempDir::with_prefix_in(".splatbench-", &self.output_dir).with_path(&self.output_dir)?;
        debug!("Extracting {} to {}", tar_path.display(), scratch.path().display());
        extract_tar(tar_path, scratch.path())?;

        let tree = StagedTree {
            root: scratch.path(),
            origin: tar_path,
            destination,
        };
        if let Err(e) = visit(tree) {
            error!("Failed to process {}: {}", tar_path.display(), e);
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        if let Err(e) = repack(scratch.path(), destination) {
            // a half-written archive would be taken as done by the next run
            let _ = fs::remove_file(destination);
            return Err(e);
        }
        Ok(())
    }
}

/// Every file named `asset_name` below `root` that `filter` keeps, sorted.
pub fn discover_assets(root: &Path, asset_name: &str, filter: &IterationFilter) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == asset_name)
        .map(|e| e.into_path())
        .filter(|p| filter.keeps(p.strip_prefix(root).unwrap_or(p)))
        .collect();
    found.sort();
    found
}

/// Write `dir` to an uncompressed tar whose single top-level entry is `dir`'s own name.
pub fn package(dir: &Path, tar_path: &Path) -> Result<()> {
    let name = dir
        .file_name()
        .ok_or_else(|| BenchError::UnsupportedSource(dir.to_path_buf()))?;
    let file = File::create(tar_path).with_path(tar_path)?;
    let mut builder = tar::Builder::new(file);
    builder.append_dir_all(name, dir).with_path(dir)?;
    builder.into_inner().with_path(tar_path)?;
    Ok(())
}

/// Write the entries of `dir` to an uncompressed tar, keeping their layout at the archive root.
fn repack(dir: &Path, tar_path: &Path) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_path(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .with_path(dir)?;
    entries.sort();

    let file = File::create(tar_path).with_path(tar_path)?;
    let mut builder = tar::Builder::new(file);
    for path in &entries {
        let Some(name) = path.file_name() else { continue };
        if path.is_dir() {
            builder.append_dir_all(name, path).with_path(path)?;
        } else {
            builder.append_path_with_name(path, name).with_path(path)?;
        }
    }
    builder.into_inner().with_path(tar_path)?;
    Ok(())
}

/// Entries that would land outside `destination` are skipped by `tar::Archive::unpack`.
fn extract_tar(archive: &Path, destination: &Path) -> Result<()> {
    let file = File::open(archive).with_path(archive)?;
    tar::Archive::new(file).unpack(destination).with_path(archive)
}

fn copy_tree<F>(source: &Path, destination: &Path, keep: F) -> Result<()>
where
    F: Fn(&Path) -> bool,
{
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            BenchError::io(path, e.into())
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_path(&target)?;
        } else if keep(entry.path()) {
            fs::copy(entry.path(), &target).with_path(entry.path())?;
        }
    }
    Ok(())
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| BenchError::UnsupportedSource(path.to_path_buf()))
}
