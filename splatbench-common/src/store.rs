// splatbench-common/src/store.rs

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{BenchError, IoContext, Result};
use crate::format::CompressionFormat;
use crate::stats::{CompressionStatistics, StatsRecord};

/// Reads and writes per-asset statistics files.
///
/// A merge is a read-modify-write of the whole file. It is not atomic across processes,
/// so two runs must not write the same file at the same time.
pub struct StatsStore;

impl StatsStore {
    /// Strict read. A missing file is an empty record.
    pub fn load(path: &Path) -> Result<StatsRecord> {
        Self::read_checked(path, false)
    }

    /// Upsert `record` under `format`.
    ///
    /// `overwrite` decides what happens to an unreadable file or to other entries that do not
    /// validate: dropped when set, otherwise the merge is refused and the file is left as is.
    /// The entry for `format` itself is always replaced.
    pub fn merge(
        path: &Path,
        format: CompressionFormat,
        record: &CompressionStatistics,
        overwrite: bool,
    ) -> Result<StatsRecord> {
        let mut stats = Self::read_checked(path, overwrite)?;
        stats.insert(format, record.clone());
        Self::write(path, &stats)?;
        debug!("[store] wrote {} entries to {}", stats.len(), path.display());
        Ok(stats)
    }

    /// Fold every entry of `transient` into `canonical`, then delete `transient`.
    ///
    /// `transient` itself must be valid; `overwrite` applies to `canonical` as in [`merge`].
    ///
    /// [`merge`]: StatsStore::merge
    pub fn absorb(canonical: &Path, transient: &Path, overwrite: bool) -> Result<StatsRecord> {
        let incoming = Self::load(transient)?;
        let mut stats = Self::read_checked(canonical, overwrite)?;
        stats.extend(incoming);
        Self::write(canonical, &stats)?;
        fs::remove_file(transient).with_path(transient)?;
        debug!("[store] absorbed {} into {}", transient.display(), canonical.display());
        Ok(stats)
    }

    fn read_checked(path: &Path, overwrite: bool) -> Result<StatsRecord> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StatsRecord::new()),
            Err(e) => return Err(BenchError::io(path, e)),
        };

        let raw: Map<String, Value> = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(source) if overwrite => {
                warn!("[store] discarding corrupted stats file {}: {}", path.display(), source);
                return Ok(StatsRecord::new());
            }
            Err(source) => {
                return Err(BenchError::CorruptStatsFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut stats = StatsRecord::new();
        for (key, value) in raw {
            let entry = key
                .parse::<CompressionFormat>()
                .ok()
                .zip(serde_json::from_value::<CompressionStatistics>(value).ok());

            match entry {
                Some((format, statistics)) => {
                    stats.insert(format, statistics);
                }
                None if overwrite => {
                    warn!("[store] dropping invalid entry '{}' from {}", key, path.display());
                }
                None => {
                    return Err(BenchError::InvalidStatsEntry {
                        path: path.to_path_buf(),
                        key,
                    })
                }
            }
        }
        Ok(stats)
    }

    /// Replace `path` with the pretty-printed record. The new content is written next to
    /// the target and renamed over it, so a reader never sees a half-written file.
    fn write(path: &Path, stats: &StatsRecord) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_path(dir)?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        stats
            .serialize(&mut ser)
            .map_err(|e| BenchError::io(path, e.into()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).with_path(dir)?;
        tmp.write_all(&buf).with_path(tmp.path())?;
        tmp.persist(path).map_err(|e| BenchError::io(path, e.error))?;
        Ok(())
    }
}
