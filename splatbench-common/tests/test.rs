use std::fs;
use std::path::{Path, PathBuf};

use splatbench_common::{
    BenchError, CompressionFormat, CompressionStatistics, Measurement, RoundTripPathInfo, StatsStore,
};

fn stats(format: CompressionFormat, original_bytes: u64, compressed_bytes: u64) -> CompressionStatistics {
    CompressionStatistics::from_measurement(Measurement {
        format,
        original_bytes,
        compressed_bytes,
        compression_time_seconds: 2.0,
        decompression_time_seconds: 1.0,
        input_file: PathBuf::from("/scenes/a/point_cloud.ply"),
        compressed_file: PathBuf::from(format!("/scenes/a/point_cloud.{format}")),
        decompressed_file: PathBuf::from(format!("/scenes/a/point_cloud_{format}.ply")),
        cpu_name: "Test CPU".into(),
        gpu_name: "Test GPU".into(),
        path_info: RoundTripPathInfo::default(),
    })
}

fn raw_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn merge_into_missing_file_creates_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("compression_statistics.json");

    let record = StatsStore::merge(&path, CompressionFormat::Sog, &stats(CompressionFormat::Sog, 10, 2), false).unwrap();

    assert_eq!(record.len(), 1);
    assert_eq!(raw_json(&path)["sog"]["compression_ratio"], 5.0);
}

#[test]
fn second_format_keeps_the_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compression_statistics.json");
    let sog = stats(CompressionFormat::Sog, 10, 2);

    StatsStore::merge(&path, CompressionFormat::Sog, &sog, false).unwrap();
    StatsStore::merge(&path, CompressionFormat::Spz, &stats(CompressionFormat::Spz, 10, 1), false).unwrap();

    let loaded = StatsStore::load(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[&CompressionFormat::Sog], sog);
    assert_eq!(loaded[&CompressionFormat::Spz].compression_ratio, 10.0);
}

#[test]
fn same_format_twice_replaces_only_that_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compression_statistics.json");
    let spz = stats(CompressionFormat::Spz, 9, 3);

    StatsStore::merge(&path, CompressionFormat::Spz, &spz, false).unwrap();
    StatsStore::merge(&path, CompressionFormat::Cply, &stats(CompressionFormat::Cply, 10, 5), false).unwrap();
    StatsStore::merge(&path, CompressionFormat::Cply, &stats(CompressionFormat::Cply, 10, 4), true).unwrap();

    let loaded = StatsStore::load(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[&CompressionFormat::Cply].compression_ratio, 2.5);
    assert_eq!(loaded[&CompressionFormat::Spz], spz);
}

#[test]
fn corrupt_file_without_overwrite_is_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compression_statistics.json");
    fs::write(&path, b"{ \"sog\": { truncated").unwrap();

    let err = StatsStore::merge(&path, CompressionFormat::Sog, &stats(CompressionFormat::Sog, 4, 2), false).unwrap_err();

    assert!(matches!(err, BenchError::CorruptStatsFile { .. }), "got {err:?}");
    assert_eq!(fs::read(&path).unwrap(), b"{ \"sog\": { truncated");
}

#[test]
fn corrupt_file_with_overwrite_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compression_statistics.json");
    fs::write(&path, b"not json at all").unwrap();

    let record = StatsStore::merge(&path, CompressionFormat::Sog, &stats(CompressionFormat::Sog, 4, 2), true).unwrap();

    assert_eq!(record.len(), 1);
    assert_eq!(StatsStore::load(&path).unwrap().len(), 1);
}

#[test]
fn invalid_entries_abort_or_get_purged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compression_statistics.json");
    let good = stats(CompressionFormat::Spz, 8, 2);
    let mut raw = serde_json::Map::new();
    raw.insert("spz".into(), serde_json::to_value(&good).unwrap());
    raw.insert("zip".into(), serde_json::to_value(&good).unwrap());
    raw.insert("sog".into(), serde_json::json!({ "original_size_mb": "ten" }));
    let original = serde_json::to_string_pretty(&raw).unwrap();
    fs::write(&path, &original).unwrap();

    let err = StatsStore::merge(&path, CompressionFormat::Cply, &stats(CompressionFormat::Cply, 4, 2), false).unwrap_err();
    assert!(matches!(err, BenchError::InvalidStatsEntry { .. }), "got {err:?}");
    assert_eq!(fs::read_to_string(&path).unwrap(), original);

    let record = StatsStore::merge(&path, CompressionFormat::Cply, &stats(CompressionFormat::Cply, 4, 2), true).unwrap();
    let keys: Vec<_> = record.keys().copied().collect();
    assert_eq!(keys, vec![CompressionFormat::Spz, CompressionFormat::Cply]);
    assert_eq!(record[&CompressionFormat::Spz], good);
}

#[test]
fn written_file_is_indented_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compression_statistics.json");

    StatsStore::merge(&path, CompressionFormat::Sog, &stats(CompressionFormat::Sog, 4, 2), false).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("{\n    \"sog\": {\n        \""), "unexpected layout:\n{text}");
}

#[test]
fn absorb_moves_transient_entries_into_canonical() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = dir.path().join("compression_stats.json");
    let transient = dir.path().join("point_cloud_spz_compression_statistics.json");

    StatsStore::merge(&canonical, CompressionFormat::Sog, &stats(CompressionFormat::Sog, 4, 2), false).unwrap();
    StatsStore::merge(&transient, CompressionFormat::Spz, &stats(CompressionFormat::Spz, 4, 1), false).unwrap();

    let record = StatsStore::absorb(&canonical, &transient, false).unwrap();

    assert_eq!(record.len(), 2);
    assert!(!transient.exists());
    assert_eq!(StatsStore::load(&canonical).unwrap(), record);
}
