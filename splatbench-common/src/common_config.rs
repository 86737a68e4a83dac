use std::env;
use std::path::PathBuf;

use log::debug;
use once_cell::sync::Lazy;

impl BenchConfig {
    /// Per-scene statistics file written next to each asset by a batch run.
    pub fn scene_stats_path(&self, scene_dir: &std::path::Path) -> PathBuf {
        scene_dir.join(&self.scene_stats_file_name)
    }
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub splat_transform_bin: PathBuf,
    pub spz_bin: PathBuf,
    pub nvidia_smi_bin: PathBuf,
    /// File name every asset in a corpus carries.
    pub asset_file_name: String,
    pub scene_stats_file_name: String,
    /// Stats file used when a round trip writes its outputs next to the input.
    pub default_stats_file_name: String,
    pub compressed_dir_name: String,
    pub decompressed_dir_name: String,
    pub default_iteration_filter: String,
}

pub static CONFIG: Lazy<BenchConfig> = Lazy::new(bench_config);

fn from_env(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn bench_config() -> BenchConfig {
    let config = BenchConfig {
        splat_transform_bin: from_env("SPLATBENCH_SPLAT_TRANSFORM", "splat-transform").into(),
        spz_bin: from_env("SPLATBENCH_SPZ", "spz").into(),
        nvidia_smi_bin: from_env("SPLATBENCH_NVIDIA_SMI", "nvidia-smi").into(),
        asset_file_name: from_env("SPLATBENCH_ASSET_NAME", "point_cloud.ply"),
        scene_stats_file_name: "compression_stats.json".into(),
        default_stats_file_name: "compression_statistics.json".into(),
        compressed_dir_name: "compressed".into(),
        decompressed_dir_name: "decompressed".into(),
        default_iteration_filter: "iteration_40000".into(),
    };

    debug!("[config] splat-transform: {}", config.splat_transform_bin.display());
    debug!("[config] spz: {}", config.spz_bin.display());
    debug!("[config] nvidia-smi: {}", config.nvidia_smi_bin.display());
    debug!("[config] asset file name: {}", config.asset_file_name);

    config
}
