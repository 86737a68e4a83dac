pub mod common_config;
pub mod error;
pub mod format;
pub mod hardware;
pub mod stats;
pub mod store;
mod skip;

pub use error::{BenchError, FileRole, IoContext, Result};
pub use format::{Backend, CompressionFormat, FileFormat, FormatSpec, UnknownFormat};
pub use hardware::{FixedProbe, HostProbe, SystemProbe, UNKNOWN_CPU, UNKNOWN_GPU};
pub use skip::{is_tar_archive, should_skip_unit};
pub use stats::{CompressionStatistics, Measurement, PathInfo, RoundTripPathInfo, StatsRecord};
pub use store::StatsStore;

/// Whether a backend runs on the accelerator or is forced onto the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Gpu,
    Cpu,
}

impl Device {
    pub fn from_use_cpu(use_cpu: bool) -> Self {
        if use_cpu {
            Device::Cpu
        } else {
            Device::Gpu
        }
    }
}
