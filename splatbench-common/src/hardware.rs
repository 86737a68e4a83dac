// splatbench-common/src/hardware.rs

use std::path::PathBuf;
use std::process::Command;

use log::debug;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use crate::common_config::CONFIG;

pub const UNKNOWN_CPU: &str = "Unknown CPU";
pub const UNKNOWN_GPU: &str = "Unknown GPU";

/// Names of the machine a round trip ran on. Probing never fails: an unavailable probe
/// yields `UNKNOWN_CPU` / `UNKNOWN_GPU`.
pub trait HostProbe {
    fn cpu_name(&self) -> String;
    fn gpu_name(&self) -> String;
}

/// CPU brand from sysinfo, GPU name from `nvidia-smi`.
pub struct SystemProbe {
    nvidia_smi: PathBuf,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            nvidia_smi: CONFIG.nvidia_smi_bin.clone(),
        }
    }

    pub fn with_nvidia_smi(nvidia_smi: impl Into<PathBuf>) -> Self {
        Self {
            nvidia_smi: nvidia_smi.into(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SystemProbe {
    fn cpu_name(&self) -> String {
        let sys = System::new_with_specifics(RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()));
        sys.cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| UNKNOWN_CPU.to_string())
    }

    fn gpu_name(&self) -> String {
        let output = Command::new(&self.nvidia_smi)
            .args(["--query-gpu=name", "--format=csv,noheader"])
            .output();
        match output {
            Ok(out) if out.status.success() => {
                let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if name.is_empty() {
                    UNKNOWN_GPU.to_string()
                } else {
                    name
                }
            }
            Ok(out) => {
                debug!("[probe] nvidia-smi exited with {}", out.status);
                UNKNOWN_GPU.to_string()
            }
            Err(e) => {
                debug!("[probe] nvidia-smi unavailable: {}", e);
                UNKNOWN_GPU.to_string()
            }
        }
    }
}

/// Probe returning fixed names.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    pub cpu: String,
    pub gpu: String,
}

impl HostProbe for FixedProbe {
    fn cpu_name(&self) -> String {
        self.cpu.clone()
    }

    fn gpu_name(&self) -> String {
        self.gpu.clone()
    }
}
