// roundtrip/src/backend.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use splatbench_common::common_config::CONFIG;
use splatbench_common::Device;

/// One call into an external codec. Exactly one is issued per codec operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `splat-transform <input> [--morton-order] <output> [-g cpu]`
    Transform {
        input: PathBuf,
        output: PathBuf,
        morton_order: bool,
        device: Option<Device>,
    },
    /// Load a ply into splats and save them as spz.
    SpzPack { input: PathBuf, output: PathBuf },
    /// Load an spz and save it back to ply.
    SpzUnpack { input: PathBuf, output: PathBuf },
}

impl Invocation {
    pub fn output(&self) -> &Path {
        match self {
            Invocation::Transform { output, .. }
            | Invocation::SpzPack { output, .. }
            | Invocation::SpzUnpack { output, .. } => output,
        }
    }
}

/// Runs invocations. An `Err` carries a human-readable reason.
pub trait CodecBackend {
    fn run(&self, invocation: &Invocation) -> Result<(), String>;
}

/// Shells out to the real tools.
pub struct ExternalBackend {
    splat_transform: PathBuf,
    spz: PathBuf,
}

impl ExternalBackend {
    pub fn new(splat_transform: impl Into<PathBuf>, spz: impl Into<PathBuf>) -> Self {
        Self {
            splat_transform: splat_transform.into(),
            spz: spz.into(),
        }
    }

    pub fn from_config() -> Self {
        Self::new(CONFIG.splat_transform_bin.clone(), CONFIG.spz_bin.clone())
    }

    fn command(&self, invocation: &Invocation) -> Command {
        match invocation {
            Invocation::Transform {
                input,
                output,
                morton_order,
                device,
            } => {
                let mut cmd = Command::new(&self.splat_transform);
                cmd.arg(input);
                if *morton_order {
                    cmd.arg("--morton-order");
                }
                cmd.arg(output);
                if *device == Some(Device::Cpu) {
                    cmd.args(["-g", "cpu"]);
                }
                cmd
            }
            Invocation::SpzPack { input, output } => {
                let mut cmd = Command::new(&self.spz);
                cmd.arg("encode").arg(input).arg(output);
                cmd
            }
            Invocation::SpzUnpack { input, output } => {
                let mut cmd = Command::new(&self.spz);
                cmd.arg("decode").arg(input).arg(output);
                cmd
            }
        }
    }
}

impl CodecBackend for ExternalBackend {
    fn run(&self, invocation: &Invocation) -> Result<(), String> {
        let mut cmd = self.command(invocation);
        debug!("[backend] running {:?}", cmd);
        let status = cmd
            .status()
            .map_err(|e| format!("could not start {:?}: {}", cmd.get_program(), e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{:?} exited with {}", cmd.get_program(), status))
        }
    }
}
