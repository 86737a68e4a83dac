// roundtrip/src/codec.rs

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use splatbench_common::{
    Backend, BenchError, CompressionFormat, Device, FileFormat, FileRole, IoContext, Result,
};

use crate::backend::{CodecBackend, Invocation};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    pub overwrite: bool,
    pub device: Device,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Compress,
    Decompress,
}

/// Checks the pre-conditions of a codec call and issues the single backend invocation.
pub struct CodecAdapter {
    backend: Box<dyn CodecBackend>,
}

impl CodecAdapter {
    pub fn new(backend: Box<dyn CodecBackend>) -> Self {
        Self { backend }
    }

    pub fn compress(&self, format: CompressionFormat, input: &Path, output: &Path, options: CodecOptions) -> Result<()> {
        self.run(Direction::Compress, format, input, output, options)
    }

    pub fn decompress(&self, format: CompressionFormat, input: &Path, output: &Path, options: CodecOptions) -> Result<()> {
        self.run(Direction::Decompress, format, input, output, options)
    }

    /// Conversion between the exchange format and one compressed format.
    pub fn convert(&self, from: FileFormat, to: FileFormat, input: &Path, output: &Path, options: CodecOptions) -> Result<()> {
        match (from.compression(), to.compression()) {
            (None, Some(format)) => self.compress(format, input, output, options),
            (Some(format), None) => self.decompress(format, input, output, options),
            _ => Err(BenchError::UnsupportedConversion { from, to }),
        }
    }

    fn run(&self, direction: Direction, format: CompressionFormat, input: &Path, output: &Path, options: CodecOptions) -> Result<()> {
        let spec = format.spec();
        let (input_format, output_format) = match direction {
            Direction::Compress => (spec.input, spec.output),
            Direction::Decompress => (spec.output, spec.input),
        };
        let intermediate = spec.intermediate_suffix;
        if let Some(suffix) = intermediate {
            // the working name must not land on the other file of the call
            let (working, other) = match direction {
                Direction::Compress => (output.with_extension(suffix), input),
                Direction::Decompress => (input.with_extension(suffix), output),
            };
            if working == other {
                return Err(BenchError::NameCollision {
                    name: file_name(&working),
                });
            }
        }
        check_file_names(input, output, input_format, output_format, options.overwrite)?;

        match (direction, intermediate) {
            (Direction::Compress, Some(suffix)) => {
                let working = output.with_extension(suffix);
                clear_stale(&working, options.overwrite)?;
                check_source(input)?;
                let invocation = Invocation::Transform {
                    input: input.to_path_buf(),
                    output: working.clone(),
                    morton_order: spec.morton_order,
                    device: None,
                };
                self.invoke(format, input, output, &invocation)?;
                // the final name only appears once the backend is done
                fs::rename(&working, output).with_path(&working)?;
                Ok(())
            }
            (Direction::Decompress, Some(suffix)) => {
                let working = input.with_extension(suffix);
                if !input.exists() && working.exists() {
                    return Err(BenchError::StaleIntermediate(working));
                }
                check_source(input)?;
                if working.exists() {
                    return Err(BenchError::StaleIntermediate(working));
                }
                let guard = RenameGuard::new(input, &working)?;
                let invocation = Invocation::Transform {
                    input: guard.working().to_path_buf(),
                    output: output.to_path_buf(),
                    morton_order: false,
                    device: None,
                };
                let result = self.invoke(format, input, output, &invocation);
                if let Err(restore_err) = guard.restore() {
                    if let Err(codec_err) = &result {
                        error!("[codec] {}", codec_err);
                    }
                    return Err(restore_err);
                }
                result
            }
            (_, None) => {
                check_source(input)?;
                let invocation = match (spec.backend, direction) {
                    (Backend::SplatTransform, direction) => Invocation::Transform {
                        input: input.to_path_buf(),
                        output: output.to_path_buf(),
                        morton_order: false,
                        device: (direction == Direction::Compress && spec.device_flag).then_some(options.device),
                    },
                    (Backend::SpzLibrary, Direction::Compress) => Invocation::SpzPack {
                        input: input.to_path_buf(),
                        output: output.to_path_buf(),
                    },
                    (Backend::SpzLibrary, Direction::Decompress) => Invocation::SpzUnpack {
                        input: input.to_path_buf(),
                        output: output.to_path_buf(),
                    },
                };
                self.invoke(format, input, output, &invocation)
            }
        }
    }

    fn invoke(&self, format: CompressionFormat, input: &Path, output: &Path, invocation: &Invocation) -> Result<()> {
        debug!("[codec] {} {:?}", format, invocation);
        self.backend
            .run(invocation)
            .map_err(|reason| BenchError::CodecInvocationFailed {
                format,
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                reason,
            })
    }
}

/// Pre-conditions shared by every codec call. With `overwrite` an existing output is removed.
fn check_file_names(input: &Path, output: &Path, input_format: FileFormat, output_format: FileFormat, overwrite: bool) -> Result<()> {
    if input.file_name() == output.file_name() {
        return Err(BenchError::NameCollision { name: file_name(input) });
    }

    if !input_format.matches(input) {
        return Err(BenchError::FormatMismatch {
            path: input.to_path_buf(),
            role: FileRole::Input,
            expected: input_format,
        });
    }

    if !output_format.matches(output) {
        return Err(BenchError::FormatMismatch {
            path: output.to_path_buf(),
            role: FileRole::Output,
            expected: output_format,
        });
    }

    if output.exists() {
        if !overwrite {
            return Err(BenchError::DestinationExists(output.to_path_buf()));
        }
        fs::remove_file(output).with_path(output)?;
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn check_source(input: &Path) -> Result<()> {
    if input.exists() {
        Ok(())
    } else {
        Err(BenchError::SourceMissing(input.to_path_buf()))
    }
}

fn clear_stale(working: &Path, overwrite: bool) -> Result<()> {
    if !working.exists() {
        return Ok(());
    }
    if !overwrite {
        return Err(BenchError::StaleIntermediate(working.to_path_buf()));
    }
    warn!("[codec] removing stale intermediate {}", working.display());
    fs::remove_file(working).with_path(working)
}

/// Keeps a file under a working name for the lifetime of the guard.
///
/// The original name is restored by `restore` or, on early return, by `Drop`. A process that
/// dies while the guard is alive leaves the file under its working name; the next call on
/// the same file reports `StaleIntermediate`.
pub struct RenameGuard {
    original: PathBuf,
    working: PathBuf,
    armed: bool,
}

impl RenameGuard {
    pub fn new(original: &Path, working: &Path) -> Result<Self> {
        fs::rename(original, working).with_path(original)?;
        Ok(Self {
            original: original.to_path_buf(),
            working: working.to_path_buf(),
            armed: true,
        })
    }

    pub fn working(&self) -> &Path {
        &self.working
    }

    pub fn restore(mut self) -> Result<()> {
        self.armed = false;
        fs::rename(&self.working, &self.original).with_path(&self.working)
    }
}

impl Drop for RenameGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::rename(&self.working, &self.original) {
                warn!(
                    "[codec] could not restore {} from {}: {}",
                    self.original.display(),
                    self.working.display(),
                    e
                );
            }
        }
    }
}
