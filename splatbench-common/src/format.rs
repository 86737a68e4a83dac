// splatbench-common/src/format.rs

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Every file format the benchmark reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Uncompressed exchange format.
    Ply,
    Spz,
    Sog,
    /// Chunk-quantized ply, 256 splats per chunk.
    Cply,
}

impl FileFormat {
    pub const ALL: [FileFormat; 4] = [FileFormat::Ply, FileFormat::Spz, FileFormat::Sog, FileFormat::Cply];

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Ply => "ply",
            FileFormat::Spz => "spz",
            FileFormat::Sog => "sog",
            FileFormat::Cply => "cply",
        }
    }

    /// The compression format this file format belongs to, `None` for the exchange format.
    pub fn compression(self) -> Option<CompressionFormat> {
        match self {
            FileFormat::Ply => None,
            FileFormat::Spz => Some(CompressionFormat::Spz),
            FileFormat::Sog => Some(CompressionFormat::Sog),
            FileFormat::Cply => Some(CompressionFormat::Cply),
        }
    }

    /// Exact match on the last extension of `path`.
    pub fn matches(self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension())
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// External program that carries out a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `splat-transform` command-line tool.
    SplatTransform,
    /// SPZ point-cloud library.
    SpzLibrary,
}

/// Static description of a compression format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub input: FileFormat,
    pub output: FileFormat,
    pub backend: Backend,
    /// Whether the compress call accepts `-g cpu`.
    pub device_flag: bool,
    /// Suffix of the working file used when the backend has no native support for the format.
    pub intermediate_suffix: Option<&'static str>,
    /// Whether compression asks the backend to sort splats along a Morton curve.
    pub morton_order: bool,
}

/// Codecs that can be round-tripped. Keys of every statistics record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    Sog,
    Spz,
    Cply,
}

const SOG: FormatSpec = FormatSpec {
    input: FileFormat::Ply,
    output: FileFormat::Sog,
    backend: Backend::SplatTransform,
    device_flag: true,
    intermediate_suffix: None,
    morton_order: false,
};

const SPZ: FormatSpec = FormatSpec {
    input: FileFormat::Ply,
    output: FileFormat::Spz,
    backend: Backend::SpzLibrary,
    device_flag: false,
    intermediate_suffix: None,
    morton_order: false,
};

const CPLY: FormatSpec = FormatSpec {
    input: FileFormat::Ply,
    output: FileFormat::Cply,
    backend: Backend::SplatTransform,
    device_flag: false,
    intermediate_suffix: Some("compressed.ply"),
    morton_order: true,
};

impl CompressionFormat {
    pub const ALL: [CompressionFormat; 3] = [CompressionFormat::Sog, CompressionFormat::Spz, CompressionFormat::Cply];

    pub fn spec(self) -> &'static FormatSpec {
        match self {
            CompressionFormat::Sog => &SOG,
            CompressionFormat::Spz => &SPZ,
            CompressionFormat::Cply => &CPLY,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().output.extension()
    }

    pub fn file_format(self) -> FileFormat {
        self.spec().output
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown compression format '{0}'")]
pub struct UnknownFormat(pub String);

impl FromStr for CompressionFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompressionFormat::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for format in CompressionFormat::ALL {
            assert_eq!(format.name().parse::<CompressionFormat>().unwrap(), format);
        }
        assert!("ply".parse::<CompressionFormat>().is_err());
        assert!("SOG".parse::<CompressionFormat>().is_err());
    }

    #[test]
    fn only_cply_uses_an_intermediate() {
        let chunked: Vec<_> = CompressionFormat::ALL
            .into_iter()
            .filter(|f| f.spec().intermediate_suffix.is_some())
            .collect();
        assert_eq!(chunked, vec![CompressionFormat::Cply]);
    }

    #[test]
    fn extension_match_is_exact() {
        assert!(FileFormat::Ply.matches(Path::new("a/point_cloud.ply")));
        assert!(!FileFormat::Ply.matches(Path::new("a/point_cloud.PLY")));
        assert!(!FileFormat::Cply.matches(Path::new("a/point_cloud.ply")));
        assert!(FileFormat::Ply.matches(Path::new("a/point_cloud.compressed.ply")));
    }
}
