use std::path::Path;

/// Returns `true` when the path names an uncompressed tar archive.
pub fn is_tar_archive(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("tar")
}

/// Returns `true` when a unit of work already has its artifact and must not be redone.
pub fn should_skip_unit(compressed_artifact: &Path, overwrite: bool) -> bool {
    !overwrite && compressed_artifact.exists()
}
