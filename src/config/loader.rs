// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;

/// Read and deserialize a pipeline file without semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let raw: RawPipelineFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Read a pipeline file and run file-level validation.
///
/// Relative workdirs in the file are resolved against the file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let file = PipelineFile::try_from(raw)?.with_base_dir(pipeline_root_dir(path));
    debug!(
        path = %path.display(),
        processes = file.process.len(),
        "loaded pipeline file"
    );
    Ok(file)
}

/// `Filedag.toml` in the current working directory.
pub fn default_pipeline_path() -> PathBuf {
    PathBuf::from("Filedag.toml")
}

/// Directory containing `path`, or `.` for a bare filename.
fn pipeline_root_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_dir_of_bare_filename_is_cwd() {
        assert_eq!(pipeline_root_dir(Path::new("Filedag.toml")), PathBuf::from("."));
        assert_eq!(
            pipeline_root_dir(Path::new("pipelines/gc.toml")),
            PathBuf::from("pipelines")
        );
    }
}
