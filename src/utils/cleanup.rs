use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::config::defs::PipelineError;

/// Removes `path` if it exists; a no-op otherwise.
///
/// QIIME refuses to write into a pre-existing output directory, so stages
/// flagged `requires_clean_output_dir` call this immediately before running.
/// Safe to call repeatedly.
pub fn ensure_clean(path: &Path) -> Result<(), PipelineError> {
    if !path.exists() {
        debug!("No stale output at {:?}", path);
        return Ok(());
    }

    info!("Removing stale output at {:?}", path);
    let removed = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| PipelineError::Cleanup {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_removes_populated_directory() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let stale = tmp.path().join("core-metrics-results");
        fs::create_dir(&stale)?;
        fs::write(stale.join("bray_curtis_distance_matrix.qza"), b"stale")?;

        ensure_clean(&stale)?;
        assert!(!stale.exists());
        Ok(())
    }

    #[test]
    fn test_removes_plain_file() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let stale = tmp.path().join("leftover.qza");
        fs::write(&stale, b"stale")?;

        ensure_clean(&stale)?;
        assert!(!stale.exists());
        Ok(())
    }

    #[test]
    fn test_second_run_is_a_noop() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let stale = tmp.path().join("core-metrics-results");
        fs::create_dir(&stale)?;

        ensure_clean(&stale)?;
        ensure_clean(&stale)?;
        assert!(!stale.exists());
        Ok(())
    }
}
