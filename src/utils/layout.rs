use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Arguments;
use crate::config::defs::{
    ArtifactKind, ArtifactRef, PipelineError, CORE_METRICS_DIR, DEFAULT_CLASSIFIER,
    EXPORTED_TAXONOMY_DIR, EXPORTED_TREE_DIR, MANIFEST_FILENAME, METADATA_FILENAME,
};

/// Resolved directory tree for one batch of analysis.
///
/// Data artifacts (.qza) and visualizations (.qzv) are kept in separate
/// subdirectories of the processed folder; every other component resolves
/// paths through this struct rather than joining its own.
#[derive(Debug, Clone)]
pub struct PathLayout {
    pub raw_dir: PathBuf,
    pub qza_dir: PathBuf,
    pub qzv_dir: PathBuf,
    pub manifest_file: PathBuf,
    pub metadata_file: PathBuf,
    pub classifier_path: PathBuf,
}

impl PathLayout {
    /// Computes the layout from the parsed arguments. Relative paths are
    /// resolved against `cwd`. Pure; nothing is created until `prepare`.
    pub fn new(args: &Arguments, cwd: &Path) -> Self {
        let project_root = resolve(&args.project_root, cwd);

        let raw_dir = match &args.raw_dir {
            Some(dir) => resolve(dir, cwd),
            None => project_root.join("data").join("raw").join(&args.batch),
        };

        let processed_dir = project_root
            .join("data")
            .join("processed")
            .join(&args.batch);
        let qza_dir = processed_dir.join("qza");
        let qzv_dir = processed_dir.join("qzv");

        let manifest_file = match &args.manifest {
            Some(path) => resolve(path, cwd),
            None => raw_dir.join(MANIFEST_FILENAME),
        };

        let metadata_file = match &args.metadata {
            Some(path) => resolve(path, cwd),
            None => raw_dir.join(METADATA_FILENAME),
        };

        let classifier_path = match &args.classifier {
            Some(path) => resolve(path, cwd),
            None => project_root.join("reference").join(DEFAULT_CLASSIFIER),
        };

        PathLayout {
            raw_dir,
            qza_dir,
            qzv_dir,
            manifest_file,
            metadata_file,
            classifier_path,
        }
    }

    /// Creates every directory the run writes into. Idempotent; a failure
    /// here aborts before any stage executes.
    pub fn prepare(&self) -> Result<(), PipelineError> {
        let dirs = [
            self.qza_dir.clone(),
            self.qzv_dir.clone(),
            self.exported_tree_dir(),
            self.exported_taxonomy_dir(),
        ];
        for dir in &dirs {
            fs::create_dir_all(dir).map_err(|e| PipelineError::DirectoryCreation {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    pub fn qza(&self, name: &str) -> PathBuf {
        self.qza_dir.join(name)
    }

    pub fn qzv(&self, name: &str) -> PathBuf {
        self.qzv_dir.join(name)
    }

    /// A data artifact reference under the qza directory.
    pub fn data(&self, name: &str) -> ArtifactRef {
        ArtifactRef {
            name: name.to_string(),
            kind: ArtifactKind::Data,
            path: self.qza(name),
        }
    }

    /// A visualization artifact reference under the qzv directory.
    pub fn viz(&self, name: &str) -> ArtifactRef {
        ArtifactRef {
            name: name.to_string(),
            kind: ArtifactKind::Visualization,
            path: self.qzv(name),
        }
    }

    /// The externally supplied classifier model, referenced as a data artifact.
    pub fn classifier(&self) -> ArtifactRef {
        let name = self
            .classifier_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_CLASSIFIER.to_string());
        ArtifactRef {
            name,
            kind: ArtifactKind::Data,
            path: self.classifier_path.clone(),
        }
    }

    pub fn core_metrics_dir(&self) -> PathBuf {
        self.qza(CORE_METRICS_DIR)
    }

    pub fn exported_tree_dir(&self) -> PathBuf {
        self.qza(EXPORTED_TREE_DIR)
    }

    pub fn exported_taxonomy_dir(&self) -> PathBuf {
        self.qza(EXPORTED_TAXONOMY_DIR)
    }
}

fn resolve(path: &str, cwd: &Path) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
