use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;
use crate::cli::Arguments;
use crate::utils::layout::PathLayout;

// External software
pub const QIIME_TAG: &str = "qiime";

// Raw read naming convention: one subdirectory per sample, paired files
// distinguished by these suffixes.
pub const FORWARD_READ_SUFFIX: &str = "_1.fq.gz";
pub const REVERSE_READ_SUFFIX: &str = "_2.fq.gz";

// Static filenames
pub const MANIFEST_FILENAME: &str = "manifest.tsv";
pub const METADATA_FILENAME: &str = "metadata.tsv";
pub const DEFAULT_CLASSIFIER: &str = "silva-138-99-nb-classifier.qza";

pub const DEMUX_QZA: &str = "demux.qza";
pub const TABLE_QZA: &str = "table-dada2.qza";
pub const REP_SEQS_QZA: &str = "rep-seqs-dada2.qza";
pub const DENOISE_STATS_QZA: &str = "stats-dada2.qza";
pub const TAXONOMY_QZA: &str = "taxonomy.qza";
pub const ROOTED_TREE_QZA: &str = "rooted-tree.qza";

pub const CORE_METRICS_DIR: &str = "core-metrics-results";
pub const EXPORTED_TREE_DIR: &str = "exported_tree";
pub const EXPORTED_TAXONOMY_DIR: &str = "exported_taxonomy";

// Sub-artifacts inside the core-metrics directory
pub const DISTANCE_MATRIX_SUFFIX: &str = "_distance_matrix.qza";
pub const ALPHA_VECTOR_SUFFIX: &str = "_vector.qza";

// Alpha diversity vectors tested for group significance
pub const ALPHA_METRICS: &[&str] = &["faith_pd", "evenness"];

// Statistical methods crossed against every discovered distance matrix
pub const BETA_METHODS: &[&str] = &["permanova", "permdisp"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArtifactKind {
    Data,
    Visualization,
}

/// A named file or directory one stage produces and later stages resolve by
/// the same name through the path layout.
#[derive(Debug, Clone)]
pub struct ArtifactRef {
    pub name: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

pub struct RunConfig {
    pub cwd: PathBuf,
    pub layout: PathLayout,
    pub args: Arguments,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to create directory {path:?}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Raw read directory {path:?} does not exist or is not a directory")]
    InvalidRawDir { path: PathBuf },

    #[error("Manifest I/O failed for {path:?}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sample folder '{sample}' contains more than one {direction} read file")]
    AmbiguousReadFile { sample: String, direction: &'static str },

    #[error("Failed to spawn {tool} for stage '{stage}': {source}")]
    ToolSpawn {
        stage: String,
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stage '{stage}' failed ({status}): args {args:?}")]
    ToolExecution {
        stage: String,
        args: Vec<String>,
        status: ExitStatus,
    },

    #[error("Failed to remove stale output {path:?}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read sweep axis values from {path:?}: {source}")]
    AxisDiscovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidConfig(String),
}
