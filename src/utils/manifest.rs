use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::defs::{PipelineError, FORWARD_READ_SUFFIX, REVERSE_READ_SUFFIX};

// QIIME is case-sensitive about the id column name; keep it lower case.
pub const MANIFEST_HEADER: &str = "sampleid\tforward-absolute-filepath\treverse-absolute-filepath";

#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub sample_id: String,
    pub forward_path: PathBuf,
    pub reverse_path: PathBuf,
}

/// Scans `raw_dir` for per-sample subdirectories holding paired read files.
///
/// Each immediate subdirectory is a candidate sample; its name becomes the
/// sample id. A record is emitted only when the folder contains exactly one
/// forward- and one reverse-suffixed file. Folders missing either direction
/// are skipped; a folder with more than one candidate for the same direction
/// is an error, since picking one silently would discard data.
///
/// # Arguments
/// * `raw_dir` - Directory containing one subdirectory per sample.
///
/// # Returns
/// Records in the order the filesystem enumerates the subdirectories.
pub fn scan_samples(raw_dir: &Path) -> Result<Vec<SampleRecord>, PipelineError> {
    if !raw_dir.is_dir() {
        return Err(PipelineError::InvalidRawDir {
            path: raw_dir.to_path_buf(),
        });
    }

    let mut records = Vec::new();
    let entries =
        fs::read_dir(raw_dir).map_err(|e| manifest_io(raw_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| manifest_io(raw_dir, e))?;
        let sample_dir = entry.path();
        if !sample_dir.is_dir() {
            continue;
        }
        let sample_id = entry.file_name().to_string_lossy().into_owned();

        let mut forward: Option<PathBuf> = None;
        let mut reverse: Option<PathBuf> = None;
        let files = fs::read_dir(&sample_dir).map_err(|e| manifest_io(&sample_dir, e))?;
        for file in files {
            let file = file.map_err(|e| manifest_io(&sample_dir, e))?;
            let file_name = file.file_name().to_string_lossy().into_owned();
            if file_name.ends_with(FORWARD_READ_SUFFIX) {
                if forward.replace(file.path()).is_some() {
                    return Err(PipelineError::AmbiguousReadFile {
                        sample: sample_id,
                        direction: "forward",
                    });
                }
            } else if file_name.ends_with(REVERSE_READ_SUFFIX) {
                if reverse.replace(file.path()).is_some() {
                    return Err(PipelineError::AmbiguousReadFile {
                        sample: sample_id,
                        direction: "reverse",
                    });
                }
            }
        }

        match (forward, reverse) {
            (Some(forward_path), Some(reverse_path)) => records.push(SampleRecord {
                sample_id,
                forward_path,
                reverse_path,
            }),
            _ => debug!(
                "Skipping sample folder {:?}: missing forward or reverse read",
                sample_dir
            ),
        }
    }

    Ok(records)
}

/// Writes the tab-separated manifest consumed by the import stage.
pub fn write_manifest(records: &[SampleRecord], out_path: &Path) -> Result<(), PipelineError> {
    let mut file = File::create(out_path).map_err(|e| manifest_io(out_path, e))?;
    writeln!(file, "{}", MANIFEST_HEADER).map_err(|e| manifest_io(out_path, e))?;
    for record in records {
        writeln!(
            file,
            "{}\t{}\t{}",
            record.sample_id,
            record.forward_path.display(),
            record.reverse_path.display()
        )
        .map_err(|e| manifest_io(out_path, e))?;
    }
    Ok(())
}

/// Scans `raw_dir` and writes the manifest to `out_path`.
///
/// A run with zero qualifying samples still writes the header-only file;
/// the import stage is where that surfaces as a failure.
pub fn build(raw_dir: &Path, out_path: &Path) -> Result<Vec<SampleRecord>, PipelineError> {
    let records = scan_samples(raw_dir)?;
    if records.is_empty() {
        warn!(
            "No paired read files found under {:?}; writing header-only manifest",
            raw_dir
        );
    }
    write_manifest(&records, out_path)?;
    Ok(records)
}

fn manifest_io(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::ManifestIo {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_scan_requires_directory() {
        let err = scan_samples(Path::new("/no/such/raw/dir")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRawDir { .. }));
    }

    #[test]
    fn test_scan_ignores_loose_files() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        touch(&tmp.path().join("metadata.tsv"));
        let sample = tmp.path().join("S1");
        fs::create_dir(&sample)?;
        touch(&sample.join("S1_L001_1.fq.gz"));
        touch(&sample.join("S1_L001_2.fq.gz"));

        let records = scan_samples(tmp.path())?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sample_id, "S1");
        Ok(())
    }

    #[test]
    fn test_scan_rejects_duplicate_direction_matches() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let sample = tmp.path().join("S1");
        fs::create_dir(&sample)?;
        touch(&sample.join("lane1_1.fq.gz"));
        touch(&sample.join("lane2_1.fq.gz"));
        touch(&sample.join("lane1_2.fq.gz"));

        let err = scan_samples(tmp.path()).unwrap_err();
        match err {
            PipelineError::AmbiguousReadFile { sample, direction } => {
                assert_eq!(sample, "S1");
                assert_eq!(direction, "forward");
            }
            other => panic!("Expected AmbiguousReadFile, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_unrelated_suffixes_do_not_match() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let sample = tmp.path().join("S1");
        fs::create_dir(&sample)?;
        touch(&sample.join("reads_1.fq.gz"));
        touch(&sample.join("reads_2.fastq.gz")); // wrong reverse suffix

        let records = scan_samples(tmp.path())?;
        assert!(records.is_empty(), "Half-paired folder should be skipped");
        Ok(())
    }

    #[test]
    fn test_empty_scan_writes_header_only_manifest() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let out = tmp.path().join("manifest.tsv");
        let records = build(tmp.path(), &out)?;
        assert!(records.is_empty());
        let content = fs::read_to_string(&out)?;
        assert_eq!(content, format!("{}\n", MANIFEST_HEADER));
        Ok(())
    }
}
