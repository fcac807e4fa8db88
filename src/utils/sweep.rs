use std::fs;
use std::path::PathBuf;

use crate::config::defs::PipelineError;
use crate::utils::command::Stage;

/// One enumerable dimension of a parameter sweep.
pub enum SweepAxis {
    /// Values known when the plan is written.
    Fixed(Vec<String>),
    /// Values discovered by listing `dir` for files ending in `suffix`,
    /// stripping the suffix to obtain the base identifier. The listing
    /// happens when the sweep step is reached, not at plan time, because
    /// the directory is populated by an earlier stage.
    DirSuffix { dir: PathBuf, suffix: String },
}

impl SweepAxis {
    pub fn values(&self) -> Result<Vec<String>, PipelineError> {
        match self {
            SweepAxis::Fixed(values) => Ok(values.clone()),
            SweepAxis::DirSuffix { dir, suffix } => {
                let discovery_err = |e| PipelineError::AxisDiscovery {
                    path: dir.clone(),
                    source: e,
                };
                let mut values = Vec::new();
                for entry in fs::read_dir(dir).map_err(discovery_err)? {
                    let entry = entry.map_err(discovery_err)?;
                    let file_name = entry.file_name().to_string_lossy().into_owned();
                    if let Some(base) = file_name.strip_suffix(suffix.as_str()) {
                        values.push(base.to_string());
                    }
                }
                // read_dir order is filesystem-dependent
                values.sort();
                Ok(values)
            }
        }
    }
}

/// Expands `axes` into their full cross product, building one concrete stage
/// per combination. The first axis varies slowest, matching nested loops.
pub fn expand<F>(axes: &[SweepAxis], build: F) -> Result<Vec<Stage>, PipelineError>
where
    F: Fn(&[String]) -> Stage,
{
    let resolved: Vec<Vec<String>> = axes
        .iter()
        .map(|axis| axis.values())
        .collect::<Result<_, _>>()?;

    let mut stages = Vec::new();
    let mut combo: Vec<String> = Vec::with_capacity(resolved.len());
    fill(&resolved, &mut combo, &mut stages, &build);
    Ok(stages)
}

fn fill<F>(axes: &[Vec<String>], combo: &mut Vec<String>, stages: &mut Vec<Stage>, build: &F)
where
    F: Fn(&[String]) -> Stage,
{
    if combo.len() == axes.len() {
        stages.push(build(combo));
        return;
    }
    for value in &axes[combo.len()] {
        combo.push(value.clone());
        fill(axes, combo, stages, build);
        combo.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(values: &[&str]) -> SweepAxis {
        SweepAxis::Fixed(values.iter().map(|v| v.to_string()).collect())
    }

    fn combo_stage(combo: &[String]) -> Stage {
        Stage::new(&combo.join("-"), &["diversity", "beta-group-significance"])
    }

    #[test]
    fn test_cross_product_order() -> anyhow::Result<()> {
        let axes = vec![fixed(&["a", "b"]), fixed(&["x", "y"])];
        let stages = expand(&axes, combo_stage)?;
        let names: Vec<&str> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a-x", "a-y", "b-x", "b-y"]);
        Ok(())
    }

    #[test]
    fn test_empty_axis_yields_no_stages() -> anyhow::Result<()> {
        let axes = vec![fixed(&["a", "b"]), fixed(&[])];
        let stages = expand(&axes, combo_stage)?;
        assert!(stages.is_empty());
        Ok(())
    }

    #[test]
    fn test_dir_suffix_axis_strips_and_sorts() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        for name in [
            "weighted_unifrac_distance_matrix.qza",
            "bray_curtis_distance_matrix.qza",
            "faith_pd_vector.qza",
        ] {
            std::fs::write(tmp.path().join(name), b"")?;
        }

        let axis = SweepAxis::DirSuffix {
            dir: tmp.path().to_path_buf(),
            suffix: "_distance_matrix.qza".to_string(),
        };
        assert_eq!(axis.values()?, vec!["bray_curtis", "weighted_unifrac"]);
        Ok(())
    }

    #[test]
    fn test_dir_suffix_axis_reads_at_expansion_time() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let axis = SweepAxis::DirSuffix {
            dir: tmp.path().to_path_buf(),
            suffix: "_distance_matrix.qza".to_string(),
        };
        assert!(axis.values()?.is_empty());

        // A later stage populates the directory; the same axis now sees it.
        std::fs::write(tmp.path().join("jaccard_distance_matrix.qza"), b"")?;
        assert_eq!(axis.values()?, vec!["jaccard"]);
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_a_discovery_error() {
        let axis = SweepAxis::DirSuffix {
            dir: PathBuf::from("/no/such/core-metrics"),
            suffix: "_distance_matrix.qza".to_string(),
        };
        assert!(matches!(
            axis.values(),
            Err(PipelineError::AxisDiscovery { .. })
        ));
    }
}
