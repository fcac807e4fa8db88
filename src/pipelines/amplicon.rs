use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use log::info;

use crate::config::defs::{
    ArtifactKind, ArtifactRef, PipelineError, RunConfig, ALPHA_METRICS, ALPHA_VECTOR_SUFFIX,
    BETA_METHODS, CORE_METRICS_DIR, DEMUX_QZA, DENOISE_STATS_QZA, DISTANCE_MATRIX_SUFFIX,
    EXPORTED_TAXONOMY_DIR, EXPORTED_TREE_DIR, REP_SEQS_QZA, ROOTED_TREE_QZA, TABLE_QZA,
    TAXONOMY_QZA,
};
use crate::utils::command::{run_stage, Stage};
use crate::utils::layout::PathLayout;
use crate::utils::manifest;
use crate::utils::sweep::{self, SweepAxis};

/// One entry in the ordered workflow plan.
///
/// Most of the workflow is fixed stages; sweeps expand into concrete stages
/// only when reached, because their axes can depend on files produced by
/// earlier stages.
pub enum Step {
    Run(Stage),
    Sweep {
        name: String,
        inputs: Vec<ArtifactRef>,
        axes: Vec<SweepAxis>,
        build: Box<dyn Fn(&[String]) -> Stage + Send + Sync>,
    },
}

impl Step {
    pub fn name(&self) -> &str {
        match self {
            Step::Run(stage) => &stage.name,
            Step::Sweep { name, .. } => name,
        }
    }
}

/// Runs the paired-end amplicon workflow end to end.
pub async fn run(config: Arc<RunConfig>) -> Result<(), PipelineError> {
    println!("\n-------------\n Amplicon\n-------------\n");

    if config.args.manifest.is_some() {
        info!("Using pre-built manifest {:?}", config.layout.manifest_file);
    } else {
        let records = manifest::build(&config.layout.raw_dir, &config.layout.manifest_file)?;
        info!(
            "Manifest written to {:?} with {} samples",
            config.layout.manifest_file,
            records.len()
        );
    }

    let steps = plan(&config);
    execute(&config, steps).await
}

/// Executes the plan strictly in order, one external process at a time.
/// The first failing stage halts everything; artifacts already written are
/// left in place for diagnosis and re-running.
pub async fn execute(config: &RunConfig, steps: Vec<Step>) -> Result<(), PipelineError> {
    for step in steps {
        match step {
            Step::Run(stage) => run_stage(config, &stage).await?,
            Step::Sweep {
                name, axes, build, ..
            } => {
                let stages = sweep::expand(&axes, build.as_ref())?;
                info!("Sweep '{}' expanded to {} invocations", name, stages.len());
                for stage in &stages {
                    run_stage(config, stage).await?;
                }
            }
        }
    }
    Ok(())
}

/// The fixed stage list for one batch: import through export, with the
/// group-significance sweeps in between. Dependency order is encoded by
/// position; `verify_artifact_threading` audits it.
pub fn plan(config: &RunConfig) -> Vec<Step> {
    let layout = &config.layout;
    let args = &config.args;
    let metadata = layout.metadata_file.to_string_lossy().into_owned();

    let mut steps: Vec<Step> = Vec::new();

    steps.push(Step::Run(
        Stage::new("import", &["tools", "import"])
            .arg("--type", "SampleData[PairedEndSequencesWithQuality]")
            .arg("--input-format", "PairedEndFastqManifestPhred33V2")
            .arg("--input-path", layout.manifest_file.to_string_lossy())
            .output("--output-path", layout.data(DEMUX_QZA)),
    ));

    steps.push(Step::Run(
        Stage::new("demux-summarize", &["demux", "summarize"])
            .input("--i-data", layout.data(DEMUX_QZA))
            .output("--o-visualization", layout.viz("demux.qzv")),
    ));

    // Trim and truncation lengths come from the CLI; check them against the
    // quality plot in demux.qzv before committing to a full run.
    steps.push(Step::Run(
        Stage::new("dada2-denoise", &["dada2", "denoise-paired"])
            .input("--i-demultiplexed-seqs", layout.data(DEMUX_QZA))
            .arg("--p-trim-left-f", args.trim_left_f.to_string())
            .arg("--p-trim-left-r", args.trim_left_r.to_string())
            .arg("--p-trunc-len-f", args.trunc_len_f.to_string())
            .arg("--p-trunc-len-r", args.trunc_len_r.to_string())
            .output("--o-table", layout.data(TABLE_QZA))
            .output("--o-representative-sequences", layout.data(REP_SEQS_QZA))
            .output("--o-denoising-stats", layout.data(DENOISE_STATS_QZA))
            .arg("--p-n-threads", args.denoise_threads.to_string()),
    ));

    steps.push(Step::Run(
        Stage::new("table-summarize", &["feature-table", "summarize"])
            .input("--i-table", layout.data(TABLE_QZA))
            .output("--o-visualization", layout.viz("table-dada2.qzv"))
            .arg("--m-sample-metadata-file", metadata.clone()),
    ));

    steps.push(Step::Run(
        Stage::new("tabulate-seqs", &["feature-table", "tabulate-seqs"])
            .input("--i-data", layout.data(REP_SEQS_QZA))
            .output("--o-visualization", layout.viz("rep-seqs-dada2.qzv")),
    ));

    steps.push(Step::Run(
        Stage::new("tabulate-denoise-stats", &["metadata", "tabulate"])
            .input("--m-input-file", layout.data(DENOISE_STATS_QZA))
            .output("--o-visualization", layout.viz("stats-dada2.qzv")),
    ));

    steps.push(Step::Run(
        Stage::new("classify-taxonomy", &["feature-classifier", "classify-sklearn"])
            .input("--i-classifier", layout.classifier())
            .input("--i-reads", layout.data(REP_SEQS_QZA))
            .output("--o-classification", layout.data(TAXONOMY_QZA)),
    ));

    steps.push(Step::Run(
        Stage::new("tabulate-taxonomy", &["metadata", "tabulate"])
            .input("--m-input-file", layout.data(TAXONOMY_QZA))
            .output("--o-visualization", layout.viz("taxonomy.qzv")),
    ));

    steps.push(Step::Run(
        Stage::new("taxa-barplot", &["taxa", "barplot"])
            .input("--i-table", layout.data(TABLE_QZA))
            .input("--i-taxonomy", layout.data(TAXONOMY_QZA))
            .arg("--m-metadata-file", metadata.clone())
            .output("--o-visualization", layout.viz("taxa-bar-plots.qzv")),
    ));

    steps.push(Step::Run(
        Stage::new("krona-plot", &["krona", "collapse-and-plot"])
            .input("--i-table", layout.data(TABLE_QZA))
            .input("--i-taxonomy", layout.data(TAXONOMY_QZA))
            .output("--o-krona-plot", layout.viz("krona.qzv")),
    ));

    steps.push(Step::Run(
        Stage::new("phylogeny", &["phylogeny", "align-to-tree-mafft-fasttree"])
            .input("--i-sequences", layout.data(REP_SEQS_QZA))
            .output("--o-alignment", layout.data("aligned-rep-seqs.qza"))
            .output("--o-masked-alignment", layout.data("masked-aligned-rep-seqs.qza"))
            .output("--o-tree", layout.data("unrooted-tree.qza"))
            .output("--o-rooted-tree", layout.data(ROOTED_TREE_QZA)),
    ));

    steps.push(Step::Run(
        Stage::new("alpha-rarefaction", &["diversity", "alpha-rarefaction"])
            .input("--i-table", layout.data(TABLE_QZA))
            .input("--i-phylogeny", layout.data(ROOTED_TREE_QZA))
            .arg("--p-max-depth", args.max_depth.to_string())
            .arg("--m-metadata-file", metadata.clone())
            .output("--o-visualization", layout.viz("alpha-rarefaction.qzv")),
    ));

    let core_metrics = layout.data(CORE_METRICS_DIR);

    // QIIME errors out if the core-metrics directory already exists, so this
    // is the one stage that gets the cleanup treatment.
    steps.push(Step::Run(
        Stage::new("core-metrics", &["diversity", "core-metrics-phylogenetic"])
            .input("--i-phylogeny", layout.data(ROOTED_TREE_QZA))
            .input("--i-table", layout.data(TABLE_QZA))
            .arg("--p-sampling-depth", args.sampling_depth.to_string())
            .arg("--m-metadata-file", metadata.clone())
            .output("--output-dir", core_metrics.clone())
            .needs_clean_output(),
    ));

    {
        let layout = layout.clone();
        let metadata = metadata.clone();
        steps.push(Step::Sweep {
            name: "alpha-group-significance".to_string(),
            inputs: vec![core_metrics.clone()],
            axes: vec![SweepAxis::Fixed(
                ALPHA_METRICS.iter().map(|m| m.to_string()).collect(),
            )],
            build: Box::new(move |combo| {
                let metric = &combo[0];
                Stage::new(
                    &format!("alpha-group-significance-{}", metric),
                    &["diversity", "alpha-group-significance"],
                )
                .input("--i-alpha-diversity", alpha_vector(&layout, metric))
                .arg("--m-metadata-file", metadata.clone())
                .output(
                    "--o-visualization",
                    layout.viz(&format!("{}-group-significance.qzv", metric.replace('_', "-"))),
                )
            }),
        });
    }

    // Initial beta diversity check on a single fixed pairing before the
    // full sweep further down.
    {
        let layout = layout.clone();
        let metadata = metadata.clone();
        let first_column = args
            .group_columns
            .first()
            .cloned()
            .unwrap_or_else(|| "Group".to_string());
        steps.push(Step::Sweep {
            name: "beta-group-significance".to_string(),
            inputs: vec![core_metrics.clone()],
            axes: vec![
                SweepAxis::Fixed(vec!["unweighted_unifrac".to_string()]),
                SweepAxis::Fixed(vec![first_column]),
            ],
            build: Box::new(move |combo| {
                let (matrix, column) = (&combo[0], &combo[1]);
                Stage::new(
                    &format!("beta-group-significance-{}-{}", matrix, column),
                    &["diversity", "beta-group-significance"],
                )
                .input("--i-distance-matrix", distance_matrix(&layout, matrix))
                .arg("--m-metadata-file", metadata.clone())
                .arg("--m-metadata-column", column.clone())
                .output(
                    "--o-visualization",
                    layout.viz(&format!(
                        "{}-{}-significance.qzv",
                        matrix.replace('_', "-"),
                        column
                    )),
                )
                .flag("--p-pairwise")
            }),
        });
    }

    let ancombc2_results = layout.data(&format!(
        "ancombc2-{}-results.qza",
        args.fixed_effects_formula
    ));

    steps.push(Step::Run(
        Stage::new("ancombc2", &["composition", "ancombc2"])
            .input("--i-table", layout.data(TABLE_QZA))
            .arg("--m-metadata-file", metadata.clone())
            .arg("--p-fixed-effects-formula", args.fixed_effects_formula.clone())
            .output("--o-ancombc2-output", ancombc2_results.clone()),
    ));

    steps.push(Step::Run(
        Stage::new("ancombc2-visualizer", &["composition", "ancombc2-visualizer"])
            .input("--i-data", ancombc2_results)
            .input("--i-taxonomy", layout.data(TAXONOMY_QZA))
            .output(
                "--o-visualization",
                layout.viz(&format!("ancombc2-{}.qzv", args.fixed_effects_formula)),
            ),
    ));

    // Every distance matrix core-metrics produced, against every grouping
    // column, with both methods.
    {
        let layout = layout.clone();
        let metadata = metadata.clone();
        steps.push(Step::Sweep {
            name: "beta-diversity-tests".to_string(),
            inputs: vec![core_metrics.clone()],
            axes: vec![
                SweepAxis::DirSuffix {
                    dir: layout.core_metrics_dir(),
                    suffix: DISTANCE_MATRIX_SUFFIX.to_string(),
                },
                SweepAxis::Fixed(args.group_columns.clone()),
                SweepAxis::Fixed(BETA_METHODS.iter().map(|m| m.to_string()).collect()),
            ],
            build: Box::new(move |combo| {
                let (matrix, column, method) = (&combo[0], &combo[1], &combo[2]);
                Stage::new(
                    &format!("{}-{}-{}", method, matrix, column),
                    &["diversity", "beta-group-significance"],
                )
                .input("--i-distance-matrix", distance_matrix(&layout, matrix))
                .arg("--m-metadata-file", metadata.clone())
                .arg("--m-metadata-column", column.clone())
                .arg("--p-method", method.clone())
                .output(
                    "--o-visualization",
                    layout.viz(&format!("{}_{}_{}.qzv", method, matrix, column)),
                )
            }),
        });
    }

    // Decomposed exports for downstream construction outside the toolkit
    steps.push(Step::Run(
        Stage::new("export-tree", &["tools", "export"])
            .input("--input-path", layout.data(ROOTED_TREE_QZA))
            .output("--output-path", layout.data(EXPORTED_TREE_DIR)),
    ));

    steps.push(Step::Run(
        Stage::new("export-taxonomy", &["tools", "export"])
            .input("--input-path", layout.data(TAXONOMY_QZA))
            .output("--output-path", layout.data(EXPORTED_TAXONOMY_DIR)),
    ));

    steps
}

/// A distance matrix artifact inside the core-metrics directory.
fn distance_matrix(layout: &PathLayout, base: &str) -> ArtifactRef {
    let name = format!("{}{}", base, DISTANCE_MATRIX_SUFFIX);
    ArtifactRef {
        path: layout.core_metrics_dir().join(&name),
        name,
        kind: ArtifactKind::Data,
    }
}

/// An alpha diversity vector inside the core-metrics directory.
fn alpha_vector(layout: &PathLayout, metric: &str) -> ArtifactRef {
    let name = format!("{}{}", metric, ALPHA_VECTOR_SUFFIX);
    ArtifactRef {
        path: layout.core_metrics_dir().join(&name),
        name,
        kind: ArtifactKind::Data,
    }
}

/// Checks that every declared input of every step was declared as an output
/// by an earlier step, or is one of the `external` paths supplied from
/// outside the workflow (classifier model, pre-built artifacts). Pure, so
/// the shipped plan can be audited in tests without touching a filesystem.
pub fn verify_artifact_threading(steps: &[Step], external: &[PathBuf]) -> Result<(), String> {
    let mut produced: HashSet<PathBuf> = external.iter().cloned().collect();
    for step in steps {
        match step {
            Step::Run(stage) => {
                for input in &stage.inputs {
                    if !produced.contains(&input.path) {
                        return Err(format!(
                            "Stage '{}' consumes '{}' before any stage produces it",
                            stage.name, input.name
                        ));
                    }
                }
                produced.extend(stage.outputs.iter().map(|o| o.path.clone()));
            }
            Step::Sweep { name, inputs, .. } => {
                for input in inputs {
                    if !produced.contains(&input.path) {
                        return Err(format!(
                            "Sweep '{}' consumes '{}' before any stage produces it",
                            name, input.name
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}
