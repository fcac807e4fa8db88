/// Stage definitions and execution of external toolkit invocations

use log::{debug, info};
use tokio::process::Command;

use crate::config::defs::{ArtifactRef, PipelineError, RunConfig};
use crate::utils::cleanup::ensure_clean;

/// One external toolkit invocation with its declared artifact flow.
///
/// `args` keeps flag/value pairs in insertion order; a value-less flag
/// (e.g. `--p-pairwise`) carries `None`. Inputs and outputs record which
/// artifacts the stage consumes and produces so the plan can be audited
/// without running anything.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub subcommand: Vec<String>,
    pub args: Vec<(String, Option<String>)>,
    pub inputs: Vec<ArtifactRef>,
    pub outputs: Vec<ArtifactRef>,
    pub requires_clean_output_dir: bool,
}

impl Stage {
    pub fn new(name: &str, subcommand: &[&str]) -> Self {
        Stage {
            name: name.to_string(),
            subcommand: subcommand.iter().map(|s| s.to_string()).collect(),
            args: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            requires_clean_output_dir: false,
        }
    }

    pub fn arg(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.args.push((flag.to_string(), Some(value.into())));
        self
    }

    /// A flag with no value.
    pub fn flag(mut self, flag: &str) -> Self {
        self.args.push((flag.to_string(), None));
        self
    }

    /// Declares `artifact` as an input and passes its path under `flag`.
    pub fn input(mut self, flag: &str, artifact: ArtifactRef) -> Self {
        self.args.push((
            flag.to_string(),
            Some(artifact.path.to_string_lossy().into_owned()),
        ));
        self.inputs.push(artifact);
        self
    }

    /// Declares `artifact` as an output and passes its path under `flag`.
    pub fn output(mut self, flag: &str, artifact: ArtifactRef) -> Self {
        self.args.push((
            flag.to_string(),
            Some(artifact.path.to_string_lossy().into_owned()),
        ));
        self.outputs.push(artifact);
        self
    }

    /// Marks the stage as refusing to run over a pre-existing output
    /// location; declared outputs are removed before execution.
    pub fn needs_clean_output(mut self) -> Self {
        self.requires_clean_output_dir = true;
        self
    }

    /// Full argument vector handed to the toolkit binary.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.subcommand.clone();
        for (flag, value) in &self.args {
            argv.push(flag.clone());
            if let Some(value) = value {
                argv.push(value.clone());
            }
        }
        argv
    }
}

/// Runs one stage to completion.
///
/// Output is neither captured nor inspected; the invocation is an opaque
/// pass/fail leaf and there is no timeout. A non-zero exit halts the whole
/// pipeline via the returned error.
///
/// # Arguments
/// * `config` - RunConfig struct from main.
/// * `stage` - The stage to execute.
pub async fn run_stage(config: &RunConfig, stage: &Stage) -> Result<(), PipelineError> {
    if stage.requires_clean_output_dir {
        for output in &stage.outputs {
            ensure_clean(&output.path)?;
        }
    }

    let argv = stage.argv();
    info!("Running stage: {}", stage.name);
    debug!("{} {}", config.args.qiime_path, argv.join(" "));

    let status = Command::new(&config.args.qiime_path)
        .args(&argv)
        .status()
        .await
        .map_err(|e| PipelineError::ToolSpawn {
            stage: stage.name.clone(),
            tool: config.args.qiime_path.clone(),
            source: e,
        })?;

    if !status.success() {
        return Err(PipelineError::ToolExecution {
            stage: stage.name.clone(),
            args: argv,
            status,
        });
    }
    Ok(())
}
