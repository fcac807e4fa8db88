mod pipelines;
mod utils;
mod config;
mod cli;

use std::env;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use env_logger::Builder;
use log::{self, LevelFilter, error, info};

use crate::cli::parse;
use crate::config::defs::{PipelineError, RunConfig};
use crate::utils::layout::PathLayout;
use crate::utils::manifest;
use pipelines::amplicon;

#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n AmpliSeq\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}\n", dir);

    let layout = PathLayout::new(&args, &dir);
    layout.prepare()?;

    let module = args.module.clone();
    let run_config = Arc::new(RunConfig {
        cwd: dir,
        layout,
        args,
    });

    if let Err(e) = match module.as_str() {
        "amplicon" => amplicon_run(run_config).await,
        "manifest" => manifest_run(run_config),
        _ => Err(PipelineError::InvalidConfig(format!(
            "Invalid module: {}",
            module
        ))),
    } {
        error!(
            "Pipeline failed: {} at {} milliseconds.",
            e,
            run_start.elapsed().as_millis()
        );
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}

async fn amplicon_run(run_config: Arc<RunConfig>) -> Result<(), PipelineError> {
    amplicon::run(run_config).await
}

/// Writes the sample manifest without invoking the toolkit, for checking
/// which folders qualify before committing to a full run.
fn manifest_run(run_config: Arc<RunConfig>) -> Result<(), PipelineError> {
    let records = manifest::build(
        &run_config.layout.raw_dir,
        &run_config.layout.manifest_file,
    )?;
    info!(
        "Manifest written to {:?} with {} samples",
        run_config.layout.manifest_file,
        records.len()
    );
    Ok(())
}
