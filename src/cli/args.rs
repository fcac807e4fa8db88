use clap::Parser;
use crate::config::defs::QIIME_TAG;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ampliseq-pipelines", version = "0.1")]
pub struct Arguments {

    #[arg(short, long)]
    pub module: String,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(short = 'p', long = "project-root", help = "Project root holding data/ and reference/")]
    pub project_root: String,

    #[arg(short = 'b', long = "batch", help = "Batch serial (e.g. 20250905); selects data/raw/<batch> and data/processed/<batch>")]
    pub batch: String,

    #[arg(long, help = "Override the raw reads directory. If not specified, <project-root>/data/raw/<batch> is used.")]
    pub raw_dir: Option<String>,

    #[arg(long, help = "Use a pre-built manifest instead of scanning the raw reads directory")]
    pub manifest: Option<String>,

    #[arg(long, help = "Sample metadata file. Defaults to metadata.tsv in the raw reads directory.")]
    pub metadata: Option<String>,

    #[arg(long, help = "Taxonomy classifier artifact. Defaults to the SILVA classifier under <project-root>/reference.")]
    pub classifier: Option<String>,

    #[arg(long, default_value = QIIME_TAG, help = "QIIME 2 executable to invoke")]
    pub qiime_path: String,

    #[arg(long, default_value_t = 10)]
    pub trim_left_f: usize,

    #[arg(long, default_value_t = 10)]
    pub trim_left_r: usize,

    #[arg(long, default_value_t = 240)]
    pub trunc_len_f: usize,

    #[arg(long, default_value_t = 240)]
    pub trunc_len_r: usize,

    #[arg(long, default_value_t = 0, help = "Threads for denoising; 0 uses all available cores")]
    pub denoise_threads: usize,

    #[arg(long, default_value_t = 30000, help = "Sampling depth for core diversity metrics")]
    pub sampling_depth: usize,

    #[arg(long, default_value_t = 30000, help = "Maximum depth for the alpha rarefaction curve")]
    pub max_depth: usize,

    #[clap(
        long,
        value_delimiter = ',',
        default_value = "Group,MainType,Modifier",
        help = "Comma-separated metadata columns tested for group significance"
    )]
    pub group_columns: Vec<String>,

    #[arg(long, default_value = "MainType", help = "Fixed effects formula for differential abundance testing")]
    pub fixed_effects_formula: String,
}
