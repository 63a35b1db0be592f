use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "saebench-widthdiff",
    version,
    about = "Width-difference plots for SAE Bench evaluation results"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Plot(PlotArgs),
    Inventory(InventoryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PlotArgs {
    /// JSON pipeline config; built-in defaults are used when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub include_baseline: bool,

    /// Also write each difference record as JSON next to its chart.
    #[arg(long, default_value_t = false)]
    pub emit_json: bool,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}
