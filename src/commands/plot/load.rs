use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::PipelineConfig;
use crate::model::ResultRecord;
use crate::results::{
    CORE_EVAL_TYPE, FilterPattern, filter_with_patterns, find_eval_results_files,
    get_core_results, get_eval_results, merge_core_results,
};

#[derive(Debug, Clone)]
pub struct WidthResults {
    pub large: ResultRecord,
    pub small: ResultRecord,
}

pub fn load_width_results(config: &PipelineConfig, eval_type: &str) -> Result<WidthResults> {
    let eval_folders = subfolders(&config.results_folders, eval_type);
    let core_folders = subfolders(&config.results_folders, CORE_EVAL_TYPE);

    let eval_files = find_eval_results_files(&eval_folders)?;
    let core_files = find_eval_results_files(&core_folders)?;

    let large = load_variant(&eval_files, &core_files, &config.large_patterns)
        .with_context(|| format!("failed to load large-width {eval_type} results"))?;
    let small = load_variant(&eval_files, &core_files, &config.small_patterns)
        .with_context(|| format!("failed to load small-width {eval_type} results"))?;

    info!(
        eval_type = %eval_type,
        large = large.len(),
        small = small.len(),
        "loaded width results"
    );

    Ok(WidthResults { large, small })
}

fn subfolders(roots: &[PathBuf], name: &str) -> Vec<PathBuf> {
    roots.iter().map(|root| root.join(name)).collect()
}

fn load_variant(
    eval_files: &[PathBuf],
    core_files: &[PathBuf],
    patterns: &[FilterPattern],
) -> Result<ResultRecord> {
    let mut eval = get_eval_results(&filter_with_patterns(eval_files, patterns)?)?;
    let core = get_core_results(&filter_with_patterns(core_files, patterns)?)?;
    merge_core_results(&mut eval, &core)?;
    Ok(eval)
}
