use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::PipelineConfig;
use crate::model::{MetricSelector, ReductionMode};
use crate::reduce::reduce_over_k;
use crate::results::{
    CORE_EVAL_TYPE, get_core_results, get_eval_results, identifier_from_path, merge_core_results,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub value: f64,
    pub label: String,
}

pub fn baseline_eval_path(config: &PipelineConfig, eval_type: &str) -> PathBuf {
    config.baseline_folder().join(eval_type).join(format!(
        "{}_layer_{}_{}_custom_sae_eval_results.json",
        config.model_name, config.layer, config.baseline_type
    ))
}

pub fn baseline_core_path(eval_path: &Path) -> Option<PathBuf> {
    let file_name = eval_path.file_name()?;
    let eval_dir = eval_path.parent()?;
    Some(eval_dir.parent()?.join(CORE_EVAL_TYPE).join(file_name))
}

/// The raw value is returned; orientation is applied by the caller together
/// with the main series.
pub fn resolve_baseline(
    config: &PipelineConfig,
    eval_type: &str,
    selector: MetricSelector,
    target_metric: &str,
) -> Result<Option<Baseline>> {
    if !config.baseline_enabled() {
        return Ok(None);
    }

    let eval_path = baseline_eval_path(config, eval_type);
    let core_path = baseline_core_path(&eval_path)
        .with_context(|| format!("invalid baseline path: {}", eval_path.display()))?;
    if !eval_path.is_file() {
        anyhow::bail!("baseline results not found: {}", eval_path.display());
    }

    let identifier = identifier_from_path(&eval_path)?;
    let mut record = get_eval_results(std::slice::from_ref(&eval_path))?;
    let core = get_core_results(std::slice::from_ref(&core_path))
        .with_context(|| format!("failed to load baseline core results: {}", core_path.display()))?;
    merge_core_results(&mut record, &core)?;

    if let (MetricSelector::Reduced(mode), Some(ks)) = (selector, config.ks_for(eval_type)) {
        record = reduce_over_k(&record, eval_type, ks, mode, config.missing_k_policy)?;
    }

    let value = record
        .get(&identifier)
        .and_then(|metrics| metrics.get(target_metric))
        .copied()
        .with_context(|| {
            format!(
                "baseline {identifier} has no metric {target_metric} ({})",
                eval_path.display()
            )
        })?;

    info!(
        eval_type = %eval_type,
        mode = %mode_label(selector),
        value,
        "resolved baseline"
    );

    Ok(Some(Baseline {
        value,
        label: config.baseline_label.clone(),
    }))
}

fn mode_label(selector: MetricSelector) -> &'static str {
    match selector {
        MetricSelector::Reduced(ReductionMode::Mean) => "mean",
        MetricSelector::Reduced(ReductionMode::Max) => "max",
        MetricSelector::K(_) | MetricSelector::Fixed => "raw",
    }
}
