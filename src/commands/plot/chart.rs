use anyhow::Result;

use super::WidthResults;
use crate::baseline::resolve_baseline;
use crate::config::PipelineConfig;
use crate::diff::difference;
use crate::metrics::{is_lower_better, metric_key_and_name};
use crate::model::{MetricSelector, ReductionMode, ResultRecord};
use crate::plot::{ChartRequest, LegendMode};
use crate::reduce::{
    get_max_metric_over_k, get_mean_metric_over_k, invert_baseline, invert_scores,
};
use crate::util::title_slug;

/// Builds the difference chart for one eval type and selector.
///
/// Order matters: reduce over k, resolve the baseline, flip lower-is-better
/// scores, then diff the large width against its mapped small-width twin.
pub fn build_chart(
    config: &PipelineConfig,
    eval_type: &str,
    selector: MetricSelector,
    loaded: &WidthResults,
) -> Result<ChartRequest> {
    let (target, display_name) = metric_key_and_name(eval_type, selector)?;

    let (mut large, mut small) = match (selector, config.ks_for(eval_type)) {
        (MetricSelector::Reduced(mode), Some(ks)) => (
            reduce_width(config, &loaded.large, eval_type, ks, mode)?,
            reduce_width(config, &loaded.small, eval_type, ks, mode)?,
        ),
        _ => (loaded.large.clone(), loaded.small.clone()),
    };

    let baseline = resolve_baseline(config, eval_type, selector, &target)?;
    let mut baseline_value = baseline.as_ref().map(|b| b.value);

    if is_lower_better(&target) {
        invert_scores(&mut large, &target);
        invert_scores(&mut small, &target);
        baseline_value = invert_baseline(baseline_value);
    }

    let record = difference(&large, &small, &target, &config.name_mapping)?;

    Ok(ChartRequest {
        record,
        target_metric: target,
        x_metric: config.x_axis_metric.clone(),
        y_label: display_name,
        title: String::new(),
        baseline_value,
        baseline_label: baseline.map(|b| b.label),
        legend_mode: LegendMode::ShowOutside,
        connect_points: true,
        bold_x0: true,
    })
}

fn reduce_width(
    config: &PipelineConfig,
    record: &ResultRecord,
    eval_type: &str,
    ks: &[i64],
    mode: ReductionMode,
) -> Result<ResultRecord> {
    let reduced = match mode {
        ReductionMode::Mean => {
            get_mean_metric_over_k(record, eval_type, ks, config.missing_k_policy)?
        }
        ReductionMode::Max => get_max_metric_over_k(record, eval_type, ks, config.missing_k_policy)?,
    };
    Ok(reduced)
}

pub fn image_name(config: &PipelineConfig, eval_type: &str, selector: MetricSelector) -> String {
    let slug = title_slug(&config.selection_title);
    match selector {
        MetricSelector::Reduced(mode) => format!(
            "plot_diff_{slug}_{eval_type}_layer_{}_{}.png",
            config.layer,
            mode.as_str()
        ),
        MetricSelector::K(k) => {
            format!("plot_diff_{slug}_{eval_type}_layer_{}_k{k}.png", config.layer)
        }
        MetricSelector::Fixed => format!("plot_diff_{slug}_{eval_type}_layer_{}.png", config.layer),
    }
}
