use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::{build_chart, image_name, load_width_results};
use crate::cli::PlotArgs;
use crate::config::PipelineConfig;
use crate::model::{MetricSelector, ReductionMode};
use crate::plot::{ChartRenderer, PngChartRenderer};
use crate::util::{ensure_directory, write_json_pretty};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub emit_json: bool,
    pub show_progress: bool,
}

pub fn run(args: PlotArgs) -> Result<()> {
    let mut config = PipelineConfig::load_or_default(args.config.as_deref())?;
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if args.include_baseline {
        config.include_baseline = true;
    }

    info!(
        model = %config.model_name,
        layer = config.layer,
        eval_types = config.eval_types.len(),
        baseline = config.baseline_enabled(),
        "starting width-difference plots"
    );

    let options = RunOptions {
        emit_json: args.emit_json,
        show_progress: !args.no_progress,
    };
    let mut renderer = PngChartRenderer::default();
    let written = run_pipeline(&config, &options, &mut renderer)?;

    info!(
        charts = written.len(),
        output_dir = %config.output_dir.display(),
        "plotting completed"
    );
    Ok(())
}

pub fn run_pipeline(
    config: &PipelineConfig,
    options: &RunOptions,
    renderer: &mut dyn ChartRenderer,
) -> Result<Vec<PathBuf>> {
    ensure_directory(&config.output_dir)?;

    let progress = progress_bar(config.eval_types.len(), options.show_progress)?;
    let mut written = Vec::new();

    for eval_type in &config.eval_types {
        progress.set_message(eval_type.clone());
        let paths = plot_eval_type(config, options, eval_type, renderer)
            .with_context(|| format!("failed to plot eval type {eval_type}"))?;
        written.extend(paths);
        progress.inc(1);
    }

    progress.finish_with_message("done");
    Ok(written)
}

fn plot_eval_type(
    config: &PipelineConfig,
    options: &RunOptions,
    eval_type: &str,
    renderer: &mut dyn ChartRenderer,
) -> Result<Vec<PathBuf>> {
    let loaded = load_width_results(config, eval_type)?;

    let selectors: Vec<MetricSelector> = match config.ks_for(eval_type) {
        Some(_) => ReductionMode::ALL
            .into_iter()
            .map(MetricSelector::Reduced)
            .collect(),
        None => vec![MetricSelector::Fixed],
    };

    let mut written = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let chart = build_chart(config, eval_type, selector, &loaded)
            .with_context(|| format!("failed to build {eval_type} chart for {selector}"))?;
        let path = config.output_dir.join(image_name(config, eval_type, selector));

        renderer.render(&chart, &path)?;
        if options.emit_json {
            let data_path = path.with_extension("json");
            write_json_pretty(&data_path, &chart.record)?;
            info!(path = %data_path.display(), "wrote difference data");
        }
        written.push(path);
    }

    Ok(written)
}

fn progress_bar(len: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .context("invalid progress bar template")?
        .progress_chars("#>-");
    Ok(ProgressBar::new(len as u64).with_style(style))
}
