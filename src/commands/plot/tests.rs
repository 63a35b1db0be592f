use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::json;

use super::*;
use crate::config::PipelineConfig;
use crate::model::{MetricSelector, ReductionMode};
use crate::plot::{ChartRenderer, ChartRequest};
use crate::results::tests::write_result_file;

const LARGE_TOPK: &str = "saebench_gemma-2-2b_width-2pow16_date-0108_TopKTrainer_trainer";
const SMALL_TOPK: &str = "saebench_gemma-2-2b_width-2pow14_date-0108_TopKTrainer_trainer";
const LARGE_MATRYOSHKA: &str = "matryoshka_gemma-2-2b-16k-v2_MatryoshkaBatchTopKTrainer_65k_temp1000_google_gemma-2-2b_ctx1024_0117_resid_post_layer_12_trainer_0";
const SMALL_MATRYOSHKA: &str = "matryoshka_gemma-2-2b-16k-v2_MatryoshkaBatchTopKTrainer_notemp_google_gemma-2-2b_ctx1024_0114_resid_post_layer_12_trainer_0";

#[derive(Default)]
struct RecordingRenderer {
    calls: Vec<(PathBuf, ChartRequest)>,
}

impl RecordingRenderer {
    fn chart(&self, suffix: &str) -> &ChartRequest {
        self.calls
            .iter()
            .find(|(path, _)| path.to_string_lossy().ends_with(suffix))
            .map(|(_, request)| request)
            .unwrap_or_else(|| panic!("no chart ending with {suffix}"))
    }
}

impl ChartRenderer for RecordingRenderer {
    fn render(&mut self, request: &ChartRequest, path: &Path) -> Result<()> {
        self.calls.push((path.to_path_buf(), request.clone()));
        Ok(())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    config: PipelineConfig,
}

fn write_sae(root: &Path, identifier: &str, scr: serde_json::Value, absorption: f64, l0: f64) {
    write_result_file(&root.join("scr"), identifier, json!({ "scr_metrics": scr }));
    write_result_file(
        &root.join("absorption"),
        identifier,
        json!({ "mean": { "mean_absorption_fraction_score": absorption } }),
    );
    write_result_file(
        &root.join("core"),
        identifier,
        json!({
            "sparsity": { "l0": l0 },
            "model_performance_preservation": { "ce_loss_score": 0.9 }
        }),
    );
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let graphing = dir.path().join("graphing");
    let matryoshka = dir.path().join("matryoshka");

    write_sae(
        &graphing,
        &format!("{LARGE_TOPK}_0"),
        json!({ "scr_metric_threshold_5": 0.3, "scr_metric_threshold_10": 0.5 }),
        0.2,
        20.0,
    );
    write_sae(
        &graphing,
        &format!("{SMALL_TOPK}_0"),
        json!({ "scr_metric_threshold_5": 0.1, "scr_metric_threshold_10": 0.3 }),
        0.4,
        22.0,
    );
    write_sae(
        &graphing,
        &format!("{LARGE_TOPK}_1"),
        json!({ "scr_metric_threshold_5": 0.6 }),
        0.1,
        80.0,
    );
    write_sae(
        &graphing,
        &format!("{SMALL_TOPK}_1"),
        json!({ "scr_metric_threshold_5": 0.5 }),
        0.15,
        85.0,
    );
    // Intermediate checkpoint; must be filtered out of the large width.
    write_sae(
        &graphing,
        &format!("{LARGE_TOPK}_0_step_1000"),
        json!({ "scr_metric_threshold_5": 9.0 }),
        0.9,
        5.0,
    );
    write_sae(
        &matryoshka,
        LARGE_MATRYOSHKA,
        json!({ "scr_metric_threshold_5": 0.45, "scr_metric_threshold_10": 0.55 }),
        0.05,
        40.0,
    );
    write_sae(
        &matryoshka,
        SMALL_MATRYOSHKA,
        json!({ "scr_metric_threshold_5": 0.25, "scr_metric_threshold_10": 0.35 }),
        0.1,
        41.0,
    );

    let config = PipelineConfig {
        results_folders: vec![graphing, matryoshka],
        eval_types: vec!["scr".to_string(), "absorption".to_string()],
        output_dir: dir.path().join("images"),
        ..PipelineConfig::default()
    };

    Fixture { _dir: dir, config }
}

fn quiet() -> RunOptions {
    RunOptions {
        emit_json: false,
        show_progress: false,
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn pipeline_renders_mean_max_and_fixed_charts() {
    let fixture = fixture();
    let mut renderer = RecordingRenderer::default();

    let written = run_pipeline(&fixture.config, &quiet(), &mut renderer).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "plot_diff_sae_bench_gemma-2-2b_width_diff_series_scr_layer_12_mean.png",
            "plot_diff_sae_bench_gemma-2-2b_width_diff_series_scr_layer_12_max.png",
            "plot_diff_sae_bench_gemma-2-2b_width_diff_series_absorption_layer_12.png",
        ]
    );
    assert!(fixture.config.output_dir.is_dir());
    assert!(written.iter().all(|path| path.starts_with(&fixture.config.output_dir)));
}

#[test]
fn reduced_differences_use_mapped_counterparts() {
    let fixture = fixture();
    let mut renderer = RecordingRenderer::default();
    run_pipeline(&fixture.config, &quiet(), &mut renderer).unwrap();

    let mean = renderer.chart("scr_layer_12_mean.png");
    assert_eq!(mean.target_metric, "scr_metric_threshold_mean");
    assert_eq!(mean.y_label, "SCR Top Mean Metric");
    assert!(mean.title.is_empty());
    assert_eq!(mean.record.len(), 3);
    assert!(!mean.record.contains_key(&format!("{LARGE_TOPK}_0_step_1000")));

    let topk0 = &mean.record[&format!("{LARGE_TOPK}_0")];
    assert_close(topk0["scr_metric_threshold_mean"], 0.4 - 0.2);
    // Non-target metrics come from the large width untouched.
    assert_close(topk0["l0"], 20.0);
    assert_close(topk0["scr_metric_threshold_5"], 0.3);

    assert_close(
        mean.record[&format!("{LARGE_TOPK}_1")]["scr_metric_threshold_mean"],
        0.1,
    );
    assert_close(
        mean.record[LARGE_MATRYOSHKA]["scr_metric_threshold_mean"],
        0.5 - 0.3,
    );

    let max = renderer.chart("scr_layer_12_max.png");
    assert_close(
        max.record[&format!("{LARGE_TOPK}_0")]["scr_metric_threshold_max"],
        0.5 - 0.3,
    );
}

#[test]
fn absorption_scores_are_inverted_before_diffing() {
    let fixture = fixture();
    let mut renderer = RecordingRenderer::default();
    run_pipeline(&fixture.config, &quiet(), &mut renderer).unwrap();

    let chart = renderer.chart("absorption_layer_12.png");
    let value = chart.record[&format!("{LARGE_TOPK}_0")]["mean_absorption_fraction_score"];
    // (1 - 0.2) - (1 - 0.4)
    assert_close(value, 0.2);
}

#[test]
fn charts_are_drawn_without_baseline_when_disabled() {
    let fixture = fixture();
    let mut renderer = RecordingRenderer::default();
    run_pipeline(&fixture.config, &quiet(), &mut renderer).unwrap();

    assert_eq!(renderer.calls.len(), 3);
    for (_, chart) in &renderer.calls {
        assert_eq!(chart.baseline_value, None);
        assert_eq!(chart.baseline_label, None);
        assert!(chart.connect_points);
        assert!(chart.bold_x0);
    }
}

#[test]
fn baseline_is_reduced_and_oriented_like_the_series() {
    let fixture = fixture();
    let graphing = &fixture.config.results_folders[0];
    write_sae(
        graphing,
        "gemma-2-2b_layer_12_pca_sae_custom_sae",
        json!({ "scr_metric_threshold_5": 0.05, "scr_metric_threshold_10": 0.15 }),
        0.7,
        60.0,
    );
    let config = PipelineConfig {
        include_baseline: true,
        ..fixture.config.clone()
    };

    let mut renderer = RecordingRenderer::default();
    run_pipeline(&config, &quiet(), &mut renderer).unwrap();

    let mean = renderer.chart("scr_layer_12_mean.png");
    assert_close(mean.baseline_value.unwrap(), 0.1);
    assert_eq!(mean.baseline_label.as_deref(), Some("PCA Baseline"));

    let max = renderer.chart("scr_layer_12_max.png");
    assert_close(max.baseline_value.unwrap(), 0.15);

    let absorption = renderer.chart("absorption_layer_12.png");
    assert_close(absorption.baseline_value.unwrap(), 1.0 - 0.7);
}

#[test]
fn missing_small_counterpart_aborts_the_run() {
    let fixture = fixture();
    let graphing = &fixture.config.results_folders[0];
    std::fs::remove_file(
        graphing
            .join("scr")
            .join(format!("{SMALL_TOPK}_1_eval_results.json")),
    )
    .unwrap();

    let mut renderer = RecordingRenderer::default();
    let err = run_pipeline(&fixture.config, &quiet(), &mut renderer).unwrap_err();

    assert!(format!("{err:#}").contains("no small-width counterpart"));
    assert!(renderer.calls.is_empty());
}

#[test]
fn missing_core_results_abort_the_run() {
    let fixture = fixture();
    let graphing = &fixture.config.results_folders[0];
    std::fs::remove_file(
        graphing
            .join("core")
            .join(format!("{LARGE_TOPK}_1_eval_results.json")),
    )
    .unwrap();

    let mut renderer = RecordingRenderer::default();
    let err = run_pipeline(&fixture.config, &quiet(), &mut renderer).unwrap_err();
    assert!(format!("{err:#}").contains("core results missing"));
}

#[test]
fn emit_json_writes_difference_data_next_to_chart() {
    let fixture = fixture();
    let options = RunOptions {
        emit_json: true,
        show_progress: false,
    };
    let mut renderer = RecordingRenderer::default();
    let written = run_pipeline(&fixture.config, &options, &mut renderer).unwrap();

    let data_path = written[0].with_extension("json");
    let raw = std::fs::read(&data_path).unwrap();
    let data: crate::model::ResultRecord = serde_json::from_slice(&raw).unwrap();
    assert_eq!(data, renderer.calls[0].1.record);
}

#[test]
fn image_names_follow_mode() {
    let config = PipelineConfig::default();
    assert_eq!(
        image_name(
            &config,
            "tpp",
            MetricSelector::Reduced(ReductionMode::Max)
        ),
        "plot_diff_sae_bench_gemma-2-2b_width_diff_series_tpp_layer_12_max.png"
    );
    assert_eq!(
        image_name(&config, "absorption", MetricSelector::Fixed),
        "plot_diff_sae_bench_gemma-2-2b_width_diff_series_absorption_layer_12.png"
    );
}

#[test]
fn width_results_merge_core_metrics() {
    let fixture = fixture();
    let loaded = load_width_results(&fixture.config, "scr").unwrap();

    assert_eq!(loaded.large.len(), 3);
    assert_eq!(loaded.small.len(), 3);
    assert_close(loaded.small[SMALL_MATRYOSHKA]["l0"], 41.0);
    assert_close(loaded.small[SMALL_MATRYOSHKA]["frac_recovered"], 0.9);
}

#[test]
fn build_chart_for_fixed_type_keeps_raw_metric() {
    let fixture = fixture();
    let loaded = load_width_results(&fixture.config, "absorption").unwrap();
    let chart = build_chart(&fixture.config, "absorption", MetricSelector::Fixed, &loaded).unwrap();

    assert_eq!(chart.target_metric, "mean_absorption_fraction_score");
    assert_eq!(chart.x_metric, "l0");
    // Inversion happens on working copies only.
    assert_close(
        loaded.large[&format!("{LARGE_TOPK}_0")]["mean_absorption_fraction_score"],
        0.2,
    );
}
