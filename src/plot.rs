use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use regex::Regex;
use tracing::{info, warn};

use crate::model::ResultRecord;

const LEGEND_FRACTION: f64 = 0.72;
const POINT_RADIUS: i32 = 4;
const BASELINE_DASH: (i32, i32) = (6, 4);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LegendMode {
    ShowOutside,
    ShowInside,
    Hidden,
}

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub record: ResultRecord,
    pub target_metric: String,
    pub x_metric: String,
    pub y_label: String,
    pub title: String,
    pub baseline_value: Option<f64>,
    pub baseline_label: Option<String>,
    pub legend_mode: LegendMode,
    pub connect_points: bool,
    pub bold_x0: bool,
}

pub trait ChartRenderer {
    fn render(&mut self, request: &ChartRequest, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

pub fn collect_series(request: &ChartRequest) -> Result<Vec<Series>> {
    let trainer_suffix =
        Regex::new(r"_trainer_\d+$").context("failed to compile trainer suffix regex")?;

    let mut families: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    for (identifier, metrics) in &request.record {
        let (Some(&x), Some(&y)) = (
            metrics.get(&request.x_metric),
            metrics.get(&request.target_metric),
        ) else {
            warn!(
                identifier = %identifier,
                x_metric = %request.x_metric,
                target_metric = %request.target_metric,
                "skipping autoencoder without plot metrics"
            );
            continue;
        };
        let family = trainer_suffix.replace(identifier, "").into_owned();
        families.entry(family).or_default().push((x, y));
    }

    Ok(families
        .into_iter()
        .map(|(label, mut points)| {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            Series { label, points }
        })
        .collect())
}

pub fn axis_ranges(
    series: &[Series],
    baseline: Option<f64>,
    include_zero: bool,
) -> ((f64, f64), (f64, f64)) {
    let points = series.iter().flat_map(|s| s.points.iter().copied());
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
    );
    for (x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    for extra in baseline.into_iter().chain(include_zero.then_some(0.0)) {
        y_min = y_min.min(extra);
        y_max = y_max.max(extra);
    }
    (padded(x_min, x_max), padded(y_min, y_max))
}

fn padded(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span <= f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    (min - span * 0.05, max + span * 0.05)
}

fn axis_label(metric: &str) -> String {
    match metric {
        "l0" => "L0 Sparsity".to_string(),
        other => other.to_string(),
    }
}

#[derive(Copy, Clone, Debug)]
enum LegendMarker {
    Point,
    Line,
}

#[derive(Debug, Clone)]
pub struct PngChartRenderer {
    pub size: (u32, u32),
}

impl Default for PngChartRenderer {
    fn default() -> Self {
        Self { size: (1000, 600) }
    }
}

impl ChartRenderer for PngChartRenderer {
    fn render(&mut self, request: &ChartRequest, path: &Path) -> Result<()> {
        let series = collect_series(request)?;
        if series.is_empty() {
            warn!(path = %path.display(), "no plottable autoencoders; writing empty chart");
        }

        draw_png(request, &series, path, self.size)
            .map_err(|err| anyhow!("failed to render chart {}: {err}", path.display()))?;

        info!(path = %path.display(), series = series.len(), "wrote chart");
        Ok(())
    }
}

fn draw_png(
    request: &ChartRequest,
    series: &[Series],
    path: &Path,
    size: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let (plot_area, legend_area) = match request.legend_mode {
        LegendMode::ShowOutside => {
            let split = (f64::from(size.0) * LEGEND_FRACTION) as u32;
            let (plot, legend) = root.split_horizontally(split);
            (plot, Some(legend))
        }
        LegendMode::ShowInside | LegendMode::Hidden => (root.clone(), None),
    };

    let ((x_min, x_max), (y_min, y_max)) =
        axis_ranges(series, request.baseline_value, request.bold_x0);

    let mut builder = ChartBuilder::on(&plot_area);
    builder
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70);
    if !request.title.is_empty() {
        builder.caption(&request.title, ("sans-serif", 28).into_font());
    }
    let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(axis_label(&request.x_metric))
        .y_desc(&request.y_label)
        .draw()?;

    if request.bold_x0 {
        chart.draw_series(LineSeries::new(
            vec![(x_min, 0.0), (x_max, 0.0)],
            BLACK.stroke_width(3),
        ))?;
    }

    if let Some(baseline) = request.baseline_value {
        let label = request.baseline_label.clone().unwrap_or_default();
        let style = RED.mix(0.7).stroke_width(2);
        chart
            .draw_series(DashedLineSeries::new(
                vec![(x_min, baseline), (x_max, baseline)],
                BASELINE_DASH.0,
                BASELINE_DASH.1,
                style,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    let mut legend_entries = Vec::with_capacity(series.len());
    for (idx, s) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        if request.connect_points {
            chart.draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?;
        }
        chart
            .draw_series(
                s.points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), POINT_RADIUS, color.filled())),
            )?
            .label(s.label.clone())
            .legend(move |(x, y)| Circle::new((x + 10, y), POINT_RADIUS, color.filled()));
        legend_entries.push((s.label.clone(), color, LegendMarker::Point));
    }

    match (request.legend_mode, legend_area) {
        (LegendMode::ShowInside, _) => {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        (LegendMode::ShowOutside, Some(area)) => {
            if let (Some(baseline_label), Some(_)) =
                (request.baseline_label.as_ref(), request.baseline_value)
            {
                legend_entries.insert(
                    0,
                    (baseline_label.clone(), RED.mix(0.7), LegendMarker::Line),
                );
            }
            for (row, (label, color, marker)) in legend_entries.iter().enumerate() {
                let y = 40 + row as i32 * 22;
                match marker {
                    LegendMarker::Point => {
                        area.draw(&Circle::new((12, y), POINT_RADIUS, color.filled()))?;
                    }
                    LegendMarker::Line => {
                        area.draw(&PathElement::new(
                            vec![(4, y), (20, y)],
                            color.stroke_width(2),
                        ))?;
                    }
                }
                area.draw(&Text::new(
                    label.clone(),
                    (24, y - 7),
                    ("sans-serif", 14).into_font(),
                ))?;
            }
        }
        _ => {}
    }

    root.present()?;
    Ok(())
}
