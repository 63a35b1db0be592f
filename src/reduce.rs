use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::metrics::{MetricError, metric_key_and_name};
use crate::model::{MetricSelector, ReductionMode, ResultRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReduceError {
    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("autoencoder {identifier} has no {eval_type} values for any k in {ks:?}")]
    NoKValues {
        identifier: String,
        eval_type: String,
        ks: Vec<i64>,
    },
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKPolicy {
    #[default]
    Skip,
    Error,
}

pub fn reduce_over_k(
    record: &ResultRecord,
    eval_type: &str,
    ks: &[i64],
    mode: ReductionMode,
    policy: MissingKPolicy,
) -> Result<ResultRecord, ReduceError> {
    let per_k_keys = ks
        .iter()
        .map(|&k| metric_key_and_name(eval_type, MetricSelector::K(k)).map(|(key, _)| key))
        .collect::<Result<Vec<_>, _>>()?;
    let (reduced_key, _) = metric_key_and_name(eval_type, MetricSelector::Reduced(mode))?;

    let mut reduced = ResultRecord::new();
    for (identifier, metrics) in record {
        let mut out = metrics.clone();
        let values: Vec<f64> = per_k_keys
            .iter()
            .filter_map(|key| metrics.get(key).copied())
            .collect();

        match reduce_values(&values, mode) {
            Some(value) => {
                out.insert(reduced_key.clone(), value);
            }
            None => match policy {
                MissingKPolicy::Skip => {
                    debug!(
                        identifier = %identifier,
                        eval_type = %eval_type,
                        mode = mode.as_str(),
                        "no per-k values; leaving reduced metric unset"
                    );
                }
                MissingKPolicy::Error => {
                    return Err(ReduceError::NoKValues {
                        identifier: identifier.clone(),
                        eval_type: eval_type.to_string(),
                        ks: ks.to_vec(),
                    });
                }
            },
        }

        reduced.insert(identifier.clone(), out);
    }

    Ok(reduced)
}

pub fn get_mean_metric_over_k(
    record: &ResultRecord,
    eval_type: &str,
    ks: &[i64],
    policy: MissingKPolicy,
) -> Result<ResultRecord, ReduceError> {
    reduce_over_k(record, eval_type, ks, ReductionMode::Mean, policy)
}

pub fn get_max_metric_over_k(
    record: &ResultRecord,
    eval_type: &str,
    ks: &[i64],
    policy: MissingKPolicy,
) -> Result<ResultRecord, ReduceError> {
    reduce_over_k(record, eval_type, ks, ReductionMode::Max, policy)
}

fn reduce_values(values: &[f64], mode: ReductionMode) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match mode {
        ReductionMode::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        ReductionMode::Max => values.iter().copied().reduce(f64::max),
    }
}

pub fn invert_scores(record: &mut ResultRecord, metric: &str) {
    for (identifier, metrics) in record.iter_mut() {
        match metrics.get_mut(metric) {
            Some(score) => *score = 1.0 - *score,
            None => debug!(
                identifier = %identifier,
                metric = %metric,
                "metric absent; leaving score uninverted"
            ),
        }
    }
}

pub fn invert_baseline(baseline: Option<f64>) -> Option<f64> {
    baseline.map(|value| 1.0 - value)
}
