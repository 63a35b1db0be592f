use thiserror::Error;

use crate::mapping::{MappingError, NameMapping};
use crate::model::{MetricMap, ResultRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("no small-width counterpart {mapped} for autoencoder {identifier}")]
    MissingCounterpart { identifier: String, mapped: String },

    #[error("small-width counterpart {mapped} has no metric {metric}")]
    MissingMetric { mapped: String, metric: String },
}

pub fn difference(
    large: &ResultRecord,
    small: &ResultRecord,
    target: &str,
    mapping: &NameMapping,
) -> Result<ResultRecord, DiffError> {
    let mut diff = ResultRecord::new();

    for (identifier, metrics) in large {
        let mut out = MetricMap::new();
        for (metric, &value) in metrics {
            if metric == target {
                let counterpart = small_value(small, identifier, target, mapping)?;
                out.insert(metric.clone(), value - counterpart);
            } else {
                out.insert(metric.clone(), value);
            }
        }
        diff.insert(identifier.clone(), out);
    }

    Ok(diff)
}

fn small_value(
    small: &ResultRecord,
    identifier: &str,
    target: &str,
    mapping: &NameMapping,
) -> Result<f64, DiffError> {
    let mapped = mapping.map_checked(identifier)?;
    let metrics = small
        .get(&mapped)
        .ok_or_else(|| DiffError::MissingCounterpart {
            identifier: identifier.to_string(),
            mapped: mapped.clone(),
        })?;
    metrics
        .get(target)
        .copied()
        .ok_or_else(|| DiffError::MissingMetric {
            mapped,
            metric: target.to_string(),
        })
}
