use thiserror::Error;

use crate::model::MetricSelector;

pub const ABSORPTION_SCORE_KEY: &str = "mean_absorption_fraction_score";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    #[error("unknown eval type: {0}")]
    UnknownEvalType(String),

    #[error("eval type {eval_type} needs a k value or reduction mode, got {selector}")]
    MissingK {
        eval_type: String,
        selector: MetricSelector,
    },
}

pub fn metric_key_and_name(
    eval_type: &str,
    selector: MetricSelector,
) -> Result<(String, String), MetricError> {
    let fixed = |key: &str, name: &str| Ok((key.to_string(), name.to_string()));

    match eval_type {
        "scr" | "tpp" | "sparse_probing" => {
            let (k_token, k_label) = match selector {
                MetricSelector::K(k) if k >= 0 => (k.to_string(), k.to_string()),
                MetricSelector::Reduced(mode) => {
                    (mode.as_str().to_string(), capitalize(mode.as_str()))
                }
                _ => {
                    return Err(MetricError::MissingK {
                        eval_type: eval_type.to_string(),
                        selector,
                    });
                }
            };
            let pair = match eval_type {
                "scr" => (
                    format!("scr_metric_threshold_{k_token}"),
                    format!("SCR Top {k_label} Metric"),
                ),
                "tpp" => (
                    format!("tpp_threshold_{k_token}_total_metric"),
                    format!("TPP Top {k_label} Metric"),
                ),
                _ => (
                    format!("sae_top_{k_token}_test_accuracy"),
                    format!("Sparse Probing Top {k_label} Test Accuracy"),
                ),
            };
            Ok(pair)
        }
        "absorption" => fixed(ABSORPTION_SCORE_KEY, "Mean Absorption Score"),
        "autointerp" => fixed("autointerp_score", "Autointerp Score"),
        "unlearning" => fixed("unlearning_score", "Unlearning Score"),
        "core" => fixed("frac_recovered", "Loss Recovered"),
        other => Err(MetricError::UnknownEvalType(other.to_string())),
    }
}

pub fn is_lower_better(metric_key: &str) -> bool {
    metric_key == ABSORPTION_SCORE_KEY
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
