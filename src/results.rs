use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{MetricMap, ResultRecord};

pub const EVAL_RESULTS_SUFFIX: &str = "_eval_results.json";
pub const CORE_EVAL_TYPE: &str = "core";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("core results missing for autoencoder {0}")]
    MissingCoreResults(String),

    #[error("result file name does not end with _eval_results.json: {0}")]
    UnexpectedFileName(String),

    #[error("result file {0} has no eval_result_metrics object")]
    MissingMetrics(String),
}

/// Filename filter. A path passes when some `include` match is not followed,
/// anywhere after the end of that match, by a match of `exclude`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPattern {
    pub include: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

impl FilterPattern {
    pub fn new(include: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            exclude: None,
        }
    }

    pub fn with_exclude(include: impl Into<String>, exclude: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            exclude: Some(exclude.into()),
        }
    }

    pub fn compile(&self) -> Result<CompiledPattern> {
        let include = Regex::new(&self.include)
            .with_context(|| format!("failed to compile include pattern: {}", self.include))?;
        let exclude = self
            .exclude
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("failed to compile exclude pattern: {pattern}"))
            })
            .transpose()?;
        Ok(CompiledPattern { include, exclude })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    include: Regex,
    exclude: Option<Regex>,
}

impl CompiledPattern {
    pub fn is_match(&self, haystack: &str) -> bool {
        self.include.find_iter(haystack).any(|found| match &self.exclude {
            Some(exclude) => !exclude.is_match(&haystack[found.end()..]),
            None => true,
        })
    }
}

pub fn find_eval_results_files(folders: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for folder in folders {
        if !folder.is_dir() {
            warn!(path = %folder.display(), "results folder missing");
            continue;
        }
        collect_result_files(folder, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn collect_result_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?;

        if file_type.is_dir() {
            collect_result_files(&path, files)?;
            continue;
        }

        let is_result = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(EVAL_RESULTS_SUFFIX))
            .unwrap_or(false);
        if file_type.is_file() && is_result {
            files.push(path);
        }
    }

    Ok(())
}

pub fn filter_with_patterns(paths: &[PathBuf], patterns: &[FilterPattern]) -> Result<Vec<PathBuf>> {
    let compiled = patterns
        .iter()
        .map(FilterPattern::compile)
        .collect::<Result<Vec<_>>>()?;

    Ok(paths
        .iter()
        .filter(|path| {
            let haystack = path.to_string_lossy();
            compiled.iter().any(|pattern| pattern.is_match(&haystack))
        })
        .cloned()
        .collect())
}

pub fn identifier_from_path(path: &Path) -> Result<String> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

    filename
        .strip_suffix(EVAL_RESULTS_SUFFIX)
        .map(ToOwned::to_owned)
        .ok_or_else(|| LoadError::UnexpectedFileName(filename.to_string()).into())
}

pub fn get_eval_results(paths: &[PathBuf]) -> Result<ResultRecord> {
    let mut record = ResultRecord::new();
    for path in paths {
        let identifier = identifier_from_path(path)?;
        let metrics = read_metrics(path)?;
        debug!(identifier = %identifier, metrics = metrics.len(), "loaded eval results");
        record.insert(identifier, metrics);
    }
    Ok(record)
}

pub fn get_core_results(paths: &[PathBuf]) -> Result<ResultRecord> {
    let mut record = get_eval_results(paths)?;
    for metrics in record.values_mut() {
        if !metrics.contains_key("frac_recovered") {
            if let Some(score) = metrics.get("ce_loss_score").copied() {
                metrics.insert("frac_recovered".to_string(), score);
            }
        }
    }
    Ok(record)
}

pub fn merge_core_results(eval: &mut ResultRecord, core: &ResultRecord) -> Result<(), LoadError> {
    for (identifier, metrics) in eval.iter_mut() {
        let core_metrics = core
            .get(identifier)
            .ok_or_else(|| LoadError::MissingCoreResults(identifier.clone()))?;
        metrics.extend(core_metrics.iter().map(|(k, v)| (k.clone(), *v)));
    }
    Ok(())
}

fn read_metrics(path: &Path) -> Result<MetricMap> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let metrics = document
        .get("eval_result_metrics")
        .filter(|value| value.is_object())
        .ok_or_else(|| LoadError::MissingMetrics(path.display().to_string()))?;

    let mut flat = MetricMap::new();
    flatten_numeric(metrics, &mut flat);
    Ok(flat)
}

fn flatten_numeric(value: &Value, out: &mut MetricMap) {
    let Value::Object(map) = value else {
        return;
    };
    for (key, child) in map {
        match child {
            Value::Number(number) => {
                if let Some(number) = number.as_f64() {
                    out.insert(key.clone(), number);
                }
            }
            Value::Object(_) => flatten_numeric(child, out),
            _ => {}
        }
    }
}
