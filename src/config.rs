use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::mapping::{NameMapping, SubstitutionRule};
use crate::reduce::MissingKPolicy;
use crate::results::FilterPattern;

const MATRYOSHKA_65K_RUN: &str = "matryoshka_gemma-2-2b-16k-v2_MatryoshkaBatchTopKTrainer_65k_temp1000_google_gemma-2-2b_ctx1024_0117_resid_post_layer_12";
const MATRYOSHKA_16K_RUN: &str = "matryoshka_gemma-2-2b-16k-v2_MatryoshkaBatchTopKTrainer_notemp_google_gemma-2-2b_ctx1024_0114_resid_post_layer_12";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub model_name: String,
    pub layer: u32,
    pub selection_title: String,
    pub large_patterns: Vec<FilterPattern>,
    pub small_patterns: Vec<FilterPattern>,
    pub results_folders: Vec<PathBuf>,
    pub baseline_folder: Option<PathBuf>,
    pub eval_types: Vec<String>,
    pub ks_lookup: BTreeMap<String, Vec<i64>>,
    pub baseline_type: String,
    pub baseline_label: String,
    pub include_baseline: bool,
    pub baseline_excluded_models: Vec<String>,
    pub name_mapping: NameMapping,
    pub missing_k_policy: MissingKPolicy,
    pub x_axis_metric: String,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let ks_scr = vec![5, 10, 20, 50, 100, 500];
        Self {
            model_name: "gemma-2-2b".to_string(),
            layer: 12,
            selection_title: "SAE Bench Gemma-2-2B Width Diff Series".to_string(),
            large_patterns: vec![
                FilterPattern::with_exclude(r"saebench_gemma-2-2b_width-2pow16_date-0108", "step"),
                FilterPattern::new(r"65k_temp1000"),
            ],
            small_patterns: vec![
                FilterPattern::with_exclude(r"saebench_gemma-2-2b_width-2pow14_date-0108", "step"),
                FilterPattern::new(r"notemp"),
            ],
            results_folders: vec![
                PathBuf::from("./graphing_eval_results_0119"),
                PathBuf::from("./matroyshka_eval_results_0117"),
            ],
            baseline_folder: None,
            eval_types: vec![
                "scr".to_string(),
                "tpp".to_string(),
                "sparse_probing".to_string(),
            ],
            ks_lookup: BTreeMap::from([
                ("scr".to_string(), ks_scr.clone()),
                ("tpp".to_string(), ks_scr),
                ("sparse_probing".to_string(), vec![1, 2, 5]),
            ]),
            baseline_type: "pca_sae".to_string(),
            baseline_label: "PCA Baseline".to_string(),
            include_baseline: false,
            baseline_excluded_models: vec!["gemma-2-9b".to_string()],
            name_mapping: NameMapping {
                exceptions: vec![SubstitutionRule::new(MATRYOSHKA_65K_RUN, MATRYOSHKA_16K_RUN)],
                tag_rules: vec![SubstitutionRule::new("width-2pow16", "width-2pow14")],
            },
            missing_k_policy: MissingKPolicy::Skip,
            x_axis_metric: "l0".to_string(),
            output_dir: PathBuf::from("./images_paper_mean"),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.results_folders.is_empty() {
            bail!("config must list at least one results folder");
        }
        if self.large_patterns.is_empty() || self.small_patterns.is_empty() {
            bail!("config must list filename patterns for both width variants");
        }
        for pattern in self.large_patterns.iter().chain(&self.small_patterns) {
            pattern.compile()?;
        }
        Ok(())
    }

    pub fn ks_for(&self, eval_type: &str) -> Option<&[i64]> {
        self.ks_lookup
            .get(eval_type)
            .map(Vec::as_slice)
            .filter(|ks| !ks.is_empty() && *ks != [-1])
    }

    pub fn baseline_folder(&self) -> &Path {
        self.baseline_folder
            .as_deref()
            .or_else(|| self.results_folders.first().map(PathBuf::as_path))
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn baseline_enabled(&self) -> bool {
        self.include_baseline
            && !self
                .baseline_excluded_models
                .iter()
                .any(|model| model == &self.model_name)
    }
}
