use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type MetricMap = BTreeMap<String, f64>;

pub type ResultRecord = BTreeMap<String, MetricMap>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionMode {
    Mean,
    Max,
}

impl ReductionMode {
    pub const ALL: [ReductionMode; 2] = [ReductionMode::Mean, ReductionMode::Max];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Max => "max",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MetricSelector {
    K(i64),
    Reduced(ReductionMode),
    Fixed,
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::K(k) => write!(f, "{k}"),
            Self::Reduced(mode) => f.write_str(mode.as_str()),
            Self::Fixed => f.write_str("-1"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthVariant {
    Large,
    Small,
}

impl WidthVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Large => "large",
            Self::Small => "small",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFileEntry {
    pub eval_type: String,
    pub width: WidthVariant,
    pub identifier: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub results_folders: Vec<String>,
    pub file_count: usize,
    pub files: Vec<ResultFileEntry>,
}
