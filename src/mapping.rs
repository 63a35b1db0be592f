use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("mapped identifier {mapped} (from {original}) still contains large-width tag {tag}")]
    ResidualTag {
        original: String,
        mapped: String,
        tag: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRule {
    pub from: String,
    pub to: String,
}

impl SubstitutionRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    fn apply(&self, identifier: &str) -> String {
        if self.from.is_empty() {
            return identifier.to_string();
        }
        identifier.replace(&self.from, &self.to)
    }
}

/// Declared rewrite table. Exceptions cover whole training-run names that the
/// width tags do not describe, and are applied before the tag rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMapping {
    #[serde(default)]
    pub exceptions: Vec<SubstitutionRule>,
    #[serde(default)]
    pub tag_rules: Vec<SubstitutionRule>,
}

impl NameMapping {
    pub fn map(&self, identifier: &str) -> String {
        let after_exceptions = self
            .exceptions
            .iter()
            .fold(identifier.to_string(), |acc, rule| rule.apply(&acc));
        self.tag_rules
            .iter()
            .fold(after_exceptions, |acc, rule| rule.apply(&acc))
    }

    pub fn map_checked(&self, identifier: &str) -> Result<String, MappingError> {
        let mapped = self.map(identifier);
        if let Some(rule) = self
            .tag_rules
            .iter()
            .find(|rule| !rule.from.is_empty() && mapped.contains(&rule.from))
        {
            return Err(MappingError::ResidualTag {
                original: identifier.to_string(),
                mapped,
                tag: rule.from.clone(),
            });
        }
        Ok(mapped)
    }
}
