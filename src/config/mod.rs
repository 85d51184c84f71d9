// src/config/mod.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// One language variant of the embedded Q&A markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSource {
    pub language: String,
    /// Column holding the raw markup, e.g. `body/en`.
    pub column: String,
    /// Intermediate per-row mapping column; dropped from the output if an upload carries it.
    pub mapping_column: String,
}

impl LanguageSource {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            column: format!("body/{}", language),
            mapping_column: format!("parsed_xml_{}", language),
        }
    }
}

/// What to do when a question has the same name as an existing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Replace the existing column's values, keeping its position.
    #[default]
    Overwrite,
    /// Append the question column under `<question> (n)`.
    Rename,
    /// Fail the whole run.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub file_name: String,
    pub sheet_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: "processed_file.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Processing order; a later source overrides an earlier one for the same question.
    pub sources: Vec<LanguageSource>,
    pub collision_policy: CollisionPolicy,
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![LanguageSource::new("en"), LanguageSource::new("fr")],
            collision_policy: CollisionPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a YAML config; `None` gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        let cfg = Self::from_yaml(&text).with_context(|| format!("parsing config {:?}", path))?;
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        for (i, src) in self.sources.iter().enumerate() {
            if src.column.trim().is_empty() {
                anyhow::bail!("source #{} ({}) has an empty column name", i, src.language);
            }
            if self.sources[..i].iter().any(|s| s.column == src.column) {
                anyhow::bail!("source column {:?} is listed twice", src.column);
            }
        }
        if self.output.sheet_name.trim().is_empty() {
            anyhow::bail!("output.sheet_name must not be empty");
        }
        Ok(())
    }

    /// Every column that must not reach the output: raw sources plus mapping columns.
    pub fn source_columns(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .flat_map(|s| [s.column.as_str(), s.mapping_column.as_str()])
    }
}
