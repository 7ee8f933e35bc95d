//! Pipeline policy loading.
//!
//! Every tunable of the pipeline (null tokens, coercion thresholds, keyword
//! lists, classifier rules, selection caps and the "all" filter token) lives
//! in one [`PipelineConfig`] value that is passed explicitly into each stage.
//! Policy files are YAML; any section or field they omit keeps its default.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    classify::ClassifierConfig, filter::FilterConfig, ingest::IngestConfig,
    preprocess::PreprocessConfig, selection::SelectionPolicy,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ingest: IngestConfig,
    pub preprocess: PreprocessConfig,
    pub classifier: ClassifierConfig,
    pub selection: SelectionPolicy,
    pub filter: FilterConfig,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening policy file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: PipelineConfig =
            serde_yaml::from_reader(reader).context("Parsing policy YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml).context("Parsing policy YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing policy to YAML string")
    }

    pub fn validate(&self) -> Result<()> {
        let coercion = &self.preprocess.coercion;
        ensure!(
            coercion.sample_size > 0,
            "Coercion sample size must be positive"
        );
        ensure!(
            (0.0..=1.0).contains(&coercion.threshold),
            "Coercion threshold must lie in [0, 1], got {}",
            coercion.threshold
        );
        ensure!(
            self.selection.total_cap > 0,
            "Total active column cap must be positive"
        );
        ensure!(
            !self.filter.all_token.is_empty(),
            "The 'all' filter token cannot be empty"
        );
        Ok(())
    }
}
