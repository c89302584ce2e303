use std::{fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::{generation, paths},
    error::Result,
    training::TrainingConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub time_series: PathBuf,
    pub tabular: PathBuf,
    pub model_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            time_series: paths::TIME_SERIES_PATH.into(),
            tabular: paths::TABULAR_PATH.into(),
            model_dir: paths::MODEL_PATH.into(),
            output_dir: paths::OUTPUT_PATH.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub batch_size: usize,
    pub preview_samples: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: generation::BATCH_SIZE,
            preview_samples: generation::PREVIEW_SAMPLES,
        }
    }
}

/// Engine settings. Every section and field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub training: TrainingConfig,
    pub generation: GenerationConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading config from {}", path.display());
        Self::from_toml(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GanError;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_toml(
            r#"
            [paths]
            model_dir = "/tmp/models"

            [training]
            epochs = 5
            seed = 11
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.model_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.paths.tabular, PathBuf::from(paths::TABULAR_PATH));
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.seed, Some(11));
        assert_eq!(config.training.batch_size, crate::constants::training::BATCH_SIZE);
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn empty_file_is_the_default_config() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(Config::from_toml("[training]\nepochs = \"many\""), Err(GanError::Toml(_))));
    }
}
