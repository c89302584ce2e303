use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use burn::tensor::backend::AutodiffBackend;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    backend::TrainingBackend,
    config::Config,
    error::{GanError, Result, ViolationCode},
    generate::{preview, serialize, write_records, ConditionSpec, DataGenerator, Preview},
    registry::ModelRegistry,
    training::{Trainer, TrainingHistory},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub epochs: usize,
    #[serde(default)]
    pub time_series_path: Option<PathBuf>,
    #[serde(default)]
    pub tabular_path: Option<PathBuf>,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl TrainRequest {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(GanError::invalid("epochs", ViolationCode::OutOfRange, "epochs must be at least 1"));
        }
        if self.batch_size == Some(0) {
            return Err(GanError::invalid("batch_size", ViolationCode::OutOfRange, "batch size must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainResponse {
    pub message: String,
    pub epochs_completed: usize,
    pub training_history: TrainingHistory,
    pub model_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub num_samples: usize,
    #[serde(default)]
    pub age: Option<f32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub disease_type: Option<String>,
}

impl GenerateRequest {
    pub fn validate(&self) -> Result<ConditionSpec> {
        if self.num_samples == 0 {
            return Err(GanError::invalid(
                "num_samples",
                ViolationCode::OutOfRange,
                "number of samples must be positive",
            ));
        }
        ConditionSpec::from_request(self.age, self.gender.as_deref(), self.disease_type.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub num_generated: usize,
    pub time_series_file: PathBuf,
    pub tabular_file: PathBuf,
    pub preview: Preview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub is_trained: bool,
    pub training_history: TrainingHistory,
    pub available_models: bool,
}

/// Entry point for training, generation and status. Clones share one
/// registry; every operation holds its lock for the whole call, so a second
/// request waits for the first to finish.
pub struct GanService<B: AutodiffBackend = TrainingBackend> {
    registry: Arc<Mutex<ModelRegistry<B>>>,
    config: Arc<Config>,
}

impl<B: AutodiffBackend> Clone for GanService<B> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B: AutodiffBackend> GanService<B> {
    pub fn new(config: Config) -> Self {
        let registry = ModelRegistry::new(config.paths.model_dir.clone(), B::Device::default());
        Self::with_registry(registry, config)
    }

    pub fn with_registry(registry: ModelRegistry<B>, config: Config) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, ModelRegistry<B>>> {
        self.registry.lock().map_err(|e| GanError::Poisoned(e.to_string()))
    }

    /// Restore the latest checkpoint if one exists
    pub fn load_latest(&self) -> Result<bool> {
        self.lock()?.load_models()
    }

    pub fn train(&self, request: &TrainRequest) -> Result<TrainResponse> {
        request.validate()?;

        let mut training = self.config.training.clone();
        training.epochs = request.epochs;
        if let Some(batch_size) = request.batch_size {
            training.batch_size = batch_size;
        }
        let time_series = request
            .time_series_path
            .clone()
            .unwrap_or_else(|| self.config.paths.time_series.clone());
        let tabular = request
            .tabular_path
            .clone()
            .unwrap_or_else(|| self.config.paths.tabular.clone());

        info!("Training request: epochs={}, batch_size={}", training.epochs, training.batch_size);
        let mut registry = self.lock()?;
        let outcome = Trainer::new(training).train(&mut *registry, time_series, tabular)?;

        Ok(TrainResponse {
            message: format!("Training completed successfully in {} epochs", request.epochs),
            epochs_completed: request.epochs,
            training_history: outcome.history,
            model_timestamp: outcome.timestamp,
        })
    }

    pub fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let spec = request.validate()?;
        info!(
            "Generation request: age={:?}, gender={:?}, disease={:?}, records={}",
            request.age, request.gender, request.disease_type, request.num_samples
        );

        let mut registry = self.lock()?;
        if !registry.is_trained() && !registry.load_models()? {
            return Err(GanError::ModelsNotTrained);
        }

        let mut rng = StdRng::from_entropy();
        let conditions = spec.build(registry.transforms(), request.num_samples, &mut rng)?;
        let synthetic = DataGenerator::new(self.config.generation.batch_size).generate(
            &*registry,
            request.num_samples,
            Some(conditions),
            &mut rng,
        )?;

        let records = serialize(&synthetic, registry.transforms());
        let (time_series_file, tabular_file) =
            write_records(&records, &self.config.paths.output_dir, request.num_samples)?;

        Ok(GenerateResponse {
            num_generated: synthetic.len(),
            time_series_file,
            tabular_file,
            preview: preview(&synthetic, self.config.generation.preview_samples),
        })
    }

    pub fn status(&self) -> Result<StatusResponse> {
        let registry = self.lock()?;
        Ok(StatusResponse {
            is_trained: registry.is_trained(),
            training_history: registry.get_training_history().clone(),
            available_models: registry.latest_timestamp()?.is_some(),
        })
    }
}
