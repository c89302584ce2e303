use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::AutodiffBackend,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    constants::model::{HIDDEN_DIM, LATENT_DIM, NUM_CONDITIONS, NUM_FEATURES, NUM_TABULAR, SEQ_LENGTH},
    data::FittedTransforms,
    error::{GanError, Result},
    model::{
        CrossModalGenerator, Generators, ModelBank, TabularDiscriminator, TabularGenerator, TimeSeriesDiscriminator,
        TimeSeriesGenerator,
    },
    training::TrainingHistory,
    utils::{create_folder_if_not_exists, timestamp},
};

pub const METADATA_FILE: &str = "metadata.json";
pub const TRANSFORMS_FILE: &str = "transforms.bin";

const TS_GENERATOR_FILE: &str = "ts_generator";
const TAB_GENERATOR_FILE: &str = "tab_generator";
const TS_DISCRIMINATOR_FILE: &str = "ts_discriminator";
const TAB_DISCRIMINATOR_FILE: &str = "tab_discriminator";
const CROSS_MODAL_FILE: &str = "cross_modal";

type Recorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Network dimensions a checkpoint was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDims {
    pub seq_length: usize,
    pub latent_dim: usize,
    pub hidden_dim: usize,
    pub num_features: usize,
    pub num_tabular: usize,
    pub num_conditions: usize,
}

impl ModelDims {
    pub fn current() -> Self {
        Self {
            seq_length: SEQ_LENGTH,
            latent_dim: LATENT_DIM,
            hidden_dim: HIDDEN_DIM,
            num_features: NUM_FEATURES,
            num_tabular: NUM_TABULAR,
            num_conditions: NUM_CONDITIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub epochs: usize,
    pub created_at: String,
    pub timestamp: String,
    pub history: TrainingHistory,
    pub dims: ModelDims,
}

/// Owns the five networks and their lifecycle: fresh, trained, saved, loaded
pub struct ModelRegistry<B: AutodiffBackend> {
    models: Option<ModelBank<B>>,
    is_trained: bool,
    history: TrainingHistory,
    transforms: FittedTransforms,
    device: B::Device,
    checkpoint_dir: PathBuf,
}

impl<B: AutodiffBackend> ModelRegistry<B> {
    pub fn new(checkpoint_dir: impl Into<PathBuf>, device: B::Device) -> Self {
        Self {
            models: None,
            is_trained: false,
            history: TrainingHistory::new(),
            transforms: FittedTransforms::default(),
            device,
            checkpoint_dir: checkpoint_dir.into(),
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    pub fn is_trained(&self) -> bool {
        self.is_trained
    }

    pub fn models(&self) -> Option<&ModelBank<B>> {
        self.models.as_ref()
    }

    /// Fresh randomly initialised networks. Forgets the trained state and
    /// history of any previous run.
    pub fn initialize_models(&mut self) -> &ModelBank<B> {
        info!("Initializing models");
        self.is_trained = false;
        self.history = TrainingHistory::new();
        self.models.insert(ModelBank::new(&self.device))
    }

    /// Installs the result of a completed training run
    pub(crate) fn install_trained(&mut self, models: ModelBank<B>, history: TrainingHistory, transforms: FittedTransforms) {
        self.models = Some(models);
        self.history = history;
        self.transforms = transforms;
        self.is_trained = true;
    }

    pub fn get_generators(&self) -> Result<Generators<B::InnerBackend>> {
        match &self.models {
            Some(models) if self.is_trained => Ok(models.generators()),
            _ => Err(GanError::ModelsNotTrained),
        }
    }

    pub fn get_training_history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn set_training_history(&mut self, history: TrainingHistory) {
        self.history = history;
    }

    pub fn transforms(&self) -> &FittedTransforms {
        &self.transforms
    }

    pub fn set_transforms(&mut self, transforms: FittedTransforms) {
        self.transforms = transforms;
    }

    /// Writes every network, the metadata and the fitted transforms under a
    /// new timestamp, which becomes the latest checkpoint
    pub fn save_models(&self, epochs: usize) -> Result<String> {
        let models = self.models.as_ref().ok_or(GanError::ModelsNotTrained)?;
        self.save_checkpoint(models, &self.history, &self.transforms, epochs)
    }

    /// Saves `models` without installing them. A failed write leaves no
    /// partial checkpoint behind.
    pub fn save_checkpoint(
        &self,
        models: &ModelBank<B>,
        history: &TrainingHistory,
        transforms: &FittedTransforms,
        epochs: usize,
    ) -> Result<String> {
        let timestamp = timestamp();
        let dir = self.checkpoint_dir.join(&timestamp);

        if let Err(e) = write_checkpoint(&dir, models, history, transforms, epochs, &timestamp) {
            if dir.is_dir() {
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!("Could not remove partial checkpoint {}: {cleanup}", dir.display());
                }
            }
            return Err(e);
        }

        info!("Models saved with timestamp: {timestamp}");
        Ok(timestamp)
    }

    /// Newest complete checkpoint under the checkpoint directory
    pub fn latest_timestamp(&self) -> Result<Option<String>> {
        if !self.checkpoint_dir.is_dir() {
            return Ok(None);
        }

        let mut latest: Option<String> = None;
        for entry in fs::read_dir(&self.checkpoint_dir)? {
            let entry = entry?;
            if !entry.path().join(METADATA_FILE).is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if latest.as_ref().map_or(true, |current| name > *current) {
                latest = Some(name);
            }
        }
        Ok(latest)
    }

    /// Restores the latest checkpoint. `Ok(false)` means there is none yet.
    pub fn load_models(&mut self) -> Result<bool> {
        let Some(timestamp) = self.latest_timestamp()? else {
            info!("No saved models found in {}", self.checkpoint_dir.display());
            return Ok(false);
        };
        let dir = self.checkpoint_dir.join(&timestamp);
        debug!("loading checkpoint {}", dir.display());

        let meta: CheckpointMeta = serde_json::from_str(&fs::read_to_string(dir.join(METADATA_FILE))?)?;
        if meta.dims != ModelDims::current() {
            return Err(GanError::Checkpoint(format!(
                "checkpoint {timestamp} was built for {:?}, expected {:?}",
                meta.dims,
                ModelDims::current()
            )));
        }

        let recorder = Recorder::new();
        let device = &self.device;
        let models = ModelBank {
            ts_generator: TimeSeriesGenerator::new(device).load_file(dir.join(TS_GENERATOR_FILE), &recorder, device)?,
            tab_generator: TabularGenerator::new(device).load_file(dir.join(TAB_GENERATOR_FILE), &recorder, device)?,
            ts_discriminator: TimeSeriesDiscriminator::new(device).load_file(
                dir.join(TS_DISCRIMINATOR_FILE),
                &recorder,
                device,
            )?,
            tab_discriminator: TabularDiscriminator::new(device).load_file(
                dir.join(TAB_DISCRIMINATOR_FILE),
                &recorder,
                device,
            )?,
            cross_modal: CrossModalGenerator::new(device).load_file(dir.join(CROSS_MODAL_FILE), &recorder, device)?,
        };

        let transforms_path = dir.join(TRANSFORMS_FILE);
        let transforms = if transforms_path.is_file() {
            FittedTransforms::load(transforms_path)?
        } else {
            warn!("Checkpoint {timestamp} has no fitted transforms, generated values will not be rescaled");
            FittedTransforms::default()
        };

        self.models = Some(models);
        self.history = meta.history;
        self.transforms = transforms;
        self.is_trained = true;

        info!("Models loaded from timestamp: {timestamp} ({} epochs)", meta.epochs);
        Ok(true)
    }
}

fn write_checkpoint<B: AutodiffBackend>(
    dir: &Path,
    models: &ModelBank<B>,
    history: &TrainingHistory,
    transforms: &FittedTransforms,
    epochs: usize,
    timestamp: &str,
) -> Result<()> {
    create_folder_if_not_exists(dir)?;

    let recorder = Recorder::new();
    models.ts_generator.clone().save_file(dir.join(TS_GENERATOR_FILE), &recorder)?;
    models.tab_generator.clone().save_file(dir.join(TAB_GENERATOR_FILE), &recorder)?;
    models
        .ts_discriminator
        .clone()
        .save_file(dir.join(TS_DISCRIMINATOR_FILE), &recorder)?;
    models
        .tab_discriminator
        .clone()
        .save_file(dir.join(TAB_DISCRIMINATOR_FILE), &recorder)?;
    models.cross_modal.clone().save_file(dir.join(CROSS_MODAL_FILE), &recorder)?;

    transforms.save(dir.join(TRANSFORMS_FILE))?;

    // Written last, a directory without metadata is never picked as latest
    let meta = CheckpointMeta {
        epochs,
        created_at: Local::now().to_rfc3339(),
        timestamp: timestamp.to_string(),
        history: history.clone(),
        dims: ModelDims::current(),
    };
    fs::write(dir.join(METADATA_FILE), serde_json::to_string_pretty(&meta)?)?;
    Ok(())
}
