use std::path::Path;

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, Tensor},
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    constants::training::{BATCH_SIZE, BETA_1, BETA_2, EPOCHS, LEARNING_RATE},
    data::{
        create_batches,
        tensor::{array2_to_tensor, array3_to_tensor},
        DataPreprocessor, FittedTransforms, TensorTriple,
    },
    error::{GanError, Result, ViolationCode},
    model::{sample_latent, ConditionalDiscriminator, ConditionalGenerator, CrossModalGenerator, ModelBank},
    registry::ModelRegistry,
    training::{
        history::{EpochLosses, TrainingHistory},
        losses::{binary_cross_entropy, mse, scalar},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub beta_1: f32,
    pub beta_2: f32,
    /// Fixes weight initialisation, shuffling and latent draws
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: EPOCHS,
            batch_size: BATCH_SIZE,
            learning_rate: LEARNING_RATE,
            beta_1: BETA_1,
            beta_2: BETA_2,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrainerState {
    #[default]
    Idle,
    Preprocessing,
    Training {
        epoch: usize,
        epochs: usize,
    },
    Finalizing,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub history: TrainingHistory,
    pub timestamp: String,
}

pub struct Trainer {
    config: TrainingConfig,
    state: TrainerState,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            state: TrainerState::Idle,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    /// Preprocess both files, then train on the result
    pub fn train<B: AutodiffBackend>(
        &mut self,
        registry: &mut ModelRegistry<B>,
        time_series_path: impl AsRef<Path>,
        tabular_path: impl AsRef<Path>,
    ) -> Result<TrainingOutcome> {
        self.validate()?;
        info!("Starting training process...");

        self.set_state(TrainerState::Preprocessing);
        let preprocessed = DataPreprocessor::new().load_and_preprocess(time_series_path, tabular_path);
        let (triple, transforms) = match preprocessed {
            Ok(preprocessed) => preprocessed,
            Err(e) => {
                self.set_state(TrainerState::Idle);
                return Err(e);
            }
        };

        self.train_on(registry, &triple, transforms)
    }

    /// Train fresh networks on an encoded triple. Nothing is checkpointed
    /// unless every epoch completes.
    pub fn train_on<B: AutodiffBackend>(
        &mut self,
        registry: &mut ModelRegistry<B>,
        triple: &TensorTriple,
        transforms: FittedTransforms,
    ) -> Result<TrainingOutcome> {
        let result = self.validate().and_then(|_| self.run(registry, triple, transforms));
        self.set_state(TrainerState::Idle);
        result
    }

    fn validate(&self) -> Result<()> {
        if self.config.epochs == 0 {
            return Err(GanError::invalid("epochs", ViolationCode::OutOfRange, "epochs must be at least 1"));
        }
        if self.config.batch_size == 0 {
            return Err(GanError::invalid("batch_size", ViolationCode::OutOfRange, "batch size must be at least 1"));
        }
        Ok(())
    }

    fn set_state(&mut self, state: TrainerState) {
        debug!("trainer state {:?} -> {state:?}", self.state);
        self.state = state;
    }

    fn run<B: AutodiffBackend>(
        &mut self,
        registry: &mut ModelRegistry<B>,
        triple: &TensorTriple,
        transforms: FittedTransforms,
    ) -> Result<TrainingOutcome> {
        if triple.is_empty() {
            return Err(GanError::DataFormat("no records to train on".into()));
        }

        let config = self.config.clone();
        let mut rng = match config.seed {
            Some(seed) => {
                B::seed(registry.device(), seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        let device = registry.device().clone();
        let ModelBank {
            mut ts_generator,
            mut tab_generator,
            mut ts_discriminator,
            mut tab_discriminator,
            mut cross_modal,
        } = registry.initialize_models().clone();

        let adam = AdamConfig::new().with_beta_1(config.beta_1).with_beta_2(config.beta_2);
        let mut ts_gen_optim = adam.init();
        let mut tab_gen_optim = adam.init();
        let mut ts_dis_optim = adam.init();
        let mut tab_dis_optim = adam.init();
        let mut cross_optim = adam.init();
        let lr = config.learning_rate;

        let mut history = TrainingHistory::new();
        for epoch in 1..=config.epochs {
            self.set_state(TrainerState::Training {
                epoch,
                epochs: config.epochs,
            });

            let batches = create_batches(triple, config.batch_size, &mut rng)?;
            let mut totals = EpochLosses::default();
            for batch in &batches {
                let real_ts = array3_to_tensor::<B>(&batch.sequences, &device);
                let real_tab = array2_to_tensor::<B>(&batch.tabular, &device);
                let conditions = array2_to_tensor::<B>(&batch.conditions, &device);
                let latent = array2_to_tensor::<B>(&sample_latent(batch.len(), &mut rng), &device);

                let (model, ts_dis) = discriminator_step::<_, _, _, _, 3>(
                    ts_discriminator,
                    &ts_generator,
                    &mut ts_dis_optim,
                    lr,
                    real_ts.clone(),
                    conditions.clone(),
                    latent.clone(),
                );
                ts_discriminator = model;
                let (model, tab_dis) = discriminator_step::<_, _, _, _, 2>(
                    tab_discriminator,
                    &tab_generator,
                    &mut tab_dis_optim,
                    lr,
                    real_tab.clone(),
                    conditions.clone(),
                    latent.clone(),
                );
                tab_discriminator = model;

                let (model, ts_gen) = generator_step::<_, _, _, _, 3>(
                    ts_generator,
                    &ts_discriminator,
                    &mut ts_gen_optim,
                    lr,
                    conditions.clone(),
                    latent.clone(),
                );
                ts_generator = model;
                let (model, tab_gen) = generator_step::<_, _, _, _, 2>(
                    tab_generator,
                    &tab_discriminator,
                    &mut tab_gen_optim,
                    lr,
                    conditions.clone(),
                    latent,
                );
                tab_generator = model;

                let (model, cross) = cross_modal_step(cross_modal, &mut cross_optim, lr, real_ts, real_tab, conditions);
                cross_modal = model;

                totals += EpochLosses {
                    ts_gen,
                    ts_dis,
                    tab_gen,
                    tab_dis,
                    cross,
                };
            }

            let averages = totals / batches.len() as f64;
            info!(
                "Epoch {epoch}/{} - TS G/D: {:.4}/{:.4} - Tab G/D: {:.4}/{:.4} - Cross: {:.4}",
                config.epochs, averages.ts_gen, averages.ts_dis, averages.tab_gen, averages.tab_dis, averages.cross
            );
            history.record(&averages);
        }

        self.set_state(TrainerState::Finalizing);
        let models = ModelBank {
            ts_generator,
            tab_generator,
            ts_discriminator,
            tab_discriminator,
            cross_modal,
        };
        let timestamp = registry.save_checkpoint(&models, &history, &transforms, config.epochs)?;
        registry.install_trained(models, history.clone(), transforms);

        info!("Training completed successfully");
        Ok(TrainingOutcome { history, timestamp })
    }
}

/// Real samples are labelled 1 and detached generator output 0. Only the
/// discriminator is stepped.
fn discriminator_step<B, G, D, O, const N: usize>(
    discriminator: D,
    generator: &G,
    optimizer: &mut O,
    lr: f64,
    real: Tensor<B, N>,
    conditions: Tensor<B, 2>,
    latent: Tensor<B, 2>,
) -> (D, f64)
where
    B: AutodiffBackend,
    G: ConditionalGenerator<B, N>,
    D: ConditionalDiscriminator<B, N> + AutodiffModule<B>,
    O: Optimizer<D, B>,
{
    let fake = generator.generate(latent, conditions.clone()).detach();

    let real_loss = binary_cross_entropy(discriminator.discriminate(real, conditions.clone()), 1.);
    let fake_loss = binary_cross_entropy(discriminator.discriminate(fake, conditions), 0.);
    let loss = (real_loss + fake_loss).div_scalar(2.);
    let value = scalar(&loss);

    let grads = GradientsParams::from_grads(loss.backward(), &discriminator);
    (optimizer.step(lr, discriminator, grads), value)
}

/// Fresh generator output scored against label 1. Only the generator is
/// stepped.
fn generator_step<B, G, D, O, const N: usize>(
    generator: G,
    discriminator: &D,
    optimizer: &mut O,
    lr: f64,
    conditions: Tensor<B, 2>,
    latent: Tensor<B, 2>,
) -> (G, f64)
where
    B: AutodiffBackend,
    G: ConditionalGenerator<B, N> + AutodiffModule<B>,
    D: ConditionalDiscriminator<B, N>,
    O: Optimizer<G, B>,
{
    let fake = generator.generate(latent, conditions.clone());
    let loss = binary_cross_entropy(discriminator.discriminate(fake, conditions), 1.);
    let value = scalar(&loss);

    let grads = GradientsParams::from_grads(loss.backward(), &generator);
    (optimizer.step(lr, generator, grads), value)
}

fn cross_modal_step<B, O>(
    cross_modal: CrossModalGenerator<B>,
    optimizer: &mut O,
    lr: f64,
    real_ts: Tensor<B, 3>,
    real_tab: Tensor<B, 2>,
    conditions: Tensor<B, 2>,
) -> (CrossModalGenerator<B>, f64)
where
    B: AutodiffBackend,
    O: Optimizer<CrossModalGenerator<B>, B>,
{
    let tab = cross_modal.tab_from_ts(real_ts.clone(), conditions.clone());
    let ts = cross_modal.ts_from_tab(real_tab.clone(), conditions);
    let loss = mse(tab, real_tab) + mse(ts, real_ts);
    let value = scalar(&loss);

    let grads = GradientsParams::from_grads(loss.backward(), &cross_modal);
    (optimizer.step(lr, cross_modal, grads), value)
}
