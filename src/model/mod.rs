pub mod attention;
pub mod cross_modal;
pub mod discriminator;
pub mod generator;

use burn::{
    module::{AutodiffModule, Module},
    nn::{Initializer, Linear, LinearConfig, Lstm, LstmConfig},
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
};

use ndarray::Array2;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{constants::model::LATENT_DIM, types::Matrix};

pub use cross_modal::CrossModalGenerator;
pub use discriminator::{TabularDiscriminator, TimeSeriesDiscriminator};
pub use generator::{TabularGenerator, TimeSeriesGenerator};

/// Maps a latent draw and a conditioning vector to one modality. `D` is the
/// rank of the generated tensor.
pub trait ConditionalGenerator<B: Backend, const D: usize> {
    fn generate(&self, latent: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, D>;
}

/// Scores conditioned samples of one modality, (batch, 1) in [0, 1]
pub trait ConditionalDiscriminator<B: Backend, const D: usize> {
    fn discriminate(&self, data: Tensor<B, D>, conditions: Tensor<B, 2>) -> Tensor<B, 2>;
}

pub(crate) fn linear<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> Linear<B> {
    LinearConfig::new(d_input, d_output)
        .with_initializer(Initializer::XavierUniform { gain: 1.0 })
        .init(device)
}

pub(crate) fn lstm<B: Backend>(d_input: usize, d_hidden: usize, device: &B::Device) -> Lstm<B> {
    LstmConfig::new(d_input, d_hidden, true).init(device)
}

/// Final hidden state of the recurrent encoder, (batch, hidden)
pub(crate) fn encode_sequence<B: Backend>(encoder: &Lstm<B>, sequences: Tensor<B, 3>) -> Tensor<B, 2> {
    let (_, state) = encoder.forward(sequences, None);
    state.hidden
}

/// Standard-normal latent draws, (n, LATENT_DIM)
pub fn sample_latent<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Matrix {
    Array2::from_shape_simple_fn((n, LATENT_DIM), || rng.sample::<f32, _>(StandardNormal))
}

/// All five networks of the engine
#[derive(Module, Debug)]
pub struct ModelBank<B: Backend> {
    pub ts_generator: TimeSeriesGenerator<B>,
    pub tab_generator: TabularGenerator<B>,
    pub ts_discriminator: TimeSeriesDiscriminator<B>,
    pub tab_discriminator: TabularDiscriminator<B>,
    pub cross_modal: CrossModalGenerator<B>,
}

impl<B: Backend> ModelBank<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            ts_generator: TimeSeriesGenerator::new(device),
            tab_generator: TabularGenerator::new(device),
            ts_discriminator: TimeSeriesDiscriminator::new(device),
            tab_discriminator: TabularDiscriminator::new(device),
            cross_modal: CrossModalGenerator::new(device),
        }
    }
}

/// Trained generators detached from gradient tracking
#[derive(Debug, Clone)]
pub struct Generators<B: Backend> {
    pub ts_generator: TimeSeriesGenerator<B>,
    pub tab_generator: TabularGenerator<B>,
    pub cross_modal: CrossModalGenerator<B>,
}

impl<B: AutodiffBackend> ModelBank<B> {
    pub fn generators(&self) -> Generators<B::InnerBackend> {
        Generators {
            ts_generator: self.ts_generator.valid(),
            tab_generator: self.tab_generator.valid(),
            cross_modal: self.cross_modal.valid(),
        }
    }
}
