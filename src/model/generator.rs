use burn::{
    module::Module,
    nn::Linear,
    tensor::{
        activation::{relu, sigmoid},
        backend::Backend,
        Tensor,
    },
};

use crate::{
    constants::model::{HIDDEN_DIM, LATENT_DIM, NUM_CONDITIONS, NUM_FEATURES, NUM_TABULAR, SEQ_LENGTH},
    model::{attention::TemporalAttention, linear, ConditionalGenerator},
};

/// Latent + condition -> (batch, SEQ_LENGTH, features) in [0, 1]
#[derive(Module, Debug)]
pub struct TimeSeriesGenerator<B: Backend> {
    fc_in: Linear<B>,
    fc_steps: Linear<B>,
    attention: TemporalAttention<B>,
    output: Linear<B>,
}

impl<B: Backend> TimeSeriesGenerator<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            fc_in: linear(LATENT_DIM + NUM_CONDITIONS, 256, device),
            fc_steps: linear(256, SEQ_LENGTH * HIDDEN_DIM, device),
            attention: TemporalAttention::new(HIDDEN_DIM, device),
            output: linear(HIDDEN_DIM, NUM_FEATURES, device),
        }
    }

    pub fn forward(&self, latent: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, _] = latent.dims();
        let x = Tensor::cat(vec![latent, conditions], 1);
        let x = relu(self.fc_in.forward(x));
        // (B, S * H) -> (B, S, H)
        let x = relu(self.fc_steps.forward(x)).reshape([batch, SEQ_LENGTH, HIDDEN_DIM]);
        let x = self.attention.forward(x);
        sigmoid(self.output.forward(x))
    }
}

impl<B: Backend> ConditionalGenerator<B, 3> for TimeSeriesGenerator<B> {
    fn generate(&self, latent: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, 3> {
        self.forward(latent, conditions)
    }
}

/// Latent + condition -> (batch, tabular features) in [0, 1]
#[derive(Module, Debug)]
pub struct TabularGenerator<B: Backend> {
    fc_in: Linear<B>,
    fc_hidden: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> TabularGenerator<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            fc_in: linear(LATENT_DIM + NUM_CONDITIONS, 256, device),
            fc_hidden: linear(256, 128, device),
            output: linear(128, NUM_TABULAR, device),
        }
    }

    pub fn forward(&self, latent: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = Tensor::cat(vec![latent, conditions], 1);
        let x = relu(self.fc_in.forward(x));
        let x = relu(self.fc_hidden.forward(x));
        sigmoid(self.output.forward(x))
    }
}

impl<B: Backend> ConditionalGenerator<B, 2> for TabularGenerator<B> {
    fn generate(&self, latent: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(latent, conditions)
    }
}
