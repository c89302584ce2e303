use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{activation::softmax, backend::Backend, Tensor},
};

/// Scores every time step with a scalar gate, softmax-normalized over time,
/// and re-weights the step's hidden vector by it
#[derive(Module, Debug)]
pub struct TemporalAttention<B: Backend> {
    score: Linear<B>,
}

impl<B: Backend> TemporalAttention<B> {
    pub fn new(hidden_dim: usize, device: &B::Device) -> Self {
        Self {
            score: LinearConfig::new(hidden_dim, 1).init(device),
        }
    }

    /// (batch, steps, hidden) -> (batch, steps, 1), sums to one over steps
    pub fn weights(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        softmax(self.score.forward(input), 1)
    }

    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let weights = self.weights(input.clone()).expand(input.dims());
        input * weights
    }
}
