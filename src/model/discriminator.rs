use burn::{
    module::Module,
    nn::{Linear, Lstm},
    tensor::{
        activation::{relu, sigmoid},
        backend::Backend,
        Tensor,
    },
};

use crate::{
    constants::model::{HIDDEN_DIM, NUM_CONDITIONS, NUM_FEATURES, NUM_TABULAR},
    model::{encode_sequence, linear, lstm, ConditionalDiscriminator},
};

/// Scores (sequence, condition) pairs, 1 = real
#[derive(Module, Debug)]
pub struct TimeSeriesDiscriminator<B: Backend> {
    encoder: Lstm<B>,
    fc_hidden: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> TimeSeriesDiscriminator<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            encoder: lstm(NUM_FEATURES, HIDDEN_DIM, device),
            fc_hidden: linear(HIDDEN_DIM + NUM_CONDITIONS, 128, device),
            output: linear(128, 1, device),
        }
    }

    pub fn forward(&self, sequences: Tensor<B, 3>, conditions: Tensor<B, 2>) -> Tensor<B, 2> {
        let hidden = encode_sequence(&self.encoder, sequences);
        let x = Tensor::cat(vec![hidden, conditions], 1);
        let x = relu(self.fc_hidden.forward(x));
        sigmoid(self.output.forward(x))
    }
}

impl<B: Backend> ConditionalDiscriminator<B, 3> for TimeSeriesDiscriminator<B> {
    fn discriminate(&self, data: Tensor<B, 3>, conditions: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(data, conditions)
    }
}

/// Scores (tabular, condition) pairs, 1 = real
#[derive(Module, Debug)]
pub struct TabularDiscriminator<B: Backend> {
    fc_in: Linear<B>,
    fc_hidden: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> TabularDiscriminator<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            fc_in: linear(NUM_TABULAR + NUM_CONDITIONS, 128, device),
            fc_hidden: linear(128, 64, device),
            output: linear(64, 1, device),
        }
    }

    pub fn forward(&self, tabular: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = Tensor::cat(vec![tabular, conditions], 1);
        let x = relu(self.fc_in.forward(x));
        let x = relu(self.fc_hidden.forward(x));
        sigmoid(self.output.forward(x))
    }
}

impl<B: Backend> ConditionalDiscriminator<B, 2> for TabularDiscriminator<B> {
    fn discriminate(&self, data: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward(data, conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::InferenceBackend, constants::model::SEQ_LENGTH};
    use burn::tensor::Distribution;

    type B = InferenceBackend;

    #[test]
    fn scores_are_probabilities_per_row() {
        let device = Default::default();
        let conditions = Tensor::<B, 2>::random([5, NUM_CONDITIONS], Distribution::Default, &device);

        let sequences = Tensor::<B, 3>::random([5, SEQ_LENGTH, NUM_FEATURES], Distribution::Default, &device);
        let ts_scores = TimeSeriesDiscriminator::<B>::new(&device).forward(sequences, conditions.clone());
        assert_eq!(ts_scores.dims(), [5, 1]);

        let tabular = Tensor::<B, 2>::random([5, NUM_TABULAR], Distribution::Default, &device);
        let tab_scores = TabularDiscriminator::<B>::new(&device).forward(tabular, conditions);
        assert_eq!(tab_scores.dims(), [5, 1]);

        for scores in [ts_scores, tab_scores] {
            let values = scores.into_data().to_vec::<f32>().unwrap();
            assert!(values.iter().all(|v| (0. ..=1.).contains(v)));
        }
    }
}
