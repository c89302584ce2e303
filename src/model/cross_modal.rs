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
    constants::model::{HIDDEN_DIM, NUM_CONDITIONS, NUM_FEATURES, NUM_TABULAR, SEQ_LENGTH},
    model::{encode_sequence, linear, lstm},
};

/// Reconstructs each modality from the other. The two heads share no
/// parameters.
#[derive(Module, Debug)]
pub struct CrossModalGenerator<B: Backend> {
    tab_to_ts_in: Linear<B>,
    tab_to_ts_out: Linear<B>,
    ts_encoder: Lstm<B>,
    ts_to_tab_in: Linear<B>,
    ts_to_tab_out: Linear<B>,
}

impl<B: Backend> CrossModalGenerator<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            tab_to_ts_in: linear(NUM_TABULAR + NUM_CONDITIONS, 256, device),
            tab_to_ts_out: linear(256, SEQ_LENGTH * NUM_FEATURES, device),
            ts_encoder: lstm(NUM_FEATURES, HIDDEN_DIM, device),
            ts_to_tab_in: linear(HIDDEN_DIM + NUM_CONDITIONS, 128, device),
            ts_to_tab_out: linear(128, NUM_TABULAR, device),
        }
    }

    /// (batch, tabular) -> (batch, SEQ_LENGTH, features)
    pub fn ts_from_tab(&self, tabular: Tensor<B, 2>, conditions: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, _] = tabular.dims();
        let x = Tensor::cat(vec![tabular, conditions], 1);
        let x = relu(self.tab_to_ts_in.forward(x));
        sigmoid(self.tab_to_ts_out.forward(x)).reshape([batch, SEQ_LENGTH, NUM_FEATURES])
    }

    /// (batch, SEQ_LENGTH, features) -> (batch, tabular)
    pub fn tab_from_ts(&self, sequences: Tensor<B, 3>, conditions: Tensor<B, 2>) -> Tensor<B, 2> {
        let hidden = encode_sequence(&self.ts_encoder, sequences);
        let x = Tensor::cat(vec![hidden, conditions], 1);
        let x = relu(self.ts_to_tab_in.forward(x));
        sigmoid(self.ts_to_tab_out.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceBackend;
    use burn::tensor::Distribution;

    type B = InferenceBackend;

    #[test]
    fn heads_map_between_modalities() {
        let device = Default::default();
        let cross = CrossModalGenerator::<B>::new(&device);
        let conditions = Tensor::<B, 2>::random([2, NUM_CONDITIONS], Distribution::Default, &device);

        let tabular = Tensor::<B, 2>::random([2, NUM_TABULAR], Distribution::Default, &device);
        let sequences = cross.ts_from_tab(tabular, conditions.clone());
        assert_eq!(sequences.dims(), [2, SEQ_LENGTH, NUM_FEATURES]);

        let tabular = cross.tab_from_ts(sequences, conditions);
        assert_eq!(tabular.dims(), [2, NUM_TABULAR]);
        let values = tabular.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (0. ..=1.).contains(v)));
    }
}
