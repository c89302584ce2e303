use burn::tensor::{backend::Backend, ElementConversion, Tensor};

/// Probabilities are clamped away from 0 and 1 before taking logs
pub const BCE_EPSILON: f32 = 1e-7;

/// Mean binary cross-entropy of scores in [0, 1] against a constant label
pub fn binary_cross_entropy<B: Backend>(scores: Tensor<B, 2>, target: f32) -> Tensor<B, 1> {
    let scores = scores.clamp(BCE_EPSILON, 1. - BCE_EPSILON);
    let positive = scores.clone().log().mul_scalar(target);
    let negative = scores.neg().add_scalar(1.).log().mul_scalar(1. - target);
    (positive + negative).neg().mean()
}

pub fn mse<B: Backend, const D: usize>(prediction: Tensor<B, D>, target: Tensor<B, D>) -> Tensor<B, 1> {
    (prediction - target).powf_scalar(2.).mean()
}

pub fn scalar<B: Backend>(loss: &Tensor<B, 1>) -> f64 {
    loss.clone().into_scalar().elem::<f64>()
}
