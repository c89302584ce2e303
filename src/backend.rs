use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

pub type ElemType = f32;

/// Forward-only backend used for generation
pub type InferenceBackend = NdArray<ElemType>;

/// Backend with gradient tracking used for training
pub type TrainingBackend = Autodiff<InferenceBackend>;

pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}
