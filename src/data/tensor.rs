use burn::tensor::{backend::Backend, Tensor, TensorData};
use ndarray::{Array2, Array3};

use crate::error::{GanError, Result};

pub fn array2_to_tensor<B: Backend>(array: &Array2<f32>, device: &B::Device) -> Tensor<B, 2> {
    let (rows, cols) = array.dim();
    let values: Vec<f32> = array.iter().copied().collect();
    Tensor::from_data(TensorData::new(values, [rows, cols]), device)
}

pub fn array3_to_tensor<B: Backend>(array: &Array3<f32>, device: &B::Device) -> Tensor<B, 3> {
    let (n, steps, features) = array.dim();
    let values: Vec<f32> = array.iter().copied().collect();
    Tensor::from_data(TensorData::new(values, [n, steps, features]), device)
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| GanError::Tensor(format!("{e:?}")))
}

pub fn tensor_to_array2<B: Backend>(tensor: Tensor<B, 2>) -> Result<Array2<f32>> {
    let [rows, cols] = tensor.dims();
    let values = tensor_values(tensor)?;
    Array2::from_shape_vec((rows, cols), values).map_err(|e| GanError::Tensor(e.to_string()))
}

pub fn tensor_to_array3<B: Backend>(tensor: Tensor<B, 3>) -> Result<Array3<f32>> {
    let [n, steps, features] = tensor.dims();
    let values = tensor_values(tensor)?;
    Array3::from_shape_vec((n, steps, features), values).map_err(|e| GanError::Tensor(e.to_string()))
}
