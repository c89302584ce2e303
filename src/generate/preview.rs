use serde::{Deserialize, Serialize};

use crate::generate::Synthetic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSample {
    pub record_id: usize,
    pub time_series: Vec<Vec<f32>>,
    pub tabular: Vec<f32>,
    pub conditions: Vec<f32>,
}

/// Shapes of the generated tensors plus the first few records, still in
/// normalized units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub num_generated: usize,
    pub time_series_shape: Vec<usize>,
    pub tabular_shape: Vec<usize>,
    pub conditions_shape: Vec<usize>,
    pub samples: Vec<PreviewSample>,
}

pub fn preview(synthetic: &Synthetic, max_samples: usize) -> Preview {
    let samples = synthetic
        .sequences
        .outer_iter()
        .zip(synthetic.tabular.outer_iter())
        .zip(synthetic.conditions.outer_iter())
        .take(max_samples)
        .enumerate()
        .map(|(i, ((sequence, tabular), conditions))| PreviewSample {
            record_id: i + 1,
            time_series: sequence.outer_iter().map(|step| step.to_vec()).collect(),
            tabular: tabular.to_vec(),
            conditions: conditions.to_vec(),
        })
        .collect();

    Preview {
        num_generated: synthetic.len(),
        time_series_shape: synthetic.sequences.shape().to_vec(),
        tabular_shape: synthetic.tabular.shape().to_vec(),
        conditions_shape: synthetic.conditions.shape().to_vec(),
        samples,
    }
}
