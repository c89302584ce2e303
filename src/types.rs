use ndarray::{Array2, Array3};

/// Per-record sequences, (records, SEQ_LENGTH, features)
pub type Sequences = Array3<f32>;

/// One row per record
pub type Matrix = Array2<f32>;

/// Loss name to per-epoch average
pub type History = hashbrown::HashMap<String, Vec<f64>>;
