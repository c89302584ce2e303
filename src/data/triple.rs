use ndarray::{Array2, Array3, Axis};

use crate::{
    constants::model::{NUM_CONDITIONS, NUM_FEATURES, NUM_TABULAR, SEQ_LENGTH},
    error::{GanError, Result},
    types::{Matrix, Sequences},
};

/// Sequences, tabular vectors and conditioning vectors for the same records.
/// Row `i` of every array belongs to `record_ids[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorTriple {
    pub sequences: Sequences,
    pub tabular: Matrix,
    pub conditions: Matrix,
    pub record_ids: Vec<String>,
}

impl TensorTriple {
    pub fn new(sequences: Sequences, tabular: Matrix, conditions: Matrix, record_ids: Vec<String>) -> Result<Self> {
        let n = record_ids.len();
        check_shape("sequences", &[n, SEQ_LENGTH, NUM_FEATURES], sequences.shape())?;
        check_shape("tabular", &[n, NUM_TABULAR], tabular.shape())?;
        check_shape("conditions", &[n, NUM_CONDITIONS], conditions.shape())?;

        Ok(Self {
            sequences,
            tabular,
            conditions,
            record_ids,
        })
    }

    pub fn zeros(n: usize) -> Self {
        Self {
            sequences: Array3::zeros((n, SEQ_LENGTH, NUM_FEATURES)),
            tabular: Array2::zeros((n, NUM_TABULAR)),
            conditions: Array2::zeros((n, NUM_CONDITIONS)),
            record_ids: (1..=n).map(|i| i.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.record_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_ids.is_empty()
    }

    /// Rows in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            sequences: self.sequences.select(Axis(0), indices),
            tabular: self.tabular.select(Axis(0), indices),
            conditions: self.conditions.select(Axis(0), indices),
            record_ids: indices.iter().map(|&i| self.record_ids[i].clone()).collect(),
        }
    }
}

pub fn check_shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected != actual {
        return Err(GanError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
