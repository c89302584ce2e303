use std::{collections::BTreeSet, fs, path::Path};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{GanError, Result};

/// Maps one numeric column onto [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: f64,
    pub data_max: f64,
}

impl MinMaxScaler {
    /// Fit to the finite values given, an all-missing column fits to [0, 0]
    pub fn fit(values: &[f64]) -> Self {
        let mut data_min = f64::INFINITY;
        let mut data_max = f64::NEG_INFINITY;
        for &v in values.iter().filter(|v| v.is_finite()) {
            data_min = data_min.min(v);
            data_max = data_max.max(v);
        }

        if data_min > data_max {
            return Self { data_min: 0., data_max: 0. };
        }
        Self { data_min, data_max }
    }

    /// Zero-width columns use a unit range so transforms stay finite
    fn range(&self) -> f64 {
        let range = self.data_max - self.data_min;
        if range == 0. {
            1.
        } else {
            range
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.data_min) / self.range()
    }

    /// Back to original units, clipping to [0, 1] first
    pub fn inverse_transform(&self, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(GanError::Transform(format!("cannot inverse-scale {value}")));
        }
        Ok(value.clamp(0., 1.) * self.range() + self.data_min)
    }
}

/// Maps the categories of one column onto contiguous codes `0..n`, ordered
/// by their string form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let classes: BTreeSet<&str> = values.into_iter().collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Categories outside the fitted set are rejected rather than guessed
    pub fn encode(&self, column: &str, value: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map_err(|_| GanError::UnknownCategory {
                column: column.to_string(),
                value: value.to_string(),
            })
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Decode a code given directly, rounded to the nearest valid class
    pub fn decode_code(&self, value: f64) -> Result<&str> {
        self.decode_nearest(value)
    }

    /// Decode a value generated in [0, 1], spread over the class range
    pub fn decode_unit(&self, value: f64) -> Result<&str> {
        let last = self.classes.len().saturating_sub(1) as f64;
        self.decode_nearest(value * last)
    }

    fn decode_nearest(&self, value: f64) -> Result<&str> {
        if !value.is_finite() {
            return Err(GanError::Transform(format!("cannot decode {value}")));
        }
        let last = self
            .classes
            .len()
            .checked_sub(1)
            .ok_or_else(|| GanError::Transform("label encoder has no classes".into()))?;
        let code = value.round().clamp(0., last as f64) as usize;
        Ok(&self.classes[code])
    }
}

/// Transform state captured while preprocessing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittedTransforms {
    pub scalers: HashMap<String, MinMaxScaler>,
    pub label_encoders: HashMap<String, LabelEncoder>,
}

impl FittedTransforms {
    pub fn is_empty(&self) -> bool {
        self.scalers.is_empty() && self.label_encoders.is_empty()
    }

    pub fn scaler(&self, column: &str) -> Option<&MinMaxScaler> {
        self.scalers.get(column)
    }

    pub fn label_encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.label_encoders.get(column)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = postcard::to_stdvec(self)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(postcard::from_bytes(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaler_round_trips_inside_fitted_range() {
        let values = [36.1, 37.4, 39.8, 35.2];
        let scaler = MinMaxScaler::fit(&values);

        for &x in &values {
            let scaled = scaler.transform(x);
            assert!((0. ..=1.).contains(&scaled));
            let back = scaler.inverse_transform(scaled).unwrap();
            assert!((back - x).abs() < 1e-9, "{back} != {x}");
        }
    }

    #[test]
    fn scaler_clips_before_inverting() {
        let scaler = MinMaxScaler::fit(&[10., 20.]);
        assert_eq!(scaler.inverse_transform(1.3).unwrap(), 20.);
        assert_eq!(scaler.inverse_transform(-0.2).unwrap(), 10.);
        assert!(scaler.inverse_transform(f64::NAN).is_err());
    }

    #[test]
    fn zero_range_column_scales_to_zero() {
        let scaler = MinMaxScaler::fit(&[5., 5., 5.]);
        assert_eq!(scaler.transform(5.), 0.);
        assert_eq!(scaler.inverse_transform(0.).unwrap(), 5.);
    }

    #[test]
    fn label_codes_are_sorted_and_contiguous() {
        let encoder = LabelEncoder::fit(["sepsis", "cardiac", "sepsis", "renal"]);
        assert_eq!(encoder.classes(), ["cardiac", "renal", "sepsis"]);
        assert_eq!(encoder.encode("disease_label", "cardiac").unwrap(), 0);
        assert_eq!(encoder.encode("disease_label", "sepsis").unwrap(), 2);
        assert_eq!(encoder.decode(1), Some("renal"));
    }

    #[test]
    fn unseen_category_is_rejected() {
        let encoder = LabelEncoder::fit(["0", "1"]);
        let err = encoder.encode("Gender", "2").unwrap_err();
        assert!(matches!(err, GanError::UnknownCategory { .. }));
    }

    #[test]
    fn decodes_by_rounding_and_clamping() {
        let encoder = LabelEncoder::fit(["a", "b", "c", "d", "e"]);
        assert_eq!(encoder.decode_unit(0.0).unwrap(), "a");
        assert_eq!(encoder.decode_unit(0.49).unwrap(), "c");
        assert_eq!(encoder.decode_unit(1.7).unwrap(), "e");
        assert_eq!(encoder.decode_code(1.4).unwrap(), "b");
        assert_eq!(encoder.decode_code(-3.).unwrap(), "a");
        assert!(encoder.decode_unit(f64::NAN).is_err());
    }

    #[test]
    fn transforms_survive_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transforms.bin");

        let mut transforms = FittedTransforms::default();
        transforms.scalers.insert("HR".into(), MinMaxScaler::fit(&[60., 120.]));
        transforms
            .label_encoders
            .insert("Gender".into(), LabelEncoder::fit(["0", "1"]));
        transforms.save(&path).unwrap();

        assert_eq!(FittedTransforms::load(&path).unwrap(), transforms);
    }
}
