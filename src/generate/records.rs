use std::{
    fmt,
    path::{Path, PathBuf},
};

use csv::Writer;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    constants::schema::{COND_FEATURES, DISEASE_LABEL, FEATURES, RECORD_ID, TABULAR_FEATURES, TIME_STEP},
    data::{FittedTransforms, LabelEncoder, MinMaxScaler},
    error::{GanError, Result},
    generate::Synthetic,
    utils::{create_folder_if_not_exists, timestamp},
};

/// One decoded output cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Number(f64),
    Label(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Label(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &FieldValue>> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(move |row| &row[i]))
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(ToString::to_string))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyntheticRecords {
    /// One row per record and time step
    pub time_series: RecordSet,
    /// One row per record
    pub tabular: RecordSet,
}

/// How a generated value is mapped back to original units
enum Decoder<'a> {
    Scale(&'a MinMaxScaler),
    /// Categorical output of a sigmoid, spread over the classes
    Unit(&'a LabelEncoder),
    /// Categorical condition given as a class code
    Code(&'a LabelEncoder),
    Integer,
    Raw,
}

impl<'a> Decoder<'a> {
    fn for_output(column: &str, transforms: &'a FittedTransforms) -> Self {
        if let Some(scaler) = transforms.scaler(column) {
            Self::Scale(scaler)
        } else if let Some(encoder) = transforms.label_encoder(column) {
            Self::Unit(encoder)
        } else {
            warn!("No fitted transform for {column}, writing raw values");
            Self::Raw
        }
    }

    fn for_condition(column: &str, transforms: &'a FittedTransforms) -> Self {
        if column == DISEASE_LABEL {
            Self::Integer
        } else if let Some(scaler) = transforms.scaler(column) {
            Self::Scale(scaler)
        } else if let Some(encoder) = transforms.label_encoder(column) {
            Self::Code(encoder)
        } else {
            warn!("No fitted transform for condition {column}, writing raw values");
            Self::Raw
        }
    }

    /// Falls back to the raw value when decoding fails
    fn decode(&self, column: &str, value: f32) -> FieldValue {
        let value = value as f64;
        let decoded = match self {
            Self::Scale(scaler) => scaler.inverse_transform(value).map(FieldValue::Number),
            Self::Unit(encoder) => encoder.decode_unit(value).map(|label| FieldValue::Label(label.to_string())),
            Self::Code(encoder) => encoder.decode_code(value).map(|label| FieldValue::Label(label.to_string())),
            Self::Integer if value.is_finite() => Ok(FieldValue::Integer(value.round() as i64)),
            Self::Integer => Err(GanError::Transform(format!("cannot round {value}"))),
            Self::Raw => Ok(FieldValue::Number(value)),
        };
        decoded.unwrap_or_else(|e| {
            warn!("Error processing {column}: {e}");
            FieldValue::Number(value)
        })
    }
}

/// Decode generated tensors into record sets in original units. Record
/// ids start at 1 and follow the generated row order.
pub fn serialize(synthetic: &Synthetic, transforms: &FittedTransforms) -> SyntheticRecords {
    let feature_decoders: Vec<Decoder> = FEATURES.iter().map(|f| Decoder::for_output(f, transforms)).collect();

    let (records, steps, _) = synthetic.sequences.dim();
    let mut time_series = RecordSet {
        columns: [RECORD_ID, TIME_STEP].iter().chain(FEATURES.iter()).map(|c| c.to_string()).collect(),
        rows: Vec::with_capacity(records * steps),
    };
    for (i, sequence) in synthetic.sequences.outer_iter().enumerate() {
        for (step, values) in sequence.outer_iter().enumerate() {
            let mut row = vec![FieldValue::Integer(i as i64 + 1), FieldValue::Integer(step as i64)];
            row.extend(
                FEATURES
                    .iter()
                    .zip(&feature_decoders)
                    .zip(values.iter())
                    .map(|((column, decoder), &v)| decoder.decode(column, v)),
            );
            time_series.rows.push(row);
        }
    }

    // Conditioned columns overwrite the generated value, the rest are appended
    let mut columns: Vec<&str> = TABULAR_FEATURES.to_vec();
    columns.extend(COND_FEATURES.iter().filter(|c| !TABULAR_FEATURES.contains(*c)));
    let tabular_decoders: Vec<Decoder> = TABULAR_FEATURES
        .iter()
        .map(|f| Decoder::for_output(f, transforms))
        .collect();
    let condition_decoders: Vec<Decoder> = COND_FEATURES
        .iter()
        .map(|f| Decoder::for_condition(f, transforms))
        .collect();

    let mut tabular = RecordSet {
        columns: std::iter::once(RECORD_ID).chain(columns.iter().copied()).map(str::to_string).collect(),
        rows: Vec::with_capacity(synthetic.tabular.nrows()),
    };
    for (i, (generated, conditions)) in synthetic
        .tabular
        .outer_iter()
        .zip(synthetic.conditions.outer_iter())
        .enumerate()
    {
        let mut row = vec![FieldValue::Number(f64::NAN); columns.len()];
        for (j, (column, decoder)) in TABULAR_FEATURES.iter().zip(&tabular_decoders).enumerate() {
            row[j] = decoder.decode(column, generated[j]);
        }
        for (j, (column, decoder)) in COND_FEATURES.iter().zip(&condition_decoders).enumerate() {
            if let Some(k) = columns.iter().position(|c| c == column) {
                row[k] = decoder.decode(column, conditions[j]);
            }
        }
        row.insert(0, FieldValue::Integer(i as i64 + 1));
        tabular.rows.push(row);
    }

    SyntheticRecords { time_series, tabular }
}

/// Writes `synthetic_timeseries_<ts>_<n>.csv` and
/// `synthetic_tabular_<ts>_<n>.csv`, returning both paths
pub fn write_records(
    records: &SyntheticRecords,
    output_dir: impl AsRef<Path>,
    num_samples: usize,
) -> Result<(PathBuf, PathBuf)> {
    let output_dir = output_dir.as_ref();
    create_folder_if_not_exists(output_dir)?;

    let timestamp = timestamp();
    let ts_file = output_dir.join(format!("synthetic_timeseries_{timestamp}_{num_samples}.csv"));
    let tab_file = output_dir.join(format!("synthetic_tabular_{timestamp}_{num_samples}.csv"));

    records.time_series.write_csv(&ts_file)?;
    records.tabular.write_csv(&tab_file)?;

    info!("Synthetic data saved to {} and {}", ts_file.display(), tab_file.display());
    Ok((ts_file, tab_file))
}
