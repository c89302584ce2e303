use std::path::Path;

use hashbrown::{HashMap, HashSet};
use ndarray::{Array2, Array3};
use tracing::{info, warn};

use crate::{
    constants::{
        model::{NUM_CONDITIONS, NUM_FEATURES, NUM_TABULAR, SEQ_LENGTH},
        schema::{self, CATEGORICAL_COLUMNS, COND_FEATURES, FEATURES, RECORD_ID, TABULAR_FEATURES},
    },
    data::{
        table::{canonical_value, parse_number, Table},
        transform::{FittedTransforms, LabelEncoder, MinMaxScaler},
        triple::TensorTriple,
    },
    error::{GanError, Result},
};

/// Category given to empty cells of a categorical column
pub const MISSING_CATEGORY: &str = "unknown";

/// Merged rows after encoding: one value vector per configured column,
/// aligned with `record_ids`
#[derive(Debug, Clone, Default)]
pub struct EncodedTable {
    pub record_ids: Vec<String>,
    pub columns: HashMap<String, Vec<f64>>,
}

impl EncodedTable {
    pub fn len(&self) -> usize {
        self.record_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_ids.is_empty()
    }
}

/// Records the join dropped or deduplicated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Time-series RecordIDs with no tabular row
    pub missing_in_tabular: usize,
    /// Tabular RecordIDs with no time-series rows
    pub missing_in_series: usize,
    /// Tabular RecordIDs with more than one row
    pub duplicated: usize,
}

#[derive(Debug, Default)]
pub struct DataPreprocessor {
    transforms: FittedTransforms,
}

impl DataPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_and_preprocess(
        &mut self,
        time_series_path: impl AsRef<Path>,
        tabular_path: impl AsRef<Path>,
    ) -> Result<(TensorTriple, FittedTransforms)> {
        info!("Loading time series data from {}", time_series_path.as_ref().display());
        let time_series = Table::read_csv(time_series_path)?;
        info!("Loading tabular data from {}", tabular_path.as_ref().display());
        let tabular = Table::read_csv(tabular_path)?;

        self.preprocess_tables(&time_series, &tabular)
    }

    pub fn preprocess_tables(&mut self, time_series: &Table, tabular: &Table) -> Result<(TensorTriple, FittedTransforms)> {
        let (merged, _) = merge_tables(time_series, tabular)?;
        let encoded = self.fit_transform(&merged)?;
        let triple = preprocess_for_model(&encoded)?;

        info!(
            "Preprocessed {} merged rows into {} records",
            merged.len(),
            triple.len()
        );
        Ok((triple, self.transforms.clone()))
    }

    /// Fit a fresh encoder per categorical column and a fresh scaler per
    /// numeric column, replacing any previous fit
    pub fn fit_transform(&mut self, merged: &Table) -> Result<EncodedTable> {
        self.transforms = FittedTransforms::default();

        let id_index = merged.require_column(RECORD_ID, "merged")?;
        let mut encoded = EncodedTable {
            record_ids: merged.rows().iter().map(|row| row[id_index].clone()).collect(),
            columns: HashMap::new(),
        };

        for column in CATEGORICAL_COLUMNS {
            let Some(cells) = merged.column(column) else {
                continue;
            };
            let labels: Vec<String> = cells
                .map(|cell| match cell.trim() {
                    "" => MISSING_CATEGORY.to_string(),
                    value => canonical_value(value),
                })
                .collect();

            let encoder = LabelEncoder::fit(labels.iter().map(String::as_str));
            let codes = labels
                .iter()
                .map(|label| encoder.encode(column, label).map(|code| code as f64))
                .collect::<Result<Vec<_>>>()?;

            encoded.columns.insert(column.to_string(), codes);
            self.transforms.label_encoders.insert(column.to_string(), encoder);
        }

        for column in schema::numeric_columns() {
            let Some(cells) = merged.column(column) else {
                continue;
            };
            let mut values: Vec<f64> = cells.map(|cell| parse_number(cell).unwrap_or(f64::NAN)).collect();

            let missing = values.iter().filter(|v| v.is_nan()).count();
            if missing > 0 {
                let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
                let mean = if present.is_empty() {
                    0.
                } else {
                    present.iter().sum::<f64>() / present.len() as f64
                };
                warn!("{missing} missing values found in column {column}. Filling with mean {mean:.4}");
                for v in values.iter_mut().filter(|v| v.is_nan()) {
                    *v = mean;
                }
            }

            let scaler = MinMaxScaler::fit(&values);
            for v in values.iter_mut() {
                *v = scaler.transform(*v);
            }

            encoded.columns.insert(column.to_string(), values);
            self.transforms.scalers.insert(column.to_string(), scaler);
        }

        Ok(encoded)
    }
}

/// Inner join on RecordID, one output row per time-series row. Records
/// present on only one side are dropped, logged and counted in the report.
pub fn merge_tables(time_series: &Table, tabular: &Table) -> Result<(Table, MergeReport)> {
    let ts_id = time_series.require_column(RECORD_ID, "time series")?;
    let tab_id = tabular.require_column(RECORD_ID, "tabular")?;

    let mut tabular_rows: HashMap<String, usize> = HashMap::new();
    let mut duplicated: HashSet<String> = HashSet::new();
    for (i, row) in tabular.rows().iter().enumerate() {
        let id = canonical_value(&row[tab_id]);
        if tabular_rows.contains_key(&id) {
            duplicated.insert(id);
        } else {
            tabular_rows.insert(id, i);
        }
    }
    if !duplicated.is_empty() {
        warn!(
            "{} RecordIDs in tabular data have multiple rows, keeping the first row of each",
            duplicated.len()
        );
    }

    let series_ids: HashSet<String> = time_series
        .rows()
        .iter()
        .map(|row| canonical_value(&row[ts_id]))
        .collect();

    let missing_in_tabular = series_ids.iter().filter(|id| !tabular_rows.contains_key(*id)).count();
    let missing_in_series = tabular_rows.keys().filter(|id| !series_ids.contains(*id)).count();
    if missing_in_tabular > 0 {
        warn!("{missing_in_tabular} RecordIDs in time-series data not found in tabular data");
    }
    if missing_in_series > 0 {
        warn!("{missing_in_series} RecordIDs in tabular data not found in time-series data");
    }

    // Columns shared by both sources keep the time-series value
    let tabular_columns: Vec<usize> = tabular
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != tab_id && !time_series.has_column(name))
        .map(|(i, _)| i)
        .collect();

    let mut columns = time_series.columns().to_vec();
    columns.extend(tabular_columns.iter().map(|&i| tabular.columns()[i].clone()));

    let mut rows = Vec::new();
    for row in time_series.rows() {
        let id = canonical_value(&row[ts_id]);
        let Some(&tab_row) = tabular_rows.get(&id) else {
            continue;
        };
        let tab_row = &tabular.rows()[tab_row];

        let mut merged = row.clone();
        merged[ts_id] = id;
        merged.extend(tabular_columns.iter().map(|&i| tab_row[i].clone()));
        rows.push(merged);
    }

    if rows.is_empty() {
        return Err(GanError::DataFormat(
            "no matching records found between time series and tabular data".into(),
        ));
    }

    let report = MergeReport {
        missing_in_tabular,
        missing_in_series,
        duplicated: duplicated.len(),
    };
    Ok((Table::new(columns, rows)?, report))
}

/// Reshape encoded rows into one sequence, tabular vector and condition
/// vector per record, in order of first appearance
pub fn preprocess_for_model(encoded: &EncodedTable) -> Result<TensorTriple> {
    if encoded.is_empty() {
        return Ok(TensorTriple::zeros(0));
    }

    let zeros = vec![0.; encoded.len()];
    let feature_columns = columns_or_zeros(encoded, &zeros, &FEATURES, "FEATURES");
    let tabular_columns = columns_or_zeros(encoded, &zeros, &TABULAR_FEATURES, "TABULAR_FEATURES");
    let condition_columns = columns_or_zeros(encoded, &zeros, &COND_FEATURES, "COND_FEATURES");

    let mut record_ids: Vec<String> = Vec::new();
    let mut record_to_index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (row, id) in encoded.record_ids.iter().enumerate() {
        let index = *record_to_index.entry(id.as_str()).or_insert_with(|| {
            record_ids.push(id.clone());
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[index].push(row);
    }

    let n = record_ids.len();
    let mut sequences = Array3::<f32>::zeros((n, SEQ_LENGTH, NUM_FEATURES));
    let mut tabular = Array2::<f32>::zeros((n, NUM_TABULAR));
    let mut conditions = Array2::<f32>::zeros((n, NUM_CONDITIONS));

    for (index, rows) in groups.iter().enumerate() {
        for (step, &row) in rows.iter().take(SEQ_LENGTH).enumerate() {
            for (feature, values) in feature_columns.iter().enumerate() {
                sequences[[index, step, feature]] = values[row] as f32;
            }
        }

        let first = rows[0];
        for (j, values) in tabular_columns.iter().enumerate() {
            tabular[[index, j]] = values[first] as f32;
        }
        for (j, values) in condition_columns.iter().enumerate() {
            conditions[[index, j]] = values[first] as f32;
        }
    }

    TensorTriple::new(sequences, tabular, conditions, record_ids)
}

/// Configured columns in order, absent ones materialised as zeros
fn columns_or_zeros<'a>(encoded: &'a EncodedTable, zeros: &'a [f64], names: &[&str], group: &str) -> Vec<&'a [f64]> {
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| !encoded.columns.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        warn!("Missing columns in {group}: {missing:?}, filling with zeros");
    }

    names
        .iter()
        .map(|name| encoded.columns.get(*name).map_or(zeros, Vec::as_slice))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::schema::DISEASE_LABEL;

    fn series_csv(ids: &[u32], steps: usize) -> String {
        let mut csv = String::from("RecordID,Time,HR,Temp,RespRate,DiasABP,Glucose,BUN,Creatinine,WBC,HCT,GCS\n");
        for id in ids {
            for step in 0..steps {
                let hr = 60 + (*id as usize * 3 + step) % 50;
                csv.push_str(&format!(
                    "{id},{step},{hr},{},18,70,110,15,1.1,9.5,38,15\n",
                    36.0 + step as f64 * 0.1
                ));
            }
        }
        csv
    }

    fn tabular_csv(ids: &[u32]) -> String {
        let mut csv = String::from("RecordID,Age,Gender,Height,Weight,ICUType,Outcome,disease_label\n");
        for id in ids {
            let disease = ["sepsis", "cardiac", "renal"][*id as usize % 3];
            csv.push_str(&format!(
                "{id},{},{},{},{},{},{},{disease}\n",
                30 + id,
                id % 2,
                160 + id,
                60 + id,
                1 + id % 4,
                id % 2
            ));
        }
        csv
    }

    fn tables(series_ids: &[u32], tabular_ids: &[u32], steps: usize) -> (Table, Table) {
        (
            Table::from_reader(series_csv(series_ids, steps).as_bytes()).unwrap(),
            Table::from_reader(tabular_csv(tabular_ids).as_bytes()).unwrap(),
        )
    }

    #[test]
    fn merges_only_shared_records() {
        let series_ids: Vec<u32> = (1..=12).collect();
        let tabular_ids: Vec<u32> = (1..=10).chain([40]).collect();
        let (series, tabular) = tables(&series_ids, &tabular_ids, 3);

        let (merged, report) = merge_tables(&series, &tabular).unwrap();
        assert_eq!(merged.len(), 30);
        assert_eq!(report.missing_in_tabular, 2);
        assert_eq!(report.missing_in_series, 1);
        assert_eq!(report.duplicated, 0);

        let ids: HashSet<&str> = merged.column(RECORD_ID).unwrap().collect();
        let expected: Vec<String> = (1..=10).map(|i| i.to_string()).collect();
        let expected: HashSet<&str> = expected.iter().map(String::as_str).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn disjoint_records_fail_to_merge() {
        let (series, tabular) = tables(&[1, 2], &[3, 4], 2);
        let err = merge_tables(&series, &tabular).unwrap_err();
        assert!(matches!(err, GanError::DataFormat(_)));
    }

    #[test]
    fn missing_record_id_column_is_a_format_error() {
        let series = Table::from_reader("Id,HR\n1,80\n".as_bytes()).unwrap();
        let tabular = Table::from_reader(tabular_csv(&[1]).as_bytes()).unwrap();
        assert!(matches!(merge_tables(&series, &tabular), Err(GanError::DataFormat(_))));
    }

    #[test]
    fn duplicate_tabular_rows_keep_the_first() {
        let series = Table::from_reader("RecordID,HR\n1,80\n1,81\n".as_bytes()).unwrap();
        let tabular = Table::from_reader("RecordID,Age\n1.0,40\n1,90\n".as_bytes()).unwrap();

        let (merged, report) = merge_tables(&series, &tabular).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(report.duplicated, 1);
        let ages: Vec<&str> = merged.column("Age").unwrap().collect();
        assert_eq!(ages, ["40", "40"]);
    }

    #[test]
    fn output_shapes_follow_distinct_records() {
        let series_ids: Vec<u32> = (1..=12).collect();
        let tabular_ids: Vec<u32> = (1..=11).collect();
        let (series, tabular) = tables(&series_ids, &tabular_ids, 5);

        let mut preprocessor = DataPreprocessor::new();
        let (triple, transforms) = preprocessor.preprocess_tables(&series, &tabular).unwrap();

        assert_eq!(triple.sequences.shape(), [11, SEQ_LENGTH, NUM_FEATURES]);
        assert_eq!(triple.tabular.shape(), [11, NUM_TABULAR]);
        assert_eq!(triple.conditions.shape(), [11, NUM_CONDITIONS]);
        assert_eq!(triple.record_ids[0], "1");
        assert!(transforms.scaler("HR").is_some());
        assert_eq!(transforms.label_encoder(DISEASE_LABEL).unwrap().num_classes(), 3);
    }

    #[test]
    fn values_are_scaled_and_sequences_padded() {
        let (series, tabular) = tables(&[1, 2, 3], &[1, 2, 3], 4);
        let (triple, _) = DataPreprocessor::new().preprocess_tables(&series, &tabular).unwrap();

        assert!(triple.sequences.iter().all(|v| (0. ..=1.).contains(v)));
        assert!(triple.tabular.iter().all(|v| v.is_finite()));
        // steps past the recorded length stay zero
        for step in 4..SEQ_LENGTH {
            for feature in 0..NUM_FEATURES {
                assert_eq!(triple.sequences[[0, step, feature]], 0.);
            }
        }
    }

    #[test]
    fn long_sequences_are_truncated() {
        let (series, tabular) = tables(&[1, 2], &[1, 2], SEQ_LENGTH + 6);
        let (triple, _) = DataPreprocessor::new().preprocess_tables(&series, &tabular).unwrap();
        assert_eq!(triple.sequences.shape(), [2, SEQ_LENGTH, NUM_FEATURES]);
        // Temp keeps rising with the step, so the last kept step is the maximum seen so far
        let temp = FEATURES.iter().position(|f| *f == "Temp").unwrap();
        assert!(triple.sequences[[0, SEQ_LENGTH - 1, temp]] < 1.);
    }

    #[test]
    fn missing_values_are_mean_imputed() {
        let series = Table::from_reader("RecordID,HR\n1,60\n1,\n1,100\n".as_bytes()).unwrap();
        let tabular = Table::from_reader("RecordID,Age\n1,50\n".as_bytes()).unwrap();
        let (merged, _) = merge_tables(&series, &tabular).unwrap();

        let encoded = DataPreprocessor::new().fit_transform(&merged).unwrap();
        assert_eq!(encoded.columns["HR"], [0., 0.5, 1.]);
    }

    #[test]
    fn missing_columns_are_zero_filled() {
        let series = Table::from_reader("RecordID,HR\n1,60\n2,100\n".as_bytes()).unwrap();
        let tabular = Table::from_reader("RecordID,Age\n1,50\n2,70\n".as_bytes()).unwrap();
        let (triple, _) = DataPreprocessor::new().preprocess_tables(&series, &tabular).unwrap();

        assert_eq!(triple.len(), 2);
        assert_eq!(triple.sequences[[1, 0, 0]], 1.);
        assert_eq!(triple.sequences[[1, 0, 1]], 0.);
        assert_eq!(triple.conditions[[1, 0]], 1.);
        assert_eq!(triple.conditions[[1, 2]], 0.);
    }

    #[test]
    fn rows_follow_the_record_index() {
        let (series, tabular) = tables(&[5, 3, 9], &[9, 3, 5], 2);
        let (triple, transforms) = DataPreprocessor::new().preprocess_tables(&series, &tabular).unwrap();

        assert_eq!(triple.record_ids, ["5", "3", "9"]);
        let age = transforms.scaler("Age").unwrap();
        let age_of = |i: usize| age.inverse_transform(triple.tabular[[i, 0]] as f64).unwrap();
        assert!((age_of(0) - 35.).abs() < 1e-4);
        assert!((age_of(1) - 33.).abs() < 1e-4);
        assert!((age_of(2) - 39.).abs() < 1e-4);
    }
}
