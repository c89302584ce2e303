pub mod paths {
    pub const TIME_SERIES_PATH: &str = "datasets/cleaned_merged_data.csv";
    pub const TABULAR_PATH: &str = "datasets/cleaned_tabular_data.csv";
    pub const MODEL_PATH: &str = "trained_models";
    pub const OUTPUT_PATH: &str = "synthetic_data";
}

/// Column names shared by every input and output table
pub mod schema {
    pub const RECORD_ID: &str = "RecordID";
    pub const TIME_STEP: &str = "TimeStep";
    pub const DISEASE_LABEL: &str = "disease_label";

    /// Time-series channels, one per sequence feature
    pub const FEATURES: [&str; 10] = [
        "HR", "Temp", "RespRate", "DiasABP", "Glucose", "BUN", "Creatinine", "WBC", "HCT", "GCS",
    ];
    /// Static per-patient features
    pub const TABULAR_FEATURES: [&str; 6] = ["Age", "Gender", "Height", "Weight", "ICUType", "Outcome"];
    /// Conditioning vector layout: age, gender, disease
    pub const COND_FEATURES: [&str; 3] = ["Age", "Gender", DISEASE_LABEL];

    pub const CATEGORICAL_COLUMNS: [&str; 4] = [DISEASE_LABEL, "Gender", "ICUType", "Outcome"];
    pub const EXTRA_NUMERIC_COLUMNS: [&str; 3] = ["Age", "Height", "Weight"];

    pub fn numeric_columns() -> impl Iterator<Item = &'static str> {
        FEATURES.iter().chain(EXTRA_NUMERIC_COLUMNS.iter()).copied()
    }

    pub const COND_AGE_INDEX: usize = 0;
    pub const COND_GENDER_INDEX: usize = 1;
    pub const COND_DISEASE_INDEX: usize = 2;
}

pub mod model {
    use super::schema::{COND_FEATURES, FEATURES, TABULAR_FEATURES};

    pub const SEQ_LENGTH: usize = 24;
    pub const LATENT_DIM: usize = 100;
    pub const HIDDEN_DIM: usize = 128;

    pub const NUM_FEATURES: usize = FEATURES.len();
    pub const NUM_TABULAR: usize = TABULAR_FEATURES.len();
    pub const NUM_CONDITIONS: usize = COND_FEATURES.len();
}

pub mod training {
    pub const BATCH_SIZE: usize = 32;
    pub const EPOCHS: usize = 100;
    pub const LEARNING_RATE: f64 = 2e-4;
    pub const BETA_1: f32 = 0.5;
    pub const BETA_2: f32 = 0.999;
}

pub mod generation {
    /// Rows generated per forward pass
    pub const BATCH_SIZE: usize = 32;
    pub const PREVIEW_SAMPLES: usize = 3;
    /// Random ages are drawn from this normalized band
    pub const AGE_BAND: (f32, f32) = (0.05, 0.95);
    pub const MIN_AGE: f32 = 18.;
    pub const MAX_AGE: f32 = 90.;
}

pub const DISEASE_TYPES: [&str; 5] = ["Diabetes", "Heart Disease", "Respiratory", "Neurological", "Other"];
pub const GENDERS: [&str; 2] = ["Male", "Female"];

const _: () = assert!(model::NUM_CONDITIONS == 3, "conditioning layout is age, gender, disease");
