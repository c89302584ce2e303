use std::{fmt, str::FromStr};

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        generation::{AGE_BAND, MAX_AGE, MIN_AGE},
        model::NUM_CONDITIONS,
        schema::{COND_AGE_INDEX, COND_DISEASE_INDEX, COND_FEATURES, COND_GENDER_INDEX},
        DISEASE_TYPES, GENDERS,
    },
    data::{FittedTransforms, LabelEncoder},
    error::{GanError, Result, ViolationCode},
    types::Matrix,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Code used when no gender encoder was fitted
    pub fn code(self) -> f32 {
        match self {
            Self::Male => 0.,
            Self::Female => 1.,
        }
    }

    /// Spellings a training table may use for this gender
    fn labels(self) -> [String; 3] {
        let name = self.to_string();
        let initial = name[..1].to_string();
        [name, initial, format!("{}", self.code() as usize)]
    }
}

impl FromStr for Gender {
    type Err = GanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err(GanError::invalid(
                "gender",
                ViolationCode::NotAllowed,
                format!("{s:?} is not one of {GENDERS:?}"),
            )),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(GENDERS[self.code() as usize])
    }
}

/// Index of a disease type in [`DISEASE_TYPES`], matched case-insensitively
pub fn disease_code(name: &str) -> Result<usize> {
    let name = name.trim();
    DISEASE_TYPES
        .iter()
        .position(|disease| disease.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            GanError::invalid(
                "disease_type",
                ViolationCode::NotAllowed,
                format!("{name:?} is not one of {DISEASE_TYPES:?}"),
            )
        })
}

pub fn validate_age(age: f32) -> Result<f32> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(GanError::invalid(
            "age",
            ViolationCode::OutOfRange,
            format!("age must be between {MIN_AGE} and {MAX_AGE}, got {age}"),
        ));
    }
    Ok(age)
}

/// Age in years onto the fixed [0, 1] band, used when no Age scaler was fitted
pub fn normalize_age(age: f32) -> f32 {
    (age - MIN_AGE) / (MAX_AGE - MIN_AGE)
}

/// Requested patient profile in request units. Fields left unset are drawn
/// per row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConditionSpec {
    /// Age in years
    pub age: Option<f32>,
    pub gender: Option<Gender>,
    /// Index into [`DISEASE_TYPES`]
    pub disease: Option<usize>,
}

impl ConditionSpec {
    pub fn from_request(age: Option<f32>, gender: Option<&str>, disease: Option<&str>) -> Result<Self> {
        Ok(Self {
            age: age.map(validate_age).transpose()?,
            gender: gender.map(str::parse).transpose()?,
            disease: disease.map(disease_code).transpose()?,
        })
    }

    /// (n, NUM_CONDITIONS) conditioning matrix, encoded the way the
    /// training data was: through the fitted Age scaler and the Gender and
    /// disease encoders when present, fixed codes otherwise
    pub fn build<R: Rng + ?Sized>(&self, transforms: &FittedTransforms, n: usize, rng: &mut R) -> Result<Matrix> {
        let [age_column, gender_column, disease_column] = COND_FEATURES;
        let gender_encoder = transforms.label_encoder(gender_column);
        let disease_encoder = transforms.label_encoder(disease_column);

        let age = self.age.map(|age| match transforms.scaler(age_column) {
            Some(scaler) => scaler.transform(age as f64) as f32,
            None => normalize_age(age),
        });
        let gender = self
            .gender
            .map(|gender| category_code(gender_encoder, "gender", &gender.labels(), gender.code() as usize))
            .transpose()?;
        let disease = self
            .disease
            .map(|index| {
                let labels = [DISEASE_TYPES[index].to_string(), index.to_string()];
                category_code(disease_encoder, "disease_type", &labels, index)
            })
            .transpose()?;

        let genders = gender_encoder.map_or(GENDERS.len(), LabelEncoder::num_classes).max(1);
        let diseases = disease_encoder.map_or(DISEASE_TYPES.len(), LabelEncoder::num_classes).max(1);

        let mut conditions = Array2::zeros((n, NUM_CONDITIONS));
        for mut row in conditions.rows_mut() {
            row[COND_AGE_INDEX] = age.unwrap_or_else(|| rng.gen_range(AGE_BAND.0..AGE_BAND.1));
            row[COND_GENDER_INDEX] = gender.unwrap_or_else(|| rng.gen_range(0..genders) as f32);
            row[COND_DISEASE_INDEX] = disease.unwrap_or_else(|| rng.gen_range(0..diseases) as f32);
        }
        Ok(conditions)
    }
}

/// Every field drawn at random, gender and disease over the fitted classes
pub fn random_conditions<R: Rng + ?Sized>(n: usize, transforms: &FittedTransforms, rng: &mut R) -> Result<Matrix> {
    ConditionSpec::default().build(transforms, n, rng)
}

/// Code the encoder gave to the first class matching one of `labels`
fn category_code(encoder: Option<&LabelEncoder>, field: &'static str, labels: &[String], fallback: usize) -> Result<f32> {
    let Some(encoder) = encoder else {
        return Ok(fallback as f32);
    };
    encoder
        .classes()
        .iter()
        .position(|class| labels.iter().any(|label| class.eq_ignore_ascii_case(label)))
        .map(|code| code as f32)
        .ok_or_else(|| {
            GanError::invalid(
                field,
                ViolationCode::NotAllowed,
                format!("{:?} does not occur in the training data", labels[0]),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MinMaxScaler;
    use rand::{rngs::StdRng, SeedableRng};

    fn fitted(genders: &[&str], diseases: &[&str], ages: &[f64]) -> FittedTransforms {
        let mut transforms = FittedTransforms::default();
        transforms
            .label_encoders
            .insert("Gender".into(), LabelEncoder::fit(genders.iter().copied()));
        transforms
            .label_encoders
            .insert("disease_label".into(), LabelEncoder::fit(diseases.iter().copied()));
        transforms.scalers.insert("Age".into(), MinMaxScaler::fit(ages));
        transforms
    }

    #[test]
    fn random_conditions_stay_in_the_trained_ranges() {
        let conditions = random_conditions(200, &FittedTransforms::default(), &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(conditions.dim(), (200, NUM_CONDITIONS));
        for row in conditions.rows() {
            assert!((AGE_BAND.0..AGE_BAND.1).contains(&row[COND_AGE_INDEX]));
            assert!(row[COND_GENDER_INDEX] == 0. || row[COND_GENDER_INDEX] == 1.);
            let disease = row[COND_DISEASE_INDEX];
            assert_eq!(disease.fract(), 0.);
            assert!((0. ..DISEASE_TYPES.len() as f32).contains(&disease));
        }
    }

    #[test]
    fn random_categories_follow_the_fitted_classes() {
        let transforms = fitted(&["F", "M"], &["Other", "Respiratory", "Diabetes"], &[20., 80.]);
        let conditions = random_conditions(200, &transforms, &mut StdRng::seed_from_u64(3)).unwrap();
        assert!(conditions.column(COND_DISEASE_INDEX).iter().all(|&d| d < 3.));
        assert!(conditions.column(COND_DISEASE_INDEX).iter().any(|&d| d == 2.));
    }

    #[test]
    fn fixed_gender_leaves_other_fields_random() {
        let spec = ConditionSpec::from_request(None, Some("male"), None).unwrap();
        let conditions = spec.build(&FittedTransforms::default(), 44, &mut StdRng::seed_from_u64(9)).unwrap();

        let genders = conditions.column(COND_GENDER_INDEX);
        assert!(genders.iter().all(|&g| g == Gender::Male.code()));

        let ages = conditions.column(COND_AGE_INDEX);
        assert!(ages.iter().any(|&a| a != ages[0]));
        let diseases = conditions.column(COND_DISEASE_INDEX);
        assert!(diseases.iter().any(|&d| d != diseases[0]));
    }

    #[test]
    fn requests_use_the_fitted_encoders_and_scaler() {
        let transforms = fitted(
            &["Male", "Female"],
            &["Diabetes", "Heart Disease", "Neurological", "Other", "Respiratory"],
            &[25., 70.],
        );
        let spec = ConditionSpec::from_request(Some(40.), Some("Male"), Some("Respiratory")).unwrap();
        let conditions = spec.build(&transforms, 3, &mut StdRng::seed_from_u64(1)).unwrap();

        for row in conditions.rows() {
            // classes sort to [Female, Male] and the disease list alphabetically
            assert_eq!(row[COND_GENDER_INDEX], 1.);
            assert_eq!(row[COND_DISEASE_INDEX], 4.);
            assert!((row[COND_AGE_INDEX] - 15. / 45.).abs() < 1e-6);
        }
        let gender = transforms.label_encoder("Gender").unwrap();
        assert_eq!(gender.decode_code(conditions[[0, COND_GENDER_INDEX]] as f64).unwrap(), "Male");
    }

    #[test]
    fn numeric_category_codes_match_the_request() {
        let transforms = fitted(&["0", "1"], &["0", "1", "2", "3", "4"], &[18., 90.]);
        let spec = ConditionSpec::from_request(Some(54.), Some("female"), Some("heart disease")).unwrap();
        let conditions = spec.build(&transforms, 1, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(conditions[[0, COND_GENDER_INDEX]], Gender::Female.code());
        assert_eq!(conditions[[0, COND_DISEASE_INDEX]], 1.);
        assert!((conditions[[0, COND_AGE_INDEX]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn categories_absent_from_training_are_rejected() {
        let transforms = fitted(&["Female", "Male"], &["Diabetes", "Other"], &[20., 80.]);
        let spec = ConditionSpec::from_request(None, None, Some("Respiratory")).unwrap();
        let err = spec.build(&transforms, 2, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, GanError::InvalidArgument(v) if v.field == "disease_type" && v.code == ViolationCode::NotAllowed));
    }

    #[test]
    fn requests_are_parsed_case_insensitively() {
        let spec = ConditionSpec::from_request(Some(54.), Some("FEMALE"), Some("heart disease")).unwrap();
        assert_eq!(spec.age, Some(54.));
        assert_eq!(spec.gender, Some(Gender::Female));
        assert_eq!(spec.disease, Some(1));
        assert_eq!(normalize_age(54.), 0.5);
    }

    #[test]
    fn rejects_values_outside_the_enums() {
        let err = validate_age(17.5).unwrap_err();
        assert!(matches!(err, GanError::InvalidArgument(v) if v.field == "age" && v.code == ViolationCode::OutOfRange));
        assert!(validate_age(90.).is_ok());

        let err = "other".parse::<Gender>().unwrap_err();
        assert!(matches!(err, GanError::InvalidArgument(v) if v.field == "gender"));

        let err = disease_code("Flu").unwrap_err();
        assert!(matches!(err, GanError::InvalidArgument(v) if v.code == ViolationCode::NotAllowed));
    }
}
