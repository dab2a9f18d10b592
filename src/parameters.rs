use std::{fmt::Debug, ops::Range, path::PathBuf};

use ixa::{define_global_property, ContextGlobalPropertiesExt, IxaError};
use serde::{Deserialize, Serialize};

/// Post-intervention shape of the growth curve. The shape parameter itself (`gamma2` for the
/// exponential curve, the exponent for the power law) is a grid dimension, see `shape_values`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum GrowthModel {
    Exponential,
    PowerLaw { decay: Option<f64> },
}

/// An inclusive, evenly spaced axis of candidate values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GridAxis {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl GridAxis {
    /// A single-valued axis.
    #[must_use]
    pub fn single(value: f64) -> Self {
        Self {
            start: value,
            stop: value,
            step: 1.0,
        }
    }

    /// Every value `start + i * step` that does not exceed `stop`. A small slack absorbs the
    /// rounding of the division so that `stop` itself is included when it lies on the grid.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn values(&self) -> Vec<f64> {
        let count = ((self.stop - self.start) / self.step + 1e-9).floor() as usize + 1;
        (0..count)
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }

    fn validate(&self, name: &str) -> Result<(), IxaError> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite()) {
            return Err(IxaError::IxaError(format!(
                "The {name} grid must have finite bounds and step."
            )));
        }
        if self.step <= 0.0 {
            return Err(IxaError::IxaError(format!(
                "The {name} grid step must be positive."
            )));
        }
        if self.stop < self.start {
            return Err(IxaError::IxaError(format!(
                "The {name} grid must not end before it starts."
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Params {
    /// The base random seed. Each grid cell derives its own seed from it. When absent, a fresh
    /// seed is drawn from the operating system and runs are not reproducible.
    pub seed: Option<u64>,
    /// CSV file with `tested` and `positive` columns, one row per observed day.
    pub observations_file: PathBuf,
    /// Total population size; caps the number of tests per day.
    pub population_size: u32,
    /// Population share of each age bracket. Must sum to 1.
    pub age_shares: Vec<f64>,
    /// Probability of death for each age bracket, parallel to `age_shares`.
    pub death_probabilities: Vec<f64>,
    /// Severity above which an infected person dies.
    pub death_threshold: f64,
    /// Days added to the disease duration per unit of peak severity.
    pub symptoms_length: u32,
    /// Upper bound (inclusive) of the uniform jitter added to the disease duration.
    pub duration_jitter: u32,
    /// Daily growth ratio before the intervention.
    pub gamma1: f64,
    /// Day of the intervention, counted from the first observed day.
    pub restriction_day: usize,
    /// Days of growth deltas generated past the last observed day.
    pub extra_days: usize,
    /// Largest number of new infections drawn for a single day. A repetition whose growth
    /// deltas call for more is degenerate and scores `+inf`.
    pub max_daily_infections: u32,
    pub growth_model: GrowthModel,
    /// Candidate post-intervention shape parameters.
    pub shape_values: GridAxis,
    /// Candidate numbers of unobserved days preceding the first observed day.
    pub prefix_lengths: Range<usize>,
    /// Candidate detection aggressiveness values.
    pub b0_values: GridAxis,
    /// Stochastic repetitions per parameter configuration.
    pub repetitions: usize,
    /// Configurations scoring below this average error keep their full per-day results.
    pub score_threshold: f64,
    /// A configuration is abandoned early when its running average error exceeds
    /// `early_stop_factor * score_threshold`.
    pub early_stop_factor: f64,
    /// File name for the profiling data, written to the output directory.
    pub profiling_data_path: Option<String>,
}

fn validate_population_tables(parameters: &Params) -> Result<(), IxaError> {
    if parameters.age_shares.is_empty() {
        return Err(IxaError::IxaError(
            "At least one age bracket must be provided.".to_string(),
        ));
    }
    if parameters.age_shares.len() != parameters.death_probabilities.len() {
        return Err(IxaError::IxaError(
            "Age shares and death probabilities must have the same length.".to_string(),
        ));
    }
    if parameters
        .age_shares
        .iter()
        .any(|share| !(0.0..=1.0).contains(share))
    {
        return Err(IxaError::IxaError(
            "Age shares must be in the range [0, 1].".to_string(),
        ));
    }
    let total_share: f64 = parameters.age_shares.iter().sum();
    if (total_share - 1.0).abs() > 1e-6 {
        return Err(IxaError::IxaError(format!(
            "Age shares must sum to 1, but they sum to {total_share}."
        )));
    }
    if parameters
        .death_probabilities
        .iter()
        .any(|probability| !(0.0..1.0).contains(probability))
    {
        return Err(IxaError::IxaError(
            "Death probabilities must be in the range [0, 1).".to_string(),
        ));
    }
    Ok(())
}

fn validate_grid(parameters: &Params) -> Result<(), IxaError> {
    parameters.shape_values.validate("shape")?;
    parameters.b0_values.validate("b0")?;
    if parameters.shape_values.start <= 0.0 {
        return Err(IxaError::IxaError(
            "Shape values must be positive.".to_string(),
        ));
    }
    if parameters.b0_values.start <= 0.0 {
        return Err(IxaError::IxaError("b0 values must be positive.".to_string()));
    }
    if parameters.prefix_lengths.is_empty() {
        return Err(IxaError::IxaError(
            "The range of prefix lengths must not be empty.".to_string(),
        ));
    }
    if let GrowthModel::PowerLaw { decay: Some(decay) } = parameters.growth_model {
        if decay <= 0.0 {
            return Err(IxaError::IxaError(
                "The power law decay must be positive.".to_string(),
            ));
        }
    }
    Ok(())
}

pub(crate) fn validate_inputs(parameters: &Params) -> Result<(), IxaError> {
    validate_population_tables(parameters)?;
    validate_grid(parameters)?;
    if parameters.population_size == 0 {
        return Err(IxaError::IxaError(
            "The population size must be positive.".to_string(),
        ));
    }
    if !(parameters.death_threshold > 0.0 && parameters.death_threshold < 1.0) {
        return Err(IxaError::IxaError(
            "The death threshold must be in the range (0, 1).".to_string(),
        ));
    }
    if parameters.symptoms_length == 0 {
        return Err(IxaError::IxaError(
            "The symptoms length must be positive.".to_string(),
        ));
    }
    if parameters.max_daily_infections == 0 {
        return Err(IxaError::IxaError(
            "The maximum number of daily infections must be positive.".to_string(),
        ));
    }
    if parameters.gamma1 <= 0.0 {
        return Err(IxaError::IxaError(
            "The pre-intervention growth ratio must be positive.".to_string(),
        ));
    }
    if parameters.repetitions == 0 {
        return Err(IxaError::IxaError(
            "The number of repetitions must be positive.".to_string(),
        ));
    }
    if !parameters.score_threshold.is_finite() {
        return Err(IxaError::IxaError(
            "The score threshold must be finite.".to_string(),
        ));
    }
    if parameters.early_stop_factor <= 0.0 {
        return Err(IxaError::IxaError(
            "The early stop factor must be positive.".to_string(),
        ));
    }
    Ok(())
}

define_global_property!(GlobalParams, Params, validate_inputs);

pub trait ContextParametersExt {
    fn get_params(&self) -> &Params;
}

impl ContextParametersExt for ixa::Context {
    fn get_params(&self) -> &Params {
        self.get_global_property_value(GlobalParams)
            .expect("Expected GlobalParams to be set")
    }
}

#[cfg(test)]
pub(crate) mod test {
    use ixa::{Context, ContextGlobalPropertiesExt, IxaError};
    use std::path::PathBuf;

    use super::{validate_inputs, GlobalParams, GridAxis, GrowthModel, Params};
    use crate::parameters::ContextParametersExt;

    /// Parameters matching the shipped input file, with a small grid.
    pub(crate) fn test_params() -> Params {
        Params {
            seed: Some(42),
            observations_file: PathBuf::from("./input/observations.csv"),
            population_size: 5_450_000,
            age_shares: vec![0.11, 0.10, 0.12, 0.16, 0.15, 0.13, 0.13, 0.07, 0.03],
            death_probabilities: vec![
                0.002, 0.002, 0.002, 0.002, 0.004, 0.013, 0.036, 0.08, 0.148,
            ],
            death_threshold: 0.5,
            symptoms_length: 28,
            duration_jitter: 14,
            gamma1: 1.25,
            restriction_day: 8,
            extra_days: 10,
            max_daily_infections: 1_000_000,
            growth_model: GrowthModel::PowerLaw { decay: None },
            shape_values: GridAxis::single(1.25),
            prefix_lengths: 4..6,
            b0_values: GridAxis {
                start: 60.0,
                stop: 90.0,
                step: 15.0,
            },
            repetitions: 20,
            score_threshold: 250.0,
            early_stop_factor: 1.5,
            profiling_data_path: None,
        }
    }

    fn assert_validation_error(parameters: &Params, expected: &str) {
        match validate_inputs(parameters).err() {
            Some(IxaError::IxaError(msg)) => assert_eq!(msg, expected.to_string()),
            Some(ue) => panic!(
                "Expected the error \"{expected}\". Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, validation passed with no errors."),
        }
    }

    #[test]
    fn test_default_input_file() {
        let mut context = Context::new();
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("input/input.json");
        context
            .load_global_properties(&path)
            .expect("Could not load input file");
        let params = context.get_params();
        assert_eq!(params.age_shares.len(), 9);
        assert_eq!(params.growth_model, GrowthModel::PowerLaw { decay: None });
    }

    #[test]
    fn test_get_params() {
        let mut context = Context::new();
        context
            .set_global_property_value(GlobalParams, test_params())
            .unwrap();
        let &Params {
            population_size, ..
        } = context.get_params();
        assert_eq!(population_size, 5_450_000);
    }

    #[test]
    fn test_validate_test_params() {
        validate_inputs(&test_params()).unwrap();
    }

    #[test]
    fn test_validate_shares_sum() {
        let mut parameters = test_params();
        parameters.age_shares[0] = 0.5;
        match validate_inputs(&parameters).err() {
            Some(IxaError::IxaError(msg)) => {
                assert!(msg.starts_with("Age shares must sum to 1"));
            }
            _ => panic!("Expected a validation error about the age shares."),
        }
    }

    #[test]
    fn test_validate_mismatched_tables() {
        let mut parameters = test_params();
        parameters.death_probabilities.pop();
        assert_validation_error(
            &parameters,
            "Age shares and death probabilities must have the same length.",
        );
    }

    #[test]
    fn test_validate_death_probability_range() {
        let mut parameters = test_params();
        parameters.death_probabilities[3] = 1.0;
        assert_validation_error(&parameters, "Death probabilities must be in the range [0, 1).");
    }

    #[test]
    fn test_validate_zero_death_probabilities() {
        let mut parameters = test_params();
        parameters.death_probabilities = vec![0.0; 9];
        validate_inputs(&parameters).unwrap();
    }

    #[test]
    fn test_validate_max_daily_infections() {
        let mut parameters = test_params();
        parameters.max_daily_infections = 0;
        assert_validation_error(
            &parameters,
            "The maximum number of daily infections must be positive.",
        );
    }

    #[test]
    fn test_validate_symptoms_length() {
        let mut parameters = test_params();
        parameters.symptoms_length = 0;
        assert_validation_error(&parameters, "The symptoms length must be positive.");
    }

    #[test]
    fn test_validate_b0_grid() {
        let mut parameters = test_params();
        parameters.b0_values.start = 0.0;
        assert_validation_error(&parameters, "b0 values must be positive.");
        parameters.b0_values = GridAxis {
            start: 10.0,
            stop: 5.0,
            step: 1.0,
        };
        assert_validation_error(&parameters, "The b0 grid must not end before it starts.");
    }

    #[test]
    fn test_validate_prefix_lengths() {
        let mut parameters = test_params();
        parameters.prefix_lengths = 5..5;
        assert_validation_error(
            &parameters,
            "The range of prefix lengths must not be empty.",
        );
    }

    #[test]
    fn test_grid_axis_values() {
        let axis = GridAxis {
            start: 30.0,
            stop: 200.0,
            step: 3.0,
        };
        let values = axis.values();
        assert_eq!(values.len(), 57);
        assert_eq!(values.first().copied(), Some(30.0));
        assert_eq!(values.last().copied(), Some(198.0));
    }

    #[test]
    fn test_grid_axis_includes_stop() {
        let axis = GridAxis {
            start: 1.0,
            stop: 1.3,
            step: 0.1,
        };
        assert_eq!(axis.values().len(), 4);
        assert_eq!(GridAxis::single(1.25).values(), vec![1.25]);
    }

    #[test]
    fn test_deserialization_growth_model() {
        let deserialized =
            serde_json::from_str::<GrowthModel>("{\"PowerLaw\": {\"decay\": 35.0}}").unwrap();
        assert_eq!(deserialized, GrowthModel::PowerLaw { decay: Some(35.0) });
        let deserialized = serde_json::from_str::<GrowthModel>("\"Exponential\"").unwrap();
        assert_eq!(deserialized, GrowthModel::Exponential);
    }
}
