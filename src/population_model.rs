use ixa::{define_data_plugin, define_rng, trace, Context, IxaError, PluginContext};
use rand_distr::{Gamma, Poisson};

use crate::{
    parameters::{ContextParametersExt, Params},
    person::Person,
    utils::{beta_quantile, exceedance_shape, LogFactorials},
};

define_rng!(PopulationRng);
define_rng!(InfectionRng);

/// Age-stratified tables and the derived distributions used to sample infected people.
#[derive(Debug, Clone)]
pub struct PopulationModel {
    population_size: u32,
    /// Running sums of the age shares; the last entry is (up to rounding) 1.
    cumulative_shares: Vec<f64>,
    death_probabilities: Vec<f64>,
    /// `Gamma(b, 1)` per bracket, `b` being the bracket's severity shape; `None` when `b` is
    /// infinite.
    severity_gammas: Vec<Option<Gamma<f64>>>,
    unit_gamma: Gamma<f64>,
    death_threshold: f64,
    symptoms_length: u32,
    duration_jitter: u32,
    max_daily_infections: u32,
    log_factorials: LogFactorials,
}

fn gamma(shape: f64) -> Result<Gamma<f64>, IxaError> {
    Gamma::new(shape, 1.0).map_err(|e| {
        IxaError::IxaError(format!(
            "Could not build a Gamma({shape}, 1) distribution: {e}"
        ))
    })
}

impl PopulationModel {
    /// Builds the population tables first and the log-factorial cache second.
    ///
    /// # Errors
    /// If a bracket's severity distribution cannot be constructed.
    pub fn from_params(parameters: &Params) -> Result<Self, IxaError> {
        let cumulative_shares = parameters
            .age_shares
            .iter()
            .scan(0.0, |total, share| {
                *total += share;
                Some(*total)
            })
            .collect();
        let severity_gammas = parameters
            .death_probabilities
            .iter()
            .map(|&probability| {
                let shape = exceedance_shape(probability, parameters.death_threshold);
                if shape.is_finite() {
                    gamma(shape).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<Vec<_>, IxaError>>()?;
        Ok(Self {
            population_size: parameters.population_size,
            cumulative_shares,
            death_probabilities: parameters.death_probabilities.clone(),
            severity_gammas,
            unit_gamma: gamma(1.0)?,
            death_threshold: parameters.death_threshold,
            symptoms_length: parameters.symptoms_length,
            duration_jitter: parameters.duration_jitter,
            max_daily_infections: parameters.max_daily_infections,
            log_factorials: LogFactorials::default(),
        })
    }

    #[must_use]
    pub fn population_size(&self) -> u32 {
        self.population_size
    }

    #[must_use]
    pub fn age_brackets(&self) -> usize {
        self.cumulative_shares.len()
    }

    /// Beta(1, b) shape for the bracket, calibrated so that severity exceeds the death
    /// threshold with the bracket's death probability.
    #[must_use]
    pub fn severity_shape(&self, bracket: usize) -> f64 {
        exceedance_shape(self.death_probabilities[bracket], self.death_threshold)
    }

    #[must_use]
    pub fn death_threshold(&self) -> f64 {
        self.death_threshold
    }

    /// Index of the first bracket whose cumulative share exceeds `draw`. Draws beyond the
    /// accumulated mass (rounding) land in the last bracket.
    fn bracket_for(&self, draw: f64) -> usize {
        self.cumulative_shares
            .partition_point(|&cumulative| cumulative <= draw)
            .min(self.cumulative_shares.len() - 1)
    }
}

/// Severity level above which a person is detected on a day with `tested` tests: the
/// `1 - tested / population` quantile of Beta(1, `b0`).
///
/// # Errors
/// If `tested` exceeds `population`; the quantile would be negative.
pub fn detection_threshold(b0: f64, tested: u32, population: u32) -> Result<f64, IxaError> {
    if tested > population {
        return Err(IxaError::IxaError(format!(
            "The tested count {tested} exceeds the population size {population}."
        )));
    }
    let quantile = 1.0 - f64::from(tested) / f64::from(population);
    Ok(beta_quantile(b0, quantile))
}

define_data_plugin!(PopulationModelPlugin, Option<PopulationModel>, None);

/// Builds the population model from the global parameters.
///
/// # Errors
/// If the model cannot be built from the parameters.
pub fn init(context: &mut Context) -> Result<(), IxaError> {
    let model = PopulationModel::from_params(context.get_params())?;
    trace!(
        "Population model with severity shapes {:?}",
        (0..model.age_brackets())
            .map(|bracket| model.severity_shape(bracket))
            .collect::<Vec<f64>>()
    );
    *context.get_data_mut(PopulationModelPlugin) = Some(model);
    Ok(())
}

pub trait ContextPopulationModelExt: PluginContext {
    fn population_model(&self) -> &PopulationModel {
        self.get_data(PopulationModelPlugin)
            .as_ref()
            .expect("The population model must be initialized before sampling.")
    }

    fn sample_age_bracket(&self) -> usize {
        let draw: f64 = self.sample_range(PopulationRng, 0.0..1.0);
        self.population_model().bracket_for(draw)
    }

    /// Peak severity: a Beta(1, b) draw for the bracket, built from two Gamma draws.
    fn sample_severity(&self, bracket: usize) -> f64 {
        let model = self.population_model();
        match &model.severity_gammas[bracket] {
            None => 0.0,
            Some(severity_gamma) => {
                let x: f64 = self.sample_distr(PopulationRng, &model.unit_gamma);
                let y: f64 = self.sample_distr(PopulationRng, severity_gamma);
                x / (x + y)
            }
        }
    }

    /// `ceil(severity * symptoms_length + U)` with `U` uniform on `0..=duration_jitter`, at
    /// least one day.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample_duration(&self, severity: f64) -> u32 {
        let model = self.population_model();
        let jitter: u32 = self.sample_range(PopulationRng, 0..=model.duration_jitter);
        let duration =
            (severity * f64::from(model.symptoms_length) + f64::from(jitter)).ceil() as u32;
        duration.max(1)
    }

    /// Poisson draw with the given mean. Non-positive or NaN means draw nothing. Returns `None`
    /// when the mean is too large to sample or the draw exceeds `max_daily_infections`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample_poisson(&self, mean: f64) -> Option<u32> {
        if mean.is_nan() || mean <= 0.0 {
            return Some(0);
        }
        let poisson = Poisson::new(mean).ok()?;
        let draw: f64 = self.sample_distr(InfectionRng, poisson);
        if draw > f64::from(self.population_model().max_daily_infections) {
            return None;
        }
        Some(draw as u32)
    }

    /// Samples an age bracket, a severity and a duration, in that order.
    fn spawn_infected_person(&self, start_day: usize) -> Person {
        let bracket = self.sample_age_bracket();
        let severity = self.sample_severity(bracket);
        let duration = self.sample_duration(severity);
        Person::new(
            start_day,
            severity,
            duration,
            self.population_model().death_threshold,
        )
    }

    /// # Errors
    /// If more people are tested than live in the population.
    fn detection_threshold(&self, b0: f64, tested: u32) -> Result<f64, IxaError> {
        detection_threshold(b0, tested, self.population_model().population_size)
    }

    fn log_match_probability(&mut self, a: u32, b: u32) -> f64 {
        self.get_data_mut(PopulationModelPlugin)
            .as_mut()
            .expect("The population model must be initialized before scoring.")
            .log_factorials
            .log_match_probability(a, b)
    }
}
impl ContextPopulationModelExt for Context {}
