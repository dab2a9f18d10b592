use std::rc::Rc;

use ixa::{define_data_plugin, trace, Context, IxaError, PluginContext};
use serde::Serialize;

use crate::{
    observations::{ObservedSeries, Observations},
    person::Person,
    population_model::ContextPopulationModelExt,
};

/// The outcome of one stochastic repetition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRun {
    /// People detected on each simulated day.
    pub daily_detected: Vec<u32>,
    /// New infections drawn for each growth delta, including days past the observed window.
    pub daily_infected: Vec<u32>,
    /// Deaths by day, as long as the latest death day of anyone infected.
    pub daily_deaths: Vec<u32>,
    /// Negative log-probability of the observed cumulative positives, summed over days.
    pub error: f64,
}

impl SimulationRun {
    /// A repetition whose infection counts could not be drawn. It loses every comparison.
    #[must_use]
    pub fn degenerate() -> Self {
        SimulationRun {
            daily_detected: Vec::new(),
            daily_infected: Vec::new(),
            daily_deaths: Vec::new(),
            error: f64::INFINITY,
        }
    }

    #[must_use]
    pub fn total_deaths(&self) -> u32 {
        self.daily_deaths.iter().sum()
    }
}

define_data_plugin!(ObservedSeriesPlugin, Option<Rc<ObservedSeries>>, None);

/// Stores the observed series padded with `prefix_length` unobserved days.
pub fn init(context: &mut Context, observations: &Observations, prefix_length: usize) {
    let series = observations.with_prefix(prefix_length);
    *context.get_data_mut(ObservedSeriesPlugin) = Some(Rc::new(series));
}

pub trait ContextSimulatorExt: PluginContext + ContextPopulationModelExt {
    fn observed_series(&self) -> Rc<ObservedSeries> {
        Rc::clone(
            self.get_data(ObservedSeriesPlugin)
                .as_ref()
                .expect("The observed series must be initialized before simulating."),
        )
    }

    /// Runs one repetition over the prefix and observed days. Infection counts are drawn for
    /// every delta up front; each day then spawns that day's infections, removes everyone whose
    /// severity reaches the day's detection threshold and scores the cumulative detections
    /// against the cumulative observed positives.
    ///
    /// # Errors
    /// - If `deltas` does not cover every simulated day.
    /// - If a day's tested count exceeds the population size.
    ///
    /// A delta too large to sample, or one drawing more than `max_daily_infections`, yields
    /// `SimulationRun::degenerate()`.
    #[allow(clippy::cast_possible_truncation)]
    fn simulate(&mut self, b0: f64, deltas: &[f64]) -> Result<SimulationRun, IxaError> {
        let series = self.observed_series();
        let days = series.days();
        if deltas.len() < days {
            return Err(IxaError::IxaError(format!(
                "Growth deltas cover {} days, but {days} days are simulated.",
                deltas.len()
            )));
        }

        let Some(daily_infected) = deltas
            .iter()
            .map(|&mean| self.sample_poisson(mean))
            .collect::<Option<Vec<u32>>>()
        else {
            trace!("Growth deltas exceed the daily infection limit, scoring +inf");
            return Ok(SimulationRun::degenerate());
        };
        let mut daily_detected = Vec::with_capacity(days);
        let mut daily_deaths: Vec<u32> = Vec::new();
        let mut undetected: Vec<Person> = Vec::new();
        let mut cumulative_detected = 0u32;
        let mut error = 0.0;

        for day in 0..days {
            for _ in 0..daily_infected[day] {
                let person = self.spawn_infected_person(day);
                if let Some(death_day) = person.death_day() {
                    if daily_deaths.len() <= death_day {
                        daily_deaths.resize(death_day + 1, 0);
                    }
                    daily_deaths[death_day] += 1;
                }
                undetected.push(person);
            }

            let threshold = self.detection_threshold(b0, series.tested[day])?;
            let before = undetected.len();
            undetected.retain(|person| person.symptom_severity(day) < threshold);
            let detected = (before - undetected.len()) as u32;
            daily_detected.push(detected);

            cumulative_detected += detected;
            let observed = series.cumulative_positive[day];
            if cumulative_detected + observed > 0 {
                error -= self.log_match_probability(cumulative_detected, observed);
            }
            trace!(
                "Day {day}: threshold {threshold:.4}, detected {detected} \
                 ({cumulative_detected} vs {observed} observed), {} undetected",
                undetected.len()
            );
        }

        Ok(SimulationRun {
            daily_detected,
            daily_infected,
            daily_deaths,
            error,
        })
    }
}
impl ContextSimulatorExt for Context {}
