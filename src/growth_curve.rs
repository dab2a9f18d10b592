use serde::Serialize;

use crate::parameters::GrowthModel;

/// Expected numbers of new infections per day. Growth is geometric with ratio `gamma1` up to the
/// intervention day `t0` and follows the variant's own shape afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GrowthCurve {
    /// Geometric growth with ratio `gamma2` after the intervention.
    Exponential { gamma1: f64, gamma2: f64 },
    /// Daily increments of the cumulative curve `k^exponent`, optionally damped by
    /// `exp(-k / decay)`, scaled to continue from the value reached on the intervention day.
    PowerLaw {
        gamma1: f64,
        exponent: f64,
        decay: Option<f64>,
    },
}

impl GrowthCurve {
    /// Builds the curve for one grid point: `shape` is `gamma2` for the exponential model and
    /// the exponent for the power law.
    #[must_use]
    pub fn new(model: GrowthModel, gamma1: f64, shape: f64) -> Self {
        match model {
            GrowthModel::Exponential => GrowthCurve::Exponential {
                gamma1,
                gamma2: shape,
            },
            GrowthModel::PowerLaw { decay } => GrowthCurve::PowerLaw {
                gamma1,
                exponent: shape,
                decay,
            },
        }
    }

    #[must_use]
    pub fn shape(&self) -> f64 {
        match self {
            GrowthCurve::Exponential { gamma2, .. } => *gamma2,
            GrowthCurve::PowerLaw { exponent, .. } => *exponent,
        }
    }

    /// Returns `total_days` deltas. `deltas[i] = gamma1^i` for every `i <= t0`; `t0` is clamped
    /// to `total_days - 1`, in which case there is no post-intervention phase.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn create_deltas(&self, t0: usize, total_days: usize) -> Vec<f64> {
        if total_days == 0 {
            return Vec::new();
        }
        let t0 = t0.min(total_days - 1);
        match *self {
            GrowthCurve::Exponential { gamma1, gamma2 } => {
                let mut deltas = exponential_prefix(gamma1, t0, total_days);
                while deltas.len() < total_days {
                    let last = deltas[deltas.len() - 1];
                    deltas.push(last * gamma2);
                }
                deltas
            }
            GrowthCurve::PowerLaw {
                gamma1,
                exponent,
                decay,
            } => {
                let cumulative = |k: usize| {
                    let k = k as f64;
                    let value = k.powf(exponent);
                    match decay {
                        Some(decay) => value * (-k / decay).exp(),
                        None => value,
                    }
                };
                let mut deltas = exponential_prefix(gamma1, t0, total_days);
                let base = deltas[t0];
                deltas.extend(
                    (t0 + 1..total_days)
                        .map(|i| base * (cumulative(i - t0 + 1) - cumulative(i - t0))),
                );
                deltas
            }
        }
    }
}

/// `1, gamma1, gamma1^2, ..., gamma1^t0`, allocated for the whole curve.
fn exponential_prefix(gamma1: f64, t0: usize, total_days: usize) -> Vec<f64> {
    let mut deltas = Vec::with_capacity(total_days);
    deltas.push(1.0);
    for _ in 0..t0 {
        let last = deltas[deltas.len() - 1];
        deltas.push(last * gamma1);
    }
    deltas
}
