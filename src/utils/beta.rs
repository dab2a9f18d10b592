/// Quantile function of the Beta(1, `b`) distribution, evaluated at `quantile`.
///
/// The CDF of Beta(1, b) is `1 - (1 - x)^b`, so the inverse has the closed form
/// `1 - (1 - quantile)^(1 / b)`.
#[must_use]
pub fn beta_quantile(b: f64, quantile: f64) -> f64 {
    1.0 - (1.0 - quantile).powf(1.0 / b)
}

/// Returns the shape `b` such that a Beta(1, `b`) draw exceeds `threshold` with probability
/// `probability`, i.e. `(1 - threshold)^b = probability`.
///
/// A zero probability yields `f64::INFINITY`: the distribution collapses onto 0.
#[must_use]
pub fn exceedance_shape(probability: f64, threshold: f64) -> f64 {
    if probability <= 0.0 {
        return f64::INFINITY;
    }
    probability.ln() / (1.0 - threshold).ln()
}
