/// One simulated infection. Severity rises linearly from 0 on `start_day` to `severity_peak`
/// after `duration` days and falls back to 0 over the same number of days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Person {
    start_day: usize,
    severity_peak: f64,
    duration: u32,
    death_day: Option<usize>,
}

impl Person {
    /// A person whose peak severity exceeds `death_threshold` dies on the first day the rising
    /// severity reaches the threshold.
    ///
    /// # Panics
    /// If `duration` is zero.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn new(start_day: usize, severity_peak: f64, duration: u32, death_threshold: f64) -> Self {
        assert!(duration > 0, "Disease duration must be positive.");
        let death_day = (severity_peak > death_threshold).then(|| {
            start_day + (f64::from(duration) * death_threshold / severity_peak).ceil() as usize
        });
        Self {
            start_day,
            severity_peak,
            duration,
            death_day,
        }
    }

    #[must_use]
    pub fn start_day(&self) -> usize {
        self.start_day
    }

    #[must_use]
    pub fn severity_peak(&self) -> f64 {
        self.severity_peak
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[must_use]
    pub fn death_day(&self) -> Option<usize> {
        self.death_day
    }

    /// Last day with a defined severity; severity is 0 on that day and afterwards.
    #[must_use]
    pub fn end_day(&self) -> usize {
        self.start_day + 2 * self.duration as usize
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn symptom_severity(&self, day: usize) -> f64 {
        if day < self.start_day || day > self.end_day() {
            return 0.0;
        }
        let elapsed = day - self.start_day;
        let duration = self.duration as usize;
        let steps = if elapsed <= duration {
            elapsed
        } else {
            2 * duration - elapsed
        };
        steps as f64 * self.severity_peak / f64::from(self.duration)
    }
}
