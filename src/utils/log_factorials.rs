/// Size of the table built up front. Larger arguments extend the table on demand.
pub const DEFAULT_LOG_FACTORIAL_CAPACITY: usize = 5000;

/// A growable cache of `ln(n!)` values.
///
/// `table[n]` always holds `ln(n!)` for every `n < table.len()`. Lookups past the end extend
/// the table before reading, so callers never observe an out-of-range index.
#[derive(Debug, Clone)]
pub struct LogFactorials {
    table: Vec<f64>,
}

impl Default for LogFactorials {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_FACTORIAL_CAPACITY)
    }
}

impl LogFactorials {
    /// Builds a table covering `0..capacity` (and always at least `0!`).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut log_factorials = Self {
            table: Vec::with_capacity(capacity.max(1)),
        };
        log_factorials.table.push(0.0);
        log_factorials.ensure_covers(capacity.saturating_sub(1));
        log_factorials
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Extends the table so that `n` is a valid index.
    #[allow(clippy::cast_precision_loss)]
    fn ensure_covers(&mut self, n: usize) {
        while self.table.len() <= n {
            let i = self.table.len();
            let last = self.table[i - 1];
            self.table.push(last + (i as f64).ln());
        }
    }

    /// Returns `ln(n!)`, growing the table when `n` is beyond its current end.
    pub fn get(&mut self, n: usize) -> f64 {
        self.ensure_covers(n);
        self.table[n]
    }

    /// Log-probability that two independent Poisson(`n / 2`) counts, where `n = a + b`, come out
    /// as exactly `a` and `b`:
    ///
    /// `n * ln(n / 2) - n - ln(a!) - ln(b!)`
    ///
    /// This is the score used to compare a simulated cumulative count against an observed one.
    ///
    /// # Panics
    /// If `a + b == 0`; the score is undefined for two empty counts.
    #[allow(clippy::cast_precision_loss)]
    pub fn log_match_probability(&mut self, a: u32, b: u32) -> f64 {
        let n = u64::from(a) + u64::from(b);
        assert!(n > 0, "Log match probability requires a positive total count.");
        let n = n as f64;
        let positive = n * (n / 2.0).ln();
        let negative = n + self.get(a as usize) + self.get(b as usize);
        positive - negative
    }
}
