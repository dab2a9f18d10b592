use std::path::Path;

use ixa::IxaError;
use serde::Deserialize;

/// One observed day. Extra columns in the input file (a date, for instance) are ignored.
#[derive(Deserialize, Debug, Clone, Copy)]
struct ObservationRecord {
    tested: u32,
    positive: u32,
}

/// Daily numbers of performed tests and of positive results, starting at the first observed day.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    tested: Vec<u32>,
    positive: Vec<u32>,
}

/// The observed series as the simulator consumes them: padded with `prefix_length` unobserved
/// days of zero tests, with `positive` turned into a running total.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedSeries {
    pub prefix_length: usize,
    pub tested: Vec<u32>,
    pub cumulative_positive: Vec<u32>,
}

impl ObservedSeries {
    /// Number of simulated days: the prefix plus every observed day.
    #[must_use]
    pub fn days(&self) -> usize {
        self.tested.len()
    }
}

impl Observations {
    /// # Errors
    /// - If `tested` and `positive` have different lengths.
    /// - If there are no observed days.
    pub fn new(tested: Vec<u32>, positive: Vec<u32>) -> Result<Self, IxaError> {
        if tested.len() != positive.len() {
            return Err(IxaError::IxaError(format!(
                "Tested and positive series must have the same length, got {} and {}.",
                tested.len(),
                positive.len()
            )));
        }
        if tested.is_empty() {
            return Err(IxaError::IxaError(
                "At least one observed day is required.".to_string(),
            ));
        }
        Ok(Self { tested, positive })
    }

    /// Reads a CSV file with a header containing `tested` and `positive` columns.
    ///
    /// # Errors
    /// - If the file cannot be read or a row cannot be parsed.
    /// - If the file holds no rows.
    pub fn from_csv(path: &Path) -> Result<Self, IxaError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut tested = Vec::new();
        let mut positive = Vec::new();
        for result in reader.deserialize() {
            let record: ObservationRecord = result?;
            tested.push(record.tested);
            positive.push(record.positive);
        }
        if tested.is_empty() {
            return Err(IxaError::IxaError(format!(
                "No data found in file: {}",
                path.display()
            )));
        }
        Self::new(tested, positive)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tested.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tested.is_empty()
    }

    #[must_use]
    pub fn tested(&self) -> &[u32] {
        &self.tested
    }

    #[must_use]
    pub fn positive(&self) -> &[u32] {
        &self.positive
    }

    #[must_use]
    pub fn total_positive(&self) -> u32 {
        self.positive.iter().sum()
    }

    /// Prepends `prefix_length` days without tests or positives and accumulates the positives.
    #[must_use]
    pub fn with_prefix(&self, prefix_length: usize) -> ObservedSeries {
        let padding = std::iter::repeat_n(0, prefix_length);
        let tested = padding.clone().chain(self.tested.iter().copied()).collect();
        let cumulative_positive = padding
            .chain(self.positive.iter().copied())
            .scan(0, |total, positive| {
                *total += positive;
                Some(*total)
            })
            .collect();
        ObservedSeries {
            prefix_length,
            tested,
            cumulative_positive,
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use ixa::IxaError;
    use tempfile::NamedTempFile;

    use super::Observations;

    /// Slovak testing data from the start of the epidemic.
    pub(crate) fn slovak_observations() -> Observations {
        Observations::new(
            vec![
                37, 32, 38, 50, 49, 64, 72, 69, 116, 99, 35, 118, 197, 228, 148, 293, 217, 283,
                354, 399, 235, 432, 464, 325, 912, 747, 720,
            ],
            vec![
                0, 0, 0, 0, 1, 2, 2, 2, 0, 3, 11, 11, 12, 17, 11, 25, 8, 19, 13, 41, 7, 19, 12,
                10, 43, 23, 22,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_mismatched_lengths() {
        let e = Observations::new(vec![1, 2, 3], vec![0, 1]).err();
        match e {
            Some(IxaError::IxaError(msg)) => {
                assert_eq!(
                    msg,
                    "Tested and positive series must have the same length, got 3 and 2."
                        .to_string()
                );
            }
            Some(ue) => panic!(
                "Expected an error that the lengths differ. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, mismatched series were accepted."),
        }
    }

    #[test]
    fn test_empty_series() {
        assert!(Observations::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_with_prefix() {
        let observations = Observations::new(vec![10, 20, 30], vec![1, 0, 4]).unwrap();
        let series = observations.with_prefix(2);
        assert_eq!(series.prefix_length, 2);
        assert_eq!(series.days(), 5);
        assert_eq!(series.tested, vec![0, 0, 10, 20, 30]);
        assert_eq!(series.cumulative_positive, vec![0, 0, 1, 1, 5]);
    }

    #[test]
    fn test_with_empty_prefix() {
        let observations = slovak_observations();
        let series = observations.with_prefix(0);
        assert_eq!(series.tested, observations.tested());
        assert_eq!(
            series.cumulative_positive.last().copied(),
            Some(observations.total_positive())
        );
    }

    #[test]
    fn test_shipped_observations_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("input/observations.csv");
        let observations = Observations::from_csv(&path).unwrap();
        assert_eq!(observations, slovak_observations());
    }

    #[test]
    fn test_from_csv_ignores_extra_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "date,tested,positive").unwrap();
        writeln!(file, "2020-03-06,37,0").unwrap();
        writeln!(file, "2020-03-07,32,1").unwrap();
        let observations = Observations::from_csv(file.path()).unwrap();
        assert_eq!(observations.tested(), &[37, 32]);
        assert_eq!(observations.positive(), &[0, 1]);
    }

    #[test]
    fn test_from_csv_empty_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tested,positive").unwrap();
        let e = Observations::from_csv(file.path()).err();
        match e {
            Some(IxaError::IxaError(msg)) => {
                assert!(msg.starts_with("No data found in file"));
            }
            _ => panic!("Expected an error about the empty file."),
        }
    }

    #[test]
    fn test_from_csv_missing_file() {
        let e = Observations::from_csv(&PathBuf::from("./input/does_not_exist.csv")).err();
        assert!(matches!(e, Some(IxaError::CsvError(_))));
    }
}
