//! Confidence-interval statistics.

use super::types::ConfidenceStat;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

impl ConfidenceStat {
    /// Mean and `z·σ/√n` margin of error; `None` for an empty sample
    pub fn from_samples(values: &[f64], z: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        Some(Self {
            mean: mean(values),
            margin_of_error: z * std_dev(values) / n.sqrt(),
            samples: values.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(std_dev(&values), 2.0);
    }

    #[test]
    fn test_single_sample_has_zero_margin() {
        let stat = ConfidenceStat::from_samples(&[3.5], 2.33).unwrap();
        assert_eq!(stat.mean, 3.5);
        assert_eq!(stat.margin_of_error, 0.0);
        assert_eq!(stat.samples, 1);
    }

    #[test]
    fn test_margin_of_error() {
        let values = [1.0, 2.0, 3.0];
        let stat = ConfidenceStat::from_samples(&values, 2.33).unwrap();
        let sigma = (2.0f64 / 3.0).sqrt();
        assert!((stat.margin_of_error - 2.33 * sigma / 3f64.sqrt()).abs() < 1e-15);
        assert_eq!(stat.mean, 2.0);
        assert_eq!(stat.samples, 3);
    }

    #[test]
    fn test_empty_sample() {
        assert!(ConfidenceStat::from_samples(&[], 2.33).is_none());
    }
}
