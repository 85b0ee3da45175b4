// Percentile helper

use crate::domain::DomainError;

/// Percentile with linear interpolation between the closest ranks
///
/// `pct` is in `0..=100`. Input order does not matter.
///
/// # Errors
/// - DomainError::EmptyInput for an empty slice
/// - DomainError::InvalidPercentile for `pct` outside `0..=100` (or NaN)
pub fn percentile(values: &[f64], pct: f64) -> Result<f64, DomainError> {
    if !(0.0..=100.0).contains(&pct) {
        return Err(DomainError::InvalidPercentile(pct));
    }
    if values.is_empty() {
        return Err(DomainError::EmptyInput);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merge_request::minutes_to_days;

    #[test]
    fn test_empty_input_is_error() {
        assert_eq!(percentile(&[], 99.0), Err(DomainError::EmptyInput));
    }

    #[test]
    fn test_out_of_range_percentile() {
        assert!(matches!(percentile(&[1.0], 101.0), Err(DomainError::InvalidPercentile(_))));
        assert!(matches!(percentile(&[1.0], f64::NAN), Err(DomainError::InvalidPercentile(_))));
    }

    #[test]
    fn test_single_value() {
        assert_eq!(percentile(&[42.0], 99.0).unwrap(), 42.0);
    }

    #[test]
    fn test_interpolates_between_ranks() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&values, 50.0).unwrap(), 2.5);
        assert_eq!(percentile(&values, 100.0).unwrap(), 4.0);
    }

    #[test]
    fn test_ninety_ninth_percentile_of_whole_days() {
        let ages: Vec<f64> = (1..=100).map(|d| (d * 1440) as f64).collect();
        let p99 = percentile(&ages, 99.0).unwrap();
        assert!((p99 - 142_574.4).abs() < 1e-6, "p99 = {}", p99);
        assert_eq!(minutes_to_days(p99), 99);
    }
}
