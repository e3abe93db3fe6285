//! Aggregation helpers for canary/control comparison.

use calibra_core::traits::storage::{AccuracyRow, ReliabilityRow};
use statrs::statistics::Statistics;

/// Mean absolute error between predicted and actual success rates.
///
/// Returns `None` on an empty window — callers treat that as "insufficient
/// data, skip this cycle", never as zero.
pub fn mean_absolute_error(rows: &[AccuracyRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let errors: Vec<f64> = rows
        .iter()
        .map(|r| (r.predicted_success_rate - r.actual_success_rate).abs())
        .collect();
    Some(errors.mean())
}

/// Arithmetic mean reliability over the snapshot rows.
///
/// The aggregator returns one row per tenant-with-data, so the average is
/// over tenants that have a reliability figure; tenants absent from the
/// result are excluded from both numerator and denominator. An empty
/// result averages to 0.0.
pub fn average_reliability(rows: &[ReliabilityRow]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|r| r.reliability).mean()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acc(predicted: f64, actual: f64) -> AccuracyRow {
        AccuracyRow {
            tenant_id: "t".to_string(),
            evaluation_date: 0,
            predicted_success_rate: predicted,
            actual_success_rate: actual,
        }
    }

    fn rel(value: f64) -> ReliabilityRow {
        ReliabilityRow {
            tenant_id: "t".to_string(),
            reliability: value,
        }
    }

    #[test]
    fn mae_of_empty_window_is_undefined() {
        assert!(mean_absolute_error(&[]).is_none());
    }

    #[test]
    fn mae_averages_absolute_errors() {
        let rows = vec![acc(90.0, 85.0), acc(80.0, 83.0)];
        // |90-85| = 5, |80-83| = 3 → mean 4
        let mae = mean_absolute_error(&rows).unwrap();
        assert!((mae - 4.0).abs() < 1e-10);
    }

    #[test]
    fn mae_is_sign_insensitive() {
        let over = vec![acc(90.0, 85.0)];
        let under = vec![acc(85.0, 90.0)];
        assert_eq!(mean_absolute_error(&over), mean_absolute_error(&under));
    }

    #[test]
    fn reliability_averages_present_rows_only() {
        assert_eq!(average_reliability(&[]), 0.0);
        let rows = vec![rel(80.0), rel(90.0)];
        assert!((average_reliability(&rows) - 85.0).abs() < 1e-10);
    }
}
