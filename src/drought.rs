// 🏜️ Drought Classifier - Threshold rules over the latest observation window
// Two triggers, checked in order:
// 1. Soil moisture of the most recent day below the critical level
// 2. Trailing run of dry days (rainfall below threshold) reaching the window length

use crate::observation::{for_farmer, Observation};
use serde::{Deserialize, Serialize};

// ============================================================================
// THRESHOLDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroughtThresholds {
    /// Minimum daily rainfall (mm) for a day to count as wet
    pub rain_threshold_mm: f64,

    /// Critical soil moisture (%)
    pub moisture_threshold_pct: f64,

    /// Window length and required dry streak (>= 1)
    pub consecutive_days: usize,
}

impl Default for DroughtThresholds {
    fn default() -> Self {
        DroughtThresholds {
            rain_threshold_mm: 5.0,
            moisture_threshold_pct: 20.0,
            consecutive_days: 5,
        }
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Which rule produced the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictKind {
    /// No observations for the farmer
    NoData,

    /// Latest soil moisture below critical level
    SoilMoisture,

    /// Trailing dry streak reached the window length
    DrySpell,

    /// Neither rule fired
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroughtVerdict {
    pub is_drought: bool,
    pub reason: String,
    pub kind: VerdictKind,
}

impl DroughtVerdict {
    fn negative(kind: VerdictKind, reason: &str) -> Self {
        DroughtVerdict {
            is_drought: false,
            reason: reason.to_string(),
            kind,
        }
    }

    fn positive(kind: VerdictKind, reason: String) -> Self {
        DroughtVerdict {
            is_drought: true,
            reason,
            kind,
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Classify one farmer's series (ascending by date)
///
/// Pure: missing data yields a negative "No data" verdict, never an error.
pub fn classify_drought(series: &[Observation], thresholds: &DroughtThresholds) -> DroughtVerdict {
    let latest = match series.last() {
        Some(o) => o,
        None => return DroughtVerdict::negative(VerdictKind::NoData, "No data"),
    };

    // Moisture breach short-circuits the rainfall history
    if latest.soil_moisture_pct < thresholds.moisture_threshold_pct {
        return DroughtVerdict::positive(
            VerdictKind::SoilMoisture,
            format!(
                "Soil moisture ({}%) below critical level ({}%)",
                latest.soil_moisture_pct, thresholds.moisture_threshold_pct
            ),
        );
    }

    let streak = trailing_dry_streak(series, thresholds);

    if streak >= thresholds.consecutive_days {
        return DroughtVerdict::positive(
            VerdictKind::DrySpell,
            format!(
                "Rainfall below threshold ({}mm) for {} consecutive days",
                thresholds.rain_threshold_mm, thresholds.consecutive_days
            ),
        );
    }

    DroughtVerdict::negative(VerdictKind::Normal, "Normal conditions")
}

/// Dry days ending at the last observation, scanned over the trailing window only
pub fn trailing_dry_streak(series: &[Observation], thresholds: &DroughtThresholds) -> usize {
    let start = series.len().saturating_sub(thresholds.consecutive_days);

    let mut streak = 0;
    for obs in &series[start..] {
        if obs.rainfall_mm < thresholds.rain_threshold_mm {
            streak += 1;
        } else {
            streak = 0;
        }
    }

    streak
}

/// Filter the full feed down to one farmer, then classify
pub fn check_farmer(
    observations: &[Observation],
    farmer_id: &str,
    thresholds: &DroughtThresholds,
) -> DroughtVerdict {
    let series = for_farmer(observations, farmer_id);
    let verdict = classify_drought(&series, thresholds);

    tracing::debug!(
        farmer_id,
        days = series.len(),
        is_drought = verdict.is_drought,
        reason = %verdict.reason,
        "drought verdict"
    );

    verdict
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    /// Build a series from (rainfall, moisture) pairs on consecutive days
    fn series(days: &[(f64, f64)]) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        days.iter()
            .enumerate()
            .map(|(i, (rain, moisture))| {
                Observation::new(start + Duration::days(i as i64), "F001", *rain, 32.0, *moisture)
            })
            .collect()
    }

    #[test]
    fn test_no_data() {
        let verdict = classify_drought(&[], &DroughtThresholds::default());

        assert!(!verdict.is_drought);
        assert_eq!(verdict.reason, "No data");
        assert_eq!(verdict.kind, VerdictKind::NoData);
    }

    #[test]
    fn test_unknown_farmer_is_no_data() {
        let feed = series(&[(0.0, 50.0)]);
        let verdict = check_farmer(&feed, "F404", &DroughtThresholds::default());

        assert!(!verdict.is_drought);
        assert_eq!(verdict.reason, "No data");
    }

    #[test]
    fn test_low_moisture_wins_over_wet_history() {
        // Plenty of rain, but today's soil is parched
        let feed = series(&[(30.0, 60.0), (25.0, 55.0), (40.0, 15.5)]);
        let verdict = classify_drought(&feed, &DroughtThresholds::default());

        assert!(verdict.is_drought);
        assert_eq!(verdict.kind, VerdictKind::SoilMoisture);
        assert_eq!(verdict.reason, "Soil moisture (15.5%) below critical level (20%)");
    }

    #[test]
    fn test_moisture_at_threshold_is_not_breach() {
        let feed = series(&[(30.0, 20.0)]);
        let verdict = classify_drought(&feed, &DroughtThresholds::default());

        assert!(!verdict.is_drought);
        assert_eq!(verdict.kind, VerdictKind::Normal);
    }

    #[test]
    fn test_full_dry_window() {
        let feed = series(&[
            (12.0, 45.0),
            (1.0, 44.0),
            (0.0, 40.0),
            (4.9, 38.0),
            (2.0, 35.0),
            (0.5, 30.0),
        ]);
        let verdict = classify_drought(&feed, &DroughtThresholds::default());

        assert!(verdict.is_drought);
        assert_eq!(verdict.kind, VerdictKind::DrySpell);
        assert_eq!(
            verdict.reason,
            "Rainfall below threshold (5mm) for 5 consecutive days"
        );
    }

    #[test]
    fn test_wet_day_inside_window_resets_streak() {
        // Four dry days, then a wet day, then dry again
        let feed = series(&[
            (0.0, 45.0),
            (0.0, 44.0),
            (0.0, 40.0),
            (5.0, 38.0),
            (0.0, 35.0),
        ]);
        let thresholds = DroughtThresholds::default();

        assert_eq!(trailing_dry_streak(&feed, &thresholds), 1);

        let verdict = classify_drought(&feed, &thresholds);
        assert!(!verdict.is_drought);
        assert_eq!(verdict.reason, "Normal conditions");
    }

    #[test]
    fn test_short_series_cannot_reach_streak() {
        let feed = series(&[(0.0, 45.0), (0.0, 44.0), (0.0, 40.0)]);
        let verdict = classify_drought(&feed, &DroughtThresholds::default());

        assert!(!verdict.is_drought);
        assert_eq!(trailing_dry_streak(&feed, &DroughtThresholds::default()), 3);
    }

    #[test]
    fn test_streak_only_counts_window() {
        // Long dry history, window of 2
        let feed = series(&[(0.0, 45.0); 10]);
        let thresholds = DroughtThresholds {
            consecutive_days: 2,
            ..DroughtThresholds::default()
        };

        assert_eq!(trailing_dry_streak(&feed, &thresholds), 2);
        assert!(classify_drought(&feed, &thresholds).is_drought);
    }
}
