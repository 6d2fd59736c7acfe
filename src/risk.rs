// 📈 Risk Scorer - Share of forecast days below the rainfall threshold
// Informational only: the score never gates a payout.

use crate::forecast::round2;
use serde::{Deserialize, Serialize};

/// Percentage (0-100, 2 decimals) of days strictly below `rain_threshold_mm`
pub fn score_risk(forecast: &[f64], rain_threshold_mm: f64) -> f64 {
    if forecast.is_empty() {
        return 0.0;
    }

    let below = forecast.iter().filter(|rain| **rain < rain_threshold_mm).count();
    round2(below as f64 / forecast.len() as f64 * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// High above 60%, Moderate above 30%
    pub fn from_score(score: f64) -> Self {
        if score > 60.0 {
            RiskLevel::High
        } else if score > 30.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    /// Sentence shown next to the score
    pub fn description(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low risk. Normal conditions expected",
            RiskLevel::Moderate => "Moderate risk of drought",
            RiskLevel::High => "High risk of drought in coming days",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_forecast_scores_zero() {
        assert_eq!(score_risk(&[], 5.0), 0.0);
    }

    #[test]
    fn test_three_of_five_below() {
        assert_eq!(score_risk(&[1.0, 7.5, 4.99, 5.0, 0.0], 5.0), 60.0);
    }

    #[test]
    fn test_all_above_and_all_below() {
        assert_eq!(score_risk(&[6.0, 9.1, 12.0], 5.0), 0.0);
        assert_eq!(score_risk(&[0.0, 1.2, 4.0], 5.0), 100.0);
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        assert_eq!(score_risk(&[0.0, 9.0, 9.0], 5.0), 33.33);
        assert_eq!(score_risk(&[0.0, 0.0, 9.0], 5.0), 66.67);
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(80.0), RiskLevel::High);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(RiskLevel::High.description(), "High risk of drought in coming days");
        assert_eq!(RiskLevel::Low.description(), "Low risk. Normal conditions expected");
    }
}
