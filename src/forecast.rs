// 🌧️ Rainfall Forecaster - OLS on (temperature, soil moisture) → rainfall
// A deliberately small model: one pooled linear fit, then a closed-loop
// simulation where each predicted day feeds the next day's inputs.
//
// Randomness (temperature drift) comes from an injected rng, so a seeded
// forecaster produces an exact, repeatable sequence.

use crate::observation::Observation;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

/// Reference temperature for the moisture update (°C)
const REFERENCE_TEMP_C: f64 = 25.0;

/// Simulated soil moisture stays inside this band (%)
const MOISTURE_FLOOR_PCT: f64 = 10.0;
const MOISTURE_CEILING_PCT: f64 = 80.0;

/// Max daily temperature drift (°C, uniform ±)
const TEMP_DRIFT_C: f64 = 1.0;

/// Longest projection accepted by hosts (days)
pub const MAX_HORIZON_DAYS: usize = 365;

#[derive(Debug, Error, PartialEq)]
pub enum ForecastError {
    #[error("cannot train rainfall model on an empty observation set")]
    EmptyTrainingSet,
}

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// LINEAR MODEL
// ============================================================================

/// rainfall = intercept + temp_coef * temperature + moisture_coef * moisture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub temp_coef: f64,
    pub moisture_coef: f64,

    /// Rows the model was fitted on
    pub samples: usize,
}

impl LinearModel {
    /// Ordinary least squares over all rows pooled together
    ///
    /// Solved on centered data. When the two features are collinear (or
    /// constant) the fit falls back to the feature(s) that still vary.
    pub fn fit(observations: &[Observation]) -> Result<Self, ForecastError> {
        if observations.is_empty() {
            return Err(ForecastError::EmptyTrainingSet);
        }

        let n = observations.len() as f64;
        let mean_t = observations.iter().map(|o| o.temperature_c).sum::<f64>() / n;
        let mean_m = observations.iter().map(|o| o.soil_moisture_pct).sum::<f64>() / n;
        let mean_y = observations.iter().map(|o| o.rainfall_mm).sum::<f64>() / n;

        let (mut s_tt, mut s_mm, mut s_tm, mut s_ty, mut s_my) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for o in observations {
            let t = o.temperature_c - mean_t;
            let m = o.soil_moisture_pct - mean_m;
            let y = o.rainfall_mm - mean_y;
            s_tt += t * t;
            s_mm += m * m;
            s_tm += t * m;
            s_ty += t * y;
            s_my += m * y;
        }

        let det = s_tt * s_mm - s_tm * s_tm;
        let (temp_coef, moisture_coef) = if det.abs() > 1e-9 * (s_tt * s_mm).max(f64::MIN_POSITIVE) {
            (
                (s_mm * s_ty - s_tm * s_my) / det,
                (s_tt * s_my - s_tm * s_ty) / det,
            )
        } else {
            tracing::warn!(rows = observations.len(), "collinear training features, reducing model");
            if s_tt > 0.0 {
                (s_ty / s_tt, 0.0)
            } else if s_mm > 0.0 {
                (0.0, s_my / s_mm)
            } else {
                (0.0, 0.0)
            }
        };

        Ok(LinearModel {
            intercept: mean_y - temp_coef * mean_t - moisture_coef * mean_m,
            temp_coef,
            moisture_coef,
            samples: observations.len(),
        })
    }

    pub fn predict(&self, temperature_c: f64, soil_moisture_pct: f64) -> f64 {
        self.intercept + self.temp_coef * temperature_c + self.moisture_coef * soil_moisture_pct
    }
}

// ============================================================================
// FORECASTER
// ============================================================================

/// One projected day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub rainfall_mm: f64,
}

pub struct RainfallForecaster<R = StdRng> {
    /// Swapped whole on retrain; readers clone the Arc and never see a partial model
    model: RwLock<Option<Arc<LinearModel>>>,
    rng: Mutex<R>,
}

impl RainfallForecaster<StdRng> {
    /// Entropy-seeded forecaster
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic forecaster
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for RainfallForecaster<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RainfallForecaster<R> {
    pub fn with_rng(rng: R) -> Self {
        RainfallForecaster {
            model: RwLock::new(None),
            rng: Mutex::new(rng),
        }
    }

    /// Fit on the full feed, replacing any previous model
    pub fn train(&self, observations: &[Observation]) -> Result<(), ForecastError> {
        let model = LinearModel::fit(observations)?;

        tracing::info!(
            samples = model.samples,
            intercept = model.intercept,
            temp_coef = model.temp_coef,
            moisture_coef = model.moisture_coef,
            "rainfall model trained"
        );

        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(model));
        Ok(())
    }

    pub fn model(&self) -> Option<Arc<LinearModel>> {
        self.model.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_trained(&self) -> bool {
        self.model().is_some()
    }

    /// Project `horizon_days` of rainfall from current conditions
    ///
    /// Empty when untrained. Values are non-negative, rounded to 2 decimals.
    pub fn forecast(&self, current_temp_c: f64, current_moisture_pct: f64, horizon_days: usize) -> Vec<f64> {
        let model = match self.model() {
            Some(m) => m,
            None => {
                tracing::debug!("forecast requested before training");
                return Vec::new();
            }
        };

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let mut temp = current_temp_c;
        let mut moisture = current_moisture_pct;
        let mut predictions = Vec::with_capacity(horizon_days.min(MAX_HORIZON_DAYS));

        for _ in 0..horizon_days {
            let rain = model.predict(temp, moisture).max(0.0);
            predictions.push(round2(rain));

            // Next simulated day
            temp += rng.gen_range(-TEMP_DRIFT_C..=TEMP_DRIFT_C);
            moisture += rain * 0.5 - (temp - REFERENCE_TEMP_C) * 0.5;
            moisture = moisture.clamp(MOISTURE_FLOOR_PCT, MOISTURE_CEILING_PCT);
        }

        tracing::debug!(horizon_days, ?predictions, "rainfall forecast");

        predictions
    }

    /// Same as `forecast`, dated from the day after `last_observed`
    ///
    /// Stops early if a date would fall past the calendar's range.
    pub fn forecast_dated(
        &self,
        last_observed: NaiveDate,
        current_temp_c: f64,
        current_moisture_pct: f64,
        horizon_days: usize,
    ) -> Vec<ForecastPoint> {
        self.forecast(current_temp_c, current_moisture_pct, horizon_days)
            .into_iter()
            .enumerate()
            .map_while(|(i, rainfall_mm)| {
                let date = last_observed.checked_add_signed(Duration::days(i as i64 + 1))?;
                Some(ForecastPoint { date, rainfall_mm })
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    /// Rows on a small (temp, moisture) grid with rainfall from `f`
    fn training_set(f: impl Fn(f64, f64) -> f64) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rows = Vec::new();
        for (i, temp) in [22.0, 27.0, 31.0, 36.0].iter().enumerate() {
            for (j, moisture) in [15.0, 30.0, 55.0].iter().enumerate() {
                let date = start + Duration::days((i * 3 + j) as i64);
                rows.push(Observation::new(date, "F001", f(*temp, *moisture), *temp, *moisture));
            }
        }
        rows
    }

    #[test]
    fn test_untrained_forecast_is_empty() {
        let forecaster = RainfallForecaster::seeded(7);

        assert!(!forecaster.is_trained());
        assert!(forecaster.forecast(30.0, 40.0, 5).is_empty());
    }

    #[test]
    fn test_empty_training_set_rejected() {
        let forecaster = RainfallForecaster::seeded(7);

        assert_eq!(forecaster.train(&[]), Err(ForecastError::EmptyTrainingSet));
        assert!(!forecaster.is_trained());
    }

    #[test]
    fn test_fit_recovers_linear_relation() {
        let model = LinearModel::fit(&training_set(|t, m| 1.0 + 0.5 * t + 0.2 * m)).unwrap();

        assert!((model.intercept - 1.0).abs() < 1e-9);
        assert!((model.temp_coef - 0.5).abs() < 1e-9);
        assert!((model.moisture_coef - 0.2).abs() < 1e-9);
        assert_eq!(model.samples, 12);
    }

    #[test]
    fn test_constant_features_fall_back_to_mean() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = vec![
            Observation::new(start, "F001", 2.0, 30.0, 40.0),
            Observation::new(start, "F002", 4.0, 30.0, 40.0),
        ];

        let model = LinearModel::fit(&rows).unwrap();
        assert_eq!(model.predict(30.0, 40.0), 3.0);
    }

    #[test]
    fn test_forecast_length_and_non_negative() {
        let forecaster = RainfallForecaster::seeded(42);
        forecaster.train(&training_set(|t, m| 20.0 - 0.6 * t + 0.1 * m)).unwrap();

        let forecast = forecaster.forecast(34.0, 25.0, 5);

        assert_eq!(forecast.len(), 5);
        assert!(forecast.iter().all(|v| *v >= 0.0));
        assert!(forecast.iter().all(|v| round2(*v) == *v));
    }

    #[test]
    fn test_negative_predictions_clamped() {
        let forecaster = RainfallForecaster::seeded(1);
        forecaster.train(&training_set(|_, _| -10.0)).unwrap();

        assert_eq!(forecaster.forecast(30.0, 40.0, 3), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let rows = training_set(|t, m| 12.0 - 0.3 * t + 0.15 * m);

        let a = RainfallForecaster::seeded(99);
        let b = RainfallForecaster::seeded(99);
        a.train(&rows).unwrap();
        b.train(&rows).unwrap();

        assert_eq!(a.forecast(31.0, 35.0, 10), b.forecast(31.0, 35.0, 10));
    }

    #[test]
    fn test_moisture_feedback_is_clamped() {
        // Rain equals moisture, so a wet start saturates at the ceiling
        let forecaster = RainfallForecaster::seeded(3);
        forecaster.train(&training_set(|_, m| m)).unwrap();

        assert_eq!(forecaster.forecast(25.0, 79.0, 4), vec![79.0, 80.0, 80.0, 80.0]);
    }

    #[test]
    fn test_drift_and_temperature_feed_moisture() {
        // All-zero rng bits: every day's drift is exactly -1°C
        let forecaster = RainfallForecaster::with_rng(StepRng::new(0, 0));
        forecaster.train(&training_set(|t, m| m - t)).unwrap();

        // t: 30 → 29 → 28 → 27
        // m: 40 → 40 + 5 - 2 = 43 → 43 + 7 - 1.5 = 48.5 → 48.5 + 10.25 - 1 = 57.75
        assert_eq!(forecaster.forecast(30.0, 40.0, 4), vec![10.0, 14.0, 20.5, 30.75]);
    }

    #[test]
    fn test_moisture_held_at_floor() {
        let forecaster = RainfallForecaster::with_rng(StepRng::new(0, 0));
        forecaster.train(&training_set(|_, m| m - 5.0)).unwrap();

        // Hot days dry the soil: 12 + 3.5 - 9.5 = 6 → floor 10, then 10 + 2.5 - 9 → floor 10
        assert_eq!(forecaster.forecast(45.0, 12.0, 3), vec![7.0, 5.0, 5.0]);
    }

    #[test]
    fn test_retrain_replaces_model() {
        let forecaster = RainfallForecaster::seeded(5);

        forecaster.train(&training_set(|_, _| 3.0)).unwrap();
        assert_eq!(forecaster.forecast(30.0, 40.0, 2), vec![3.0, 3.0]);

        forecaster.train(&training_set(|_, _| 8.0)).unwrap();
        assert_eq!(forecaster.forecast(30.0, 40.0, 2), vec![8.0, 8.0]);
    }

    #[test]
    fn test_forecast_dated_starts_next_day() {
        let forecaster = RainfallForecaster::seeded(5);
        forecaster.train(&training_set(|_, _| 3.0)).unwrap();

        let last = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let points = forecaster.forecast_dated(last, 30.0, 40.0, 3);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(points[2].date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert!(points.iter().all(|p| p.rainfall_mm == 3.0));
    }

    #[test]
    fn test_forecast_dated_stops_at_calendar_end() {
        let forecaster = RainfallForecaster::seeded(5);
        forecaster.train(&training_set(|_, _| 3.0)).unwrap();

        let last = NaiveDate::MAX.pred_opt().unwrap().pred_opt().unwrap();
        let points = forecaster.forecast_dated(last, 30.0, 40.0, 5);

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, NaiveDate::MAX);
    }
}
