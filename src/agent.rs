// 🤖 Insurance Agent - Long-lived service object owned by the host
// Holds the observation feed, config, payout authorizer and forecaster.
// Hosts (CLI, web server) pass a reference into each request; no globals.

use crate::config::MonitorConfig;
use crate::drought::{check_farmer, DroughtVerdict};
use crate::forecast::{round2, ForecastPoint, RainfallForecaster};
use crate::ledger::{LedgerStore, PayoutRecord};
use crate::observation::{farmer_ids, for_farmer, latest, Observation};
use crate::payout::{CycleOutcome, PayoutAuthorizer, PayoutError};
use crate::risk::{score_risk, RiskLevel};
use anyhow::Result;
use serde::Serialize;

/// Everything shown for one farmer: verdict plus the forward-looking risk
#[derive(Debug, Clone, Serialize)]
pub struct FarmerReport {
    pub farmer_id: String,
    pub days_observed: usize,
    pub latest: Option<Observation>,
    pub verdict: DroughtVerdict,
    pub forecast: Vec<ForecastPoint>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

/// Dashboard headline numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub monitored_farmers: usize,
    pub payouts_made: usize,
    pub total_disbursed: f64,

    /// Mean forward risk score across the roster (0 when empty)
    pub average_risk_pct: f64,
}

pub struct InsuranceAgent<L: LedgerStore> {
    config: MonitorConfig,
    observations: Vec<Observation>,
    authorizer: PayoutAuthorizer<L>,
    forecaster: RainfallForecaster,
}

impl<L: LedgerStore> InsuranceAgent<L> {
    /// Validate config and train the forecaster on the full feed
    ///
    /// An empty feed leaves the forecaster untrained (forecasts come back empty).
    pub fn new(config: MonitorConfig, observations: Vec<Observation>, ledger: L) -> Result<Self> {
        config.validate()?;

        let forecaster = match config.forecast_seed {
            Some(seed) => RainfallForecaster::seeded(seed),
            None => RainfallForecaster::new(),
        };

        let agent = InsuranceAgent {
            authorizer: PayoutAuthorizer::new(ledger, config.payout_amount),
            config,
            observations,
            forecaster,
        };
        agent.train();

        Ok(agent)
    }

    /// Refit the forecaster on the current feed
    pub fn train(&self) {
        if let Err(e) = self.forecaster.train(&self.observations) {
            tracing::warn!(error = %e, "rainfall forecaster left untrained");
        }
    }

    pub fn forecaster(&self) -> &RainfallForecaster {
        &self.forecaster
    }

    pub fn farmers(&self) -> Vec<String> {
        farmer_ids(&self.observations)
    }

    /// Verdict, forecast from the farmer's latest reading, and risk score
    pub fn report_farmer(&self, farmer_id: &str) -> FarmerReport {
        let series = for_farmer(&self.observations, farmer_id);
        let verdict = check_farmer(&self.observations, farmer_id, &self.config.thresholds());

        let forecast = match latest(&series) {
            Some(obs) => self.forecaster.forecast_dated(
                obs.date,
                obs.temperature_c,
                obs.soil_moisture_pct,
                self.config.forecast_horizon_days,
            ),
            None => Vec::new(),
        };

        let rainfall: Vec<f64> = forecast.iter().map(|p| p.rainfall_mm).collect();
        let risk_score = score_risk(&rainfall, self.config.rain_threshold_mm);

        FarmerReport {
            farmer_id: farmer_id.to_string(),
            days_observed: series.len(),
            latest: series.last().cloned(),
            verdict,
            forecast,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
        }
    }

    /// One monitoring cycle for one farmer
    pub fn run_farmer(&self, farmer_id: &str) -> Result<CycleOutcome, PayoutError> {
        self.authorizer
            .run_cycle(&self.observations, farmer_id, &self.config.thresholds())
    }

    /// One monitoring cycle for every farmer in the feed
    pub fn run_all(&self) -> Result<Vec<(String, CycleOutcome)>, PayoutError> {
        self.farmers()
            .into_iter()
            .map(|farmer_id| {
                let outcome = self.run_farmer(&farmer_id)?;
                Ok((farmer_id, outcome))
            })
            .collect()
    }

    pub fn ledger(&self) -> Result<Vec<PayoutRecord>, PayoutError> {
        self.authorizer.get_ledger()
    }

    pub fn summary(&self) -> Result<AgentSummary, PayoutError> {
        let farmers = self.farmers();

        let average_risk_pct = if farmers.is_empty() {
            0.0
        } else {
            let total: f64 = farmers.iter().map(|f| self.report_farmer(f).risk_score).sum();
            round2(total / farmers.len() as f64)
        };

        Ok(AgentSummary {
            monitored_farmers: farmers.len(),
            payouts_made: self.authorizer.payout_count()?,
            total_disbursed: self.authorizer.total_disbursed()?,
            average_risk_pct,
        })
    }
}
