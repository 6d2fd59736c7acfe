// 🌦️ Observation Feed - Daily weather/soil readings per farmer
// Read-only input: the core never mutates an observation once loaded

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One farmer's single-day weather/soil reading
///
/// Column names follow the feed's CSV headers; extra columns
/// (e.g. `District`) are ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Farmer ID")]
    pub farmer_id: String,

    /// Daily rainfall, never negative
    #[serde(rename = "Rainfall (mm)")]
    pub rainfall_mm: f64,

    #[serde(rename = "Temperature (°C)")]
    pub temperature_c: f64,

    /// Soil moisture, [0, 100] in practice
    #[serde(rename = "Soil Moisture (%)")]
    pub soil_moisture_pct: f64,
}

impl Observation {
    pub fn new(
        date: NaiveDate,
        farmer_id: &str,
        rainfall_mm: f64,
        temperature_c: f64,
        soil_moisture_pct: f64,
    ) -> Self {
        Observation {
            date,
            farmer_id: farmer_id.to_string(),
            rainfall_mm,
            temperature_c,
            soil_moisture_pct,
        }
    }
}

/// Load the full observation feed from CSV
pub fn load_csv(csv_path: &Path) -> Result<Vec<Observation>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open observation CSV: {:?}", csv_path))?;

    let mut observations = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let observation: Observation = result
            .with_context(|| format!("Failed to deserialize observation on row {}", line + 1))?;
        observations.push(observation);
    }

    tracing::debug!(rows = observations.len(), path = ?csv_path, "loaded observation feed");

    Ok(observations)
}

/// Ordered slice for one farmer (ascending by date)
pub fn for_farmer(observations: &[Observation], farmer_id: &str) -> Vec<Observation> {
    let mut series: Vec<Observation> = observations
        .iter()
        .filter(|o| o.farmer_id == farmer_id)
        .cloned()
        .collect();

    // Stable sort keeps feed order for same-day rows
    series.sort_by_key(|o| o.date);
    series
}

/// Sorted, de-duplicated farmer roster
pub fn farmer_ids(observations: &[Observation]) -> Vec<String> {
    observations
        .iter()
        .map(|o| o.farmer_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Most recent reading of an ascending series
pub fn latest(series: &[Observation]) -> Option<&Observation> {
    series.last()
}

// ============================================================================
// TESTS
// ============================================================================
