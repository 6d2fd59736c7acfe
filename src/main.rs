use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use drought_payout::{
    load_csv, verify_chain, CycleOutcome, InMemoryLedger, InsuranceAgent,
    LedgerStore, MonitorConfig, PayoutRecord, SqliteLedger,
};

#[derive(Parser, Debug)]
#[command(name = "drought-payout", version, about = "Drought monitoring and crop insurance payout agent")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify farmers and authorize payouts for droughts
    Monitor {
        /// Observation feed (CSV)
        #[arg(long)]
        data: PathBuf,

        /// Only this farmer (default: every farmer in the feed)
        #[arg(long)]
        farmer: Option<String>,

        /// Threshold config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Durable ledger database (default: in-memory for this run)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Verdict, rainfall forecast and drought risk for one farmer
    Report {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        farmer: String,

        #[arg(long)]
        config: Option<PathBuf>,
        /// Forecast horizon override (1-365 days)
        /// Forecast horizon override
        #[arg(long)]
        days: Option<usize>,

        /// Fixed forecast seed override
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print a durable payout ledger
    Ledger {
        #[arg(long)]
        ledger: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Monitor { data, farmer, config, ledger } => {
            let config = load_config(config.as_deref())?;
            let observations = load_csv(&data)?;

            match ledger {
                Some(path) => {
                    let agent = InsuranceAgent::new(config, observations, SqliteLedger::open(&path)?)?;
                    run_monitor(&agent, farmer.as_deref(), cli.json)
                }
                None => {
                    let agent = InsuranceAgent::new(config, observations, InMemoryLedger::new())?;
                    run_monitor(&agent, farmer.as_deref(), cli.json)
                }
            }
        }
        Commands::Report { data, farmer, config, days, seed } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(days) = days {
                config.forecast_horizon_days = days;
            }
            if seed.is_some() {
                config.forecast_seed = seed;
            }

            let agent = InsuranceAgent::new(config, load_csv(&data)?, InMemoryLedger::new())?;
            run_report(&agent, &farmer, cli.json)
        }
        Commands::Ledger { ledger } => {
            let store = SqliteLedger::open(&ledger)?;
            print_ledger(&store.read_all()?, cli.json)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(p) => MonitorConfig::from_file(p),
        None => Ok(MonitorConfig::default()),
    }
}

fn run_monitor<L: LedgerStore>(agent: &InsuranceAgent<L>, farmer: Option<&str>, json: bool) -> Result<()> {
    let outcomes = match farmer {
        Some(id) => vec![(id.to_string(), agent.run_farmer(id)?)],
        None => agent.run_all()?,
    };

    if json {
        let body: Vec<_> = outcomes
            .iter()
            .map(|(farmer_id, outcome)| serde_json::json!({ "farmer_id": farmer_id, "outcome": outcome }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("🌾 Drought Payout Agent - Monitoring Cycle");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for (farmer_id, outcome) in &outcomes {
        let verdict = outcome.verdict();
        match outcome {
            CycleOutcome::NoDrought { .. } => {
                println!("✅ {}: NO DROUGHT DETECTED ({})", farmer_id, verdict.reason);
            }
            CycleOutcome::Paid {
                record, notification, ..
            } => {
                println!("🚨 {}: DROUGHT DETECTED ({})", farmer_id, verdict.reason);
                println!("   💸 Payout authorized: {}", record.transaction_id);
                println!("   📱 {}", notification);
            }
            CycleOutcome::Blocked { reason, .. } => {
                println!("🚨 {}: DROUGHT DETECTED ({})", farmer_id, verdict.reason);
                println!("   ⚠️  Payout blocked: {}", reason);
            }
        }
    }

    let summary = agent.summary()?;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Monitored farmers: {}", summary.monitored_farmers);
    println!("✓ Payouts made:      {}", summary.payouts_made);
    println!("✓ Total disbursed:   ₹{:.2}", summary.total_disbursed);
    println!("✓ Avg drought risk:  {:.2}%", summary.average_risk_pct);

    Ok(())
}

fn run_report<L: LedgerStore>(agent: &InsuranceAgent<L>, farmer: &str, json: bool) -> Result<()> {
    let report = agent.report_farmer(farmer);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("📊 Farmer {} ({} days observed)", report.farmer_id, report.days_observed);
    if let Some(obs) = &report.latest {
        println!(
            "   Latest {}: rain {:.2}mm, temp {:.1}°C, soil moisture {:.1}%",
            obs.date, obs.rainfall_mm, obs.temperature_c, obs.soil_moisture_pct
        );
    }
    println!("   Verdict: {}", report.verdict.reason);

    if report.forecast.is_empty() {
        println!("   Forecast: unavailable (model not trained)");
    } else {
        println!("\n🌧️  Rainfall forecast");
        if let Some(model) = agent.forecaster().model() {
            println!(
                "   model: {:.3} + {:.3}·temp + {:.3}·moisture ({} rows)",
                model.intercept, model.temp_coef, model.moisture_coef, model.samples
            );
        }
        for point in &report.forecast {
            println!("   {}  {:>6.2} mm", point.date, point.rainfall_mm);
        }
    }

    println!(
        "\n📈 Drought risk: {}% ({})",
        report.risk_score,
        report.risk_level.description()
    );

    Ok(())
}

fn print_ledger(records: &[PayoutRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records).context("Failed to serialize ledger")?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No payouts recorded yet.");
        return Ok(());
    }

    println!("📒 Payout Ledger ({} records)", records.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for r in records {
        println!(
            "{}  {}  {:<8}  ₹{:>10.2}  {}",
            r.transaction_id,
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.farmer_id,
            r.amount,
            r.reason
        );
    }

    if verify_chain(records) {
        println!("\n✓ Hash chain intact");
    } else {
        println!("\n❌ Hash chain broken: ledger history was modified");
    }

    Ok(())
}
