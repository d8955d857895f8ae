use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use teamhealth::logging::init_logging;
use teamhealth::{
    bundle_from_value, parse_bundle, AlertType, EngineConfig, HealthData, HealthStatus, InsightEngine,
    MetricStatus, PlayerStatus, RosterEntry, RosterView,
};

/// TeamHealth - Athlete Health Insight CLI
///
/// Turns wearable insight bundles into athlete health scores, alerts and
/// return-to-play recommendations, and aggregates them into team statistics.
#[derive(Parser)]
#[command(name = "teamhealth")]
#[command(author = "TeamHealth Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Athlete health insight CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the health view for one athlete's insight bundle
    Player {
        /// Insight bundle JSON file
        #[arg(short, long)]
        bundle: PathBuf,

        /// Athlete name shown in the table header
        #[arg(short, long)]
        name: Option<String>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the coach view for a roster file
    Team {
        /// Roster JSON file (array of athletes, or {"athletes": [...]})
        #[arg(short, long)]
        roster: PathBuf,

        /// Prior team average for the change indicator
        #[arg(short, long)]
        previous: Option<f64>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Configure application settings
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Roster file row; the bundle goes through the lenient ingest path
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterFileEntry {
    id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default, alias = "insights", alias = "cachedInsights")]
    cached_insight_bundle: Option<Value>,
    #[serde(default)]
    last_synced_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "statusOverride")]
    status: Option<String>,
}

impl RosterFileEntry {
    fn into_entry(self) -> Result<RosterEntry> {
        let bundle = self
            .cached_insight_bundle
            .map(bundle_from_value)
            .transpose()
            .with_context(|| format!("Invalid insight bundle for athlete {}", self.id))?;

        Ok(RosterEntry {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            cached_insight_bundle: bundle,
            last_synced_at: self.last_synced_at,
            status_override: self.status.as_deref().map(PlayerStatus::parse),
        })
    }
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct PlayerRow {
    #[tabled(rename = "Athlete")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Score")]
    score: u8,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Last Sync")]
    last_sync: String,
}

#[derive(Tabled)]
struct BarRow {
    #[tabled(rename = "Metric")]
    label: String,
    #[tabled(rename = "Team Avg")]
    value: u8,
    #[tabled(rename = "Athletes")]
    contributors: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::load_or_default(),
    };

    let log_config = config.logging.clone().with_verbosity(cli.verbose);
    init_logging(&log_config)?;

    match cli.command {
        Commands::Player {
            bundle,
            name,
            format,
        } => {
            let raw = read_file(&bundle)?;
            let bundle = parse_bundle(&raw)
                .with_context(|| format!("Failed to parse insight bundle: {}", bundle.display()))?;

            let engine = InsightEngine::with_config(config);
            let health = engine.health_data(bundle, Utc::now());

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
                OutputFormat::Table => print_player(&health, name.as_deref()),
            }
        }

        Commands::Team {
            roster,
            previous,
            format,
        } => {
            let entries = load_roster(&roster)?;
            let engine = InsightEngine::with_config(config);
            let view = engine.roster_view_with_previous(&entries, previous, Utc::now());

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
                OutputFormat::Table => print_team(&view),
            }
        }

        Commands::Config { show, init } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(EngineConfig::default_config_path);

            if init {
                if path.exists() {
                    println!(
                        "{}",
                        format!("Config already exists at {}", path.display()).yellow()
                    );
                } else {
                    EngineConfig::default().save_to_file(&path)?;
                    println!(
                        "{}",
                        format!("✓ Wrote default config to {}", path.display()).green()
                    );
                }
            }

            if show || !init {
                let toml = toml::to_string_pretty(&config)
                    .context("Failed to serialize configuration")?;
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", toml);
            }
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_roster(path: &Path) -> Result<Vec<RosterEntry>> {
    let value: Value = serde_json::from_str(&read_file(path)?)
        .with_context(|| format!("Roster file is not valid JSON: {}", path.display()))?;

    let list = match value {
        Value::Object(mut map) => map.remove("athletes").unwrap_or(Value::Array(vec![])),
        other => other,
    };

    let rows: Vec<RosterFileEntry> =
        serde_json::from_value(list).context("Roster must be an array of athletes")?;
    rows.into_iter().map(RosterFileEntry::into_entry).collect()
}

fn print_player(health: &HealthData, name: Option<&str>) {
    let title = name.unwrap_or("Athlete");
    println!(
        "{} {} {}",
        title.bold(),
        format!("score {}", health.health_score).bold(),
        colored_health(health.health_status)
    );
    println!(
        "  Trend: {:+.1}%   Recovery estimate: {} days   Updated: {}",
        health.health_score_trend, health.recovery_days_estimate, health.last_updated
    );

    let m = &health.health_metrics;
    let rows = vec![
        metric_row("Resting HR", m.resting_heart_rate.value, "bpm", m.resting_heart_rate.trend, m.resting_heart_rate.status),
        metric_row("HRV", m.heart_rate_variability.value, "ms", m.heart_rate_variability.trend, m.heart_rate_variability.status),
        metric_row("Sleep Duration", m.sleep.duration_hours, "h", m.sleep.trend, m.sleep.status),
        metric_row("Sleep Quality", m.sleep.quality, "", m.sleep.trend, m.sleep.status),
        metric_row("Steps", m.activity.steps, "", m.activity.trend, m.activity.status),
        metric_row("Active Minutes", m.activity.active_minutes, "min", m.activity.trend, m.activity.status),
        metric_row("HR Recovery", m.heart_rate_recovery.value, "bpm", m.heart_rate_recovery.trend, m.heart_rate_recovery.status),
    ];
    println!("{}", Table::new(rows).with(Style::rounded()));

    let rtp = &health.return_to_play_status;
    println!("{} {}", "Return to play:".bold(), rtp.status);
    println!("  {}", rtp.message);
    println!("  {}", rtp.details.dimmed());

    if !health.alerts.is_empty() {
        println!("{}", "Alerts:".bold());
        for alert in &health.alerts {
            let tag = match alert.alert_type {
                AlertType::Warning => "WARNING".red().bold(),
                AlertType::Info => "INFO".yellow().bold(),
            };
            println!("  {} {}", tag, alert.message);
            println!("    {}", alert.recommendation.dimmed());
        }
    }
}

fn metric_row(
    label: &str,
    value: Option<f64>,
    unit: &str,
    trend: f64,
    status: MetricStatus,
) -> MetricRow {
    MetricRow {
        metric: label.to_string(),
        value: value
            .map(|v| format!("{:.1} {}", v, unit).trim().to_string())
            .unwrap_or_else(|| "-".to_string()),
        trend: format!("{:+.1}%", trend),
        status: match status {
            MetricStatus::Good => "good",
            MetricStatus::Caution => "caution",
            MetricStatus::AtRisk => "at risk",
        }
        .to_string(),
    }
}

fn print_team(view: &RosterView) {
    let stats = &view.team_statistics;
    println!("{}", "Team overview".bold());
    println!(
        "  Athletes: {}   Avg performance: {}   Team average: {}   At risk: {}",
        stats.total_athletes,
        stats.avg_performance,
        stats.team_average,
        stats.at_risk_count.to_string().red()
    );
    if stats.previous_average.is_some() {
        println!("  Change vs previous: {:+.1}", stats.average_change);
    }
    let dist = &stats.status_distribution;
    println!(
        "  Healthy: {}   Injured: {}   Suspended: {}",
        dist.healthy.to_string().green(),
        dist.injured.to_string().red(),
        dist.suspended.to_string().yellow()
    );

    let players: Vec<PlayerRow> = view
        .players
        .iter()
        .map(|p| PlayerRow {
            name: p.name.clone(),
            status: p.status.to_string(),
            score: p.health_score,
            health: p.health_status.to_string(),
            last_sync: p.last_sync.clone(),
        })
        .collect();
    println!("{}", Table::new(players).with(Style::rounded()));

    let bars: Vec<BarRow> = stats
        .bar_chart_data
        .iter()
        .map(|b| BarRow {
            label: b.label.clone(),
            value: b.value,
            contributors: b.contributors,
        })
        .collect();
    println!("{}", Table::new(bars).with(Style::rounded()));
}

fn colored_health(status: HealthStatus) -> ColoredString {
    match status {
        HealthStatus::Good => status.to_string().green().bold(),
        HealthStatus::Caution => status.to_string().yellow().bold(),
        HealthStatus::AtRisk => status.to_string().red().bold(),
    }
}
