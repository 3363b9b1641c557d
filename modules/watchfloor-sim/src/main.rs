use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use watchfloor_common::SimConfig;
use watchfloor_sim::{Simulation, SimulationDeps, StaticDirectory};

const SAMPLE_CITIZENS: &str = include_str!("../data/citizens.json");

#[derive(Parser)]
#[command(name = "watchfloor", about = "Run a scripted Watchfloor operator session")]
struct Cli {
    /// Operator code shown on the dashboard
    #[arg(long, default_value = "OP-7731")]
    operator: String,

    /// Citizen snapshot JSON (overrides WATCHFLOOR_CITIZENS)
    #[arg(long)]
    citizens: Option<PathBuf>,

    /// Maximum flags to submit before switching to no-action reviews
    #[arg(long, default_value_t = 3)]
    flags: usize,

    /// World ticks to run after the review pass
    #[arg(long, default_value_t = 4)]
    ticks: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("watchfloor=info".parse()?)
        .add_directive("watchfloor_sim=info".parse()?);
    if std::env::var("WATCHFLOOR_LOG_JSON").is_ok_and(|v| v == "1" || v == "true") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let cli = Cli::parse();
    let config = SimConfig::from_env()?;

    let catalog = config.load_catalog()?;
    let citizens_json = match cli.citizens.as_ref().or(config.citizens_path.as_ref()) {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Citizen file not found: {}", path.display()))?,
        None => SAMPLE_CITIZENS.to_string(),
    };
    let directory = StaticDirectory::from_json(&citizens_json).context("Invalid citizen JSON")?;

    let sim = Simulation::new(
        SimulationDeps::builder()
            .catalog(Arc::new(catalog))
            .directory(Arc::new(directory))
            .seed(config.seed)
            .build(),
    )?;

    let dashboard = sim.start_session(&cli.operator).await?;
    let operator_id = dashboard.operator_id;
    info!(
        operator = %dashboard.operator_code,
        directive = %dashboard.directive.title,
        queue = dashboard.review_queue.len(),
        "Shift started"
    );

    let mut flagged = 0;
    for entry in &dashboard.review_queue {
        let assessment = sim.assess_risk(operator_id, entry.citizen_id).await?;
        let recommended = assessment.recommended_actions.first();

        match recommended {
            Some(action) if entry.matches_directive && flagged < cli.flags => {
                let result = sim
                    .submit_flag(operator_id, entry.citizen_id, action.action, &action.rationale)
                    .await?;
                flagged += 1;
                info!(
                    citizen = %entry.name,
                    flag_type = %result.flag_type,
                    risk_score = result.risk_score,
                    detected = result.detected,
                    status = %result.operator_status,
                    "Flag submitted"
                );
                if let Some(outcome) = result.immediate_outcome {
                    println!("{}: {}", entry.name, outcome.narrative);
                }
                if result.campaign_complete {
                    break;
                }
            }
            _ => {
                let result = sim
                    .submit_no_action(operator_id, entry.citizen_id, "insufficient grounds")
                    .await?;
                info!(
                    citizen = %entry.name,
                    risk_score = assessment.score,
                    compliance = result.compliance_score,
                    "No action recorded"
                );
            }
        }
    }

    for _ in 0..cli.ticks {
        let report = sim.tick(operator_id).await?;
        info!(
            tick = report.tick,
            published = report.articles_published,
            drafted = report.articles_drafted,
            protests_formed = report.protests_formed,
            protest_changes = report.protest_changes.len(),
            "World advanced"
        );
        if report.deadline_missed {
            warn!(status = %report.operator_status, "Directive deadline missed");
        }
    }

    let summary = sim.end_session(operator_id).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
