//! Command-line runner for Entente.
//!
//! `entente self-play` plays one match on the standard map with every power
//! driven by a decision-maker, then prints the final standings.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments and initialize structured logging (tracing)
//! 2. Load configuration from `entente.yaml` and apply flag overrides
//! 3. Build one decision-maker per power from its controller
//! 4. Create the rules engine, board store, and decision collector
//! 5. Run the match loop
//! 6. Log and print the result, optionally writing it as JSON

mod args;
mod report;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use entente_agents::{LlmConfig, LlmDecider};
use entente_core::collector::{DecisionCollector, SharedDecisionMaker};
use entente_core::config::{Controller, MatchConfig};
use entente_core::decision::{DecisionMaker, HoldDecider, RandomDecider};
use entente_core::press::PressLog;
use entente_core::runner;
use entente_core::store::BoardStore;
use entente_rules::StandardEngine;
use entente_types::Power;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command, SelfPlayArgs};
use crate::report::{HistoryCallback, MatchRecord};

const DEFAULT_CONFIG_PATH: &str = "entente.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::SelfPlay(args) => self_play(&args).await,
    }
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn self_play(args: &SelfPlayArgs) -> anyhow::Result<()> {
    info!("entente self-play starting");

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate().context("invalid match configuration")?;
    info!(
        seed = config.game.seed,
        max_phases = config.game.max_phases,
        max_year = config.game.max_year,
        victory_centers = config.game.victory_centers,
        rounds = config.negotiation.rounds,
        timeout_ms = config.decisions.timeout_ms,
        "Configuration loaded"
    );

    let makers = build_makers(&config)?;
    let engine = StandardEngine::new().with_victory_centers(config.game.victory_centers);
    let mut store = BoardStore::new(Box::new(engine));
    let collector = DecisionCollector::from_config(&config, makers);
    let mut press = PressLog::new();
    let mut callback = HistoryCallback::new();

    let result = runner::run_match(
        &mut store,
        &collector,
        &mut press,
        &config.game,
        &mut callback,
    )
    .await
    .context("match did not complete")?;

    runner::log_match_end(&result);
    print!("{}", report::standings_table(&result));

    if let Some(path) = &args.output {
        report::write_record(
            path,
            &MatchRecord {
                result: &result,
                history: callback.history(),
                press: press.messages(),
            },
        )?;
    }
    Ok(())
}

/// Load match configuration.
///
/// An explicit path must exist. Without one, `entente.yaml` in the working
/// directory is used when present and defaults otherwise.
fn load_config(path: Option<&Path>) -> anyhow::Result<MatchConfig> {
    if let Some(path) = path {
        return MatchConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        MatchConfig::from_file(default_path)
            .with_context(|| format!("failed to load config from {DEFAULT_CONFIG_PATH}"))
    } else {
        info!("Config file not found, using defaults");
        Ok(MatchConfig::default())
    }
}

/// One decision-maker per power. Powers sharing a controller share the
/// instance; the LLM backend is only configured when some power uses it.
fn build_makers(config: &MatchConfig) -> anyhow::Result<BTreeMap<Power, SharedDecisionMaker>> {
    let hold: SharedDecisionMaker = Arc::new(HoldDecider::new());
    let random: SharedDecisionMaker = Arc::new(RandomDecider::new(config.game.seed));
    let llm = if Power::ALL
        .iter()
        .any(|power| config.controller_for(*power) == Controller::Llm)
    {
        Some(llm_maker(config)?)
    } else {
        None
    };

    let mut makers = BTreeMap::new();
    for power in Power::ALL {
        let controller = config.controller_for(power);
        let maker = match controller {
            Controller::Hold => Arc::clone(&hold),
            Controller::Random => Arc::clone(&random),
            Controller::Llm => llm
                .clone()
                .context("LLM decision-maker was not configured")?,
        };
        info!(%power, controller = ?controller, maker = maker.name(), "Decision-maker assigned");
        makers.insert(power, maker);
    }
    Ok(makers)
}

fn llm_maker(config: &MatchConfig) -> anyhow::Result<SharedDecisionMaker> {
    let llm_config = LlmConfig::from_env().context("LLM controller needs LLM_* settings")?;
    info!(
        backend = ?llm_config.backend.backend_type,
        model = llm_config.backend.model,
        api_url = llm_config.backend.api_url,
        "LLM backend configured"
    );
    let decider = LlmDecider::from_config(&llm_config, config.game.victory_centers)
        .context("failed to build the LLM decision-maker")?;
    Ok(Arc::new(decider))
}
