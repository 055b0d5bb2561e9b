//! Debate demo binary.
//!
//! Runs one full panel debate against an OpenAI-compatible endpoint and
//! streams every turn to the console.
//!
//! # Usage
//!
//! ```bash
//! # Built-in demo symbols (ACME, NOVA, DRIP) against OpenAI
//! ANALYST_API_KEY=sk-... analyst-agents NOVA
//!
//! # Local server, custom model, bigger panel
//! analyst-agents ACME --base-url http://localhost:8000/v1 \
//!     --model qwen2.5-32b-instruct --panel-size 5
//!
//! # Your own fact sheets
//! analyst-agents TSLA --facts-file ./sheets.json
//! ```

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use analyst_agents::{default_catalog, AgentsConfig, OpenAiChatClient, StaticFactSheets};
use deliberation::{
    DebateConfig, DebateCoordinator, DebateEvent, DebateTurnEntry, EventKind, MemoryStore,
};

#[derive(Parser, Debug)]
#[command(
    name = "analyst-agents",
    version,
    about = "Run a panel of LLM analysts through a debate on one stock"
)]
struct Args {
    /// Ticker symbol to debate
    #[arg(value_name = "SYMBOL", default_value = "ACME")]
    symbol: String,

    /// TOML config file (flags below override it)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// Model name for every analyst
    #[arg(long)]
    model: Option<String>,

    /// How many analysts to seat
    #[arg(long)]
    panel_size: Option<usize>,

    /// JSON file of fact sheets replacing the demo symbols
    #[arg(long)]
    facts_file: Option<std::path::PathBuf>,

    /// Cap on debate rounds
    #[arg(long)]
    max_rounds: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("analyst_agents=info".parse().unwrap())
                .add_directive("deliberation=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = AgentsConfig::load(args.config.as_deref())?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(panel_size) = args.panel_size {
        config.panel_size = panel_size;
    }
    if let Some(facts_file) = args.facts_file {
        config.facts_file = Some(facts_file);
    }

    let facts = match &config.facts_file {
        Some(path) => StaticFactSheets::from_json_file(path)?,
        None => StaticFactSheets::with_demo_symbols(),
    };
    let mut available: Vec<String> = facts.symbols().iter().map(|s| s.to_string()).collect();
    available.sort();

    let provider = OpenAiChatClient::new(&config)?.shared();
    let store = MemoryStore::new().shared();

    // The roster keeps its per-analyst temperatures but follows the
    // configured model name.
    let catalog: Vec<_> = default_catalog()
        .into_iter()
        .map(|mut profile| {
            profile.model.model = config.model.clone();
            profile
        })
        .collect();

    let mut debate_config = DebateConfig::default();
    if let Some(max_rounds) = args.max_rounds {
        debate_config.max_rounds = max_rounds;
    }

    let coordinator = DebateCoordinator::with_config(
        provider,
        facts.shared(),
        store.clone(),
        catalog,
        debate_config,
    )
    .with_panel_size(config.panel_size)
    .with_selector_model(config.model_config());

    let ticket = match coordinator.start_session(&args.symbol, "cli").await {
        Ok(ticket) => ticket,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("available symbols: {}", available.join(", "));
            std::process::exit(1);
        }
    };

    println!();
    println!("{}", "=".repeat(70));
    println!("  Debating {} with {} analysts", ticket.symbol, ticket.panel.len());
    println!("{}", "=".repeat(70));
    for (i, member) in ticket.panel.iter().enumerate() {
        println!(
            "  {}. {} ({}) using {}",
            i + 1,
            member.profile.display_name,
            member.profile.specialization,
            member.profile.model.model
        );
    }
    println!("{}", "-".repeat(70));

    let mut logs = coordinator.subscribe(&ticket.session_id, EventKind::Log)?;
    let mut completes = coordinator.subscribe(&ticket.session_id, EventKind::Complete)?;
    let mut errors = coordinator.subscribe(&ticket.session_id, EventKind::Error)?;

    // Biased toward the log channel so buffered turns print before the
    // terminal event; each stream stays armed until it closes.
    let mut logs_open = true;
    let mut completes_open = true;
    let mut errors_open = true;
    while logs_open || completes_open || errors_open {
        tokio::select! {
            biased;
            event = logs.recv(), if logs_open => match event {
                Ok(DebateEvent::Log { entry, .. }) => println!("{}", turn_line(&entry)),
                Ok(_) => {}
                Err(RecvError::Closed) => logs_open = false,
                Err(RecvError::Lagged(_)) => {}
            },
            event = completes.recv(), if completes_open => match event {
                Ok(DebateEvent::Complete { decision, target_price, confidence, reasoning, .. }) => {
                    println!("{}", "-".repeat(70));
                    println!("  VERDICT: {decision} ({confidence}% of the panel)");
                    if let Some(target) = target_price {
                        println!("  Target price: ${target:.2}");
                    }
                    if !reasoning.is_empty() {
                        println!("  {reasoning}");
                    }
                    completes_open = false;
                }
                Ok(_) => {}
                Err(_) => completes_open = false,
            },
            event = errors.recv(), if errors_open => match event {
                Ok(DebateEvent::Error { message, .. }) => {
                    eprintln!("session error: {message}");
                    errors_open = false;
                }
                Ok(_) => {}
                Err(_) => errors_open = false,
            },
        }
    }

    coordinator.join_session(&ticket.session_id).await?;

    let turns = store.get_turns(&ticket.session_id).await?;
    if let Some(record) = store.get_verdict(&ticket.session_id).await? {
        println!("{}", "-".repeat(70));
        println!(
            "  {} turns, {} tokens ({} prompt / {} completion)",
            turns.len(),
            record.usage.total,
            record.usage.prompt,
            record.usage.completion
        );
    }
    println!();

    Ok(())
}

fn turn_line(entry: &DebateTurnEntry) -> String {
    let stance = match entry.decision {
        Some(decision) => format!("{} {}%", decision, entry.confidence.unwrap_or(50)),
        None => "n/a".to_string(),
    };
    format!(
        "[round {}] {:<18} {:>9}  {}",
        entry.turn_number,
        entry.agent_name,
        stance,
        gist(entry)
    )
}

/// One printable line for a turn: the summary when the model gave one,
/// otherwise the first line of the raw message.
fn gist(entry: &DebateTurnEntry) -> String {
    if !entry.summary.is_empty() {
        return entry.summary.clone();
    }
    let first_line = entry.message.lines().next().unwrap_or("");
    if first_line.chars().count() > 80 {
        let cut: String = first_line.chars().take(77).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}
