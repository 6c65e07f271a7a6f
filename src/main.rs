use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use uuid::Uuid;

use fivefret::engine::cursor::EventCursor;
use fivefret::engine::{EngineParameters, FiveFretEngine, GameInput, RecordingSink};
use fivefret::flags::{FlagOracle, FlagServer, InMemoryFlagOracle};
use fivefret::model::Chart;
use fivefret::util::logging;

#[derive(Parser)]
#[command(
    name = "fivefret",
    version,
    about = "Headless five-fret guitar hit-detection engine"
)]
struct Cli {
    /// Chart JSON to play.
    chart: PathBuf,

    /// Scripted input trace JSON (a list of timestamped input edges).
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Synthesize ideal input instead of reading a trace.
    #[arg(long)]
    bot: bool,

    /// Engine parameters JSON; defaults apply when omitted.
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Profile id consulted for the override flags.
    #[arg(long)]
    profile: Option<Uuid>,

    /// Serve the flag control plane on this address, e.g. 127.0.0.1:8530.
    #[arg(long)]
    flag_server: Option<String>,

    /// Simulation tick rate in Hz.
    #[arg(long, default_value_t = 240.0)]
    rate: f64,

    /// Also write logs into this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Show debug logs.
    #[arg(short, long)]
    verbose: bool,
}

fn load_trace(path: &PathBuf) -> Result<Vec<GameInput>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read input trace {}", path.display()))?;
    let mut trace: Vec<GameInput> = serde_json::from_str(&content)
        .with_context(|| format!("cannot parse input trace {}", path.display()))?;
    trace.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(trace)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_dir.as_deref(), cli.verbose)?;

    let chart = Chart::load_from(&cli.chart)?;
    let params = match &cli.params {
        Some(path) => EngineParameters::load_from(path)?,
        None => EngineParameters::default(),
    };
    let profile = cli.profile.unwrap_or_else(Uuid::new_v4);
    info!("profile {profile}");

    let oracle = Arc::new(InMemoryFlagOracle::new());
    let _flag_server = cli.flag_server.as_deref().and_then(|addr| {
        match FlagServer::spawn(addr, Arc::clone(&oracle)) {
            Ok(server) => Some(server),
            Err(e) => {
                // The engine keeps running with whatever flags it can
                // observe.
                warn!("flag control plane unavailable: {e:#}");
                None
            }
        }
    });

    let trace = match (&cli.trace, cli.bot) {
        (Some(path), false) => load_trace(path)?,
        (Some(_), true) => {
            warn!("--bot given, ignoring the input trace");
            Vec::new()
        }
        (None, _) => Vec::new(),
    };

    let last_note_time = chart.notes.last().map_or(0.0, |note| note.time);
    let mut engine = FiveFretEngine::new(
        chart,
        params,
        profile,
        Arc::clone(&oracle) as Arc<dyn FlagOracle>,
        RecordingSink::new(),
    )
    .with_bot(cli.bot);

    let (_, back_end) = engine.hit_window_bounds();
    let last_input_time = trace.last().map_or(0.0, |input| input.time);
    let end_time = (last_note_time + back_end).max(last_input_time) + 0.5;
    let step = 1.0 / cli.rate.max(1.0);

    let mut cursor = EventCursor::new(&trace, |input: &GameInput| input.time);
    let mut now = 0.0;
    while now <= end_time {
        while let Some(input) = cursor.advance_one_if_ready(now) {
            engine.queue_input(*input);
        }
        engine.update(now);
        now += step;
    }

    let stats = engine.stats();
    info!("session finished: {} sink events", engine.sink().events.len());
    println!("notes hit     {}", stats.notes_hit);
    println!("notes missed  {}", stats.notes_missed);
    println!("max combo     {}", stats.max_combo);
    println!("overstrums    {}", stats.overstrums);
    println!("ghost inputs  {}", stats.ghost_inputs);
    Ok(())
}
