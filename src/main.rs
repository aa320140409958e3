// moodpipe - mood-triggered playlists
// Runs one message through the pipeline against the offline demo collaborators

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use moodpipe::demo::{CatalogSearch, LoggingPlayer};
use moodpipe::logging::init_logging;
use moodpipe::{Config, FlowSettings, MoodCatalog, OrchestrationController, VoiceSessions};

#[derive(Parser, Debug)]
#[command(name = "moodpipe", version, about = "Turn a mood message into a playing playlist")]
struct Cli {
    /// Message text, e.g. "I'm feeling sad today"
    #[arg(required = true)]
    text: Vec<String>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Voice destination to queue on
    #[arg(short, long, default_value = "local")]
    destination: String,

    /// Pretend the author is not in a voice channel
    #[arg(long)]
    no_voice: bool,

    /// Simulated search latency per query
    #[arg(long, default_value_t = 150)]
    latency_ms: u64,

    /// Mirror logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config - falls back to defaults if missing
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.logging.stderr |= cli.verbose;
    let _guard = init_logging(&config.logging)?;

    let catalog = match &config.playlist.catalog_path {
        Some(path) => MoodCatalog::load(path)?,
        None => MoodCatalog::builtin(),
    };

    let sessions = VoiceSessions::new(config.playback.default_volume);
    let controller = OrchestrationController::new(
        Arc::new(catalog),
        Arc::new(CatalogSearch::new(Duration::from_millis(cli.latency_ms))?),
        Arc::new(LoggingPlayer),
        FlowSettings::from(&config),
    )?;

    let destination = (!cli.no_voice).then(|| sessions.connect(cli.destination.as_str()));
    let text = cli.text.join(" ");
    info!("Handling message: {}", text);

    // A chat bot would drop the handle; the CLI waits so it can print the result
    let outcome = controller.spawn(text, destination.clone()).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(destination) = destination {
        let queue = destination.queue();
        if let Some(current) = queue.current_entry()? {
            println!("Now playing: {} [{}]", current.title(), current.track.duration_display());
        }
        for (i, entry) in queue.pending(10)?.iter().enumerate() {
            println!("{:>2}. {} [{}]", i + 1, entry.title(), entry.track.duration_display());
        }
    }

    Ok(())
}
