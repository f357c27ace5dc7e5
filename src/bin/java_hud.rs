//! Console front end for the assistant.

use clap::Parser;
use java_hud::config::{AssistantConfig, BackendProvider};
use java_hud::console::{CommandSpeaker, ConsoleInput};
use java_hud::session::{Session, SessionState};
use java_hud::speech::{SpeechInput, SpeechOutput};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Just Another Voice Assistant. Type what you would say; Ctrl+C or "exit" quits.
#[derive(Parser)]
#[command(name = "java-hud", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat backend: openai, anthropic, gemini, or ollama.
    #[arg(short, long)]
    provider: Option<BackendProvider>,

    /// Model identifier for the chosen backend.
    #[arg(short, long)]
    model: Option<String>,

    /// Allowlist JSON document.
    #[arg(long)]
    allowlist: Option<PathBuf>,

    /// Also write logs to a daily-rotated file in this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Also write logs to the default log directory.
    #[arg(long, conflicts_with = "log_dir")]
    log_file: bool,

    /// Print responses without speaking them.
    #[arg(long)]
    mute: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| cli.log_file.then(java_hud::hud_dirs::logs_dir));
    let _log_guard = java_hud::logging::init(log_dir.as_deref());

    let mut config = AssistantConfig::load_or_default(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    let input = Arc::new(ConsoleInput::new());
    let input_closed = input.closed();
    let output: Arc<dyn SpeechOutput> = if cli.mute {
        Arc::new(CommandSpeaker::silent())
    } else {
        Arc::new(CommandSpeaker::new(config.speech.voice_command.as_deref()))
    };

    let session = Session::from_config(&config, Arc::clone(&input) as Arc<dyn SpeechInput>, output)?
        .with_response_observer(Arc::new(|text: &str| println!("JAVA: {text}")))
        .with_status_observer(Arc::new(|state| {
            if state == SessionState::Listening {
                print!("> ");
                let _ = std::io::stdout().flush();
            }
        }));
    let session = Arc::new(session);

    println!(
        "Java-the-hud v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.backend.provider.display_name()
    );

    let watcher = Arc::clone(&session);
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    info!("received Ctrl+C, shutting down...");
                }
            }
            () = input_closed.cancelled() => info!("input closed, shutting down..."),
        }
        watcher.stop();
    });

    session.start().await?;
    session.wait().await;
    Ok(())
}

fn apply_overrides(config: &mut AssistantConfig, cli: &Cli) {
    if let Some(provider) = cli.provider
        && provider != config.backend.provider
    {
        // Settings from the file belong to the other provider.
        config.backend.provider = provider;
        config.backend.model = None;
        config.backend.base_url = None;
        config.backend.api_key = None;
    }
    if let Some(model) = &cli.model {
        config.backend.model = Some(model.clone());
    }
    if let Some(path) = &cli.allowlist {
        config.allowlist.path = path.clone();
    }
}
