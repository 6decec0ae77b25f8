mod app;
mod command;
mod ui;

use std::io::{self, Write};
use std::path::PathBuf;

use app::App;
use clap::Parser;
use command::Command;
use retouch_core::{EditMode, Studio};
use retouch_llm_gemini::{GeminiConfig, GeminiRequestExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RETOUCH_LOG";
const PROMPT: &str = "retouch> ";

#[derive(Parser)]
#[command(name = "retouch", about = "Edit an image step by step with an image model")]
struct Cli {
    /// Image model to use.
    #[arg(long, default_value = retouch_llm_gemini::DEFAULT_MODEL_ID)]
    model: String,

    /// Where `save` writes files. Defaults to the app data directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Starting edit mode.
    #[arg(long)]
    mode: Option<EditMode>,

    /// Requested output aspect ratio, e.g. `1:1` or `16:9`.
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Image to open on start.
    image: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let mut config = GeminiConfig::from_env();
    ensure_api_key(&mut config)?;

    let model = retouch_llm_gemini::provider(config).model(&cli.model);
    tracing::info!(model = model.model_id(), provider = model.provider(), "starting");
    let studio = Studio::new(model);
    if let Some(ratio) = cli.aspect_ratio {
        studio.configure_request(move |req| {
            req.aspect_ratio(&ratio);
        });
    }
    if let Some(mode) = cli.mode {
        studio.set_mode(mode);
    }

    let out_dir = match cli.out_dir {
        Some(dir) => dir,
        None => retouch_app::export_dir()?,
    };
    let mut app = App::new(studio, out_dir);

    if let Some(path) = cli.image {
        print_lines(&app.handle(Command::Upload(path)).await);
    }
    run(&mut app).await
}

fn ensure_api_key(config: &mut GeminiConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !config.api_key.trim().is_empty() {
        return Ok(());
    }
    let value = rpassword::prompt_password("Enter API key for Gemini: ")?;
    if value.trim().is_empty() {
        return Err("no API key provided for Gemini".into());
    }
    config.api_key = value.trim().to_string();
    Ok(())
}

async fn run(app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("type `help` for commands");

    loop {
        print!("{PROMPT}");
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match Command::parse(&line) {
            Ok(Some(command)) => print_lines(&app.handle(command).await),
            Ok(None) => {}
            Err(err) => println!("error: {err}"),
        }
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
