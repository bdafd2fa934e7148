use clap::{Parser, Subcommand};
use photo_engine::color::{Rgb, annotate_palette, parse_or_neutral};
use photo_engine::pipeline::{Engine, SelectionRequest};
use photo_engine::profile::Level;
use photo_engine::types::CancelToken;
use photo_engine::{config, output, theme};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photo-engine")]
#[command(about = "Score and select images, palettes and strategies for a client profile")]
#[command(long_about = "\
Score and select images, palettes and strategies for a client profile

A request names the client's sector (plus optional audience tags and
anxiety/trust/professionalism levels) and the page sections that need
images. The engine looks every section keyword up in the configured
providers, scores candidates, fills each section with exactly the
requested number of entries, and picks a palette and conversion strategy.

Request file:

  {
    \"profile\": { \"sector\": \"therapy\", \"audience\": [\"adults\"] },
    \"sections\": [
      { \"name\": \"hero\", \"count\": 1, \"orientation\": \"landscape\",
        \"quality\": \"high\", \"keywords\": [\"calm office\", \"handshake\"] }
    ]
  }

Config directory (all optional, merged over the stock tables):

  config/
  ├── engine.toml           # Overrides for any stock table
  ├── catalog.json          # Catalog provider payloads (keyword → image)
  └── sectors/
      └── dentistry.toml    # Merged into [sectors.dentistry]

Set RUST_LOG=debug to trace provider lookups.

Run 'photo-engine gen-config' to print the documented stock engine.toml.")]
#[command(version)]
struct Cli {
    /// Config directory (engine.toml, sectors/, catalog files)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a selection request and print the result as JSON
    Select {
        /// Request file (JSON)
        #[arg(long)]
        request: PathBuf,
        /// Print a human-readable summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Derive and annotate a palette from four base colors
    Palette {
        primary: String,
        secondary: String,
        tertiary: String,
        accent: String,
        /// Audience anxiety level used for the fit score
        #[arg(long, value_enum, default_value_t = AnxietyArg::Medium)]
        anxiety: AnxietyArg,
        /// Print JSON instead of the contrast table
        #[arg(long)]
        json: bool,
    },
    /// Validate the config directory without running a request
    Check,
    /// Print a stock engine.toml with all options documented
    GenConfig,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum AnxietyArg {
    Low,
    Medium,
    High,
}

impl From<AnxietyArg> for Level {
    fn from(arg: AnxietyArg) -> Self {
        match arg {
            AnxietyArg::Low => Level::Low,
            AnxietyArg::Medium => Level::Medium,
            AnxietyArg::High => Level::High,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Select { request, summary } => {
            let (engine_config, base_dir) = load_tables(cli.config_dir.as_deref())?;
            let engine = Engine::from_config(Arc::new(engine_config), &base_dir)?;
            let content = std::fs::read_to_string(&request)?;
            let request: SelectionRequest = serde_json::from_str(&content)?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_selection_event(&event) {
                        eprintln!("{}", line);
                    }
                }
            });
            let result = engine.select_request(&request, &CancelToken::new(), Some(tx));
            printer.join().ok();
            let result = result?;

            if summary {
                output::print_summary(&result);
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Command::Palette {
            primary,
            secondary,
            tertiary,
            accent,
            anxiety,
            json,
        } => {
            let (engine_config, _) = load_tables(cli.config_dir.as_deref())?;
            let (neutral, _) =
                parse_or_neutral(&engine_config.engine.neutral_color, Rgb::new(128, 128, 128));
            let mut warnings = Vec::new();
            let spec = theme::derive_lenient(
                "custom",
                [
                    primary.as_str(),
                    secondary.as_str(),
                    tertiary.as_str(),
                    accent.as_str(),
                ],
                neutral,
                &mut warnings,
            );
            for warning in &warnings {
                eprintln!("warning: {}", warning);
            }
            let fit = theme::palette_fit(&spec, anxiety.into());
            let palette =
                annotate_palette("custom", spec, engine_config.palette.min_contrast, fit);
            if json {
                println!("{}", serde_json::to_string_pretty(&palette)?);
            } else {
                output::print_palette(&palette);
            }
        }
        Command::Check => {
            let (engine_config, base_dir) = load_tables(cli.config_dir.as_deref())?;
            println!("==> Checking {}", base_dir.display());
            Engine::from_config(Arc::new(engine_config.clone()), &base_dir)?;
            output::print_check_output(&engine_config);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the tables for `--config-dir`, or the stock tables without one.
///
/// Returns the directory catalog paths resolve against.
fn load_tables(dir: Option<&Path>) -> Result<(config::EngineConfig, PathBuf), config::ConfigError> {
    match dir {
        Some(dir) => Ok((config::load_config(dir)?, dir.to_path_buf())),
        None => Ok((config::stock_config()?, PathBuf::from("."))),
    }
}
