use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use owo_colors::OwoColorize;
use retail_centralizer::{EntityKind, Settings, cli};
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Retail Data Centralizer: pulls users, cards and stores from their scattered sources into one local database
#[derive(Parser)]
#[command(name = "rdc", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source credentials from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// YAML settings file; missing keys fall back to defaults
    #[arg(short, long, global = true, default_value = "rdc.yml")]
    config: PathBuf,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, clean and upload users, cards and stores
    Run,

    /// List the tables of the relational source
    Tables,

    /// Clean a local CSV or JSON snapshot and print what was dropped
    Clean {
        /// Which cleaner to apply
        #[arg(value_enum)]
        entity: EntityKind,

        /// The document to clean
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = dotenvy::from_filename(&cli.env) {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let settings = Settings::load(Some(&cli.config))?;

    match cli.command {
        Commands::Run => {
            log::info!(
                "Centralizing retail data into {}",
                settings.target_db.display().bright_black()
            );
            let report = cli::run_pipeline(settings).await?;
            for line in report.to_string().lines() {
                log::info!("{}", line);
            }
            for failed in report.failed_uploads() {
                log::warn!("{}", failed.red());
            }
        }
        Commands::Tables => {
            let tables = cli::list_tables(&settings).await?;
            log::info!("{} table(s) in the source database", tables.len().cyan());
            for table in tables {
                println!("{}", table);
            }
        }
        Commands::Clean { entity, file } => {
            log::info!("Cleaning {} data from {}", entity.cyan(), file.bright_black());
            let cleaned = cli::clean_document(entity, &file, settings.expected()).await?;
            println!("{}", cleaned.report);
        }
    }

    Ok(())
}
