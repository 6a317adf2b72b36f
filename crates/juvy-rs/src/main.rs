//! Command-line front end for checking and inspecting Juvy configurations.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use juvy_rs::{Juvy, ValidateOptions, load_schema};
use log::{debug, info};
use std::path::PathBuf;

/// Command-line options for the `juvy` binary.
#[derive(Parser)]
#[command(name = "juvy", version, about = "Check and inspect schema-driven configuration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the resolved configuration
    Check {
        #[command(flatten)]
        source: SourceArgs,
        /// Fail on paths the schema does not declare
        #[arg(long)]
        strict: bool,
    },
    /// Print the resolved configuration with sensitive values redacted
    Show {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print one value as JSON
    Get {
        /// Dotted path of the value
        path: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the normalized schema
    Schema {
        /// Schema file or fragment directory
        #[arg(long)]
        schema: PathBuf,
    },
}

/// Where the schema, documents and overlay arguments come from.
#[derive(Args)]
struct SourceArgs {
    /// Schema file or fragment directory
    #[arg(long)]
    schema: PathBuf,
    /// Optional JSON5 config document merged over the defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Arguments handed to the argument overlay (after `--`)
    #[arg(last = true)]
    args: Vec<String>,
}

impl SourceArgs {
    fn build(&self) -> anyhow::Result<Juvy> {
        info!("loading schema from path: {}", self.schema.display());
        let description = load_schema(&self.schema).context("failed to load schema")?;
        let mut juvy = Juvy::builder(description)
            .args(self.args.iter().cloned())
            .build()
            .context("failed to build configuration")?;
        if let Some(path) = self.config.as_ref() {
            juvy.load_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
        }
        debug!("configuration resolved (overlay_args={})", self.args.len());
        Ok(juvy)
    }
}

/// Entry point for the `juvy` binary.
fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Check { source, strict } => {
            let juvy = source.build()?;
            let options = if strict {
                ValidateOptions::strict()
            } else {
                ValidateOptions::warn().with_output(|warning| eprintln!("{warning}"))
            };
            if let Err(err) = juvy.validate(options) {
                bail!("configuration is invalid:\n{err}");
            }
            println!("configuration is valid");
        }
        Command::Show { source } => {
            let juvy = source.build()?;
            let rendered = serde_json::to_string_pretty(&juvy.to_redacted_json())
                .context("failed to render configuration")?;
            println!("{rendered}");
        }
        Command::Get { path, source } => {
            let juvy = source.build()?;
            if juvy.schema().is_sensitive(&path) {
                bail!("configuration param '{path}' is sensitive");
            }
            let value = juvy.get(&path)?;
            println!("{value}");
        }
        Command::Schema { schema } => {
            let description = load_schema(&schema).context("failed to load schema")?;
            let juvy = Juvy::builder(description)
                .args(Vec::<String>::new())
                .build()
                .context("failed to build configuration")?;
            println!("{}", juvy.schema_string()?);
        }
    }
    Ok(())
}
