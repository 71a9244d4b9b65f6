use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use formwright::commands::{self, RenderOptions, RunOptions};
use formwright_util::{OutputFormat, Settings, expand_tilde};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "formwright", version, about = "Render, lint and script schema-driven wizards")]
struct Cli {
    /// Settings file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the view model of one step as JSON.
    Render(RenderArgs),
    /// Drive a wizard through a script and write the cleaned data.
    Run(RunArgs),
    /// Report schema issues in a wizard definition.
    Lint(LintArgs),
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[arg(long, short = 'w')]
    wizard: PathBuf,
    /// Initial data (YAML or JSON).
    #[arg(long)]
    data: Option<PathBuf>,
    /// Step id to render; defaults to the first visible step.
    #[arg(long)]
    step: Option<String>,
    /// Rows per table page.
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long, short = 'w')]
    wizard: PathBuf,
    #[arg(long, short = 's')]
    script: PathBuf,
    #[arg(long, short = 'o')]
    out: PathBuf,
    #[arg(long)]
    data: Option<PathBuf>,
    /// Output encoding; defaults to the configured format.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

#[derive(Debug, Args)]
struct LintArgs {
    #[arg(long, short = 'w')]
    wizard: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Yaml,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Yaml => OutputFormat::Yaml,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(&expand_tilde(&path.to_string_lossy()))?,
        None => Settings::load()?,
    };

    match cli.command {
        Command::Render(args) => {
            if let Some(page_size) = args.page_size {
                settings.table_page_size = page_size;
            }
            let options = RenderOptions {
                wizard: args.wizard,
                data: args.data,
                step: args.step,
            };
            let document = commands::render(&settings, &options)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Command::Run(args) => {
            let options = RunOptions {
                wizard: args.wizard,
                script: args.script,
                out: args.out,
                data: args.data,
                format: args.format.map(OutputFormat::from).unwrap_or(settings.output_format),
            };
            let report = commands::run(&settings, &options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Lint(args) => {
            let issues = commands::lint(&args.wizard)?;
            if issues.is_empty() {
                info!(wizard = %args.wizard.display(), "no schema issues");
                return Ok(());
            }
            for issue in &issues {
                println!("{issue}");
            }
            bail!("{} schema issue(s) in {}", issues.len(), args.wizard.display());
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
