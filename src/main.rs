use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "carve")]
#[command(about = "Extract C source files from free-form model responses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Perform a dry run without writing files")]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Extract code blocks from responses and write them as files")]
    Extract {
        #[arg(required = true, help = "Response files to read ('-' for stdin)")]
        responses: Vec<String>,

        #[arg(short, long, help = "Output directory (default: extracted)")]
        out: Option<PathBuf>,

        #[arg(long, help = "YAML rules file extending the signature table")]
        rules: Option<PathBuf>,

        #[arg(long, help = "Truncate responses larger than this many bytes")]
        max_input_bytes: Option<usize>,

        #[arg(long, help = "Do not write files that fail the structural checks")]
        reject_invalid: bool,

        #[arg(long, help = "Forget the manifest and rewrite every file")]
        clean: bool,

        #[arg(long, help = "Print the attribution report as JSON")]
        json: bool,
    },

    #[command(about = "Run the structural checks on existing source files")]
    Validate {
        #[arg(required = true, help = "Source files to check")]
        files: Vec<PathBuf>,
    },

    #[command(about = "List files introduced in the prose of a response")]
    Sections {
        #[arg(help = "Response file to read ('-' for stdin)")]
        response: String,

        #[arg(long, help = "Print the sections as JSON")]
        json: bool,
    },

    #[command(about = "Show the signature table in evaluation order")]
    Rules {
        #[arg(long, help = "YAML rules file extending the signature table")]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Extract {
            responses,
            out,
            rules,
            max_input_bytes,
            reject_invalid,
            clean,
            json,
        } => {
            let overrides = cli::SettingsOverrides {
                out_dir: out,
                rules,
                max_input_bytes,
                reject_invalid,
                clean,
            };
            cli::extract(responses, overrides, json, &config).await?;
        }
        Commands::Validate { files } => {
            cli::validate(files, &config)?;
        }
        Commands::Sections { response, json } => {
            cli::sections(&response, json)?;
        }
        Commands::Rules { rules } => {
            cli::rules(rules)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("CARVE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
