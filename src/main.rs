use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qasheet::{config::PipelineConfig, pipeline::Pipeline, server, workbook};
use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "qasheet", about = "Turn embedded Q&A definition lists into spreadsheet columns")]
struct Cli {
    /// YAML pipeline config; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert one spreadsheet file
    Convert {
        input: PathBuf,
        /// Output path; defaults to the configured file name next to the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Serve the upload page
    Serve {
        /// Bind address; defaults to 0.0.0.0:$PORT (8080)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

fn main() {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // ─── 2) load config ──────────────────────────────────────────────
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let pipeline = Pipeline::new(config);

    match cli.command {
        Command::Convert { input, output } => convert(&pipeline, &input, output),
        Command::Serve { bind } => {
            let addr = match bind {
                Some(addr) => addr,
                None => {
                    let port: u16 = env::var("PORT")
                        .ok()
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(8080);
                    SocketAddr::from(([0, 0, 0, 0], port))
                }
            };
            let rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            rt.block_on(server::serve(addr, pipeline))
        }
    }
}

fn convert(pipeline: &Pipeline, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let start = Instant::now();
    let output =
        output.unwrap_or_else(|| input.with_file_name(&pipeline.config().output.file_name));

    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let (out, report) = workbook::convert_bytes(&bytes, pipeline)
        .with_context(|| format!("converting {}", input.display()))?;
    fs::write(&output, out).with_context(|| format!("writing {}", output.display()))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        rows = report.rows,
        questions = report.questions,
        overridden = report.answers_overridden,
        collisions = report.collisions,
        elapsed = ?start.elapsed(),
        "done"
    );
    Ok(())
}
