//! affogato - forward each Valkey log record once across a fleet of collectors.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use affogato_checkpoint::{CheckpointGate, MemoryStore, ValkeyStore, WatermarkStore};
use affogato_cli::{AffogatoConfig, Pipeline, StoreKind};
use affogato_observer::{DockerTransport, LogObserver, SourceId};
use affogato_parser::LineParser;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "affogato")]
#[command(about = "Tail Valkey container logs and forward each record once")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a container and print admitted records as JSON lines
    Watch {
        /// Container ID or name
        container: String,

        /// Checkpoint name (defaults to the container)
        #[arg(long)]
        app: Option<String>,

        /// Path to config file
        #[arg(short, long, env = "AFFOGATO_CONFIG")]
        config: Option<PathBuf>,

        /// Valkey URL, overrides the config file
        #[arg(long, env = "AFFOGATO_VALKEY_URL")]
        valkey_url: Option<String>,
    },

    /// Parse log lines from a file or stdin and print them as JSON
    Parse {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Generate a default config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "affogato.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive("affogato=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            container,
            app,
            config,
            valkey_url,
        } => {
            watch(container, app, config, valkey_url).await?;
        }

        Commands::Parse { file } => {
            parse(file)?;
        }

        Commands::InitConfig { output } => {
            AffogatoConfig::default().save(&output)?;
            info!(path = %output.display(), "wrote default config");
        }
    }

    Ok(())
}

async fn watch(
    container: String,
    app: Option<String>,
    config_path: Option<PathBuf>,
    valkey_url: Option<String>,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => AffogatoConfig::from_file(&path)?,
        None => AffogatoConfig::default(),
    };
    if let Some(url) = valkey_url {
        config.checkpoint.store = StoreKind::Valkey;
        config.checkpoint.valkey_url = Some(url);
    }
    if let Some(app) = app {
        config.pipeline.app_name = Some(app);
    }
    config.validate()?;

    let source = SourceId::new(container)?;

    let transport = match config.observer.docker_url.as_deref() {
        Some(url) => DockerTransport::connect_with_url(url)?,
        None => DockerTransport::connect()?,
    };
    let observer = LogObserver::new(Arc::new(transport), config.observer.observer_config());

    let store: Arc<dyn WatermarkStore> = match config.checkpoint.store {
        StoreKind::Memory => {
            warn!("using in-memory checkpoints; records are not deduplicated across processes");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Valkey => {
            let url = config
                .checkpoint
                .valkey_url
                .as_deref()
                .context("checkpoint.valkey_url is not set")?;
            Arc::new(ValkeyStore::connect(url).await?)
        }
    };
    let gate = CheckpointGate::new(store, config.checkpoint.gate_config());

    let mut pipeline = Pipeline::new(observer, Arc::new(gate))
        .with_skip_parse_errors(config.pipeline.skip_parse_errors);
    if let Some(app) = config.pipeline.app_name {
        pipeline = pipeline.with_app_name(app);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping");
            }
            cancel.cancel();
        }
    });

    let mut stdout = io::stdout().lock();
    let stats = pipeline
        .run(&cancel, source, |record| {
            serde_json::to_writer(&mut stdout, record)?;
            stdout.write_all(b"\n")
        })
        .await?;

    info!(
        received = stats.received,
        admitted = stats.admitted,
        rejected = stats.rejected,
        parse_errors = stats.parse_errors,
        "watch finished"
    );
    Ok(())
}

fn parse(file: Option<PathBuf>) -> anyhow::Result<()> {
    let input: Box<dyn BufRead> = match file {
        Some(path) => Box::new(io::BufReader::new(
            std::fs::File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let parser = LineParser::new();
    let mut stdout = io::stdout().lock();
    let mut failures = 0_u64;

    for (number, line) in input.split(b'\n').enumerate() {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            continue;
        }

        match parser.parse(&line) {
            Ok(record) => {
                serde_json::to_writer(&mut stdout, &record)?;
                stdout.write_all(b"\n")?;
            }
            Err(e) => {
                failures += 1;
                warn!(line = number + 1, error = %e, "failed to parse line");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} line(s) failed to parse");
    }
    Ok(())
}
