//! Ferrofs Init
//!
//! A CLI tool that provisions a new storage node: it creates the node
//! identity and writes the default node configuration.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ferrofs_core::{Config, InitSettings};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "ferrofs-init")]
#[command(author, version, about = "Provision a Ferrofs storage node identity and configuration")]
struct Cli {
    /// Settings file with defaults for this tool (TOML or JSON)
    #[arg(long, global = true, env = "FERROFS_SETTINGS")]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a node identity and write the node configuration
    Init(InitArgs),
    /// Print the peer ID re-derived from an existing node configuration
    PeerId {
        /// Path to the node configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
    /// Write the effective init settings to a TOML file
    Settings {
        /// Output file path
        #[arg(short, long, default_value = "ferrofs-init.toml")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct InitArgs {
    /// Key size in bits (at least 1024)
    #[arg(short, long)]
    bits: Option<usize>,

    /// Key algorithm: RSA, Ed25519, Secp256k1 or ECDSA
    #[arg(short = 't', long)]
    key_type: Option<String>,

    /// Hex-encoded secp256k1 private key to import instead of generating one
    #[arg(long, env = "FERROFS_IMPORT_KEY", hide_env_values = true)]
    import_key: Option<String>,

    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing configuration file
    #[arg(short, long)]
    force: bool,
}

/// Everything needed to provision one node.
#[derive(Clone)]
struct InitRequest {
    bits: usize,
    key_type: String,
    import_key: String,
    output: PathBuf,
    force: bool,
}

impl InitRequest {
    fn new(args: InitArgs, settings: InitSettings) -> Self {
        Self {
            bits: args.bits.unwrap_or(settings.bits),
            key_type: args.key_type.unwrap_or(settings.key_type),
            import_key: args.import_key.unwrap_or_default(),
            output: args.output.unwrap_or(settings.output),
            force: args.force,
        }
    }
}

impl fmt::Debug for InitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitRequest")
            .field("bits", &self.bits)
            .field("key_type", &self.key_type)
            .field("import_key", &if self.import_key.is_empty() { "<none>" } else { "<redacted>" })
            .field("output", &self.output)
            .field("force", &self.force)
            .finish()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = InitSettings::load(cli.settings.as_deref())
        .context("Failed to load init settings")?;
    debug!(?settings, "Init settings loaded");

    match cli.command {
        Commands::Init(args) => init(InitRequest::new(args, settings)).await,
        Commands::PeerId { config } => {
            let peer_id = peer_id_from_config(&config)?;
            println!("{}", peer_id);
            Ok(())
        }
        Commands::Settings { output } => {
            settings
                .save_to_file(&output)
                .with_context(|| format!("Failed to write settings to {}", output.display()))?;
            println!("Settings written to {}", output.display());
            Ok(())
        }
    }
}

async fn init(request: InitRequest) -> Result<()> {
    info!("Initializing node configuration at {}", request.output.display());

    // Key generation blocks, so it runs on its own thread
    let output = request.output.clone();
    tokio::task::spawn_blocking(move || {
        let mut out = std::io::stdout().lock();
        write_config(&mut out, &request)
    })
    .await
    .context("Node initialization task failed")??;

    println!("Node configuration written to {}", output.display());
    Ok(())
}

fn write_config<W: Write + ?Sized>(out: &mut W, request: &InitRequest) -> Result<Config> {
    // Fail before spending time on key generation; open_output re-checks
    if request.output.exists() && !request.force {
        anyhow::bail!(
            "{} already exists, use --force to overwrite it",
            request.output.display()
        );
    }

    let config = Config::init(out, request.bits, &request.key_type, &request.import_key)
        .context("Failed to initialize node identity")?;

    let file = open_output(&request.output, request.force)?;
    config
        .write_json(file)
        .with_context(|| format!("Failed to write {}", request.output.display()))?;

    debug!(?request, "Node configuration written");
    Ok(config)
}

/// Opens the configuration file for writing. Without `force` the file must
/// not exist yet.
fn open_output(path: &Path, force: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    options.open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            anyhow::anyhow!("{} already exists, use --force to overwrite it", path.display())
        } else {
            anyhow::Error::new(e).context(format!("Failed to open {}", path.display()))
        }
    })
}

fn peer_id_from_config(path: &Path) -> Result<String> {
    let config = Config::from_file(path)
        .with_context(|| format!("Failed to read node configuration {}", path.display()))?;

    let peer_id = config
        .identity
        .verify()
        .context("Stored identity is inconsistent")?;

    Ok(peer_id.to_base58())
}
