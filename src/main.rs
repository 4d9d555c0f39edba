use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use directories::ProjectDirs;
use pinseal::{
    FileTransport, Format, KdfParams, NdefTransport, PayloadCodec, Transport, detect_format,
    inspect, read_master_key, write_master_key,
};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
struct MasterKeyArgs {
    /// Read the master key as raw bytes from a file
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Master key given as hex
    #[arg(long, value_name = "HEX")]
    hex: Option<String>,
}

impl MasterKeyArgs {
    fn load(&self) -> Result<Zeroizing<Vec<u8>>> {
        match (&self.input, &self.hex) {
            (Some(path), _) => Ok(Zeroizing::new(
                fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
            )),
            (None, Some(encoded)) => Ok(Zeroizing::new(
                hex::decode(encoded.trim()).context("master key is not valid hex")?,
            )),
            (None, None) => bail!("no master key given"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pinseal")]
#[command(
    version,
    about = "Seal a master key under a PIN for storage on an NFC tag or other passive medium."
)]
struct Cli {
    /// Path to the tag image file
    #[arg(long, global = true, value_name = "PATH", env = "PINSEAL_TAG")]
    tag: Option<PathBuf>,

    /// Frame the payload as an NDEF MIME record
    #[arg(long, global = true, env = "PINSEAL_NDEF")]
    ndef: bool,

    /// Log key derivation and framing details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Seals a master key and writes it to the tag
    Seal {
        #[command(flatten)]
        master_key: MasterKeyArgs,

        /// Payload layout: legacy (no header) or v1 (versioned)
        #[arg(long, default_value_t = Format::Legacy)]
        format: Format,

        /// PBKDF2 iterations, v1 layout only (default: 100000)
        #[arg(long)]
        iterations: Option<u32>,

        /// Overwrite a payload already on the tag
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Reads the tag and prints the master key as hex
    Open {
        /// Write the raw master key to a file instead
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Shows non-secret details of the payload on the tag
    Info {
        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Parse with this layout instead of detecting it
        #[arg(long)]
        format: Option<Format>,
    },
}

fn default_tag_path() -> Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("", "", "pinseal").context("could not determine platform directories")?;

    Ok(project_dirs.data_dir().join("tag.bin"))
}

fn resolve_transport(path: Option<PathBuf>, ndef: bool) -> Result<Box<dyn Transport>> {
    let path = match path {
        Some(p) => p,
        None => default_tag_path()?,
    };
    debug!(path = %path.display(), ndef, "using tag image");

    let file = FileTransport::new(path);
    if ndef {
        Ok(Box::new(NdefTransport::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let directive = if verbose { "pinseal=debug" } else { "pinseal=warn" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose)?;

    let mut transport = resolve_transport(args.tag.clone(), args.ndef)?;

    match args.command {
        Commands::Seal {
            master_key,
            format,
            iterations,
            force,
        } => {
            if format == Format::Legacy && iterations.is_some() {
                bail!("--iterations requires --format v1");
            }
            let kdf = match iterations {
                Some(n) => KdfParams::new(n)?,
                None => KdfParams::legacy(),
            };

            if !force && transport.read()?.is_some() {
                bail!("tag already holds a payload; use --force to overwrite");
            }

            let master_key = master_key.load()?;
            let pin = auth::read_new_pin_with_confirmation()?;

            let codec = PayloadCodec::new().with_format(format).with_kdf(kdf);
            write_master_key(&mut *transport, &codec, &master_key, pin)
                .context("failed to seal master key")?;

            println!("master key sealed ({} bytes, {format})", master_key.len());
        }

        Commands::Open { output } => {
            let pin = auth::read_pin()?;
            let master_key = read_master_key(&mut *transport, &PayloadCodec::new(), pin)
                .context("failed to open master key")?;

            match output {
                Some(path) => {
                    fs::write(&path, master_key.as_slice())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("master key written to {}", path.display());
                }
                None => {
                    let encoded = Zeroizing::new(hex::encode(master_key.as_slice()));
                    println!("{}", encoded.as_str());
                }
            }
        }

        Commands::Info { json, format } => {
            let payload = transport
                .read()?
                .context("no payload found on tag")?;
            let format = format.unwrap_or_else(|| detect_format(&payload));
            let info = inspect(&payload, format)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{info}");
            }
        }
    }

    Ok(())
}
