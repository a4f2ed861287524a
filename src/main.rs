use clap::{Parser, Subcommand};
use pixstore::engine::TransformationEngine;
use pixstore::{config, output};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pixstore")]
#[command(about = "Content-addressable image storage with cached transformations")]
#[command(long_about = "\
Content-addressable image storage with cached transformations

Originals are stored under an account and identified by a hash of their
bytes. Variations are requested as an ordered list of transformations and
cached by output width until the original is deleted or purged.

Transformations:

  border           color, width, height, mode (outbound|inline)
  canvas           width, height, mode (free|center|center-x|center-y), x, y, bg
  compress         level (1-100)
  convert          type (jpg|png|gif|webp|tif)
  crop             x, y, width, height
  desaturate
  flipHorizontally
  flipVertically
  maxSize          width, height
  resize           width, height
  rotate           angle (multiple of 90), bg
  thumbnail        width, height, fit (outbound|inset)
  transpose
  transverse

Example:

  pixstore get christer 5d41402abc4b2a76b9719d911017c592 \\
      -t resize:width=300 -t border:color=fff,width=2 --out thumb.jpg

Run 'pixstore gen-config' to generate a documented pixstore.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "pixstore.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an original image
    Add {
        /// Image file to ingest
        file: PathBuf,
        /// Owning account
        #[arg(long)]
        account: String,
        /// Metadata entries as key=value
        #[arg(long = "meta", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,
    },
    /// Render a variation and write it to a file
    Get {
        account: String,
        identifier: String,
        /// Transformation, applied in the order given (repeatable)
        #[arg(short = 't', long = "transformation")]
        transformations: Vec<String>,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
    /// Show the stored attributes of an image
    Info { account: String, identifier: String },
    /// Update metadata (key=value; an empty value removes the key)
    Meta {
        account: String,
        identifier: String,
        #[arg(value_parser = parse_key_value, required = true)]
        entries: Vec<(String, String)>,
    },
    /// Delete an original and all of its variations
    Delete { account: String, identifier: String },
    /// Drop cached variations without touching the original
    Purge {
        account: String,
        identifier: String,
        /// Only this output width
        #[arg(long)]
        width: Option<u32>,
    },
    /// Pre-render resized variations in parallel
    Warm {
        account: String,
        identifier: String,
        /// Output width (repeatable)
        #[arg(long = "width", required = true)]
        widths: Vec<u32>,
    },
    /// Print a stock pixstore.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let open = || -> Result<TransformationEngine, config::ConfigError> {
        let service_config = config::load_config(&cli.config)?;
        init_thread_pool(&service_config.processing);
        TransformationEngine::from_config(&service_config)
    };

    match cli.command {
        Command::Add {
            file,
            account,
            meta,
        } => {
            let engine = open()?;
            let blob = std::fs::read(&file)?;
            let info = engine.add_image(&account, &blob, meta.into_iter().collect())?;
            output::print_image_info(&info);
        }
        Command::Get {
            account,
            identifier,
            transformations,
            out,
        } => {
            let engine = open()?;
            let raw = serde_json::Value::from(transformations);
            let rendered = engine.get_image(&account, &identifier, &raw)?;
            std::fs::write(&out, &rendered.blob)?;
            output::print_rendered(&rendered, &out);
            println!("Cache: {}", engine.stats());
        }
        Command::Info {
            account,
            identifier,
        } => {
            let engine = open()?;
            output::print_image_info(&engine.image_info(&account, &identifier)?);
        }
        Command::Meta {
            account,
            identifier,
            entries,
        } => {
            let engine = open()?;
            let changes: BTreeMap<String, String> = entries.into_iter().collect();
            let info = engine.update_metadata(&account, &identifier, changes)?;
            output::print_image_info(&info);
        }
        Command::Delete {
            account,
            identifier,
        } => {
            let engine = open()?;
            let variations = engine.delete_image(&account, &identifier)?;
            output::print_delete_output(&account, &identifier, variations);
        }
        Command::Purge {
            account,
            identifier,
            width,
        } => {
            let engine = open()?;
            let outcome = engine.purge_variations(&account, &identifier, width)?;
            output::print_purge_output(&account, &identifier, width, outcome);
        }
        Command::Warm {
            account,
            identifier,
            widths,
        } => {
            let engine = open()?;
            let rendered = engine.warm(&account, &identifier, &widths)?;
            output::print_warm_output(&account, &identifier, &widths, &rendered);
            println!("Cache: {}", engine.stats());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Parse a `key=value` argument. The value may be empty.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
