#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use toolbox::compress::{self, CompressSettings};
use toolbox::config::Config;
use toolbox::convert::{matrix, Converter, Format};
use toolbox::{gateway, runtime};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// `ToolBox` - file conversion, image compression and small web utilities.
#[derive(Parser, Debug)]
#[command(name = "toolbox")]
#[command(version)]
#[command(about = "File converter, image compressor and utility gateway.", long_about = None)]
struct Cli {
    /// Directory holding config.toml (default: ~/.toolbox)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    #[command(long_about = "\
Start the HTTP gateway.

Serves the converter, compressor, chat relay and utility endpoints \
under /api. Bind address defaults to the values in your config file \
(gateway.host / gateway.port).

Examples:
  toolbox gateway                  # use config defaults
  toolbox gateway -p 8080          # listen on port 8080
  toolbox gateway -p 0             # random available port")]
    Gateway {
        /// Port to listen on (use 0 for random available port); defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Convert a local file to another format
    Convert {
        /// File to convert
        input: PathBuf,

        /// Target extension, e.g. pdf or docx
        #[arg(long)]
        to: String,

        /// Output path (default: next to the input, with the new extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-encode an image as JPEG close to a target size
    Compress {
        /// Image to compress
        input: PathBuf,

        /// Target size in kilobytes
        #[arg(long = "target-kb")]
        target_kb: usize,

        /// Output path (default: <input stem>-compressed.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported conversions
    Formats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

async fn load_config(config_dir: Option<&Path>) -> Result<Config> {
    match config_dir {
        Some(dir) if dir.as_os_str().is_empty() => bail!("--config-dir cannot be empty"),
        Some(dir) => Config::load_or_init_in(dir).await,
        None => Config::load_or_init().await,
    }
}

fn default_convert_output(input: &Path, target: Format) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "converted".into(), |s| s.to_string_lossy().into_owned());
    input.with_file_name(format!("{stem}.{}", target.extension()))
}

fn default_compress_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy().into_owned());
    input.with_file_name(format!("{stem}-compressed.jpg"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Completions must remain stdout-only and should not load config or initialize logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut stdout = std::io::stdout().lock();
        write_shell_completion(*shell, &mut stdout)?;
        return Ok(());
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match cli.command {
        Commands::Gateway { port, host } => {
            let mut config = load_config(cli.config_dir.as_deref()).await?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            config.validate()?;
            info!("🧰 Starting ToolBox gateway on {}:{}", config.gateway.host, config.gateway.port);
            gateway::run_gateway(config).await
        }

        Commands::Convert { input, to, output } => {
            let config = load_config(cli.config_dir.as_deref()).await?;
            let target: Format = to.parse()?;
            let bytes = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let file_name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let converter = Converter::new(
                config.convert.clone(),
                runtime::create_runner(),
                config.gateway.max_upload_bytes,
            );
            let converted = converter.convert(&file_name, bytes, &to).await?;

            let output = output.unwrap_or_else(|| default_convert_output(&input, target));
            tokio::fs::write(&output, &converted.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "✅ {} → {} ({} bytes, {})",
                input.display(),
                output.display(),
                converted.bytes.len(),
                converted.content_type
            );
            Ok(())
        }

        Commands::Compress {
            input,
            target_kb,
            output,
        } => {
            let config = load_config(cli.config_dir.as_deref()).await?;
            let settings =
                CompressSettings::from_config(&config.compress, config.gateway.max_upload_bytes);
            let bytes = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let target_bytes = target_kb.saturating_mul(1024);

            let outcome = tokio::task::spawn_blocking(move || {
                compress::compress_to_target(&bytes, target_bytes, &settings)
            })
            .await??;

            let output = output.unwrap_or_else(|| default_compress_output(&input));
            tokio::fs::write(&output, &outcome.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            let marker = if outcome.fits_target { "✅" } else { "⚠️ " };
            println!(
                "{marker} {} → {} ({} bytes, quality {}, {} rounds{})",
                input.display(),
                output.display(),
                outcome.bytes.len(),
                outcome.quality,
                outcome.iterations,
                if outcome.fits_target {
                    ""
                } else {
                    ", target not reached"
                }
            );
            Ok(())
        }

        Commands::Formats => {
            for (from, targets) in matrix::as_table() {
                println!("{from:>5} → {}", targets.join(", "));
            }
            Ok(())
        }

        Commands::Config { config_command } => match config_command {
            ConfigCommands::Schema => {
                let schema = schemars::schema_for!(Config);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&schema)
                        .context("failed to serialize JSON Schema")?
                );
                Ok(())
            }
        },

        Commands::Completions { .. } => unreachable!(),
    }
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}
