use anyhow::Context;
use clap::{Parser, Subcommand};
use migration_orchestrator::config::{read_config, MigratorConfig, VersionFormat};
use migration_orchestrator::target::{DirectoryTarget, Journal};
use migration_orchestrator::utils::{DEFAULT_CONFIG_FILE, ORCHESTRATOR_VERSION};
use migration_orchestrator::version::{DottedVersion, TimestampVersion, Version};
use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Migration orchestrator - inspect the migration history of a target
#[derive(Parser, Debug)]
#[command(author, version = ORCHESTRATOR_VERSION, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the applied migrations and the current version of a directory target
    Status {
        /// Target directory
        #[arg(short, long, env = "MIGRATOR_TARGET")]
        target: PathBuf,

        /// Configuration file. Defaults to migrator.json inside the target
        #[arg(short, long, env = "MIGRATOR_CONFIG")]
        config: Option<PathBuf>,

        /// Version format of the journal (dotted or timestamp)
        #[arg(short, long, env = "MIGRATOR_VERSION_FORMAT")]
        format: Option<VersionFormat>,

        /// Journal file name, relative to the target
        #[arg(long, env = "MIGRATOR_JOURNAL_FILE")]
        journal_file: Option<String>,

        /// Number of fields dotted versions are printed with
        #[arg(long)]
        field_count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    match args.command {
        Command::Status {
            target,
            config,
            format,
            journal_file,
            field_count,
        } => {
            let config_path = config.unwrap_or_else(|| target.join(DEFAULT_CONFIG_FILE));
            let mut config = read_config(&config_path)
                .await
                .with_context(|| format!("Failed to read config {}", config_path.display()))?
                .unwrap_or_default();
            debug!(path = %config_path.display(), "Loaded configuration");

            // Command line wins over the file
            if let Some(format) = format {
                config.version_format = format;
            }
            if let Some(journal_file) = journal_file {
                config.journal_file = journal_file;
            }
            if let Some(field_count) = field_count {
                config.field_count = field_count;
            }
            config.validate()?;

            status(target, &config).await
        }
    }
}

async fn status(target: PathBuf, config: &MigratorConfig) -> anyhow::Result<()> {
    info!(
        target = %target.display(),
        format = %config.version_format,
        "Reading migration journal"
    );

    match config.version_format {
        VersionFormat::Dotted => {
            let field_count = config.field_count;
            let journal = load_journal::<DottedVersion>(target, config).await?;
            print_status(&journal, |v| {
                v.clone()
                    .with_field_count(field_count)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|_| v.to_string())
            })
        }
        VersionFormat::Timestamp => {
            let journal = load_journal::<TimestampVersion>(target, config).await?;
            print_status(&journal, |v| v.to_string())
        }
    }
}

async fn load_journal<V>(target: PathBuf, config: &MigratorConfig) -> anyhow::Result<Journal<V>>
where
    V: Version + DeserializeOwned,
{
    let target: DirectoryTarget<V> = DirectoryTarget::from_config(target, config);
    target
        .read_journal()
        .await
        .with_context(|| format!("Failed to read journal {}", target.journal_path().display()))
}

/// Print the report, then fail if the journal records a version twice.
fn print_status<V: Version>(
    journal: &Journal<V>,
    render: impl Fn(&V) -> String,
) -> anyhow::Result<()> {
    print!("{}", render_status(journal, render));
    journal
        .validate_unique_versions()
        .context("Journal contains duplicate versions")
}

/// Render the journal as text, listing any version recorded more than once.
fn render_status<V: Version>(journal: &Journal<V>, render: impl Fn(&V) -> String) -> String {
    let mut out = String::new();

    let mut records: Vec<_> = journal.migrations.iter().collect();
    records.sort_by(|a, b| a.version.cmp(&b.version));

    let _ = writeln!(out, "Applied migrations: {}", records.len());
    for info in &records {
        let _ = writeln!(
            out,
            "  {}  {}  {}",
            render(&info.version),
            info.name,
            info.applied_at.to_rfc3339()
        );
    }

    match journal.latest() {
        Some(latest) => {
            let _ = writeln!(out, "Current version: {}", render(&latest.version));
        }
        None => {
            let _ = writeln!(out, "Current version: none");
        }
    }

    for (version, names) in &journal.duplicate_versions() {
        let _ = writeln!(
            out,
            "Problem: version {} recorded {} times ({})",
            render(version),
            names.len(),
            names.join(", ")
        );
    }

    out
}
