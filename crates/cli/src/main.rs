//! sitesync: static site uploader for S3-compatible object storage
//!
//! Synchronises a local directory tree to a bucket, uploading only what
//! changed and deleting what no longer exists locally, with change ordering
//! that keeps live pages from referencing assets that have not landed yet.

mod display;
mod progress;
mod project;

use std::io::Write as _;
use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects};
use clap::{builder::Styles, Parser, Subcommand};
use color_eyre::Result;
use tracing::info;

use sitesync_core::{PreparedFile, CONFIG_FILE};
use sitesync_transport::S3ObjectStore;

use crate::project::Project;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

const SKELETON_TOML: &str = r#"###############################################################################
# AWS SETTINGS
###############################################################################

[aws]
region_name = ''  # E.g. 'eu-west-1'
s3_bucket_name = ''  # E.g. 'mywebsitebucket'
s3_project_root = ''  # Root location for the project within S3, e.g. 'staging'


###############################################################################
# PATH SPECIFIC SETTINGS
#
# If multiple [[path_specific]] entries match a path:
#  * Directives are combined from all matching [[path_specific]] entries.
#  * The last matching [[path_specific]] wins for equivalent directive keys.
###############################################################################

# Catch-all matcher for all files. Set a sensible default cache lifetime.
[[path_specific]]
path = '^.*$'
Cache-Control = 'max-age=60'

# Example: extend cache lifetime for certain PDFs and set additional headers
# [[path_specific]]
# path = '^downloads/[0-9]+.pdf'
# Content-Disposition = 'attachment'
# Cache-Control = 'max-age=120'


###############################################################################
# OTHER SETTINGS
###############################################################################

# Override file extension -> mimetype mappings
# [mimetype_overrides]
# '.woff2' = 'font/woff2'
"#;

#[derive(Parser)]
#[command(name = "sitesync")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Static site uploader for S3-compatible object storage")]
#[command(long_about = r#"
sitesync keeps a bucket in step with a local static site.

It remembers what the bucket contains in a catalogue object, so each run
uploads only new and changed files, rewrites metadata without re-uploading
content, and deletes remote files that disappeared locally - in an order
that never leaves a live page pointing at missing assets.

Examples:
  sitesync init                 Create a skeleton sitesync.toml
  sitesync status               Show what a sync would change
  sitesync upload               Synchronise the site to the bucket
  sitesync upload --dryrun      Rehearse without touching the bucket
"#)]
struct Cli {
    /// Local project directory containing sitesync.toml
    #[arg(short = 'p', long, global = true, default_value = ".")]
    projectdir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a skeleton sitesync.toml configuration file
    Init,

    /// Show the changes a sync would make. Read-only
    Status {
        /// Treat remote-only files as protected rather than deletions
        #[arg(long)]
        no_delete: bool,

        /// Output format (summary, json)
        #[arg(short, long, default_value = "summary")]
        format: String,
    },

    /// Show calculated upload attributes for local files
    Inspect {
        /// Relative paths within the project
        files: Vec<String>,
    },

    /// Synchronise the local site to the bucket
    Upload {
        /// Compute and display changes without modifying the bucket
        #[arg(short = 'd', long)]
        dryrun: bool,

        /// Keep remote files that no longer exist locally
        #[arg(long)]
        no_delete: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => init_command(&cli.projectdir)?,
        Commands::Status { no_delete, format } => {
            status_command(&cli.projectdir, no_delete, &format).await?;
        }
        Commands::Inspect { files } => inspect_command(&cli.projectdir, &files)?,
        Commands::Upload { dryrun, no_delete } => {
            upload_command(&cli.projectdir, dryrun, no_delete).await?;
        }
    }

    Ok(())
}

fn init_command(projectdir: &PathBuf) -> Result<()> {
    let config_path = projectdir.join(CONFIG_FILE);
    if config_path.exists() {
        color_eyre::eyre::bail!(
            "{} already exists; not overwriting",
            config_path.display()
        );
    }
    std::fs::write(&config_path, SKELETON_TOML)?;
    eprintln!(
        "Skeleton configuration file created: {}",
        config_path.display()
    );
    Ok(())
}

async fn status_command(projectdir: &PathBuf, no_delete: bool, format: &str) -> Result<()> {
    let project = Project::load(projectdir)?;
    info!("S3 bucket: {}", project.bucket_display());

    let store = S3ObjectStore::connect(project.rules()).await;
    let (diff, _, _) = project.calculate_diff(&store, no_delete).await?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&diff)?;
            println!("{json}");
        }
        _ => display::print_diff_summary(&diff, true),
    }
    Ok(())
}

fn inspect_command(projectdir: &PathBuf, files: &[String]) -> Result<()> {
    let project = Project::load(projectdir)?;
    let mut term = console::Term::stderr();

    for rel_path in files {
        let prepared = PreparedFile::new(project.root(), rel_path, project.rules());
        let title = console::Style::new().bold();
        let _ = writeln!(term, "\n{}", title.apply_to(format!("File: {rel_path}")));

        match prepared.hashes() {
            Ok((content_hash, attributes_hash)) => {
                let _ = writeln!(
                    term,
                    "  S3 path: s3://{}/{}",
                    project.rules().aws.s3_bucket_name,
                    prepared.remote_key()
                );
                for (name, value) in prepared.attributes().as_sorted_pairs() {
                    let _ = writeln!(term, "  {name}: {value}");
                }
                if let Ok(size) = prepared.size() {
                    let _ = writeln!(
                        term,
                        "  Content size: {}",
                        humansize::format_size(size, humansize::DECIMAL)
                    );
                }
                let _ = writeln!(term, "  Content hash: {content_hash}");
                let _ = writeln!(term, "  Attributes hash: {attributes_hash}");
            }
            Err(e) => {
                let style = console::Style::new().red();
                let _ = writeln!(term, "{}", style.apply_to(format!("  Could not open: {e}")));
            }
        }
    }
    Ok(())
}

async fn upload_command(projectdir: &PathBuf, dryrun: bool, no_delete: bool) -> Result<()> {
    let project = Project::load(projectdir)?;
    info!(
        "Syncing {} -> {}",
        projectdir.display(),
        project.bucket_display()
    );

    let store = S3ObjectStore::connect(project.rules()).await;
    project.sync(&store, dryrun, no_delete).await?;

    let style = console::Style::new().green();
    eprintln!("{}", style.apply_to("Done!"));
    Ok(())
}
