use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{extract, log, play, render, serve, SourceArgs};

#[derive(Parser)]
#[command(name = "sizelapse")]
#[command(version, about = "Watch a repository's file sizes evolve commit by commit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the history API and rendered frames
    Serve {
        /// Repository to visualize (defaults to current directory)
        #[arg(default_value = ".")]
        repo: PathBuf,

        /// Port for the API server
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Directory of static files to serve alongside the API
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Number of commit trees listed concurrently
        #[arg(short, long, default_value = "4")]
        jobs: usize,
    },

    /// Extract the commit history as JSON
    Extract {
        /// Repository to read (defaults to current directory)
        #[arg(default_value = ".")]
        repo: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of commit trees listed concurrently
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Show commit history with file counts and sizes
    Log {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of commits to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Render one commit as an SVG
    Render {
        #[command(flatten)]
        source: SourceArgs,

        /// 1-based commit number (defaults to the latest commit)
        #[arg(short, long)]
        commit: Option<usize>,

        /// Hide .json files
        #[arg(long)]
        hide_json: bool,

        /// Hide image files
        #[arg(long)]
        hide_images: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play the history from the first commit, writing frames as SVG files
    Play {
        #[command(flatten)]
        source: SourceArgs,

        /// Directory the frames are written to
        #[arg(long)]
        out: PathBuf,

        /// Delay between commits in milliseconds
        #[arg(long, default_value = "500")]
        speed: u64,

        /// Hide .json files
        #[arg(long)]
        hide_json: bool,

        /// Hide image files
        #[arg(long)]
        hide_images: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            repo,
            port,
            static_dir,
            jobs,
        } => {
            serve::run(repo, port, static_dir, jobs).await?;
        }
        Commands::Extract {
            repo,
            output,
            jobs,
            pretty,
        } => {
            extract::run(repo, output, jobs, pretty).await?;
        }
        Commands::Log { source, limit } => {
            log::run(source, limit).await?;
        }
        Commands::Render {
            source,
            commit,
            hide_json,
            hide_images,
            output,
        } => {
            render::run(source, commit, hide_json, hide_images, output).await?;
        }
        Commands::Play {
            source,
            out,
            speed,
            hide_json,
            hide_images,
        } => {
            play::run(source, out, speed, hide_json, hide_images).await?;
        }
    }

    Ok(())
}
